//! `.tsm` loader: text in, best-effort model plus diagnostics out.
//!
//! The parser recovers locally from everything recoverable. A malformed line
//! or block produces a [`MapIssue`] and is skipped; only an unreadable file
//! aborts the load. Issues carry the 1-based line of the offending header or
//! statement.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::{
    direction::{Direction, ExitSet},
    issue::{MapIssue, MapIssueKind},
    math::{CellPoint, CellSpan, Circle, Geometry, Polygon, Polyline, Rect, WorldPoint},
    model::{
        Approach, Area, AreaKind, Beacon, BeaconKind, Cell, Flags, Link, LinkDirection, Marker,
        MarkerKind, Noise, Path as TrackPath, PathKind, Portal, PortalRole, Sector, SectorKind,
        Shape, Surface, TrackMap,
    },
};

pub mod block;
pub mod keys;
pub mod line;

use block::Block;
use line::Statement;

/// What a load produces: the model is always present (possibly empty), the
/// issue list tells how trustworthy it is.
#[derive(Clone, Debug)]
pub struct ParseOutcome {
    pub map: TrackMap,
    pub issues: Vec<MapIssue>,
}

/// Failure to get at the bytes at all. Anything inside the file is a
/// [`MapIssue`], not an error.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn parse_file(path: &Path) -> Result<ParseOutcome, LoadError> {
    let file = File::open(path)
        .map_err(|source| LoadError::Io { path: path.to_owned(), source })?;

    let mut blocks = Vec::new();
    let mut issues = Vec::new();
    scan(BufReader::new(file).lines(), &mut blocks, &mut issues)
        .map_err(|source| LoadError::Io { path: path.to_owned(), source })?;

    debug!(target: "parser", "scanned {} blocks from {}", blocks.len(), path.display());
    Ok(assemble(blocks, issues))
}

pub fn parse_str(text: &str) -> ParseOutcome {
    let mut blocks = Vec::new();
    let mut issues = Vec::new();
    scan(text.lines().map(|l| Ok(l.to_owned())), &mut blocks, &mut issues)
        .expect("reading from a string cannot fail");
    assemble(blocks, issues)
}

/// Lexical pass: stream lines, accumulate key/value statements into blocks.
fn scan<I: Iterator<Item = io::Result<String>>>(
    lines: I,
    blocks: &mut Vec<Block>,
    issues: &mut Vec<MapIssue>,
) -> io::Result<()> {
    let mut current: Option<Block> = None;

    for (i, raw) in lines.enumerate() {
        let line_no = i as u32 + 1;
        match line::statement(&raw?) {
            None => {}
            Some(Err(defect)) => {
                issues.push(MapIssue::warning(MapIssueKind::Syntax, line_no, defect.message()));
            }
            Some(Ok(Statement::Section { name, arg })) => {
                blocks.extend(current.take());
                current = Some(Block::new(name, arg, line_no));
            }
            Some(Ok(Statement::KeyValue { key, value })) => match &mut current {
                Some(block) => block.push(key, value, line_no),
                None => issues.push(MapIssue::warning(
                    MapIssueKind::Syntax,
                    line_no,
                    format!("`{key}` appears before any section header"),
                )),
            },
        }
    }
    blocks.extend(current);
    Ok(())
}

/// Semantic pass: turn blocks into model entities, in file order.
fn assemble(blocks: Vec<Block>, mut issues: Vec<MapIssue>) -> ParseOutcome {
    let mut map = TrackMap::default();

    for block in &blocks {
        match block.kind.as_str() {
            "meta" => meta_block(&mut map, block, &mut issues),
            "cell" => cell_block(&mut map, block, &mut issues),
            "line" => line_block(&mut map, block, &mut issues),
            "rect" => rect_block(&mut map, block, &mut issues),
            "shape" => shape_block(&mut map, block, &mut issues),
            "sector" => sector_block(&mut map, block, &mut issues),
            "area" => area_block(&mut map, block, &mut issues),
            "portal" => portal_block(&mut map, block, &mut issues),
            "link" => link_block(&mut map, block, &mut issues),
            "path" => path_block(&mut map, block, &mut issues),
            "beacon" => beacon_block(&mut map, block, &mut issues),
            "marker" => marker_block(&mut map, block, &mut issues),
            "approach" => approach_block(&mut map, block, &mut issues),
            other => issues.push(MapIssue::warning(
                MapIssueKind::Syntax,
                block.line,
                format!("unknown section `[{other}]`"),
            )),
        }
    }

    info!(
        target: "parser",
        "assembled `{}`: {} cells, {} sectors, {} issues",
        map.metadata().name,
        map.cells().len(),
        map.sectors().len(),
        issues.len()
    );
    ParseOutcome { map, issues }
}

// ===== Field helpers =====

/// Missing mandatory key: `SectionError` at the block header.
fn req<'b>(block: &'b Block, aliases: &[&str], issues: &mut Vec<MapIssue>) -> Option<&'b str> {
    let value = block.value(aliases);
    if value.is_none() {
        issues.push(MapIssue::error(
            MapIssueKind::Section,
            block.line,
            format!("`[{}]` is missing mandatory key `{}`", block.kind, aliases[0]),
        ));
    }
    value
}

/// Mandatory key that must also parse; a present-but-garbage value is a
/// `SectionError` too.
fn req_parsed<T>(
    block: &Block,
    aliases: &[&str],
    what: &str,
    parse: impl Fn(&str) -> Option<T>,
    issues: &mut Vec<MapIssue>,
) -> Option<T> {
    let value = req(block, aliases, issues)?;
    let parsed = parse(value);
    if parsed.is_none() {
        issues.push(MapIssue::error(
            MapIssueKind::Section,
            block.line_of(aliases).unwrap_or(block.line),
            format!("`{}` is not a valid {what}: `{value}`", aliases[0]),
        ));
    }
    parsed
}

/// Optional key; a garbage value warns and is dropped.
fn opt_parsed<T>(
    block: &Block,
    aliases: &[&str],
    what: &str,
    parse: impl Fn(&str) -> Option<T>,
    issues: &mut Vec<MapIssue>,
) -> Option<T> {
    let value = block.value(aliases)?;
    let parsed = parse(value);
    if parsed.is_none() {
        issues.push(MapIssue::warning(
            MapIssueKind::Syntax,
            block.line_of(aliases).unwrap_or(block.line),
            format!("`{}` is not a valid {what}: `{value}`", aliases[0]),
        ));
    }
    parsed
}

fn parse_f64(s: &str) -> Option<f64> {
    s.trim().parse().ok()
}

fn parse_i32(s: &str) -> Option<i32> {
    s.trim().parse().ok()
}

fn parse_u32(s: &str) -> Option<u32> {
    s.trim().parse().ok()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// A heading is either a cardinal letter/name or a float in degrees.
fn parse_heading(s: &str) -> Option<f64> {
    match Direction::parse(s) {
        Some(dir) => Some(dir.heading_deg()),
        None => parse_f64(s),
    }
}

fn opt_string(block: &Block, aliases: &[&str]) -> Option<String> {
    block.value(aliases).map(str::to_owned)
}

fn block_id<'b>(block: &'b Block, issues: &mut Vec<MapIssue>) -> Option<&'b str> {
    let id = block.id();
    if id.is_none() {
        issues.push(MapIssue::error(
            MapIssueKind::Section,
            block.line,
            format!("`[{}]` has no id (use `[{}: name]` or `id =`)", block.kind, block.kind),
        ));
    }
    id
}

fn parse_flags(block: &Block, issues: &mut Vec<MapIssue>) -> Flags {
    let Some(value) = block.value(keys::FLAGS) else {
        return Flags::NONE;
    };
    let (flags, unknown) = Flags::parse(value);
    for name in unknown {
        issues.push(MapIssue::warning(
            MapIssueKind::Syntax,
            block.line_of(keys::FLAGS).unwrap_or(block.line),
            format!("unknown flag `{name}`"),
        ));
    }
    flags
}

// ===== Grid blocks =====

/// What a `[cell]`/`[line]`/`[rect]` block contributes to each touched cell.
/// Exits OR together across blocks, the rest is last-writer-wins.
#[derive(Clone, Debug, Default)]
struct CellPatch {
    exits: Option<ExitSet>,
    surface: Option<Surface>,
    noise: Option<Noise>,
    width_m: Option<f64>,
    safe: Option<bool>,
    zone: Option<String>,
}

fn cell_patch(block: &Block, issues: &mut Vec<MapIssue>) -> CellPatch {
    CellPatch {
        exits: opt_parsed(block, keys::EXITS, "exit set", |s| ExitSet::parse(s), issues),
        surface: opt_parsed(block, keys::SURFACE, "surface", Surface::parse, issues),
        noise: opt_parsed(block, keys::NOISE, "noise", Noise::parse, issues),
        width_m: opt_parsed(block, keys::WIDTH, "number", parse_f64, issues),
        safe: opt_parsed(block, keys::SAFE, "boolean", parse_bool, issues),
        zone: opt_string(block, keys::ZONE),
    }
}

fn merge_cell(map: &mut TrackMap, at: CellPoint, patch: &CellPatch) {
    let cell = map.cells.entry(at).or_insert_with(Cell::default);
    if let Some(exits) = patch.exits {
        cell.exits = cell.exits.union(exits);
    }
    if patch.surface.is_some() {
        cell.surface = patch.surface;
    }
    if patch.noise.is_some() {
        cell.noise = patch.noise;
    }
    if patch.width_m.is_some() {
        cell.width_m = patch.width_m;
    }
    if let Some(safe) = patch.safe {
        cell.is_safe_zone = safe;
    }
    if let Some(zone) = &patch.zone {
        cell.zone = Some(zone.clone());
    }
}

fn cell_block(map: &mut TrackMap, block: &Block, issues: &mut Vec<MapIssue>) {
    let (Some(x), Some(z)) = (
        req_parsed(block, keys::X, "integer", parse_i32, issues),
        req_parsed(block, keys::Z, "integer", parse_i32, issues),
    ) else {
        return;
    };
    let patch = cell_patch(block, issues);
    merge_cell(map, CellPoint::new(x, z), &patch);
}

fn line_block(map: &mut TrackMap, block: &Block, issues: &mut Vec<MapIssue>) {
    let (Some(x), Some(z), Some(length), Some(dir)) = (
        req_parsed(block, keys::X, "integer", parse_i32, issues),
        req_parsed(block, keys::Z, "integer", parse_i32, issues),
        req_parsed(block, keys::LENGTH, "positive integer", |s| parse_u32(s).filter(|&n| n > 0), issues),
        req_parsed(block, keys::DIR, "direction", Direction::parse, issues),
    ) else {
        return;
    };

    let mut patch = cell_patch(block, issues);
    // A segment is naturally bidirectional unless the block says otherwise
    if patch.exits.is_none() {
        patch.exits = Some(ExitSet::of(&[dir, dir.opposite()]));
    }

    let mut at = CellPoint::new(x, z);
    for _ in 0..length {
        merge_cell(map, at, &patch);
        at = at + dir.offset();
    }
}

fn rect_block(map: &mut TrackMap, block: &Block, issues: &mut Vec<MapIssue>) {
    let (Some(x), Some(z), Some(width), Some(height)) = (
        req_parsed(block, keys::X, "integer", parse_i32, issues),
        req_parsed(block, keys::Z, "integer", parse_i32, issues),
        req_parsed(block, keys::WIDTH, "positive integer", |s| parse_u32(s).filter(|&n| n > 0), issues),
        req_parsed(block, keys::HEIGHT, "positive integer", |s| parse_u32(s).filter(|&n| n > 0), issues),
    ) else {
        return;
    };

    let patch = cell_patch(block, issues);
    let origin = CellPoint::new(x, z);
    for offset in CellSpan::new(width, height).iter_within() {
        merge_cell(map, origin + offset, &patch);
    }
}

// ===== Meta =====

fn meta_block(map: &mut TrackMap, block: &Block, issues: &mut Vec<MapIssue>) {
    let meta = &mut map.metadata;
    if let Some(name) = block.value(keys::NAME) {
        meta.name = name.to_owned();
    }
    if let Some(size) = opt_parsed(block, keys::CELL_SIZE, "number", parse_f64, issues) {
        if size >= crate::MIN_CELL_SIZE_M {
            meta.cell_size_m = size;
        } else {
            issues.push(MapIssue::error(
                MapIssueKind::Geometry,
                block.line_of(keys::CELL_SIZE).unwrap_or(block.line),
                format!("cell_size must be at least {}", crate::MIN_CELL_SIZE_M),
            ));
        }
    }
    if let Some(weather) = opt_parsed(block, keys::WEATHER, "weather", crate::model::Weather::parse, issues) {
        meta.weather = weather;
    }
    if let Some(ambience) =
        opt_parsed(block, keys::AMBIENCE, "ambience", crate::model::Ambience::parse, issues)
    {
        meta.ambience = ambience;
    }
    if let Some(surface) = opt_parsed(block, keys::SURFACE, "surface", Surface::parse, issues) {
        meta.default_surface = surface;
    }
    if let Some(noise) = opt_parsed(block, keys::NOISE, "noise", Noise::parse, issues) {
        meta.default_noise = noise;
    }
    if let Some(width) = opt_parsed(block, keys::WIDTH, "number", parse_f64, issues) {
        if width >= crate::MIN_CELL_WIDTH_M {
            meta.default_width_m = width;
        } else {
            issues.push(MapIssue::error(
                MapIssueKind::Geometry,
                block.line_of(keys::WIDTH).unwrap_or(block.line),
                format!("default width must be at least {}", crate::MIN_CELL_WIDTH_M),
            ));
        }
    }
    if let Some(x) = opt_parsed(block, keys::START_X, "integer", parse_i32, issues) {
        meta.start.cell.x = x;
    }
    if let Some(z) = opt_parsed(block, keys::START_Z, "integer", parse_i32, issues) {
        meta.start.cell.z = z;
    }
    if let Some(heading) =
        opt_parsed(block, keys::START_HEADING, "heading", parse_heading, issues)
    {
        meta.start.heading = Direction::from_heading_deg(heading);
    }
}

// ===== Topology blocks =====

fn shape_block(map: &mut TrackMap, block: &Block, issues: &mut Vec<MapIssue>) {
    let Some(id) = block_id(block, issues).map(str::to_owned) else {
        return;
    };
    let Some(kind) = req(block, keys::TYPE, issues).map(str::to_ascii_lowercase) else {
        return;
    };

    let geometry = match kind.as_str() {
        "rectangle" | "rect" => {
            let (Some(x), Some(z), Some(width), Some(height)) = (
                req_parsed(block, keys::X, "number", parse_f64, issues),
                req_parsed(block, keys::Z, "number", parse_f64, issues),
                req_parsed(block, keys::WIDTH, "number", parse_f64, issues),
                req_parsed(block, keys::HEIGHT, "number", parse_f64, issues),
            ) else {
                return;
            };
            if width <= 0.0 || height <= 0.0 {
                issues.push(MapIssue::error(
                    MapIssueKind::Geometry,
                    block.line,
                    format!("rectangle `{id}` needs positive width and height"),
                ));
                return;
            }
            Geometry::from(Rect::new(x, z, width, height))
        }
        "circle" => {
            let (Some(x), Some(z), Some(radius)) = (
                req_parsed(block, keys::X, "number", parse_f64, issues),
                req_parsed(block, keys::Z, "number", parse_f64, issues),
                req_parsed(block, keys::RADIUS, "number", parse_f64, issues),
            ) else {
                return;
            };
            if radius <= 0.0 {
                issues.push(MapIssue::error(
                    MapIssueKind::Geometry,
                    block.line,
                    format!("circle `{id}` needs a positive radius"),
                ));
                return;
            }
            Geometry::from(Circle::new(x, z, radius))
        }
        "polygon" | "poly" => {
            let Some(points) = shape_points(block, &id, 3, "polygon", issues) else {
                return;
            };
            Geometry::from(Polygon::new(points))
        }
        "polyline" | "line" => {
            let Some(points) = shape_points(block, &id, 2, "polyline", issues) else {
                return;
            };
            Geometry::from(Polyline::new(points))
        }
        other => {
            issues.push(MapIssue::error(
                MapIssueKind::Section,
                block.line,
                format!("shape `{id}` has unknown type `{other}`"),
            ));
            return;
        }
    };

    if let Err(err) = map.shapes.insert(&id, Shape { id: id.clone(), geometry }) {
        issues.push(duplicate(block, "shape", &err.id));
    }
}

/// Collects a `points`/`point` list. Entries split on `;` or `|`, each entry
/// is `x,z` (comma or space separated). One bad entry voids the whole shape.
fn shape_points(
    block: &Block,
    id: &str,
    min: usize,
    what: &str,
    issues: &mut Vec<MapIssue>,
) -> Option<Vec<WorldPoint>> {
    let mut points = Vec::new();
    for value in block.values(keys::POINTS) {
        for entry in value.split([';', '|']) {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let mut coords = entry.split([',', ' ']).filter(|t| !t.is_empty());
            let point = match (coords.next(), coords.next(), coords.next()) {
                (Some(x), Some(z), None) => {
                    parse_f64(x).zip(parse_f64(z)).map(|(x, z)| WorldPoint::new(x, z))
                }
                _ => None,
            };
            match point {
                Some(p) => points.push(p),
                None => {
                    issues.push(MapIssue::error(
                        MapIssueKind::Geometry,
                        block.line_of(keys::POINTS).unwrap_or(block.line),
                        format!("{what} `{id}` has an unreadable point `{entry}`"),
                    ));
                    return None;
                }
            }
        }
    }
    if points.len() < min {
        issues.push(MapIssue::error(
            MapIssueKind::Geometry,
            block.line,
            format!("{what} `{id}` needs at least {min} points, found {}", points.len()),
        ));
        return None;
    }
    Some(points)
}

fn sector_block(map: &mut TrackMap, block: &Block, issues: &mut Vec<MapIssue>) {
    let Some(id) = block_id(block, issues).map(str::to_owned) else {
        return;
    };
    let Some(kind) = req(block, keys::TYPE, issues).map(SectorKind::parse) else {
        return;
    };

    let sector = Sector {
        id: id.clone(),
        kind,
        name: opt_string(block, keys::NAME),
        code: opt_string(block, keys::CODE),
        area_id: opt_string(block, keys::AREA),
        surface: opt_parsed(block, keys::SURFACE, "surface", Surface::parse, issues),
        noise: opt_parsed(block, keys::NOISE, "noise", Noise::parse, issues),
        flags: parse_flags(block, issues),
        metadata: block.metadata(&[
            keys::ID,
            keys::TYPE,
            keys::NAME,
            keys::CODE,
            keys::AREA,
            keys::SURFACE,
            keys::NOISE,
            keys::FLAGS,
        ]),
    };
    if let Err(err) = map.sectors.insert(&id, sector) {
        issues.push(duplicate(block, "sector", &err.id));
    }
}

fn area_block(map: &mut TrackMap, block: &Block, issues: &mut Vec<MapIssue>) {
    let Some(id) = block_id(block, issues).map(str::to_owned) else {
        return;
    };
    let (Some(kind), Some(shape_id)) = (
        req(block, keys::TYPE, issues).map(AreaKind::parse),
        req(block, keys::SHAPE, issues).map(str::to_owned),
    ) else {
        return;
    };

    let area = Area {
        id: id.clone(),
        kind,
        shape_id,
        surface: opt_parsed(block, keys::SURFACE, "surface", Surface::parse, issues),
        noise: opt_parsed(block, keys::NOISE, "noise", Noise::parse, issues),
        width_m: opt_parsed(block, keys::WIDTH, "number", parse_f64, issues),
        flags: parse_flags(block, issues),
        metadata: block.metadata(&[
            keys::ID,
            keys::TYPE,
            keys::SHAPE,
            keys::SURFACE,
            keys::NOISE,
            keys::WIDTH,
            keys::FLAGS,
        ]),
    };
    if let Err(err) = map.areas.insert(&id, area) {
        issues.push(duplicate(block, "area", &err.id));
    }
}

fn portal_block(map: &mut TrackMap, block: &Block, issues: &mut Vec<MapIssue>) {
    let Some(id) = block_id(block, issues).map(str::to_owned) else {
        return;
    };
    let (Some(sector_id), Some(x), Some(z)) = (
        req(block, keys::SECTOR, issues).map(str::to_owned),
        req_parsed(block, keys::X, "number", parse_f64, issues),
        req_parsed(block, keys::Z, "number", parse_f64, issues),
    ) else {
        return;
    };

    let entry_heading_deg = opt_parsed(block, keys::ENTRY_HEADING, "heading", parse_heading, issues);
    let exit_heading_deg = opt_parsed(block, keys::EXIT_HEADING, "heading", parse_heading, issues);
    // An explicit role always wins; headings only infer one in its absence
    let role = opt_parsed(block, keys::ROLE, "portal role", PortalRole::parse, issues)
        .unwrap_or(match (entry_heading_deg.is_some(), exit_heading_deg.is_some()) {
            (true, false) => PortalRole::Entry,
            (false, true) => PortalRole::Exit,
            _ => PortalRole::EntryExit,
        });

    let portal = Portal {
        id: id.clone(),
        sector_id,
        position: WorldPoint::new(x, z),
        width_m: opt_parsed(block, keys::WIDTH, "number", parse_f64, issues).unwrap_or(0.0),
        entry_heading_deg,
        exit_heading_deg,
        role,
    };
    if let Err(err) = map.portals.insert(&id, portal) {
        issues.push(duplicate(block, "portal", &err.id));
    }
}

fn link_block(map: &mut TrackMap, block: &Block, issues: &mut Vec<MapIssue>) {
    let (Some(from), Some(to)) = (
        req(block, keys::FROM, issues).map(str::to_owned),
        req(block, keys::TO, issues).map(str::to_owned),
    ) else {
        return;
    };

    let direction = opt_parsed(block, keys::DIR, "link direction", LinkDirection::parse, issues)
        .or_else(|| {
            opt_parsed(block, keys::ONEWAY, "boolean", parse_bool, issues).map(|oneway| {
                if oneway { LinkDirection::OneWay } else { LinkDirection::TwoWay }
            })
        })
        .unwrap_or(LinkDirection::TwoWay);

    let id = block.id().map(str::to_owned).unwrap_or_else(|| Link::default_id(&from, &to));
    let link = Link { id: id.clone(), from_portal_id: from, to_portal_id: to, direction };
    if let Err(err) = map.links.insert(&id, link) {
        issues.push(duplicate(block, "link", &err.id));
    }
}

fn path_block(map: &mut TrackMap, block: &Block, issues: &mut Vec<MapIssue>) {
    let Some(id) = block_id(block, issues).map(str::to_owned) else {
        return;
    };
    let Some(kind) = req_parsed(block, keys::TYPE, "path type", PathKind::parse, issues) else {
        return;
    };

    let path = TrackPath {
        id: id.clone(),
        kind,
        shape_id: opt_string(block, keys::SHAPE),
        from_portal_id: opt_string(block, keys::FROM),
        to_portal_id: opt_string(block, keys::TO),
        width_m: opt_parsed(block, keys::WIDTH, "number", parse_f64, issues),
        name: opt_string(block, keys::NAME),
    };
    if let Err(err) = map.paths.insert(&id, path) {
        issues.push(duplicate(block, "path", &err.id));
    }
}

fn beacon_block(map: &mut TrackMap, block: &Block, issues: &mut Vec<MapIssue>) {
    let Some(id) = block_id(block, issues).map(str::to_owned) else {
        return;
    };
    let (Some(x), Some(z)) = (
        req_parsed(block, keys::X, "number", parse_f64, issues),
        req_parsed(block, keys::Z, "number", parse_f64, issues),
    ) else {
        return;
    };

    let activation_radius_m = opt_parsed(block, keys::RADIUS, "number", parse_f64, issues);
    if let Some(radius) = activation_radius_m
        && radius <= 0.0
    {
        issues.push(MapIssue::error(
            MapIssueKind::Geometry,
            block.line,
            format!("beacon `{id}` has a non-positive activation radius"),
        ));
        return;
    }

    let beacon = Beacon {
        id: id.clone(),
        kind: opt_parsed(block, keys::TYPE, "beacon type", BeaconKind::parse, issues)
            .unwrap_or(BeaconKind::Undefined),
        position: WorldPoint::new(x, z),
        name: opt_string(block, keys::NAME),
        name2: opt_string(block, keys::NAME2),
        sector_id: opt_string(block, keys::SECTOR),
        shape_id: opt_string(block, keys::SHAPE),
        heading_deg: opt_parsed(block, keys::HEADING, "heading", parse_heading, issues),
        activation_radius_m,
        role: opt_string(block, keys::ROLE),
        metadata: block.metadata(&[
            keys::ID,
            keys::TYPE,
            keys::X,
            keys::Z,
            keys::NAME,
            keys::NAME2,
            keys::SECTOR,
            keys::SHAPE,
            keys::HEADING,
            keys::RADIUS,
            keys::ROLE,
        ]),
    };
    if let Err(err) = map.beacons.insert(&id, beacon) {
        issues.push(duplicate(block, "beacon", &err.id));
    }
}

fn marker_block(map: &mut TrackMap, block: &Block, issues: &mut Vec<MapIssue>) {
    let Some(id) = block_id(block, issues).map(str::to_owned) else {
        return;
    };
    let (Some(x), Some(z)) = (
        req_parsed(block, keys::X, "number", parse_f64, issues),
        req_parsed(block, keys::Z, "number", parse_f64, issues),
    ) else {
        return;
    };

    let marker = Marker {
        id: id.clone(),
        kind: opt_parsed(block, keys::TYPE, "marker type", MarkerKind::parse, issues)
            .unwrap_or(MarkerKind::Undefined),
        position: WorldPoint::new(x, z),
        name: opt_string(block, keys::NAME),
        shape_id: opt_string(block, keys::SHAPE),
        heading_deg: opt_parsed(block, keys::HEADING, "heading", parse_heading, issues),
        metadata: block.metadata(&[
            keys::ID,
            keys::TYPE,
            keys::X,
            keys::Z,
            keys::NAME,
            keys::SHAPE,
            keys::HEADING,
        ]),
    };
    if let Err(err) = map.markers.insert(&id, marker) {
        issues.push(duplicate(block, "marker", &err.id));
    }
}

fn approach_block(map: &mut TrackMap, block: &Block, issues: &mut Vec<MapIssue>) {
    let Some(sector_id) = block.value(keys::SECTOR).or(block.id()).map(str::to_owned) else {
        issues.push(MapIssue::error(
            MapIssueKind::Section,
            block.line,
            "`[approach]` needs a sector (use `[approach: sector]` or `sector =`)",
        ));
        return;
    };

    let approach = Approach {
        sector_id: sector_id.clone(),
        name: opt_string(block, keys::NAME),
        entry_portal_id: opt_string(block, keys::ENTRY_PORTAL),
        exit_portal_id: opt_string(block, keys::EXIT_PORTAL),
        entry_heading_deg: opt_parsed(block, keys::ENTRY_HEADING, "heading", parse_heading, issues),
        exit_heading_deg: opt_parsed(block, keys::EXIT_HEADING, "heading", parse_heading, issues),
        width_m: opt_parsed(block, keys::WIDTH, "number", parse_f64, issues),
        length_m: opt_parsed(block, keys::LENGTH, "number", parse_f64, issues),
        tolerance_deg: opt_parsed(block, keys::TOLERANCE, "number", parse_f64, issues),
        metadata: block.metadata(&[
            keys::ID,
            keys::SECTOR,
            keys::NAME,
            keys::ENTRY_PORTAL,
            keys::EXIT_PORTAL,
            keys::ENTRY_HEADING,
            keys::EXIT_HEADING,
            keys::WIDTH,
            keys::LENGTH,
            keys::TOLERANCE,
        ]),
    };
    if map.approaches.insert(&sector_id, approach).is_err() {
        issues.push(MapIssue::error(
            MapIssueKind::Id,
            block.line,
            format!("sector `{sector_id}` already has an approach"),
        ));
    }
}

fn duplicate(block: &Block, what: &str, id: &str) -> MapIssue {
    MapIssue::error(MapIssueKind::Id, block.line, format!("duplicate {what} id `{id}`"))
}
