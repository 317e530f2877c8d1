//! Structural validation of a parsed map.
//!
//! The validator is pure: it never mutates the model and the same input
//! always yields the same issue list, in the same order. Checks run in a
//! fixed sequence - grid, exit topology, connectivity, cross-references,
//! policies - and every finding that would leave a runtime query undefined
//! is an error; everything else warns.

use std::{
    collections::{HashMap, HashSet},
    num::NonZero,
};

use log::debug;
use new_zealand::nz;
use petgraph::{graphmap::DiGraphMap, visit::Bfs};

use crate::{
    issue::{MapIssue, MapIssueKind, Severity},
    math::CellPoint,
    model::TrackMap,
};

#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// Escalate unreachable cells from warnings to errors.
    pub unreachable_is_error: bool,
    /// Warn when the map declares no safe zone anywhere.
    pub require_safe_zone: bool,
    /// Warn when no cell qualifies as an intersection.
    pub require_intersection: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ValidationResult {
    issues: Vec<MapIssue>,
    pub safe_zone_cells: usize,
    pub intersection_cells: usize,
    pub unreachable_cells: usize,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.issues.iter().all(|i| !i.is_error())
    }

    pub fn issues(&self) -> &[MapIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<MapIssue> {
        self.issues
    }

    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_error()).count()
    }

    /// Counts the occurrences of each issue kind.
    ///
    /// Kinds with 0 occurrences do not appear in the map, as indicated by
    /// the NonZero value type.
    pub fn issue_stats(&self) -> HashMap<MapIssueKind, NonZero<usize>> {
        fn increment(n: &mut NonZero<usize>) {
            *n = n.checked_add(1).unwrap();
        }

        self.issues.iter().fold(HashMap::new(), |mut map, issue| {
            map.entry(issue.kind).and_modify(increment).or_insert(nz!(1));
            map
        })
    }

    fn push(&mut self, issue: MapIssue) {
        self.issues.push(issue);
    }
}

pub fn validate(map: &TrackMap, options: &ValidateOptions) -> ValidationResult {
    let mut result = ValidationResult::default();

    grid_checks(map, &mut result);
    exit_topology_checks(map, &mut result);
    connectivity_check(map, options, &mut result);
    reference_checks(map, &mut result);
    policy_checks(map, options, &mut result);

    debug!(
        target: "validation",
        "validated `{}`: {} issues ({} errors)",
        map.metadata().name,
        result.issues.len(),
        result.error_count()
    );
    result
}

fn grid_checks(map: &TrackMap, result: &mut ValidationResult) {
    if map.cells().is_empty() {
        result.push(MapIssue::error(MapIssueKind::Topology, None, "map has no cells"));
    }
    if map.cell_size_m() < crate::MIN_CELL_SIZE_M {
        result.push(MapIssue::error(
            MapIssueKind::Geometry,
            None,
            format!("cell size {} is below the minimum {}", map.cell_size_m(), crate::MIN_CELL_SIZE_M),
        ));
    }
    let start = map.metadata().start.cell;
    if !map.cells().is_empty() && map.cell(start).is_none() {
        result.push(MapIssue::error(
            MapIssueKind::Topology,
            None,
            format!("start cell {start} does not exist"),
        ));
    }

    for (at, cell) in map.cells() {
        if let Some(width) = cell.width_m
            && width < crate::MIN_CELL_WIDTH_M
        {
            result.push(MapIssue::error(
                MapIssueKind::Geometry,
                None,
                format!("cell {at} width {width} is below the minimum {}", crate::MIN_CELL_WIDTH_M),
            ));
        }
        if cell.exits.is_empty() {
            result.push(MapIssue::warning(
                MapIssueKind::Topology,
                None,
                format!("cell {at} has no exits"),
            ));
        }
        if cell.is_safe_zone {
            result.safe_zone_cells += 1;
        }
        if cell.exits.len() >= 3 {
            result.intersection_cells += 1;
        }
    }
}

/// Every advertised exit must land on an existing neighbor that advertises
/// the opposing exit back.
fn exit_topology_checks(map: &TrackMap, result: &mut ValidationResult) {
    for (&at, cell) in map.cells() {
        for dir in cell.exits.iter() {
            let neighbor_at = at + dir.offset();
            match map.cell(neighbor_at) {
                None => result.push(MapIssue::error(
                    MapIssueKind::Topology,
                    None,
                    format!("cell {at} exits {dir} into missing cell {neighbor_at}"),
                )),
                Some(neighbor) if !neighbor.exits.contains(dir.opposite()) => {
                    result.push(MapIssue::error(
                        MapIssueKind::Topology,
                        None,
                        format!(
                            "cell {at} exits {dir} but neighbor {neighbor_at} has no {} exit",
                            dir.opposite()
                        ),
                    ));
                }
                Some(_) => {}
            }
        }
    }
}

/// Breadth-first flood from the start cell over exit edges.
fn connectivity_check(map: &TrackMap, options: &ValidateOptions, result: &mut ValidationResult) {
    let start = map.metadata().start.cell;
    if map.cells().is_empty() || map.cell(start).is_none() {
        // Already reported; a flood without a start would blame every cell
        return;
    }

    let mut graph: DiGraphMap<CellPoint, ()> = DiGraphMap::new();
    for (&at, cell) in map.cells() {
        graph.add_node(at);
        for dir in cell.exits.iter() {
            let neighbor = at + dir.offset();
            if map.cell(neighbor).is_some() {
                graph.add_edge(at, neighbor, ());
            }
        }
    }

    let mut reached = HashSet::new();
    let mut bfs = Bfs::new(&graph, start);
    while let Some(node) = bfs.next(&graph) {
        reached.insert(node);
    }

    let severity = if options.unreachable_is_error { Severity::Error } else { Severity::Warning };
    for &at in map.cells().keys() {
        if !reached.contains(&at) {
            result.unreachable_cells += 1;
            result.push(MapIssue {
                severity,
                kind: MapIssueKind::Connectivity,
                message: format!("cell {at} is unreachable from the start cell {start}"),
                line: None,
            });
        }
    }
}

fn reference_checks(map: &TrackMap, result: &mut ValidationResult) {
    let unresolved = |what: &str, owner: &str, id: &str, result: &mut ValidationResult| {
        result.push(MapIssue::error(
            MapIssueKind::Id,
            None,
            format!("{owner} references unknown {what} `{id}`"),
        ));
    };

    for area in map.areas() {
        if map.shape(&area.shape_id).is_none() {
            unresolved("shape", &format!("area `{}`", area.id), &area.shape_id, result);
        }
        if let Some(width) = area.width_m
            && width <= 0.0
        {
            result.push(MapIssue::error(
                MapIssueKind::Geometry,
                None,
                format!("area `{}` width must be positive", area.id),
            ));
        }
    }

    for sector in map.sectors() {
        if let Some(area_id) = &sector.area_id
            && map.area(area_id).is_none()
        {
            unresolved("area", &format!("sector `{}`", sector.id), area_id, result);
        }
    }

    for portal in map.portals() {
        if map.sector(&portal.sector_id).is_none() {
            unresolved("sector", &format!("portal `{}`", portal.id), &portal.sector_id, result);
        }
        if portal.width_m < 0.0 {
            result.push(MapIssue::error(
                MapIssueKind::Geometry,
                None,
                format!("portal `{}` width must not be negative", portal.id),
            ));
        }
    }

    for link in map.links() {
        for portal_id in [&link.from_portal_id, &link.to_portal_id] {
            if map.portal(portal_id).is_none() {
                unresolved("portal", &format!("link `{}`", link.id), portal_id, result);
            }
        }
    }

    for path in map.paths() {
        if let Some(shape_id) = &path.shape_id
            && map.shape(shape_id).is_none()
        {
            unresolved("shape", &format!("path `{}`", path.id), shape_id, result);
        }
        for portal_id in [&path.from_portal_id, &path.to_portal_id].into_iter().flatten() {
            if map.portal(portal_id).is_none() {
                unresolved("portal", &format!("path `{}`", path.id), portal_id, result);
            }
        }
        if let Some(width) = path.width_m
            && width < 0.0
        {
            result.push(MapIssue::error(
                MapIssueKind::Geometry,
                None,
                format!("path `{}` width must not be negative", path.id),
            ));
        }
    }

    for beacon in map.beacons() {
        if let Some(sector_id) = &beacon.sector_id
            && map.sector(sector_id).is_none()
        {
            unresolved("sector", &format!("beacon `{}`", beacon.id), sector_id, result);
        }
        if let Some(shape_id) = &beacon.shape_id
            && map.shape(shape_id).is_none()
        {
            unresolved("shape", &format!("beacon `{}`", beacon.id), shape_id, result);
        }
        if beacon.shape_id.is_none() && beacon.activation_radius_m.is_none() {
            result.push(MapIssue::warning(
                MapIssueKind::Policy,
                None,
                format!("beacon `{}` has neither an activation shape nor a radius", beacon.id),
            ));
        }
    }

    for marker in map.markers() {
        if let Some(shape_id) = &marker.shape_id
            && map.shape(shape_id).is_none()
        {
            unresolved("shape", &format!("marker `{}`", marker.id), shape_id, result);
        }
    }

    for approach in map.approaches() {
        let owner = format!("approach for `{}`", approach.sector_id);
        if map.sector(&approach.sector_id).is_none() {
            unresolved("sector", &owner, &approach.sector_id, result);
        }
        for portal_id in
            [&approach.entry_portal_id, &approach.exit_portal_id].into_iter().flatten()
        {
            if map.portal(portal_id).is_none() {
                unresolved("portal", &owner, portal_id, result);
            }
        }
        for (what, value, minimum_exclusive) in [
            ("width", approach.width_m, true),
            ("length", approach.length_m, true),
            ("tolerance", approach.tolerance_deg, false),
        ] {
            if let Some(v) = value
                && (v < 0.0 || (minimum_exclusive && v == 0.0))
            {
                result.push(MapIssue::error(
                    MapIssueKind::Geometry,
                    None,
                    format!("{owner}: {what} must be {}", if minimum_exclusive { "positive" } else { "non-negative" }),
                ));
            }
        }
    }
}

fn policy_checks(map: &TrackMap, options: &ValidateOptions, result: &mut ValidationResult) {
    if options.require_safe_zone {
        let has_safe_area = map.areas().iter().any(|a| a.is_safe_zone());
        if result.safe_zone_cells == 0 && !has_safe_area {
            result.push(MapIssue::warning(MapIssueKind::Policy, None, "map declares no safe zone"));
        }
    }
    if options.require_intersection && result.intersection_cells == 0 {
        result.push(MapIssue::warning(MapIssueKind::Policy, None, "map has no intersection"));
    }
}
