//! The assembled track map: every entity a `.tsm` file declares, owned in
//! one place and immutable after parsing.
//!
//! Identifiers are case-insensitive and unique within their entity kind;
//! lookups return non-owning references. Cells are kept ordered by
//! coordinate so every enumeration downstream (validator, writer) is
//! deterministic.

use std::collections::{BTreeMap, HashMap};

use enum_iterator::Sequence;

use crate::{
    direction::Direction,
    math::{CellPoint, WorldPoint},
};

pub mod cell;
pub mod entities;

pub use cell::{Cell, Noise, Surface};
pub use entities::{
    Approach, Area, AreaKind, Beacon, BeaconKind, EntityMetadata, Flags, Link, LinkDirection,
    Marker, MarkerKind, Path, PathKind, Portal, PortalRole, Sector, SectorKind, SectorRules, Shape,
};

/// Weather selected by the map, forwarded to the ambience mixer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Sequence)]
pub enum Weather {
    Sunny,
    Rain,
    Wind,
    Storm,
    Fog,
    Snow,
}

impl Weather {
    pub const fn as_str(self) -> &'static str {
        use Weather::*;
        match self {
            Sunny => "sunny",
            Rain => "rain",
            Wind => "wind",
            Storm => "storm",
            Fog => "fog",
            Snow => "snow",
        }
    }

    pub fn parse(s: &str) -> Option<Weather> {
        let s = s.trim().to_ascii_lowercase();
        enum_iterator::all::<Weather>().find(|v| v.as_str() == s)
    }
}

/// Background ambience loop for the whole map.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Sequence)]
pub enum Ambience {
    None,
    Desert,
    Airport,
    City,
    Forest,
    Ocean,
}

impl Ambience {
    pub const fn as_str(self) -> &'static str {
        use Ambience::*;
        match self {
            None => "none",
            Desert => "desert",
            Airport => "airport",
            City => "city",
            Forest => "forest",
            Ocean => "ocean",
        }
    }

    pub fn parse(s: &str) -> Option<Ambience> {
        let s = s.trim().to_ascii_lowercase();
        enum_iterator::all::<Ambience>().find(|v| v.as_str() == s)
    }
}

/// Where a freshly spawned vehicle stands and which way it faces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StartPose {
    pub cell: CellPoint,
    pub heading: Direction,
}

impl Default for StartPose {
    fn default() -> Self {
        StartPose { cell: CellPoint::new(0, 0), heading: Direction::North }
    }
}

/// Map-level attributes from the `[meta]` block.
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    pub name: String,
    pub cell_size_m: f64,
    pub weather: Weather,
    pub ambience: Ambience,
    pub default_surface: Surface,
    pub default_noise: Noise,
    pub default_width_m: f64,
    pub start: StartPose,
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata {
            name: String::new(),
            cell_size_m: crate::DEFAULT_CELL_SIZE_M,
            weather: Weather::Sunny,
            ambience: Ambience::None,
            default_surface: Surface::Asphalt,
            default_noise: Noise::None,
            default_width_m: crate::DEFAULT_ROAD_WIDTH_M,
            start: StartPose::default(),
        }
    }
}

/// Insertion-ordered, case-insensitively keyed entity store.
#[derive(Clone, Debug)]
pub(crate) struct Registry<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Registry::new()
    }
}

impl<T> Registry<T> {
    pub(crate) fn new() -> Self {
        Registry { items: Vec::new(), index: HashMap::new() }
    }

    /// Inserts under a case-folded key; a duplicate keeps the first entry and
    /// reports the collision.
    pub(crate) fn insert(&mut self, id: &str, item: T) -> Result<(), DuplicateId> {
        let key = fold_id(id);
        if self.index.contains_key(&key) {
            return Err(DuplicateId { id: id.to_owned() });
        }
        self.index.insert(key, self.items.len());
        self.items.push(item);
        Ok(())
    }

    pub(crate) fn get(&self, id: &str) -> Option<&T> {
        self.items.get(*self.index.get(&fold_id(id))?)
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(&fold_id(id)).copied()
    }

    pub(crate) fn items(&self) -> &[T] {
        &self.items
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T: PartialEq> PartialEq for Registry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate id `{id}`")]
pub(crate) struct DuplicateId {
    pub id: String,
}

pub(crate) fn fold_id(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

/// Case-insensitive id comparison, the equality every cross-reference uses.
pub fn same_id(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// The owning model of one parsed `.tsm` file. Read-only after assembly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackMap {
    pub(crate) metadata: Metadata,
    pub(crate) cells: BTreeMap<CellPoint, Cell>,
    pub(crate) shapes: Registry<Shape>,
    pub(crate) sectors: Registry<Sector>,
    pub(crate) areas: Registry<Area>,
    pub(crate) portals: Registry<Portal>,
    pub(crate) links: Registry<Link>,
    pub(crate) paths: Registry<Path>,
    pub(crate) beacons: Registry<Beacon>,
    pub(crate) markers: Registry<Marker>,
    /// Keyed by sector id; at most one approach per sector.
    pub(crate) approaches: Registry<Approach>,
}

impl TrackMap {
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn cell_size_m(&self) -> f64 {
        self.metadata.cell_size_m
    }

    pub fn cells(&self) -> &BTreeMap<CellPoint, Cell> {
        &self.cells
    }

    pub fn cell(&self, at: CellPoint) -> Option<&Cell> {
        self.cells.get(&at)
    }

    pub fn cell_at(&self, x: i32, z: i32) -> Option<&Cell> {
        self.cell(CellPoint::new(x, z))
    }

    pub fn shapes(&self) -> &[Shape] {
        self.shapes.items()
    }

    pub fn shape(&self, id: &str) -> Option<&Shape> {
        self.shapes.get(id)
    }

    pub fn sectors(&self) -> &[Sector] {
        self.sectors.items()
    }

    pub fn sector(&self, id: &str) -> Option<&Sector> {
        self.sectors.get(id)
    }

    pub fn areas(&self) -> &[Area] {
        self.areas.items()
    }

    pub fn area(&self, id: &str) -> Option<&Area> {
        self.areas.get(id)
    }

    pub fn portals(&self) -> &[Portal] {
        self.portals.items()
    }

    pub fn portal(&self, id: &str) -> Option<&Portal> {
        self.portals.get(id)
    }

    pub fn links(&self) -> &[Link] {
        self.links.items()
    }

    pub fn link(&self, id: &str) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn paths(&self) -> &[Path] {
        self.paths.items()
    }

    pub fn path(&self, id: &str) -> Option<&Path> {
        self.paths.get(id)
    }

    pub fn beacons(&self) -> &[Beacon] {
        self.beacons.items()
    }

    pub fn beacon(&self, id: &str) -> Option<&Beacon> {
        self.beacons.get(id)
    }

    pub fn markers(&self) -> &[Marker] {
        self.markers.items()
    }

    pub fn marker(&self, id: &str) -> Option<&Marker> {
        self.markers.get(id)
    }

    pub fn approaches(&self) -> &[Approach] {
        self.approaches.items()
    }

    pub fn approach_for(&self, sector_id: &str) -> Option<&Approach> {
        self.approaches.get(sector_id)
    }

    /// Center of cell `(x, z)` in world coordinates.
    pub fn cell_to_world(&self, at: CellPoint) -> WorldPoint {
        at.to_world(self.metadata.cell_size_m)
    }

    /// The cell containing a world position, rounding half away from zero.
    pub fn world_to_cell(&self, at: WorldPoint) -> CellPoint {
        at.to_cell(self.metadata.cell_size_m)
    }

    /// Shape geometry behind an area, if the reference resolves.
    pub fn area_geometry(&self, area: &Area) -> Option<&crate::math::Geometry> {
        self.shape(&area.shape_id).map(|s| &s.geometry)
    }

    pub fn summary(&self) -> MapSummary {
        let mut bounds: Option<(CellPoint, CellPoint)> = None;
        for &at in self.cells.keys() {
            bounds = Some(match bounds {
                None => (at, at),
                Some((min, max)) => (
                    CellPoint::new(min.x.min(at.x), min.z.min(at.z)),
                    CellPoint::new(max.x.max(at.x), max.z.max(at.z)),
                ),
            });
        }
        MapSummary {
            name: self.metadata.name.clone(),
            start: self.metadata.start,
            cell_count: self.cells.len(),
            cell_bounds: bounds,
            shape_count: self.shapes.len(),
            sector_count: self.sectors.len(),
            area_count: self.areas.len(),
            portal_count: self.portals.len(),
            link_count: self.links.len(),
            path_count: self.paths.len(),
            beacon_count: self.beacons.len(),
            marker_count: self.markers.len(),
            approach_count: self.approaches.len(),
        }
    }
}

/// Entity counts and grid extent, for the `info` command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapSummary {
    pub name: String,
    pub start: StartPose,
    pub cell_count: usize,
    pub cell_bounds: Option<(CellPoint, CellPoint)>,
    pub shape_count: usize,
    pub sector_count: usize,
    pub area_count: usize,
    pub portal_count: usize,
    pub link_count: usize,
    pub path_count: usize,
    pub beacon_count: usize,
    pub marker_count: usize,
    pub approach_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_ids_are_case_insensitive() {
        let mut reg = Registry::new();
        reg.insert("Pit", 1).unwrap();
        assert_eq!(reg.get("pit"), Some(&1));
        assert_eq!(reg.get("  PIT "), Some(&1));
        assert_eq!(reg.get("paddock"), None);
    }

    #[test]
    fn registry_keeps_first_on_duplicate() {
        let mut reg = Registry::new();
        reg.insert("pit", 1).unwrap();
        let err = reg.insert("PIT", 2).unwrap_err();
        assert_eq!(err.id, "PIT");
        assert_eq!(reg.get("pit"), Some(&1));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn summary_bounds_cover_all_cells() {
        let mut map = TrackMap::default();
        map.cells.insert(CellPoint::new(-2, 3), Cell::default());
        map.cells.insert(CellPoint::new(5, -1), Cell::default());
        let summary = map.summary();
        assert_eq!(summary.cell_count, 2);
        assert_eq!(
            summary.cell_bounds,
            Some((CellPoint::new(-2, -1), CellPoint::new(5, 3)))
        );
    }
}
