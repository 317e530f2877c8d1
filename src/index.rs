//! Spatial lookup over a validated map, built once and queried every tick.
//!
//! All containment queries pre-filter on bounding boxes so a query touches
//! only the candidates whose box contains the point, not every region on the
//! map. Stacks come back in insertion order; callers treat the last entry as
//! dominant.

use std::collections::HashMap;

use log::trace;

use crate::{
    direction::Direction,
    math::{Bounds, CellPoint, Circle, Geometry, WorldPoint, heading_delta_deg},
    model::{Area, Beacon, Cell, Path, Portal, Sector, TrackMap},
};

/// A resolved region: the entity plus its shape geometry and cached bounds.
#[derive(Clone, Copy, Debug)]
struct Region<'a> {
    geometry: &'a Geometry,
    bounds: Bounds,
}

impl<'a> Region<'a> {
    fn resolve(map: &'a TrackMap, shape_id: &str) -> Option<Region<'a>> {
        let shape = map.shape(shape_id)?;
        Some(Region { geometry: &shape.geometry, bounds: shape.geometry.bounds() })
    }

    fn contains(&self, p: WorldPoint) -> bool {
        self.bounds.contains(p) && self.geometry.contains(p)
    }
}

/// What makes a beacon fire: its referenced shape, or a circle of its
/// activation radius around its position.
#[derive(Clone, Copy, Debug)]
enum Activation<'a> {
    Shaped(Region<'a>),
    Radius(Circle),
}

impl Activation<'_> {
    fn resolve<'a>(map: &'a TrackMap, beacon: &Beacon) -> Option<Activation<'a>> {
        if let Some(shape_id) = &beacon.shape_id
            && let Some(region) = Region::resolve(map, shape_id)
        {
            return Some(Activation::Shaped(region));
        }
        beacon.activation_radius_m.map(|radius| {
            Activation::Radius(Circle::new(beacon.position.x, beacon.position.z, radius))
        })
    }

    fn contains(&self, p: WorldPoint) -> bool {
        match self {
            Activation::Shaped(region) => region.contains(p),
            Activation::Radius(circle) => circle.contains(p),
        }
    }
}

/// Result of a portal-aware position query.
#[derive(Clone, Copy, Debug)]
pub struct Located<'a> {
    pub sector: &'a Sector,
    pub portal: Option<&'a Portal>,
    /// Vehicle heading minus portal heading, normalized to `(-180, 180]`.
    /// `None` when the chosen portal declares no headings.
    pub heading_delta_deg: Option<f64>,
}

pub struct SpatialIndex<'a> {
    map: &'a TrackMap,
    cells: HashMap<CellPoint, &'a Cell>,
    /// Parallel to `map.areas()`; `None` when the shape reference is broken.
    area_regions: Vec<Option<Region<'a>>>,
    /// Parallel to `map.sectors()`; index into `map.areas()`.
    sector_areas: Vec<Option<usize>>,
    /// Parallel to `map.paths()`.
    path_regions: Vec<Option<Region<'a>>>,
    /// Parallel to `map.sectors()`; indices into `map.portals()`.
    sector_portals: Vec<Vec<usize>>,
    /// Parallel to `map.beacons()`.
    beacon_activations: Vec<Option<Activation<'a>>>,
    has_path_geometry: bool,
}

impl<'a> SpatialIndex<'a> {
    pub fn build(map: &'a TrackMap) -> SpatialIndex<'a> {
        let cells = map.cells().iter().map(|(&at, cell)| (at, cell)).collect();

        let area_regions: Vec<_> =
            map.areas().iter().map(|a| Region::resolve(map, &a.shape_id)).collect();

        let sector_areas = map
            .sectors()
            .iter()
            .map(|s| s.area_id.as_deref().and_then(|id| map.areas.index_of(id)))
            .collect();

        let path_regions: Vec<_> = map
            .paths()
            .iter()
            .map(|p| p.shape_id.as_deref().and_then(|id| Region::resolve(map, id)))
            .collect();
        let has_path_geometry = path_regions.iter().any(Option::is_some);

        let mut sector_portals = vec![Vec::new(); map.sectors().len()];
        for (i, portal) in map.portals().iter().enumerate() {
            if let Some(sector_ix) = map.sectors.index_of(&portal.sector_id) {
                sector_portals[sector_ix].push(i);
            }
        }

        let beacon_activations =
            map.beacons().iter().map(|b| Activation::resolve(map, b)).collect();

        SpatialIndex {
            map,
            cells,
            area_regions,
            sector_areas,
            path_regions,
            sector_portals,
            beacon_activations,
            has_path_geometry,
        }
    }

    pub fn map(&self) -> &'a TrackMap {
        self.map
    }

    pub fn cell_size_m(&self) -> f64 {
        self.map.cell_size_m()
    }

    pub fn cell(&self, at: CellPoint) -> Option<&'a Cell> {
        self.cells.get(&at).copied()
    }

    pub fn cell_to_world(&self, at: CellPoint) -> WorldPoint {
        at.to_world(self.cell_size_m())
    }

    /// Whether any path on the map carries resolvable geometry; when none
    /// does, bounds checks fall back to cell existence.
    pub fn has_path_geometry(&self) -> bool {
        self.has_path_geometry
    }

    /// Stack of areas containing the point, in insertion order.
    pub fn areas_at(&self, p: WorldPoint) -> impl Iterator<Item = &'a Area> + '_ {
        self.areas_with_geometry_at(p).map(|(area, _)| area)
    }

    /// Area stack paired with each area's geometry, for dimension-aware
    /// consumers.
    pub fn areas_with_geometry_at(
        &self,
        p: WorldPoint,
    ) -> impl Iterator<Item = (&'a Area, &'a Geometry)> + '_ {
        self.map.areas().iter().zip(&self.area_regions).filter_map(move |(area, region)| {
            let region = region.as_ref()?;
            region.contains(p).then_some((area, region.geometry))
        })
    }

    /// Stack of sectors whose backing area contains the point, in insertion
    /// order.
    pub fn sectors_at(&self, p: WorldPoint) -> impl Iterator<Item = &'a Sector> + '_ {
        self.sector_indices_at(p).map(|i| &self.map.sectors()[i])
    }

    fn sector_indices_at(&self, p: WorldPoint) -> impl Iterator<Item = usize> + '_ {
        self.sector_areas.iter().enumerate().filter_map(move |(i, area_ix)| {
            let region = self.area_regions[(*area_ix)?].as_ref()?;
            region.contains(p).then_some(i)
        })
    }

    /// Stack of paths whose shape contains the point, in insertion order.
    pub fn paths_at(&self, p: WorldPoint) -> impl Iterator<Item = &'a Path> + '_ {
        self.map.paths().iter().zip(&self.path_regions).filter_map(move |(path, region)| {
            region.as_ref().is_some_and(|r| r.contains(p)).then_some(path)
        })
    }

    /// The containing sector (last in the stack) and, among its portals, the
    /// nearest one aligned with `heading_deg`. Ties break by distance, then
    /// absolute heading delta, then id.
    pub fn locate(&self, p: WorldPoint, heading_deg: f64) -> Option<Located<'a>> {
        let sector_ix = self.sector_indices_at(p).last()?;
        let sector = &self.map.sectors()[sector_ix];

        let mut best: Option<(PortalRank, &'a Portal, Option<f64>)> = None;
        for &portal_ix in &self.sector_portals[sector_ix] {
            let portal = &self.map.portals()[portal_ix];
            let delta = portal
                .applicable_heading_deg(heading_deg)
                .map(|h| heading_delta_deg(heading_deg, h));
            if let Some(delta) = delta
                && delta.abs() > crate::PORTAL_ALIGN_TOLERANCE_DEG
            {
                trace!(
                    target: "index",
                    "portal `{}` misaligned by {delta:.1} deg, skipping", portal.id
                );
                continue;
            }
            let rank = PortalRank {
                distance_sq: portal.position.distance_sq(p),
                abs_delta: delta.map_or(0.0, f64::abs),
                id: crate::model::fold_id(&portal.id),
            };
            if best.as_ref().is_none_or(|(current, _, _)| rank.beats(current)) {
                best = Some((rank, portal, delta));
            }
        }

        let (portal, heading_delta_deg) = match best {
            Some((_, portal, delta)) => (Some(portal), delta),
            None => (None, None),
        };
        Some(Located { sector, portal, heading_delta_deg })
    }

    /// Beacons whose activation region contains the point and whose declared
    /// heading (if any) is aligned with `heading_deg`. This is the cue feed
    /// for the audio layer: each yielded beacon should sound.
    pub fn active_beacons(
        &self,
        p: WorldPoint,
        heading_deg: f64,
    ) -> impl Iterator<Item = &'a Beacon> + '_ {
        self.map.beacons().iter().zip(&self.beacon_activations).filter_map(
            move |(beacon, activation)| {
                if !activation.as_ref().is_some_and(|a| a.contains(p)) {
                    return None;
                }
                if let Some(required) = beacon.heading_deg
                    && heading_delta_deg(heading_deg, required).abs()
                        > crate::PORTAL_ALIGN_TOLERANCE_DEG
                {
                    return None;
                }
                Some(beacon)
            },
        )
    }

    /// One grid step from `from` toward `travel_dir`, if the exit rules allow
    /// it. The neighbor must exist; with exits declared on either side, one
    /// of the two must advertise the move.
    pub fn can_step(&self, from: CellPoint, travel_dir: Direction) -> Option<CellPoint> {
        let to = from + travel_dir.offset();
        let to_cell = self.cell(to)?;
        let from_exits = self.cell(from).map(|c| c.exits).unwrap_or_default();
        // Loose walkability: two cells with no exits declared at all
        if from_exits.is_empty() && to_cell.exits.is_empty() {
            return Some(to);
        }
        (from_exits.contains(travel_dir) || to_cell.exits.contains(travel_dir.opposite()))
            .then_some(to)
    }
}

struct PortalRank {
    distance_sq: f64,
    abs_delta: f64,
    id: String,
}

impl PortalRank {
    fn beats(&self, other: &PortalRank) -> bool {
        (self.distance_sq, self.abs_delta, &self.id)
            < (other.distance_sq, other.abs_delta, &other.id)
    }
}
