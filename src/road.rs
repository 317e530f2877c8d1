//! Per-position road derivation: merges cell defaults, path widths, sector
//! and area overrides, and shape dimensions into one [`RoadView`].

use log::trace;

use crate::{
    direction::Direction,
    index::SpatialIndex,
    math::{CellPoint, Geometry, WorldPoint},
    model::{Cell, EntityMetadata, Noise, Surface},
    motion::MovementState,
};

/// How the road bends at a cell, as heard from the driver's seat.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CurveType {
    Straight,
    Left,
    Right,
}

/// Everything the simulation needs to know about the road under a position.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadView {
    /// Distance from the centerline to the left edge, in meters.
    pub left: f64,
    /// Distance from the centerline to the right edge, in meters.
    pub right: f64,
    pub surface: Surface,
    pub noise: Noise,
    pub curve_type: CurveType,
    pub length_m: f64,
    pub is_safe_zone: bool,
    pub is_out_of_bounds: bool,
    pub is_closed: bool,
    pub is_restricted: bool,
    pub requires_stop: bool,
    pub requires_yield: bool,
    pub min_speed_kph: Option<f64>,
    pub max_speed_kph: Option<f64>,
}

impl RoadView {
    pub fn width_m(&self) -> f64 {
        self.left + self.right
    }
}

pub fn road_at(index: &SpatialIndex<'_>, state: &MovementState) -> RoadView {
    road_at_pos(index, state.cell, state.position, state.heading)
}

/// Core derivation: cell defaults, then path width, then sector overrides,
/// then area overrides with shape dimensions as the fallback.
pub fn road_at_pos(
    index: &SpatialIndex<'_>,
    cell_at: CellPoint,
    position: WorldPoint,
    heading: Direction,
) -> RoadView {
    let meta = index.map().metadata();
    let cell = index.cell(cell_at);

    let mut width = cell.and_then(|c| c.width_m).unwrap_or(meta.default_width_m);
    let mut surface = cell.and_then(|c| c.surface).unwrap_or(meta.default_surface);
    let mut noise = cell.and_then(|c| c.noise).unwrap_or(meta.default_noise);
    let mut safe = cell.is_some_and(|c| c.is_safe_zone);
    let mut length = meta.cell_size_m;

    // Path width override: the last containing path wins
    let mut on_path = false;
    for path in index.paths_at(position) {
        on_path = true;
        if let Some(w) = path.width_m
            && w > 0.0
        {
            width = w;
        }
    }

    let mut is_closed = false;
    let mut is_restricted = false;
    let mut requires_stop = false;
    let mut requires_yield = false;
    let mut min_speed_kph = None;
    let mut max_speed_kph = None;

    for sector in index.sectors_at(position) {
        if let Some(s) = sector.surface {
            surface = s;
        }
        if let Some(n) = sector.noise {
            noise = n;
        }
        safe |= sector.is_safe_zone();
        metadata_dimensions(&sector.metadata, &mut width, &mut length);

        let rules = sector.rules();
        is_closed |= rules.is_closed;
        is_restricted |= rules.is_restricted;
        requires_stop |= rules.requires_stop;
        requires_yield |= rules.requires_yield;
        if rules.min_speed_kph.is_some() {
            min_speed_kph = rules.min_speed_kph;
        }
        if rules.max_speed_kph.is_some() {
            max_speed_kph = rules.max_speed_kph;
        }
    }

    let mut last_area = None;
    for (area, geometry) in index.areas_with_geometry_at(position) {
        if let Some(s) = area.surface {
            surface = s;
        }
        if let Some(n) = area.noise {
            noise = n;
        }
        safe |= area.is_safe_zone();
        let mut sized = false;
        if let Some(w) = area.width_m {
            width = w;
            sized = true;
        }
        sized |= metadata_dimensions(&area.metadata, &mut width, &mut length);
        last_area = Some((geometry, sized));
    }

    // The dominant area's shape sizes the road when nothing explicit did
    if let Some((geometry, false)) = last_area {
        shape_dimensions(geometry, heading, &mut width, &mut length);
    }

    let is_out_of_bounds = if index.has_path_geometry() {
        !(on_path || safe)
    } else {
        cell.is_none()
    };

    trace!(
        target: "road",
        "road at {cell_at}/{position}: width {width:.1}, surface {surface}, oob {is_out_of_bounds}"
    );

    RoadView {
        left: width / 2.0,
        right: width / 2.0,
        surface,
        noise,
        curve_type: curve_type(cell, heading),
        length_m: length,
        is_safe_zone: safe,
        is_out_of_bounds,
        is_closed,
        is_restricted,
        requires_stop,
        requires_yield,
        min_speed_kph,
        max_speed_kph,
    }
}

/// Walks ahead in the current heading and returns the first road view whose
/// curve type differs from the one under the vehicle; `None` when nothing
/// changes inside the horizon or the forward path breaks.
pub fn next_road(
    index: &SpatialIndex<'_>,
    state: &MovementState,
    horizon_m: f64,
) -> Option<RoadView> {
    let cell_size = index.cell_size_m();
    let steps = (horizon_m / cell_size).ceil() as u32;
    let current = curve_type(index.cell(state.cell), state.heading);

    let mut at = state.cell;
    for _ in 0..steps {
        let next = index.can_step(at, state.heading)?;
        let view = road_at_pos(index, next, index.cell_to_world(next), state.heading);
        if view.curve_type != current {
            return Some(view);
        }
        at = next;
    }
    None
}

/// Dimension overrides carried in sector/area metadata.
fn metadata_dimensions(metadata: &EntityMetadata, width: &mut f64, length: &mut f64) -> bool {
    let get = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| metadata.get(*k))
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| *v > 0.0)
    };

    let mut any = false;
    if let Some(w) = get(&["intersection_width", "width", "lane_width"]) {
        *width = w;
        any = true;
    }
    if let Some(l) = get(&["intersection_length", "length"]) {
        *length = l;
        any = true;
    }
    any
}

/// Rectangles size the road aligned to the heading (N/S: width along x,
/// length along z; E/W swapped); circles contribute their diameter to both.
fn shape_dimensions(geometry: &Geometry, heading: Direction, width: &mut f64, length: &mut f64) {
    let (extent_x, extent_z) = match geometry {
        Geometry::Rect(r) => (r.width, r.height),
        Geometry::Circle(c) => {
            *width = c.radius * 2.0;
            *length = c.radius * 2.0;
            return;
        }
        Geometry::Polygon(_) | Geometry::Polyline(_) => {
            let b = geometry.bounds();
            (b.width(), b.height())
        }
    };
    match heading {
        Direction::North | Direction::South => {
            *width = extent_x;
            *length = extent_z;
        }
        Direction::East | Direction::West => {
            *width = extent_z;
            *length = extent_x;
        }
    }
}

/// Exit-pattern curve inference: three or more exits or a straight-through
/// pair read as straight; exactly behind-plus-side reads as a turn.
fn curve_type(cell: Option<&Cell>, heading: Direction) -> CurveType {
    use crate::direction::ExitSet;

    let Some(cell) = cell else {
        return CurveType::Straight;
    };
    let behind = heading.opposite();
    if cell.exits.len() == 2 {
        if cell.exits == ExitSet::of(&[behind, heading.right()]) {
            return CurveType::Right;
        }
        if cell.exits == ExitSet::of(&[behind, heading.left()]) {
            return CurveType::Left;
        }
    }
    CurveType::Straight
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::{motion::make_start_state, parser::parse_str};
    use Direction::*;

    fn view(text: &str, x: i32, z: i32, heading: Direction) -> RoadView {
        let map = parse_str(text).map;
        let index = SpatialIndex::build(&map);
        let at = CellPoint::new(x, z);
        road_at_pos(&index, at, index.cell_to_world(at), heading)
    }

    #[test]
    fn cell_defaults_flow_through() {
        let road = view(
            "[meta]\ncell_size = 2\nwidth = 9\nsurface = gravel\nnoise = wind\n\
             [cell]\nx = 0\nz = 0\n",
            0,
            0,
            North,
        );
        assert_eq!(road.width_m(), 9.0);
        assert_eq!(road.left, 4.5);
        assert_eq!(road.surface, Surface::Gravel);
        assert_eq!(road.noise, Noise::Wind);
        assert_eq!(road.length_m, 2.0);
        assert!(!road.is_out_of_bounds);
    }

    #[test]
    fn cell_values_override_defaults() {
        let road = view(
            "[meta]\nwidth = 9\n[cell]\nx = 0\nz = 0\nwidth = 4\nsurface = sand\n",
            0,
            0,
            North,
        );
        assert_eq!(road.width_m(), 4.0);
        assert_eq!(road.surface, Surface::Sand);
    }

    #[test]
    fn path_width_wins_over_cell() {
        let road = view(
            "[meta]\ncell_size = 1\n[cell]\nx = 0\nz = 0\nwidth = 4\n\
             [shape: ribbon]\ntype = rectangle\nx = -0.5\nz = -0.5\nwidth = 3\nheight = 3\n\
             [path: main]\ntype = road\nshape = ribbon\nwidth = 12\n",
            0,
            0,
            North,
        );
        assert_eq!(road.width_m(), 12.0);
        assert!(!road.is_out_of_bounds);
    }

    #[test]
    fn sector_overrides_surface_and_speed() {
        let road = view(
            "[meta]\ncell_size = 1\n[cell]\nx = 0\nz = 0\n\
             [shape: s]\ntype = rectangle\nx = -1\nz = -1\nwidth = 4\nheight = 4\n\
             [area: a]\ntype = slowzone\nshape = s\n\
             [sector: pit]\ntype = pitlane\narea = a\nsurface = concrete\nflags = restricted\nmax_speed = 60\n",
            0,
            0,
            North,
        );
        assert_eq!(road.surface, Surface::Concrete);
        assert!(road.is_restricted);
        assert_eq!(road.max_speed_kph, Some(60.0));
        assert_eq!(road.min_speed_kph, None);
    }

    #[test]
    fn area_shape_sizes_road_by_heading() {
        let text = "[meta]\ncell_size = 1\n[cell]\nx = 0\nz = 0\n\
                    [shape: box]\ntype = rectangle\nx = -2\nz = -4\nwidth = 4\nheight = 10\n\
                    [area: zone]\ntype = slowzone\nshape = box\n";
        let north = view(text, 0, 0, North);
        assert_eq!(north.width_m(), 4.0);
        assert_eq!(north.length_m, 10.0);

        let east = view(text, 0, 0, East);
        assert_eq!(east.width_m(), 10.0);
        assert_eq!(east.length_m, 4.0);
    }

    #[test]
    fn area_metadata_beats_shape_dimensions() {
        let road = view(
            "[meta]\ncell_size = 1\n[cell]\nx = 0\nz = 0\n\
             [shape: box]\ntype = rectangle\nx = -2\nz = -4\nwidth = 4\nheight = 10\n\
             [area: zone]\ntype = slowzone\nshape = box\nintersection_width = 7\n",
            0,
            0,
            North,
        );
        assert_eq!(road.width_m(), 7.0);
    }

    #[test]
    fn safe_zone_area_marks_road() {
        let text = "[meta]\ncell_size = 1\n[cell]\nx = 5\nz = 5\n\
                    [shape: poly]\ntype = polygon\npoints = 0,0; 10,0; 10,10; 0,10\n\
                    [area: z1]\ntype = safezone\nshape = poly\n";
        let map = parse_str(text).map;
        let index = SpatialIndex::build(&map);
        let inside = road_at_pos(&index, CellPoint::new(5, 5), WorldPoint::new(5.0, 5.0), North);
        assert!(inside.is_safe_zone);
        let outside = road_at_pos(&index, CellPoint::new(11, 5), WorldPoint::new(11.0, 5.0), North);
        assert!(!outside.is_safe_zone);
    }

    #[test_case("NS", North, CurveType::Straight; "straight through")]
    #[test_case("SE", North, CurveType::Right; "behind plus right")]
    #[test_case("SW", North, CurveType::Left; "behind plus left")]
    #[test_case("NES", North, CurveType::Straight; "three exits")]
    #[test_case("NE", North, CurveType::Straight; "ahead plus side")]
    #[test_case("WN", East, CurveType::Left; "westbound pair heading east")]
    fn curve_inference(exits: &str, heading: Direction, expected: CurveType) {
        let road = view(
            &format!("[meta]\ncell_size = 1\n[cell]\nx = 0\nz = 0\nexits = {exits}\n"),
            0,
            0,
            heading,
        );
        assert_eq!(road.curve_type, expected);
    }

    #[test]
    fn out_of_bounds_with_and_without_paths() {
        // No paths: cell existence decides
        let no_paths = "[meta]\ncell_size = 1\n[cell]\nx = 0\nz = 0\n";
        assert!(!view(no_paths, 0, 0, North).is_out_of_bounds);
        assert!(view(no_paths, 3, 3, North).is_out_of_bounds);

        // With a path: only the ribbon (or a safe zone) is in bounds
        let with_path = "[meta]\ncell_size = 1\n[cell]\nx = 0\nz = 0\n[cell]\nx = 3\nz = 3\n\
                         [shape: ribbon]\ntype = rectangle\nx = -0.5\nz = -0.5\nwidth = 1\nheight = 1\n\
                         [path: main]\ntype = road\nshape = ribbon\n";
        assert!(!view(with_path, 0, 0, North).is_out_of_bounds);
        assert!(view(with_path, 3, 3, North).is_out_of_bounds);
    }

    #[test]
    fn next_road_reports_first_curve_change() {
        // Straight strip that bends right at z = 3
        let text = "[meta]\ncell_size = 1\nstart_x = 0\nstart_z = 0\n\
                    [line]\nx = 0\nz = 0\nlength = 3\ndir = N\n\
                    [cell]\nx = 0\nz = 3\nexits = SE\n\
                    [line]\nx = 1\nz = 3\nlength = 2\ndir = E\n";
        let map = parse_str(text).map;
        let index = SpatialIndex::build(&map);
        let state = make_start_state(&map);

        let upcoming = next_road(&index, &state, 30.0).unwrap();
        assert_eq!(upcoming.curve_type, CurveType::Right);

        // A two-cell horizon stops short of the bend
        assert!(next_road(&index, &state, 2.0).is_none());
    }

    #[test]
    fn next_road_none_when_path_breaks() {
        let text = "[meta]\ncell_size = 1\n[cell]\nx = 0\nz = 0\nexits = N\n[cell]\nx = 0\nz = 1\nexits = S\n";
        let map = parse_str(text).map;
        let index = SpatialIndex::build(&map);
        let state = make_start_state(&map);
        assert!(next_road(&index, &state, 10.0).is_none());
    }
}
