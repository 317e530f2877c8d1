//! Grid movement automaton: distance accumulation, per-cell stepping and
//! sector-transition gating.
//!
//! The automaton never leaves the state in a forbidden place. A blocked grid
//! edge stops the walk at the last good cell; a sector-rule denial rolls the
//! whole call back, bit for bit.

use log::trace;

use crate::{
    direction::Direction,
    index::{Located, SpatialIndex},
    math::{CellPoint, WorldPoint, heading_delta_deg},
    model::{TrackMap, same_id},
    road::{RoadView, road_at, road_at_pos},
};

/// Caller-owned movable entity state. `Copy`, so a pre-call snapshot is the
/// rollback mechanism.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MovementState {
    pub cell: CellPoint,
    pub heading: Direction,
    pub heading_deg: f64,
    pub position: WorldPoint,
    /// Signed odometer of commanded distance.
    pub distance_m: f64,
    /// Sub-cell distance carried into the next call. Always within
    /// `[0, cell_size)`.
    pub pending_m: f64,
}

pub fn make_start_state(map: &TrackMap) -> MovementState {
    let start = map.metadata().start;
    MovementState {
        cell: start.cell,
        heading: start.heading,
        heading_deg: start.heading.heading_deg(),
        position: map.cell_to_world(start.cell),
        distance_m: 0.0,
        pending_m: 0.0,
    }
}

/// What one [`try_move`] call did.
#[derive(Clone, Debug)]
pub struct MoveOutcome {
    /// At least one whole cell was crossed.
    pub moved: bool,
    /// The walk stopped early: a missing/unexported neighbor, out-of-bounds
    /// ground, or a sector that refused the transition.
    pub boundary_hit: bool,
    pub road: RoadView,
}

/// Advances the state by `distance_m` meters toward `heading` (backward when
/// negative). Whole-cell steps honor exit topology and sector rules; the
/// sub-cell remainder accumulates in `pending_m`.
pub fn try_move(
    index: &SpatialIndex<'_>,
    state: &mut MovementState,
    distance_m: f64,
    heading: Direction,
) -> MoveOutcome {
    if distance_m.abs() < crate::MOVE_EPSILON_M {
        return MoveOutcome { moved: false, boundary_hit: false, road: road_at(index, state) };
    }

    let snapshot = *state;
    let sign = distance_m.signum();
    let travel_dir = if sign > 0.0 { heading } else { heading.opposite() };
    let cell_size = index.cell_size_m();

    let meters = state.pending_m + distance_m.abs();
    let steps = (meters / cell_size).floor() as u32;
    let carry = meters - steps as f64 * cell_size;

    let mut committed = 0u32;
    let mut boundary_hit = false;

    for _ in 0..steps {
        let Some(to) = index.can_step(state.cell, travel_dir) else {
            trace!(target: "motion", "blocked {travel_dir} out of {}", state.cell);
            boundary_hit = true;
            break;
        };
        let to_pos = index.cell_to_world(to);
        let road = road_at_pos(index, to, to_pos, heading);
        if road.is_out_of_bounds {
            trace!(target: "motion", "{to} is out of bounds");
            boundary_hit = true;
            break;
        }
        if !transition_allowed(index, state.position, to_pos, travel_dir.heading_deg()) {
            // Never leave the caller inside a forbidden sector
            *state = snapshot;
            trace!(target: "motion", "sector refused transition into {to}, rolled back");
            return MoveOutcome {
                moved: false,
                boundary_hit: true,
                road: road_at(index, state),
            };
        }

        state.cell = to;
        state.position = to_pos;
        committed += 1;
    }

    state.heading = heading;
    state.heading_deg = heading.heading_deg();
    if boundary_hit {
        // Parked at a cell center against the obstacle; nothing carries over
        state.pending_m = 0.0;
        state.distance_m += sign * committed as f64 * cell_size;
    } else {
        state.pending_m = carry;
        state.distance_m += distance_m;
    }

    MoveOutcome { moved: committed > 0, boundary_hit, road: road_at(index, state) }
}

/// Sector gate for one cell step. No destination sector means open ground;
/// otherwise the destination must be open, and a sector change must satisfy
/// both sides' approach rules.
fn transition_allowed(
    index: &SpatialIndex<'_>,
    from_pos: WorldPoint,
    to_pos: WorldPoint,
    heading_deg: f64,
) -> bool {
    let Some(to) = index.locate(to_pos, heading_deg) else {
        return true;
    };
    let rules = to.sector.rules();
    if rules.is_closed || rules.is_restricted {
        trace!(
            target: "motion",
            "sector `{}` is {}", to.sector.id,
            if rules.is_closed { "closed" } else { "restricted" }
        );
        return false;
    }

    let from = index.locate(from_pos, heading_deg);
    let crossing = match &from {
        Some(from) => !same_id(&from.sector.id, &to.sector.id),
        None => true,
    };
    if !crossing {
        return true;
    }

    if let Some(from) = from
        && !approach_allows(index, &from, heading_deg, Side::Exit)
    {
        return false;
    }
    approach_allows(index, &to, heading_deg, Side::Entry)
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Side {
    Entry,
    Exit,
}

/// Approach gating: absent approach data means the transition is allowed;
/// a named portal must be the one detected, a declared heading must be
/// within tolerance.
fn approach_allows(
    index: &SpatialIndex<'_>,
    located: &Located<'_>,
    heading_deg: f64,
    side: Side,
) -> bool {
    let Some(approach) = index.map().approach_for(&located.sector.id) else {
        return true;
    };
    let (portal_id, approach_heading) = match side {
        Side::Entry => (&approach.entry_portal_id, approach.entry_heading_deg),
        Side::Exit => (&approach.exit_portal_id, approach.exit_heading_deg),
    };
    let tolerance = approach.tolerance_deg.unwrap_or(crate::PORTAL_ALIGN_TOLERANCE_DEG);

    if let Some(portal_id) = portal_id {
        let matched = located.portal.is_some_and(|p| same_id(&p.id, portal_id));
        if !matched {
            trace!(
                target: "motion",
                "sector `{}` requires {side:?} through portal `{portal_id}`", located.sector.id
            );
            return false;
        }
    }
    if let Some(required) = approach_heading
        && heading_delta_deg(heading_deg, required).abs() > tolerance
    {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use assertables::{assert_in_delta, assert_le};

    use super::*;
    use crate::parser::parse_str;
    use Direction::*;

    const STRIP: &str = "[meta]\ncell_size = 1\nstart_x = 0\nstart_z = 0\nstart_heading = N\n\
                         [line]\nx = 0\nz = 0\nlength = 10\ndir = N\n";

    fn strip() -> crate::model::TrackMap {
        parse_str(STRIP).map
    }

    #[test]
    fn fractional_distance_accumulates() {
        let map = strip();
        let index = SpatialIndex::build(&map);
        let mut state = make_start_state(&map);

        let outcome = try_move(&index, &mut state, 0.4, North);
        assert!(!outcome.moved);
        assert!(!outcome.boundary_hit);
        assert_eq!(state.cell, CellPoint::new(0, 0));
        assert_eq!(state.pending_m, 0.4);

        let outcome = try_move(&index, &mut state, 0.7, North);
        assert!(outcome.moved);
        assert_eq!(state.cell, CellPoint::new(0, 1));
        assert_in_delta!(state.pending_m, 0.1, 1e-9);
    }

    #[test]
    fn long_move_walks_whole_cells() {
        let map = strip();
        let index = SpatialIndex::build(&map);
        let mut state = make_start_state(&map);

        let outcome = try_move(&index, &mut state, 9.5, North);
        assert!(outcome.moved);
        assert!(!outcome.boundary_hit);
        assert_eq!(state.cell, CellPoint::new(0, 9));
        assert_eq!(state.pending_m, 0.5);
        assert_eq!(state.distance_m, 9.5);
        assert_eq!(state.position, WorldPoint::new(0.0, 9.0));
    }

    #[test]
    fn boundary_stops_at_last_cell() {
        let map = strip();
        let index = SpatialIndex::build(&map);
        let mut state = make_start_state(&map);
        try_move(&index, &mut state, 9.5, North);

        let outcome = try_move(&index, &mut state, 1.0, North);
        assert!(outcome.boundary_hit);
        assert!(!outcome.moved);
        assert_eq!(state.cell, CellPoint::new(0, 9));
        assert_eq!(state.pending_m, 0.0);
        assert_eq!(state.distance_m, 9.5);
    }

    #[test]
    fn tiny_distance_never_mutates() {
        let map = strip();
        let index = SpatialIndex::build(&map);
        let mut state = make_start_state(&map);
        try_move(&index, &mut state, 2.5, North);
        let before = state;

        let outcome = try_move(&index, &mut state, 0.0005, North);
        assert!(!outcome.moved);
        assert!(!outcome.boundary_hit);
        assert_eq!(state, before);

        try_move(&index, &mut state, 0.0, East);
        assert_eq!(state, before);
    }

    #[test]
    fn negative_distance_reverses() {
        let map = strip();
        let index = SpatialIndex::build(&map);
        let mut state = make_start_state(&map);
        try_move(&index, &mut state, 3.0, North);
        assert_eq!(state.cell, CellPoint::new(0, 3));

        let outcome = try_move(&index, &mut state, -2.0, North);
        assert!(outcome.moved);
        assert_eq!(state.cell, CellPoint::new(0, 1));
        assert_eq!(state.distance_m, 1.0);
        assert_eq!(state.heading, North);
    }

    #[test]
    fn pending_stays_below_cell_size() {
        let map = strip();
        let index = SpatialIndex::build(&map);
        let mut state = make_start_state(&map);
        for distance in [0.3, 0.9, 1.7, 0.05, 2.49] {
            try_move(&index, &mut state, distance, North);
            assert_le!(state.pending_m, index.cell_size_m());
            assert!(state.pending_m >= 0.0);
        }
    }

    const GATED: &str = "[meta]\ncell_size = 1\nstart_x = 0\nstart_z = 0\nstart_heading = N\n\
                         [line]\nx = 0\nz = 0\nlength = 6\ndir = N\n\
                         [shape: north_half]\ntype = rectangle\nx = -0.5\nz = 3.5\nwidth = 1\nheight = 5\n\
                         [area: north_area]\ntype = slowzone\nshape = north_half\n\
                         [sector: closed_off]\ntype = track\narea = north_area\nflags = closed\n";

    #[test]
    fn closed_sector_rolls_back_completely() {
        let map = parse_str(GATED).map;
        let index = SpatialIndex::build(&map);
        let mut state = make_start_state(&map);
        try_move(&index, &mut state, 2.3, North);
        let before = state;

        // Next cells sit inside the closed sector
        let outcome = try_move(&index, &mut state, 4.0, North);
        assert!(outcome.boundary_hit);
        assert!(!outcome.moved);
        assert_eq!(state, before);
        assert_eq!(state.pending_m, before.pending_m);
    }

    fn guarded_map(gate_heading: &str) -> crate::model::TrackMap {
        let text = format!(
            "[meta]\ncell_size = 1\nstart_x = 0\nstart_z = 0\nstart_heading = N\n\
             [line]\nx = 0\nz = 0\nlength = 6\ndir = N\n\
             [shape: north_half]\ntype = rectangle\nx = -0.5\nz = 3.5\nwidth = 1\nheight = 5\n\
             [area: north_area]\ntype = slowzone\nshape = north_half\n\
             [sector: guarded]\ntype = track\narea = north_area\n\
             [portal: gate]\nsector = guarded\nx = 0\nz = 4\nentry_heading = {gate_heading}\n\
             [approach: guarded]\nentry = gate\ntolerance = 30\n"
        );
        parse_str(&text).map
    }

    #[test]
    fn approach_admits_entry_through_its_portal() {
        let map = guarded_map("N");
        let index = SpatialIndex::build(&map);
        let mut state = make_start_state(&map);

        let outcome = try_move(&index, &mut state, 6.0, North);
        // The gate admits the crossing; the walk ends at the strip's last cell
        assert_eq!(state.cell, CellPoint::new(0, 5));
        assert!(outcome.boundary_hit, "end of strip should stop the walk");
    }

    #[test]
    fn approach_denies_entry_without_its_portal() {
        // The gate portal only applies to eastbound traffic, so a northbound
        // crossing detects no portal and the approach refuses it
        let map = guarded_map("E");
        let index = SpatialIndex::build(&map);
        let mut state = make_start_state(&map);
        let before = state;

        let outcome = try_move(&index, &mut state, 6.0, North);
        assert!(outcome.boundary_hit);
        assert!(!outcome.moved);
        assert_eq!(state, before, "denied transition must roll back completely");
    }

    #[test]
    fn out_of_bounds_ground_stops_like_a_wall() {
        // A path ribbon covers only the two southern cells; the third cell
        // exists but is off the ribbon, so stepping onto it is refused
        let map = parse_str(
            "[meta]\ncell_size = 1\nstart_x = 0\nstart_z = 0\nstart_heading = N\n\
             [line]\nx = 0\nz = 0\nlength = 3\ndir = N\n\
             [shape: ribbon]\ntype = rectangle\nx = -0.5\nz = -0.5\nwidth = 1\nheight = 2\n\
             [path: main]\ntype = road\nshape = ribbon\n",
        )
        .map;
        let index = SpatialIndex::build(&map);
        let mut state = make_start_state(&map);

        let outcome = try_move(&index, &mut state, 2.0, North);
        assert!(outcome.boundary_hit);
        assert!(outcome.moved);
        assert_eq!(state.cell, CellPoint::new(0, 1));
        assert_eq!(state.pending_m, 0.0);
        assert_eq!(state.distance_m, 1.0);
    }

    #[test]
    fn loose_cells_are_walkable() {
        let map = parse_str(
            "[meta]\ncell_size = 1\n[cell]\nx = 0\nz = 0\n[cell]\nx = 0\nz = 1\n",
        )
        .map;
        let index = SpatialIndex::build(&map);
        let mut state = make_start_state(&map);
        let outcome = try_move(&index, &mut state, 1.0, North);
        assert!(outcome.moved);
        assert_eq!(state.cell, CellPoint::new(0, 1));
    }

    #[test]
    fn odometer_matches_committed_cells_when_pending_drains() {
        let map = strip();
        let index = SpatialIndex::build(&map);
        let mut state = make_start_state(&map);
        try_move(&index, &mut state, 4.5, North);
        try_move(&index, &mut state, 0.5, North);
        assert_eq!(state.pending_m, 0.0);
        assert_eq!(state.distance_m, 5.0);
        assert_eq!(state.cell, CellPoint::new(0, 5));
    }
}
