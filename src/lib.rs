//! Track map kernel: loader, validator and runtime query engine for `.tsm`
//! track files.
//!
//! The pipeline is `parse` → `validate` → [`SpatialIndex::build`], after
//! which the map is immutable and the per-tick queries ([`try_move`],
//! [`road_at`], [`next_road`], [`SpatialIndex::locate`]) are all O(local
//! candidates). Diagnostics are data ([`MapIssue`]) from end to end; only an
//! unreadable file is a hard error.

use std::path::Path;

use static_assertions::const_assert;

pub mod config;
pub mod direction;
pub mod index;
pub mod issue;
pub mod math;
pub mod model;
pub mod motion;
pub mod parser;
pub mod road;
pub mod validate;
pub mod writer;

pub use config::{CheckerConfig, resolve_track_path};
pub use direction::{Direction, ExitSet};
pub use index::{Located, SpatialIndex};
pub use issue::{MapIssue, MapIssueKind, Severity};
pub use model::TrackMap;
pub use motion::{MoveOutcome, MovementState, make_start_state, try_move};
pub use parser::{LoadError, ParseOutcome, parse_file, parse_str};
pub use road::{CurveType, RoadView, next_road, road_at};
pub use validate::{ValidateOptions, ValidationResult, validate};
pub use writer::write_tsm;

/// Smallest legal cell edge, in meters.
pub const MIN_CELL_SIZE_M: f64 = 0.1;
/// Smallest legal road width anywhere on a map, in meters.
pub const MIN_CELL_WIDTH_M: f64 = 0.5;
/// Cell edge assumed when a map's `[meta]` block does not set one.
pub const DEFAULT_CELL_SIZE_M: f64 = 5.0;
/// Road width assumed when neither cell nor map set one.
pub const DEFAULT_ROAD_WIDTH_M: f64 = 8.0;
/// Movements shorter than this are ignored entirely.
pub const MOVE_EPSILON_M: f64 = 0.001;
/// Default lookahead horizon for [`next_road`].
pub const DEFAULT_LOOKAHEAD_M: f64 = 30.0;
/// How far a vehicle heading may deviate from a portal heading and still
/// count as passing through it.
pub const PORTAL_ALIGN_TOLERANCE_DEG: f64 = 45.0;

const_assert!(MIN_CELL_SIZE_M > 0.0);
const_assert!(DEFAULT_CELL_SIZE_M >= MIN_CELL_SIZE_M);
const_assert!(DEFAULT_ROAD_WIDTH_M >= MIN_CELL_WIDTH_M);
const_assert!(MOVE_EPSILON_M < MIN_CELL_SIZE_M);

/// Parse and validate in one call: the model plus the combined issue list,
/// parser diagnostics first.
pub fn load(
    path: &Path,
    options: &ValidateOptions,
) -> Result<(TrackMap, Vec<MapIssue>), LoadError> {
    let ParseOutcome { map, mut issues } = parse_file(path)?;
    issues.extend(validate(&map, options).into_issues());
    Ok((map, issues))
}
