//! The single key-alias table every block recognizer reads from. Each group
//! lists the canonical spelling first; the canonical writer emits only that
//! one.

pub const ID: &[&str] = &["id"];
pub const TYPE: &[&str] = &["type", "kind"];

pub const X: &[&str] = &["x"];
pub const Z: &[&str] = &["z"];
pub const WIDTH: &[&str] = &["width", "lane_width", "road_width"];
pub const HEIGHT: &[&str] = &["height"];
pub const LENGTH: &[&str] = &["length", "len"];
pub const RADIUS: &[&str] = &["radius", "activation_radius", "activation_radius_m"];
pub const POINTS: &[&str] = &["points", "point"];

pub const DIR: &[&str] = &["dir", "direction"];
pub const EXITS: &[&str] = &["exits", "exit"];
pub const SURFACE: &[&str] = &["surface", "ground"];
pub const NOISE: &[&str] = &["noise", "sound"];
pub const SAFE: &[&str] = &["safe", "safe_zone", "safezone"];
pub const ZONE: &[&str] = &["zone"];

pub const NAME: &[&str] = &["name", "title"];
pub const NAME2: &[&str] = &["name2", "alt_name"];
pub const CODE: &[&str] = &["code"];
pub const FLAGS: &[&str] = &["flags", "flag"];

pub const CELL_SIZE: &[&str] = &["cell_size", "cellsize", "cell_size_m"];
pub const START_X: &[&str] = &["start_x"];
pub const START_Z: &[&str] = &["start_z"];
pub const START_HEADING: &[&str] = &["start_heading", "start_dir", "start_direction"];
pub const WEATHER: &[&str] = &["weather"];
pub const AMBIENCE: &[&str] = &["ambience", "ambiance"];

pub const SHAPE: &[&str] = &["shape", "shape_id"];
pub const SECTOR: &[&str] = &["sector", "sector_id"];
pub const AREA: &[&str] = &["area", "area_id"];

pub const HEADING: &[&str] = &["heading", "heading_deg"];
pub const ENTRY_HEADING: &[&str] = &["entry_heading", "entry_dir", "entry_direction"];
pub const EXIT_HEADING: &[&str] = &["exit_heading", "exit_dir", "exit_direction"];
pub const ROLE: &[&str] = &["role"];

pub const FROM: &[&str] = &["from", "from_portal"];
pub const TO: &[&str] = &["to", "to_portal"];
pub const ONEWAY: &[&str] = &["oneway", "one_way"];

pub const ENTRY_PORTAL: &[&str] = &["entry", "entry_portal"];
pub const EXIT_PORTAL: &[&str] = &["exit", "exit_portal"];
pub const TOLERANCE: &[&str] = &["tolerance", "tolerance_deg"];
