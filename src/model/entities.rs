use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    ops::{BitOr, BitOrAssign},
};

use derive_more::with_trait::IsVariant;
use enum_iterator::Sequence;

use super::cell::{Noise, Surface};
use crate::math::{Geometry, WorldPoint};

/// Free-form per-entity key/value attributes. Keys the parser does not
/// recognize land here; the road query reads its dimension overrides from it.
pub type EntityMetadata = BTreeMap<String, String>;

/// Bitset of traffic flags attached to sectors and areas.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Flags(u32);

impl Flags {
    pub const NONE: Flags = Flags(0);
    pub const PIT: Flags = Flags(1 << 0);
    pub const RESTRICTED: Flags = Flags(1 << 1);
    pub const CLOSED: Flags = Flags(1 << 2);
    pub const SAFE: Flags = Flags(1 << 3);
    pub const HAZARD: Flags = Flags(1 << 4);
    pub const STOP: Flags = Flags(1 << 5);
    pub const YIELD: Flags = Flags(1 << 6);
    pub const TIMING: Flags = Flags(1 << 7);

    const NAMES: [(Flags, &'static str); 8] = [
        (Flags::PIT, "pit"),
        (Flags::RESTRICTED, "restricted"),
        (Flags::CLOSED, "closed"),
        (Flags::SAFE, "safe"),
        (Flags::HAZARD, "hazard"),
        (Flags::STOP, "stop"),
        (Flags::YIELD, "yield"),
        (Flags::TIMING, "timing"),
    ];

    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parses a comma-separated flag list. Unknown names are returned to the
    /// caller so the parser can warn with a line number.
    pub fn parse(s: &str) -> (Flags, Vec<String>) {
        let mut flags = Flags::NONE;
        let mut unknown = Vec::new();
        for raw in s.split(',') {
            let name = raw.trim().to_ascii_lowercase();
            if name.is_empty() {
                continue;
            }
            match Self::NAMES.iter().find(|(_, n)| *n == name) {
                Some((flag, _)) => flags |= *flag,
                None => unknown.push(name),
            }
        }
        (flags, unknown)
    }
}

impl BitOr for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

impl Display for Flags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A named continuous region, the geometric backing of areas and paths.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub id: String,
    pub geometry: Geometry,
}

/// What an area means to the simulation.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(IsVariant)]
pub enum AreaKind {
    SafeZone,
    Hazard,
    SlowZone,
    PitSpeed,
    Other(String),
}

impl AreaKind {
    pub fn parse(s: &str) -> AreaKind {
        use AreaKind::*;
        match s.trim().to_ascii_lowercase().as_str() {
            "safezone" | "safe_zone" | "safe" => SafeZone,
            "hazard" => Hazard,
            "slowzone" | "slow_zone" | "slow" => SlowZone,
            "pitspeed" | "pit_speed" => PitSpeed,
            other => Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        use AreaKind::*;
        match self {
            SafeZone => "safezone",
            Hazard => "hazard",
            SlowZone => "slowzone",
            PitSpeed => "pitspeed",
            Other(s) => s,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Area {
    pub id: String,
    pub kind: AreaKind,
    pub shape_id: String,
    pub surface: Option<Surface>,
    pub noise: Option<Noise>,
    pub width_m: Option<f64>,
    pub flags: Flags,
    pub metadata: EntityMetadata,
}

impl Area {
    pub fn is_safe_zone(&self) -> bool {
        self.kind.is_safe_zone() || self.flags.contains(Flags::SAFE)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SectorKind {
    Track,
    PitLane,
    Paddock,
    Other(String),
}

impl SectorKind {
    pub fn parse(s: &str) -> SectorKind {
        use SectorKind::*;
        match s.trim().to_ascii_lowercase().as_str() {
            "track" => Track,
            "pitlane" | "pit_lane" | "pit" => PitLane,
            "paddock" => Paddock,
            other => Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        use SectorKind::*;
        match self {
            Track => "track",
            PitLane => "pitlane",
            Paddock => "paddock",
            Other(s) => s,
        }
    }
}

/// Traffic rules a sector imposes on anything inside it, derived from its
/// flags and metadata.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SectorRules {
    pub is_closed: bool,
    pub is_restricted: bool,
    pub requires_stop: bool,
    pub requires_yield: bool,
    pub min_speed_kph: Option<f64>,
    pub max_speed_kph: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sector {
    pub id: String,
    pub kind: SectorKind,
    pub name: Option<String>,
    pub code: Option<String>,
    /// Geometric extent; a sector without one is a purely logical grouping.
    pub area_id: Option<String>,
    pub surface: Option<Surface>,
    pub noise: Option<Noise>,
    pub flags: Flags,
    pub metadata: EntityMetadata,
}

impl Sector {
    pub fn rules(&self) -> SectorRules {
        let speed = |key: &str| self.metadata.get(key).and_then(|v| v.trim().parse::<f64>().ok());
        SectorRules {
            is_closed: self.flags.contains(Flags::CLOSED),
            is_restricted: self.flags.contains(Flags::RESTRICTED),
            requires_stop: self.flags.contains(Flags::STOP),
            requires_yield: self.flags.contains(Flags::YIELD),
            min_speed_kph: speed("min_speed"),
            max_speed_kph: speed("max_speed"),
        }
    }

    pub fn is_safe_zone(&self) -> bool {
        self.flags.contains(Flags::SAFE)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(IsVariant)]
pub enum PortalRole {
    Entry,
    Exit,
    EntryExit,
}

impl PortalRole {
    pub fn parse(s: &str) -> Option<PortalRole> {
        use PortalRole::*;
        match s.trim().to_ascii_lowercase().as_str() {
            "entry" | "in" => Some(Entry),
            "exit" | "out" => Some(Exit),
            "entryexit" | "entry_exit" | "both" => Some(EntryExit),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        use PortalRole::*;
        match self {
            Entry => "entry",
            Exit => "exit",
            EntryExit => "entryexit",
        }
    }
}

/// A crossing point on the boundary of a sector.
#[derive(Clone, Debug, PartialEq)]
pub struct Portal {
    pub id: String,
    pub sector_id: String,
    pub position: WorldPoint,
    pub width_m: f64,
    pub entry_heading_deg: Option<f64>,
    pub exit_heading_deg: Option<f64>,
    pub role: PortalRole,
}

impl Portal {
    /// The heading relevant for a vehicle moving along `heading_deg`: for an
    /// entry/exit-only portal its one declared heading, for a two-way portal
    /// whichever declared heading is better aligned. `None` when the portal
    /// declares no headings (it then matches any approach direction).
    pub fn applicable_heading_deg(&self, heading_deg: f64) -> Option<f64> {
        use crate::math::heading_delta_deg;
        let candidates: &[Option<f64>] = match self.role {
            PortalRole::Entry => &[self.entry_heading_deg],
            PortalRole::Exit => &[self.exit_heading_deg],
            PortalRole::EntryExit => &[self.entry_heading_deg, self.exit_heading_deg],
        };
        candidates
            .iter()
            .flatten()
            .copied()
            .min_by(|a, b| {
                let (da, db) =
                    (heading_delta_deg(heading_deg, *a).abs(), heading_delta_deg(heading_deg, *b).abs());
                da.total_cmp(&db)
            })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(IsVariant)]
pub enum LinkDirection {
    OneWay,
    TwoWay,
}

impl LinkDirection {
    pub fn parse(s: &str) -> Option<LinkDirection> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oneway" | "one_way" | "one-way" => Some(LinkDirection::OneWay),
            "twoway" | "two_way" | "two-way" | "both" => Some(LinkDirection::TwoWay),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LinkDirection::OneWay => "oneway",
            LinkDirection::TwoWay => "twoway",
        }
    }
}

/// Connection between two portals.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub id: String,
    pub from_portal_id: String,
    pub to_portal_id: String,
    pub direction: LinkDirection,
}

impl Link {
    /// `from->to`, the id used when a `[link]` block does not name one.
    pub fn default_id(from: &str, to: &str) -> String {
        format!("{from}->{to}")
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(Sequence)]
pub enum PathKind {
    Road,
    Curve,
    Intersection,
    Connector,
    Lane,
    Branch,
    Merge,
    Split,
    PitLane,
}

impl PathKind {
    pub const fn as_str(self) -> &'static str {
        use PathKind::*;
        match self {
            Road => "road",
            Curve => "curve",
            Intersection => "intersection",
            Connector => "connector",
            Lane => "lane",
            Branch => "branch",
            Merge => "merge",
            Split => "split",
            PitLane => "pitlane",
        }
    }

    pub fn parse(s: &str) -> Option<PathKind> {
        let s = s.trim().to_ascii_lowercase();
        if s == "pit_lane" {
            return Some(PathKind::PitLane);
        }
        enum_iterator::all::<PathKind>().find(|v| v.as_str() == s)
    }
}

/// A named ribbon of road. Contributes width to road queries when its shape
/// contains the queried point.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub id: String,
    pub kind: PathKind,
    pub shape_id: Option<String>,
    pub from_portal_id: Option<String>,
    pub to_portal_id: Option<String>,
    pub width_m: Option<f64>,
    pub name: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(Sequence)]
pub enum BeaconKind {
    Voice,
    Beep,
    Silent,
    Undefined,
}

impl BeaconKind {
    pub const fn as_str(self) -> &'static str {
        use BeaconKind::*;
        match self {
            Voice => "voice",
            Beep => "beep",
            Silent => "silent",
            Undefined => "undefined",
        }
    }

    pub fn parse(s: &str) -> Option<BeaconKind> {
        let s = s.trim().to_ascii_lowercase();
        enum_iterator::all::<BeaconKind>().find(|v| v.as_str() == s)
    }
}

/// An audio cue anchor. Activated by entering its shape or activation radius.
#[derive(Clone, Debug, PartialEq)]
pub struct Beacon {
    pub id: String,
    pub kind: BeaconKind,
    pub position: WorldPoint,
    pub name: Option<String>,
    pub name2: Option<String>,
    pub sector_id: Option<String>,
    pub shape_id: Option<String>,
    pub heading_deg: Option<f64>,
    pub activation_radius_m: Option<f64>,
    pub role: Option<String>,
    pub metadata: EntityMetadata,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(Sequence)]
pub enum MarkerKind {
    Start,
    Finish,
    Checkpoint,
    Entry,
    Exit,
    Apex,
    Curve,
    Intersection,
    Merge,
    Split,
    Branch,
    Warning,
    Undefined,
}

impl MarkerKind {
    pub const fn as_str(self) -> &'static str {
        use MarkerKind::*;
        match self {
            Start => "start",
            Finish => "finish",
            Checkpoint => "checkpoint",
            Entry => "entry",
            Exit => "exit",
            Apex => "apex",
            Curve => "curve",
            Intersection => "intersection",
            Merge => "merge",
            Split => "split",
            Branch => "branch",
            Warning => "warning",
            Undefined => "undefined",
        }
    }

    pub fn parse(s: &str) -> Option<MarkerKind> {
        let s = s.trim().to_ascii_lowercase();
        enum_iterator::all::<MarkerKind>().find(|v| v.as_str() == s)
    }
}

/// A point of interest on the track, purely informational.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub id: String,
    pub kind: MarkerKind,
    pub position: WorldPoint,
    pub name: Option<String>,
    pub shape_id: Option<String>,
    pub heading_deg: Option<f64>,
    pub metadata: EntityMetadata,
}

/// Per-sector transition rule bundle. At most one per sector.
#[derive(Clone, Debug, PartialEq)]
pub struct Approach {
    pub sector_id: String,
    pub name: Option<String>,
    pub entry_portal_id: Option<String>,
    pub exit_portal_id: Option<String>,
    pub entry_heading_deg: Option<f64>,
    pub exit_heading_deg: Option<f64>,
    pub width_m: Option<f64>,
    pub length_m: Option<f64>,
    pub tolerance_deg: Option<f64>,
    pub metadata: EntityMetadata,
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn flags_parse_known_and_unknown() {
        let (flags, unknown) = Flags::parse("pit, restricted, sparkly");
        assert!(flags.contains(Flags::PIT));
        assert!(flags.contains(Flags::RESTRICTED));
        assert!(!flags.contains(Flags::CLOSED));
        assert_eq!(unknown, vec!["sparkly".to_owned()]);
    }

    #[test]
    fn flags_display_round_trips() {
        let (flags, _) = Flags::parse("closed,stop");
        let (reparsed, unknown) = Flags::parse(&flags.to_string());
        assert_eq!(flags, reparsed);
        assert!(unknown.is_empty());
    }

    #[test_case("SafeZone", AreaKind::SafeZone)]
    #[test_case("pit_speed", AreaKind::PitSpeed)]
    #[test_case("quicksand", AreaKind::Other("quicksand".to_owned()))]
    fn area_kind_parse(input: &str, expected: AreaKind) {
        assert_eq!(AreaKind::parse(input), expected);
    }

    #[test]
    fn sector_rules_from_flags_and_metadata() {
        let (flags, _) = Flags::parse("closed, yield");
        let mut metadata = EntityMetadata::new();
        metadata.insert("max_speed".to_owned(), "80".to_owned());
        let sector = Sector {
            id: "pit".to_owned(),
            kind: SectorKind::PitLane,
            name: None,
            code: None,
            area_id: None,
            surface: None,
            noise: None,
            flags,
            metadata,
        };
        let rules = sector.rules();
        assert!(rules.is_closed);
        assert!(rules.requires_yield);
        assert!(!rules.is_restricted);
        assert_eq!(rules.max_speed_kph, Some(80.0));
        assert_eq!(rules.min_speed_kph, None);
    }

    #[test]
    fn portal_applicable_heading_picks_best_aligned() {
        let portal = Portal {
            id: "p".to_owned(),
            sector_id: "s".to_owned(),
            position: WorldPoint::new(0.0, 0.0),
            width_m: 4.0,
            entry_heading_deg: Some(0.0),
            exit_heading_deg: Some(180.0),
            role: PortalRole::EntryExit,
        };
        assert_eq!(portal.applicable_heading_deg(10.0), Some(0.0));
        assert_eq!(portal.applicable_heading_deg(170.0), Some(180.0));
    }

    #[test]
    fn link_default_id() {
        assert_eq!(Link::default_id("a", "b"), "a->b");
    }
}
