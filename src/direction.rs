use std::fmt::{Display, Formatter};

use enum_iterator::Sequence;
use enum_map::{Enum, EnumMap};

use crate::math::CellPoint;

/// Cardinal travel direction on the grid. North is +z, East is +x.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(Sequence, Enum)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const fn opposite(self) -> Direction {
        use Direction::*;
        match self {
            North => South,
            East => West,
            South => North,
            West => East,
        }
    }

    /// Clockwise neighbor (the direction after a right turn).
    pub const fn right(self) -> Direction {
        use Direction::*;
        match self {
            North => East,
            East => South,
            South => West,
            West => North,
        }
    }

    /// Counter-clockwise neighbor (the direction after a left turn).
    pub const fn left(self) -> Direction {
        self.right().opposite()
    }

    /// Grid offset of one step in this direction.
    pub const fn offset(self) -> CellPoint {
        use Direction::*;
        match self {
            North => CellPoint::new(0, 1),
            East => CellPoint::new(1, 0),
            South => CellPoint::new(0, -1),
            West => CellPoint::new(-1, 0),
        }
    }

    /// Compass heading in degrees: N=0, E=90, S=180, W=270.
    pub const fn heading_deg(self) -> f64 {
        use Direction::*;
        match self {
            North => 0.0,
            East => 90.0,
            South => 180.0,
            West => 270.0,
        }
    }

    pub const fn letter(self) -> char {
        use Direction::*;
        match self {
            North => 'N',
            East => 'E',
            South => 'S',
            West => 'W',
        }
    }

    pub const fn from_letter(c: char) -> Option<Direction> {
        use Direction::*;
        match c {
            'n' | 'N' => Some(North),
            'e' | 'E' => Some(East),
            's' | 'S' => Some(South),
            'w' | 'W' => Some(West),
            _ => None,
        }
    }

    /// Nearest cardinal to an arbitrary heading in degrees.
    pub fn from_heading_deg(deg: f64) -> Direction {
        use Direction::*;
        let d = crate::math::normalize_deg(deg);
        if d > -45.0 && d <= 45.0 {
            North
        } else if d > 45.0 && d <= 135.0 {
            East
        } else if d <= -45.0 && d > -135.0 {
            West
        } else {
            South
        }
    }

    /// Accepts a single letter or a full name, case-insensitive.
    pub fn parse(s: &str) -> Option<Direction> {
        use Direction::*;
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "north" => Some(North),
            "e" | "east" => Some(East),
            "s" | "south" => Some(South),
            "w" | "west" => Some(West),
            _ => None,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// The set of directions a cell advertises as passable.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ExitSet(EnumMap<Direction, bool>);

impl ExitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(directions: &[Direction]) -> Self {
        let mut set = Self::default();
        for &d in directions {
            set.insert(d);
        }
        set
    }

    pub fn contains(self, dir: Direction) -> bool {
        self.0[dir]
    }

    pub fn insert(&mut self, dir: Direction) {
        self.0[dir] = true;
    }

    /// OR-merge, the cell merge rule for repeated blocks on one cell.
    pub fn union(self, other: ExitSet) -> ExitSet {
        let mut out = self;
        for d in enum_iterator::all::<Direction>() {
            out.0[d] |= other.0[d];
        }
        out
    }

    pub fn is_empty(self) -> bool {
        self.iter().next().is_none()
    }

    pub fn len(self) -> usize {
        self.iter().count()
    }

    pub fn iter(self) -> impl Iterator<Item = Direction> {
        enum_iterator::all::<Direction>().filter(move |&d| self.0[d])
    }

    /// Parses a string over `{N,E,S,W}`, case-insensitive; each present
    /// letter adds the direction. Whitespace, commas and `|` are ignored.
    pub fn parse(s: &str) -> Option<ExitSet> {
        let mut set = ExitSet::default();
        for c in s.chars() {
            if c.is_whitespace() || c == ',' || c == '|' {
                continue;
            }
            set.insert(Direction::from_letter(c)?);
        }
        Some(set)
    }
}

impl Display for ExitSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for d in self.iter() {
            write!(f, "{}", d.letter())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use Direction::*;

    #[test_case(North, South)]
    #[test_case(East, West)]
    #[test_case(South, North)]
    #[test_case(West, East)]
    fn opposites(d: Direction, expected: Direction) {
        assert_eq!(d.opposite(), expected);
        assert_eq!(d.opposite().opposite(), d);
    }

    #[test]
    fn turns() {
        assert_eq!(North.right(), East);
        assert_eq!(North.left(), West);
        assert_eq!(West.right(), North);
        for d in enum_iterator::all::<Direction>() {
            assert_eq!(d.left().right(), d);
        }
    }

    #[test]
    fn offsets_cancel() {
        for d in enum_iterator::all::<Direction>() {
            assert_eq!(d.offset() + d.opposite().offset(), CellPoint::new(0, 0));
        }
    }

    #[test_case("NESW", &[North, East, South, West])]
    #[test_case("ns", &[North, South])]
    #[test_case("N, S", &[North, South])]
    #[test_case("", &[])]
    fn exit_parse(input: &str, expected: &[Direction]) {
        assert_eq!(ExitSet::parse(input), Some(ExitSet::of(expected)));
    }

    #[test]
    fn exit_parse_rejects_unknown() {
        assert_eq!(ExitSet::parse("NQ"), None);
    }

    #[test]
    fn exit_union() {
        let a = ExitSet::of(&[North]);
        let b = ExitSet::of(&[South, East]);
        let merged = a.union(b);
        assert_eq!(merged.len(), 3);
        assert!(merged.contains(North));
        assert!(!merged.contains(West));
        assert_eq!(merged.to_string(), "NES");
    }
}
