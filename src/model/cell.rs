use std::fmt::{Display, Formatter};

use enum_iterator::Sequence;

use crate::direction::ExitSet;

/// Road surface under the wheels, selecting the rolling sound set.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(Sequence)]
pub enum Surface {
    Asphalt,
    Concrete,
    Gravel,
    Dirt,
    Sand,
    Grass,
    Snow,
    Ice,
    Water,
}

impl Surface {
    pub const fn as_str(self) -> &'static str {
        use Surface::*;
        match self {
            Asphalt => "asphalt",
            Concrete => "concrete",
            Gravel => "gravel",
            Dirt => "dirt",
            Sand => "sand",
            Grass => "grass",
            Snow => "snow",
            Ice => "ice",
            Water => "water",
        }
    }

    pub fn parse(s: &str) -> Option<Surface> {
        let s = s.trim().to_ascii_lowercase();
        enum_iterator::all::<Surface>().find(|v| v.as_str() == s)
    }
}

impl Display for Surface {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ambient noise bed layered on top of the surface sound.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(Sequence)]
pub enum Noise {
    None,
    Wind,
    Crowd,
    Airplane,
    Storm,
    Ocean,
    Traffic,
}

impl Noise {
    pub const fn as_str(self) -> &'static str {
        use Noise::*;
        match self {
            None => "none",
            Wind => "wind",
            Crowd => "crowd",
            Airplane => "airplane",
            Storm => "storm",
            Ocean => "ocean",
            Traffic => "traffic",
        }
    }

    /// `jet` and `thunder` are accepted on input only; the canonical writer
    /// emits `airplane` and `storm`.
    pub fn parse(s: &str) -> Option<Noise> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "jet" => return Some(Noise::Airplane),
            "thunder" => return Some(Noise::Storm),
            _ => {}
        }
        enum_iterator::all::<Noise>().find(|v| v.as_str() == s)
    }
}

impl Display for Noise {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One grid square of the drivable world.
///
/// Fields left `None` fall back to the map-level defaults when a road view is
/// derived. Repeated blocks touching the same coordinate merge: exits OR
/// together, everything else is last-writer-wins.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    pub exits: ExitSet,
    pub surface: Option<Surface>,
    pub noise: Option<Noise>,
    pub width_m: Option<f64>,
    pub is_safe_zone: bool,
    pub zone: Option<String>,
}

impl Cell {
    /// True when the cell declares no exits at all, which makes it "loosely"
    /// walkable toward equally exit-less neighbors.
    pub fn is_loose(&self) -> bool {
        self.exits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("asphalt", Some(Surface::Asphalt))]
    #[test_case("GRAVEL", Some(Surface::Gravel))]
    #[test_case(" ice ", Some(Surface::Ice))]
    #[test_case("tarmac", None)]
    fn surface_parse(input: &str, expected: Option<Surface>) {
        assert_eq!(Surface::parse(input), expected);
    }

    #[test_case("none", Some(Noise::None))]
    #[test_case("jet", Some(Noise::Airplane); "jet is an input-only alias")]
    #[test_case("thunder", Some(Noise::Storm); "thunder is an input-only alias")]
    #[test_case("Crowd", Some(Noise::Crowd))]
    #[test_case("quiet", None)]
    fn noise_parse(input: &str, expected: Option<Noise>) {
        assert_eq!(Noise::parse(input), expected);
    }

    #[test]
    fn aliases_round_trip_to_canonical_spelling() {
        let n = Noise::parse("jet").unwrap();
        assert_eq!(Noise::parse(n.as_str()), Some(n));
    }
}
