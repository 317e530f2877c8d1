use std::{
    fmt::{Display, Formatter},
    ops::Add,
};

/// Integer grid coordinate of a cell. `x` grows eastward, `z` grows northward.
#[derive(Debug, Copy, Clone, Default)]
#[derive(PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct CellPoint {
    pub x: i32,
    pub z: i32,
}

impl Display for CellPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "({}, {})", self.x, self.z)
    }
}

impl CellPoint {
    pub const fn new(x: i32, z: i32) -> Self {
        CellPoint { x, z }
    }

    /// Center of this cell in world coordinates.
    pub fn to_world(self, cell_size_m: f64) -> WorldPoint {
        WorldPoint::new(self.x as f64 * cell_size_m, self.z as f64 * cell_size_m)
    }
}

impl Add for CellPoint {
    type Output = CellPoint;
    fn add(self, rhs: CellPoint) -> CellPoint {
        CellPoint::new(self.x + rhs.x, self.z + rhs.z)
    }
}

/// Continuous world-space position on the track plane.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct WorldPoint {
    pub x: f64,
    pub z: f64,
}

impl Display for WorldPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "({}, {})", self.x, self.z)
    }
}

impl WorldPoint {
    pub const fn new(x: f64, z: f64) -> Self {
        WorldPoint { x, z }
    }

    pub fn distance_sq(self, other: WorldPoint) -> f64 {
        let (dx, dz) = (self.x - other.x, self.z - other.z);
        dx * dx + dz * dz
    }

    /// The cell whose square contains this position.
    ///
    /// Rounds half away from zero on both axes so behavior is symmetric
    /// around the origin.
    pub fn to_cell(self, cell_size_m: f64) -> CellPoint {
        CellPoint::new(
            (self.x / cell_size_m).round() as i32,
            (self.z / cell_size_m).round() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use assertables::assert_all;
    use test_case::test_case;

    use super::*;

    #[test_case(0.0, 0.0, 0, 0)]
    #[test_case(2.4, 2.6, 0, 1; "round down and up")]
    #[test_case(2.5, -2.5, 1, -1; "half away from zero")]
    #[test_case(-7.5, 7.5, -2, 2; "half away from zero negative")]
    fn world_to_cell_rounding(wx: f64, wz: f64, cx: i32, cz: i32) {
        assert_eq!(WorldPoint::new(wx, wz).to_cell(5.0), CellPoint::new(cx, cz));
    }

    #[test]
    fn world_cell_round_trip() {
        let points: Vec<CellPoint> =
            (-20..20).flat_map(|x| (-20..20).map(move |z| CellPoint::new(x, z))).collect();
        assert_all!(points.iter(), |p: &CellPoint| p.to_world(2.5).to_cell(2.5) == *p);
    }
}
