use derive_more::From;
use derive_more::with_trait::IsVariant;

use crate::math::WorldPoint;

/// Tolerance for on-edge tests of polygon containment.
const EDGE_EPSILON: f64 = 1e-9;

/// Axis-aligned bounding box used for coarse containment rejection.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds {
    pub min: WorldPoint,
    pub max: WorldPoint,
}

impl Bounds {
    pub const fn new(min: WorldPoint, max: WorldPoint) -> Self {
        Bounds { min, max }
    }

    pub fn around(points: &[WorldPoint]) -> Option<Bounds> {
        let first = *points.first()?;
        Some(points.iter().fold(Bounds::new(first, first), |b, p| {
            Bounds::new(
                WorldPoint::new(b.min.x.min(p.x), b.min.z.min(p.z)),
                WorldPoint::new(b.max.x.max(p.x), b.max.z.max(p.z)),
            )
        }))
    }

    /// Closed on all edges; this is only a pre-filter, exact containment is
    /// up to the shape.
    pub fn contains(&self, p: WorldPoint) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.z >= self.min.z && p.z <= self.max.z
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.z - self.min.z
    }
}

/// Axis-aligned rectangle anchored at its lower-left (minimum) corner.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub z: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, z: f64, width: f64, height: f64) -> Self {
        Rect { x, z, width, height }
    }

    /// Half-open on the +x/+z edges so adjacent rectangles tile without a
    /// point belonging to both.
    pub fn contains(&self, p: WorldPoint) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.z >= self.z && p.z < self.z + self.height
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(
            WorldPoint::new(self.x, self.z),
            WorldPoint::new(self.x + self.width, self.z + self.height),
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Circle {
    pub x: f64,
    pub z: f64,
    pub radius: f64,
}

impl Circle {
    pub const fn new(x: f64, z: f64, radius: f64) -> Self {
        Circle { x, z, radius }
    }

    pub const fn center(&self) -> WorldPoint {
        WorldPoint::new(self.x, self.z)
    }

    pub fn contains(&self, p: WorldPoint) -> bool {
        self.center().distance_sq(p) <= self.radius * self.radius
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(
            WorldPoint::new(self.x - self.radius, self.z - self.radius),
            WorldPoint::new(self.x + self.radius, self.z + self.radius),
        )
    }
}

/// Simple polygon over at least three vertices. Closed implicitly (the last
/// vertex connects back to the first).
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub points: Vec<WorldPoint>,
}

impl Polygon {
    pub const fn new(points: Vec<WorldPoint>) -> Self {
        Polygon { points }
    }

    /// Even-odd crossing test. A point exactly on an edge counts as inside.
    pub fn contains(&self, p: WorldPoint) -> bool {
        if self.points.len() < 3 {
            return false;
        }
        if self.on_edge(p) {
            return true;
        }

        let mut inside = false;
        let mut j = self.points.len() - 1;
        for i in 0..self.points.len() {
            let (a, b) = (self.points[i], self.points[j]);
            if (a.z > p.z) != (b.z > p.z) {
                let t = (p.z - a.z) / (b.z - a.z);
                if p.x < a.x + t * (b.x - a.x) {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    fn on_edge(&self, p: WorldPoint) -> bool {
        let mut j = self.points.len() - 1;
        for i in 0..self.points.len() {
            if point_on_segment(p, self.points[j], self.points[i]) {
                return true;
            }
            j = i;
        }
        false
    }

    pub fn bounds(&self) -> Bounds {
        // Parse guarantees at least three points
        Bounds::around(&self.points).unwrap_or(Bounds::new(WorldPoint::default(), WorldPoint::default()))
    }
}

/// Open vertex chain; carries no interior, only a ribbon reference for width
/// derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<WorldPoint>,
}

impl Polyline {
    pub const fn new(points: Vec<WorldPoint>) -> Self {
        Polyline { points }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::around(&self.points).unwrap_or(Bounds::new(WorldPoint::default(), WorldPoint::default()))
    }
}

fn point_on_segment(p: WorldPoint, a: WorldPoint, b: WorldPoint) -> bool {
    let cross = (b.x - a.x) * (p.z - a.z) - (b.z - a.z) * (p.x - a.x);
    if cross.abs() > EDGE_EPSILON * (1.0 + (b.x - a.x).abs() + (b.z - a.z).abs()) {
        return false;
    }
    p.x >= a.x.min(b.x) - EDGE_EPSILON
        && p.x <= a.x.max(b.x) + EDGE_EPSILON
        && p.z >= a.z.min(b.z) - EDGE_EPSILON
        && p.z <= a.z.max(b.z) + EDGE_EPSILON
}

/// Continuous region of the track plane, one variant per `[shape]` type.
#[derive(Debug, Clone, PartialEq)]
#[derive(From, IsVariant)]
pub enum Geometry {
    Rect(Rect),
    Circle(Circle),
    Polygon(Polygon),
    Polyline(Polyline),
}

impl Geometry {
    /// Whether the region contains `p`. A polyline has no interior and never
    /// contains a point.
    pub fn contains(&self, p: WorldPoint) -> bool {
        match self {
            Geometry::Rect(r) => r.contains(p),
            Geometry::Circle(c) => c.contains(p),
            Geometry::Polygon(poly) => poly.contains(p),
            Geometry::Polyline(_) => false,
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            Geometry::Rect(r) => r.bounds(),
            Geometry::Circle(c) => c.bounds(),
            Geometry::Polygon(poly) => poly.bounds(),
            Geometry::Polyline(line) => line.bounds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(0.0, 0.0, true; "lower left corner belongs")]
    #[test_case(5.0, 2.0, true)]
    #[test_case(10.0, 2.0, false; "right edge excluded")]
    #[test_case(5.0, 4.0, false; "top edge excluded")]
    #[test_case(-0.001, 2.0, false)]
    fn rect_half_open(x: f64, z: f64, expected: bool) {
        let r = Rect::new(0.0, 0.0, 10.0, 4.0);
        assert_eq!(r.contains(WorldPoint::new(x, z)), expected);
    }

    #[test]
    fn rect_tiling_is_exclusive() {
        let a = Rect::new(0.0, 0.0, 5.0, 5.0);
        let b = Rect::new(5.0, 0.0, 5.0, 5.0);
        let shared = WorldPoint::new(5.0, 2.5);
        assert!(!a.contains(shared));
        assert!(b.contains(shared));
    }

    #[test_case(3.0, 4.0, true; "on the rim")]
    #[test_case(0.0, 0.0, true)]
    #[test_case(3.1, 4.0, false)]
    fn circle_contains(x: f64, z: f64, expected: bool) {
        let c = Circle::new(0.0, 0.0, 5.0);
        assert_eq!(c.contains(WorldPoint::new(x, z)), expected);
    }

    fn unit_square() -> Polygon {
        Polygon::new(vec![
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(10.0, 0.0),
            WorldPoint::new(10.0, 10.0),
            WorldPoint::new(0.0, 10.0),
        ])
    }

    #[test_case(5.0, 5.0, true)]
    #[test_case(11.0, 5.0, false)]
    #[test_case(10.0, 5.0, true; "on right edge is inside")]
    #[test_case(0.0, 0.0, true; "vertex is inside")]
    #[test_case(5.0, 10.0, true; "on top edge is inside")]
    #[test_case(-0.1, 5.0, false)]
    fn polygon_contains(x: f64, z: f64, expected: bool) {
        assert_eq!(unit_square().contains(WorldPoint::new(x, z)), expected);
    }

    #[test]
    fn concave_polygon() {
        // A "U" shape: the notch between the prongs is outside
        let poly = Polygon::new(vec![
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(9.0, 0.0),
            WorldPoint::new(9.0, 9.0),
            WorldPoint::new(6.0, 9.0),
            WorldPoint::new(6.0, 3.0),
            WorldPoint::new(3.0, 3.0),
            WorldPoint::new(3.0, 9.0),
            WorldPoint::new(0.0, 9.0),
        ]);
        assert!(poly.contains(WorldPoint::new(1.5, 6.0)));
        assert!(!poly.contains(WorldPoint::new(4.5, 6.0)));
        assert!(poly.contains(WorldPoint::new(4.5, 1.5)));
    }

    #[test]
    fn polyline_never_contains() {
        let geom = Geometry::from(Polyline::new(vec![
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(10.0, 0.0),
        ]));
        assert!(!geom.contains(WorldPoint::new(5.0, 0.0)));
        assert!(geom.is_polyline());
    }

    #[test]
    fn bounds_prefilter_agrees() {
        let geom = Geometry::from(Circle::new(3.0, -2.0, 4.0));
        let b = geom.bounds();
        assert_eq!(b.min, WorldPoint::new(-1.0, -6.0));
        assert_eq!(b.max, WorldPoint::new(7.0, 2.0));
        // Everything the shape contains, the bounds contain
        for x in -10..10 {
            for z in -10..10 {
                let p = WorldPoint::new(x as f64 * 0.7, z as f64 * 0.7);
                if geom.contains(p) {
                    assert!(b.contains(p));
                }
            }
        }
    }
}
