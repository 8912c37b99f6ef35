//! Planar and spatial primitives shared by the solver and the correctors
//!
//! Floors are modelled as 2D plans (x, y in meters) with a height axis for
//! gateways and beacons. Zones are axis-aligned rectangles; attenuation regions
//! are arbitrary simple polygons.

use alloc::vec::Vec;

/// A point in 3D space (meters)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// Plan x coordinate
    pub x: f64,
    /// Plan y coordinate
    pub y: f64,
    /// Height above the floor
    pub z: f64,
}

impl Position {
    /// Create a position
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        libm::sqrt(dx * dx + dy * dy + dz * dz)
    }

    /// Projection onto the floor plan
    pub fn plan(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    /// Same plan location at another height
    pub fn with_plan(&self, plan: Point2) -> Self {
        Self::new(plan.x, plan.y, self.z)
    }

    pub(crate) fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub(crate) fn from_array(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// A point on a floor plan (meters)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point2 {
    /// Plan x coordinate
    pub x: f64,
    /// Plan y coordinate
    pub y: f64,
}

impl Point2 {
    /// Create a plan point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another plan point
    pub fn distance_to(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        libm::sqrt(dx * dx + dy * dy)
    }
}

/// Axis-aligned rectangle with normalized corners (`min <= max`)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    min: Point2,
    max: Point2,
}

impl Rect {
    /// Build from two opposite corners in any order
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min: Point2::new(x1.min(x2), y1.min(y2)),
            max: Point2::new(x1.max(x2), y1.max(y2)),
        }
    }

    /// Lower-left corner
    pub fn min(&self) -> Point2 {
        self.min
    }

    /// Upper-right corner
    pub fn max(&self) -> Point2 {
        self.max
    }

    /// Closed containment test (edges count as inside)
    pub fn contains(&self, p: Point2) -> bool {
        self.min.x <= p.x && p.x <= self.max.x && self.min.y <= p.y && p.y <= self.max.y
    }

    /// Nearest point of the rectangle to `p`
    pub fn clamp(&self, p: Point2) -> Point2 {
        Point2::new(
            p.x.clamp(self.min.x, self.max.x),
            p.y.clamp(self.min.y, self.max.y),
        )
    }

    /// Distance from `p` to the rectangle (0 when inside)
    pub fn distance_to(&self, p: Point2) -> f64 {
        p.distance_to(&self.clamp(p))
    }
}

/// Floor extent `(xmin, xmax, ymin, ymax)`, the plan area the solver searches
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Extent {
    /// Smallest x
    pub xmin: f64,
    /// Largest x
    pub xmax: f64,
    /// Smallest y
    pub ymin: f64,
    /// Largest y
    pub ymax: f64,
}

impl Extent {
    /// Create an extent in the `(xmin, xmax, ymin, ymax)` order used by plans
    pub const fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Self { xmin, xmax, ymin, ymax }
    }

    /// Both axes non-empty and finite
    pub fn is_valid(&self) -> bool {
        self.xmin.is_finite()
            && self.xmax.is_finite()
            && self.ymin.is_finite()
            && self.ymax.is_finite()
            && self.xmin < self.xmax
            && self.ymin < self.ymax
    }

    /// The extent as a rectangle
    pub fn as_rect(&self) -> Rect {
        Rect::new(self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

/// Simple polygon on the floor plan; the closing edge is implicit
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polygon {
    vertices: Vec<Point2>,
}

impl Polygon {
    /// Create from vertices in boundary order
    pub fn new(vertices: Vec<Point2>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned box polygon
    pub fn from_rect(rect: Rect) -> Self {
        let (lo, hi) = (rect.min(), rect.max());
        Self::new(alloc::vec![
            lo,
            Point2::new(hi.x, lo.y),
            hi,
            Point2::new(lo.x, hi.y),
        ])
    }

    /// Boundary vertices
    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }

    fn edges(&self) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Closed containment test: boundary points are inside
    pub fn contains(&self, p: Point2) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }

        let mut inside = false;
        for (a, b) in self.edges() {
            if on_segment(a, b, p) {
                return true;
            }
            // Even-odd ray cast towards +x
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Whether segment `[a, b]` touches the polygon (closed-set intersection)
    ///
    /// True when the segment crosses or touches an edge, or lies entirely
    /// inside the polygon.
    pub fn intersects_segment(&self, a: Point2, b: Point2) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        if self.contains(a) || self.contains(b) {
            return true;
        }
        self.edges().any(|(p, q)| segments_intersect(a, b, p, q))
    }
}

/// Twice the signed area of triangle (a, b, c)
fn cross(a: Point2, b: Point2, c: Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

const COLLINEAR_EPSILON: f64 = 1e-12;

fn orientation(a: Point2, b: Point2, c: Point2) -> i8 {
    let v = cross(a, b, c);
    if v > COLLINEAR_EPSILON {
        1
    } else if v < -COLLINEAR_EPSILON {
        -1
    } else {
        0
    }
}

/// `p` lies on segment `[a, b]`
fn on_segment(a: Point2, b: Point2, p: Point2) -> bool {
    orientation(a, b, p) == 0
        && p.x >= a.x.min(b.x) - COLLINEAR_EPSILON
        && p.x <= a.x.max(b.x) + COLLINEAR_EPSILON
        && p.y >= a.y.min(b.y) - COLLINEAR_EPSILON
        && p.y <= a.y.max(b.y) + COLLINEAR_EPSILON
}

fn segments_intersect(a: Point2, b: Point2, c: Point2, d: Point2) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    if o1 != o2 && o3 != o4 {
        return true;
    }

    // Collinear touching cases
    (o1 == 0 && on_segment(a, b, c))
        || (o2 == 0 && on_segment(a, b, d))
        || (o3 == 0 && on_segment(c, d, a))
        || (o4 == 0 && on_segment(c, d, b))
}
