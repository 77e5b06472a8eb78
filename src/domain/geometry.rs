//! Geometry primitives for the triangulated domain: points, labelled
//! vertices, P2 triangles (three corners plus three edge midpoints) and
//! boundary edges.

/// Boundary label of an interior vertex.
pub const LABEL_INTERIOR: i32 = 0;
/// Inflow segment (parabolic velocity profile).
pub const LABEL_INFLOW: i32 = 10;
/// No-slip wall.
pub const LABEL_WALL: i32 = 20;
/// Outflow segment; never stamped with Dirichlet values.
pub const LABEL_OUTFLOW: i32 = 30;
/// Second no-slip wall code used by the channel meshes.
pub const LABEL_WALL_ALT: i32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Twice the signed area of triangle (a, b, c); positive for a
/// counter-clockwise corner ordering.
pub fn det(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// A mesh node: a coordinate plus its global index in the assembled dof
/// numbering and its boundary label (`LABEL_INTERIOR` when not on the
/// boundary). Vertices are set up once by the parser or the topology
/// builder and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub point: Point,
    pub index: usize,
    pub label: i32,
}

impl Vertex {
    pub fn new(point: Point, index: usize) -> Self {
        Self {
            point,
            index,
            label: LABEL_INTERIOR,
        }
    }

    pub fn on_boundary(&self) -> bool {
        self.label != LABEL_INTERIOR
    }
}

/// A P2 triangle: three corner vertices, the three edge midpoints derived
/// by the topology builder (`mid[a]` sits on the edge opposite corner `a`),
/// and the Heron area of the corner triangle.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub index: usize,
    pub v: [Vertex; 3],
    pub mid: [Vertex; 3],
    pub area: f64,
}

impl Triangle {
    pub fn corner(&self, i: usize) -> Point {
        self.v[i].point
    }
}

/// Heron's formula from the three corner coordinates.
pub fn heron_area(p0: Point, p1: Point, p2: Point) -> f64 {
    let a = p0.distance(p1);
    let b = p1.distance(p2);
    let c = p2.distance(p0);
    let s = (a + b + c) / 2.0;
    (s * (s - a) * (s - b) * (s - c)).max(0.0).sqrt()
}

/// A boundary edge of the domain with its segment label.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryEdge {
    pub v: [Vertex; 2],
    pub label: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_heron_matches_shoelace() {
        let p0 = Point::new(0.3, -0.2);
        let p1 = Point::new(1.7, 0.4);
        let p2 = Point::new(0.9, 2.1);
        let heron = heron_area(p0, p1, p2);
        let shoelace = 0.5 * det(p0, p1, p2).abs();
        assert!(heron > 0.0);
        assert_relative_eq!(heron, shoelace, epsilon = 1e-12);
    }

    #[test]
    fn test_det_orientation() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 0.0);
        let c = Point::new(0.0, 1.0);
        assert!(det(a, b, c) > 0.0); // counter-clockwise
        assert!(det(a, c, b) < 0.0); // clockwise
        assert_relative_eq!(det(a, b, c), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_distance() {
        let p = Point::new(1.0, 2.0);
        let q = Point::new(4.0, 6.0);
        assert_relative_eq!(p.distance(q), 5.0, epsilon = 1e-15);
    }

    #[test]
    fn test_vertex_boundary_flag() {
        let mut v = Vertex::new(Point::new(0.0, 0.0), 3);
        assert!(!v.on_boundary());
        v.label = LABEL_INFLOW;
        assert!(v.on_boundary());
    }
}
