//! Triangle enumeration and barycentric containment
//!
//! `triangulate` deliberately enumerates every combination of three points
//! (NAIVE_TRIANGULATION) instead of building a Delaunay triangulation. The
//! result overlaps itself once there are more than a handful of points, and
//! the enumeration order decides which triangle a query lands in. Swapping in
//! a proper triangulation changes containment results and mesh density.

use serde::Serialize;

use crate::points::WarpPoint;

/// A 3D position, used for triangle centroids
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Three control points and their centroid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Triangle {
    pub points: [WarpPoint; 3],
    pub centroid: Point3,
}

impl Triangle {
    pub fn new(a: WarpPoint, b: WarpPoint, c: WarpPoint) -> Self {
        let centroid = Point3 {
            x: (a.x + b.x + c.x) / 3.0,
            y: (a.y + b.y + c.y) / 3.0,
            z: (a.z + b.z + c.z) / 3.0,
        };
        Self {
            points: [a, b, c],
            centroid,
        }
    }

    /// Barycentric coordinates of `(x, y)` with respect to this triangle
    #[inline]
    pub fn barycentric(&self, x: f64, y: f64) -> Barycentric {
        barycentric(x, y, self)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.barycentric(x, y).is_inside()
    }
}

/// Barycentric weights `(u, v, w)` for the triangle's first, second and
/// third vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Barycentric {
    pub u: f64,
    pub v: f64,
    pub w: f64,
}

impl Barycentric {
    /// All weights finite and non-negative.
    ///
    /// Collinear triangles divide by zero and yield NaN/inf, which counts
    /// as "not contained".
    #[inline]
    pub fn is_inside(&self) -> bool {
        self.is_finite() && self.u >= 0.0 && self.v >= 0.0 && self.w >= 0.0
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.u.is_finite() && self.v.is_finite() && self.w.is_finite()
    }
}

/// Number of triangles `triangulate` yields for `n` points, C(n, 3)
pub fn triangle_count(n: usize) -> usize {
    if n < 3 {
        0
    } else {
        n * (n - 1) * (n - 2) / 6
    }
}

/// Enumerate all triangles over `points` in `i < j < k` index order.
/// Fewer than three points yield no triangles.
pub fn triangulate(points: &[WarpPoint]) -> Vec<Triangle> {
    let n = points.len();
    let mut triangles = Vec::with_capacity(triangle_count(n));
    if n < 3 {
        return triangles;
    }

    for i in 0..n - 2 {
        for j in (i + 1)..n - 1 {
            for k in (j + 1)..n {
                triangles.push(Triangle::new(points[i], points[j], points[k]));
            }
        }
    }

    triangles
}

/// Barycentric coordinates of `(x, y)`, standard 2D formula.
/// Not guarded against degenerate triangles; see [`Barycentric::is_inside`].
pub fn barycentric(x: f64, y: f64, triangle: &Triangle) -> Barycentric {
    let [p1, p2, p3] = &triangle.points;

    let denom = (p2.y - p3.y) * (p1.x - p3.x) + (p3.x - p2.x) * (p1.y - p3.y);
    let u = ((p2.y - p3.y) * (x - p3.x) + (p3.x - p2.x) * (y - p3.y)) / denom;
    let v = ((p3.y - p1.y) * (x - p3.x) + (p1.x - p3.x) * (y - p3.y)) / denom;
    let w = 1.0 - u - v;

    Barycentric { u, v, w }
}

/// First triangle in enumeration order that contains `(x, y)`.
/// First match wins, not best match.
pub fn find_containing_triangle(x: f64, y: f64, triangles: &[Triangle]) -> Option<&Triangle> {
    triangles.iter().find(|t| t.contains(x, y))
}

/// Blend the triangle's vertex depths with the barycentric weights of `(x, y)`
pub fn interpolate_depth(x: f64, y: f64, triangle: &Triangle) -> f64 {
    let b = triangle.barycentric(x, y);
    let [p1, p2, p3] = &triangle.points;
    b.u * p1.z + b.v * p2.z + b.w * p3.z
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::{PointSeed, PointSet};

    fn set(seeds: &[(f64, f64, f64)]) -> PointSet {
        let seeds: Vec<_> = seeds
            .iter()
            .map(|&(x, y, z)| PointSeed::new(x, y, z))
            .collect();
        PointSet::from_seeds(&seeds)
    }

    #[test]
    fn test_too_few_points() {
        assert!(triangulate(&[]).is_empty());
        let two = set(&[(0.0, 0.0, 0.0), (1.0, 1.0, 1.0)]);
        assert!(triangulate(two.points()).is_empty());
    }

    #[test]
    fn test_three_points_single_triangle() {
        let three = set(&[(0.0, 0.0, 0.2), (1.0, 0.0, 0.8), (0.5, 1.0, 0.5)]);
        let tris = triangulate(three.points());
        assert_eq!(tris.len(), 1);
        assert_eq!(tris[0].points.to_vec(), three.points().to_vec());
        assert!((tris[0].centroid.x - 0.5).abs() < 1e-12);
        assert!((tris[0].centroid.z - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_exhaustive_count() {
        let pts = set(&[
            (0.1, 0.1, 0.5),
            (0.9, 0.1, 0.5),
            (0.9, 0.9, 0.5),
            (0.1, 0.9, 0.5),
            (0.5, 0.5, 1.0),
            (0.3, 0.7, 0.2),
        ]);
        assert_eq!(triangulate(pts.points()).len(), 20);
        assert_eq!(triangle_count(6), 20);
        assert_eq!(triangle_count(2), 0);
    }

    #[test]
    fn test_vertex_barycentric_is_unit() {
        let three = set(&[(0.1, 0.2, 0.0), (0.9, 0.3, 0.0), (0.4, 0.8, 0.0)]);
        let tri = &triangulate(three.points())[0];

        for vertex in &tri.points {
            let b = barycentric(vertex.x, vertex.y, tri);
            let mut coords = [b.u, b.v, b.w];
            coords.sort_by(|a, b| a.partial_cmp(b).unwrap());
            assert!(coords[0].abs() < 1e-9);
            assert!(coords[1].abs() < 1e-9);
            assert!((coords[2] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_degenerate_triangle_not_contained() {
        let collinear = set(&[(0.0, 0.0, 0.0), (0.5, 0.5, 0.5), (1.0, 1.0, 1.0)]);
        let tris = triangulate(collinear.points());
        let b = barycentric(0.25, 0.25, &tris[0]);
        assert!(!b.is_finite());
        assert!(!b.is_inside());
        assert!(find_containing_triangle(0.25, 0.25, &tris).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        // Big triangle first, then a smaller one nested inside it
        let pts = set(&[
            (0.0, 0.0, 0.0),
            (1.0, 0.0, 0.0),
            (0.0, 1.0, 0.0),
            (0.1, 0.1, 1.0),
        ]);
        let tris = triangulate(pts.points());
        let hit = find_containing_triangle(0.15, 0.15, &tris).unwrap();
        assert_eq!(hit, &tris[0]);
    }

    #[test]
    fn test_outside_point() {
        let three = set(&[(0.0, 0.0, 0.0), (0.5, 0.0, 0.0), (0.0, 0.5, 0.0)]);
        let tris = triangulate(three.points());
        assert!(find_containing_triangle(0.9, 0.9, &tris).is_none());
    }

    #[test]
    fn test_interpolate_depth() {
        let three = set(&[(0.0, 0.0, 0.0), (1.0, 0.0, 1.0), (0.0, 1.0, 0.0)]);
        let tri = &triangulate(three.points())[0];
        assert!((interpolate_depth(0.5, 0.0, tri) - 0.5).abs() < 1e-12);
        assert!((interpolate_depth(1.0, 0.0, tri) - 1.0).abs() < 1e-12);
        assert!((interpolate_depth(0.25, 0.25, tri) - 0.25).abs() < 1e-12);
    }
}
