//! Depth-to-transform mapping for overlay draping
//!
//! Two independent modes turn the inferred surface into overlay adjustments:
//!
//! - **Terrain**: samples the height field around the overlay anchor and
//!   derives a uniform scale, a skew from the local gradient and a small
//!   positional offset, like cloth draped over a ridge.
//! - **Triangle**: finds the control triangle under a point and scales by
//!   the interpolated depth (closer is larger). Position is untouched.
//!
//! Callers choose one via [`TransformMode`]; they are not interchangeable.

use serde::{Deserialize, Serialize};

use crate::height_field::HeightField;
use crate::points::WarpPoint;
use crate::triangulation::{find_containing_triangle, interpolate_depth, triangulate};

/// Degrees of skew per unit of height gradient
const SKEW_DEGREES: f64 = 15.0;
/// Offset per unit of height above/below the midline
const OFFSET_GAIN: f64 = 10.0;

/// Which mapper drives the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransformMode {
    /// Smooth draping from height field gradients
    #[default]
    Terrain,
    /// Per-triangle perspective scaling
    Triangle,
}

impl TransformMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformMode::Terrain => "terrain",
            TransformMode::Triangle => "triangle",
        }
    }
}

/// A normalized 2D position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
}

impl Anchor {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Approximate overlay size in normalized coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub width: f64,
    pub height: f64,
}

impl Default for Footprint {
    fn default() -> Self {
        Self {
            width: 0.2,
            height: 0.2,
        }
    }
}

/// Delta to apply to an overlay's base placement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WarpTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    /// Degrees
    pub skew_x: f64,
    /// Degrees
    pub skew_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl WarpTransform {
    pub const IDENTITY: WarpTransform = WarpTransform {
        scale_x: 1.0,
        scale_y: 1.0,
        skew_x: 0.0,
        skew_y: 0.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };

    /// A pure uniform scale
    pub fn uniform(scale: f64) -> Self {
        Self {
            scale_x: scale,
            scale_y: scale,
            ..Self::IDENTITY
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Apply this delta to a base placement: scales multiply, skews and
    /// offsets add
    pub fn compose(&self, base: OverlayPlacement) -> OverlayPlacement {
        OverlayPlacement {
            x: base.x + self.offset_x,
            y: base.y + self.offset_y,
            scale_x: base.scale_x * self.scale_x,
            scale_y: base.scale_y * self.scale_y,
            rotation: base.rotation,
            skew_x: base.skew_x + self.skew_x,
            skew_y: base.skew_y + self.skew_y,
        }
    }
}

impl Default for WarpTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Where and how the overlay is drawn before warping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayPlacement {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub rotation: f64,
    pub skew_x: f64,
    pub skew_y: f64,
}

impl Default for OverlayPlacement {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            skew_x: 0.0,
            skew_y: 0.0,
        }
    }
}

/// Result of the triangle-local mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointWarp {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

#[inline]
fn strength_factor(strength: f64) -> f64 {
    if strength.is_nan() {
        0.0
    } else {
        strength.clamp(0.0, 100.0) / 100.0
    }
}

/// Compute the terrain-draping transform for an overlay at `anchor`.
///
/// `strength` is a percentage (0-100). No points or zero strength yields
/// [`WarpTransform::IDENTITY`].
pub fn terrain_transform(
    anchor: Anchor,
    footprint: Footprint,
    points: &[WarpPoint],
    strength: f64,
) -> WarpTransform {
    let s = strength_factor(strength);
    if points.is_empty() || s == 0.0 {
        return WarpTransform::IDENTITY;
    }

    let field = HeightField::new(points);
    let center = field.height(anchor.x, anchor.y);
    let (dx, dy) = (footprint.width / 4.0, footprint.height / 4.0);
    let (horizontal, vertical) = field.gradient(anchor.x, anchor.y, dx, dy);

    let horizontal_gradient = horizontal * s;
    let vertical_gradient = vertical * s;

    // 0.7..1.3: raised areas stretch the overlay
    let base_scale = 0.7 + center * 0.6;
    let height_scale = 1.0 + (center - 0.5) * s * 0.8;
    let scale = base_scale * height_scale;

    let offset = (center - 0.5) * s * OFFSET_GAIN;

    WarpTransform {
        scale_x: scale,
        scale_y: scale,
        skew_x: horizontal_gradient * SKEW_DEGREES,
        skew_y: vertical_gradient * SKEW_DEGREES,
        offset_x: offset,
        offset_y: offset,
    }
}

/// Perspective scale for a depth: 0.5 (far) to 1.0 (close)
#[inline]
pub fn perspective_scale(depth: f64) -> f64 {
    0.5 + depth * 0.5
}

/// Scale a point by the depth of the control triangle it falls in.
///
/// Needs at least three points and a containing triangle, otherwise the
/// point comes back with scale 1.
pub fn triangle_warp(x: f64, y: f64, points: &[WarpPoint], strength: f64) -> PointWarp {
    let unchanged = PointWarp { x, y, scale: 1.0 };
    if points.len() < 3 {
        return unchanged;
    }

    let triangles = triangulate(points);
    let Some(triangle) = find_containing_triangle(x, y, &triangles) else {
        return unchanged;
    };

    let depth = interpolate_depth(x, y, triangle);
    let scale = 1.0 + (perspective_scale(depth) - 1.0) * strength_factor(strength);

    PointWarp { x, y, scale }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::height_field::interpolate_height;
    use crate::points::{PointSeed, PointSet};

    fn set(seeds: &[(f64, f64, f64)]) -> PointSet {
        let seeds: Vec<_> = seeds
            .iter()
            .map(|&(x, y, z)| PointSeed::new(x, y, z))
            .collect();
        PointSet::from_seeds(&seeds)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identity_when_empty_or_zero_strength() {
        let anchor = Anchor::new(0.5, 0.5);
        let t = terrain_transform(anchor, Footprint::default(), &[], 80.0);
        assert!(t.is_identity());

        let pts = set(&[(0.5, 0.5, 1.0)]);
        let t = terrain_transform(anchor, Footprint::default(), pts.points(), 0.0);
        assert_eq!(t, WarpTransform::IDENTITY);
    }

    #[test]
    fn test_flat_midline_surface() {
        let pts = set(&[(0.2, 0.2, 0.5), (0.8, 0.2, 0.5), (0.5, 0.8, 0.5)]);
        let t = terrain_transform(Anchor::new(0.5, 0.5), Footprint::default(), pts.points(), 100.0);
        assert!(approx(t.scale_x, 1.0));
        assert!(approx(t.scale_y, 1.0));
        assert!(approx(t.skew_x, 0.0));
        assert!(approx(t.offset_x, 0.0));
    }

    #[test]
    fn test_raised_surface_enlarges() {
        let pts = set(&[(0.5, 0.5, 1.0)]);
        let t = terrain_transform(Anchor::new(0.5, 0.5), Footprint::default(), pts.points(), 100.0);
        // base 1.3 * height 1.4
        assert!(approx(t.scale_x, 1.3 * 1.4));
        assert!(approx(t.offset_x, 5.0));
        assert!(approx(t.offset_y, 5.0));
    }

    #[test]
    fn test_gradient_drives_skew() {
        let pts = set(&[(0.0, 0.5, 0.0), (1.0, 0.5, 1.0)]);
        let t = terrain_transform(Anchor::new(0.5, 0.5), Footprint::default(), pts.points(), 100.0);
        assert!(t.skew_x > 0.0);
        assert!(t.skew_y.abs() < 1e-9);

        let half = terrain_transform(Anchor::new(0.5, 0.5), Footprint::default(), pts.points(), 50.0);
        assert!(approx(half.skew_x * 2.0, t.skew_x));
    }

    #[test]
    fn test_skew_matches_sampled_heights() {
        let pts = set(&[(0.1, 0.3, 0.2), (0.9, 0.4, 0.9), (0.5, 0.9, 0.6)]);
        let anchor = Anchor::new(0.45, 0.5);
        let footprint = Footprint::default();
        let t = terrain_transform(anchor, footprint, pts.points(), 60.0);

        let (dx, dy) = (footprint.width / 4.0, footprint.height / 4.0);
        let h = |x, y| interpolate_height(x, y, pts.points());
        let horizontal = h(anchor.x + dx, anchor.y) - h(anchor.x - dx, anchor.y);
        let vertical = h(anchor.x, anchor.y + dy) - h(anchor.x, anchor.y - dy);

        assert!(approx(t.skew_x, horizontal * 0.6 * 15.0));
        assert!(approx(t.skew_y, vertical * 0.6 * 15.0));
    }

    #[test]
    fn test_vertical_gradient_drives_skew_y() {
        // Raised toward the bottom of the image
        let pts = set(&[(0.5, 0.0, 0.0), (0.5, 1.0, 1.0)]);
        let t = terrain_transform(Anchor::new(0.5, 0.5), Footprint::default(), pts.points(), 100.0);
        assert!(t.skew_y > 0.0);
        assert!(t.skew_x.abs() < 1e-9);

        // Raised toward the top flips the sign
        let flipped = set(&[(0.5, 0.0, 1.0), (0.5, 1.0, 0.0)]);
        let t = terrain_transform(Anchor::new(0.5, 0.5), Footprint::default(), flipped.points(), 100.0);
        assert!(t.skew_y < 0.0);
    }

    #[test]
    fn test_compose() {
        let base = OverlayPlacement {
            x: 100.0,
            y: 50.0,
            scale_x: 2.0,
            scale_y: 2.0,
            skew_x: 1.0,
            ..Default::default()
        };
        let delta = WarpTransform {
            scale_x: 1.5,
            scale_y: 0.5,
            skew_x: 2.0,
            skew_y: 3.0,
            offset_x: -4.0,
            offset_y: 4.0,
        };
        let out = delta.compose(base);
        assert_eq!(out.x, 96.0);
        assert_eq!(out.y, 54.0);
        assert_eq!(out.scale_x, 3.0);
        assert_eq!(out.scale_y, 1.0);
        assert_eq!(out.skew_x, 3.0);
        assert_eq!(out.skew_y, 3.0);
    }

    #[test]
    fn test_triangle_warp_needs_three_points() {
        let pts = set(&[(0.0, 0.0, 1.0), (1.0, 0.0, 1.0)]);
        let w = triangle_warp(0.3, 0.1, pts.points(), 100.0);
        assert_eq!(w, PointWarp { x: 0.3, y: 0.1, scale: 1.0 });
    }

    #[test]
    fn test_triangle_warp_scales_by_depth() {
        let pts = set(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0)]);
        let w = triangle_warp(0.2, 0.2, pts.points(), 100.0);
        assert!(approx(w.scale, 0.5));
        assert_eq!((w.x, w.y), (0.2, 0.2));

        let w = triangle_warp(0.2, 0.2, pts.points(), 50.0);
        assert!(approx(w.scale, 0.75));
    }

    #[test]
    fn test_triangle_warp_outside_is_unscaled() {
        let pts = set(&[(0.0, 0.0, 0.0), (0.5, 0.0, 0.0), (0.0, 0.5, 0.0)]);
        let w = triangle_warp(0.9, 0.9, pts.points(), 100.0);
        assert_eq!(w.scale, 1.0);
    }

    #[test]
    fn test_perspective_scale_range() {
        assert_eq!(perspective_scale(0.0), 0.5);
        assert_eq!(perspective_scale(1.0), 1.0);
    }
}
