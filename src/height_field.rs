//! Inverse-distance-weighted height field over the image plane

use crate::points::WarpPoint;

/// Height returned when there are no control points
pub const NEUTRAL_HEIGHT: f64 = 0.5;

/// Queries closer than this to a control point return its depth exactly
pub const SNAP_DISTANCE: f64 = 0.001;

/// Added to squared distances so weights stay finite near control points
const WEIGHT_EPSILON: f64 = 0.01;

/// Interpolate the surface height at `(x, y)` from the control points.
///
/// Uses inverse distance weighting with `w = 1 / (d² + ε)`. Exact at control
/// points: a query within [`SNAP_DISTANCE`] of a point returns that point's
/// `z`, the first such point in order winning.
pub fn interpolate_height(x: f64, y: f64, points: &[WarpPoint]) -> f64 {
    if points.is_empty() {
        return NEUTRAL_HEIGHT;
    }

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for p in points {
        let dx = x - p.x;
        let dy = y - p.y;
        let dist_sq = dx * dx + dy * dy;

        if dist_sq.sqrt() < SNAP_DISTANCE {
            return p.z;
        }

        let weight = 1.0 / (dist_sq + WEIGHT_EPSILON);
        weighted_sum += weight * p.z;
        weight_total += weight;
    }

    if weight_total > 0.0 && weighted_sum.is_finite() {
        (weighted_sum / weight_total).clamp(0.0, 1.0)
    } else {
        NEUTRAL_HEIGHT
    }
}

/// A borrowed view of a point set as a continuous height function
#[derive(Debug, Clone, Copy)]
pub struct HeightField<'a> {
    points: &'a [WarpPoint],
}

impl<'a> HeightField<'a> {
    pub fn new(points: &'a [WarpPoint]) -> Self {
        Self { points }
    }

    #[inline]
    pub fn height(&self, x: f64, y: f64) -> f64 {
        interpolate_height(x, y, self.points)
    }

    /// Central differences `(h(x+dx) - h(x-dx), h(y+dy) - h(y-dy))`
    pub fn gradient(&self, x: f64, y: f64, dx: f64, dy: f64) -> (f64, f64) {
        let horizontal = self.height(x + dx, y) - self.height(x - dx, y);
        let vertical = self.height(x, y + dy) - self.height(x, y - dy);
        (horizontal, vertical)
    }
}
