//! Warp point storage
//!
//! Points live in normalized image space: `x`/`y` run from 0.0 (left/top) to
//! 1.0 (right/bottom), `z` runs from 0.0 (far, recessed) to 1.0 (close,
//! raised). A [`PointSet`] is never modified in place; every mutation builds
//! and returns a new set so callers can hold on to older snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Depth assigned to points added without an explicit `z`
pub const DEFAULT_DEPTH: f64 = 0.5;

/// Opaque identifier of a warp point, unique within its set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(pub u64);

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A control point with normalized position and depth
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WarpPoint {
    pub id: PointId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub locked: bool,
}

impl WarpPoint {
    pub fn new(id: PointId, x: f64, y: f64, z: f64) -> Self {
        Self {
            id,
            x: clamp_unit(x),
            y: clamp_unit(y),
            z: clamp_unit(z),
            locked: false,
        }
    }

    /// Strip identity, keeping only position and depth
    pub fn seed(&self) -> PointSeed {
        PointSeed {
            x: self.x,
            y: self.y,
            z: self.z,
        }
    }
}

/// A point without identity, as produced by presets and the auto-detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointSeed {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PointSeed {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Create from pixel coordinates
    pub fn from_pixels(px: f64, py: f64, z: f64, width: u32, height: u32) -> Self {
        Self {
            x: clamp_unit(px / width.max(1) as f64),
            y: clamp_unit(py / height.max(1) as f64),
            z: clamp_unit(z),
        }
    }
}

/// Clamp a coordinate into [0, 1]; NaN collapses to 0
#[inline]
pub fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Ordered collection of warp points
///
/// Insertion order matters: it is the enumeration order used by the
/// triangulation, and therefore decides which triangle wins on overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    points: Vec<WarpPoint>,
    /// Next ID to hand out; never rewinds so IDs are not reused
    #[serde(default = "default_next_id")]
    next_id: u64,
}

fn default_next_id() -> u64 {
    1
}

impl Default for PointSet {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            next_id: default_next_id(),
        }
    }
}

impl PointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from seeds, assigning fresh IDs in order
    pub fn from_seeds<'a, I>(seeds: I) -> Self
    where
        I: IntoIterator<Item = &'a PointSeed>,
    {
        Self::default().replaced(seeds)
    }

    pub fn points(&self) -> &[WarpPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, id: PointId) -> Option<&WarpPoint> {
        self.points.iter().find(|p| p.id == id)
    }

    /// Return a new set with an extra point appended, plus the new point's ID
    pub fn with_added(&self, x: f64, y: f64, z: f64) -> (Self, PointId) {
        let mut next = self.clone();
        let id = next.allocate_id();
        next.points.push(WarpPoint::new(id, x, y, z));
        (next, id)
    }

    /// Return a new set with point `id` updated by `f`, re-clamped afterwards.
    /// `None` if no such point exists.
    pub fn with_updated<F>(&self, id: PointId, f: F) -> Option<Self>
    where
        F: FnOnce(&mut WarpPoint),
    {
        let index = self.points.iter().position(|p| p.id == id)?;
        let mut next = self.clone();
        let point = &mut next.points[index];
        f(point);
        point.id = id;
        point.x = clamp_unit(point.x);
        point.y = clamp_unit(point.y);
        point.z = clamp_unit(point.z);
        Some(next)
    }

    /// Return a new set without point `id`, or `None` if it was not present
    pub fn without(&self, id: PointId) -> Option<Self> {
        if self.get(id).is_none() {
            return None;
        }
        let mut next = self.clone();
        next.points.retain(|p| p.id != id);
        Some(next)
    }

    /// Return an empty set that keeps the ID counter
    pub fn cleared(&self) -> Self {
        Self {
            points: Vec::new(),
            next_id: self.next_id,
        }
    }

    /// Return a set holding exactly `seeds`, each with a fresh ID
    pub fn replaced<'a, I>(&self, seeds: I) -> Self
    where
        I: IntoIterator<Item = &'a PointSeed>,
    {
        let mut next = self.cleared();
        for seed in seeds {
            let id = next.allocate_id();
            next.points.push(WarpPoint::new(id, seed.x, seed.y, seed.z));
        }
        next
    }

    fn allocate_id(&mut self) -> PointId {
        let id = PointId(self.next_id);
        self.next_id += 1;
        id
    }
}
