//! Command boundary between the UI and the warp engine
//!
//! UI events (click, drag, slider, preset button, auto-detect) are expressed
//! as [`WarpCommand`]s. Applying a command to a [`PointSet`] yields a new set;
//! [`WarpSession`] holds the single live set plus the warp settings and swaps
//! in each result, so the last applied command wins.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::WarpSettings;
use crate::detect::{detect, DetectOptions, Detection, PixelBuffer};
use crate::error::{Result, WarpError};
use crate::points::{PointId, PointSeed, PointSet, WarpPoint, DEFAULT_DEPTH};
use crate::presets::find_preset;
use crate::terrain_mesh::{generate_terrain_mesh, HeightPalette, Hsl, TerrainMesh};
use crate::transform::{terrain_transform, triangle_warp, Anchor, Footprint, TransformMode, WarpTransform};
use crate::triangulation::{triangulate, Triangle};

/// Quick depth buttons: back, mid, front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthLevel {
    Back,
    Mid,
    Front,
}

impl DepthLevel {
    pub fn depth(&self) -> f64 {
        match self {
            DepthLevel::Back => 0.2,
            DepthLevel::Mid => 0.5,
            DepthLevel::Front => 0.8,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "back" => Some(DepthLevel::Back),
            "mid" => Some(DepthLevel::Mid),
            "front" => Some(DepthLevel::Front),
            _ => None,
        }
    }
}

/// A single edit to the point set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WarpCommand {
    Add {
        x: f64,
        y: f64,
        #[serde(default)]
        z: Option<f64>,
    },
    Move {
        id: PointId,
        x: f64,
        y: f64,
    },
    SetDepth {
        id: PointId,
        z: f64,
    },
    QuickDepth {
        id: PointId,
        level: DepthLevel,
    },
    SetLocked {
        id: PointId,
        locked: bool,
    },
    Remove {
        id: PointId,
    },
    Clear,
    ApplyPreset {
        preset: String,
    },
    ReplaceAll {
        points: Vec<PointSeed>,
    },
}

impl PointSet {
    /// Apply `command`, returning the resulting set. `self` is untouched.
    ///
    /// Moving, re-depthing or removing a locked point is rejected; commands
    /// that replace the whole set ignore locks.
    pub fn apply(&self, command: &WarpCommand) -> Result<PointSet> {
        match command {
            WarpCommand::Add { x, y, z } => {
                let (next, _) = self.with_added(*x, *y, z.unwrap_or(DEFAULT_DEPTH));
                Ok(next)
            }
            WarpCommand::Move { id, x, y } => self.edit_unlocked(*id, |p| {
                p.x = *x;
                p.y = *y;
            }),
            WarpCommand::SetDepth { id, z } => self.edit_unlocked(*id, |p| p.z = *z),
            WarpCommand::QuickDepth { id, level } => {
                self.edit_unlocked(*id, |p| p.z = level.depth())
            }
            WarpCommand::SetLocked { id, locked } => self
                .with_updated(*id, |p| p.locked = *locked)
                .ok_or(WarpError::UnknownPoint(*id)),
            WarpCommand::Remove { id } => {
                self.ensure_unlocked(*id)?;
                self.without(*id).ok_or(WarpError::UnknownPoint(*id))
            }
            WarpCommand::Clear => Ok(self.cleared()),
            WarpCommand::ApplyPreset { preset } => {
                let preset = find_preset(preset).ok_or_else(|| WarpError::UnknownPreset(preset.clone()))?;
                Ok(self.replaced(preset.points))
            }
            WarpCommand::ReplaceAll { points } => Ok(self.replaced(points)),
        }
    }

    fn ensure_unlocked(&self, id: PointId) -> Result<()> {
        match self.get(id) {
            None => Err(WarpError::UnknownPoint(id)),
            Some(p) if p.locked => Err(WarpError::PointLocked(id)),
            Some(_) => Ok(()),
        }
    }

    fn edit_unlocked<F>(&self, id: PointId, f: F) -> Result<PointSet>
    where
        F: FnOnce(&mut WarpPoint),
    {
        self.ensure_unlocked(id)?;
        self.with_updated(id, f).ok_or(WarpError::UnknownPoint(id))
    }
}

/// The live point set and warp settings for one editing session
#[derive(Debug, Clone, Default)]
pub struct WarpSession {
    points: PointSet,
    settings: WarpSettings,
    palette: HeightPalette,
}

impl WarpSession {
    pub fn new(settings: WarpSettings, palette: HeightPalette) -> Self {
        Self {
            points: PointSet::new(),
            settings: settings.sanitized(),
            palette,
        }
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }

    pub fn settings(&self) -> &WarpSettings {
        &self.settings
    }

    /// Marker color for a control point at depth `z`, same ramp as the mesh
    pub fn marker_color(&self, z: f64) -> Hsl {
        self.palette.color(z)
    }

    pub fn set_settings(&mut self, settings: WarpSettings) {
        self.settings = settings.sanitized();
        debug!(
            "Warp settings: strength={} enabled={} mode={}",
            self.settings.strength,
            self.settings.enabled,
            self.settings.mode.as_str()
        );
    }

    /// Apply a command and make its result the live set
    pub fn apply(&mut self, command: &WarpCommand) -> Result<&PointSet> {
        match self.points.apply(command) {
            Ok(next) => {
                debug!("Applied {:?}: {} -> {} points", command, self.points.len(), next.len());
                self.points = next;
                Ok(&self.points)
            }
            Err(e) => {
                warn!("Rejected {:?}: {}", command, e);
                Err(e)
            }
        }
    }

    /// Add a point and return its ID
    pub fn add_point(&mut self, x: f64, y: f64, z: Option<f64>) -> PointId {
        let (next, id) = self.points.with_added(x, y, z.unwrap_or(DEFAULT_DEPTH));
        debug!("Added point {}: {} -> {} points", id, self.points.len(), next.len());
        self.points = next;
        id
    }

    /// Detector parameters from the current settings, `max_points` overriding
    pub fn detect_options(&self, max_points: Option<usize>) -> DetectOptions {
        DetectOptions {
            max_points: max_points.unwrap_or(self.settings.detect_max_points),
            edge_threshold: self.settings.edge_threshold,
        }
    }

    /// Install a finished detection as the live set
    pub fn install_detection(&mut self, detection: &Detection) -> Result<&PointSet> {
        debug!(
            "Detected {} points via {:?} ({} edge candidates)",
            detection.points.len(),
            detection.strategy,
            detection.edge_candidates
        );
        self.apply(&WarpCommand::ReplaceAll {
            points: detection.points.clone(),
        })
    }

    /// Run auto-detection on `pixels` and install the result as the live set
    pub fn detect(&mut self, pixels: &PixelBuffer<'_>, max_points: Option<usize>) -> Result<Detection> {
        let detection = detect(pixels, &self.detect_options(max_points));
        self.install_detection(&detection)?;
        Ok(detection)
    }

    pub fn triangles(&self) -> Vec<Triangle> {
        triangulate(self.points.points())
    }

    /// Terrain mesh at `grid_size`, or the configured size
    pub fn terrain_mesh(&self, grid_size: Option<usize>) -> TerrainMesh {
        generate_terrain_mesh(
            self.points.points(),
            grid_size.unwrap_or(self.settings.mesh_grid_size),
            &self.palette,
        )
    }

    /// Transform for an overlay anchored at `anchor`, per the current mode.
    /// Identity when warping is disabled.
    pub fn overlay_transform(&self, anchor: Anchor, footprint: Option<Footprint>) -> WarpTransform {
        if !self.settings.enabled || self.settings.strength == 0.0 {
            return WarpTransform::IDENTITY;
        }

        let points = self.points.points();
        match self.settings.mode {
            TransformMode::Terrain => terrain_transform(
                anchor,
                footprint.unwrap_or(self.settings.footprint),
                points,
                self.settings.strength,
            ),
            TransformMode::Triangle => {
                WarpTransform::uniform(triangle_warp(anchor.x, anchor.y, points, self.settings.strength).scale)
            }
        }
    }
}
