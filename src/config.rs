//! Configuration management for InkDrape

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::detect::{DEFAULT_EDGE_THRESHOLD, DEFAULT_MAX_POINTS, MAX_DETECT_POINTS};
use crate::terrain_mesh::{HeightPalette, DEFAULT_GRID_SIZE, MAX_GRID_SIZE};
use crate::transform::{Footprint, TransformMode};

/// Warp behavior tunables, adjustable live from the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarpSettings {
    /// Warp strength percentage (0 to 100)
    #[serde(default = "default_strength")]
    pub strength: f64,

    /// Apply warping to the overlay at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Terrain draping or per-triangle perspective
    #[serde(default)]
    pub mode: TransformMode,

    /// Lattice resolution of the terrain mesh
    #[serde(default = "default_grid_size")]
    pub mesh_grid_size: usize,

    /// Points produced by auto-detection
    #[serde(default = "default_max_points")]
    pub detect_max_points: usize,

    /// Sobel magnitude threshold for auto-detection
    #[serde(default = "default_edge_threshold")]
    pub edge_threshold: f64,

    /// Approximate overlay size used for gradient probes
    #[serde(default)]
    pub footprint: Footprint,
}

fn default_strength() -> f64 { 50.0 }
fn default_enabled() -> bool { true }
fn default_grid_size() -> usize { DEFAULT_GRID_SIZE }
fn default_max_points() -> usize { DEFAULT_MAX_POINTS }
fn default_edge_threshold() -> f64 { DEFAULT_EDGE_THRESHOLD }

impl Default for WarpSettings {
    fn default() -> Self {
        Self {
            strength: default_strength(),
            enabled: default_enabled(),
            mode: TransformMode::default(),
            footprint: Footprint::default(),
            mesh_grid_size: default_grid_size(),
            detect_max_points: default_max_points(),
            edge_threshold: default_edge_threshold(),
        }
    }
}

impl WarpSettings {
    /// Clamp values into their valid ranges
    pub fn sanitized(mut self) -> Self {
        self.strength = if self.strength.is_nan() {
            0.0
        } else {
            self.strength.clamp(0.0, 100.0)
        };
        self.footprint.width = self.footprint.width.abs();
        self.footprint.height = self.footprint.height.abs();
        self.mesh_grid_size = self.mesh_grid_size.clamp(1, MAX_GRID_SIZE);
        self.detect_max_points = self.detect_max_points.min(MAX_DETECT_POINTS);
        self
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8092,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub warp: WarpSettings,

    /// Color hints for the terrain mesh and point markers
    #[serde(default)]
    pub mesh: HeightPalette,
}

impl Config {
    /// Load configuration from a file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {:?}", parent))?;
            }
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = WarpSettings::default();
        assert_eq!(settings.strength, 50.0);
        assert!(settings.enabled);
        assert_eq!(settings.mode, TransformMode::Terrain);
        assert_eq!(settings.mesh_grid_size, 15);
        assert_eq!(settings.detect_max_points, 12);
    }

    #[test]
    fn test_sanitize_clamps() {
        let settings = WarpSettings {
            strength: 250.0,
            mesh_grid_size: 0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.strength, 100.0);
        assert_eq!(settings.mesh_grid_size, 1);

        let settings = WarpSettings {
            mesh_grid_size: 100_000,
            detect_max_points: usize::MAX,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.mesh_grid_size, MAX_GRID_SIZE);
        assert_eq!(settings.detect_max_points, MAX_DETECT_POINTS);
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [warp]
            strength = 80.0
            mode = "triangle"
            "#,
        )
        .unwrap();
        assert_eq!(config.warp.strength, 80.0);
        assert_eq!(config.warp.mode, TransformMode::Triangle);
        assert_eq!(config.warp.edge_threshold, 50.0);
        assert_eq!(config.server.port, 8092);
        assert_eq!(config.mesh.saturation, 70.0);
    }

    #[test]
    fn test_toml_roundtrip_keeps_settings() {
        let mut config = Config::default();
        config.warp.strength = 33.0;
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.warp, config.warp);
    }
}
