//! Terrain mesh visualization data
//!
//! Samples the height field on a regular lattice and attaches a color hint to
//! every sample (green for low, red for high). The renderer decides how to
//! draw it; this module only produces numbers.

use serde::{Deserialize, Serialize};

use crate::height_field::HeightField;
use crate::points::WarpPoint;

/// Grid resolution used when callers don't specify one
pub const DEFAULT_GRID_SIZE: usize = 15;

/// Largest accepted grid resolution
pub const MAX_GRID_SIZE: usize = 256;

/// Color in HSL space: hue in degrees, saturation/lightness in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
}

impl Hsl {
    pub fn new(hue: f64, saturation: f64, lightness: f64) -> Self {
        Self {
            hue,
            saturation,
            lightness,
        }
    }

    /// Convert to 8-bit RGB
    pub fn to_rgb(&self) -> [u8; 3] {
        let h = self.hue.rem_euclid(360.0) / 60.0;
        let s = (self.saturation / 100.0).clamp(0.0, 1.0);
        let l = (self.lightness / 100.0).clamp(0.0, 1.0);

        let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
        let m = l - chroma / 2.0;

        let (r, g, b) = match h as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };

        let to_byte = |c: f64| ((c + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        [to_byte(r), to_byte(g), to_byte(b)]
    }
}

/// Saturation and lightness of the height gradient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightPalette {
    #[serde(default = "default_saturation")]
    pub saturation: f64,
    #[serde(default = "default_lightness")]
    pub lightness: f64,
}

fn default_saturation() -> f64 { 70.0 }
fn default_lightness() -> f64 { 60.0 }

impl Default for HeightPalette {
    fn default() -> Self {
        Self {
            saturation: default_saturation(),
            lightness: default_lightness(),
        }
    }
}

impl HeightPalette {
    /// Map a height in [0, 1] onto the green (low) to red (high) hue ramp
    pub fn color(&self, height: f64) -> Hsl {
        let h = height.clamp(0.0, 1.0);
        Hsl::new(120.0 * (1.0 - h), self.saturation, self.lightness)
    }
}

/// One lattice sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshSample {
    pub x: f64,
    pub y: f64,
    pub height: f64,
}

/// Row-major lattice of height samples with parallel color hints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainMesh {
    pub grid_size: usize,
    pub samples: Vec<MeshSample>,
    pub colors: Vec<Hsl>,
}

impl TerrainMesh {
    /// Samples per row; at least one
    fn stride(&self) -> usize {
        self.grid_size.max(1)
    }

    /// Index polylines for each lattice row
    pub fn row_lines(&self) -> Vec<Vec<usize>> {
        let n = self.stride();
        (0..n)
            .map(|row| (0..n).map(|col| row * n + col).collect())
            .collect()
    }

    /// Index polylines for each lattice column
    pub fn column_lines(&self) -> Vec<Vec<usize>> {
        let n = self.stride();
        (0..n)
            .map(|col| (0..n).map(|row| row * n + col).collect())
            .collect()
    }
}

/// Sample the height field on a `grid_size × grid_size` lattice covering
/// [0, 1]² with corners included. `grid_size` below 2 yields one sample and
/// anything above [`MAX_GRID_SIZE`] is clamped to it.
pub fn generate_terrain_mesh(
    points: &[WarpPoint],
    grid_size: usize,
    palette: &HeightPalette,
) -> TerrainMesh {
    let n = grid_size.clamp(1, MAX_GRID_SIZE);
    let divisions = (n.saturating_sub(1)).max(1) as f64;
    let field = HeightField::new(points);

    let mut samples = Vec::with_capacity(n.saturating_mul(n));
    let mut colors = Vec::with_capacity(n.saturating_mul(n));

    for row in 0..n {
        for col in 0..n {
            let x = col as f64 / divisions;
            let y = row as f64 / divisions;
            let height = field.height(x, y);
            samples.push(MeshSample { x, y, height });
            colors.push(palette.color(height));
        }
    }

    TerrainMesh {
        grid_size: n,
        samples,
        colors,
    }
}
