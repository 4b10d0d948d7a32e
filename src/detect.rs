//! Heuristic warp point detection from a body photo
//!
//! Edge-driven: pixels with a strong Sobel response are ranked by strength
//! and evenly subsampled, each becoming a point whose depth is the pixel's
//! brightness (brighter reads as closer). If the image has no edges above the
//! threshold the detector falls back to sampling cell centers on a coarse
//! grid, so a flat photo still produces a usable seed set.

use image::RgbaImage;
use imageproc::gradients::{HORIZONTAL_SOBEL, VERTICAL_SOBEL};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WarpError};
use crate::points::PointSeed;

/// Sobel magnitude above which a pixel counts as an edge
pub const DEFAULT_EDGE_THRESHOLD: f64 = 50.0;

/// Points requested when callers don't say
pub const DEFAULT_MAX_POINTS: usize = 12;

/// Upper bound on points a single detection may return
pub const MAX_DETECT_POINTS: usize = 1024;

/// A validated view of an RGBA8 pixel buffer
#[derive(Debug, Clone, Copy)]
pub struct PixelBuffer<'a> {
    width: u32,
    height: u32,
    data: &'a [u8],
}

impl<'a> PixelBuffer<'a> {
    /// Wrap `data`, which must hold exactly `width * height * 4` bytes
    pub fn new(width: u32, height: u32, data: &'a [u8]) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(WarpError::PixelBuffer {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_image(image: &'a RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            data: image.as_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Mean of the RGB channels at `(x, y)`, 0-255
    #[inline]
    pub fn brightness(&self, x: u32, y: u32) -> f64 {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        match self.data.get(idx..idx + 3) {
            Some(px) => (px[0] as f64 + px[1] as f64 + px[2] as f64) / 3.0,
            None => 0.0,
        }
    }

    /// Row-major grayscale plane, unquantized mean of RGB per pixel
    fn to_gray(&self) -> Vec<f64> {
        self.data
            .par_chunks_exact(4)
            .map(|px| (px[0] as f64 + px[1] as f64 + px[2] as f64) / 3.0)
            .collect()
    }
}

/// Decode an encoded image (PNG/JPEG) into RGBA8
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Detector parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectOptions {
    pub max_points: usize,
    pub edge_threshold: f64,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_POINTS,
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
        }
    }
}

/// Which strategy produced the points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectStrategy {
    Edges,
    Grid,
}

/// Detector output with some bookkeeping for logs and the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub points: Vec<PointSeed>,
    pub strategy: DetectStrategy,
    /// Edge pixels above the threshold before subsampling
    pub edge_candidates: usize,
}

#[derive(Debug, Clone, Copy)]
struct EdgePixel {
    x: u32,
    y: u32,
    strength: f64,
}

/// Detect at most `max_points` warp points in `pixels`
pub fn auto_detect_warp_points(
    pixels: &PixelBuffer<'_>,
    max_points: usize,
    edge_threshold: f64,
) -> Vec<PointSeed> {
    detect(
        pixels,
        &DetectOptions {
            max_points,
            edge_threshold,
        },
    )
    .points
}

/// Run the detector, reporting which strategy was used
pub fn detect(pixels: &PixelBuffer<'_>, options: &DetectOptions) -> Detection {
    let max_points = options.max_points.min(MAX_DETECT_POINTS);
    if pixels.is_empty() || max_points == 0 {
        return Detection {
            points: Vec::new(),
            strategy: DetectStrategy::Grid,
            edge_candidates: 0,
        };
    }

    let mut edges = find_edge_pixels(pixels, options.edge_threshold);
    let edge_candidates = edges.len();

    if edges.is_empty() {
        tracing::debug!("No edges above {}, falling back to grid sampling", options.edge_threshold);
        return Detection {
            points: grid_sample(pixels, max_points),
            strategy: DetectStrategy::Grid,
            edge_candidates,
        };
    }

    // Stable: equal strengths keep scan order
    edges.sort_by(|a, b| {
        b.strength
            .partial_cmp(&a.strength)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let selected = select_distributed(&edges, max_points);
    let (w, h) = (pixels.width(), pixels.height());
    let points = selected
        .iter()
        .map(|e| PointSeed::from_pixels(e.x as f64, e.y as f64, pixels.brightness(e.x, e.y) / 255.0, w, h))
        .collect();

    Detection {
        points,
        strategy: DetectStrategy::Edges,
        edge_candidates,
    }
}

/// Interior pixels whose Sobel magnitude exceeds `threshold`, in scan order.
/// The one-pixel border is never an edge.
fn find_edge_pixels(pixels: &PixelBuffer<'_>, threshold: f64) -> Vec<EdgePixel> {
    let (w, h) = (pixels.width(), pixels.height());
    if w < 3 || h < 3 {
        return Vec::new();
    }

    let gray = pixels.to_gray();
    let gray = &gray;

    (1..h - 1)
        .into_par_iter()
        .flat_map_iter(move |y| {
            (1..w - 1).filter_map(move |x| {
                let strength = sobel_magnitude(gray, w as usize, x as usize, y as usize);
                (strength > threshold).then_some(EdgePixel { x, y, strength })
            })
        })
        .collect()
}

/// Sobel gradient magnitude at an interior pixel of a row-major plane
#[inline]
fn sobel_magnitude(gray: &[f64], width: usize, x: usize, y: usize) -> f64 {
    let mut gx = 0.0;
    let mut gy = 0.0;
    for ky in 0..3 {
        let row = (y + ky - 1) * width;
        for kx in 0..3 {
            let value = gray[row + x + kx - 1];
            gx += HORIZONTAL_SOBEL[ky * 3 + kx] as f64 * value;
            gy += VERTICAL_SOBEL[ky * 3 + kx] as f64 * value;
        }
    }
    (gx * gx + gy * gy).sqrt()
}

/// Evenly pick `count` entries at indices `i * floor(len / count)`
fn select_distributed(edges: &[EdgePixel], count: usize) -> Vec<EdgePixel> {
    if edges.len() <= count {
        return edges.to_vec();
    }

    let step = edges.len() / count;
    (0..count)
        .map(|i| i * step)
        .filter_map(|idx| edges.get(idx).copied())
        .collect()
}

/// One point per cell center on a `c × c` grid, `c = ceil(sqrt(max_points))`,
/// row-major and truncated to `max_points`
fn grid_sample(pixels: &PixelBuffer<'_>, max_points: usize) -> Vec<PointSeed> {
    let cells = (max_points as f64).sqrt().ceil().max(1.0) as usize;
    let (w, h) = (pixels.width(), pixels.height());

    let mut points = Vec::with_capacity(max_points);
    'rows: for row in 0..cells {
        for col in 0..cells {
            if points.len() >= max_points {
                break 'rows;
            }
            let x = (col as f64 + 0.5) / cells as f64;
            let y = (row as f64 + 0.5) / cells as f64;
            let px = ((x * w as f64) as u32).min(w - 1);
            let py = ((y * h as f64) as u32).min(h - 1);
            let z = pixels.brightness(px, py) / 255.0;
            points.push(PointSeed::new(x, y, z));
        }
    }

    points
}
