//! Body shape presets
//!
//! Fixed point templates for common tattoo placements. Applying one replaces
//! the whole point set (see `WarpCommand::ApplyPreset`).

use serde::Serialize;

use crate::points::PointSeed;

/// Surface archetype a preset models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Cylindrical,
    Spherical,
    Planar,
    Custom,
}

#[derive(Debug, Clone, Serialize)]
pub struct BodyShapePreset {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: ShapeKind,
    pub points: &'static [PointSeed],
    pub description: &'static str,
}

const fn p(x: f64, y: f64, z: f64) -> PointSeed {
    PointSeed::new(x, y, z)
}

static PRESETS: [BodyShapePreset; 5] = [
    BodyShapePreset {
        id: "arm",
        name: "Arm (Cylindrical)",
        kind: ShapeKind::Cylindrical,
        points: &[
            p(0.2, 0.3, 0.8),
            p(0.8, 0.3, 0.2),
            p(0.5, 0.5, 1.0),
            p(0.2, 0.7, 0.8),
            p(0.8, 0.7, 0.2),
        ],
        description: "Optimized for arm tattoos with cylindrical warping",
    },
    BodyShapePreset {
        id: "shoulder",
        name: "Shoulder (Spherical)",
        kind: ShapeKind::Spherical,
        points: &[
            p(0.3, 0.2, 0.9),
            p(0.7, 0.2, 0.9),
            p(0.5, 0.4, 1.0),
            p(0.2, 0.6, 0.7),
            p(0.8, 0.6, 0.7),
            p(0.5, 0.8, 0.5),
        ],
        description: "Optimized for shoulder tattoos with spherical warping",
    },
    BodyShapePreset {
        id: "back",
        name: "Back (Planar)",
        kind: ShapeKind::Planar,
        points: &[
            p(0.2, 0.2, 0.9),
            p(0.8, 0.2, 0.9),
            p(0.2, 0.8, 0.9),
            p(0.8, 0.8, 0.9),
            p(0.5, 0.5, 1.0),
        ],
        description: "Optimized for back tattoos with minimal warping",
    },
    BodyShapePreset {
        id: "chest",
        name: "Chest (Pectoral)",
        kind: ShapeKind::Spherical,
        points: &[
            p(0.3, 0.35, 1.0),
            p(0.7, 0.35, 1.0),
            p(0.5, 0.3, 0.7),
            p(0.5, 0.6, 0.6),
            p(0.15, 0.5, 0.6),
            p(0.85, 0.5, 0.6),
            p(0.3, 0.75, 0.7),
            p(0.7, 0.75, 0.7),
        ],
        description: "Two raised pectoral domes around a shallow sternum",
    },
    BodyShapePreset {
        id: "leg",
        name: "Leg (Cylindrical)",
        kind: ShapeKind::Cylindrical,
        points: &[
            p(0.5, 0.15, 0.9),
            p(0.2, 0.2, 0.4),
            p(0.8, 0.2, 0.4),
            p(0.5, 0.5, 1.0),
            p(0.25, 0.5, 0.5),
            p(0.75, 0.5, 0.5),
            p(0.5, 0.85, 0.8),
            p(0.3, 0.85, 0.3),
            p(0.7, 0.85, 0.3),
        ],
        description: "Thigh to calf, raised along the front and falling away at the sides",
    },
];

/// The full preset catalog
pub fn presets() -> &'static [BodyShapePreset] {
    &PRESETS
}

/// Look up a preset by ID
pub fn find_preset(id: &str) -> Option<&'static BodyShapePreset> {
    PRESETS.iter().find(|preset| preset.id == id)
}
