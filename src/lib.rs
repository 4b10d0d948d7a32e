//! InkDrape - surface warp engine for tattoo previews
//!
//! Reconstructs a height field from sparse depth-tagged control points over a
//! body photo, and turns it into mesh feedback and overlay transforms that
//! make a flat design look draped over the skin.
//!
//! The numeric core (`height_field`, `triangulation`, `transform`,
//! `terrain_mesh`, `detect`, `presets`) is a set of pure functions. UI edits
//! go through `session`, and `server` exposes the session over HTTP.

pub mod config;
pub mod detect;
pub mod error;
pub mod height_field;
pub mod points;
pub mod presets;
pub mod server;
pub mod session;
pub mod terrain_mesh;
pub mod transform;
pub mod triangulation;

pub use error::WarpError;
pub use height_field::{interpolate_height, HeightField};
pub use points::{PointId, PointSeed, PointSet, WarpPoint};
pub use session::{WarpCommand, WarpSession};
pub use transform::{terrain_transform, triangle_warp, WarpTransform};
pub use triangulation::{triangulate, Triangle};
