//! Engine data structures: meshes, instances and textures.
//!
//! - `model` contains vertex formats and GPU meshes
//! - `instance` holds per-instance transformation data
//! - `texture` wraps depth and capture render targets

pub mod instance;
pub mod model;
pub mod texture;
