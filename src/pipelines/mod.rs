//! Render pipelines, one per kind of geometry in the tunnel.
//!
//! Bind group 0 is always the camera. The grid and the streaks read the
//! lighting and fog environment from group 1; the surface reads its pressure
//! uniform from group 1 instead.

pub mod basic;
pub mod grid;
pub mod light;
pub mod pressure;
pub mod streamline;
