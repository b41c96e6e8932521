//! Configuration bundles.
//!
//! [`Settings`] is what the controller mutates between frames. [`SceneConfig`]
//! is fixed when the scene is built and describes the environment around the
//! surface.

use crate::{
    shading::PressurePalette,
    wind::{ModelOrientation, WindField},
};

/// Side length of the particle volume when nothing else is configured.
pub const DEFAULT_BOUNDS: f32 = 150.0;

/// Per-frame user settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    pub wind: WindField,
    pub orientation: ModelOrientation,
    /// Side length of the cubic volume the streamlines live in.
    pub bounds: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wind: WindField::default(),
            orientation: ModelOrientation::default(),
            bounds: DEFAULT_BOUNDS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightConfig {
    /// Direction the light travels in world space.
    pub direction: [f32; 3],
    pub color: [f32; 3],
    pub ambient: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            direction: [-0.4, -1.0, -0.3],
            color: [1.0, 1.0, 1.0],
            ambient: 0.35,
        }
    }
}

/// Linear distance fog, measured from the camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FogConfig {
    pub color: [f32; 3],
    pub near: f32,
    pub far: f32,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            color: [0.06, 0.07, 0.1],
            near: 150.0,
            far: 900.0,
        }
    }
}

impl FogConfig {
    /// Clear colour matching the fog so distant geometry fades into the background.
    pub fn clear_colour(&self) -> wgpu::Color {
        wgpu::Color {
            r: self.color[0] as f64,
            g: self.color[1] as f64,
            b: self.color[2] as f64,
            a: 1.0,
        }
    }
}

/// Ground grid drawn below the particle volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridConfig {
    /// Total side length of the grid.
    pub size: f32,
    pub divisions: u32,
    /// Height of the grid plane.
    pub height: f32,
    pub center_color: [f32; 3],
    pub line_color: [f32; 3],
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 400.0,
            divisions: 40,
            height: -DEFAULT_BOUNDS / 2.0,
            center_color: [0.45, 0.45, 0.5],
            line_color: [0.2, 0.22, 0.26],
        }
    }
}

/// Static environment of the tunnel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SceneConfig {
    pub palette: PressurePalette,
    pub light: LightConfig,
    pub fog: FogConfig,
    pub grid: GridConfig,
}
