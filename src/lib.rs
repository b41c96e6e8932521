//! flow-tunnel
//!
//! A small virtual wind tunnel. A user supplied surface mesh is shown inside a
//! uniform wind field: every fragment is coloured by a pressure heuristic based
//! on how directly it faces the wind, and instanced streaks stream past it.
//! There is no fluid simulation; both effects are visual only. The current view
//! can be captured as an image for later analysis.
//!
//! High-level modules
//! - `wind`: wind settings, surface orientation and the per-frame inputs derived from them
//! - `shading`: host mirror of the pressure colouring done on the GPU
//! - `particles`: the streamline particle pool and streak transforms
//! - `resources`: reading and parsing STL, OBJ and glTF meshes into surfaces
//! - `loader`: ordering of asynchronous loads so only the latest one wins
//! - `camera`: orbit camera, controller and uniforms for view/projection
//! - `context`: GPU device, window surface and shared uniforms
//! - `data_structures`: meshes, instances and render textures
//! - `pipelines`: the pressure, streamline, grid and lighting pipelines
//! - `scene`: composition of everything drawn in one frame
//! - `render`: frame encoding and presentation
//! - `snapshot`: offscreen capture of the current view
//! - `flow`: the event loop and the controller trait driving it
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod loader;
pub mod particles;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod shading;
pub mod snapshot;
pub mod wind;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use config::{SceneConfig, Settings};
pub use flow::{Out, TunnelFlow, run, run_with};
pub use image;
pub use wind::{ModelOrientation, WindField};
pub use winit::event::{ElementState, KeyEvent, WindowEvent};
pub use winit::keyboard::{KeyCode, PhysicalKey};
