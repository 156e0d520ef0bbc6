//! Ember engine crate.
//!
//! Reference-counted GPU resources (buffers, meshes, shaders, textures, render
//! targets) over an immediate-mode GLES-class API. The API itself sits behind
//! [`device::GlApi`]; [`device::headless::HeadlessGl`] runs everything without a GPU.

pub mod core;
pub mod device;
pub mod logging;
pub mod render;
