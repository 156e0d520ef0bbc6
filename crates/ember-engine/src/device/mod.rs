//! GPU API boundary.
//!
//! Responsibilities:
//! - define the immediate-mode API surface ([`GlApi`]) with typed object names
//! - share one API instance between resources ([`Context`])
//! - surface driver error codes ([`GlError`], [`Context::check_errors`])
//!
//! The resource layer in [`crate::render`] only talks to [`GlApi`]; the
//! [`headless`] backend implements it in software. With the `glow` feature,
//! `GlowGl` forwards it to a real OpenGL (ES) context.

mod api;
mod context;
mod error;
#[cfg(all(feature = "glow", not(target_arch = "wasm32")))]
mod native;
pub mod headless;
mod types;

pub use api::GlApi;
pub use context::{Context, ContextConfig};
pub use error::GlError;
#[cfg(all(feature = "glow", not(target_arch = "wasm32")))]
pub use native::GlowGl;
pub use types::*;
