//! Logging setup.
//!
//! The engine itself only emits through the `log` facade (GPU errors, shader
//! logs, texture warnings, leak reports). Binaries call [`init_logging`] once
//! to route those records to `env_logger`.

mod init;

pub use init::{init_logging, LoggingConfig};
