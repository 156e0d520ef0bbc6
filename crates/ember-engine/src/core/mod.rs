//! Object lifetime layer.
//!
//! Every engine resource embeds an [`Object`] (its reference count) and is shared
//! through [`Handle`]s. The thread-local [`registry`] tallies live objects and
//! reports leaks at teardown.

mod handle;
mod object;
pub mod registry;

pub use handle::Handle;
pub use object::{Managed, Object};
pub use registry::{LeakReport, LiveObject, RegistryConfig};
