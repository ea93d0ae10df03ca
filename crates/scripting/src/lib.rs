//! Script hosting for scene objects.
//!
//! Each `Script` component slot is bound to one module instance. Modules are either
//! native Rust types implementing [`ScriptModule`] or Rhai source files. A module only
//! sees its object through a [`ScriptSandbox`], which also carries the whitelisted
//! engine services (input, audio, the global store, network).

pub mod api;
pub mod convert;
pub mod engine;
pub mod error;
pub mod module;
pub mod sandbox;

pub use engine::*;
pub use error::*;
pub use module::*;
pub use sandbox::*;
