//! Behavior-tree AI for scene objects.
//!
//! Trees are plain data ([`NodeDef`]) evaluated from the root every tick. Leaves name
//! conditions and actions registered on the [`BehaviorTreeManager`]; each object keeps
//! its own [`AiState`] blackboard between ticks.

pub mod builtins;
pub mod context;
pub mod error;
pub mod manager;
pub mod tree;

pub use context::*;
pub use error::*;
pub use manager::*;
pub use tree::*;
