//! Core engine types and utilities.
//!
//! This crate provides the foundational types used across all engine systems:
//! - Transform and spatial value types
//! - Time management and timers
//! - The closed component schema attached to scene objects

pub mod color;
pub mod components;
pub mod error;
pub mod id;
pub mod math;
pub mod time;
pub mod timer;
pub mod transform;

pub use color::*;
pub use components::*;
pub use error::*;
pub use id::*;
pub use time::*;
pub use timer::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
