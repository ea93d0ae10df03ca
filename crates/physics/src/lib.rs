//! Lightweight rigid-body physics over scene components.
//!
//! One integrator, broad phase and narrow phase serve both dimensions through the
//! [`PhysicsVector`] trait: 2D objects use `Rigidbody2D`/`BoxCollider2D`, 3D objects use
//! `Rigidbody3D`/`BoxCollider3D`.

pub mod body;
pub mod collision;
pub mod physics_system;

pub use body::*;
pub use collision::*;
pub use physics_system::*;
