//! Scene runtime: the engine root and its fixed-order frame.
//!
//! [`EngineState`] owns the active scene and one of every manager. [`update::frame`]
//! advances it by one frame and hands a [`FrameSnapshot`] to the [`FrameHost`].

pub mod camera;
pub mod config;
pub mod error;
pub mod host;
pub mod state;
pub mod update;

pub use camera::*;
pub use config::*;
pub use error::*;
pub use host::*;
pub use state::*;
pub use update::{frame, run, run_session};
