//! Scene graph: the live set of objects and their components.
//!
//! - [`SceneObject`] owns an ordered component sequence (first match wins on lookup)
//! - [`SceneGraph`] owns every object, indexes by id and name, iterates in insertion order
//! - [`SceneDocument`] is the RON persistence format

pub mod document;
pub mod error;
pub mod graph;
pub mod object;

pub use document::*;
pub use error::*;
pub use graph::*;
pub use object::*;
