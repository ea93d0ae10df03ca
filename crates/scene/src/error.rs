use engine_core::{ComponentError, ObjectId};
use thiserror::Error;

/// Failures of scene graph operations and scene (de)serialization.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The id does not name a live object in this scene.
    #[error("no live object {0}")]
    UnknownObject(ObjectId),

    /// A transform of the wrong dimension was assigned to an object.
    #[error("object {0} cannot switch between 2D and 3D")]
    DimensionMismatch(ObjectId),

    #[error("object id {0} is already in use")]
    DuplicateId(ObjectId),

    /// The document is structurally invalid.
    #[error("corrupt scene: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error("scene parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("scene serialize error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("scene io error: {0}")]
    Io(#[from] std::io::Error),
}
