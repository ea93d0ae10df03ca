use engine_core::ComponentError;
use scene::SceneError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("behavior tree '{0}' is not registered")]
    UnknownTree(String),

    #[error("no condition or action named '{0}'")]
    UnknownLeaf(String),

    /// A leaf could not run against its object.
    #[error("{0}")]
    Leaf(String),

    #[error("invalid behavior tree file: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Component(#[from] ComponentError),
}
