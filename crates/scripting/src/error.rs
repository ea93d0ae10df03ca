use engine_core::ComponentError;
use scene::SceneError;
use thiserror::Error;

/// A fault raised by or on behalf of a script module.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The module could not be found or compiled.
    #[error("failed to load script '{file}': {message}")]
    Load { file: String, message: String },

    /// A hook returned an error or exceeded its budget.
    #[error("script '{file}' failed in {hook}: {message}")]
    Hook {
        file: String,
        hook: &'static str,
        message: String,
    },

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Component(#[from] ComponentError),
}
