use thiserror::Error;

/// Library error type for transition setup and rendering.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// The incoming image is missing or has a zero dimension.
    #[error("new image is invalid (zero-sized)")]
    InvalidImage,

    /// `start()` was called while a run is still in flight.
    #[error("transition is already running")]
    AlreadyRunning,

    /// The shared GPU compositor is missing or not initialised.
    #[error("compositor unavailable: {0}")]
    BackendUnavailable(String),

    /// A backend failed while attaching or presenting a frame.
    #[error("backend error: {0}")]
    Backend(String),

    /// No effect is registered under the requested name.
    #[error("unknown transition effect: {0}")]
    UnknownEffect(String),

    /// Configuration could not be resolved into an effect.
    #[error("configuration error: {0}")]
    Config(String),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = TransitionError> = std::result::Result<T, E>;
