/// Convenience result type used across the crate.
pub type RaceResult<T> = Result<T, RaceError>;

/// Error taxonomy for loading, rendering and encoding a bar-chart race.
#[derive(thiserror::Error, Debug)]
pub enum RaceError {
    /// The input table could not be parsed at all.
    #[error("input error: {0}")]
    Input(String),

    /// Invalid configuration or option values.
    #[error("validation error: {0}")]
    Validation(String),

    /// An entity being rendered has no registered color or icon.
    #[error("registry error: {0}")]
    Registry(String),

    /// Errors while building or rasterizing a frame.
    #[error("render error: {0}")]
    Render(String),

    /// Errors reported by (or while talking to) the video encoder.
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RaceError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}
