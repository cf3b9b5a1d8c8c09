/// Result alias that carries the custom [`PortfolioError`] type.
pub type Result<T> = std::result::Result<T, PortfolioError>;

/// Common error type for the core crate.
///
/// Nothing on the playback path surfaces one of these to callers; they are
/// confined to configuration, catalog loading and durable storage.
#[derive(Debug, thiserror::Error)]
pub enum PortfolioError {
    /// Free-form failure, mostly produced by audio backends.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A config, catalog or store file could not be (de)serialised.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown sound `{0}`")]
    UnknownSound(String),
    #[error("no project with id {0} in the catalog")]
    UnknownProject(u32),
}

impl PortfolioError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for PortfolioError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for PortfolioError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
