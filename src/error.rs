use std::path::PathBuf;
use thiserror::Error;

/// Hard failures surfaced to callers of the lookup pipeline.
///
/// Soft conditions (class absent, archive absent, a transitive descriptor
/// missing) are not errors: they come back as `None` or empty results.
#[derive(Debug, Error)]
pub enum FinderError {
    #[error("missing required argument: {name}")]
    MissingArgument { name: String },

    #[error("failed to parse descriptor {}: {message}", path.display())]
    ParseFailure { path: PathBuf, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl FinderError {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ParseFailure {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type FinderResult<T> = std::result::Result<T, FinderError>;
