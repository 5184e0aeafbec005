use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a bundle. None of them leave partial output behind.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("cannot resolve module '{reference}' required from {}", .requester.display())]
    Resolution {
        reference: String,
        requester: PathBuf,
    },

    #[error(
        "non-static require in {}:{line}:{column}: `{call}` (the argument must be a string literal)",
        .requester.display()
    )]
    DynamicReference {
        requester: PathBuf,
        call: String,
        line: u32,
        column: u32,
    },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BundleError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BundleError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_resolution(&self) -> bool {
        matches!(self, BundleError::Resolution { .. })
    }

    pub fn is_dynamic_reference(&self) -> bool {
        matches!(self, BundleError::DynamicReference { .. })
    }
}

pub type Result<T> = std::result::Result<T, BundleError>;
