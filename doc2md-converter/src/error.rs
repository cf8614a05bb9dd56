use std::process::ExitStatus;

use thiserror::Error;

/// Errors raised while turning a document into Markdown.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to start converter '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("converter '{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("converter output is not valid UTF-8")]
    InvalidUtf8,

    #[error("conversion task panicked: {0}")]
    Join(String),
}
