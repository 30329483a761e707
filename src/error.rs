// error.rs — renderer error taxonomy

use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RendererError {
    #[error("out of memory while allocating {what}")]
    OutOfMemory {
        what: &'static str,
        #[source]
        source: TryReserveError,
    },

    #[error("failed to create GPU resource: {0}")]
    GpuResource(String),

    #[error("unable to resolve {kind} location `{name}`")]
    MissingLocation { kind: &'static str, name: String },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("texture upload failed: {0}")]
    Upload(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl RendererError {
    pub(crate) fn oom(what: &'static str) -> impl FnOnce(TryReserveError) -> Self {
        move |source| RendererError::OutOfMemory { what, source }
    }
}

pub type Result<T, E = RendererError> = std::result::Result<T, E>;
