use std::path::PathBuf;
use std::time::Duration;

/// Malformed request parameter. Always raised before any conversion starts.
#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("unable to parse {param} parameter: {value:?}")]
    NotNumeric { param: &'static str, value: String },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DimensionError {
    /// Deriving one axis from the other requires dividing by a zero original axis.
    #[error("original dimensions cannot be zero")]
    DegenerateSource,
}

/// Failures of the external converter subprocess.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("failed to launch converter {bin:?}: {source}")]
    LaunchFailed {
        bin: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("converter did not finish within {}ms", deadline.as_millis())]
    Timeout { deadline: Duration },

    #[error("converter exited with status {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("converter produced no output at {path:?}")]
    OutputMissing { path: PathBuf },

    #[error("converter I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConversionError {
    /// A timed-out converter may succeed on a retry; the other kinds will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("store rejected asset {name:?}: {reason}")]
    Rejected { name: String, reason: String },

    #[error("failed to write asset {name:?}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level pipeline error. Every failure unwinds through the orchestrator,
/// which releases all temp handles before this propagates to the caller.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("file is not a supported image type (supported: JPG or PNG)")]
    UnsupportedImageType(#[source] image::ImageError),

    #[error(transparent)]
    Dimension(#[from] DimensionError),

    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("unable to persist variant: {0}")]
    Persist(#[from] PersistError),

    #[error("temp file error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True for failures caused by the request itself rather than the host.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::Parameter(_) | Self::UnsupportedImageType(_) | Self::Dimension(_)
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conversion(e) if e.is_retryable())
    }
}
