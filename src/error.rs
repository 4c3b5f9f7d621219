use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the transport, codec and registry can produce.
///
/// `Parse` is a refinement of `InvalidResponse`: both mean the device
/// answered with something we could not make sense of, the former only
/// once the frame passed its structural checks.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    #[error("{0}")]
    Device(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    InvalidData(String),

    #[error("{0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    Runtime(String),
}

impl Error {
    pub fn is_invalid_response(&self) -> bool {
        matches!(self, Error::InvalidResponse(_) | Error::Parse(_))
    }

    /// True for failures that point at the device or the line rather than
    /// at the request.
    pub fn is_device_level(&self) -> bool {
        matches!(
            self,
            Error::Device(_) | Error::Timeout(_) | Error::InvalidData(_)
        )
    }

    /// Collapses transport and codec failures into a single runtime error
    /// whose message says which layer failed.
    pub fn into_runtime(self) -> Self {
        match self {
            Error::Device(m) => Error::Runtime(format!("device error: {}", m)),
            Error::Timeout(m) => Error::Runtime(format!("timeout: {}", m)),
            Error::InvalidData(m) => Error::Runtime(format!("data is invalid: {}", m)),
            Error::InvalidResponse(m) | Error::Parse(m) => {
                Error::Runtime(format!("response is invalid: {}", m))
            }
            other => other,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Device(err.to_string())
    }
}

/// Creates an anyhow error with the current file and line number
#[macro_export]
macro_rules! file_error {
    ($($arg:tt)*) => {
        anyhow::anyhow!(
            "[{}:{}] {}",
            std::path::Path::new(file!())
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default(),
            line!(),
            format!($($arg)*)
        )
    };
}

/// Creates an anyhow error with the current file and line number, and includes a source error
#[macro_export]
macro_rules! file_error_with_source {
    ($source:expr, $($arg:tt)*) => {
        anyhow::anyhow!(
            "[{}:{}] {}: {}",
            std::path::Path::new(file!())
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default(),
            line!(),
            format!($($arg)*),
            $source
        )
    };
}
