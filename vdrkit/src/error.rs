use thiserror::Error;
use vdrkit_ffi::ErrorCode;

/// Error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Vdr(#[from] vdrkit_ffi::Error),
    #[error("malformed ledger reply: {0}")]
    Reply(String),
    #[error("loading config error: {0}")]
    ConfigLoad(Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("saving config error: {0}")]
    ConfigSave(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// The status code this error is reported under.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Vdr(e) => e.code(),
            Self::ConfigLoad(_) | Self::ConfigSave(_) => ErrorCode::Config,
            Self::Reply(_) => ErrorCode::Wrapper,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Vdr(error.into())
    }
}

/// Type alias to use this crate's [`Error`](enum@crate::Error) type in a [`Result`](core::result::Result).
pub type Result<T> = core::result::Result<T, Error>;
