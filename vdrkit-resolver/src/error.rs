use http::uri::InvalidUri;
use http::StatusCode;
use thiserror::Error;
use vdrkit::ErrorCode;

/// Error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid DID: {0}")]
    InvalidDid(String),
    #[error("unknown namespace: {0}")]
    UnknownNamespace(String),
    #[error("namespace already registered: {0}")]
    NamespaceExists(String),
    #[error("invalid genesis transactions: {0}")]
    InvalidGenesis(String),
    #[error(transparent)]
    Vdr(#[from] vdrkit::Error),
    #[error(transparent)]
    Http(#[from] http::Error),
    #[error("http client error: {0}")]
    HttpClient(Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("http status: {0:?}")]
    HttpStatus(StatusCode),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Uri(#[from] InvalidUri),
}

impl Error {
    /// The status code this error is reported under.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidDid(_) | Self::Uri(_) => ErrorCode::Input,
            Self::UnknownNamespace(_) | Self::NamespaceExists(_) | Self::InvalidGenesis(_) => {
                ErrorCode::Config
            }
            Self::Vdr(e) => e.code(),
            Self::Http(_) | Self::HttpClient(_) | Self::HttpStatus(_) => ErrorCode::Connection,
            Self::Io(_) => ErrorCode::FileSystem,
            Self::SerdeJson(_) => ErrorCode::Wrapper,
        }
    }
}

/// Type alias to use this crate's [`Error`](enum@crate::Error) type in a [`Result`](core::result::Result).
pub type Result<T> = core::result::Result<T, Error>;
