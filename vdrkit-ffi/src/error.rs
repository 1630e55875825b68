use serde::Deserialize;
use std::ffi::NulError;
use std::fmt;
use thiserror::Error;

/// Status codes reported by the native engine.
///
/// The set is closed: unknown values are folded into [`ErrorCode::Unexpected`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum ErrorCode {
    Success = 0,
    Config = 1,
    Connection = 2,
    FileSystem = 3,
    Input = 4,
    Resource = 5,
    Unavailable = 6,
    Unexpected = 7,
    Incompatible = 8,
    PoolNoConsensus = 30,
    PoolRequestFailed = 31,
    PoolTimeout = 32,
    /// Raised by this library rather than the native engine.
    Wrapper = 99,
}

impl ErrorCode {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl From<i64> for ErrorCode {
    fn from(code: i64) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::Config,
            2 => Self::Connection,
            3 => Self::FileSystem,
            4 => Self::Input,
            5 => Self::Resource,
            6 => Self::Unavailable,
            7 => Self::Unexpected,
            8 => Self::Incompatible,
            30 => Self::PoolNoConsensus,
            31 => Self::PoolRequestFailed,
            32 => Self::PoolTimeout,
            99 => Self::Wrapper,
            _ => Self::Unexpected,
        }
    }
}

impl From<ErrorCode> for i64 {
    fn from(code: ErrorCode) -> Self {
        code as i64
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Config => "config",
            Self::Connection => "connection",
            Self::FileSystem => "filesystem",
            Self::Input => "input",
            Self::Resource => "resource",
            Self::Unavailable => "unavailable",
            Self::Unexpected => "unexpected",
            Self::Incompatible => "incompatible",
            Self::PoolNoConsensus => "pool no consensus",
            Self::PoolRequestFailed => "pool request failed",
            Self::PoolTimeout => "pool timeout",
            Self::Wrapper => "wrapper",
        };
        write!(f, "{s}")
    }
}

/// Error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// A failure recorded by the native engine.
    #[error("{code} error: {message}")]
    Native { code: ErrorCode, message: String, extra: Option<String> },
    #[error("no request handle")]
    NoRequestHandle,
    #[error("pool is closed")]
    PoolClosed,
    #[error("invalid pool parameters: {0}")]
    PoolParams(String),
    #[error("error loading library: {0}")]
    Library(String),
    #[error(transparent)]
    Nul(#[from] NulError),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
    #[error("{0}")]
    Unexpected(String),
    #[error("pending call was dropped before completion")]
    Canceled,
}

impl Error {
    /// The status code this error is reported under.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Native { code, .. } => *code,
            Self::PoolParams(_) => ErrorCode::Config,
            Self::Nul(_) | Self::SerdeJson(_) | Self::Utf8(_) => ErrorCode::Input,
            Self::NoRequestHandle
            | Self::PoolClosed
            | Self::Library(_)
            | Self::Unexpected(_)
            | Self::Canceled => ErrorCode::Wrapper,
        }
    }
    /// Extra detail attached by the native engine, if any.
    pub fn extra(&self) -> Option<&str> {
        match self {
            Self::Native { extra, .. } => extra.as_deref(),
            _ => None,
        }
    }
    pub(crate) fn unknown() -> Self {
        Self::Unexpected(String::from("Unknown error"))
    }
    /// Re-hydrates an error from the JSON record returned by the error retrieval call.
    ///
    /// Returns `None` when the record is malformed or reports success.
    pub fn from_native_json(json: &str) -> Option<Self> {
        #[derive(Deserialize)]
        struct Record {
            code: i64,
            message: String,
            extra: Option<String>,
        }

        let record = serde_json::from_str::<Record>(json).ok()?;
        let code = ErrorCode::from(record.code);
        if code.is_success() {
            return None;
        }
        Some(Self::Native { code, message: record.message, extra: record.extra })
    }
}

/// Type alias to use this crate's [`Error`](enum@crate::Error) type in a [`Result`](core::result::Result).
pub type Result<T> = core::result::Result<T, Error>;
