mod kind;
pub use kind::ErrorKind;

use std::error;
use std::fmt;
use std::io;

use backtrace::Backtrace;

/// Error returned by every fallible operation of this crate.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    backtrace: Option<Backtrace>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::with_backtrace(kind)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::from(ErrorKind::Io(err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::from(ErrorKind::Config(err.to_string()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::from(ErrorKind::Internal(format!("json: {}", err)))
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Error::from(ErrorKind::Timeout)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::from(ErrorKind::Internal(format!("task: {}", err)))
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(err: tokio::sync::oneshot::error::RecvError) -> Self {
        Error::from(ErrorKind::Internal(format!("producer vanished: {}", err)))
    }
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Byte offset into the dump file where decoding failed, if known.
    pub fn offset(&self) -> Option<u64> {
        self.kind.offset()
    }

    /// Whether this error is a structural problem of the dump file.
    pub fn is_decode(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::BadMagic { .. }
                | ErrorKind::UnsupportedVersion { .. }
                | ErrorKind::TruncatedInput { .. }
                | ErrorKind::MalformedLength { .. }
                | ErrorKind::UnsupportedEncoding { .. }
                | ErrorKind::DecompressionFailed { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled { .. })
    }

    pub fn is_eof(&self) -> bool {
        match self.kind() {
            ErrorKind::Io(err) => err.kind().eq(&io::ErrorKind::UnexpectedEof),
            ErrorKind::TruncatedInput { .. } => true,
            _ => false,
        }
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_ref()
    }

    fn with_backtrace(kind: ErrorKind) -> Self {
        Self {
            kind,
            backtrace: Some(Backtrace::new()),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.kind() {
            ErrorKind::Io(err) => Some(err),
            _ => None,
        }
    }
}
