use std::fmt;
use std::io;

#[derive(Debug)]
pub enum ErrorKind {
    Io(io::Error),
    // The file does not start with the REDIS magic.
    BadMagic {
        found: Vec<u8>,
    },
    // Version digits are malformed or outside of the supported range.
    UnsupportedVersion {
        version: String,
    },
    // A read or a declared length goes past the end of the file.
    TruncatedInput {
        offset: u64,
        needed: u64,
        remaining: u64,
    },
    MalformedLength {
        offset: u64,
        description: String,
    },
    UnsupportedEncoding {
        offset: u64,
        what: &'static str,
        tag: u8,
    },
    DecompressionFailed {
        offset: u64,
        description: String,
    },
    // The consumer went away before the producer reached the end of the file.
    Cancelled {
        keys: u64,
        offset: u64,
    },
    FilesFailed {
        failed: usize,
        total: usize,
    },
    InvalidRequest(String),
    Config(String),
    Timeout,
    Internal(String),
}

impl ErrorKind {
    /// Short identifier of the kind, used as a log field.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Io(_) => "io",
            ErrorKind::BadMagic { .. } => "bad_magic",
            ErrorKind::UnsupportedVersion { .. } => "unsupported_version",
            ErrorKind::TruncatedInput { .. } => "truncated_input",
            ErrorKind::MalformedLength { .. } => "malformed_length",
            ErrorKind::UnsupportedEncoding { .. } => "unsupported_encoding",
            ErrorKind::DecompressionFailed { .. } => "decompression_failed",
            ErrorKind::Cancelled { .. } => "cancelled",
            ErrorKind::FilesFailed { .. } => "files_failed",
            ErrorKind::InvalidRequest(_) => "invalid_request",
            ErrorKind::Config(_) => "config",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal(_) => "internal",
        }
    }

    pub(crate) fn offset(&self) -> Option<u64> {
        match self {
            ErrorKind::TruncatedInput { offset, .. }
            | ErrorKind::MalformedLength { offset, .. }
            | ErrorKind::UnsupportedEncoding { offset, .. }
            | ErrorKind::DecompressionFailed { offset, .. }
            | ErrorKind::Cancelled { offset, .. } => Some(*offset),
            ErrorKind::BadMagic { .. } | ErrorKind::UnsupportedVersion { .. } => Some(0),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::Io(err) => err.fmt(f),
            ErrorKind::BadMagic { found } => {
                write!(f, "bad magic {:?}", String::from_utf8_lossy(found))
            }
            ErrorKind::UnsupportedVersion { version } => {
                write!(f, "unsupported rdb version {:?}", version)
            }
            ErrorKind::TruncatedInput {
                offset,
                needed,
                remaining,
            } => write!(
                f,
                "truncated input at offset {}: need {} bytes, {} remaining",
                offset, needed, remaining
            ),
            ErrorKind::MalformedLength {
                offset,
                description,
            } => write!(f, "malformed length at offset {}: {}", offset, description),
            ErrorKind::UnsupportedEncoding { offset, what, tag } => {
                write!(f, "unsupported {} 0x{:02x} at offset {}", what, tag, offset)
            }
            ErrorKind::DecompressionFailed {
                offset,
                description,
            } => write!(
                f,
                "decompression failed at offset {}: {}",
                offset, description
            ),
            ErrorKind::Cancelled { keys, offset } => write!(
                f,
                "decode cancelled at offset {} after {} keys",
                offset, keys
            ),
            ErrorKind::FilesFailed { failed, total } => {
                write!(f, "{} of {} files failed", failed, total)
            }
            ErrorKind::InvalidRequest(description) => {
                write!(f, "invalid request. {}", description)
            }
            ErrorKind::Config(description) => write!(f, "config error. {}", description),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Internal(description) => write!(f, "internal error. {}", description),
        }
    }
}
