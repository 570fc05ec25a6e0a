#![allow(clippy::module_inception)]

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod rdb;
pub mod server;

pub use crate::error::{Error, ErrorKind};
pub type Result<T, E = crate::error::Error> = std::result::Result<T, E>;

pub use crate::core::{Counter, EntryStream, FileReport};
pub use crate::rdb::{Decoder, Entry, Outcome, Type};

pub(crate) mod common {
    pub(crate) type Result<T, E = crate::error::Error> = std::result::Result<T, E>;

    pub(crate) use crate::error::{Error, ErrorKind};

    pub(crate) type Time = chrono::DateTime<chrono::Utc>;

    pub use tracing::{debug, error, info, trace, warn};
}
