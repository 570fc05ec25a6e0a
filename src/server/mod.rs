//! Dashboard http server.

pub(crate) mod http;
pub use self::http::Config;

mod connection;
mod page;

pub const DEFAULT_PORT: &str = "8080";
