mod initialize;
pub use initialize::Initializer;

mod config;
pub use config::Config;

pub mod env {
    // Log directive, e.g. "rdr=debug".
    pub const LOG_DIRECTIVE: &str = "RDR_LOG";
    pub const CONFIG_PATH: &str = "RDR_CONFIG";
}
