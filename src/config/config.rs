use serde::Deserialize;

use crate::core;
use crate::server::http;

/// Content of the yaml configuration file. Every section is optional.
#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub(crate) server: http::Config,
    #[serde(default)]
    pub(crate) analyzer: core::Config,
}
