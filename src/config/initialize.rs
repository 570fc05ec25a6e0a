use std::future::Future;
use std::path::Path;

use tokio::fs;
use tokio::net::TcpListener;

use crate::common::{debug, Result};
use crate::config::Config;
use crate::core::{self, FileReport};
use crate::server::http::{self, Server};

/// Resolved configuration: file values with command line overrides applied.
#[derive(Debug, Default)]
pub struct Initializer {
    pub(crate) config: Config,
}

impl Initializer {
    pub async fn load_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let f = fs::File::open(path).await?;
        let config = serde_yaml::from_reader::<_, Config>(f.into_std().await)?;

        Ok(Self { config })
    }

    /// Load the configuration file when one is given, defaults otherwise.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                debug!(path = %path.display(), "load config file");
                Initializer::load_config_file(path).await
            }
            None => Ok(Initializer::default()),
        }
    }

    pub fn analyzer(&self) -> &core::Config {
        &self.config.analyzer
    }

    pub(crate) fn override_analyzer(&mut self, flags: &mut core::Config) {
        self.config.analyzer.override_merge(flags);
    }

    pub(crate) fn override_server(&mut self, flags: &mut http::Config) {
        self.config.server.override_merge(flags);
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.server.listen_addr();
        Ok(TcpListener::bind(&addr).await?)
    }

    /// Serve the dashboard for `reports` until `shutdown` completes.
    pub async fn run_show(
        self,
        reports: Vec<FileReport>,
        listener: TcpListener,
        shutdown: impl Future,
    ) -> Result<()> {
        let server = Server::new(self.config.server, reports);
        server.run(listener, shutdown).await
    }
}
