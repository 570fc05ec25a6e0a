use std::future::Future;
use std::path::PathBuf;

use clap::Args;

use crate::cli::{expand_paths, files_result, log_failure};
use crate::common::{info, ErrorKind};
use crate::config::Initializer;
use crate::core::count_file;
use crate::server::Config as ServerConfig;
use crate::Result;

/// Serve statistics of dump files on a web page
#[derive(Args, Debug)]
pub struct ShowCommand {
    /// Dump files or directories containing them
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Listen host(e.g. 0.0.0.0, localhost)
    #[arg(long, env = "RDR_SHOW_HOST")]
    host: Option<String>,
    /// Listen port [default: 8080]
    #[arg(long, short = 'p', env = "RDR_SHOW_PORT")]
    port: Option<String>,
    /// Max concurrent connections
    #[arg(long, env = "RDR_SHOW_MAX_CONNECTIONS")]
    max_connections: Option<u32>,
}

impl ShowCommand {
    pub async fn run(self, mut initializer: Initializer, shutdown: impl Future) -> Result<()> {
        let ShowCommand {
            paths,
            mut host,
            mut port,
            max_connections,
        } = self;

        let mut flags = ServerConfig::default();
        flags.set_listen_host(&mut host);
        flags.set_listen_port(&mut port);
        flags.set_max_tcp_connections(max_connections);
        initializer.override_server(&mut flags);

        let files = expand_paths(&paths).await?;
        let mut reports = Vec::with_capacity(files.len());
        let mut failed = 0;
        for path in &files {
            match count_file(path, initializer.analyzer()).await {
                Ok(report) => reports.push(report),
                Err(err) => {
                    log_failure(path, &err);
                    failed += 1;
                }
            }
        }
        if reports.is_empty() {
            return Err(ErrorKind::FilesFailed {
                failed,
                total: files.len(),
            }
            .into());
        }

        let listener = initializer.bind().await?;
        info!(files = reports.len(), failed, "reports ready");
        initializer.run_show(reports, listener, shutdown).await?;

        files_result(failed, files.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdb::testutil::RdbWriter;

    fn show(paths: Vec<PathBuf>) -> ShowCommand {
        ShowCommand {
            paths,
            host: Some("127.0.0.1".to_owned()),
            port: Some("0".to_owned()),
            max_connections: None,
        }
    }

    #[tokio::test]
    async fn partial_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RdbWriter::new(11);
        writer.string(b"k", b"v");
        std::fs::write(dir.path().join("dump.rdb"), writer.finish()).unwrap();
        std::fs::write(dir.path().join("broken.rdb"), b"NOTRDB").unwrap();

        let err = show(vec![dir.path().to_path_buf()])
            .run(Initializer::default(), async {})
            .await
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::FilesFailed {
                failed: 1,
                total: 2
            }
        ));
    }

    #[tokio::test]
    async fn nothing_to_serve() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.rdb"), b"NOTRDB").unwrap();

        let err = show(vec![dir.path().to_path_buf()])
            .run(Initializer::default(), async {})
            .await
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::FilesFailed {
                failed: 1,
                total: 1
            }
        ));
    }
}
