use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::time::Duration;
use tracing_futures::Instrument;

use crate::common::{debug, error, info, warn, ErrorKind, Result};
use crate::core::{FileIndex, FileReport};
use crate::server::connection::{Connection, Request, Response, Status};
use crate::server::page;

// Server configuration.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    // Max tcp connections.
    max_tcp_connections: Option<u32>,
    // Size of buffer allocated per tcp connection.
    connection_tcp_buffer_bytes: Option<usize>,
    // Timeout duration for reading the request head.
    read_timeout_milliseconds: Option<u64>,
    // tcp listen host.
    listen_host: Option<String>,
    // tcp listen port.
    listen_port: Option<String>,
}

impl Config {
    const DEFAULT_MAX_TCP_CONNECTIONS: u32 = 128;
    const DEFAULT_CONNECTION_TCP_BUFFER_BYTES: usize = 1024 * 4;
    const DEFAULT_READ_TIMEOUT_MILLISECONDS: u64 = 3000;
    const DEFAULT_LISTEN_HOST: &'static str = "127.0.0.1";
    const DEFAULT_LISTEN_PORT: &'static str = crate::server::DEFAULT_PORT;

    pub fn set_max_tcp_connections(&mut self, val: Option<u32>) {
        if let Some(val) = val {
            self.max_tcp_connections = Some(std::cmp::max(val, 1));
        }
    }
    pub fn set_connection_tcp_buffer_bytes(&mut self, val: Option<usize>) {
        if let Some(val) = val {
            self.connection_tcp_buffer_bytes = Some(std::cmp::max(val, 1));
        }
    }
    pub fn set_read_timeout_milliseconds(&mut self, val: Option<u64>) {
        if let Some(val) = val {
            self.read_timeout_milliseconds = Some(std::cmp::max(val, 10));
        }
    }
    pub fn set_listen_host(&mut self, val: &mut Option<String>) {
        if let Some(val) = val.take() {
            self.listen_host = Some(val)
        }
    }
    pub fn set_listen_port(&mut self, val: &mut Option<String>) {
        if let Some(val) = val.take() {
            self.listen_port = Some(val)
        }
    }
    pub(crate) fn override_merge(&mut self, other: &mut Config) {
        self.set_max_tcp_connections(other.max_tcp_connections);
        self.set_connection_tcp_buffer_bytes(other.connection_tcp_buffer_bytes);
        self.set_read_timeout_milliseconds(other.read_timeout_milliseconds);
        self.set_listen_host(&mut other.listen_host);
        self.set_listen_port(&mut other.listen_port);
    }

    fn max_tcp_connections(&self) -> u32 {
        match self.max_tcp_connections {
            Some(val) => val,
            None => Config::DEFAULT_MAX_TCP_CONNECTIONS,
        }
    }

    fn connection_tcp_buffer_bytes(&self) -> usize {
        match self.connection_tcp_buffer_bytes {
            Some(val) => val,
            None => Config::DEFAULT_CONNECTION_TCP_BUFFER_BYTES,
        }
    }

    fn read_timeout(&self) -> Duration {
        Duration::from_millis(
            self.read_timeout_milliseconds
                .unwrap_or(Config::DEFAULT_READ_TIMEOUT_MILLISECONDS),
        )
    }

    pub(crate) fn listen_addr(&self) -> String {
        format!(
            "{}:{}",
            self.listen_host
                .as_deref()
                .unwrap_or(Config::DEFAULT_LISTEN_HOST),
            self.listen_port
                .as_deref()
                .unwrap_or(Config::DEFAULT_LISTEN_PORT),
        )
    }
}

type ShutdownSignal = ();
type ShutdownCompleteSignal = ();

// Handle graceful shutdown.
struct GracefulShutdown {
    notify_shutdown: broadcast::Sender<ShutdownSignal>,
    shutdown_complete_tx: mpsc::Sender<ShutdownCompleteSignal>,
    shutdown_complete_rx: mpsc::Receiver<ShutdownCompleteSignal>,
}

impl GracefulShutdown {
    fn new() -> Self {
        let (notify_shutdown, _) = broadcast::channel(1);
        let (shutdown_complete_tx, shutdown_complete_rx) = mpsc::channel(1);

        Self {
            notify_shutdown,
            shutdown_complete_tx,
            shutdown_complete_rx,
        }
    }

    // Notify handlers of the shutdown and wait for them to finish.
    async fn shutdown(mut self) {
        drop(self.notify_shutdown);

        // Drop final Sender so the Receiver below can complete.
        drop(self.shutdown_complete_tx);

        let _ = self.shutdown_complete_rx.recv().await;
    }
}

/// Dashboard http server over a fixed set of reports.
pub(crate) struct Server {
    config: Config,
    reports: Arc<Vec<FileReport>>,
    graceful_shutdown: GracefulShutdown,
}

impl Server {
    pub(crate) fn new(config: Config, reports: Vec<FileReport>) -> Self {
        Self {
            config,
            reports: Arc::new(reports),
            graceful_shutdown: GracefulShutdown::new(),
        }
    }

    pub(crate) async fn run(mut self, listener: TcpListener, shutdown: impl Future) -> Result<()> {
        tokio::select! {
            result = self.serve(listener) => {
                if let Err(err) = result {
                    error!(cause = %err, "Failed to accept");
                }
            }
            _ = shutdown => {
                info!("Shutdown signal received");
            }
        }

        info!("Notify shutdown to all handlers");

        self.graceful_shutdown.shutdown().await;

        info!("Shutdown successfully completed");

        Ok(())
    }

    async fn serve(&mut self, listener: TcpListener) -> Result<()> {
        info!(
            addr = ?listener.local_addr().ok(),
            files = self.reports.len(),
            "Server running. {:?}",
            self.config
        );

        let mut listener = SemaphoreListener::new(listener, self.config.max_tcp_connections());
        let connection_tcp_buffer_bytes = self.config.connection_tcp_buffer_bytes();

        loop {
            let (socket, handler) = self.accept(&mut listener).await?;
            let span = tracing::info_span!("connection", addr = ?handler.remote_addr);
            let connection = Connection::new(socket, Some(connection_tcp_buffer_bytes));

            tokio::spawn(handler.run(connection).instrument(span));
        }
    }

    async fn accept(&mut self, listener: &mut SemaphoreListener) -> Result<(TcpStream, Handler)> {
        let (socket, peer_addr) = listener.accept().await?;
        debug!(
            available = listener.max_connections.available_permits(),
            "Connection accepted"
        );

        let handler = Handler {
            reports: Arc::clone(&self.reports),
            remote_addr: Some(peer_addr),
            shutdown: ShutdownSubscriber::new(
                self.graceful_shutdown.notify_shutdown.subscribe(),
                self.graceful_shutdown.shutdown_complete_tx.clone(),
            ),
            max_connections: Arc::clone(&listener.max_connections),
            read_timeout: self.config.read_timeout(),
        };

        Ok((socket, handler))
    }
}

struct Handler {
    reports: Arc<Vec<FileReport>>,
    remote_addr: Option<std::net::SocketAddr>,
    shutdown: ShutdownSubscriber,
    max_connections: Arc<Semaphore>,
    read_timeout: Duration,
}

impl Handler {
    async fn run<T>(mut self, conn: Connection<T>)
    where
        T: AsyncWrite + AsyncRead + Unpin,
    {
        if let Err(err) = self.handle(conn).await {
            warn!(kind = err.kind().name(), "{}", err);
        }
    }

    async fn handle<T>(&mut self, mut conn: Connection<T>) -> Result<()>
    where
        T: AsyncWrite + AsyncRead + Unpin,
    {
        if self.shutdown.is_shutdown() {
            return Ok(());
        }

        let request = tokio::select! {
            request = conn.read_request_with_timeout(self.read_timeout) => request,
            _ = self.shutdown.recv() => return Ok(()),
        };

        let response = match request {
            Ok(Some(request)) => {
                let response = route(&self.reports, &request);
                info!(
                    method = %request.method,
                    path = %request.path,
                    status = response.status.code(),
                    "request"
                );
                response
            }
            // peer closed the socket.
            Ok(None) => return Ok(()),
            Err(err) if matches!(err.kind(), ErrorKind::InvalidRequest(_)) => {
                debug!(%err, "bad request");
                Response::error(Status::BadRequest)
            }
            Err(err) => return Err(err),
        };

        conn.write_response(&response).await
    }
}

impl Drop for Handler {
    fn drop(&mut self) {
        self.max_connections.add_permits(1);
    }
}

fn route(reports: &[FileReport], request: &Request) -> Response {
    if request.method != "GET" {
        return Response::error(Status::MethodNotAllowed);
    }

    let segments: Vec<&str> = request
        .path
        .trim_end_matches('/')
        .split('/')
        .skip(1)
        .collect();

    match segments.as_slice() {
        [] => Response::html(page::index(reports)),
        ["files", id] => match lookup(reports, id) {
            Some(report) => Response::html(page::file(report)),
            None => Response::error(Status::NotFound),
        },
        ["api", "files"] => {
            let index: Vec<FileIndex> = reports
                .iter()
                .enumerate()
                .map(|(id, report)| FileIndex::new(id, report))
                .collect();
            Response::json(&index)
        }
        ["api", "files", id] => match lookup(reports, id) {
            Some(report) => Response::json(report),
            None => Response::error(Status::NotFound),
        },
        _ => Response::error(Status::NotFound),
    }
}

fn lookup<'a>(reports: &'a [FileReport], id: &str) -> Option<&'a FileReport> {
    id.parse::<usize>().ok().and_then(|id| reports.get(id))
}

struct SemaphoreListener {
    inner: TcpListener,
    max_connections: Arc<Semaphore>,
}

impl SemaphoreListener {
    fn new(listener: TcpListener, max_connections: u32) -> Self {
        Self {
            inner: listener,
            max_connections: Arc::new(Semaphore::new(max_connections as usize)),
        }
    }

    // The permit is given back when the handler is dropped.
    async fn accept(&mut self) -> Result<(TcpStream, std::net::SocketAddr)> {
        self.max_connections
            .acquire()
            .await
            .map_err(|err| ErrorKind::Internal(format!("semaphore: {}", err)))?
            .forget();
        Ok(self.inner.accept().await?)
    }
}

struct ShutdownSubscriber {
    shutdown: bool,
    notify: broadcast::Receiver<ShutdownSignal>,
    // Notify completing shutdown process by dropping.
    _complete_tx: mpsc::Sender<ShutdownCompleteSignal>,
}

impl ShutdownSubscriber {
    fn new(
        notify: broadcast::Receiver<ShutdownSignal>,
        complete_tx: mpsc::Sender<ShutdownCompleteSignal>,
    ) -> Self {
        Self {
            shutdown: false,
            notify,
            _complete_tx: complete_tx,
        }
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    async fn recv(&mut self) {
        if self.shutdown {
            return;
        }

        match self.notify.recv().await {
            Ok(_) | Err(broadcast::error::RecvError::Closed) => (), // ok
            Err(err) => error!("shutdown notify receive error {}", err),
        }

        self.shutdown = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Counter;
    use crate::rdb::{Checksum, Outcome};

    fn report(name: &str) -> FileReport {
        let outcome = Outcome {
            version: 9,
            keys: 0,
            bytes: 18,
            aux: Default::default(),
            checksum: Checksum::Absent,
        };
        FileReport::new(format!("/tmp/{}", name), outcome, &Counter::new(10))
    }

    fn get(path: &str) -> Request {
        Request {
            method: "GET".into(),
            path: path.into(),
        }
    }

    #[test]
    fn routes() {
        let reports = vec![report("a.rdb"), report("<b>.rdb")];

        let response = route(&reports, &get("/"));
        assert_eq!(response.status, Status::Ok);
        let body = String::from_utf8(response.body).unwrap();
        assert!(body.contains("/files/1"));
        assert!(body.contains("&lt;b&gt;.rdb"));

        let response = route(&reports, &get("/api/files"));
        assert_eq!(response.content_type, "application/json");
        let index: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(index[1]["name"], "<b>.rdb");

        let response = route(&reports, &get("/api/files/0"));
        let report: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(report["name"], "a.rdb");

        assert_eq!(route(&reports, &get("/files/1/")).status, Status::Ok);
        assert_eq!(route(&reports, &get("/files/2")).status, Status::NotFound);
        assert_eq!(route(&reports, &get("/files/x")).status, Status::NotFound);
        assert_eq!(route(&reports, &get("/nope")).status, Status::NotFound);

        let post = Request {
            method: "POST".into(),
            path: "/".into(),
        };
        assert_eq!(route(&reports, &post).status, Status::MethodNotAllowed);
    }

    #[test]
    fn config_override() {
        let mut config = Config::default();
        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
        assert_eq!(config.read_timeout(), Duration::from_millis(3000));

        let mut flags = Config::default();
        flags.set_listen_port(&mut Some("0".to_owned()));
        flags.set_max_tcp_connections(Some(0));
        config.override_merge(&mut flags);

        assert_eq!(config.listen_addr(), "127.0.0.1:0");
        assert_eq!(config.max_tcp_connections(), 1);
        assert_eq!(config.connection_tcp_buffer_bytes(), 4096);
    }
}
