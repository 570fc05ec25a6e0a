use rdr::{cli, config::env, ErrorKind};

fn main() {
    // Install global collector configured based on RDR_LOG env var.
    // Logs go to stderr, stdout carries command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env(env::LOG_DIRECTIVE)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_thread_ids(true)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .on_thread_start(|| tracing::trace!("thread start"))
        .on_thread_stop(|| tracing::trace!("thread stop"))
        .enable_io()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to build runtime: {}", err);
            std::process::exit(1);
        }
    };

    runtime.block_on(async {
        run().await;
    })
}

async fn run() {
    if let Err(err) = cli::parse().run().await {
        eprintln!("{}", err);
        let code = match err.kind() {
            ErrorKind::FilesFailed { .. } => 2,
            _ => 1,
        };
        std::process::exit(code);
    };
}
