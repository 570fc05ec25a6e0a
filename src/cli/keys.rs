use std::path::PathBuf;

use clap::Args;

use crate::cli::{files_result, log_failure, output::Output};
use crate::common::debug;
use crate::config::Initializer;
use crate::core::decode_file;
use crate::Result;

/// Print every key as it is decoded
#[derive(Args, Debug)]
pub struct KeysCommand {
    /// Dump files
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Append output to this file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

impl KeysCommand {
    pub async fn run(self, initializer: Initializer) -> Result<()> {
        let KeysCommand { files, output } = self;
        let config = initializer.analyzer();
        let mut out = Output::open(output.as_deref()).await?;

        let mut failed = 0;
        for path in &files {
            let mut stream = decode_file(path, config);
            let mut printed: u64 = 0;
            let mut write_result = Ok(());
            while let Some(entry) = stream.next().await {
                write_result = out.write_line(&entry.key).await;
                if write_result.is_err() {
                    break;
                }
                printed += 1;
            }
            // A broken output stops every file.
            write_result?;

            match stream.finish().await {
                Ok(outcome) => debug!(path = %path.display(), printed, keys = outcome.keys, "keys printed"),
                Err(err) => {
                    log_failure(path, &err);
                    failed += 1;
                }
            }
        }
        out.flush().await?;

        files_result(failed, files.len())
    }
}
