use std::path::PathBuf;

use clap::Args;

use crate::cli::{files_result, log_failure, output::Output};
use crate::config::Initializer;
use crate::core::{decode_file, Config, Counter};
use crate::rdb::Entry;
use crate::Result;

/// Print the largest keys
#[derive(Args, Debug)]
pub struct TopkeyCommand {
    /// Dump files
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Number of keys per file
    #[arg(long, short = 'n', default_value_t = 50)]
    pub(crate) count: usize,
    /// Keys smaller than this many bytes are not printed
    #[arg(long, default_value_t = 0)]
    pub(crate) min_size: u64,
    /// Separator between the fields of a line
    #[arg(long, short = 'd', default_value = "[:DMR:]")]
    pub(crate) delimiter: String,
    /// Append output to this file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

impl TopkeyCommand {
    pub async fn run(self, initializer: Initializer) -> Result<()> {
        let TopkeyCommand {
            files,
            count,
            min_size,
            delimiter,
            output,
        } = self;

        let mut config = initializer.analyzer().clone();
        let mut flags = Config::default();
        flags.set_top_keys(Some(count));
        flags.set_top_prefixes(Some(0));
        config.override_merge(&mut flags);

        let mut out = Output::open(output.as_deref()).await?;
        let mut failed = 0;
        for path in &files {
            let mut stream = decode_file(path, &config);
            let mut counter = Counter::with_config(&config);
            while let Some(entry) = stream.next().await {
                counter.count(entry);
            }
            if let Err(err) = stream.finish().await {
                log_failure(path, &err);
                failed += 1;
                continue;
            }

            for entry in counter
                .largest(count)
                .into_iter()
                .filter(|entry| entry.bytes >= min_size)
            {
                out.write_line(&format_line(entry, &delimiter)).await?;
            }
        }
        out.flush().await?;

        files_result(failed, files.len())
    }
}

fn format_line(entry: &Entry, delimiter: &str) -> Vec<u8> {
    let mut line = entry.key.clone();
    line.extend_from_slice(delimiter.as_bytes());
    line.extend_from_slice(entry.bytes.to_string().as_bytes());
    line.extend_from_slice(delimiter.as_bytes());
    line.extend_from_slice(entry.data_type.as_str().as_bytes());
    line
}
