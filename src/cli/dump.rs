use std::path::PathBuf;

use clap::Args;

use crate::cli::{files_result, log_failure, output::Output};
use crate::config::Initializer;
use crate::core::{count_file, Config};
use crate::Result;

/// Print statistics of each file as one json line
#[derive(Args, Debug)]
pub struct DumpCommand {
    /// Dump files
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Largest keys listed per file
    #[arg(long)]
    top_keys: Option<usize>,
    /// Largest key prefixes listed per file, 0 disables prefix counting
    #[arg(long)]
    top_prefixes: Option<usize>,
    /// Append output to this file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

impl DumpCommand {
    pub async fn run(self, mut initializer: Initializer) -> Result<()> {
        let DumpCommand {
            files,
            top_keys,
            top_prefixes,
            output,
        } = self;

        let mut flags = Config::default();
        flags.set_top_keys(top_keys);
        flags.set_top_prefixes(top_prefixes);
        initializer.override_analyzer(&mut flags);
        let config = initializer.analyzer();

        let mut out = Output::open(output.as_deref()).await?;
        let mut failed = 0;
        for path in &files {
            match count_file(path, config).await {
                Ok(report) => out.write_line(&serde_json::to_vec(&report)?).await?,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdb::testutil::RdbWriter;

    #[tokio::test]
    async fn one_line_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RdbWriter::new(11);
        writer.aux("redis-ver", "7.2.4");
        let first = writer.string(b"user:1", b"alice");
        let second = writer.string(b"user:2", b"bob");
        let dump = dir.path().join("dump.rdb");
        let data = writer.finish();
        std::fs::write(&dump, &data).unwrap();
        let out = dir.path().join("report.jsonl");

        DumpCommand {
            files: vec![dump.clone(), dump],
            top_keys: Some(1),
            top_prefixes: None,
            output: Some(out.clone()),
        }
        .run(Initializer::default())
        .await
        .unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let report: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(report["keys"], 2);
        assert_eq!(report["bytes"], data.len() as u64);
        assert_eq!(report["total"]["bytes"], first + second);
        assert_eq!(report["aux"]["redis-ver"], "7.2.4");
        assert_eq!(report["largest_keys"].as_array().unwrap().len(), 1);
        assert_eq!(report["largest_keys"][0]["key"], "user:1");
        assert_eq!(report["checksum"]["status"], "valid");
    }
}
