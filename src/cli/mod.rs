//! Command line interface.

mod root;
pub use root::{parse, Command, GlobalOptions, RdrCommand};

mod dump;
mod keys;
mod output;
mod show;
mod topkey;

pub use dump::DumpCommand;
pub use keys::KeysCommand;
pub use show::ShowCommand;
pub use topkey::TopkeyCommand;

use std::path::{Path, PathBuf};

use crate::common::{error, ErrorKind, Result};
use crate::Error;

fn log_failure(path: &Path, err: &Error) {
    error!(
        path = %path.display(),
        offset = ?err.offset(),
        kind = err.kind().name(),
        "{}",
        err
    );
}

// Error once any file failed.
fn files_result(failed: usize, total: usize) -> Result<()> {
    if failed > 0 {
        Err(ErrorKind::FilesFailed { failed, total }.into())
    } else {
        Ok(())
    }
}

// Directories expand to their regular files, sorted by name.
// Anything else is kept and fails later as a file.
async fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        let is_dir = matches!(tokio::fs::metadata(path).await, Ok(m) if m.is_dir());
        if is_dir {
            let mut dir = Vec::new();
            let mut entries = tokio::fs::read_dir(path).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_file() {
                    dir.push(entry.path());
                }
            }
            dir.sort();
            files.extend(dir);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}
