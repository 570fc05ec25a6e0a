use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::core::counter::{Counter, Summary};
use crate::rdb::{Checksum, Outcome};

/// Statistics of one decoded dump file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: String,
    pub name: String,
    pub version: u32,
    pub keys: u64,
    pub bytes: u64,
    pub checksum: Checksum,
    pub aux: BTreeMap<String, String>,
    #[serde(flatten)]
    pub summary: Summary,
}

impl FileReport {
    pub fn new(path: impl AsRef<Path>, outcome: Outcome, counter: &Counter) -> Self {
        let path = path.as_ref();
        Self {
            path: path.display().to_string(),
            name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            version: outcome.version,
            keys: outcome.keys,
            bytes: outcome.bytes,
            checksum: outcome.checksum,
            aux: outcome.aux,
            summary: counter.summary(),
        }
    }
}

/// Line of the dashboard file index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileIndex {
    pub id: usize,
    pub name: String,
    pub path: String,
    pub keys: u64,
    pub bytes: u64,
}

impl FileIndex {
    pub fn new(id: usize, report: &FileReport) -> Self {
        Self {
            id,
            name: report.name.clone(),
            path: report.path.clone(),
            keys: report.keys,
            bytes: report.bytes,
        }
    }
}
