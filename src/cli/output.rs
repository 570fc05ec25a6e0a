use std::path::Path;

use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::Result;

/// Line oriented sink, stdout or a file opened for append.
pub(crate) struct Output {
    writer: BufWriter<Box<dyn AsyncWrite + Unpin + Send>>,
}

impl Output {
    pub(crate) async fn open(path: Option<&Path>) -> Result<Self> {
        let inner: Box<dyn AsyncWrite + Unpin + Send> = match path {
            Some(path) => Box::new(
                OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(path)
                    .await?,
            ),
            None => Box::new(tokio::io::stdout()),
        };

        Ok(Self {
            writer: BufWriter::new(inner),
        })
    }

    pub(crate) async fn write_line(&mut self, line: &[u8]) -> Result<()> {
        self.writer.write_all(line).await?;
        self.writer.write_all(b"\n").await?;
        Ok(())
    }

    pub(crate) async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}
