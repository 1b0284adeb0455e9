//! Streams an export artifact to a private temporary file.
//!
//! The artifact is written chunk by chunk, never buffered whole in memory.
//! Once complete, gzip or zstd framing is detected from the leading bytes and
//! undone in place. The file lives in a [`TempPath`], so it is deleted on any
//! error, on cancellation, or when the caller drops the [`DownloadedExport`].

use crate::console_api::ConsoleClient;
use crate::error::{PipelineError, Result};
use crate::utils::reader::{decompress_in_place, Framing};
use futures_util::StreamExt;
use std::io;
use std::path::Path;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A downloaded, decompressed export on local disk.
#[derive(Debug)]
pub struct DownloadedExport {
    path: TempPath,
    framing: Framing,
    bytes: u64,
}

impl DownloadedExport {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Framing the artifact arrived in.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Size of the artifact as transferred.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Delete the file now, reporting any failure.
    pub fn close(self) -> io::Result<()> {
        self.path.close()
    }
}

/// Download `location` into a new temporary file under `temp_dir`.
pub async fn download_export(
    client: &ConsoleClient,
    location: &str,
    temp_dir: &Path,
    cancel: &CancellationToken,
) -> Result<DownloadedExport> {
    let path = tempfile::Builder::new()
        .prefix("audit-export-")
        .suffix(".json")
        .tempfile_in(temp_dir)?
        .into_temp_path();
    debug!(path = %path.display(), "downloading export");

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
        response = client.download(location) => response?,
    };

    let mut file = tokio::fs::File::create(&path).await?;
    let mut stream = response.bytes_stream();
    let mut bytes = 0u64;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            next = stream.next() => next,
        };
        let Some(chunk) = next else { break };
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        bytes += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    // TempPath travels with the blocking task so a dropped caller still
    // cleans up once decompression finishes.
    let (path, framing) = tokio::task::spawn_blocking(move || {
        let framing = decompress_in_place(&path)?;
        Ok::<_, io::Error>((path, framing))
    })
    .await
    .map_err(io::Error::other)??;

    info!(bytes, ?framing, "export downloaded");
    Ok(DownloadedExport {
        path,
        framing,
        bytes,
    })
}
