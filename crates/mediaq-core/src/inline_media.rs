//! Media attached directly to a chat message, stored as a blocking operation.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::scheduler::{DownloadOutput, TaskContext};
use crate::storage::PartFile;
use crate::url_model::inline_media_filename;

const COPY_CHUNK: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum InlineMediaError {
    /// Payload exceeds the configured inline media cap.
    #[error("media size ({size} bytes) exceeds maximum ({max} bytes)")]
    TooLarge { size: u64, max: u64 },
}

/// An inline media payload as handed over by the chat client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    /// Stable unique id assigned by the chat protocol.
    pub unique_id: String,
    /// Declared size in bytes.
    pub file_size: u64,
    /// Where the chat client made the payload available.
    pub source: PathBuf,
    /// File extension for the stored copy (without dot).
    pub extension: String,
}

impl InlineMedia {
    /// Describe a local file as inline media; size and extension come from the file.
    pub fn from_path(source: &Path, unique_id: Option<&str>) -> Result<Self> {
        let meta = fs::metadata(source)
            .with_context(|| format!("inline media source: {}", source.display()))?;
        let unique_id = match unique_id {
            Some(id) => id.to_string(),
            None => source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let extension = source
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mp4".to_string());
        Ok(Self {
            unique_id,
            file_size: meta.len(),
            source: source.to_path_buf(),
            extension,
        })
    }

    /// Final path of the stored copy under `dest_dir`.
    pub fn destination(&self, dest_dir: &Path) -> PathBuf {
        dest_dir.join(inline_media_filename(&self.unique_id, &self.extension))
    }

    /// Copy the payload into `dest_dir`, reporting progress per chunk.
    ///
    /// Rejects payloads larger than `max_size`, whether declared or actual.
    pub fn store(&self, dest_dir: &Path, max_size: u64, ctx: &mut TaskContext) -> Result<PathBuf> {
        if self.file_size > max_size {
            return Err(InlineMediaError::TooLarge {
                size: self.file_size,
                max: max_size,
            }
            .into());
        }
        ctx.checkpoint()?;

        fs::create_dir_all(dest_dir)
            .with_context(|| format!("create download dir: {}", dest_dir.display()))?;
        let final_path = self.destination(dest_dir);
        tracing::info!(
            task_id = ctx.task_id(),
            unique_id = %self.unique_id,
            size = self.file_size,
            path = %final_path.display(),
            "storing inline media"
        );

        let mut src = File::open(&self.source)
            .with_context(|| format!("open inline media: {}", self.source.display()))?;
        let mut part = PartFile::create(&final_path)?;
        let mut buf = vec![0u8; COPY_CHUNK];
        loop {
            let n = src.read(&mut buf).context("read inline media")?;
            if n == 0 {
                break;
            }
            part.write_all(&buf[..n])?;
            if part.written() > max_size {
                return Err(InlineMediaError::TooLarge {
                    size: part.written(),
                    max: max_size,
                }
                .into());
            }
            ctx.report(part.written(), Some(self.file_size))?;
        }
        part.finalize(&final_path)?;
        Ok(final_path)
    }

    /// Wrap [`store`](Self::store) as an operation for `Scheduler::submit`.
    pub fn into_operation(
        self,
        dest_dir: PathBuf,
        max_size: u64,
    ) -> impl FnOnce(&mut TaskContext) -> Result<DownloadOutput> + Send + 'static {
        move |ctx| {
            self.store(&dest_dir, max_size, ctx)
                .map(DownloadOutput::single)
        }
    }
}
