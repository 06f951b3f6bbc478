//! File lifecycle for downloads written by mediaq itself.
//!
//! Data goes to `<final>.<pid>-<n>.part` and is renamed into place only once
//! complete; an abandoned part file is removed on drop. Each writer gets its
//! own temp name, so two tasks storing the same destination never share one.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

static NEXT_TEMP: AtomicU64 = AtomicU64::new(0);

/// Temp path for `final_path` tagged with `tag`
/// (e.g. `clip.mp4`, `"7-0"` → `clip.mp4.7-0.part`).
pub fn temp_path(final_path: &Path, tag: &str) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(".");
    o.push(tag);
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

fn next_tag() -> String {
    let n = NEXT_TEMP.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", std::process::id(), n)
}

/// Sequential writer for a `.part` file.
pub struct PartFile {
    writer: Option<BufWriter<File>>,
    temp_path: PathBuf,
    written: u64,
}

impl PartFile {
    /// Create a fresh temp file next to `final_path`. Never reuses an existing file.
    pub fn create(final_path: &Path) -> Result<Self> {
        let temp_path = temp_path(final_path, &next_tag());
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .with_context(|| format!("create temp file: {}", temp_path.display()))?;
        Ok(Self {
            writer: Some(BufWriter::new(file)),
            temp_path,
            written: 0,
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .context("part file already finalized")?;
        writer.write_all(data).context("write part file")?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Flush, sync and atomically rename to `final_path`.
    pub fn finalize(mut self, final_path: &Path) -> Result<()> {
        let writer = self
            .writer
            .take()
            .context("part file already finalized")?;
        let file = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flush part file: {}", e.error()))?;
        file.sync_all().context("sync part file")?;
        drop(file);
        std::fs::rename(&self.temp_path, final_path).with_context(|| {
            format!(
                "rename {} to {}",
                self.temp_path.display(),
                final_path.display()
            )
        })?;
        Ok(())
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            if let Err(e) = std::fs::remove_file(&self.temp_path) {
                tracing::debug!(path = %self.temp_path.display(), "remove abandoned part file: {}", e);
            }
        }
    }
}
