//! Durable record of thread ids the bot has already replied to.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

/// Backend interface for the seen-set.
///
/// `load` always reads the full durable state; implementations must not cache
/// between calls. `append` is idempotent from the caller's point of view:
/// appending an id twice is harmless since only membership matters.
pub trait SeenStore: Send + Sync {
    fn load(&self) -> Result<HashSet<String>>;
    fn append(&self, id: &str) -> Result<()>;
}

/// `load` on the blocking pool, so file I/O stays off the async workers.
pub async fn load_blocking(store: Arc<dyn SeenStore>) -> Result<HashSet<String>> {
    tokio::task::spawn_blocking(move || store.load())
        .await
        .context("Seen-set load task failed")?
}

/// `append` on the blocking pool; the file store fsyncs before returning.
pub async fn append_blocking(store: Arc<dyn SeenStore>, id: String) -> Result<()> {
    tokio::task::spawn_blocking(move || store.append(&id))
        .await
        .context("Seen-set append task failed")?
}

/// Line-oriented text file, one id per line, append-only.
///
/// Ids are stored byte for byte; `load` only skips blank lines, so whatever
/// `append` writes comes back unchanged.
pub struct FileSeenStore {
    path: PathBuf,
}

impl FileSeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SeenStore for FileSeenStore {
    fn load(&self) -> Result<HashSet<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents
                .lines()
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()),
            // Nothing recorded yet.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashSet::new()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read seen-set {:?}", self.path))
            }
        }
    }

    fn append(&self, id: &str) -> Result<()> {
        if id.is_empty() || id.contains(['\n', '\r']) {
            anyhow::bail!("Refusing to record invalid item id {:?}", id);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open seen-set {:?}", self.path))?;
        writeln!(file, "{}", id)
            .with_context(|| format!("Failed to append to seen-set {:?}", self.path))?;
        file.sync_all()
            .with_context(|| format!("Failed to flush seen-set {:?}", self.path))?;
        Ok(())
    }
}
