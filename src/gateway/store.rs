//! Append-only persistence of computed colors.
//!
//! Every computed (non-cached) color is recorded as a `(url, color)` pair.
//! Records are never read back on the request path, updated or deduplicated;
//! the same URL computed twice produces two records.
//!
//! A crash mid-append can leave a torn last line in the JSON Lines file. The
//! next append starts on a fresh line and readers skip lines that do not
//! parse, so one torn record never hides the rest of the log.

use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::color::ColorResult;
use crate::error::StoreError;

use super::WriteOutcome;

// =============================================================================
// Record and Backend Trait
// =============================================================================

/// One persisted color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRecord {
    /// The image URL exactly as requested
    pub url: String,

    /// Canonical `#rrggbb` color
    pub color: String,
}

impl StoreRecord {
    pub fn new(url: impl Into<String>, color: &ColorResult) -> Self {
        Self {
            url: url.into(),
            color: color.hex(),
        }
    }
}

/// An append-only record sink.
#[async_trait]
pub trait ColorStore: Send + Sync {
    async fn append(&self, record: StoreRecord) -> Result<(), StoreError>;
}

// =============================================================================
// JSON Lines Store
// =============================================================================

/// Line layout of [`JsonlColorStore`].
#[derive(Serialize)]
struct StoreLine<'a> {
    url: &'a str,
    color: &'a str,
    created_at: u64,
}

/// [`ColorStore`] writing one JSON object per line to a file opened in
/// append mode:
///
/// ```text
/// {"url":"https://example.com/cat.jpg","color":"#8a7b6c","created_at":1760659200}
/// ```
pub struct JsonlColorStore {
    path: PathBuf,
    writer: tokio::sync::Mutex<AppendState>,
}

struct AppendState {
    file: File,
    /// False when the file may end in a partial line
    at_line_start: bool,
}

impl JsonlColorStore {
    /// Open (or create) the file at `path` for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StoreError::Open {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let at_line_start = ends_with_newline(path).map_err(|e| StoreError::Open {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if !at_line_start {
            warn!(path = %path.display(), "Store file ends in a partial line");
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer: tokio::sync::Mutex::new(AppendState {
                file: File::from_std(file),
                at_line_start,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back, oldest first.
    ///
    /// Blank lines are ignored. Lines that are not a record (a torn append,
    /// hand edits) are logged and skipped.
    pub async fn records(&self) -> Result<Vec<StoreRecord>, StoreError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let contents = String::from_utf8_lossy(&bytes);

        let mut records = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = index + 1,
                    error = %e,
                    "Skipping malformed store line"
                ),
            }
        }
        Ok(records)
    }

    /// All records for `url`, oldest first.
    pub async fn records_for(&self, url: &str) -> Result<Vec<StoreRecord>, StoreError> {
        let mut records = self.records().await?;
        records.retain(|record| record.url == url);
        Ok(records)
    }

    /// Total number of records.
    pub async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records().await?.len())
    }
}

#[async_trait]
impl ColorStore for JsonlColorStore {
    async fn append(&self, record: StoreRecord) -> Result<(), StoreError> {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let json = serde_json::to_string(&StoreLine {
            url: &record.url,
            color: &record.color,
            created_at,
        })?;

        // Each record is a single write under the lock
        let mut writer = self.writer.lock().await;
        let mut line = String::with_capacity(json.len() + 2);
        if !writer.at_line_start {
            line.push('\n');
        }
        line.push_str(&json);
        line.push('\n');

        // Until a write fully lands the file may end mid-line
        writer.at_line_start = false;
        writer.file.write_all(line.as_bytes()).await?;
        writer.file.flush().await?;
        writer.at_line_start = true;
        Ok(())
    }
}

/// Whether the file at `path` is empty or ends in `\n`.
fn ends_with_newline(path: &Path) -> std::io::Result<bool> {
    let mut file = std::fs::File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// [`ColorStore`] keeping records in a `Vec`, for embedding and tests.
#[derive(Default)]
pub struct MemoryColorStore {
    records: Mutex<Vec<StoreRecord>>,
}

impl MemoryColorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, oldest first.
    pub fn records(&self) -> Vec<StoreRecord> {
        lock(&self.records).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ColorStore for MemoryColorStore {
    async fn append(&self, record: StoreRecord) -> Result<(), StoreError> {
        lock(&self.records).push(record);
        Ok(())
    }
}

// A push never panics halfway, so a poisoned list is still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Gateway
// =============================================================================

/// Optional persistence of computed colors.
#[derive(Clone, Default)]
pub struct StoreGateway {
    backend: Option<Arc<dyn ColorStore>>,
}

impl StoreGateway {
    /// A gateway that drops every record.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    pub fn new(backend: Arc<dyn ColorStore>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Append a `(url, color)` record. Failures are logged, never returned.
    pub async fn append(&self, url: &str, color: &ColorResult) -> WriteOutcome {
        let Some(backend) = &self.backend else {
            return WriteOutcome::Skipped;
        };

        match backend.append(StoreRecord::new(url, color)).await {
            Ok(()) => {
                debug!(url = %url, color = %color, "Stored color");
                WriteOutcome::Written
            }
            Err(err) => {
                warn!(url = %url, error = %err, "Failed to store color");
                WriteOutcome::Failed
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
