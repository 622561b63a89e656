//! usage_log.rs — append-only record of summarize invocations.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const CSV_HEADER: &str = "timestamp,input_type,input_chars,success,summary_chars";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Fetched,
    #[default]
    Manual,
}

impl InputType {
    pub fn as_str(self) -> &'static str {
        match self {
            InputType::Fetched => "fetched",
            InputType::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEntry {
    pub ts: DateTime<Utc>,
    pub input_type: InputType,
    pub input_chars: usize,
    pub success: bool,
    pub summary_chars: usize,
}

impl UsageEntry {
    /// One CSV row including the trailing newline. No field needs quoting.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{}\n",
            self.ts.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.input_type.as_str(),
            self.input_chars,
            self.success,
            self.summary_chars
        )
    }
}

/// Sink for usage entries. Built once at startup and injected where needed.
pub trait UsageRecorder: Send + Sync {
    fn record(&self, entry: &UsageEntry);
}

/// CSV file opened in append mode. Rows are written whole under a mutex.
#[derive(Debug)]
pub struct CsvUsageLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl CsvUsageLog {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if file.metadata()?.len() == 0 {
            file.write_all(format!("{CSV_HEADER}\n").as_bytes())?;
        }
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, row: &str) -> io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|_| io::Error::other("usage log mutex poisoned"))?;
        f.write_all(row.as_bytes())?;
        f.flush()
    }
}

impl UsageRecorder for CsvUsageLog {
    fn record(&self, entry: &UsageEntry) {
        if let Err(e) = self.append(&entry.to_csv_row()) {
            // Logging failures never fail the request.
            tracing::error!(error = %e, path = %self.path.display(), "usage log append failed");
        }
    }
}

/// In-memory recorder for tests.
#[derive(Debug, Default)]
pub struct MemoryUsageLog {
    inner: Mutex<Vec<UsageEntry>>,
}

impl MemoryUsageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<UsageEntry> {
        self.inner
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

impl UsageRecorder for MemoryUsageLog {
    fn record(&self, entry: &UsageEntry) {
        if let Ok(mut v) = self.inner.lock() {
            v.push(entry.clone());
        }
    }
}
