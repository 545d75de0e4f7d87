// Append LogRecords to JSON lines files under a single directory.
// One file is "current" at a time. Rotation opens a new file whose name sorts
// after every earlier one, so the newest file is both the last by name and by
// modification time. Nothing outside `<prefix>_*.log` is ever touched.

use crate::domain::{DiagnosticsError, LogRecord};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{self, AsyncWriteExt};
use tracing::{debug, info, warn};

pub const LOG_FILE_EXTENSION: &str = "log";
pub const DEFAULT_FILE_PREFIX: &str = "diagnostics";

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

struct OpenLogFile {
    path: PathBuf,
    file: File,
}

pub struct LogFileStore {
    directory: PathBuf,
    prefix: String,
    current: Option<OpenLogFile>,
    sequence: u64,
}

impl LogFileStore {
    /// Does no I/O; the directory and first file are created on first write.
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
            current: None,
            sequence: 0,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|c| c.path.as_path())
    }

    /// Serializes every record before touching the disk, so an encoding
    /// failure never leaves a partial batch behind.
    pub async fn append(&mut self, records: &[LogRecord]) -> Result<usize, DiagnosticsError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut payload = String::new();
        for record in records {
            payload.push_str(&record.to_json_line()?);
            payload.push('\n');
        }

        let current = self.current_file().await?;
        let written = match current.file.write_all(payload.as_bytes()).await {
            Ok(()) => current.file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // A partial line may be on disk; continue in a fresh file.
            warn!(path = %current.path.display(), "Abandoning log file after failed write: {e}");
            self.current = None;
            return Err(e.into());
        }

        Ok(records.len())
    }

    /// Closes the current file and opens a fresh one.
    pub async fn rotate(&mut self) -> Result<PathBuf, DiagnosticsError> {
        if let Some(mut previous) = self.current.take() {
            previous.file.flush().await?;
            previous.file.sync_data().await?;
            debug!(path = %previous.path.display(), "Closed log file for rotation");
        }

        let opened = self.open_new_file().await?;
        let path = opened.path.clone();
        self.current = Some(opened);

        info!(path = %path.display(), "Rotated log file");
        Ok(path)
    }

    /// Retained log file names, oldest first. A missing directory is empty.
    pub async fn list_files(&self) -> Result<Vec<String>, DiagnosticsError> {
        let mut names: Vec<String> = self
            .scan()
            .await?
            .into_iter()
            .filter_map(|(path, _)| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    /// Deletes log files last modified more than `older_than_days` ago.
    ///
    /// Returns the number of files removed. If the current file goes, the
    /// next write opens a new one.
    pub async fn clear_old_logs(&mut self, older_than_days: u64) -> Result<usize, DiagnosticsError> {
        let cutoff = SystemTime::now()
            .checked_sub(Duration::from_secs(older_than_days.saturating_mul(SECONDS_PER_DAY)))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut removed = 0;
        for (path, modified) in self.scan().await? {
            if modified >= cutoff {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => {
                    removed += 1;
                    if self.current_path() == Some(path.as_path()) {
                        self.current = None;
                    }
                    debug!(path = %path.display(), "Removed expired log file");
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), "Failed to remove log file: {e}"),
            }
        }

        if removed > 0 {
            info!("Cleaned up {removed} log files older than {older_than_days} days");
        }
        Ok(removed)
    }

    /// Closes the current file after syncing it.
    pub async fn close(&mut self) -> Result<(), DiagnosticsError> {
        if let Some(mut current) = self.current.take() {
            current.file.flush().await?;
            current.file.sync_data().await?;
        }
        Ok(())
    }

    fn owns(&self, name: &str) -> bool {
        name.starts_with(&format!("{}_", self.prefix))
            && Path::new(name).extension().and_then(|e| e.to_str()) == Some(LOG_FILE_EXTENSION)
    }

    async fn scan(&self) -> Result<Vec<(PathBuf, SystemTime)>, DiagnosticsError> {
        let mut dir = match fs::read_dir(&self.directory).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !self.owns(name) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            files.push((entry.path(), metadata.modified()?));
        }
        Ok(files)
    }

    async fn current_file(&mut self) -> Result<&mut OpenLogFile, DiagnosticsError> {
        if self.current.is_none() {
            let opened = self.open_new_file().await?;
            debug!(path = %opened.path.display(), "Opened log file");
            self.current = Some(opened);
        }
        self.current
            .as_mut()
            .ok_or_else(|| DiagnosticsError::Io(io::Error::other("log file unavailable")))
    }

    async fn open_new_file(&mut self) -> Result<OpenLogFile, DiagnosticsError> {
        fs::create_dir_all(&self.directory).await?;

        loop {
            self.sequence += 1;
            let path = self.directory.join(self.file_name());
            match OpenOptions::new()
                .create_new(true)
                .append(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok(OpenLogFile { path, file }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn file_name(&self) -> String {
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
        format!(
            "{}_{timestamp}_{:04}.{LOG_FILE_EXTENSION}",
            self.prefix, self.sequence
        )
    }
}
