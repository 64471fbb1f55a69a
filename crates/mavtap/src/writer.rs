//! Append-only session log writer.
//!
//! One JSON document per line, UTF-8, flushed to the OS after every append
//! so a crash loses at most platform-level buffering. Also provides the
//! tolerant reader used to inspect existing logs: a file that was not
//! cleanly closed may end in a partial line, which readers simply drop.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::LogRecord;

/// Appends log records to a line-delimited JSON file.
///
/// Exclusively owned by the capture task for the session's duration, so
/// records land in strict receipt order with no interleaving.
#[derive(Debug)]
pub struct LogWriter {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl LogWriter {
    /// Create (or truncate) the log file at the given path.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or the file cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening session log at {}", path.display());
        let file = File::create(&path).map_err(|source| Error::LogCreate {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            file: Some(BufWriter::new(file)),
        })
    }

    /// Get the path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a newline-terminated JSON document and flush.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, the write, or the flush fails.
    /// A failed append leaves the writer usable for the next record.
    pub fn append(&mut self, record: &LogRecord) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::internal("append on closed log writer"))?;
        let line = serde_json::to_string(record)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(())
    }

    /// Flush and release the file handle. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            if let Err(err) = file.flush() {
                debug!("Flush on close failed: {err}");
            }
            info!("Session log closed: {}", self.path.display());
        }
    }

    /// Whether the writer still holds its file handle.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        self.close();
    }
}

/// Read all well-formed records from a session log.
///
/// Lines that fail to parse (typically a partial line at the tail of a
/// crashed session) are dropped; the count of dropped lines is returned
/// alongside the records.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn read_records(path: impl AsRef<Path>) -> Result<(Vec<LogRecord>, usize)> {
    let file = File::open(path.as_ref())?;
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LogRecord>(&line) {
            Ok(record) => records.push(record),
            Err(_) => skipped += 1,
        }
    }
    Ok((records, skipped))
}
