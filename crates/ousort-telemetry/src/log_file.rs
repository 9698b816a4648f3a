//! Size-rotated log file writer.
//!
//! # Design
//! - Rotation happens before a write that would push the active file past the
//!   threshold, so one formatted event never straddles two files.
//! - Archives shift `name.1` → `name.2` …; the oldest beyond `keep` is dropped.
//! - Writers share one locked state; the fmt layer creates a writer per event.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

/// Rotating log file usable as a `tracing_subscriber` writer.
#[derive(Clone)]
pub struct RotatingFile {
    state: Arc<Mutex<RotationState>>,
    path: PathBuf,
}

struct RotationState {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
    keep: usize,
}

impl RotatingFile {
    /// Open (or create) `directory/file_name` for appending.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the file cannot be opened or its size read.
    pub fn open(directory: &Path, file_name: &str, max_bytes: u64, keep: usize) -> io::Result<Self> {
        let path = directory.join(file_name);
        let file = open_append(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            state: Arc::new(Mutex::new(RotationState {
                path: path.clone(),
                file,
                written,
                max_bytes: max_bytes.max(1),
                keep,
            })),
            path,
        })
    }

    /// Path of the active log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<'a> MakeWriter<'a> for RotatingFile {
    type Writer = RotatingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingWriter {
            state: Arc::clone(&self.state),
        }
    }
}

/// Per-event writer handle produced by [`RotatingFile`].
pub struct RotatingWriter {
    state: Arc<Mutex<RotationState>>,
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        state.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        state.file.flush()
    }
}

impl RotationState {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let incoming = u64::try_from(buf.len()).unwrap_or(u64::MAX);
        if self.written > 0 && self.written.saturating_add(incoming) > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.written = self.written.saturating_add(incoming);
        Ok(buf.len())
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.keep > 0 {
            let oldest = archive_path(&self.path, self.keep);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for index in (1..self.keep).rev() {
                let from = archive_path(&self.path, index);
                if from.exists() {
                    fs::rename(&from, archive_path(&self.path, index + 1))?;
                }
            }
            fs::rename(&self.path, archive_path(&self.path, 1))?;
            self.file = open_append(&self.path)?;
        } else {
            self.file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
        }
        self.written = 0;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn archive_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}
