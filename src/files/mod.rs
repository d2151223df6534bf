//! Module managing the output files written during a run. Every file lives under one output
//! directory and is opened at most once per name; all of them are closed together at the end of the
//! run.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, error};

use crate::error::{Error, io_error};


pub const OUTPUT_DIR: &str = "output-files";

/// Keyed registry of [`TaskFileWriter`]s.
#[derive(Debug)]
pub struct FileWriterRegistry {
    dir: PathBuf,
    writers: DashMap<String, Arc<TaskFileWriter>>,
}

impl Default for FileWriterRegistry {
    fn default() -> Self {
        Self::new(OUTPUT_DIR)
    }
}

impl FileWriterRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            writers: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the writer registered under `name`, creating the file if this is the first request.
    ///
    /// `append` only matters for the request that creates the writer.
    pub fn get(&self, name: &str, append: bool) -> Result<Arc<TaskFileWriter>, Error> {
        if let Some(existing) = self.writers.get(name) {
            return Ok(Arc::clone(existing.value()));
        }

        let candidate = Arc::new(TaskFileWriter::create(self.dir.join(name), append)?);
        match self.writers.entry(name.to_string()) {
            Entry::Occupied(winner) => {
                debug!(name, "file writer already registered by another worker");
                Ok(Arc::clone(winner.get()))
            }
            Entry::Vacant(slot) => Ok(Arc::clone(slot.insert(candidate).value())),
        }
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    /// Flushes and closes every registered writer and forgets them. Failures are logged.
    pub fn close_all(&self) {
        for entry in self.writers.iter() {
            if let Err(e) = entry.value().close() {
                error!(file = entry.key().as_str(), error = %e, "failed to close file");
            }
        }
        self.writers.clear();
    }
}

/// Buffered writer over one output file. The file is created up front; the buffered handle is
/// opened lazily on first write, truncating or appending as requested.
#[derive(Debug)]
pub struct TaskFileWriter {
    path: PathBuf,
    append: bool,
    state: Mutex<WriterState>,
}

#[derive(Debug)]
enum WriterState {
    Pending,
    Open(BufWriter<File>),
    Closed,
}

impl TaskFileWriter {
    fn create(path: PathBuf, append: bool) -> Result<Self, Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        // also fails when the target exists but is not writable
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;

        Ok(Self {
            path,
            append,
            state: Mutex::new(WriterState::Pending),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `text` as is.
    pub fn write_str(&self, text: &str) -> Result<(), Error> {
        let mut state = self.lock();
        self.open(&mut state)?
            .write_all(text.as_bytes())
            .map_err(|e| io_error(&self.path, e))
    }

    /// Writes `line` followed by a newline.
    pub fn write_line(&self, line: &str) -> Result<(), Error> {
        let mut state = self.lock();
        let writer = self.open(&mut state)?;
        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .map_err(|e| io_error(&self.path, e))
    }

    pub fn flush(&self) -> Result<(), Error> {
        match &mut *self.lock() {
            WriterState::Open(writer) => writer.flush().map_err(|e| io_error(&self.path, e)),
            WriterState::Pending | WriterState::Closed => Ok(()),
        }
    }

    /// Flushes and releases the handle. Closing twice is a no-op; writing after closing fails.
    pub fn close(&self) -> Result<(), Error> {
        let previous = std::mem::replace(&mut *self.lock(), WriterState::Closed);
        match previous {
            WriterState::Open(mut writer) => writer.flush().map_err(|e| io_error(&self.path, e)),
            WriterState::Pending | WriterState::Closed => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.lock(), WriterState::Closed)
    }

    fn open<'s>(&self, state: &'s mut WriterState) -> Result<&'s mut BufWriter<File>, Error> {
        if matches!(state, WriterState::Pending) {
            let file = OpenOptions::new()
                .write(true)
                .append(self.append)
                .truncate(!self.append)
                .open(&self.path)
                .map_err(|e| io_error(&self.path, e))?;
            *state = WriterState::Open(BufWriter::new(file));
        }
        match state {
            WriterState::Open(writer) => Ok(writer),
            WriterState::Pending | WriterState::Closed => Err(Error::FileClosed(self.path.clone())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Lets a shared writer back a `csv::Writer` or any other `io::Write` consumer.
impl Write for &TaskFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        self.open(&mut state).map_err(io::Error::other)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut *self.lock() {
            WriterState::Open(writer) => writer.flush(),
            WriterState::Pending | WriterState::Closed => Ok(()),
        }
    }
}
