//! Module defining how raw input lines become typed records: the [`LineParser`] contract and the
//! [`LineReader`] streaming the input file through it.

use std::fs::File;
use std::fmt;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, io_error, parse_error};

mod parsers;


pub use parsers::{IntegerLineParser, PairIntegerCsvLineParser, StringLineParser};

/// Turns one raw line (without its line terminator) into one record.
///
/// Implementations must be deterministic. They may reject a line with an error message, which
/// aborts the producer unless the reader skips malformed lines, or return a domain-specific
/// sentinel record instead.
pub trait LineParser {
    type Record;

    fn parse_line(&self, line: &str) -> Result<Self::Record, String>;
}

impl<P: LineParser + ?Sized> LineParser for Box<P> {
    type Record = P::Record;

    fn parse_line(&self, line: &str) -> Result<Self::Record, String> {
        (**self).parse_line(line)
    }
}

/// Streams records out of a line-oriented source.
///
/// The first `skip` lines are discarded on construction. Iterating yields `Ok(record)` per line,
/// `Err` on I/O or parse failures, and `None` once the source is drained or the reader was closed.
pub struct LineReader<'p, P: ?Sized, R = BufReader<File>> {
    source: Option<R>,
    origin: PathBuf,
    parser: &'p P,
    buffer: String,
    line_number: u64,
    skip_malformed: bool,
}

impl<'p, P: LineParser + ?Sized> LineReader<'p, P> {
    /// Opens `path` for buffered reading. Directories are rejected up front, like missing files.
    pub fn open(path: impl AsRef<Path>, parser: &'p P, skip: usize) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| io_error(path, e))?;
        let metadata = file.metadata().map_err(|e| io_error(path, e))?;
        if metadata.is_dir() {
            let source = io::Error::new(io::ErrorKind::IsADirectory, "input is a directory");
            return Err(io_error(path, source));
        }
        Self::build(BufReader::new(file), path.to_path_buf(), parser, skip)
    }
}

impl<'p, P: LineParser + ?Sized, R: BufRead> LineReader<'p, P, R> {
    pub fn new(source: R, parser: &'p P, skip: usize) -> Result<Self, Error> {
        Self::build(source, PathBuf::from("<input>"), parser, skip)
    }

    fn build(source: R, origin: PathBuf, parser: &'p P, skip: usize) -> Result<Self, Error> {
        let mut reader = Self {
            source: Some(source),
            origin,
            parser,
            buffer: String::new(),
            line_number: 0,
            skip_malformed: false,
        };

        for _ in 0..skip {
            if !reader.read_raw_line()? {
                debug!(skip, skipped = reader.line_number, "input shorter than skip size");
                break;
            }
        }
        Ok(reader)
    }

    /// Makes the reader log and drop lines the parser rejects instead of failing on them.
    pub fn skip_malformed(mut self, skip: bool) -> Self {
        self.skip_malformed = skip;
        self
    }

    /// Number of lines consumed so far, skipped ones included.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Releases the underlying source. Closing twice is a no-op.
    pub fn close(&mut self) {
        self.source = None;
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    // Reads the next line into the buffer, without its terminator. Returns false at end of input.
    fn read_raw_line(&mut self) -> Result<bool, Error> {
        let Some(source) = self.source.as_mut() else {
            return Ok(false);
        };

        self.buffer.clear();
        let read = source
            .read_line(&mut self.buffer)
            .map_err(|e| io_error(&self.origin, e))?;
        if read == 0 {
            return Ok(false);
        }

        self.line_number += 1;
        if self.buffer.ends_with('\n') {
            self.buffer.pop();
            if self.buffer.ends_with('\r') {
                self.buffer.pop();
            }
        }
        Ok(true)
    }
}

impl<P: ?Sized, R> fmt::Debug for LineReader<'_, P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineReader")
            .field("origin", &self.origin)
            .field("line_number", &self.line_number)
            .field("closed", &self.source.is_none())
            .field("skip_malformed", &self.skip_malformed)
            .finish()
    }
}

impl<P: LineParser + ?Sized, R: BufRead> Iterator for LineReader<'_, P, R> {
    type Item = Result<P::Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.read_raw_line() {
                Ok(false) => return None,
                Ok(true) => {}
                Err(e) => return Some(Err(e)),
            }

            match self.parser.parse_line(&self.buffer) {
                Ok(record) => return Some(Ok(record)),
                Err(message) if self.skip_malformed => {
                    warn!(line = self.line_number, %message, "skipping malformed line");
                }
                Err(message) => return Some(Err(parse_error(self.line_number, message))),
            }
        }
    }
}
