//! Newline-delimited JSON alert log reader
//!
//! Lines are parsed one at a time. Anything that is not a JSON object is
//! dropped and counted rather than failing the run.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::types::RawRecord;

/// Lazy reader over an alert log, yielding one raw record per valid line
pub struct LogReader {
    path: PathBuf,
    reader: Box<dyn BufRead>,
    line_no: usize,
    dropped: usize,
    buf: Vec<u8>,
}

impl LogReader {
    /// Open a log file. Paths ending in `.zst` are decompressed on the fly.
    ///
    /// A missing file is an error; an empty file is not.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Alert log not found: {:?}", path);
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open alert log: {:?}", path))?;

        let inner: Box<dyn Read> = if path.extension().map_or(false, |ext| ext == "zst") {
            let decoder = zstd::stream::Decoder::new(file)
                .with_context(|| format!("Failed to create zstd decoder for: {:?}", path))?;
            Box::new(decoder)
        } else {
            Box::new(file)
        };

        Ok(Self::from_reader(path.to_path_buf(), BufReader::new(inner)))
    }

    /// Wrap an already-open reader. `path` is only used in error messages.
    pub fn from_reader(path: PathBuf, reader: impl BufRead + 'static) -> Self {
        Self {
            path,
            reader: Box::new(reader),
            line_no: 0,
            dropped: 0,
            buf: Vec::new(),
        }
    }

    /// Number of malformed lines skipped so far
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Lines consumed so far, including blank and malformed ones
    pub fn lines_read(&self) -> usize {
        self.line_no
    }
}

impl Iterator for LogReader {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            let read = match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(n) => n,
                Err(e) => {
                    return Some(Err(e).with_context(|| {
                        format!("Failed to read alert log {:?} at line {}", self.path, self.line_no + 1)
                    }))
                }
            };
            if read == 0 {
                return None;
            }
            self.line_no += 1;

            if self.buf.iter().all(|b| b.is_ascii_whitespace()) {
                continue;
            }

            match parse_line(&self.buf) {
                Some(record) => return Some(Ok(record)),
                None => {
                    self.dropped += 1;
                    debug!("Dropping malformed line {} in {:?}", self.line_no, self.path);
                }
            }
        }
    }
}

/// Parse one log line into a raw record. Non-object JSON counts as malformed.
pub fn parse_line(line: &[u8]) -> Option<RawRecord> {
    match serde_json::from_slice::<Value>(line) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
