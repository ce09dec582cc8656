//! Line sources feeding the orchestrator.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Yields raw lines without their terminator. The returned slice is only valid
/// until the next call.
pub trait LineSource {
    fn next_line(&mut self) -> io::Result<Option<&[u8]>>;
}

/// Line source over any buffered reader, reusing a single scratch vector.
pub struct ReaderLineSource<R> {
    reader: R,
    scratch: Vec<u8>,
}

impl<R: BufRead> ReaderLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, scratch: Vec::with_capacity(256) }
    }
}

impl ReaderLineSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|source| PipelineError::FileOpen { path: path.to_path_buf(), source })?;
        Ok(Self::new(BufReader::with_capacity(1 << 20, file)))
    }
}

impl<R: BufRead> LineSource for ReaderLineSource<R> {
    fn next_line(&mut self) -> io::Result<Option<&[u8]>> {
        self.scratch.clear();
        if self.reader.read_until(b'\n', &mut self.scratch)? == 0 {
            return Ok(None);
        }
        let mut line = &self.scratch[..];
        if let [rest @ .., b'\n'] = line {
            line = rest;
        }
        if let [rest @ .., b'\r'] = line {
            line = rest;
        }
        Ok(Some(line))
    }
}
