//! Lazy, forward-only readers over the records in a (possibly gzipped) sequencing file.
//!
//! - [`RecordReader`] yields every record in the file.
//! - [`SubsetReader`] yields only the records at a set of ascending positions.
//! - [`PatternReader`] yields only the records whose header matches a [`HeaderPattern`].
//!
//! Each reader owns its file handle and drops it as soon as the underlying stream is exhausted
//! or fails, so at most one record's lines are held in memory at any time.

use std::{
    fmt,
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use bstr::{BStr, BString, ByteSlice};
use fgoxide::io::Io;
use log::{debug, warn};
use regex::bytes::Regex;

use crate::{
    errors::DemuxError,
    format::{is_compressed, RecordShape},
};

/// A fixed number of raw text lines (without line terminators) making up one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    lines: Vec<BString>,
}

impl Record {
    /// Create a new [`Record`] from its lines.
    pub fn new(lines: Vec<BString>) -> Self {
        Self { lines }
    }

    /// The first line of the record.
    pub fn header(&self) -> &BStr {
        self.lines[0].as_bstr()
    }

    pub fn lines(&self) -> &[BString] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Write the record with each line terminated by a newline.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for line in &self.lines {
            writer.write_all(line)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

/// Reads [`Record`]s of the [`RecordShape`] resolved from the file name.
///
/// Input whose name ends with the compression suffix is transparently decompressed.  A trailing
/// group of lines too short to form a whole record is discarded with a warning.
pub struct RecordReader {
    path: PathBuf,
    shape: RecordShape,
    /// The open input, `None` once the stream is exhausted or has failed.
    reader: Option<Box<dyn BufRead>>,
    /// Reusable buffer for the current line.
    buffer: Vec<u8>,
    /// True once the first line of the first record has been read.
    started: bool,
}

impl RecordReader {
    /// Open the file at `path`, resolving the record shape from its name.
    ///
    /// # Errors
    ///
    /// - [`DemuxError::UnrecognizedFormat`] if the file name does not have a supported suffix
    /// - [`DemuxError::Open`] if the file cannot be opened
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DemuxError> {
        let path = path.as_ref().to_path_buf();
        let shape = RecordShape::from_path(&path)?;
        debug!(
            "Opening {} ({:?}, compressed: {})",
            path.to_string_lossy(),
            shape,
            is_compressed(&path)
        );
        let reader = Io::default()
            .new_reader(&path)
            .map_err(|source| DemuxError::Open { path: path.clone(), source })?;
        Ok(Self {
            path,
            shape,
            reader: Some(Box::new(reader)),
            buffer: Vec::new(),
            started: false,
        })
    }

    pub fn shape(&self) -> RecordShape {
        self.shape
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the underlying file handle.  Subsequent calls to `next()` return `None`.
    pub fn close(&mut self) {
        self.reader = None;
    }

    /// Read the next line, stripped of its line terminator, or `None` at end of file.
    fn read_line(&mut self) -> Result<Option<BString>, DemuxError> {
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(None),
        };
        self.buffer.clear();
        let bytes_read = reader
            .read_until(b'\n', &mut self.buffer)
            .map_err(|e| DemuxError::io(&self.path, e))?;
        if bytes_read == 0 {
            return Ok(None);
        }
        let mut line: &[u8] = &self.buffer;
        if let Some(stripped) = line.strip_suffix(b"\n") {
            line = stripped;
        }
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }
        Ok(Some(BString::from(line)))
    }

    fn read_record(&mut self) -> Result<Option<Record>, DemuxError> {
        let lines_per_record = self.shape.lines_per_record();
        let mut lines = Vec::with_capacity(lines_per_record);
        while lines.len() < lines_per_record {
            match self.read_line()? {
                Some(line) => {
                    if !self.started && self.shape.has_comment_preamble() && line.starts_with(b"#")
                    {
                        continue;
                    }
                    self.started = true;
                    lines.push(line);
                }
                None => {
                    if !lines.is_empty() {
                        warn!(
                            "Discarding {} trailing line(s) that do not form a complete record in {}",
                            lines.len(),
                            self.path.to_string_lossy()
                        );
                    }
                    self.close();
                    return Ok(None);
                }
            }
        }
        Ok(Some(Record::new(lines)))
    }
}

impl fmt::Debug for RecordReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordReader")
            .field("path", &self.path)
            .field("shape", &self.shape)
            .field("open", &self.reader.is_some())
            .finish()
    }
}

impl Iterator for RecordReader {
    type Item = Result<Record, DemuxError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_record() {
            Ok(record) => record.map(Ok),
            Err(err) => {
                self.close();
                Some(Err(err))
            }
        }
    }
}

/// Reads only the records at the given zero-based positions, in a single pass.
#[derive(Debug)]
pub struct SubsetReader {
    records: RecordReader,
    /// The remaining wanted positions, in ascending order.
    indices: std::vec::IntoIter<usize>,
    /// The next wanted position, `None` once all have been emitted.
    next_wanted: Option<usize>,
    /// The zero-based position of the next record read from `records`.
    position: usize,
}

impl SubsetReader {
    /// Open the file at `path` to read only the records at `indices`.
    ///
    /// # Errors
    ///
    /// - [`DemuxError::InvalidArgument`] if `indices` are not strictly ascending
    /// - any error from [`RecordReader::from_path`]
    pub fn from_path<P: AsRef<Path>, I: IntoIterator<Item = usize>>(
        path: P,
        indices: I,
    ) -> Result<Self, DemuxError> {
        let indices: Vec<usize> = indices.into_iter().collect();
        if let Some(pair) = indices.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(DemuxError::InvalidArgument(format!(
                "subset indices must be strictly ascending, found {} followed by {}",
                pair[0], pair[1]
            )));
        }
        let records = RecordReader::from_path(path)?;
        let mut indices = indices.into_iter();
        let next_wanted = indices.next();
        Ok(Self { records, indices, next_wanted, position: 0 })
    }
}

impl Iterator for SubsetReader {
    type Item = Result<Record, DemuxError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let wanted = match self.next_wanted {
                Some(wanted) => wanted,
                None => {
                    self.records.close();
                    return None;
                }
            };
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(err) => return Some(Err(err)),
            };
            let position = self.position;
            self.position += 1;
            if position == wanted {
                self.next_wanted = self.indices.next();
                return Some(Ok(record));
            }
        }
    }
}

/// A pattern tested against the header line of each record.
#[derive(Debug, Clone)]
pub enum HeaderPattern {
    /// Matches headers containing the literal bytes.
    Substring(BString),
    /// Matches headers in which the regular expression finds a match.
    Regex(Regex),
}

impl HeaderPattern {
    pub fn substring<S: AsRef<[u8]>>(pattern: S) -> Self {
        Self::Substring(BString::from(pattern.as_ref()))
    }

    /// Compile a regular expression pattern.
    ///
    /// # Errors
    ///
    /// - [`DemuxError::InvalidArgument`] if the pattern is not a valid regular expression
    pub fn regex(pattern: &str) -> Result<Self, DemuxError> {
        Regex::new(pattern).map(Self::Regex).map_err(|e| {
            DemuxError::InvalidArgument(format!("invalid header pattern `{}`: {}", pattern, e))
        })
    }

    pub fn is_match(&self, header: &[u8]) -> bool {
        match self {
            Self::Substring(needle) => header.contains_str(needle),
            Self::Regex(regex) => regex.is_match(header),
        }
    }
}

/// Reads only the records whose header line matches a [`HeaderPattern`].
#[derive(Debug)]
pub struct PatternReader {
    records: RecordReader,
    pattern: HeaderPattern,
}

impl PatternReader {
    /// Open the file at `path` to read only the records whose header matches `pattern`.
    pub fn from_path<P: AsRef<Path>>(path: P, pattern: HeaderPattern) -> Result<Self, DemuxError> {
        Ok(Self { records: RecordReader::from_path(path)?, pattern })
    }
}

impl Iterator for PatternReader {
    type Item = Result<Record, DemuxError>;

    fn next(&mut self) -> Option<Self::Item> {
        let pattern = &self.pattern;
        self.records.find(|record| match record {
            Ok(record) => pattern.is_match(record.header()),
            Err(_) => true,
        })
    }
}
