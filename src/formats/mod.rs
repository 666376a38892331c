//! Streaming alignment readers.
//!
//! Supports automatic format detection for:
//! - TAF (.taf) - transposed alignment format, one column per line
//! - MAF (.maf) - multiple alignment format, one block per paragraph
//!
//! Format detection priority:
//! 1. Explicit format specification (-f option)
//! 2. Header line (`#taf`, `##maf`)
//! 3. File extension
//!
//! Both readers are pull-based: each call to `next()` reads exactly one
//! alignment block from the underlying reader.

pub mod maf;
pub mod taf;

use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::model::AlignmentBlock;
use maf::MafReader;
use taf::TafReader;

/// Alignment input format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Taf,
    Maf,
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileFormat::Taf => write!(f, "TAF"),
            FileFormat::Maf => write!(f, "MAF"),
        }
    }
}

/// Errors that can occur while reading an alignment stream.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read input: {0}")]
    IoError(#[from] io::Error),

    #[error("Could not determine alignment format.\n\
             Hint: Use -f/--format to specify the format explicitly:\n  \
             uce-scan -f taf ...   # TAF format\n  \
             uce-scan -f maf ...   # MAF format")]
    UnknownFormat,

    #[error("TAF error: {0}")]
    TafError(#[from] taf::TafError),

    #[error("MAF error: {0}")]
    MafError(#[from] maf::MafError),
}

/// Result type for reading operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Detects format from file extension.
pub fn detect_format_from_extension<P: AsRef<Path>>(path: P) -> Option<FileFormat> {
    let ext = path.as_ref().extension().and_then(OsStr::to_str)?;
    match ext.to_lowercase().as_str() {
        "taf" => Some(FileFormat::Taf),
        "maf" => Some(FileFormat::Maf),
        _ => None,
    }
}

/// Detects the format from the first non-empty line of the input.
pub fn detect_format_from_header(line: &str) -> Option<FileFormat> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("#taf") {
        Some(FileFormat::Taf)
    } else if trimmed.starts_with("##maf") {
        Some(FileFormat::Maf)
    } else {
        None
    }
}

/// Line source with one line of push-back.
///
/// Line terminators are stripped. Line numbers are 1-based.
pub(crate) struct LineReader<R> {
    reader: R,
    line: String,
    line_number: usize,
    held: bool,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
            held: false,
        }
    }

    /// Moves to the next line. Returns `false` at end of input.
    pub(crate) fn advance(&mut self) -> io::Result<bool> {
        if self.held {
            self.held = false;
            return Ok(true);
        }
        self.line.clear();
        if self.reader.read_line(&mut self.line)? == 0 {
            return Ok(false);
        }
        self.line_number += 1;
        let len = self.line.trim_end_matches(|c| c == '\n' || c == '\r').len();
        self.line.truncate(len);
        Ok(true)
    }

    pub(crate) fn line(&self) -> &str {
        &self.line
    }

    pub(crate) fn line_number(&self) -> usize {
        self.line_number
    }

    /// Pushes the current line back so the next `advance` returns it again.
    pub(crate) fn hold(&mut self) {
        self.held = true;
    }
}

enum Source<R> {
    Taf(TafReader<R>),
    Maf(MafReader<R>),
    Empty,
}

/// A stream of alignment blocks in either supported format.
pub struct AlignmentReader<R> {
    source: Source<R>,
}

impl<R: BufRead> AlignmentReader<R> {
    /// Creates a reader, detecting the format from the header unless forced.
    pub fn new(reader: R, forced_format: Option<FileFormat>) -> ParseResult<Self> {
        Self::with_hint(reader, forced_format, None)
    }

    /// Creates a reader with a fallback format used when the header is not
    /// recognized (typically derived from the file extension).
    pub fn with_hint(
        reader: R,
        forced_format: Option<FileFormat>,
        hint: Option<FileFormat>,
    ) -> ParseResult<Self> {
        let mut lines = LineReader::new(reader);
        loop {
            if !lines.advance()? {
                debug!("Empty alignment input");
                return Ok(Self {
                    source: Source::Empty,
                });
            }
            if !lines.line().trim().is_empty() {
                break;
            }
        }

        let format = forced_format
            .or_else(|| detect_format_from_header(lines.line()))
            .or(hint)
            .ok_or(ParseError::UnknownFormat)?;
        debug!("Reading {} alignment", format);

        lines.hold();
        let source = match format {
            FileFormat::Taf => Source::Taf(TafReader::new(lines)?),
            FileFormat::Maf => Source::Maf(MafReader::new(lines)?),
        };
        Ok(Self { source })
    }

    /// Returns the format being read, or `None` for empty input.
    pub fn format(&self) -> Option<FileFormat> {
        match self.source {
            Source::Taf(_) => Some(FileFormat::Taf),
            Source::Maf(_) => Some(FileFormat::Maf),
            Source::Empty => None,
        }
    }
}

impl<R: BufRead> Iterator for AlignmentReader<R> {
    type Item = ParseResult<AlignmentBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            Source::Taf(reader) => reader.next().map(|block| block.map_err(ParseError::from)),
            Source::Maf(reader) => reader.next().map(|block| block.map_err(ParseError::from)),
            Source::Empty => None,
        }
    }
}

/// Opens an alignment stream from a file, or from standard input when no
/// path is given.
pub fn open_alignment<P: AsRef<Path>>(
    path: Option<P>,
    forced_format: Option<FileFormat>,
) -> ParseResult<AlignmentReader<Box<dyn BufRead>>> {
    match path {
        Some(path) => {
            let file = File::open(&path)?;
            let reader: Box<dyn BufRead> = Box::new(BufReader::with_capacity(1024 * 1024, file));
            AlignmentReader::with_hint(reader, forced_format, detect_format_from_extension(&path))
        }
        None => {
            let reader: Box<dyn BufRead> = Box::new(io::stdin().lock());
            AlignmentReader::new(reader, forced_format)
        }
    }
}
