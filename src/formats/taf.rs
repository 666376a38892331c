//! TAF (transposed alignment format) reader.
//!
//! ## TAF Format
//!
//! A header line of `key:value` tags, then one line per alignment column:
//! ```text
//! #taf version:1 run_length_encode_bases:0
//! AAA ; i 0 hg38.chr1 100 + 5000 i 1 mm10.chr2 20 + 4000 i 2 rn6.chr3 7 - 3000
//! CCC
//! G-G
//! TT ; d 1
//! ```
//!
//! The bases of a line give one character per row. The optional part after
//! `;` edits the row set before the column is read:
//! - `i row name start strand length` inserts a row
//! - `s row name start strand length` replaces a row's coordinates
//! - `d row` deletes a row
//! - `g row n` skips `n` bases of a row's sequence
//! - `G row bases` skips the given unaligned bases of a row's sequence
//!
//! Anything after `@` is a column tag list and is ignored.
//!
//! With `run_length_encode_bases:1` the bases are written as `base count`
//! pairs, e.g. `A 2 C 1` for `AAC`.
//!
//! Consecutive lines without coordinates form one block, capped at
//! [`DEFAULT_MAX_BLOCK_COLUMNS`] columns.

use std::io::{self, BufRead};
use std::str::FromStr;

use thiserror::Error;

use super::LineReader;
use crate::model::{AlignmentBlock, Row, Strand};

/// Longest block the reader assembles before cutting it.
pub const DEFAULT_MAX_BLOCK_COLUMNS: usize = 10_000;

/// Errors that can occur during TAF parsing.
#[derive(Error, Debug)]
pub enum TafError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] io::Error),

    #[error("Missing TAF header: expected a line starting with '#taf', got '{0}'")]
    MissingHeader(String),

    #[error("Malformed header tag '{0}': expected key:value")]
    MalformedTag(String),

    #[error("Line {line}: expected {expected} bases but found {found}")]
    RowCountMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: row {row} does not exist ({rows} rows)")]
    RowOutOfRange { line: usize, row: usize, rows: usize },

    #[error("Line {line}: invalid strand '{value}'")]
    InvalidStrand { line: usize, value: String },

    #[error("Line {line}: {message}")]
    ParseError { line: usize, message: String },
}

/// Result type for TAF operations.
pub type TafResult<T> = Result<T, TafError>;

/// A single coordinate edit from the `;` section of a column line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CoordinateOp {
    Insert { row: usize, coordinates: RowCoordinates },
    Substitute { row: usize, coordinates: RowCoordinates },
    Delete { row: usize },
    Gap { row: usize, length: u64 },
}

/// Coordinates of a row, advanced after every block.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RowCoordinates {
    sequence_name: String,
    position: u64,
    strand: Strand,
    sequence_length: u64,
}

/// One column line split into its undecoded bases and parsed edits.
#[derive(Debug, Default)]
struct ColumnLine<'a> {
    bases: &'a str,
    ops: Vec<CoordinateOp>,
}

/// Streaming TAF reader yielding one [`AlignmentBlock`] per coordinate span.
pub struct TafReader<R> {
    lines: LineReader<R>,
    tags: Vec<(String, String)>,
    run_length_encoded: bool,
    rows: Vec<RowCoordinates>,
    max_block_columns: usize,
    finished: bool,
}

impl<R: BufRead> TafReader<R> {
    /// Creates a reader from a raw `BufRead`, reading the header.
    pub fn from_reader(reader: R) -> TafResult<Self> {
        Self::new(LineReader::new(reader))
    }

    pub(crate) fn new(mut lines: LineReader<R>) -> TafResult<Self> {
        let mut header = None;
        while lines.advance()? {
            if !lines.line().trim().is_empty() {
                header = Some(lines.line().trim().to_string());
                break;
            }
        }
        let header = header.unwrap_or_default();
        let tags = parse_header(&header)?;
        let run_length_encoded = tags
            .iter()
            .any(|(key, value)| key == "run_length_encode_bases" && value == "1");

        Ok(Self {
            lines,
            tags,
            run_length_encoded,
            rows: Vec::new(),
            max_block_columns: DEFAULT_MAX_BLOCK_COLUMNS,
            finished: false,
        })
    }

    /// Sets the maximum number of columns per block.
    pub fn with_max_block_columns(mut self, columns: usize) -> Self {
        self.max_block_columns = columns.max(1);
        self
    }

    /// Returns the header tags in file order.
    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    fn read_block(&mut self) -> TafResult<Option<AlignmentBlock>> {
        let mut columns: Vec<Vec<u8>> = Vec::new();
        let mut column_count = 0;

        while self.lines.advance()? {
            let line_number = self.lines.line_number();
            let line = self.lines.line().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let column = parse_column_line(line, line_number)?;

            if column_count > 0 && (!column.ops.is_empty() || column_count >= self.max_block_columns) {
                self.lines.hold();
                break;
            }

            if column_count == 0 {
                apply_ops(&mut self.rows, column.ops, line_number)?;
                columns = vec![Vec::new(); self.rows.len()];
            }

            let bases = decode_bases(column.bases, self.run_length_encoded, self.rows.len(), line_number)?;
            for (row_bases, base) in columns.iter_mut().zip(bases) {
                row_bases.push(base);
            }
            column_count += 1;
        }

        if column_count == 0 {
            return Ok(None);
        }

        let line_number = self.lines.line_number();
        let rows = self
            .rows
            .iter_mut()
            .zip(columns)
            .map(|(coords, bases)| {
                let row = Row::new(
                    coords.sequence_name.clone(),
                    coords.strand,
                    coords.position,
                    coords.sequence_length,
                    bases,
                );
                coords.position = advance_position(coords.position, row.length, line_number)?;
                Ok(row)
            })
            .collect::<TafResult<Vec<_>>>()?;

        Ok(Some(AlignmentBlock::new(rows)))
    }
}

impl<R: BufRead> Iterator for TafReader<R> {
    type Item = TafResult<AlignmentBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Parses the `#taf` header line into key/value tags.
fn parse_header(line: &str) -> TafResult<Vec<(String, String)>> {
    let rest = line
        .strip_prefix("#taf")
        .ok_or_else(|| TafError::MissingHeader(line.to_string()))?;

    rest.split_whitespace()
        .map(|tag| {
            tag.split_once(':')
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .ok_or_else(|| TafError::MalformedTag(tag.to_string()))
        })
        .collect()
}

fn parse_number<T: FromStr>(token: Option<&str>, what: &str, line: usize) -> TafResult<T> {
    let token = token.ok_or_else(|| TafError::ParseError {
        line,
        message: format!("missing {}", what),
    })?;
    token.parse().map_err(|_| TafError::ParseError {
        line,
        message: format!("invalid {} '{}'", what, token),
    })
}

fn parse_coordinates<'a, I>(tokens: &mut I, line: usize) -> TafResult<RowCoordinates>
where
    I: Iterator<Item = &'a str>,
{
    let sequence_name = tokens
        .next()
        .ok_or_else(|| TafError::ParseError {
            line,
            message: "missing sequence name".to_string(),
        })?
        .to_string();
    let position = parse_number(tokens.next(), "start", line)?;
    let strand_token = tokens.next().unwrap_or("");
    let strand = Strand::from_symbol(strand_token).ok_or_else(|| TafError::InvalidStrand {
        line,
        value: strand_token.to_string(),
    })?;
    let sequence_length = parse_number(tokens.next(), "sequence length", line)?;
    Ok(RowCoordinates {
        sequence_name,
        position,
        strand,
        sequence_length,
    })
}

/// Splits one column line into bases and coordinate edits, dropping tags.
fn parse_column_line(line: &str, line_number: usize) -> TafResult<ColumnLine<'_>> {
    // Column tags are not needed by any consumer
    let line = line.split_once('@').map_or(line, |(body, _)| body);
    let (bases_part, coordinates_part) = match line.split_once(';') {
        Some((bases, coordinates)) => (bases, Some(coordinates)),
        None => (line, None),
    };

    let mut column = ColumnLine {
        bases: bases_part,
        ops: Vec::new(),
    };
    if let Some(coordinates) = coordinates_part {
        let mut tokens = coordinates.split_whitespace();
        while let Some(op) = tokens.next() {
            let row = parse_number(tokens.next(), "row index", line_number)?;
            let op = match op {
                "i" => CoordinateOp::Insert {
                    row,
                    coordinates: parse_coordinates(&mut tokens, line_number)?,
                },
                "s" => CoordinateOp::Substitute {
                    row,
                    coordinates: parse_coordinates(&mut tokens, line_number)?,
                },
                "d" => CoordinateOp::Delete { row },
                "g" => CoordinateOp::Gap {
                    row,
                    length: parse_number(tokens.next(), "gap length", line_number)?,
                },
                "G" => {
                    let gap = tokens.next().unwrap_or("");
                    CoordinateOp::Gap {
                        row,
                        length: gap.len() as u64,
                    }
                }
                other => {
                    return Err(TafError::ParseError {
                        line: line_number,
                        message: format!("unknown coordinate operation '{}'", other),
                    })
                }
            };
            column.ops.push(op);
        }
    }

    Ok(column)
}

/// Decodes the bases of a column line, which must cover exactly `rows` rows.
fn decode_bases(text: &str, run_length_encoded: bool, rows: usize, line: usize) -> TafResult<Vec<u8>> {
    let mismatch = |found| TafError::RowCountMismatch {
        line,
        expected: rows,
        found,
    };

    let mut bases = Vec::with_capacity(rows);
    if run_length_encoded {
        let mut tokens = text.split_whitespace();
        while let Some(base) = tokens.next() {
            if base.len() != 1 {
                return Err(TafError::ParseError {
                    line,
                    message: format!("invalid run-length base '{}'", base),
                });
            }
            let count: usize = parse_number(tokens.next(), "run length", line)?;
            let total = bases.len().checked_add(count).unwrap_or(usize::MAX);
            if total > rows {
                return Err(mismatch(total));
            }
            bases.resize(total, base.as_bytes()[0]);
        }
    } else {
        for token in text.split_whitespace() {
            let total = bases.len() + token.len();
            if total > rows {
                return Err(mismatch(total));
            }
            bases.extend_from_slice(token.as_bytes());
        }
    }

    if bases.len() != rows {
        return Err(mismatch(bases.len()));
    }
    Ok(bases)
}

fn advance_position(position: u64, length: u64, line: usize) -> TafResult<u64> {
    position.checked_add(length).ok_or_else(|| TafError::ParseError {
        line,
        message: format!("position {} advanced by {} overflows", position, length),
    })
}

/// Applies coordinate edits in order; each index refers to the rows as
/// left by the previous edit.
fn apply_ops(rows: &mut Vec<RowCoordinates>, ops: Vec<CoordinateOp>, line: usize) -> TafResult<()> {
    for op in ops {
        match op {
            CoordinateOp::Insert { row, coordinates } => {
                if row > rows.len() {
                    return Err(TafError::RowOutOfRange { line, row, rows: rows.len() });
                }
                rows.insert(row, coordinates);
            }
            CoordinateOp::Substitute { row, coordinates } => {
                let rows_len = rows.len();
                let slot = rows
                    .get_mut(row)
                    .ok_or(TafError::RowOutOfRange { line, row, rows: rows_len })?;
                *slot = coordinates;
            }
            CoordinateOp::Delete { row } => {
                if row >= rows.len() {
                    return Err(TafError::RowOutOfRange { line, row, rows: rows.len() });
                }
                rows.remove(row);
            }
            CoordinateOp::Gap { row, length } => {
                let rows_len = rows.len();
                let slot = rows
                    .get_mut(row)
                    .ok_or(TafError::RowOutOfRange { line, row, rows: rows_len })?;
                slot.position = advance_position(slot.position, length, line)?;
            }
        }
    }
    Ok(())
}
