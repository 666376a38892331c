//! MAF (multiple alignment format) reader.
//!
//! ## MAF Format
//!
//! ```text
//! ##maf version=1 scoring=none
//! a score=0
//! s hg38.chr1  100 5 + 5000 AC-GTA
//! s mm10.chr2   20 6 + 4000 ACTGTA
//!
//! a score=0
//! ...
//! ```
//!
//! The header line is optional. `i`, `e` and `q` lines are skipped. A blank
//! line or the next `a` line ends a block.

use std::io::{self, BufRead};

use thiserror::Error;

use super::LineReader;
use crate::model::{AlignmentBlock, Row, Strand};

/// Errors that can occur during MAF parsing.
#[derive(Error, Debug)]
pub enum MafError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] io::Error),

    #[error("Line {line}: expected 7 fields in 's' line, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("Line {line}: invalid {field} '{value}'")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("Line {line}: size {size} does not match {found} aligned bases")]
    SizeMismatch { line: usize, size: u64, found: u64 },

    #[error("Line {line}: row has {found} columns, block has {expected}")]
    ColumnCountMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {0}: sequence line outside of an alignment block")]
    RowOutsideBlock(usize),
}

/// Result type for MAF operations.
pub type MafResult<T> = Result<T, MafError>;

/// Streaming MAF reader yielding one [`AlignmentBlock`] per `a` paragraph.
pub struct MafReader<R> {
    lines: LineReader<R>,
    tags: Vec<(String, String)>,
    finished: bool,
}

impl<R: BufRead> MafReader<R> {
    /// Creates a reader from a raw `BufRead`, reading the header if present.
    pub fn from_reader(reader: R) -> MafResult<Self> {
        Self::new(LineReader::new(reader))
    }

    pub(crate) fn new(mut lines: LineReader<R>) -> MafResult<Self> {
        let mut tags = Vec::new();
        if lines.advance()? {
            match lines.line().trim_start().strip_prefix("##maf") {
                Some(rest) => {
                    tags = rest
                        .split_whitespace()
                        .filter_map(|tag| tag.split_once('='))
                        .map(|(key, value)| (key.to_string(), value.to_string()))
                        .collect();
                }
                None => lines.hold(),
            }
        }
        Ok(Self {
            lines,
            tags,
            finished: false,
        })
    }

    /// Returns the header tags in file order.
    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    fn read_block(&mut self) -> MafResult<Option<AlignmentBlock>> {
        let mut rows: Vec<Row> = Vec::new();
        let mut in_block = false;

        while self.lines.advance()? {
            let line_number = self.lines.line_number();
            let line = self.lines.line().trim();

            if !in_block {
                match line.split_whitespace().next() {
                    Some("a") => in_block = true,
                    Some("s") => return Err(MafError::RowOutsideBlock(line_number)),
                    _ => {}
                }
                continue;
            }

            match line.split_whitespace().next() {
                None => break,
                Some("a") => {
                    self.lines.hold();
                    break;
                }
                Some("s") => {
                    let row = parse_row(line, line_number)?;
                    if let Some(first) = rows.first() {
                        if first.bases.len() != row.bases.len() {
                            return Err(MafError::ColumnCountMismatch {
                                line: line_number,
                                expected: first.bases.len(),
                                found: row.bases.len(),
                            });
                        }
                    }
                    rows.push(row);
                }
                // i, e, q and comment lines carry nothing the scan needs
                Some(_) => {}
            }
        }

        if !in_block {
            return Ok(None);
        }
        Ok(Some(AlignmentBlock::new(rows)))
    }
}

impl<R: BufRead> Iterator for MafReader<R> {
    type Item = MafResult<AlignmentBlock>;

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

/// Parses an `s src start size strand srcSize text` line.
fn parse_row(line: &str, line_number: usize) -> MafResult<Row> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 7 {
        return Err(MafError::FieldCount {
            line: line_number,
            found: fields.len(),
        });
    }

    let invalid = |field: &'static str, value: &str| MafError::InvalidField {
        line: line_number,
        field,
        value: value.to_string(),
    };
    let start: u64 = fields[2].parse().map_err(|_| invalid("start", fields[2]))?;
    let size: u64 = fields[3].parse().map_err(|_| invalid("size", fields[3]))?;
    let strand = Strand::from_symbol(fields[4]).ok_or_else(|| invalid("strand", fields[4]))?;
    let sequence_length: u64 = fields[5].parse().map_err(|_| invalid("source size", fields[5]))?;

    let row = Row::new(fields[1], strand, start, sequence_length, fields[6].as_bytes());
    if row.length != size {
        return Err(MafError::SizeMismatch {
            line: line_number,
            size,
            found: row.length,
        });
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(content: &str) -> MafResult<Vec<AlignmentBlock>> {
        MafReader::from_reader(content.as_bytes())?.collect()
    }

    #[test]
    fn test_parse_blocks() {
        let content = "##maf version=1 scoring=none
# a comment
a score=0
s hg38.chr1  100 5 + 5000 AC-GTA
s mm10.chr2   20 6 - 4000 ACTGTA
i mm10.chr2   C 0 C 0

a score=1
s hg38.chr1  105 2 + 5000 TT
";
        let reader = MafReader::from_reader(content.as_bytes()).unwrap();
        assert_eq!(reader.tags()[0], ("version".to_string(), "1".to_string()));
        let blocks: Vec<_> = reader.collect::<MafResult<_>>().unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].row_count(), 2);
        assert_eq!(blocks[0].rows[0].sequence_name, "hg38.chr1");
        assert_eq!(blocks[0].rows[0].start, 100);
        assert_eq!(blocks[0].rows[0].length, 5);
        assert_eq!(blocks[0].rows[0].bases, b"AC-GTA");
        assert_eq!(blocks[0].rows[1].strand, Strand::Reverse);
        assert_eq!(blocks[1].rows[0].start, 105);
    }

    #[test]
    fn test_blocks_without_blank_separator() {
        let content = "a\ns r.c 0 2 + 10 AC\na\ns r.c 2 2 + 10 GT\n";
        let blocks = read_all(content).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].rows[0].bases, b"GT");
    }

    #[test]
    fn test_size_mismatch() {
        let content = "a\ns r.c 0 3 + 10 AC\n";
        assert!(matches!(
            read_all(content),
            Err(MafError::SizeMismatch { line: 2, size: 3, found: 2 })
        ));
    }

    #[test]
    fn test_column_count_mismatch() {
        let content = "a\ns r.c 0 2 + 10 AC\ns q.c 0 3 + 10 ACG\n";
        assert!(matches!(
            read_all(content),
            Err(MafError::ColumnCountMismatch { line: 3, expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_invalid_fields() {
        assert!(matches!(
            read_all("a\ns r.c 0 2 + AC\n"),
            Err(MafError::FieldCount { found: 6, .. })
        ));
        assert!(matches!(
            read_all("a\ns r.c 0 2 * 10 AC\n"),
            Err(MafError::InvalidField { field: "strand", .. })
        ));
        assert!(matches!(
            read_all("s r.c 0 2 + 10 AC\n"),
            Err(MafError::RowOutsideBlock(1))
        ));
    }
}
