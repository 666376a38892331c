//! Data model for alignment blocks and conserved intervals.
//!
//! This module contains the data structures shared by the readers and the
//! scanner:
//! - Rows and blocks of a multiple-sequence alignment
//! - Sample/contig resolution of sequence identifiers
//! - The conserved intervals reported by a scan

use std::fmt;

/// Gap symbol used in aligned base columns.
pub const GAP: u8 = b'-';

/// Default separator between the sample and contig parts of a sequence name.
pub const DEFAULT_SEPARATOR: char = '.';

/// Sample reported for sequence names that carry no separator.
pub const NULL_SAMPLE: &str = "NULL";

/// Strand of an aligned row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    /// Parses a `+` / `-` strand token.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Strand::Forward),
            "-" => Some(Strand::Reverse),
            _ => None,
        }
    }

    pub fn is_forward(self) -> bool {
        self == Strand::Forward
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// One row of an alignment block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Full sequence identifier, e.g. `hg38.chr1`
    pub sequence_name: String,
    pub strand: Strand,
    /// Coordinate of the first non-gap base of the row in this block
    pub start: u64,
    /// Number of non-gap bases the row contributes to the block
    pub length: u64,
    /// Total length of the source sequence
    pub sequence_length: u64,
    /// One byte per alignment column
    pub bases: Vec<u8>,
}

impl Row {
    /// Creates a row, deriving its length from the non-gap bases.
    pub fn new(
        sequence_name: impl Into<String>,
        strand: Strand,
        start: u64,
        sequence_length: u64,
        bases: impl Into<Vec<u8>>,
    ) -> Self {
        let bases = bases.into();
        let length = bases.iter().filter(|&&b| b != GAP).count() as u64;
        Self {
            sequence_name: sequence_name.into(),
            strand,
            start,
            length,
            sequence_length,
            bases,
        }
    }

    /// Returns the base at a column, if the row reaches it.
    pub fn base(&self, column: usize) -> Option<u8> {
        self.bases.get(column).copied()
    }

    /// Resolves the sample and contig this row belongs to.
    pub fn sample_contig(&self, separator: char) -> SampleContig<'_> {
        parse_sample_contig(&self.sequence_name, separator)
    }
}

/// A set of rows sharing one column span.
///
/// The first row is the reference row; all following rows are aligned
/// sample rows in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentBlock {
    pub rows: Vec<Row>,
}

impl AlignmentBlock {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Returns the reference row, or `None` for an empty block.
    pub fn reference(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Returns the non-reference rows.
    pub fn samples(&self) -> &[Row] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns, taken from the reference row.
    pub fn column_count(&self) -> usize {
        self.reference().map_or(0, |row| row.bases.len())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Sample and contig parts of a sequence identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleContig<'a> {
    pub sample: &'a str,
    pub contig: &'a str,
}

/// Splits a sequence identifier at the first occurrence of `separator`.
///
/// Without a separator the sample is [`NULL_SAMPLE`] and the contig is the
/// whole identifier.
pub fn parse_sample_contig(sequence_name: &str, separator: char) -> SampleContig<'_> {
    match sequence_name.split_once(separator) {
        Some((sample, contig)) => SampleContig { sample, contig },
        None => SampleContig {
            sample: NULL_SAMPLE,
            contig: sequence_name,
        },
    }
}

/// A conserved reference interval, 0-based half-open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConservedInterval {
    pub contig: String,
    pub start: u64,
    pub end: u64,
    /// Lowest column depth observed across the interval
    pub min_depth: usize,
}

impl ConservedInterval {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Formats the interval as a tab-separated `contig start end depth` record.
impl fmt::Display for ConservedInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.contig, self.start, self.end, self.min_depth
        )
    }
}
