//! Ultra-conserved element scan.
//!
//! A single forward pass over alignment blocks. For every non-gap reference
//! column the column depth is computed and fed to a [`RunTracker`], which
//! keeps at most one open interval and closes it when the next column is
//! not adjacent, lies on another contig, or falls below the depth threshold.
//! Closed intervals long enough are handed to an [`IntervalSink`] as soon as
//! they are found.

use std::collections::HashSet;
use std::io::{self, Write};

use log::{debug, info};
use thiserror::Error;

use crate::depth::{BlockSamples, ColumnDepth, DedupSamples, DistinctSamples};
use crate::formats::{ParseError, ParseResult};
use crate::model::{AlignmentBlock, ConservedInterval, Row, DEFAULT_SEPARATOR, GAP};

/// Errors that can occur while scanning.
#[derive(Error, Debug)]
pub enum UceError {
    #[error("{name} must be a positive integer (got {value})")]
    InvalidThreshold { name: &'static str, value: u64 },

    #[error("Negative reference strand found in block {block} ({reference})")]
    MalformedAlignment { block: u64, reference: String },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Result type for scan operations.
pub type UceResult<T> = Result<T, UceError>;

/// Scan thresholds and sample handling.
#[derive(Debug, Clone)]
pub struct UceOptions {
    min_length: u64,
    min_depth: usize,
    excluded_samples: HashSet<String>,
    separator: char,
}

impl UceOptions {
    /// Creates options; both thresholds must be at least 1.
    pub fn new(min_length: u64, min_depth: usize) -> UceResult<Self> {
        if min_length == 0 {
            return Err(UceError::InvalidThreshold {
                name: "Minimum length",
                value: 0,
            });
        }
        if min_depth == 0 {
            return Err(UceError::InvalidThreshold {
                name: "Minimum depth",
                value: 0,
            });
        }
        Ok(Self {
            min_length,
            min_depth,
            excluded_samples: HashSet::new(),
            separator: DEFAULT_SEPARATOR,
        })
    }

    /// Adds samples whose matching bases void a column.
    pub fn exclude_samples<I, S>(mut self, samples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_samples
            .extend(samples.into_iter().map(Into::into));
        self
    }

    /// Sets the sample/contig separator of sequence names.
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn min_length(&self) -> u64 {
        self.min_length
    }

    pub fn min_depth(&self) -> usize {
        self.min_depth
    }

    pub fn excluded_samples(&self) -> &HashSet<String> {
        &self.excluded_samples
    }

    pub fn separator(&self) -> char {
        self.separator
    }
}

/// The currently open conserved run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub contig: String,
    pub start: u64,
    /// Offset of the last column added to the run
    pub last: u64,
    pub min_depth: usize,
}

impl RunState {
    /// Number of reference bases covered by the run.
    pub fn length(&self) -> u64 {
        self.last - self.start + 1
    }

    fn into_interval(self) -> ConservedInterval {
        ConservedInterval {
            contig: self.contig,
            start: self.start,
            end: self.last + 1,
            min_depth: self.min_depth,
        }
    }
}

/// Run-length state machine over evaluated reference columns.
#[derive(Debug, Clone)]
pub struct RunTracker {
    min_length: u64,
    min_depth: usize,
    open: Option<RunState>,
}

impl RunTracker {
    pub fn new(min_length: u64, min_depth: usize) -> Self {
        Self {
            min_length,
            min_depth,
            open: None,
        }
    }

    /// Returns the open run, if any.
    pub fn open_run(&self) -> Option<&RunState> {
        self.open.as_ref()
    }

    /// Feeds one evaluated column. Returns the interval closed by this
    /// column, if it was long enough to report.
    pub fn observe(&mut self, contig: &str, offset: u64, depth: usize) -> Option<ConservedInterval> {
        if depth >= self.min_depth {
            if let Some(run) = self.open.as_mut() {
                if run.contig == contig && run.last.checked_add(1) == Some(offset) {
                    run.last = offset;
                    run.min_depth = run.min_depth.min(depth);
                    return None;
                }
            }
        }

        let closed = self.open.take().and_then(|run| self.qualify(run));
        if depth >= self.min_depth {
            self.open = Some(RunState {
                contig: contig.to_string(),
                start: offset,
                last: offset,
                min_depth: depth,
            });
        }
        closed
    }

    /// Closes the open run at end of input.
    pub fn finish(&mut self) -> Option<ConservedInterval> {
        self.open.take().and_then(|run| self.qualify(run))
    }

    fn qualify(&self, run: RunState) -> Option<ConservedInterval> {
        (run.length() >= self.min_length).then(|| run.into_interval())
    }
}

/// Destination of reported intervals.
pub trait IntervalSink {
    fn emit(&mut self, interval: ConservedInterval) -> io::Result<()>;
}

impl IntervalSink for Vec<ConservedInterval> {
    fn emit(&mut self, interval: ConservedInterval) -> io::Result<()> {
        self.push(interval);
        Ok(())
    }
}

/// Writes intervals as `contig\tstart\tend\tdepth` lines, flushing each one.
pub struct IntervalWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> IntervalWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Number of records written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> IntervalSink for IntervalWriter<W> {
    fn emit(&mut self, interval: ConservedInterval) -> io::Result<()> {
        writeln!(self.inner, "{}", interval)?;
        self.inner.flush()?;
        self.written += 1;
        Ok(())
    }
}

/// Counters collected during a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub blocks: u64,
    pub skipped_blocks: u64,
    pub columns: u64,
    pub intervals: u64,
}

/// Push-style scanner; feed blocks in stream order, then call `finish`.
pub struct UceScanner<'o> {
    options: &'o UceOptions,
    tracker: RunTracker,
    previous_reference: Option<String>,
    summary: ScanSummary,
}

impl<'o> UceScanner<'o> {
    pub fn new(options: &'o UceOptions) -> Self {
        Self {
            options,
            tracker: RunTracker::new(options.min_length(), options.min_depth()),
            previous_reference: None,
            summary: ScanSummary::default(),
        }
    }

    /// Scans one block, emitting any interval it closes.
    ///
    /// A reference row on the reverse strand aborts the scan with
    /// [`UceError::MalformedAlignment`], even in a block that would be
    /// skipped.
    pub fn scan_block<S>(&mut self, block: &AlignmentBlock, sink: &mut S) -> UceResult<()>
    where
        S: IntervalSink + ?Sized,
    {
        self.summary.blocks += 1;
        let Some(reference) = block.reference() else {
            debug!("Block {}: no rows, skipped", self.summary.blocks);
            self.summary.skipped_blocks += 1;
            self.previous_reference = None;
            return Ok(());
        };

        let skip = if block.row_count() < self.options.min_depth() {
            debug!(
                "Block {}: {} rows below minimum depth, skipped",
                self.summary.blocks,
                block.row_count()
            );
            true
        } else if let Some(previous) = self
            .previous_reference
            .as_deref()
            .filter(|&previous| previous != reference.sequence_name)
        {
            debug!(
                "Block {}: reference changed from {} to {}, skipped",
                self.summary.blocks, previous, reference.sequence_name
            );
            true
        } else {
            false
        };

        if !reference.strand.is_forward() {
            return Err(UceError::MalformedAlignment {
                block: self.summary.blocks,
                reference: reference.sequence_name.clone(),
            });
        }

        if skip {
            self.summary.skipped_blocks += 1;
        } else {
            let options = self.options;
            let samples = BlockSamples::new(block, options.separator());
            if samples.is_distinct() && options.excluded_samples().is_empty() {
                self.scan_columns(reference, DistinctSamples::new(block), sink)?;
            } else {
                let depth = DedupSamples::new(block, samples, options.excluded_samples());
                self.scan_columns(reference, depth, sink)?;
            }
        }

        self.previous_reference = Some(reference.sequence_name.clone());
        Ok(())
    }

    fn scan_columns<D, S>(&mut self, reference: &Row, mut depth: D, sink: &mut S) -> UceResult<()>
    where
        D: ColumnDepth,
        S: IntervalSink + ?Sized,
    {
        let mut offset = reference.start;
        for (column, &base) in reference.bases.iter().enumerate() {
            if base == GAP {
                continue;
            }
            let column_depth = depth.column_depth(column);
            self.summary.columns += 1;
            if let Some(interval) = self.tracker.observe(&reference.sequence_name, offset, column_depth) {
                sink.emit(interval)?;
                self.summary.intervals += 1;
            }
            offset += 1;
        }
        Ok(())
    }

    /// Emits the run still open at end of input and returns the counters.
    pub fn finish<S>(mut self, sink: &mut S) -> UceResult<ScanSummary>
    where
        S: IntervalSink + ?Sized,
    {
        if let Some(interval) = self.tracker.finish() {
            sink.emit(interval)?;
            self.summary.intervals += 1;
        }
        info!(
            "Scanned {} blocks ({} skipped), {} reference columns, {} conserved intervals",
            self.summary.blocks,
            self.summary.skipped_blocks,
            self.summary.columns,
            self.summary.intervals
        );
        Ok(self.summary)
    }
}

/// Scans a block stream and emits every conserved interval to `sink`.
///
/// Intervals already emitted stay emitted when a later block fails.
pub fn compute_uces<I, S>(blocks: I, sink: &mut S, options: &UceOptions) -> UceResult<ScanSummary>
where
    I: IntoIterator<Item = ParseResult<AlignmentBlock>>,
    S: IntervalSink + ?Sized,
{
    let mut scanner = UceScanner::new(options);
    for block in blocks {
        let block = block?;
        scanner.scan_block(&block, sink)?;
    }
    scanner.finish(sink)
}
