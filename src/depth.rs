//! Per-column conservation depth.
//!
//! The depth of a column is the number of samples, other than the
//! reference's own sample, whose base matches the reference base. Two
//! strategies implement [`ColumnDepth`]; the scanner picks one per block:
//! - [`DistinctSamples`] when every row of the block belongs to a different
//!   sample and nothing is excluded, so each matching row counts once
//! - [`DedupSamples`] otherwise, counting each sample once per column and
//!   voiding the column when an excluded sample matches

use std::collections::HashSet;

use crate::model::{AlignmentBlock, GAP};

/// Case-insensitive base comparison; a gap never matches.
pub fn bases_match(reference: u8, base: u8) -> bool {
    reference != GAP && base != GAP && reference.eq_ignore_ascii_case(&base)
}

/// Computes the depth of one column of a block.
pub trait ColumnDepth {
    fn column_depth(&mut self, column: usize) -> usize;
}

/// Sample identifiers of every row of a block, reference first.
#[derive(Debug, Clone)]
pub struct BlockSamples<'a> {
    samples: Vec<&'a str>,
    distinct: bool,
}

impl<'a> BlockSamples<'a> {
    pub fn new(block: &'a AlignmentBlock, separator: char) -> Self {
        let samples: Vec<&str> = block
            .rows
            .iter()
            .map(|row| row.sample_contig(separator).sample)
            .collect();
        let unique: HashSet<&str> = samples.iter().copied().collect();
        let distinct = unique.len() == samples.len();
        Self { samples, distinct }
    }

    /// True when no two rows share a sample.
    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Sample of the reference row.
    pub fn reference(&self) -> Option<&'a str> {
        self.samples.first().copied()
    }

    pub fn get(&self, row: usize) -> Option<&'a str> {
        self.samples.get(row).copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Counts matching rows; valid only when each row is a different sample.
pub struct DistinctSamples<'a> {
    block: &'a AlignmentBlock,
}

impl<'a> DistinctSamples<'a> {
    pub fn new(block: &'a AlignmentBlock) -> Self {
        Self { block }
    }
}

impl ColumnDepth for DistinctSamples<'_> {
    fn column_depth(&mut self, column: usize) -> usize {
        let Some(reference) = self.block.reference().and_then(|row| row.base(column)) else {
            return 0;
        };
        self.block
            .samples()
            .iter()
            .filter(|row| row.base(column).is_some_and(|base| bases_match(reference, base)))
            .count()
    }
}

/// Counts each matching sample once; an excluded match voids the column.
pub struct DedupSamples<'a> {
    block: &'a AlignmentBlock,
    samples: BlockSamples<'a>,
    excluded: &'a HashSet<String>,
    counted: HashSet<&'a str>,
}

impl<'a> DedupSamples<'a> {
    pub fn new(
        block: &'a AlignmentBlock,
        samples: BlockSamples<'a>,
        excluded: &'a HashSet<String>,
    ) -> Self {
        let counted = HashSet::with_capacity(samples.len());
        Self {
            block,
            samples,
            excluded,
            counted,
        }
    }
}

impl ColumnDepth for DedupSamples<'_> {
    fn column_depth(&mut self, column: usize) -> usize {
        let block = self.block;
        let Some(reference) = block.reference().and_then(|row| row.base(column)) else {
            return 0;
        };

        // The reference's own sample never counts toward depth
        self.counted.clear();
        if let Some(sample) = self.samples.reference() {
            self.counted.insert(sample);
        }

        let mut depth = 0;
        for (index, row) in block.rows.iter().enumerate().skip(1) {
            if !row.base(column).is_some_and(|base| bases_match(reference, base)) {
                continue;
            }
            let Some(sample) = self.samples.get(index) else {
                continue;
            };
            if self.excluded.contains(sample) {
                return 0;
            }
            if self.counted.insert(sample) {
                depth += 1;
            }
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Row, Strand};

    fn block(rows: &[(&str, &str)]) -> AlignmentBlock {
        AlignmentBlock::new(
            rows.iter()
                .map(|(name, bases)| Row::new(*name, Strand::Forward, 0, 100, *bases))
                .collect(),
        )
    }

    fn no_exclusions() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_bases_match() {
        assert!(bases_match(b'A', b'A'));
        assert!(bases_match(b'a', b'A'));
        assert!(bases_match(b'N', b'n'));
        assert!(!bases_match(b'A', b'C'));
        assert!(!bases_match(b'A', GAP));
        assert!(!bases_match(GAP, GAP));
    }

    #[test]
    fn test_distinct_samples_counts_matches() {
        let b = block(&[
            ("ref.chr1", "ACGT"),
            ("s1.chr1", "ACGA"),
            ("s2.chr1", "a-GT"),
            ("s3.chr1", "TCGT"),
        ]);
        let mut depth = DistinctSamples::new(&b);
        assert_eq!(depth.column_depth(0), 2);
        assert_eq!(depth.column_depth(1), 2);
        assert_eq!(depth.column_depth(2), 3);
        assert_eq!(depth.column_depth(3), 2);
        assert_eq!(depth.column_depth(4), 0);
    }

    #[test]
    fn test_block_samples_detects_duplicates() {
        let b = block(&[("ref.chr1", "A"), ("s1.chr1", "A"), ("s2.chr1", "A")]);
        assert!(BlockSamples::new(&b, '.').is_distinct());

        let b = block(&[("ref.chr1", "A"), ("s1.chr1", "A"), ("s1.chr7", "A")]);
        assert!(!BlockSamples::new(&b, '.').is_distinct());

        // A paralog of the reference's own sample is a duplicate too
        let b = block(&[("ref.chr1", "A"), ("ref.chr2", "A")]);
        assert!(!BlockSamples::new(&b, '.').is_distinct());

        // Names without separator all resolve to the same sample
        let b = block(&[("chr1", "A"), ("chr2", "A")]);
        let samples = BlockSamples::new(&b, '.');
        assert!(!samples.is_distinct());
        assert_eq!(samples.reference(), Some(crate::model::NULL_SAMPLE));
    }

    #[test]
    fn test_duplicate_sample_counts_once() {
        let b = block(&[
            ("ref.chr1", "AC"),
            ("s1.chr1", "AC"),
            ("s1.chr9", "AC"),
            ("s2.chr1", "AG"),
        ]);
        let excluded = no_exclusions();
        let mut depth = DedupSamples::new(&b, BlockSamples::new(&b, '.'), &excluded);
        assert_eq!(depth.column_depth(0), 2);
        assert_eq!(depth.column_depth(1), 1);
    }

    #[test]
    fn test_reference_paralog_not_counted() {
        let b = block(&[("ref.chr1", "A"), ("ref.chr2", "A"), ("s1.chr1", "A")]);
        let excluded = no_exclusions();
        let mut depth = DedupSamples::new(&b, BlockSamples::new(&b, '.'), &excluded);
        assert_eq!(depth.column_depth(0), 1);
    }

    #[test]
    fn test_excluded_match_voids_column() {
        let b = block(&[
            ("ref.chr1", "AC"),
            ("s1.chr1", "AC"),
            ("s2.chr1", "AC"),
            ("s3.chr1", "AG"),
        ]);
        let excluded: HashSet<String> = ["s3".to_string()].into_iter().collect();
        let mut depth = DedupSamples::new(&b, BlockSamples::new(&b, '.'), &excluded);
        // s3 matches: depth drops to zero, not to 2
        assert_eq!(depth.column_depth(0), 0);
        // s3 does not match: its exclusion has no effect
        assert_eq!(depth.column_depth(1), 2);
    }

    #[test]
    fn test_excluded_match_after_counted_rows() {
        let b = block(&[
            ("ref.chr1", "A"),
            ("s1.chr1", "A"),
            ("s2.chr1", "A"),
            ("s3.chr1", "A"),
        ]);
        let excluded: HashSet<String> = ["s3".to_string()].into_iter().collect();
        let mut depth = DedupSamples::new(&b, BlockSamples::new(&b, '.'), &excluded);
        assert_eq!(depth.column_depth(0), 0);
    }

    #[test]
    fn test_strategies_agree_without_duplicates() {
        let b = block(&[
            ("ref.chr1", "ACGTNacgt-A"),
            ("s1.chr1", "ACGTNACGTAA"),
            ("s2.chr1", "A-GTnAcGTA-"),
            ("s3.chr1", "TCCTNAC-TAA"),
            ("s4.chr1", "------ACGTA"),
        ]);
        let samples = BlockSamples::new(&b, '.');
        assert!(samples.is_distinct());

        let excluded = no_exclusions();
        let mut fast = DistinctSamples::new(&b);
        let mut general = DedupSamples::new(&b, samples, &excluded);
        for column in 0..b.column_count() {
            assert_eq!(
                fast.column_depth(column),
                general.column_depth(column),
                "column {}",
                column
            );
        }
    }
}
