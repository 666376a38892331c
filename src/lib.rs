//! # uce-scan - Ultra-Conserved Element Finder
//!
//! Finds maximal reference intervals where every column is conserved in at
//! least a given number of samples, reading a TAF or MAF alignment in a
//! single streaming pass.
//!
//! ## Architecture
//!
//! - `model`: Rows, alignment blocks, sample/contig names, conserved intervals
//! - `formats`: Streaming TAF and MAF readers with format detection
//! - `depth`: Per-column conservation depth strategies
//! - `uce`: Run tracking, interval emission and the scan driver
//!
//! ## Example
//!
//! ```no_run
//! use uce_scan::formats::open_alignment;
//! use uce_scan::uce::{compute_uces, IntervalWriter, UceOptions};
//!
//! let options = UceOptions::new(50, 3).unwrap();
//! let blocks = open_alignment(Some("alignment.taf"), None).unwrap();
//! let mut out = IntervalWriter::new(std::io::stdout().lock());
//! compute_uces(blocks, &mut out, &options).unwrap();
//! ```

pub mod depth;
pub mod formats;
pub mod model;
pub mod uce;
