use std::io::Write;

use tempfile::NamedTempFile;

use uce_scan::formats::{open_alignment, FileFormat, ParseError};
use uce_scan::uce::{compute_uces, IntervalWriter, UceError, UceOptions};

const CONSERVED_TAF: &str = "#taf version:1 run_length_encode_bases:0
AAAA ; i 0 ref.chr1 0 + 100 i 1 S1.chr1 0 + 100 i 2 S2.chr5 40 + 100 i 3 S3.chr1 7 - 100
CCCC
GGGG
TTTT
AAAA
CCCC
GGGG
TTTT
AAAA
CCCC
";

fn write_temp(content: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn run(content: &str, suffix: &str, options: &UceOptions) -> Result<String, UceError> {
    let file = write_temp(content, suffix);
    let blocks = open_alignment(Some(file.path()), None)?;
    let mut writer = IntervalWriter::new(Vec::new());
    compute_uces(blocks, &mut writer, options)?;
    Ok(String::from_utf8(writer.into_inner()).unwrap())
}

#[test]
fn test_taf_fully_conserved() {
    let options = UceOptions::new(5, 3).unwrap();
    assert_eq!(run(CONSERVED_TAF, ".taf", &options).unwrap(), "ref.chr1\t0\t10\t3\n");
}

#[test]
fn test_taf_excluded_sample() {
    let options = UceOptions::new(5, 3).unwrap().exclude_samples(["S1"]);
    assert_eq!(run(CONSERVED_TAF, ".taf", &options).unwrap(), "");
}

#[test]
fn test_taf_gapped_reference_and_mismatch() {
    let content = "#taf version:1
AAAA ; i 0 ref.chr1 20 + 100 i 1 S1.chr1 0 + 100 i 2 S2.chr1 0 + 100 i 3 S3.chr1 0 + 100
CCCC
-AAA
GGGG
TTTT
AACA
CCCC
GGGG
";
    // The gapped column does not advance the offset; offset 24 has depth 2
    // and the run restarting at 25 is too short to report
    let options = UceOptions::new(3, 3).unwrap();
    assert_eq!(run(content, ".taf", &options).unwrap(), "ref.chr1\t20\t24\t3\n");
}

#[test]
fn test_maf_blocks_adjacent_on_reference() {
    let content = "##maf version=1
a score=0
s ref.chr1 10 5 + 100 ACGTA
s S1.chr1   0 5 + 100 ACGTA
s S2.chr2   0 5 + 100 ACGTA

a score=0
s ref.chr1 15 5 + 100 CCGTA
s S1.chr1   5 5 + 100 CCGTA
s S2.chr2   5 5 + 100 CCGTA
";
    let options = UceOptions::new(8, 2).unwrap();
    assert_eq!(run(content, ".maf", &options).unwrap(), "ref.chr1\t10\t20\t2\n");
}

#[test]
fn test_detection_by_extension_without_header() {
    let content = "a\ns ref.chr1 0 3 + 100 ACG\ns S1.chr1 0 3 + 100 ACG\n";
    let file = write_temp(content, ".maf");
    let reader = open_alignment(Some(file.path()), None).unwrap();
    assert_eq!(reader.format(), Some(FileFormat::Maf));

    let file = write_temp(content, ".txt");
    assert!(matches!(
        open_alignment(Some(file.path()), None),
        Err(ParseError::UnknownFormat)
    ));
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.taf");
    assert!(matches!(
        open_alignment(Some(&missing), Some(FileFormat::Taf)),
        Err(ParseError::IoError(_))
    ));
}

#[test]
fn test_reverse_reference_keeps_earlier_output() {
    let content = "#taf version:1
AAA ; i 0 ref.chr1 0 + 100 i 1 S1.chr1 0 + 100 i 2 S2.chr1 0 + 100
CCC
GGG
TTT ; g 0 5
AAA ; s 0 ref.chr1 20 - 100
";
    let options = UceOptions::new(3, 2).unwrap();
    let file = write_temp(content, ".taf");
    let blocks = open_alignment(Some(file.path()), None).unwrap();
    let mut writer = IntervalWriter::new(Vec::new());
    let result = compute_uces(blocks, &mut writer, &options);
    assert!(matches!(result, Err(UceError::MalformedAlignment { block: 3, .. })));
    assert_eq!(String::from_utf8(writer.into_inner()).unwrap(), "ref.chr1\t0\t3\t2\n");
}

#[test]
fn test_rerun_is_identical() {
    let options = UceOptions::new(2, 2).unwrap();
    let content = "#taf version:1
AAAa ; i 0 ref.chr1 0 + 100 i 1 S1.chr1 0 + 100 i 2 S1.chr2 0 + 100 i 3 S2.chr1 0 + 100
CCGC
GTTT
TTTT
AAAA ; g 0 3
CCCC
G-GG
";
    let first = run(content, ".taf", &options).unwrap();
    let second = run(content, ".taf", &options).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}
