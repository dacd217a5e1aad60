#![allow(clippy::missing_panics_doc)]
use std::sync::atomic::AtomicBool;

use context_error::FullErrorContent;
use mzsynopsis::{
    prelude::*,
    processing::{ABORT_MARKER, ProgressReporter},
};

fn inspect_line(
    scan: u32,
    annotation: &str,
    charge: u8,
    total_prm: f64,
    p_value: f64,
    precursor_mz: f64,
) -> String {
    format!(
        "QC.mzXML\t{scan}\t{annotation}\tSO_0001\t{charge}\t0.5\t8\t{total_prm}\t0.2\t0.5\t0.5\t0.3\t2\t{p_value}\t0.8\t0.0\t0.0\t1\t100\t200\t{precursor_mz}\t0.01\n"
    )
}

fn inspect_file() -> String {
    [
        inspect_line(100, "K.PEPTIDER.A", 2, 60.0, 0.5, 479.2405),
        inspect_line(100, "K.PEPTLDER.A", 2, 60.0, 0.5, 479.2405),
        inspect_line(100, "K.AAAAK.A", 2, 10.0, 0.5, 230.1),
        inspect_line(100, "K.PEPTIDER.A", 3, 20.0, 0.05, 319.4946),
        "QC.mzXML\t101\tK.BROKEN.R\n".to_string(),
        inspect_line(101, "R.GGGGGR.L", 2, 70.0, 0.5, 260.6),
        inspect_line(101, "R.GGGGGK.L", 2, 5.0, 0.9, 246.6),
    ]
    .concat()
}

const MSGFPLUS_HEADER: &str = "#SpecFile\tSpecID\tScanNum\tFragMethod\tPrecursor\tIsotopeError\tPrecursorError(ppm)\tCharge\tPeptide\tProtein\tDeNovoScore\tMSGFScore\tSpecEValue\tEValue\n";

fn msgfplus_line(scan: u32, peptide: &str, spec_e_value: &str) -> String {
    format!(
        "QC.mzML\tscan={scan}\t{scan}\tCID\t347.1763\t0\t-1.2\t2\t{peptide}\tSO_0001\t54\t38\t{spec_e_value}\t3.4E-6\n"
    )
}

/// Run the file and return the summary and the written rows as maps from column to value
fn run(
    options: &ProcessingOptions,
    abort: bool,
) -> (ProcessingSummary, Vec<Vec<(String, String)>>, Vec<u8>) {
    run_input(&inspect_file(), SearchTool::Inspect, options, abort)
}

fn run_input(
    input: &str,
    tool: SearchTool,
    options: &ProcessingOptions,
    abort: bool,
) -> (ProcessingSummary, Vec<Vec<(String, String)>>, Vec<u8>) {
    let mut registry = ModificationRegistry::default();
    let mut seen = Vec::new();
    let mut progress = ProgressReporter::new(|p| seen.push(p), Some(7), 1);
    let (output, summary) = process_reader(
        input.as_bytes(),
        Vec::new(),
        tool,
        &mut registry,
        options,
        &mut progress,
        &AtomicBool::new(abort),
    )
    .unwrap();
    drop(progress);
    let text = String::from_utf8(output).unwrap();
    let mut lines = text.lines();
    let header: Vec<String> = lines
        .next()
        .unwrap()
        .split('\t')
        .map(ToString::to_string)
        .collect();
    let rows = lines
        .map(|line| {
            header
                .iter()
                .cloned()
                .zip(line.split('\t').map(ToString::to_string))
                .collect()
        })
        .collect();
    (summary, rows, seen)
}

fn field<'a>(row: &'a [(String, String)], column: &str) -> &'a str {
    &row.iter().find(|(c, _)| c == column).unwrap().1
}

#[test]
fn synopsis_file() {
    let (summary, rows, progress) = run(&ProcessingOptions::default(), false);
    assert_eq!(summary.status, ProcessingStatus::Completed);
    assert_eq!(summary.lines, 7);
    assert_eq!(summary.skipped_lines, 1);
    assert_eq!(summary.written, 4);
    assert_eq!(summary.error_log.entries(), 1);
    assert_eq!(progress.first(), Some(&0));
    assert_eq!(progress.last(), Some(&100));
    assert!(progress.windows(2).all(|w| w[0] < w[1]));

    let ids: Vec<&str> = rows.iter().map(|r| field(r, "ResultID")).collect();
    assert_eq!(ids, ["1", "2", "3", "4"]);
    let peptides: Vec<(&str, &str, &str)> = rows
        .iter()
        .map(|r| (field(r, "Scan"), field(r, "Charge"), field(r, "Peptide")))
        .collect();
    assert_eq!(
        peptides,
        [
            ("100", "2", "K.PEPTIDER.A"),
            ("100", "2", "K.PEPTLDER.A"),
            ("100", "3", "K.PEPTIDER.A"),
            ("101", "2", "R.GGGGGR.L"),
        ]
    );
    // Equal primary scores share a rank
    assert_eq!(field(&rows[0], "RankScore"), "1");
    assert_eq!(field(&rows[1], "RankScore"), "1");
    assert_eq!(field(&rows[0], "TotalPRMScore"), "60");
    assert_eq!(field(&rows[0], "PValue"), "0.5");

    // The observed precursor is the second isotope
    assert_eq!(field(&rows[0], "IsotopeError"), "1");
    assert_eq!(field(&rows[0], "MH"), "956.468352");
    assert_eq!(field(&rows[0], "PrecursorMZ"), "479.24050");
    assert_eq!(field(&rows[0], "PrecursorError"), "0.00202");
    assert_eq!(field(&rows[0], "DelM_PPM"), "2.1111");
}

#[test]
fn first_hits_file() {
    let options = ProcessingOptions {
        mode: OutputMode::FirstHits,
        ..ProcessingOptions::default()
    };
    let (summary, rows, _) = run(&options, false);
    assert_eq!(summary.written, 3);
    let best: Vec<(&str, &str, &str)> = rows
        .iter()
        .map(|r| (field(r, "Scan"), field(r, "Charge"), field(r, "TotalPRMScore")))
        .collect();
    assert_eq!(best, [("100", "2", "60"), ("100", "3", "20"), ("101", "2", "70")]);
    assert!(rows.iter().all(|r| field(r, "RankScore") == "1"));
}

#[test]
fn e_value_ranks() {
    let input = [
        MSGFPLUS_HEADER.to_string(),
        msgfplus_line(5, "K.AAMEIK.A", "1E-7"),
        msgfplus_line(5, "K.AAMELK.A", "1E-12"),
        msgfplus_line(5, "K.AGMEIK.A", "1E-9"),
    ]
    .concat();
    let (summary, rows, _) = run_input(
        &input,
        SearchTool::MSGFPlus,
        &ProcessingOptions::default(),
        false,
    );
    assert_eq!(summary.written, 3);
    let ranks: Vec<(&str, &str)> = rows
        .iter()
        .map(|r| (field(r, "Peptide"), field(r, "RankScore")))
        .collect();
    assert_eq!(ranks, [("K.AAMELK.A", "1"), ("K.AGMEIK.A", "2"), ("K.AAMEIK.A", "3")]);
}

#[test]
fn interleaved_scans_first_hits() {
    let input = [
        MSGFPLUS_HEADER.to_string(),
        msgfplus_line(5, "K.AAMEIK.A", "1E-9"),
        msgfplus_line(6, "K.AGMEIK.A", "1E-10"),
        msgfplus_line(5, "K.AAMELK.A", "1E-12"),
    ]
    .concat();
    let options = ProcessingOptions {
        mode: OutputMode::FirstHits,
        ..ProcessingOptions::default()
    };
    let (summary, rows, _) = run_input(&input, SearchTool::MSGFPlus, &options, false);
    assert_eq!(summary.written, 2);
    let best: Vec<(&str, &str)> = rows
        .iter()
        .map(|r| (field(r, "Scan"), field(r, "Peptide")))
        .collect();
    assert_eq!(best, [("5", "K.AAMELK.A"), ("6", "K.AGMEIK.A")]);
}

#[test]
fn sorted_by_score() {
    let options = ProcessingOptions {
        sort_by_score: true,
        ..ProcessingOptions::default()
    };
    let (summary, rows, _) = run(&options, false);
    assert_eq!(summary.written, 4);
    let scores: Vec<(&str, &str)> = rows
        .iter()
        .map(|r| (field(r, "ResultID"), field(r, "TotalPRMScore")))
        .collect();
    assert_eq!(scores, [("1", "70"), ("2", "60"), ("3", "60"), ("4", "20")]);
}

#[test]
fn custom_thresholds() {
    let options = ProcessingOptions {
        thresholds: Some(SynopsisThresholds::new(vec![ThresholdPredicate::at_least(
            "totalprmscore",
            65.0,
        )])),
        ..ProcessingOptions::default()
    };
    let (summary, rows, _) = run(&options, false);
    assert_eq!(summary.written, 1);
    assert_eq!(field(&rows[0], "Peptide"), "R.GGGGGR.L");
}

#[test]
fn aborted_processing() {
    let (summary, rows, progress) = run(&ProcessingOptions::default(), true);
    assert_eq!(summary.status, ProcessingStatus::Aborted);
    assert_eq!(summary.lines, 0);
    assert!(rows.is_empty());
    assert!(progress.is_empty());
    assert!(summary.error_log.text().trim_end().ends_with(ABORT_MARKER));
}

#[test]
fn missing_input_file() {
    let mut registry = ModificationRegistry::default();
    let output = std::env::temp_dir().join("mzsynopsis_missing_input_syn.txt");
    let error = process_file(
        "this/file/does/not/exist_inspect.txt",
        &output,
        Some(SearchTool::Inspect),
        &mut registry,
        &ProcessingOptions::default(),
        |_| (),
        &AtomicBool::new(false),
    )
    .unwrap_err();
    assert_eq!(&error.get_kind(), &SynopsisError::InputFileNotFound);
    assert!(!output.exists());
}

#[test]
fn file_round_trip_with_detection() {
    let directory = std::env::temp_dir().join("mzsynopsis_processing_test");
    std::fs::create_dir_all(&directory).unwrap();
    let input = directory.join("Sample_inspect.txt");
    std::fs::write(&input, inspect_file()).unwrap();
    let output = mzsynopsis::processing::output_path(&input, &directory, OutputMode::Synopsis);
    let mut registry = ModificationRegistry::default();
    let summary = process_file(
        &input,
        &output,
        None,
        &mut registry,
        &ProcessingOptions::default(),
        |_| (),
        &AtomicBool::new(false),
    )
    .unwrap();
    assert_eq!(summary.tool, Some(SearchTool::Inspect));
    assert_eq!(summary.written, 4);
    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written.lines().count(), 5);
    assert!(written.starts_with("ResultID\tScan\tPeptide\tProtein\tCharge\tMQScore"));
}
