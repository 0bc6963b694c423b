//! Readers and assertions over command outputs.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use fgoxide::io::DelimFile;
use utgcns_lib::metrics::{TigMetrics, TigStatus};

/// `(name, sequence, qualities)` of every FASTQ record in `path`.
pub fn read_fastq(path: &Path) -> Vec<(String, Vec<u8>, Vec<u8>)> {
    let text = fs::read_to_string(path).expect("Failed to read FASTQ");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len() % 4, 0, "truncated FASTQ");
    lines
        .chunks(4)
        .map(|rec| {
            assert!(rec[0].starts_with('@') && rec[2] == "+");
            (rec[0][1..].to_string(), rec[1].as_bytes().to_vec(), rec[3].as_bytes().to_vec())
        })
        .collect()
}

pub fn read_metrics(path: &Path) -> Vec<TigMetrics> {
    DelimFile::default().read_tsv(&path).expect("Failed to read metrics")
}

/// Asserts the status of each tig in the metrics, in order.
pub fn assert_statuses(metrics: &[TigMetrics], expected: &[(u32, TigStatus)]) {
    let actual: Vec<(u32, TigStatus)> = metrics.iter().map(|m| (m.tig_id, m.status)).collect();
    assert_eq!(actual, expected);
}
