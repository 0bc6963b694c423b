//! End-to-end CLI tests for the consensus command.
//!
//! These tests run the `utgcns consensus` binary on simulated tigs and check the consensus
//! FASTQ, the output layouts and the per-tig metrics.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;
use utgcns_lib::layout::read_layouts;
use utgcns_lib::metrics::TigStatus;

use crate::helpers::{SimTig, assert_statuses, read_fastq, read_metrics, write_layouts, write_reads};

struct Run {
    dir: TempDir,
}

impl Run {
    fn new(tigs: &[&SimTig]) -> Self {
        let dir = TempDir::new().unwrap();
        write_reads(&dir.path().join("reads.fq"), tigs);
        write_layouts(&dir.path().join("tigs.layout"), tigs);
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn consensus(&self, extra: &[&str]) -> Output {
        self.consensus_with(&self.path("reads.fq"), extra)
    }

    fn consensus_with(&self, reads: &Path, extra: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_utgcns"));
        cmd.arg("consensus")
            .args(["--reads", reads.to_str().unwrap()])
            .args(["--layouts", self.path("tigs.layout").to_str().unwrap()])
            .args(["--layouts-out", self.path("out.layout").to_str().unwrap()])
            .args(["--fastq-out", self.path("out.fq").to_str().unwrap()])
            .args(["--stats", self.path("stats.tsv").to_str().unwrap()])
            .args(extra);
        cmd.output().expect("Failed to run consensus command")
    }
}

fn assert_success(output: &Output) {
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "consensus failed: {stderr}");
}

#[test]
fn test_consensus_reproduces_genomes() {
    let tig1 = SimTig::tiled(1, 1, 1_000, 300, 150);
    let tig2 = SimTig::tiled(2, 100, 800, 250, 110);
    let run = Run::new(&[&tig1, &tig2]);

    assert_success(&run.consensus(&[]));

    let records = read_fastq(&run.path("out.fq"));
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].0, "tig00000001");
    assert_eq!(records[0].1, tig1.genome);
    assert_eq!(records[1].0, "tig00000002");
    assert_eq!(records[1].1, tig2.genome);
    assert_eq!(records[0].2.len(), records[0].1.len());

    let tigs = read_layouts(run.path("out.layout")).unwrap();
    assert_eq!(tigs.len(), 2);
    assert_eq!(tigs[0].ungapped_bases(), tig1.genome);
    let ids: Vec<u32> = tigs[0].children.iter().map(|c| c.ident).collect();
    assert_eq!(ids, tig1.read_ids());
    assert!(tigs[0].children.iter().skip(1).all(|c| c.anchor.is_some()));

    let metrics = read_metrics(&run.path("stats.tsv"));
    assert_statuses(&metrics, &[(1, TigStatus::Consensus), (2, TigStatus::Consensus)]);
    assert_eq!(metrics[0].placed, tig1.reads.len());
    assert_eq!(metrics[0].failed_reads, 0);
    assert_eq!(metrics[0].ungapped_length, 1_000);
}

#[test]
fn test_existing_consensus_needs_force() {
    let mut tig = SimTig::tiled(3, 1, 600, 200, 100);
    tig.consensus = Some(b"ACGT".to_vec());
    let run = Run::new(&[&tig]);

    assert_success(&run.consensus(&[]));
    assert_statuses(&read_metrics(&run.path("stats.tsv")), &[(3, TigStatus::SkippedHasConsensus)]);
    assert!(read_fastq(&run.path("out.fq")).is_empty());
    assert_eq!(read_layouts(run.path("out.layout")).unwrap()[0].bases, b"ACGT");

    assert_success(&run.consensus(&["--force"]));
    assert_statuses(&read_metrics(&run.path("stats.tsv")), &[(3, TigStatus::Consensus)]);
    assert_eq!(read_fastq(&run.path("out.fq"))[0].1, tig.genome);
}

#[test]
fn test_tig_range_selects_tigs() {
    let tigs: Vec<SimTig> = (1..=4).map(|i| SimTig::tiled(i, i * 100, 500, 200, 100)).collect();
    let refs: Vec<&SimTig> = tigs.iter().collect();
    let run = Run::new(&refs);

    assert_success(&run.consensus(&["--tig-range", "2-3"]));
    let metrics = read_metrics(&run.path("stats.tsv"));
    assert_statuses(&metrics, &[(2, TigStatus::Consensus), (3, TigStatus::Consensus)]);
    assert_eq!(read_layouts(run.path("out.layout")).unwrap().len(), 2);
}

#[test]
fn test_skipped_tigs_do_not_fail_the_run() {
    let good = SimTig::tiled(1, 1, 500, 200, 100);
    let partial = SimTig::tiled(2, 50, 500, 200, 100);
    let long = SimTig::tiled(3, 80, 3_000, 400, 200);
    let empty = SimTig::tiled(4, 200, 100, 200, 100);
    assert!(empty.reads.is_empty());

    // reads of tig 2 are left out of the read store
    let run = Run::new(&[&good, &partial, &long, &empty]);
    write_reads(&run.path("partition.fq"), &[&good, &long]);

    let output = run.consensus_with(&run.path("partition.fq"), &["--max-length", "2000"]);
    assert_success(&output);
    assert_statuses(
        &read_metrics(&run.path("stats.tsv")),
        &[
            (1, TigStatus::Consensus),
            (2, TigStatus::SkippedMissingReads),
            (3, TigStatus::SkippedLength),
            (4, TigStatus::SkippedNoChildren),
        ],
    );
    assert_eq!(read_fastq(&run.path("out.fq")).len(), 1);
}

#[test]
fn test_failed_tig_fails_the_run() {
    let good = SimTig::tiled(1, 1, 500, 200, 100);
    let mut bad = SimTig::tiled(2, 10, 500, 200, 100);
    bad.extra_children.push("unitig 77 anchor 0 hang 0 0 position 0 500".to_string());
    let run = Run::new(&[&good, &bad]);

    let output = run.consensus(&[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("1 tigs failed: 2"));

    // outputs are still written
    assert_statuses(
        &read_metrics(&run.path("stats.tsv")),
        &[(1, TigStatus::Consensus), (2, TigStatus::Failed)],
    );
    let tigs = read_layouts(run.path("out.layout")).unwrap();
    assert!(!tigs[1].has_consensus());
    assert_eq!(tigs[1].num_children(), bad.reads.len() + 1);
}

#[test]
fn test_threads_do_not_change_results() {
    let tigs: Vec<SimTig> = (1..=6).map(|i| SimTig::tiled(i, i * 100, 700, 250, 120)).collect();
    let refs: Vec<&SimTig> = tigs.iter().collect();
    let run = Run::new(&refs);

    assert_success(&run.consensus(&["--threads", "1"]));
    let single = (fs::read(run.path("out.layout")).unwrap(), fs::read(run.path("out.fq")).unwrap());
    assert_success(&run.consensus(&["--threads", "4"]));
    let multi = (fs::read(run.path("out.layout")).unwrap(), fs::read(run.path("out.fq")).unwrap());
    assert_eq!(single, multi);
}

#[test]
fn test_max_coverage_stashes_contained_reads() {
    let mut tig = SimTig::tiled(5, 1, 600, 300, 150);
    tig.add_contained(90, 20, 120);
    tig.add_contained(91, 320, 380);
    let run = Run::new(&[&tig]);

    assert_success(&run.consensus(&["--max-coverage", "1.0"]));
    let metrics = read_metrics(&run.path("stats.tsv"));
    assert_eq!(metrics[0].stashed, 2);
    assert_eq!(metrics[0].children, tig.reads.len());
    assert_eq!(read_fastq(&run.path("out.fq"))[0].1, tig.genome);

    let out = read_layouts(run.path("out.layout")).unwrap();
    let ids: Vec<u32> = out[0].children.iter().map(|c| c.ident).collect();
    assert_eq!(ids, tig.read_ids());
    let stashed = &out[0].children[ids.len() - 1];
    assert_eq!((stashed.min, stashed.max), (320, 380));
}

#[test]
fn test_missing_input_is_an_error() {
    let tig = SimTig::tiled(1, 1, 500, 200, 100);
    let run = Run::new(&[&tig]);
    let output = run.consensus_with(&run.path("nope.fq"), &[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Read store does not exist"));
}

#[test]
fn test_invalid_options_are_rejected() {
    let tig = SimTig::tiled(1, 1, 500, 200, 100);
    let run = Run::new(&[&tig]);
    for args in [&["--error-rate", "0.5"][..], &["--threads", "0"], &["--tig-range", "5-2"]] {
        assert!(!run.consensus(args).status.success(), "{args:?} should be rejected");
    }
}
