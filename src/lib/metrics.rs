//! Per-tig metrics and the batch summary.
//!
//! One [`TigMetrics`] row is produced for every tig the `consensus` command looks at, whether or
//! not consensus was computed for it. Rows are written as TSV with [`write_metrics`].

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use fgoxide::io::DelimFile;
use serde::{Deserialize, Serialize};

use crate::tig::Tig;
use crate::unitig_consensus::TigConsensusReport;

/// A metric type that can be serialized to TSV files.
pub trait Metric: Serialize + for<'de> Deserialize<'de> + Clone + Default {
    /// Human-readable name used in error messages.
    fn metric_name() -> &'static str;
}

/// What happened to one tig.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TigStatus {
    /// Consensus computed.
    #[default]
    Consensus,
    /// A precondition failed; the tig is unchanged.
    Failed,
    /// Layout longer than `--max-length`.
    SkippedLength,
    /// A child read is not in the read store.
    SkippedMissingReads,
    /// No children.
    SkippedNoChildren,
    /// Already has consensus and `--force` was not given.
    SkippedHasConsensus,
}

impl TigStatus {
    #[must_use]
    pub fn is_skipped(self) -> bool {
        !matches!(self, TigStatus::Consensus | TigStatus::Failed)
    }
}

impl fmt::Display for TigStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TigStatus::Consensus => "consensus",
            TigStatus::Failed => "failed",
            TigStatus::SkippedLength => "skipped-length",
            TigStatus::SkippedMissingReads => "skipped-missing-reads",
            TigStatus::SkippedNoChildren => "skipped-no-children",
            TigStatus::SkippedHasConsensus => "skipped-has-consensus",
        };
        f.write_str(label)
    }
}

/// One row of the per-tig metrics file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TigMetrics {
    pub tig_id: u32,
    pub status: TigStatus,
    /// Children in the input layout.
    pub children: usize,
    /// Reads placed into the consensus.
    pub placed: usize,
    /// Reads that could not be placed.
    pub failed_reads: usize,
    /// Contained reads left out for coverage.
    pub stashed: usize,
    pub gapped_length: usize,
    pub ungapped_length: usize,
}

impl Metric for TigMetrics {
    fn metric_name() -> &'static str {
        "tig consensus"
    }
}

impl TigMetrics {
    /// A row for a tig that was not processed.
    #[must_use]
    pub fn skipped(tig: &Tig, status: TigStatus) -> Self {
        Self {
            tig_id: tig.ident,
            status,
            children: tig.num_children(),
            gapped_length: tig.gapped_length(),
            ungapped_length: tig.ungapped_length(),
            ..Self::default()
        }
    }

    /// A row for a tig whose consensus was computed; `tig` is the updated tig.
    #[must_use]
    pub fn from_report(tig: &Tig, report: &TigConsensusReport, stashed: usize) -> Self {
        Self {
            tig_id: tig.ident,
            status: TigStatus::Consensus,
            children: report.children + stashed,
            placed: report.num_placed(),
            failed_reads: report.num_failed(),
            stashed,
            gapped_length: tig.gapped_length(),
            ungapped_length: tig.ungapped_length(),
        }
    }
}

/// Totals over a batch of tigs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub tigs: u64,
    pub consensus: u64,
    pub failed: u64,
    pub skipped: u64,
    pub placed_reads: u64,
    pub failed_reads: u64,
    pub stashed_reads: u64,
    pub ungapped_bases: u64,
}

impl BatchSummary {
    pub fn add(&mut self, metrics: &TigMetrics) {
        self.tigs += 1;
        match metrics.status {
            TigStatus::Consensus => self.consensus += 1,
            TigStatus::Failed => self.failed += 1,
            _ => self.skipped += 1,
        }
        self.placed_reads += metrics.placed as u64;
        self.failed_reads += metrics.failed_reads as u64;
        self.stashed_reads += metrics.stashed as u64;
        if metrics.status == TigStatus::Consensus {
            self.ungapped_bases += metrics.ungapped_length as u64;
        }
    }
}

impl<'a> FromIterator<&'a TigMetrics> for BatchSummary {
    fn from_iter<I: IntoIterator<Item = &'a TigMetrics>>(iter: I) -> Self {
        let mut summary = Self::default();
        for metrics in iter {
            summary.add(metrics);
        }
        summary
    }
}

/// Writes metrics to a TSV file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_metrics<P: AsRef<Path>, T: Metric>(path: P, metrics: &[T]) -> Result<()> {
    let path = path.as_ref();
    DelimFile::default()
        .write_tsv(&path, metrics)
        .with_context(|| {
            format!("Failed to write {} metrics: {}", T::metric_name(), path.display())
        })
}
