//! The `consensus` command: compute consensus for every tig in a layout file.

use anyhow::{Result, bail};
use clap::Parser;
use itertools::Itertools;
use log::{debug, info, warn};
use rayon::prelude::*;

use utgcns_abacus::ReadStore;
use utgcns_lib::fastq::ConsensusFastqWriter;
use utgcns_lib::layout::{read_layouts, write_layouts};
use utgcns_lib::logging::{OperationTimer, log_batch_summary};
use utgcns_lib::metrics::{BatchSummary, TigMetrics, TigStatus, write_metrics};
use utgcns_lib::progress::ProgressTracker;
use utgcns_lib::read_store::InMemoryReadStore;
use utgcns_lib::stash::Stash;
use utgcns_lib::tig::Tig;
use utgcns_lib::unitig_consensus::{ConsensusOptions, UnitigConsensus};
use utgcns_lib::validation::validate_non_negative;

use crate::commands::command::Command;
use crate::commands::common::{
    AlignmentOptions, InputOptions, OutputOptions, ThreadingOptions, TigRange,
};

/// Computes tig consensus from a read layout.
///
/// Each tig's reads are threaded, in layout order, onto a multiple alignment that starts as the
/// first read. Reads are positioned from their layout anchor, from the placed read they overlap
/// most, or by aligning them to the whole consensus so far; a read that cannot be placed is
/// reported and left out. The multiple alignment is then refined and called with base
/// qualities.
///
/// Tigs that already have consensus are skipped unless `--force` is given, as are tigs longer
/// than `--max-length` and tigs referencing reads missing from `--reads`. The command fails if
/// any tig could not be processed.
#[derive(Parser, Debug)]
#[command(
    name = "consensus",
    about = "Compute tig consensus from a read layout",
    long_about = None
)]
pub struct Consensus {
    #[command(flatten)]
    pub input: InputOptions,

    #[command(flatten)]
    pub output: OutputOptions,

    /// Only process tigs with ids in this range (`N` or `N-M`, inclusive)
    #[arg(short = 'u', long = "tig-range")]
    pub tig_range: Option<TigRange>,

    #[command(flatten)]
    pub alignment: AlignmentOptions,

    /// Recompute tigs that already carry consensus
    #[arg(short = 'f', long = "force", default_value_t = false)]
    pub force: bool,

    /// Leave contained reads out once the kept reads reach this depth (0 keeps every read)
    #[arg(long = "max-coverage", default_value_t = 0.0)]
    pub max_coverage: f64,

    /// Skip tigs whose layout is longer than this
    #[arg(long = "max-length")]
    pub max_length: Option<u32>,

    /// Keep reads that could not be placed in the output layouts, at their input positions
    #[arg(long = "keep-failed", default_value_t = false)]
    pub keep_failed: bool,

    /// Log each tig's final multiple alignment (at debug level)
    #[arg(short = 'v', long = "show-result", default_value_t = false)]
    pub show_result: bool,

    /// Seed for breaking ties between equally supported bases
    #[arg(long = "seed", default_value_t = 0)]
    pub seed: u64,

    #[command(flatten)]
    pub threading: ThreadingOptions,
}

/// A processed tig and its metrics row.
struct TigOutcome {
    tig: Tig,
    metrics: TigMetrics,
}

impl Command for Consensus {
    fn execute(&self, _command_line: &str) -> Result<()> {
        self.validate()?;
        if !self.output.any() {
            warn!("No outputs requested; consensus will be computed and discarded");
        }

        let timer = OperationTimer::new("Loading reads", "reads");
        let store = InMemoryReadStore::from_fastq(&self.input.reads)?;
        timer.log_completion(store.len() as u64);

        let mut tigs = read_layouts(&self.input.layouts)?;
        let total = tigs.len();
        if let Some(range) = self.tig_range {
            tigs.retain(|tig| range.contains(tig.ident));
            info!("Selected {} of {} tigs in range {range}", tigs.len(), total);
        }

        let options = self.consensus_options();
        info!("{}", self.threading.log_message());
        let pool = self.threading.build_pool()?;
        let progress = ProgressTracker::new("Processed");

        let timer = OperationTimer::new("Computing consensus", "tigs");
        let outcomes: Vec<TigOutcome> = pool.install(|| {
            tigs.into_par_iter()
                .map_init(
                    || UnitigConsensus::new(&store, options.clone()),
                    |consensus, tig| {
                        let outcome = self.process_tig(consensus, &store, tig);
                        progress.record(1, outcome.metrics.ungapped_length as u64);
                        outcome
                    },
                )
                .collect()
        });
        progress.log_final();
        timer.log_completion(outcomes.len() as u64);

        let (tigs, metrics): (Vec<Tig>, Vec<TigMetrics>) =
            outcomes.into_iter().map(|o| (o.tig, o.metrics)).unzip();
        self.write_outputs(&tigs, &metrics)?;

        let summary: BatchSummary = metrics.iter().collect();
        log_batch_summary(&summary);
        if summary.failed > 0 {
            let ids = metrics
                .iter()
                .filter(|m| m.status == TigStatus::Failed)
                .map(|m| m.tig_id)
                .join(", ");
            bail!("{} tigs failed: {ids}", summary.failed);
        }
        Ok(())
    }
}

impl Consensus {
    fn validate(&self) -> Result<()> {
        self.input.validate()?;
        self.alignment.validate()?;
        self.threading.validate()?;
        validate_non_negative(self.max_coverage, "max-coverage")?;
        Ok(())
    }

    fn consensus_options(&self) -> ConsensusOptions {
        self.alignment.to_consensus_options(self.seed, self.keep_failed, self.show_result)
    }

    /// Why `tig` should not be processed, if it should not.
    fn skip_reason<S: ReadStore + ?Sized>(&self, store: &S, tig: &Tig) -> Option<TigStatus> {
        if tig.children.is_empty() {
            return Some(TigStatus::SkippedNoChildren);
        }
        if tig.has_consensus() && !self.force {
            return Some(TigStatus::SkippedHasConsensus);
        }
        if self.max_length.is_some_and(|max| tig.layout_length() > max) {
            return Some(TigStatus::SkippedLength);
        }
        if tig.children.iter().any(|c| c.is_read() && !store.contains(c.ident)) {
            return Some(TigStatus::SkippedMissingReads);
        }
        None
    }

    fn process_tig<S: ReadStore + ?Sized>(
        &self,
        consensus: &mut UnitigConsensus<'_, S>,
        store: &S,
        mut tig: Tig,
    ) -> TigOutcome {
        if let Some(status) = self.skip_reason(store, &tig) {
            match status {
                TigStatus::SkippedHasConsensus => debug!("tig {} {status}", tig.ident),
                _ => warn!("tig {} {status}", tig.ident),
            }
            let metrics = TigMetrics::skipped(&tig, status);
            return TigOutcome { tig, metrics };
        }

        let stash = Stash::contained(&mut tig, self.max_coverage);
        let num_stashed = stash.as_ref().map_or(0, Stash::num_stashed);

        match consensus.generate(&mut tig) {
            Ok(report) => {
                if let Some(stash) = stash {
                    stash.restore(&mut tig, &report, self.keep_failed);
                }
                let metrics = TigMetrics::from_report(&tig, &report, num_stashed);
                info!(
                    "tig {}: {} bases from {} of {} reads",
                    tig.ident,
                    metrics.ungapped_length,
                    metrics.placed,
                    report.children
                );
                if report.num_failed() > 0 {
                    warn!(
                        "tig {}: {} reads not placed: {:?}",
                        tig.ident,
                        report.num_failed(),
                        report.failed_reads
                    );
                }
                TigOutcome { tig, metrics }
            }
            Err(e) => {
                warn!("tig {} failed: {e}", tig.ident);
                if let Some(stash) = stash {
                    stash.undo(&mut tig);
                }
                let metrics = TigMetrics::skipped(&tig, TigStatus::Failed);
                TigOutcome { tig, metrics }
            }
        }
    }

    fn write_outputs(&self, tigs: &[Tig], metrics: &[TigMetrics]) -> Result<()> {
        if let Some(path) = &self.output.layouts_out {
            write_layouts(path, tigs)?;
            info!("Wrote {} tigs to {}", tigs.len(), path.display());
        }
        if let Some(path) = &self.output.fastq_out {
            let mut writer = ConsensusFastqWriter::new(path)?;
            for (tig, m) in tigs.iter().zip(metrics) {
                if m.status == TigStatus::Consensus {
                    writer.write_tig(tig)?;
                }
            }
            info!("Wrote {} consensus sequences to {}", writer.records(), path.display());
            writer.finish()?;
        }
        if let Some(path) = &self.output.stats {
            write_metrics(path, metrics)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utgcns_lib::tig::{ChildKind, TgPosition};

    fn command() -> Consensus {
        Consensus::try_parse_from(["consensus", "-r", "reads.fq", "-t", "tigs.layout"]).unwrap()
    }

    fn store() -> InMemoryReadStore {
        let mut store = InMemoryReadStore::new();
        store.insert(1, b"ACGTACGTAC".to_vec(), vec![30; 10]);
        store
    }

    #[test]
    fn test_defaults() {
        let cmd = command();
        let options = cmd.consensus_options();
        assert_eq!(options, ConsensusOptions::default());
        assert_eq!(cmd.threading.threads, 1);
        assert!(cmd.tig_range.is_none());
        assert!(!cmd.force);
    }

    #[test]
    fn test_parses_all_options() {
        let cmd = Consensus::try_parse_from([
            "consensus", "-r", "r.fq", "-t", "t.layout", "-u", "2-4", "-L", "out.layout", "-F",
            "out.fq", "-s", "stats.tsv", "-e", "0.1", "--error-rate-max", "0.3", "-l", "30", "-f",
            "--max-coverage", "2.5", "--max-length", "5000", "--keep-failed", "-v", "--seed", "9",
            "--threads", "3",
        ])
        .unwrap();
        assert_eq!(cmd.tig_range, Some(TigRange { first: 2, last: 4 }));
        assert!(cmd.output.any());
        assert_eq!(cmd.max_length, Some(5000));
        let options = cmd.consensus_options();
        assert_eq!((options.error_rate, options.error_rate_max), (0.1, 0.3));
        assert_eq!(options.min_overlap, 30);
        assert!(options.keep_failed && options.show_result);
        assert_eq!(options.seed, 9);
        assert_eq!(cmd.threading.threads, 3);
    }

    #[test]
    fn test_skip_reasons_in_order() {
        let store = store();
        let mut cmd = command();
        cmd.max_length = Some(50);

        let mut tig = Tig::new(1);
        assert_eq!(cmd.skip_reason(&store, &tig), Some(TigStatus::SkippedNoChildren));

        tig.children = vec![TgPosition::read(1, 0, 10)];
        tig.bases = b"ACGT".to_vec();
        assert_eq!(cmd.skip_reason(&store, &tig), Some(TigStatus::SkippedHasConsensus));
        cmd.force = true;
        assert_eq!(cmd.skip_reason(&store, &tig), None);

        tig.children.push(TgPosition::read(2, 40, 60));
        assert_eq!(cmd.skip_reason(&store, &tig), Some(TigStatus::SkippedLength));
        cmd.max_length = None;
        assert_eq!(cmd.skip_reason(&store, &tig), Some(TigStatus::SkippedMissingReads));

        // non-read children are left for the driver to reject
        tig.children[1] = TgPosition::new(ChildKind::Unitig, 2, 0, 10);
        assert_eq!(cmd.skip_reason(&store, &tig), None);
    }

    #[test]
    fn test_failed_tig_is_unchanged() {
        let store = store();
        let cmd = command();
        let mut tig = Tig::new(4);
        tig.children =
            vec![TgPosition::read(1, 0, 10), TgPosition::new(ChildKind::Unitig, 2, 0, 10)];
        let before = tig.clone();

        let mut consensus = UnitigConsensus::new(&store, cmd.consensus_options());
        let outcome = cmd.process_tig(&mut consensus, &store, tig);
        assert_eq!(outcome.metrics.status, TigStatus::Failed);
        assert_eq!(outcome.tig, before);
    }
}
