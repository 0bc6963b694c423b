//! Per-tig consensus driver.
//!
//! [`UnitigConsensus::generate`] threads the children of one tig onto an [`Abacus`] one read at
//! a time, in child order. Each read is positioned against the evolving consensus (the
//! "frankenstein") with up to three estimators, aligned to a window of it, and replayed into the
//! abacus. A read that cannot be placed is flagged and skipped; the tig still gets a consensus
//! from the reads that did place.
//!
//! Placement escalates when an attempt fails:
//!
//! 1. [`Escalation::Initial`]: anchor, layout, then alignment estimates.
//! 2. [`Escalation::Rebuilt`]: the frankenstein is rebuilt with full refinement and the same
//!    three estimates are retried.
//! 3. [`Escalation::Forced`]: the alignment estimate once more, accepting any alignment under
//!    the hard error ceiling.

mod align;
mod position;
mod rebuild;

use ahash::AHashSet;
use log::{Level, debug, log_enabled, trace};
use utgcns_abacus::{Abacus, BeadId, MultiAlignId, ReadStore, SeqId};

use crate::aligner::{OverlapAligner, PairwiseAligner};
use crate::errors::{CnsError, ConsensusError, ConsensusResult};
use crate::tig::{TgPosition, Tig};

/// Default per-alignment error rate.
pub const DEFAULT_ERROR_RATE: f64 = 0.06;

/// Default hard error ceiling for forced alignments and the local error scan.
pub const DEFAULT_ERROR_RATE_MAX: f64 = 0.40;

/// Default minimum aligned overlap, in bases.
pub const DEFAULT_MIN_OVERLAP: usize = 40;

/// Tuning for one consensus run.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsensusOptions {
    pub error_rate: f64,
    pub error_rate_max: f64,
    pub min_overlap: usize,
    /// Seeds the column tie-break.
    pub seed: u64,
    /// Keep failed children, at their layout positions, in the exported tig.
    pub keep_failed: bool,
    /// Log the final multialign at debug level.
    pub show_result: bool,
}

impl Default for ConsensusOptions {
    fn default() -> Self {
        Self {
            error_rate: DEFAULT_ERROR_RATE,
            error_rate_max: DEFAULT_ERROR_RATE_MAX,
            min_overlap: DEFAULT_MIN_OVERLAP,
            seed: 0,
            keep_failed: false,
            show_result: false,
        }
    }
}

impl ConsensusOptions {
    /// Checks that both error rates lie in `(0, 1]` and are ordered.
    ///
    /// # Errors
    ///
    /// Returns [`CnsError::InvalidErrorRate`] or [`CnsError::InvalidParameter`].
    pub fn validate(&self) -> crate::errors::Result<()> {
        let rates = [("error-rate", self.error_rate), ("error-rate-max", self.error_rate_max)];
        for (parameter, value) in rates {
            if !(value > 0.0 && value <= 1.0) {
                return Err(CnsError::InvalidErrorRate {
                    parameter: parameter.to_string(),
                    value,
                    min: 0.0,
                    max: 1.0,
                });
            }
        }
        if self.error_rate > self.error_rate_max {
            return Err(CnsError::InvalidParameter {
                parameter: "error-rate".to_string(),
                reason: format!(
                    "{} is larger than --error-rate-max {}",
                    self.error_rate, self.error_rate_max
                ),
            });
        }
        Ok(())
    }
}

/// The ways a read's consensus position is estimated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Estimator {
    /// Rescaled hangs off the layout's anchor read.
    Anchor,
    /// Offset from the placed read with the thickest layout overlap.
    Layout,
    /// Local alignment of the read against the whole frankenstein.
    Alignment,
}

/// Placement attempts, in the order they are tried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Escalation {
    Initial,
    Rebuilt,
    Forced,
}

impl Escalation {
    pub const ALL: [Escalation; 3] = [Escalation::Initial, Escalation::Rebuilt, Escalation::Forced];

    /// Estimators tried at this level.
    #[must_use]
    pub fn estimators(self) -> &'static [Estimator] {
        match self {
            Escalation::Initial | Escalation::Rebuilt => {
                &[Estimator::Anchor, Estimator::Layout, Estimator::Alignment]
            }
            Escalation::Forced => &[Estimator::Alignment],
        }
    }
}

/// Outcome of [`UnitigConsensus::generate`] for a tig that passed its preconditions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TigConsensusReport {
    pub tig_id: u32,
    /// Children in the input tig.
    pub children: usize,
    /// Per input child, true if the read could not be placed.
    pub failed: Vec<bool>,
    /// Ids of the reads that could not be placed.
    pub failed_reads: Vec<u32>,
    /// Reads placed only after a full rebuild.
    pub rebuilt: usize,
    /// Reads placed only with a forced alignment.
    pub forced: usize,
}

impl TigConsensusReport {
    #[must_use]
    pub fn num_failed(&self) -> usize {
        self.failed_reads.len()
    }

    #[must_use]
    pub fn num_placed(&self) -> usize {
        self.children - self.num_failed()
    }
}

/// Computes tig consensus against one read store with one aligner.
///
/// An instance may process many tigs, one at a time; all per-tig state lives inside
/// [`UnitigConsensus::generate`].
pub struct UnitigConsensus<'a, S: ReadStore + ?Sized, A: PairwiseAligner = OverlapAligner> {
    store: &'a S,
    aligner: A,
    options: ConsensusOptions,
}

impl<'a, S: ReadStore + ?Sized> UnitigConsensus<'a, S, OverlapAligner> {
    #[must_use]
    pub fn new(store: &'a S, options: ConsensusOptions) -> Self {
        Self::with_aligner(store, OverlapAligner::default(), options)
    }
}

impl<'a, S: ReadStore + ?Sized, A: PairwiseAligner> UnitigConsensus<'a, S, A> {
    #[must_use]
    pub fn with_aligner(store: &'a S, aligner: A, options: ConsensusOptions) -> Self {
        Self { store, aligner, options }
    }

    #[must_use]
    pub fn options(&self) -> &ConsensusOptions {
        &self.options
    }

    /// Computes the consensus of `tig` and writes it, with the refined child positions, back into
    /// `tig`.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving `tig` untouched, if the tig has no children, has a child that is
    /// not a read, places a read twice, or references a read the store cannot supply.
    pub fn generate(&mut self, tig: &mut Tig) -> ConsensusResult<TigConsensusReport> {
        let (state, report) = self.compute(tig)?;
        if self.options.show_result && log_enabled!(Level::Debug) {
            debug!("tig {} multialign:\n{}", tig.ident, state.display());
        }
        state.export_to_tig(tig, &report.failed, self.options.keep_failed);
        Ok(report)
    }

    /// Places every read of `tig` and calls the final consensus, without touching `tig`.
    fn compute(&mut self, tig: &Tig) -> ConsensusResult<(TigState, TigConsensusReport)> {
        let mut state = self.initialize(tig)?;

        let mut report = TigConsensusReport {
            tig_id: tig.ident,
            children: tig.num_children(),
            failed: vec![false; tig.num_children()],
            ..TigConsensusReport::default()
        };

        for tiid in 1..state.num_reads() {
            state.tiid = tiid;
            state.report_starting_work(tig.ident);

            match self.place_read(&mut state) {
                Some((escalation, estimator)) => {
                    debug!(
                        "tig {} read {} placed by {estimator:?} estimate ({escalation:?})",
                        tig.ident, state.utgpos[tiid].ident
                    );
                    match escalation {
                        Escalation::Initial => {}
                        Escalation::Rebuilt => report.rebuilt += 1,
                        Escalation::Forced => report.forced += 1,
                    }
                    state.apply_alignment();
                    state.rebuild(false);
                }
                None => {
                    debug!("tig {} failed to align read {}", tig.ident, state.utgpos[tiid].ident);
                    report.failed[tiid] = true;
                    report.failed_reads.push(state.utgpos[tiid].ident);
                }
            }
        }

        state.generate_consensus();
        Ok((state, report))
    }

    /// Checks preconditions, loads every read and seeds the multialign with the first one.
    fn initialize(&self, tig: &Tig) -> ConsensusResult<TigState> {
        let tig_id = tig.ident;
        if tig.children.is_empty() {
            return Err(ConsensusError::EmptyTig { tig_id });
        }

        let mut seen = AHashSet::with_capacity(tig.children.len());
        for child in &tig.children {
            if !child.is_read() {
                return Err(ConsensusError::NonReadChild {
                    tig_id,
                    child_id: child.ident,
                    kind: child.kind,
                });
            }
            if !seen.insert(child.ident) {
                return Err(ConsensusError::DuplicateChild { tig_id, read_id: child.ident });
            }
        }

        let mut abacus = Abacus::with_seed(self.options.seed);
        for (i, child) in tig.children.iter().enumerate() {
            let sid = abacus
                .add_read(self.store, child.ident, child.a_skip, child.b_skip, child.reverse)
                .map_err(|source| ConsensusError::Abacus { tig_id, source })?;
            debug_assert_eq!(sid.index(), i);
        }

        let utgpos = tig.children.clone();
        let mut cnspos = tig.children.clone();
        for pos in &mut cnspos {
            pos.set_min_max(0, 0);
        }

        let ma = abacus.add_multi_align(SeqId::from_index(0));
        let seed_len = abacus.sequence(SeqId::from_index(0)).length() as i32;
        cnspos[0].set_min_max(0, seed_len);

        let mut state = TigState {
            abacus,
            ma,
            utgpos,
            cnspos,
            frankenstein: Vec::new(),
            frankenstein_beads: Vec::new(),
            tiid: 0,
            piid: None,
            trace: Vec::new(),
            trace_a_bgn: 0,
            trace_b_bgn: 0,
            options: self.options.clone(),
        };
        state.rebuild(false);
        trace!("tig {tig_id} seeded with read {} ({seed_len} bases)", state.utgpos[0].ident);
        Ok(state)
    }

    /// Runs the escalation ladder for the current read; on success the trace is ready to apply.
    fn place_read(&mut self, state: &mut TigState) -> Option<(Escalation, Estimator)> {
        for escalation in Escalation::ALL {
            if escalation == Escalation::Rebuilt {
                trace!("read {} recomputing full consensus", state.utgpos[state.tiid].ident);
                state.rebuild(true);
            }
            let forced = escalation == Escalation::Forced;
            for &estimator in escalation.estimators() {
                let estimated = match estimator {
                    Estimator::Anchor => state.position_from_anchor(),
                    Estimator::Layout => state.position_from_layout(),
                    Estimator::Alignment => state.position_from_alignment(&mut self.aligner),
                };
                if estimated && state.align_fragment(&mut self.aligner, forced) {
                    return Some((escalation, estimator));
                }
            }
        }
        None
    }
}

/// Everything mutated while computing one tig's consensus.
///
/// `utgpos` holds the layout positions and `cnspos` the positions in the current consensus;
/// a `cnspos` of `(0, 0)` marks a read that is not placed.
pub(crate) struct TigState {
    pub(crate) abacus: Abacus,
    pub(crate) ma: MultiAlignId,
    pub(crate) utgpos: Vec<TgPosition>,
    pub(crate) cnspos: Vec<TgPosition>,
    pub(crate) frankenstein: Vec<u8>,
    pub(crate) frankenstein_beads: Vec<BeadId>,
    /// The read being placed.
    pub(crate) tiid: usize,
    /// The placed read the current estimate is relative to.
    pub(crate) piid: Option<usize>,
    pub(crate) trace: Vec<i32>,
    pub(crate) trace_a_bgn: i32,
    pub(crate) trace_b_bgn: i32,
    pub(crate) options: ConsensusOptions,
}

impl TigState {
    fn num_reads(&self) -> usize {
        self.utgpos.len()
    }

    pub(crate) fn is_placed(&self, i: usize) -> bool {
        self.cnspos[i].min != 0 || self.cnspos[i].max != 0
    }

    /// Forgets the current estimate.
    pub(crate) fn clear_estimate(&mut self) {
        self.cnspos[self.tiid].set_min_max(0, 0);
        self.piid = None;
    }

    fn report_starting_work(&self, tig_id: u32) {
        let pos = &self.utgpos[self.tiid];
        debug!(
            "tig {tig_id} processing read {}/{} id {} pos {},{} anchor {},{},{} -- \
             consensus length {}",
            self.tiid + 1,
            self.num_reads(),
            pos.ident,
            pos.min,
            pos.max,
            pos.anchor.unwrap_or(0),
            pos.a_hang,
            pos.b_hang,
            self.frankenstein.len()
        );
    }

    fn display(&self) -> String {
        let mut out = Vec::new();
        if let Err(e) = self.abacus.display(self.ma, 0, usize::MAX, &mut out) {
            return format!("<display failed: {e}>");
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}
