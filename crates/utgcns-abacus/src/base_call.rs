//! Quality-weighted column calling.
//!
//! A column is called over five hypotheses: gap, A, C, G and T. Every bead in the column is one
//! observation with error probability `e` taken from its quality:
//!
//! ```text
//! P(obs | h) = 1 - e      if obs == h
//! P(obs | h) = e / 4      otherwise
//! ```
//!
//! Likelihoods are accumulated in log space and normalised into posteriors; the called symbol's
//! quality is the Phred-scaled probability that it is wrong, capped at
//! [`CNS_MAX_QV`](crate::phred::CNS_MAX_QV). `N` observations carry no evidence and are skipped.
//!
//! The per-quality tables are computed once in [`QualityModel::new`] and owned by the abacus, so
//! independent abaci never share mutable state.

use std::cmp::Ordering;

use crate::base_count::{GAP, symbol_index};
use crate::phred::{
    CNS_MAX_QV, LogProbability, PhredScore, ln_not, ln_prob_to_phred, ln_sum_exp_array,
    phred_to_ln_error_prob,
};

/// Hypotheses in likelihood order.
const HYPOTHESES: [u8; 5] = [GAP, b'A', b'C', b'G', b'T'];

/// Lowest quality used for an observation. Q0 would claim certainty of error.
const MIN_OBSERVATION_QV: u8 = 1;

/// Immutable per-quality lookup tables.
#[derive(Clone, Debug)]
pub struct QualityModel {
    ln_correct: Vec<LogProbability>,
    ln_error_per_alt: Vec<LogProbability>,
}

impl Default for QualityModel {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityModel {
    #[must_use]
    pub fn new() -> Self {
        let alternatives = ((HYPOTHESES.len() - 1) as f64).ln();
        let mut ln_correct = Vec::with_capacity(usize::from(CNS_MAX_QV) + 1);
        let mut ln_error_per_alt = Vec::with_capacity(usize::from(CNS_MAX_QV) + 1);
        for q in 0..=CNS_MAX_QV {
            let ln_error = phred_to_ln_error_prob(q.max(MIN_OBSERVATION_QV));
            ln_correct.push(ln_not(ln_error));
            ln_error_per_alt.push(ln_error - alternatives);
        }
        Self { ln_correct, ln_error_per_alt }
    }

    /// A fresh accumulator for one column.
    #[must_use]
    pub fn likelihood(&self) -> ColumnLikelihood<'_> {
        ColumnLikelihood { model: self, ln_likelihoods: [0.0; 5], observations: 0 }
    }
}

/// Accumulates the evidence of one column.
pub struct ColumnLikelihood<'a> {
    model: &'a QualityModel,
    ln_likelihoods: [LogProbability; 5],
    observations: u32,
}

impl ColumnLikelihood<'_> {
    /// Adds one bead; `N` and unknown symbols are ignored.
    pub fn add(&mut self, base: u8, qual: PhredScore) {
        let Some(observed) = symbol_index(base).filter(|&i| i < HYPOTHESES.len()) else {
            return;
        };
        let q = usize::from(qual.min(CNS_MAX_QV));
        let (hit, miss) = (self.model.ln_correct[q], self.model.ln_error_per_alt[q]);
        for (h, ll) in self.ln_likelihoods.iter_mut().enumerate() {
            *ll += if h == observed { hit } else { miss };
        }
        self.observations += 1;
    }

    /// Number of informative (non-`N`) observations.
    #[must_use]
    pub fn observations(&self) -> u32 {
        self.observations
    }

    /// The maximum-posterior symbol, or `None` without observations or on an exact tie.
    #[must_use]
    pub fn call(&self) -> Option<u8> {
        if self.observations == 0 {
            return None;
        }
        let mut best = 0;
        let mut tie = false;
        for i in 1..self.ln_likelihoods.len() {
            match self.ln_likelihoods[i].partial_cmp(&self.ln_likelihoods[best]) {
                Some(Ordering::Greater) => {
                    best = i;
                    tie = false;
                }
                Some(Ordering::Equal) => tie = true,
                _ => {}
            }
        }
        if tie { None } else { Some(HYPOTHESES[best]) }
    }

    /// Phred-scaled probability that `symbol` is the wrong call for this column.
    #[must_use]
    pub fn quality(&self, symbol: u8) -> PhredScore {
        let Some(i) = symbol_index(symbol).filter(|&i| i < HYPOTHESES.len()) else {
            return 0;
        };
        if self.observations == 0 {
            return 0;
        }
        let ln_posterior = self.ln_likelihoods[i] - ln_sum_exp_array(&self.ln_likelihoods);
        ln_prob_to_phred(ln_not(ln_posterior.min(0.0)))
    }
}
