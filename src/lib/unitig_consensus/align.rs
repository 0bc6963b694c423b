//! Aligning the current read to its estimated window and replaying the result.

use log::trace;
use utgcns_abacus::{AlignTarget, SeqId};

use super::TigState;
use crate::aligner::{AlignmentKind, AlignmentRequest, PairwiseAligner, PairwiseAlignment};

/// Smallest slack added on either side of the estimated window.
const MIN_WINDOW_SLACK: i32 = 10;

/// Read tails shorter than this are not trimmed before aligning.
const MIN_END_TRIM: i32 = 20;

impl TigState {
    /// Aligns the read to the frankenstein around `cnspos[tiid]` and, on success, leaves the
    /// replay trace in `trace`, `trace_a_bgn` and `trace_b_bgn`.
    ///
    /// Only dovetail alignments are accepted. `forced` skips the local error scan and relaxes the
    /// error rate to `error_rate_max`.
    pub(crate) fn align_fragment<A: PairwiseAligner>(
        &mut self,
        aligner: &mut A,
        forced: bool,
    ) -> bool {
        let Some(piid) = self.piid else {
            return self.fail_alignment("no reference read");
        };
        let tiid = self.tiid;
        let err = self.options.error_rate;
        let (t, p) = (&self.cnspos[tiid], &self.cnspos[piid]);
        assert!(t.min < t.max, "estimate {},{} for read {} is empty", t.min, t.max, t.ident);

        let bgn_extra = slack(err, t.min - p.min);
        let end_extra = slack(err, t.max - p.max);

        let frank_len = self.frankenstein.len() as i32;
        let mut end_trim = (t.max - frank_len) - (err * f64::from(t.max - t.min)).ceil() as i32;
        if end_trim < MIN_END_TRIM {
            end_trim = 0;
        }

        let frank_bgn = (t.min - bgn_extra).max(0);
        let allow_a_hang = frank_bgn == 0;
        let (frank_end, allow_b_hang) = if t.max + end_extra < frank_len {
            (t.max + end_extra, false)
        } else {
            (frank_len, true)
        };

        let read_len = self.abacus.sequence(SeqId::from_index(tiid)).length() as i32;
        if end_trim >= read_len {
            return self.fail_alignment("read shorter than its trimmed tail");
        }
        if frank_bgn >= frank_end {
            return self.fail_alignment("empty frankenstein window");
        }
        trace!(
            "window {frank_bgn}..{frank_end} of {frank_len} (slack {bgn_extra},{end_extra}) \
             read 0..{} (trim {end_trim}) hangs {allow_a_hang},{allow_b_hang} forced {forced}",
            read_len - end_trim
        );

        let max_error_rate = if forced { self.options.error_rate_max } else { err };
        let request = AlignmentRequest::overlap(
            allow_a_hang,
            allow_b_hang,
            max_error_rate,
            self.options.error_rate_max,
            self.options.min_overlap,
        )
        .forced(forced);

        let window = &self.frankenstein[frank_bgn as usize..frank_end as usize];
        let read_bases = self.abacus.sequence_bases(SeqId::from_index(tiid));
        let read = &read_bases[..(read_len - end_trim) as usize];
        let Some(alignment) = aligner.align(window, read, &request) else {
            return self.fail_alignment("no alignment");
        };
        if alignment.kind != AlignmentKind::Dovetail {
            return self.fail_alignment("alignment is not dovetail");
        }
        if alignment.a_bgn != 0 && alignment.b_bgn != 0 {
            return self.fail_alignment("alignment leaves both starts unaligned");
        }

        trace!(
            "read {} aligned A {}..{} B {}..{} erate {:.4}",
            self.utgpos[tiid].ident,
            alignment.a_bgn,
            alignment.a_end,
            alignment.b_bgn,
            alignment.b_end,
            alignment.error_rate
        );
        self.set_trace(&alignment, frank_bgn);
        true
    }

    /// Translates the aligner's delta into a trace in frankenstein and read coordinates.
    fn set_trace(&mut self, alignment: &PairwiseAlignment, frank_bgn: i32) {
        self.trace_a_bgn = frank_bgn + alignment.a_bgn as i32 - alignment.b_bgn as i32;
        self.trace_b_bgn = alignment.b_bgn as i32;
        self.trace = delta_to_trace(
            &alignment.delta,
            alignment.a_bgn as i32,
            alignment.b_bgn as i32,
            frank_bgn,
        );
    }

    /// Threads the current read onto the frankenstein's columns.
    pub(crate) fn apply_alignment(&mut self) {
        let b = SeqId::from_index(self.tiid);
        self.abacus.apply_alignment(
            AlignTarget::Beads(&self.frankenstein_beads),
            b,
            self.trace_a_bgn,
            self.trace_b_bgn,
            Some(&self.trace),
        );
    }

    fn fail_alignment(&mut self, reason: &str) -> bool {
        trace!("read {} alignment failed: {reason}", self.utgpos[self.tiid].ident);
        self.clear_estimate();
        false
    }
}

/// Slack allowed for an offset estimated from a neighbour `distance` bases away.
fn slack(error_rate: f64, distance: i32) -> i32 {
    ((error_rate * f64::from(distance)).ceil() as i32).abs().max(MIN_WINDOW_SLACK)
}

/// Converts a run-length delta starting at window position `a_bgn` and read position `b_bgn`
/// into absolute trace entries; A positions are offset by `frank_bgn`.
pub(crate) fn delta_to_trace(delta: &[i32], a_bgn: i32, b_bgn: i32, frank_bgn: i32) -> Vec<i32> {
    let (mut apos, mut bpos) = (a_bgn, b_bgn);
    delta
        .iter()
        .map(|&d| {
            if d < 0 {
                apos += -d - 1;
                bpos += -d;
                -apos - frank_bgn - 1
            } else {
                apos += d;
                bpos += d - 1;
                bpos + 1
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.06, 0, 10)]
    #[case(0.06, 500, 30)]
    #[case(0.06, -500, 30)]
    #[case(0.5, 15, 10)]
    fn test_slack(#[case] err: f64, #[case] distance: i32, #[case] expected: i32) {
        assert_eq!(slack(err, distance), expected);
    }

    #[test]
    fn test_delta_to_trace() {
        // B has an extra base after 4 aligned columns, A an extra base 3 columns later
        assert_eq!(delta_to_trace(&[-5, 4], 0, 0, 0), vec![-5, 9]);
        // offsets shift A positions only
        assert_eq!(delta_to_trace(&[-5], 2, 0, 10), vec![-17]);
        // a leading gap in B skips the first A position
        assert_eq!(delta_to_trace(&[1], 0, 0, 0), vec![1]);
        assert!(delta_to_trace(&[], 3, 0, 7).is_empty());
    }
}
