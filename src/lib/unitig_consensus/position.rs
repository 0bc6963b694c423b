//! Estimating where the current read lands in the frankenstein.
//!
//! Each estimator either sets `cnspos[tiid]` and the read it is relative to (`piid`) and returns
//! true, or clears both and returns false.

use log::trace;
use utgcns_abacus::SeqId;

use super::TigState;
use crate::aligner::{AlignmentRequest, PairwiseAligner};

/// Shortest estimated span, relative to the layout span, before the estimate is recentred.
const MIN_SCALED_SPAN: f64 = 0.75;

impl TigState {
    /// Places the read relative to its layout anchor, scaling the layout hangs by how much the
    /// anchor grew or shrank in the consensus.
    pub(crate) fn position_from_anchor(&mut self) -> bool {
        let tiid = self.tiid;
        let Some(anchor) = self.utgpos[tiid].anchor else {
            return self.fail_estimate("no anchor");
        };

        let Some(piid) = (0..tiid).rev().find(|&i| self.utgpos[i].ident == anchor) else {
            return self.fail_estimate("anchor not in tig before this read");
        };
        if !self.is_placed(piid) {
            return self.fail_estimate("anchor not placed");
        }

        let (t_utg, p_utg, p_cns) = (&self.utgpos[tiid], &self.utgpos[piid], &self.cnspos[piid]);
        if p_utg.max < t_utg.min || t_utg.max < p_utg.min {
            return self.fail_estimate("anchor layout does not overlap");
        }
        if p_utg.span() <= 0 {
            return self.fail_estimate("anchor has an empty layout span");
        }

        let scale = f64::from(p_cns.span()) / f64::from(p_utg.span());
        let mut min = (f64::from(p_cns.min) + f64::from(t_utg.a_hang) * scale) as i32;
        let mut max = (f64::from(p_cns.max) + f64::from(t_utg.b_hang) * scale) as i32;

        let length = f64::from(t_utg.span());
        if min >= max || f64::from(max - min) < MIN_SCALED_SPAN * length {
            let center = (min + max) / 2;
            let half = length * scale / 2.0;
            trace!(
                "read {} too short after scaling {scale:.3}, recentred on {center}",
                t_utg.ident
            );
            min = (f64::from(center) - half) as i32;
            max = (f64::from(center) + half) as i32;
        }
        if min >= max {
            return self.fail_estimate("scaled span is empty");
        }

        trace!(
            "anchor {anchor} at {},{} --> read {} at {min},{max} (frankenstein length {})",
            p_cns.min,
            p_cns.max,
            t_utg.ident,
            self.frankenstein.len()
        );
        self.cnspos[tiid].set_min_max(min, max);
        self.piid = Some(piid);
        true
    }

    /// Places the read by the layout offset to the already placed read it overlaps most.
    pub(crate) fn position_from_layout(&mut self) -> bool {
        let tiid = self.tiid;
        let frank_len = self.frankenstein.len() as i32;
        let t_utg = &self.utgpos[tiid];

        let mut thickest = 0;
        let mut best = None;
        for qiid in (0..tiid).rev() {
            let q_utg = &self.utgpos[qiid];
            if !(t_utg.min < q_utg.max && t_utg.max > q_utg.min) || !self.is_placed(qiid) {
                continue;
            }
            let q_cns = &self.cnspos[qiid];
            let min = q_cns.min + t_utg.min - q_utg.min;
            let max = q_cns.max + t_utg.max - q_utg.max;
            let overlap = max.min(frank_len) - min;

            if min < frank_len && min < max && thickest < overlap {
                thickest = overlap;
                best = Some((qiid, min, max));
            }
        }

        match best {
            Some((piid, min, max)) if thickest >= self.options.min_overlap as i32 => {
                trace!(
                    "layout neighbour {} at {},{} --> read {} at {min},{max} (overlap {thickest})",
                    self.utgpos[piid].ident,
                    self.cnspos[piid].min,
                    self.cnspos[piid].max,
                    t_utg.ident
                );
                self.cnspos[tiid].set_min_max(min, max);
                self.piid = Some(piid);
                true
            }
            _ => self.fail_estimate("no placed layout neighbour overlaps enough"),
        }
    }

    /// Places the read where a local alignment against the whole frankenstein puts it, relative
    /// to the placed read it then overlaps most.
    pub(crate) fn position_from_alignment<A: PairwiseAligner>(&mut self, aligner: &mut A) -> bool {
        let tiid = self.tiid;
        let request = AlignmentRequest::partial(
            self.options.error_rate,
            self.options.error_rate_max,
            self.options.min_overlap,
        );
        let read = self.abacus.sequence_bases(SeqId::from_index(tiid));
        let Some(alignment) = aligner.align(&self.frankenstein, read, &request) else {
            return self.fail_estimate("no partial alignment to the frankenstein");
        };

        let (min, max) = (alignment.a_bgn as i32, alignment.a_end as i32);
        self.cnspos[tiid].set_min_max(min, max);

        let mut thickest = 0;
        let mut best = None;
        for qiid in (0..self.cnspos.len()).rev() {
            let q = &self.cnspos[qiid];
            if qiid == tiid || !(min < q.max && max > q.min) {
                continue;
            }
            let overlap = max.min(q.max) - min.max(q.min);
            if thickest < overlap {
                thickest = overlap;
                best = Some(qiid);
            }
        }

        let Some(piid) = best else {
            return self.fail_estimate("alignment overlaps no placed read");
        };
        trace!(
            "alignment puts read {} at {min},{max} next to {} (overlap {thickest})",
            self.utgpos[tiid].ident,
            self.utgpos[piid].ident
        );
        self.piid = Some(piid);
        true
    }

    fn fail_estimate(&mut self, reason: &str) -> bool {
        trace!("read {} estimate failed: {reason}", self.utgpos[self.tiid].ident);
        self.clear_estimate();
        false
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::store_with;
    use super::super::{ConsensusOptions, TigState};
    use crate::aligner::OverlapAligner;
    use crate::aligner::tests::genome;
    use crate::tig::TgPosition;
    use utgcns_abacus::{Abacus, SeqId};

    /// A state with read 0 placed at `0..len` and read 1 waiting.
    fn state(reads: &[Vec<u8>], utgpos: Vec<TgPosition>) -> TigState {
        let store = store_with(
            &reads.iter().enumerate().map(|(i, r)| (i as u32 + 1, r.clone())).collect::<Vec<_>>(),
        );
        let mut abacus = Abacus::new();
        for pos in &utgpos {
            abacus.add_read(&store, pos.ident, 0, 0, pos.reverse).unwrap();
        }
        let ma = abacus.add_multi_align(SeqId::from_index(0));
        let mut cnspos = utgpos.clone();
        for pos in &mut cnspos {
            pos.set_min_max(0, 0);
        }
        cnspos[0].set_min_max(0, reads[0].len() as i32);

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
            options: ConsensusOptions::default(),
        };
        state.rebuild(false);
        state.tiid = 1;
        state
    }

    #[test]
    fn test_anchor_scales_hangs() {
        let g = genome(200, 21);
        // read 1 is 100 bases in the layout but 120 in consensus
        let mut state = state(
            &[g[0..120].to_vec(), g[50..170].to_vec()],
            vec![TgPosition::read(1, 0, 100), TgPosition::read(2, 50, 150).with_anchor(1, 50, 50)],
        );
        assert!(state.position_from_anchor());
        assert_eq!(state.piid, Some(0));
        assert_eq!((state.cnspos[1].min, state.cnspos[1].max), (60, 180));
    }

    #[test]
    fn test_anchor_recentres_collapsed_span() {
        let g = genome(200, 22);
        let mut state = state(
            &[g[0..100].to_vec(), g[10..90].to_vec()],
            vec![TgPosition::read(1, 0, 100), TgPosition::read(2, 10, 90).with_anchor(1, 60, -60)],
        );
        assert!(state.position_from_anchor());
        // hangs give 60..40, recentred on 50 with the layout length 80
        assert_eq!((state.cnspos[1].min, state.cnspos[1].max), (10, 90));
    }

    #[test]
    fn test_anchor_failures_clear_estimate() {
        let g = genome(200, 23);
        let mut state = state(
            &[g[0..100].to_vec(), g[10..90].to_vec()],
            vec![
                TgPosition::read(1, 0, 100),
                TgPosition::read(2, 150, 250).with_anchor(1, 150, 150),
            ],
        );
        assert!(!state.position_from_anchor());
        assert!(!state.is_placed(1));
        assert_eq!(state.piid, None);

        state.utgpos[1].anchor = None;
        assert!(!state.position_from_anchor());
    }

    #[test]
    fn test_layout_uses_thickest_overlap() {
        let g = genome(200, 24);
        let mut state = state(
            &[g[0..120].to_vec(), g[70..190].to_vec()],
            vec![TgPosition::read(1, 0, 120), TgPosition::read(2, 70, 190)],
        );
        assert!(state.position_from_layout());
        assert_eq!((state.cnspos[1].min, state.cnspos[1].max), (70, 190));

        state.options.min_overlap = 60;
        assert!(!state.position_from_layout());
        assert!(!state.is_placed(1));
    }

    #[test]
    fn test_alignment_finds_position() {
        let g = genome(200, 25);
        let mut state = state(
            &[g[0..120].to_vec(), g[40..160].to_vec()],
            vec![TgPosition::read(1, 0, 120), TgPosition::read(2, 900, 1020)],
        );
        assert!(state.position_from_alignment(&mut OverlapAligner::default()));
        assert_eq!(state.piid, Some(0));
        assert_eq!((state.cnspos[1].min, state.cnspos[1].max), (40, 120));
    }
}
