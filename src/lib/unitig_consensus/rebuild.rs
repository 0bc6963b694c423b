//! Regenerating the frankenstein, the final consensus, and the export back to the tig.

use log::trace;
use utgcns_abacus::{GAP, RefineLevel, SeqId};

use super::TigState;
use crate::tig::Tig;

const REFINE_LEVELS: [RefineLevel; 3] =
    [RefineLevel::Smooth, RefineLevel::PolyX, RefineLevel::Indel];

impl TigState {
    /// Recalls every column, regenerates the frankenstein and renumbers the columns, then updates
    /// the consensus span of every placed read.
    ///
    /// With `full`, the multialign is refined at every level first. If the current read was just
    /// placed relative to `piid`, its layout anchor and hangs are replaced by the placement.
    ///
    /// Calls here are for aligning, not for output: the most common base wins, ties going to the
    /// earlier of A, C, G, T; a column without bases calls `N`; a column where gaps outnumber the
    /// winner keeps it in lowercase.
    pub(crate) fn rebuild(&mut self, full: bool) {
        if full {
            for level in REFINE_LEVELS {
                self.abacus.refine(self.ma, level, 0, usize::MAX);
                self.abacus.merge_refine(self.ma, false);
            }
        }
        self.abacus.refresh_multi_align(self.ma, false, false);

        self.frankenstein.clear();
        self.frankenstein_beads.clear();
        let columns = self.abacus.multi_align(self.ma).columns().to_vec();
        for column in columns {
            let counts = *self.abacus.column(column).base_count();
            let mut call = b'N';
            let mut best = 0;
            for base in [b'A', b'C', b'G', b'T'] {
                if counts.count(base) > best {
                    best = counts.count(base);
                    call = base;
                }
            }
            if counts.count(GAP) > best {
                call = call.to_ascii_lowercase();
            }

            self.abacus.set_call_base(column, call);
            self.frankenstein.push(call);
            self.frankenstein_beads.push(self.abacus.column(column).call());
        }

        for i in 0..=self.tiid {
            if !self.is_placed(i) {
                continue;
            }
            let seq = self.abacus.sequence(SeqId::from_index(i));
            let first = self.abacus.bead(seq.first_bead()).col_idx();
            let last = self.abacus.bead(seq.last_bead()).col_idx();
            let min = self.abacus.column(first).position();
            let max = self.abacus.column(last).position() + 1;
            assert!(0 <= min && min < max, "read {} rebuilt at {min},{max}", self.utgpos[i].ident);
            self.cnspos[i].set_min_max(min, max);
        }

        if let Some(piid) = self.piid.take() {
            let anchor = self.utgpos[piid].ident;
            let a_hang = self.cnspos[self.tiid].min - self.cnspos[piid].min;
            let b_hang = self.cnspos[self.tiid].max - self.cnspos[piid].max;
            let pos = &mut self.utgpos[self.tiid];
            pos.anchor = Some(anchor);
            pos.a_hang = a_hang;
            pos.b_hang = b_hang;
        }

        trace!("rebuilt frankenstein (full {full}) length {}", self.frankenstein.len());
    }

    /// Final calls: quality weighted, after refining at every level.
    pub(crate) fn generate_consensus(&mut self) {
        self.abacus.refresh_multi_align(self.ma, true, true);
        for level in REFINE_LEVELS {
            self.abacus.refine(self.ma, level, 0, usize::MAX);
            self.abacus.merge_refine(self.ma, true);
        }
        self.abacus.refresh_multi_align(self.ma, true, true);
    }

    /// Writes the consensus and each child's final placement into `tig`.
    ///
    /// Failed children are dropped, or kept at their layout position with `keep_failed`.
    pub(crate) fn export_to_tig(&self, tig: &mut Tig, failed: &[bool], keep_failed: bool) {
        let (bases, quals) = self.abacus.consensus(self.ma);
        let positions = self.abacus.positions(self.ma);

        let mut children = Vec::with_capacity(tig.children.len());
        for (i, child) in tig.children.iter().enumerate() {
            match positions[i] {
                Some((min, max)) if !failed[i] => {
                    let mut placed = child.clone();
                    placed.set_min_max(min, max);
                    placed.anchor = self.utgpos[i].anchor;
                    placed.a_hang = self.utgpos[i].a_hang;
                    placed.b_hang = self.utgpos[i].b_hang;
                    children.push(placed);
                }
                _ if keep_failed => children.push(child.clone()),
                _ => {}
            }
        }

        tig.layout_len = bases.len() as u32;
        tig.bases = bases;
        tig.quals = quals;
        tig.children = children;
    }
}
