//! Arena owner and the only mutator of bead/column linkage.
//!
//! The abacus keeps every sequence, base, bead, column and multialign of one tig computation in
//! growable arenas and links them together with typed indices. Reads are threaded onto the
//! columns ("the frame") one row at a time by [`Abacus::apply_alignment`]; everything else in
//! this module is the set of primitives that keep the four-way links and the per-column tallies
//! consistent while that happens.
//!
//! Linkage violations are programmer errors and panic. Only read ingestion, which depends on the
//! read store, returns an error.

use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::base_call::QualityModel;
use crate::base_count::{GAP, symbol_index};
use crate::bead::Bead;
use crate::column::Column;
use crate::dna::{normalize_base, reverse_complement};
use crate::errors::{AbacusError, Result};
use crate::ids::{BaseId, BeadId, ColumnId, MultiAlignId, SeqId};
use crate::iterators::{ColumnBeads, ColumnChain, RowBeads};
use crate::multi_align::MultiAlign;
use crate::phred::{CNS_MAX_QV, PhredScore};
use crate::read_store::ReadStore;
use crate::sequence::Sequence;

/// Multiplier spreading column ids over the tie-break seed space.
const COLUMN_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Arenas and linkage primitives for one consensus computation.
#[derive(Clone, Debug, Default)]
pub struct Abacus {
    sequences: Vec<Sequence>,
    bases: Vec<u8>,
    quals: Vec<u8>,
    beads: Vec<Bead>,
    columns: Vec<Column>,
    multi_aligns: Vec<MultiAlign>,
    quality: QualityModel,
    seed: u64,
}

impl Abacus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An abacus whose majority-vote tie-breaks derive from `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self { seed, ..Self::default() }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn quality_model(&self) -> &QualityModel {
        &self.quality
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    #[must_use]
    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// # Panics
    ///
    /// Panics if `id` is not a sequence of this abacus.
    #[must_use]
    pub fn sequence(&self, id: SeqId) -> &Sequence {
        self.sequences.get(id.index()).unwrap_or_else(|| panic!("no sequence {id:?}"))
    }

    /// # Panics
    ///
    /// Panics if `id` is not a bead of this abacus.
    #[must_use]
    pub fn bead(&self, id: BeadId) -> &Bead {
        self.beads.get(id.index()).unwrap_or_else(|| panic!("no bead {id:?}"))
    }

    pub(crate) fn bead_mut(&mut self, id: BeadId) -> &mut Bead {
        self.beads.get_mut(id.index()).unwrap_or_else(|| panic!("no bead {id:?}"))
    }

    /// # Panics
    ///
    /// Panics if `id` is not a column of this abacus.
    #[must_use]
    pub fn column(&self, id: ColumnId) -> &Column {
        self.columns.get(id.index()).unwrap_or_else(|| panic!("no column {id:?}"))
    }

    pub(crate) fn column_mut(&mut self, id: ColumnId) -> &mut Column {
        self.columns.get_mut(id.index()).unwrap_or_else(|| panic!("no column {id:?}"))
    }

    /// # Panics
    ///
    /// Panics if `id` is not a multialign of this abacus.
    #[must_use]
    pub fn multi_align(&self, id: MultiAlignId) -> &MultiAlign {
        self.multi_aligns.get(id.index()).unwrap_or_else(|| panic!("no multialign {id:?}"))
    }

    pub(crate) fn multi_align_mut(&mut self, id: MultiAlignId) -> &mut MultiAlign {
        self.multi_aligns.get_mut(id.index()).unwrap_or_else(|| panic!("no multialign {id:?}"))
    }

    /// The symbol a bead denotes.
    #[must_use]
    pub fn base(&self, bead: BeadId) -> u8 {
        self.bases[self.bead(bead).base_idx.index()]
    }

    /// The quality of the symbol a bead denotes.
    #[must_use]
    pub fn qual(&self, bead: BeadId) -> PhredScore {
        self.quals[self.bead(bead).base_idx.index()]
    }

    /// Stored (trimmed, oriented) bases of a sequence.
    #[must_use]
    pub fn sequence_bases(&self, id: SeqId) -> &[u8] {
        let seq = self.sequence(id);
        &self.bases[seq.first_base.index()..=seq.last_base.index()]
    }

    #[must_use]
    pub fn sequence_quals(&self, id: SeqId) -> &[u8] {
        let seq = self.sequence(id);
        &self.quals[seq.first_base.index()..=seq.last_base.index()]
    }

    /// Bead ids of a sequence's stored bases, in order.
    #[must_use]
    pub fn sequence_beads(&self, id: SeqId) -> Vec<BeadId> {
        let seq = self.sequence(id);
        (seq.first_bead.get()..=seq.last_bead.get()).map(BeadId::new).collect()
    }

    /// Read beads under a column's call bead.
    #[must_use]
    pub fn column_beads(&self, column: ColumnId) -> ColumnBeads<'_> {
        ColumnBeads::new(self, column)
    }

    /// A row walked from `start` along `next`.
    #[must_use]
    pub fn row_beads(&self, start: BeadId) -> RowBeads<'_> {
        RowBeads::new(self, start)
    }

    /// Columns walked from `start` along `next`.
    #[must_use]
    pub fn column_chain(&self, start: ColumnId) -> ColumnChain<'_> {
        ColumnChain::new(self, start)
    }

    // ------------------------------------------------------------------
    // Ingest
    // ------------------------------------------------------------------

    /// Loads a read as a new sequence.
    ///
    /// The read is reverse-complemented first when `reverse` is set, then `left_skip` bases are
    /// dropped from its start and `right_skip` from its end. The remaining bases get one bead each,
    /// linked into a row but not aligned to any column.
    ///
    /// # Errors
    ///
    /// Returns an error if the store has no such read, if its qualities do not match its bases,
    /// or if the skips leave no bases.
    pub fn add_read<S: ReadStore + ?Sized>(
        &mut self,
        store: &S,
        read_id: u32,
        left_skip: u32,
        right_skip: u32,
        reverse: bool,
    ) -> Result<SeqId> {
        let read = store.read(read_id).ok_or(AbacusError::MissingRead { read_id })?;
        if read.quality.len() != read.sequence.len() {
            return Err(AbacusError::QualityLengthMismatch {
                read_id,
                bases: read.sequence.len(),
                quals: read.quality.len(),
            });
        }

        let (bases, quals): (Vec<u8>, Vec<u8>) = if reverse {
            (reverse_complement(&read.sequence), read.quality.iter().rev().copied().collect())
        } else {
            (read.sequence.iter().map(|&b| normalize_base(b)).collect(), read.quality)
        };

        let length = bases.len();
        let skipped = left_skip as usize + right_skip as usize;
        if skipped >= length {
            return Err(AbacusError::EmptyAfterSkip { read_id, length, left_skip, right_skip });
        }
        let kept = left_skip as usize..length - right_skip as usize;
        let kept_len = kept.len();

        let ident = SeqId::from_index(self.sequences.len());
        let first_base = BaseId::from_index(self.bases.len());
        let first_bead = BeadId::from_index(self.beads.len());

        for (offset, (&base, &qual)) in bases[kept.clone()].iter().zip(&quals[kept]).enumerate() {
            let bead = self.add_bead(base, qual.min(CNS_MAX_QV), ident, Some(offset as u32));
            if offset > 0 {
                self.bead_mut(bead).prev = BeadId::new(bead.get() - 1);
            }
            if offset + 1 < kept_len {
                self.bead_mut(bead).next = BeadId::new(bead.get() + 1);
            }
        }

        self.sequences.push(Sequence {
            read_id,
            ident,
            length: kept_len as u32,
            complemented: reverse,
            left_skip,
            right_skip,
            first_base,
            last_base: BaseId::new(first_base.get() + kept_len as u32 - 1),
            first_bead,
            last_bead: BeadId::new(first_bead.get() + kept_len as u32 - 1),
        });

        Ok(ident)
    }

    fn add_bead(&mut self, base: u8, qual: PhredScore, seq: SeqId, offset: Option<u32>) -> BeadId {
        let base_idx = BaseId::from_index(self.bases.len());
        self.bases.push(base);
        self.quals.push(qual);
        let ident = BeadId::from_index(self.beads.len());
        self.beads.push(Bead::new(ident, base_idx, seq, offset));
        ident
    }

    // ------------------------------------------------------------------
    // Gap beads
    // ------------------------------------------------------------------

    /// Splices a new gap bead into a row right after `after`.
    ///
    /// The gap takes the lower quality of its two row neighbours.
    pub fn append_gap_bead(&mut self, after: BeadId) -> BeadId {
        let (seq, next) = {
            let b = self.bead(after);
            (b.seq_idx, b.next)
        };
        let qual =
            if next.is_valid() { self.qual(after).min(self.qual(next)) } else { self.qual(after) };
        let gap = self.add_bead(GAP, qual, seq, None);

        {
            let g = self.bead_mut(gap);
            g.prev = after;
            g.next = next;
        }
        self.bead_mut(after).next = gap;
        if next.is_valid() {
            self.bead_mut(next).prev = gap;
        }
        gap
    }

    /// Splices a new gap bead into a row right before `before`.
    pub fn prepend_gap_bead(&mut self, before: BeadId) -> BeadId {
        let (seq, prev) = {
            let b = self.bead(before);
            (b.seq_idx, b.prev)
        };
        let qual = if prev.is_valid() {
            self.qual(before).min(self.qual(prev))
        } else {
            self.qual(before)
        };
        let gap = self.add_bead(GAP, qual, seq, None);

        {
            let g = self.bead_mut(gap);
            g.prev = prev;
            g.next = before;
        }
        self.bead_mut(before).prev = gap;
        if prev.is_valid() {
            self.bead_mut(prev).next = gap;
        }
        gap
    }

    // ------------------------------------------------------------------
    // Column stacks
    // ------------------------------------------------------------------

    /// Attaches an unaligned bead to the bottom of a column's stack.
    ///
    /// # Panics
    ///
    /// Panics if the bead is already in a column.
    pub fn align_bead_to_column(&mut self, column: ColumnId, bead: BeadId, label: &str) {
        let current = self.bead(bead).col_idx;
        assert!(
            current.is_invalid(),
            "{label}: bead {bead:?} is already aligned to column {current:?}, \
             cannot move to {column:?}"
        );

        let mut bottom = self.column(column).call;
        while self.bead(bottom).down.is_valid() {
            bottom = self.bead(bottom).down;
        }

        self.bead_mut(bottom).down = bead;
        {
            let b = self.bead_mut(bead);
            b.up = bottom;
            b.down = BeadId::INVALID;
            b.col_idx = column;
        }
        let base = self.base(bead);
        self.column_mut(column).base_count.increment(base);
    }

    /// Detaches a read bead from its column, returning the bead that was above it.
    ///
    /// # Panics
    ///
    /// Panics if the bead is not aligned, or is a call bead.
    pub fn unalign_bead_from_column(&mut self, bead: BeadId) -> BeadId {
        let (up, down, column, is_call) = {
            let b = self.bead(bead);
            (b.up, b.down, b.col_idx, b.is_call())
        };
        assert!(column.is_valid(), "bead {bead:?} is not aligned to a column");
        assert!(!is_call, "cannot unalign call bead {bead:?} from column {column:?}");

        self.bead_mut(up).down = down;
        if down.is_valid() {
            self.bead_mut(down).up = up;
        }
        {
            let b = self.bead_mut(bead);
            b.up = BeadId::INVALID;
            b.down = BeadId::INVALID;
            b.col_idx = ColumnId::INVALID;
        }
        let base = self.base(bead);
        self.column_mut(column).base_count.decrement(base);
        up
    }

    /// Removes gap beads from the end of the row containing `bead`. Returns how many were removed.
    pub fn unalign_trailing_gap_beads(&mut self, bead: BeadId) -> usize {
        let mut last = bead;
        while self.bead(last).next.is_valid() {
            last = self.bead(last).next;
        }

        let mut removed = 0;
        while self.base(last) == GAP && !self.bead(last).is_call() {
            let prev = self.bead(last).prev;
            if prev.is_invalid() {
                break;
            }
            if self.bead(last).col_idx.is_valid() {
                self.unalign_bead_from_column(last);
            }
            self.bead_mut(prev).next = BeadId::INVALID;
            self.bead_mut(last).prev = BeadId::INVALID;
            last = prev;
            removed += 1;
        }
        removed
    }

    /// Removes gap beads from the start of the row containing `bead`. Returns how many were
    /// removed.
    pub(crate) fn unalign_leading_gap_beads(&mut self, bead: BeadId) -> usize {
        let mut first = bead;
        while self.bead(first).prev.is_valid() {
            first = self.bead(first).prev;
        }

        let mut removed = 0;
        while self.base(first) == GAP && !self.bead(first).is_call() {
            let next = self.bead(first).next;
            if next.is_invalid() {
                break;
            }
            if self.bead(first).col_idx.is_valid() {
                self.unalign_bead_from_column(first);
            }
            self.bead_mut(next).prev = BeadId::INVALID;
            self.bead_mut(first).next = BeadId::INVALID;
            first = next;
            removed += 1;
        }
        removed
    }

    /// Swaps two row-adjacent beads between their (adjacent) columns.
    ///
    /// `left` must be immediately followed by `right` in the row, and `right`'s column must
    /// immediately follow `left`'s. Afterwards `right` sits in `left`'s old column and the row
    /// order is `right, left`.
    ///
    /// # Panics
    ///
    /// Panics if the beads are not row neighbours in neighbouring columns.
    pub fn lateral_exchange_bead(&mut self, left: BeadId, right: BeadId) {
        let l = self.bead(left).clone();
        let r = self.bead(right).clone();
        assert_eq!(l.next, right, "lateral exchange of non-adjacent beads {left:?} {right:?}");
        assert!(l.col_idx.is_valid() && r.col_idx.is_valid(), "lateral exchange of unaligned bead");
        assert_eq!(
            self.column(l.col_idx).next,
            r.col_idx,
            "lateral exchange across non-adjacent columns {:?} {:?}",
            l.col_idx,
            r.col_idx
        );

        // Stack positions.
        self.bead_mut(l.up).down = right;
        if l.down.is_valid() {
            self.bead_mut(l.down).up = right;
        }
        self.bead_mut(r.up).down = left;
        if r.down.is_valid() {
            self.bead_mut(r.down).up = left;
        }
        {
            let b = self.bead_mut(right);
            b.up = l.up;
            b.down = l.down;
            b.col_idx = l.col_idx;
        }
        {
            let b = self.bead_mut(left);
            b.up = r.up;
            b.down = r.down;
            b.col_idx = r.col_idx;
        }

        // Row order.
        if l.prev.is_valid() {
            self.bead_mut(l.prev).next = right;
        }
        if r.next.is_valid() {
            self.bead_mut(r.next).prev = left;
        }
        {
            let b = self.bead_mut(right);
            b.prev = l.prev;
            b.next = left;
        }
        {
            let b = self.bead_mut(left);
            b.prev = right;
            b.next = r.next;
        }

        let (lbase, rbase) = (self.base(left), self.base(right));
        let lcount = &mut self.column_mut(l.col_idx).base_count;
        lcount.decrement(lbase);
        lcount.increment(rbase);
        let rcount = &mut self.column_mut(r.col_idx).base_count;
        rcount.decrement(rbase);
        rcount.increment(lbase);
    }

    /// Bead in `bead`'s column that belongs to the same row as `row_of`, searching up then down.
    #[must_use]
    pub fn find_bead_in_column(&self, bead: BeadId, row_of: BeadId) -> BeadId {
        let seq = self.bead(row_of).seq_idx;
        if self.bead(bead).seq_idx == seq {
            return bead;
        }

        let mut b = self.bead(bead).up;
        while b.is_valid() {
            if self.bead(b).seq_idx == seq {
                return b;
            }
            b = self.bead(b).up;
        }

        let mut b = self.bead(bead).down;
        while b.is_valid() {
            if self.bead(b).seq_idx == seq {
                return b;
            }
            b = self.bead(b).down;
        }

        BeadId::INVALID
    }

    // ------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------

    /// New unlinked column holding `seed` under a fresh call bead copied from it.
    pub fn add_column(&mut self, ma: MultiAlignId, seed: BeadId) -> ColumnId {
        let ident = ColumnId::from_index(self.columns.len());
        let (base, qual) = (self.base(seed), self.qual(seed));
        let call = self.add_bead(base, qual, SeqId::INVALID, None);

        let mut column = Column::new(ident, ma);
        column.call = call;
        self.columns.push(column);
        self.bead_mut(call).col_idx = ident;

        self.align_bead_to_column(ident, seed, "add_column");
        ident
    }

    /// Inserts a column holding `bead` right before `before`.
    ///
    /// Every row that passes from the previous column into `before` gets a gap bead in the new
    /// column; rows starting at `before` do not.
    pub fn prepend_column(&mut self, before: ColumnId, bead: BeadId) -> ColumnId {
        let ma = self.column(before).ma_id;
        let ident = self.add_column(ma, bead);
        let prev = self.column(before).prev;

        {
            let position = self.column(before).position - 1;
            let c = self.column_mut(ident);
            c.prev = prev;
            c.next = before;
            c.position = position;
        }
        self.column_mut(before).prev = ident;
        if prev.is_valid() {
            self.column_mut(prev).next = ident;
        }

        let new_call = self.column(ident).call;
        let next_call = self.column(before).call;
        let prev_call = if prev.is_valid() { self.column(prev).call } else { BeadId::INVALID };
        {
            let c = self.bead_mut(new_call);
            c.prev = prev_call;
            c.next = next_call;
        }
        self.bead_mut(next_call).prev = new_call;
        if prev_call.is_valid() {
            self.bead_mut(prev_call).next = new_call;
        }

        let stack: Vec<BeadId> = self.column_beads(before).collect();
        for b in stack {
            let row_prev = self.bead(b).prev;
            if row_prev.is_valid() && row_prev != bead {
                let gap = self.prepend_gap_bead(b);
                self.align_bead_to_column(ident, gap, "prepend_column");
            }
        }

        self.register_column(ma, ident);
        ident
    }

    /// Inserts a column holding `bead` right after `after`.
    ///
    /// Every row that continues from `after` into the following column gets a gap bead in the new
    /// column; rows ending at `after` do not.
    pub fn append_column(&mut self, after: ColumnId, bead: BeadId) -> ColumnId {
        let ma = self.column(after).ma_id;
        let ident = self.add_column(ma, bead);
        let next = self.column(after).next;

        {
            let position = self.column(after).position + 1;
            let c = self.column_mut(ident);
            c.prev = after;
            c.next = next;
            c.position = position;
        }
        self.column_mut(after).next = ident;
        if next.is_valid() {
            self.column_mut(next).prev = ident;
        }

        let new_call = self.column(ident).call;
        let prev_call = self.column(after).call;
        let next_call = if next.is_valid() { self.column(next).call } else { BeadId::INVALID };
        {
            let c = self.bead_mut(new_call);
            c.prev = prev_call;
            c.next = next_call;
        }
        self.bead_mut(prev_call).next = new_call;
        if next_call.is_valid() {
            self.bead_mut(next_call).prev = new_call;
        }

        let stack: Vec<BeadId> = self.column_beads(after).collect();
        for b in stack {
            let row_next = self.bead(b).next;
            if row_next.is_valid() && row_next != bead {
                let gap = self.append_gap_bead(b);
                self.align_bead_to_column(ident, gap, "append_column");
            }
        }

        self.register_column(ma, ident);
        ident
    }

    /// Adds a column to its multialign's list, updating the ends when it has no neighbour.
    fn register_column(&mut self, ma: MultiAlignId, column: ColumnId) {
        let (prev, next) = {
            let c = self.column(column);
            (c.prev, c.next)
        };
        let m = self.multi_align_mut(ma);
        m.columns.push(column);
        if prev.is_invalid() {
            m.first = column;
        }
        if next.is_invalid() {
            m.last = column;
        }
    }

    /// Splices a column holding only gap beads out of its multialign.
    ///
    /// Its gap beads are unlinked from their rows. The column itself stays in the arena.
    pub(crate) fn remove_column(&mut self, ma: MultiAlignId, column: ColumnId) {
        let stack: Vec<BeadId> = self.column_beads(column).collect();
        for b in stack {
            assert_eq!(self.base(b), GAP, "removing column {column:?} holding a base");
            self.unalign_bead_from_column(b);
            let (prev, next) = {
                let bead = self.bead(b);
                (bead.prev, bead.next)
            };
            if prev.is_valid() {
                self.bead_mut(prev).next = next;
            }
            if next.is_valid() {
                self.bead_mut(next).prev = prev;
            }
            let bead = self.bead_mut(b);
            bead.prev = BeadId::INVALID;
            bead.next = BeadId::INVALID;
        }

        let (prev, next, call) = {
            let c = self.column(column);
            (c.prev, c.next, c.call)
        };
        if prev.is_valid() {
            self.column_mut(prev).next = next;
        } else {
            self.multi_align_mut(ma).first = next;
        }
        if next.is_valid() {
            self.column_mut(next).prev = prev;
        } else {
            self.multi_align_mut(ma).last = prev;
        }

        let (prev_call, next_call) = {
            let c = self.bead(call);
            (c.prev, c.next)
        };
        if prev_call.is_valid() {
            self.bead_mut(prev_call).next = next_call;
        }
        if next_call.is_valid() {
            self.bead_mut(next_call).prev = prev_call;
        }
        {
            let c = self.bead_mut(call);
            c.prev = BeadId::INVALID;
            c.next = BeadId::INVALID;
        }
        let c = self.column_mut(column);
        c.prev = ColumnId::INVALID;
        c.next = ColumnId::INVALID;
    }

    // ------------------------------------------------------------------
    // Multialigns
    // ------------------------------------------------------------------

    /// Seeds a multialign with one column per base of `seed`.
    pub fn add_multi_align(&mut self, seed: SeqId) -> MultiAlignId {
        let ident = MultiAlignId::from_index(self.multi_aligns.len());
        self.multi_aligns.push(MultiAlign::new(ident));

        let beads = self.sequence_beads(seed);
        let mut column = self.add_column(ident, beads[0]);
        self.column_mut(column).position = 0;
        self.register_column(ident, column);
        for &bead in &beads[1..] {
            column = self.append_column(column, bead);
        }

        self.refresh_multi_align(ident, false, false);
        ident
    }

    /// Rebuilds the column list by walking the chain, renumbers positions from 0, and
    /// optionally recalls every column.
    pub fn refresh_multi_align(&mut self, ma: MultiAlignId, recall: bool, high_quality: bool) {
        let mut first = self.multi_align(ma).first;
        assert!(first.is_valid(), "multialign {ma:?} has no columns");
        while self.column(first).prev.is_valid() {
            first = self.column(first).prev;
        }

        let chain: Vec<ColumnId> = self.column_chain(first).collect();
        for (position, &column) in chain.iter().enumerate() {
            self.column_mut(column).position = position as i32;
            if recall {
                self.base_call(column, high_quality);
            }
        }

        let m = self.multi_align_mut(ma);
        m.first = first;
        m.last = chain.last().copied().unwrap_or(first);
        m.columns = chain;
    }

    // ------------------------------------------------------------------
    // Base calling
    // ------------------------------------------------------------------

    /// A tie-break source for `column` that is stable across calls.
    pub fn tie_breaker(&self, column: ColumnId) -> impl FnMut() -> u32 + use<> {
        let seed = self.seed ^ u64::from(column.get()).wrapping_mul(COLUMN_SEED_MIX);
        let mut rng: Option<StdRng> = None;
        move || rng.get_or_insert_with(|| StdRng::seed_from_u64(seed)).random::<u32>()
    }

    /// Calls a column, writing the result into its call bead.
    ///
    /// Without `high_quality` the call is the majority vote over gap/A/C/G/T; with it the
    /// maximum-posterior symbol under the quality model, falling back to the vote on an exact
    /// tie. The quality is always the model's posterior error for the called symbol. A column with
    /// nothing but `N` calls `N`.
    pub fn base_call(&mut self, column: ColumnId, high_quality: bool) -> u8 {
        let counts = *self.column(column).base_count();

        let mut likelihood = self.quality.likelihood();
        for bead in self.column_beads(column) {
            likelihood.add(self.base(bead), self.qual(bead));
        }

        let (base, qual) = if counts.depth() == counts.count(b'N') {
            (b'N', 0)
        } else {
            let voted = || counts.max_base(true, self.tie_breaker(column));
            let base = if high_quality { likelihood.call().unwrap_or_else(voted) } else { voted() };
            (base, likelihood.quality(base))
        };

        let call = self.column(column).call;
        let idx = self.bead(call).base_idx.index();
        self.bases[idx] = base;
        self.quals[idx] = qual;
        base
    }

    /// Overwrites a column's call symbol without touching its quality.
    ///
    /// # Panics
    ///
    /// Panics if `base` is not a gap or a (possibly lowercase) A/C/G/T/N.
    pub fn set_call_base(&mut self, column: ColumnId, base: u8) {
        assert!(symbol_index(base).is_some(), "invalid call base '{}'", base.escape_ascii());
        let call = self.column(column).call;
        let idx = self.bead(call).base_idx.index();
        self.bases[idx] = base;
    }

    // ------------------------------------------------------------------
    // Verification
    // ------------------------------------------------------------------

    /// Recounts every column of `ma` from its stack; returns the number of columns whose stored
    /// tallies disagree.
    pub fn check_base_counts(&self, ma: MultiAlignId) -> usize {
        let mut bad = 0;
        for column in self.column_chain(self.multi_align(ma).first) {
            let mut recount = crate::base_count::BaseCount::new();
            for bead in self.column_beads(column) {
                recount.increment(self.base(bead));
            }
            if recount != *self.column(column).base_count() {
                warn!(
                    "column {column:?} stores {:?} but holds {:?}",
                    self.column(column).base_count().counts(),
                    recount.counts()
                );
                bad += 1;
            }
        }
        bad
    }

    /// Checks the column chain and stacks of `ma`; returns the number of problems found.
    ///
    /// Verifies that walking `next` from `first` ends at `last` and matches the column list, that
    /// prev/next links agree, that every stacked bead points back at its column, and that every
    /// row is contiguous in column order.
    pub fn check_links(&self, ma: MultiAlignId) -> usize {
        let m = self.multi_align(ma);
        let mut problems = 0;

        let chain: Vec<ColumnId> =
            self.column_chain(m.first).take(self.columns.len() + 1).collect();
        if chain.len() > self.columns.len() {
            warn!("column chain of {ma:?} has a cycle");
            return 1;
        }
        if chain.last() != Some(&m.last) {
            warn!("column chain of {ma:?} does not end at {:?}", m.last);
            problems += 1;
        }
        if chain != m.columns {
            warn!("column list of {ma:?} is stale");
            problems += 1;
        }

        for pair in chain.windows(2) {
            if self.column(pair[1]).prev != pair[0] {
                warn!("column {:?} prev is not {:?}", pair[1], pair[0]);
                problems += 1;
            }
            let (a, b) = (self.column(pair[0]).call, self.column(pair[1]).call);
            if self.bead(a).next != b || self.bead(b).prev != a {
                warn!("call beads of {:?} and {:?} are not linked", pair[0], pair[1]);
                problems += 1;
            }
        }

        for &column in &chain {
            for bead in self.column_beads(column) {
                if self.bead(bead).col_idx != column {
                    warn!("bead {bead:?} stacked in {column:?} points at another column");
                    problems += 1;
                }
                let next = self.bead(bead).next;
                if next.is_valid() && self.bead(next).col_idx != self.column(column).next {
                    warn!("row of bead {bead:?} skips a column after {column:?}");
                    problems += 1;
                }
            }
        }
        problems
    }
}
