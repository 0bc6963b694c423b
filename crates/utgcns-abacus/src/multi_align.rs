//! A multialign: the ordered column list of one tig, and the views derived from it.

use std::io::{self, Write};

use crate::abacus::Abacus;
use crate::base_count::GAP;
use crate::ids::{ColumnId, MultiAlignId, SeqId};

/// Number of columns per block written by [`Abacus::display`].
const DISPLAY_WIDTH: usize = 100;

/// Column list of one alignment.
///
/// `columns` is rebuilt from the linked list by [`Abacus::refresh_multi_align`]; between
/// refreshes it may hold newly inserted columns out of order.
#[derive(Clone, Debug)]
pub struct MultiAlign {
    pub(crate) ident: MultiAlignId,
    pub(crate) first: ColumnId,
    pub(crate) last: ColumnId,
    pub(crate) columns: Vec<ColumnId>,
}

impl MultiAlign {
    pub(crate) fn new(ident: MultiAlignId) -> Self {
        Self { ident, first: ColumnId::INVALID, last: ColumnId::INVALID, columns: Vec::new() }
    }

    #[must_use]
    pub fn ident(&self) -> MultiAlignId {
        self.ident
    }

    #[must_use]
    pub fn first_column(&self) -> ColumnId {
        self.first
    }

    #[must_use]
    pub fn last_column(&self) -> ColumnId {
        self.last
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Abacus {
    /// Gapped consensus bases and qualities, one per column from first to last.
    #[must_use]
    pub fn consensus(&self, ma: MultiAlignId) -> (Vec<u8>, Vec<u8>) {
        let mut bases = Vec::with_capacity(self.multi_align(ma).len());
        let mut quals = Vec::with_capacity(self.multi_align(ma).len());
        for column in self.column_chain(self.multi_align(ma).first_column()) {
            let call = self.column(column).call();
            bases.push(self.base(call));
            quals.push(self.qual(call));
        }
        (bases, quals)
    }

    /// Writes the consensus into caller buffers, truncating to the shorter buffer.
    ///
    /// Returns the number of columns written.
    pub fn consensus_into(&self, ma: MultiAlignId, bases: &mut [u8], quals: &mut [u8]) -> usize {
        let max = bases.len().min(quals.len());
        let mut written = 0;
        for column in self.column_chain(self.multi_align(ma).first_column()).take(max) {
            let call = self.column(column).call();
            bases[written] = self.base(call);
            quals[written] = self.qual(call);
            written += 1;
        }
        written
    }

    /// Per sequence, the span `(first column position, last column position + 1)` its row covers,
    /// or `None` for a sequence not in `ma`.
    ///
    /// Positions are those assigned by the last refresh.
    #[must_use]
    pub fn positions(&self, ma: MultiAlignId) -> Vec<Option<(i32, i32)>> {
        self.sequences()
            .iter()
            .map(|seq| {
                let first = self.bead(seq.first_bead()).col_idx();
                let last = self.bead(seq.last_bead()).col_idx();
                if first.is_invalid() || last.is_invalid() || self.column(first).ma_id() != ma {
                    return None;
                }
                Some((self.column(first).position(), self.column(last).position() + 1))
            })
            .collect()
    }

    /// One character per column for `sid`'s row: its bead's symbol, or a space where the row has
    /// no bead.
    ///
    /// Positions are those assigned by the last refresh.
    #[must_use]
    pub fn aligned_row(&self, ma: MultiAlignId, sid: SeqId) -> Vec<u8> {
        let mut row = vec![b' '; self.multi_align(ma).len()];

        let mut start = self.sequence(sid).first_bead();
        while self.bead(start).prev().is_valid() {
            start = self.bead(start).prev();
        }

        for bead in self.row_beads(start) {
            let column = self.bead(bead).col_idx();
            if column.is_invalid() {
                continue;
            }
            if let Some(slot) = usize::try_from(self.column(column).position())
                .ok()
                .and_then(|p| row.get_mut(p))
            {
                *slot = self.base(bead);
            }
        }
        row
    }

    /// Writes columns `[from, to)` of `ma` as blocks of text: a position ruler, the consensus,
    /// then one line per sequence with a bead in the block.
    ///
    /// # Errors
    ///
    /// Returns any error from `writer`.
    pub fn display<W: Write>(
        &self,
        ma: MultiAlignId,
        from: usize,
        to: usize,
        writer: &mut W,
    ) -> io::Result<()> {
        let (consensus, _) = self.consensus(ma);
        let to = to.min(consensus.len());
        if from >= to {
            return Ok(());
        }

        let rows: Vec<(u32, bool, Vec<u8>)> = self
            .sequences()
            .iter()
            .map(|seq| (seq.read_id(), seq.is_complemented(), self.aligned_row(ma, seq.ident())))
            .collect();

        let mut block = from;
        while block < to {
            let end = (block + DISPLAY_WIDTH).min(to);

            write!(writer, "{:>12} ", "")?;
            for pos in (block..end).step_by(10) {
                let label = pos.to_string();
                let width = 10.min(end - pos);
                write!(writer, "{:<width$}", &label[..label.len().min(width)])?;
            }
            writeln!(writer)?;

            let calls = String::from_utf8_lossy(&consensus[block..end]);
            writeln!(writer, "{:>12} {calls}", "consensus")?;

            for (read_id, complemented, row) in &rows {
                let slice = &row[block..end];
                if slice.iter().all(|&c| c == b' ') {
                    continue;
                }
                let strand = if *complemented { '<' } else { '>' };
                writeln!(
                    writer,
                    "{:>11}{} {}",
                    read_id,
                    strand,
                    String::from_utf8_lossy(slice)
                )?;
            }
            writeln!(writer)?;
            block = end;
        }
        Ok(())
    }

    /// Number of gap calls in the consensus.
    #[must_use]
    pub fn consensus_gaps(&self, ma: MultiAlignId) -> usize {
        self.column_chain(self.multi_align(ma).first_column())
            .filter(|&c| self.base(self.column(c).call()) == GAP)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use crate::AlignTarget;
    use crate::abacus::Abacus;
    use crate::abacus::tests::TestStore;

    #[test]
    fn test_consensus_into_truncates() {
        let store = TestStore::with(&[(1, "GATTACA")]);
        let mut abacus = Abacus::new();
        let sid = abacus.add_read(&store, 1, 0, 0, false).unwrap();
        let ma = abacus.add_multi_align(sid);

        let mut bases = [0u8; 4];
        let mut quals = [0u8; 4];
        assert_eq!(abacus.consensus_into(ma, &mut bases, &mut quals), 4);
        assert_eq!(&bases, b"GATT");

        let mut bases = [0u8; 10];
        let mut quals = [0u8; 10];
        assert_eq!(abacus.consensus_into(ma, &mut bases, &mut quals), 7);
        assert_eq!(quals[0], 30);
    }

    #[test]
    fn test_positions_of_unaligned_sequence() {
        let store = TestStore::with(&[(1, "ACGT"), (2, "ACGT")]);
        let mut abacus = Abacus::new();
        let a = abacus.add_read(&store, 1, 0, 0, false).unwrap();
        abacus.add_read(&store, 2, 0, 0, false).unwrap();
        let ma = abacus.add_multi_align(a);
        assert_eq!(abacus.positions(ma), vec![Some((0, 4)), None]);
    }

    #[test]
    fn test_display_shows_rows() {
        let store = TestStore::with(&[(10, "ACGTACGT"), (20, "ACGTTACGT")]);
        let mut abacus = Abacus::new();
        let a = abacus.add_read(&store, 10, 0, 0, false).unwrap();
        let b = abacus.add_read(&store, 20, 0, 0, false).unwrap();
        let ma = abacus.add_multi_align(a);
        abacus.apply_alignment(AlignTarget::Sequence(a), b, 0, 0, Some(&[-5]));
        abacus.refresh_multi_align(ma, true, false);

        let mut out = Vec::new();
        abacus.display(ma, 0, usize::MAX, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("consensus ACGT"), "{text}");
        assert!(text.contains("10> ACGT-ACGT"), "{text}");
        assert!(text.contains("20> ACGTTACGT"), "{text}");
        assert_eq!(abacus.consensus_gaps(ma), 0);
    }

    #[test]
    fn test_display_empty_range() {
        let store = TestStore::with(&[(1, "ACGT")]);
        let mut abacus = Abacus::new();
        let a = abacus.add_read(&store, 1, 0, 0, false).unwrap();
        let ma = abacus.add_multi_align(a);
        let mut out = Vec::new();
        abacus.display(ma, 3, 2, &mut out).unwrap();
        assert!(out.is_empty());
    }
}
