//! One residue placed in the alignment.

use crate::ids::{BaseId, BeadId, ColumnId, SeqId};

/// A single residue instance inside the abacus.
///
/// Beads are linked two ways: `prev`/`next` along a row (a read, or the chain of call beads)
/// and `up`/`down` inside a column's stack. Read beads carry a [`SeqId`]; call beads do not.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bead {
    pub(crate) ident: BeadId,
    pub(crate) base_idx: BaseId,
    pub(crate) seq_offset: Option<u32>,
    pub(crate) seq_idx: SeqId,
    pub(crate) prev: BeadId,
    pub(crate) next: BeadId,
    pub(crate) up: BeadId,
    pub(crate) down: BeadId,
    pub(crate) col_idx: ColumnId,
}

impl Bead {
    pub(crate) fn new(
        ident: BeadId,
        base_idx: BaseId,
        seq_idx: SeqId,
        seq_offset: Option<u32>,
    ) -> Self {
        Self {
            ident,
            base_idx,
            seq_offset,
            seq_idx,
            prev: BeadId::INVALID,
            next: BeadId::INVALID,
            up: BeadId::INVALID,
            down: BeadId::INVALID,
            col_idx: ColumnId::INVALID,
        }
    }

    #[must_use]
    pub fn ident(&self) -> BeadId {
        self.ident
    }

    #[must_use]
    pub fn base_idx(&self) -> BaseId {
        self.base_idx
    }

    /// Offset of this residue in its read, `None` for gap and call beads.
    #[must_use]
    pub fn seq_offset(&self) -> Option<u32> {
        self.seq_offset
    }

    #[must_use]
    pub fn seq_idx(&self) -> SeqId {
        self.seq_idx
    }

    #[must_use]
    pub fn prev(&self) -> BeadId {
        self.prev
    }

    #[must_use]
    pub fn next(&self) -> BeadId {
        self.next
    }

    #[must_use]
    pub fn up(&self) -> BeadId {
        self.up
    }

    #[must_use]
    pub fn down(&self) -> BeadId {
        self.down
    }

    #[must_use]
    pub fn col_idx(&self) -> ColumnId {
        self.col_idx
    }

    /// True for the consensus bead heading a column.
    #[must_use]
    pub fn is_call(&self) -> bool {
        self.seq_idx.is_invalid()
    }

    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.col_idx.is_valid()
    }
}
