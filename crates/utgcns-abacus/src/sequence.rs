//! Per-read metadata inside the abacus.

use crate::ids::{BaseId, BeadId, SeqId};

/// A read ingested into the abacus.
///
/// Only the bases left after trimming `left_skip`/`right_skip` are stored; they occupy a
/// contiguous block of the base arena and of the bead arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sequence {
    pub(crate) read_id: u32,
    pub(crate) ident: SeqId,
    pub(crate) length: u32,
    pub(crate) complemented: bool,
    pub(crate) left_skip: u32,
    pub(crate) right_skip: u32,
    pub(crate) first_base: BaseId,
    pub(crate) last_base: BaseId,
    pub(crate) first_bead: BeadId,
    pub(crate) last_bead: BeadId,
}

impl Sequence {
    /// Read identifier in the read store.
    #[must_use]
    pub fn read_id(&self) -> u32 {
        self.read_id
    }

    #[must_use]
    pub fn ident(&self) -> SeqId {
        self.ident
    }

    /// Number of stored (untrimmed) bases.
    #[must_use]
    pub fn length(&self) -> u32 {
        self.length
    }

    #[must_use]
    pub fn is_complemented(&self) -> bool {
        self.complemented
    }

    #[must_use]
    pub fn left_skip(&self) -> u32 {
        self.left_skip
    }

    #[must_use]
    pub fn right_skip(&self) -> u32 {
        self.right_skip
    }

    #[must_use]
    pub fn first_base(&self) -> BaseId {
        self.first_base
    }

    #[must_use]
    pub fn last_base(&self) -> BaseId {
        self.last_base
    }

    #[must_use]
    pub fn first_bead(&self) -> BeadId {
        self.first_bead
    }

    #[must_use]
    pub fn last_bead(&self) -> BeadId {
        self.last_bead
    }

    /// Bead holding the `offset`th stored base.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is past the end of the read.
    #[must_use]
    pub fn bead_at(&self, offset: u32) -> BeadId {
        assert!(
            offset < self.length,
            "offset {offset} past end of read {} ({})",
            self.read_id,
            self.length
        );
        BeadId::new(self.first_bead.get() + offset)
    }
}
