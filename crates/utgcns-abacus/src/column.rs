//! A vertical slice of the alignment.

use crate::base_count::BaseCount;
use crate::ids::{BeadId, ColumnId, MultiAlignId};

/// One consensus position: a call bead heading a stack of read beads.
///
/// Columns form a doubly linked list through `prev`/`next`. `position` is signed because new
/// columns are numbered relative to a neighbour before the owning multialign is renumbered.
#[derive(Clone, Debug)]
pub struct Column {
    pub(crate) ident: ColumnId,
    pub(crate) call: BeadId,
    pub(crate) prev: ColumnId,
    pub(crate) next: ColumnId,
    pub(crate) ma_id: MultiAlignId,
    pub(crate) position: i32,
    pub(crate) base_count: BaseCount,
}

impl Column {
    pub(crate) fn new(ident: ColumnId, ma_id: MultiAlignId) -> Self {
        Self {
            ident,
            call: BeadId::INVALID,
            prev: ColumnId::INVALID,
            next: ColumnId::INVALID,
            ma_id,
            position: 0,
            base_count: BaseCount::new(),
        }
    }

    #[must_use]
    pub fn ident(&self) -> ColumnId {
        self.ident
    }

    #[must_use]
    pub fn call(&self) -> BeadId {
        self.call
    }

    #[must_use]
    pub fn prev(&self) -> ColumnId {
        self.prev
    }

    #[must_use]
    pub fn next(&self) -> ColumnId {
        self.next
    }

    #[must_use]
    pub fn ma_id(&self) -> MultiAlignId {
        self.ma_id
    }

    #[must_use]
    pub fn position(&self) -> i32 {
        self.position
    }

    #[must_use]
    pub fn base_count(&self) -> &BaseCount {
        &self.base_count
    }

    /// Number of read beads (gaps included) stacked under the call.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.base_count.depth()
    }
}
