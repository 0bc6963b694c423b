//! Borrowing walks over rows, column stacks and column chains.

use crate::abacus::Abacus;
use crate::ids::{BeadId, ColumnId};

/// Read beads stacked in one column, top to bottom. The call bead is not included.
pub struct ColumnBeads<'a> {
    abacus: &'a Abacus,
    next: BeadId,
}

impl<'a> ColumnBeads<'a> {
    pub(crate) fn new(abacus: &'a Abacus, column: ColumnId) -> Self {
        let call = abacus.column(column).call();
        Self { abacus, next: abacus.bead(call).down() }
    }
}

impl Iterator for ColumnBeads<'_> {
    type Item = BeadId;

    fn next(&mut self) -> Option<BeadId> {
        if self.next.is_invalid() {
            return None;
        }
        let current = self.next;
        self.next = self.abacus.bead(current).down();
        Some(current)
    }
}

/// Beads along a row via `next`, starting at (and including) a given bead.
pub struct RowBeads<'a> {
    abacus: &'a Abacus,
    next: BeadId,
}

impl<'a> RowBeads<'a> {
    pub(crate) fn new(abacus: &'a Abacus, start: BeadId) -> Self {
        Self { abacus, next: start }
    }
}

impl Iterator for RowBeads<'_> {
    type Item = BeadId;

    fn next(&mut self) -> Option<BeadId> {
        if self.next.is_invalid() {
            return None;
        }
        let current = self.next;
        self.next = self.abacus.bead(current).next();
        Some(current)
    }
}

/// Columns along the `next` chain, starting at (and including) a given column.
pub struct ColumnChain<'a> {
    abacus: &'a Abacus,
    next: ColumnId,
}

impl<'a> ColumnChain<'a> {
    pub(crate) fn new(abacus: &'a Abacus, start: ColumnId) -> Self {
        Self { abacus, next: start }
    }
}

impl Iterator for ColumnChain<'_> {
    type Item = ColumnId;

    fn next(&mut self) -> Option<ColumnId> {
        if self.next.is_invalid() {
            return None;
        }
        let current = self.next;
        self.next = self.abacus.column(current).next();
        Some(current)
    }
}
