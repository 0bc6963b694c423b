//! Structural clean-up of a multialign.
//!
//! Pairwise construction scatters equivalent gaps across neighbouring columns. [`Abacus::refine`]
//! re-justifies gap beads inside small windows so that equivalent gaps line up, and
//! [`Abacus::merge_refine`] then folds compatible neighbouring columns together and drops columns
//! left without any base.

use ahash::AHashMap;
use log::{debug, trace};

use crate::abacus::Abacus;
use crate::base_count::{BaseCount, GAP};
use crate::ids::{BeadId, ColumnId, MultiAlignId, SeqId};

/// Mixed columns closer than this are refined in the same window.
pub const STABWIDTH: usize = 6;

/// Largest window, in columns, handed to one refinement.
pub const MAX_WINDOW_FOR_ABACUS_REFINE: usize = 100;

/// Which artifacts a refinement pass looks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefineLevel {
    /// Any column holding both gaps and bases.
    Smooth,
    /// Homopolymer runs whose gaps are spread over the run.
    PolyX,
    /// Clusters of two or more mixed columns, i.e. a block indel split over several columns.
    Indel,
}

/// A row's contiguous stretch of beads inside a window.
struct RowSegment {
    lo: usize,
    beads: Vec<BeadId>,
    symbols: Vec<u8>,
    pin_first: bool,
    pin_last: bool,
}

impl RowSegment {
    /// Bead order after pushing every movable base to one side of the segment.
    ///
    /// Returns, for each slot of the segment, the index of the bead that ends up there. Bases keep
    /// their relative order, as do gaps. A pinned first or last base stays where it is.
    fn justify(&self, left: bool) -> Vec<usize> {
        let n = self.symbols.len();
        let mut bases: Vec<usize> = (0..n).filter(|&i| self.symbols[i] != GAP).collect();
        let gaps: Vec<usize> = (0..n).filter(|&i| self.symbols[i] == GAP).collect();
        if bases.is_empty() || gaps.is_empty() {
            return (0..n).collect();
        }

        let head = if self.pin_first { Some(bases.remove(0)) } else { None };
        let tail = if self.pin_last { bases.pop() } else { None };

        let mut order = Vec::with_capacity(n);
        order.extend(head);
        if left {
            order.extend(&bases);
            order.extend(&gaps);
        } else {
            order.extend(&gaps);
            order.extend(&bases);
        }
        order.extend(tail);
        order
    }
}

/// Sum over columns of beads disagreeing with the column's most frequent symbol.
fn window_score(rows: &[RowSegment], orders: &[Vec<usize>], width: usize) -> u32 {
    let mut counts = vec![BaseCount::new(); width];
    for (row, order) in rows.iter().zip(orders) {
        for (slot, &i) in order.iter().enumerate() {
            counts[row.lo + slot].increment(row.symbols[i]);
        }
    }
    counts.iter().map(|c| c.depth() - c.counts().iter().copied().max().unwrap_or(0)).sum()
}

fn is_identity(order: &[usize]) -> bool {
    order.iter().enumerate().all(|(slot, &i)| slot == i)
}

impl Abacus {
    fn is_mixed(&self, column: ColumnId) -> bool {
        let counts = self.column(column).base_count();
        counts.count(GAP) > 0 && counts.non_gap() > 0
    }

    fn majority(&self, column: ColumnId) -> u8 {
        self.column(column).base_count().max_base(true, || 0)
    }

    /// Re-justifies gaps in windows of columns `[from, to)` chosen by `level`, repeating until a
    /// pass finds nothing to improve.
    ///
    /// Returns the total reduction in disagreeing beads; zero when the multialign was already
    /// refined. Columns are neither added nor removed.
    pub fn refine(&mut self, ma: MultiAlignId, level: RefineLevel, from: usize, to: usize) -> u32 {
        self.refresh_multi_align(ma, false, false);

        let mut total = 0;
        let mut passes = 0;
        loop {
            let columns = self.multi_align(ma).columns().to_vec();
            let to = to.min(columns.len());
            if from >= to {
                break;
            }
            let range = &columns[from..to];

            let mut improved = 0;
            for (lo, hi) in self.refine_windows(range, level) {
                improved += self.refine_window(&range[lo..=hi]);
            }
            passes += 1;
            if improved == 0 {
                break;
            }
            total += improved;
        }

        debug!("refine {level:?} of {ma:?}: improved by {total} in {passes} passes");
        total
    }

    /// Windows `(lo, hi)`, inclusive and non-overlapping, over `columns`.
    fn refine_windows(&self, columns: &[ColumnId], level: RefineLevel) -> Vec<(usize, usize)> {
        let len = columns.len();
        let mixed: Vec<bool> = columns.iter().map(|&c| self.is_mixed(c)).collect();

        let mut windows = Vec::new();
        let mut free = 0;
        let mut i = 0;
        while i < len {
            let (start, end, triggered) = match level {
                RefineLevel::Smooth | RefineLevel::Indel => {
                    if !mixed[i] {
                        i += 1;
                        continue;
                    }
                    let mut end = i;
                    let mut n = 1;
                    while let Some(k) =
                        (end + 1..(end + 1 + STABWIDTH).min(len)).find(|&k| mixed[k])
                    {
                        end = k;
                        n += 1;
                    }
                    (i, end, level == RefineLevel::Smooth || n >= 2)
                }
                RefineLevel::PolyX => {
                    let base = self.majority(columns[i]);
                    if base == GAP {
                        i += 1;
                        continue;
                    }
                    let mut end = i;
                    while end + 1 < len {
                        let next = self.majority(columns[end + 1]);
                        if next != base && next != GAP {
                            break;
                        }
                        end += 1;
                    }
                    while end > i && self.majority(columns[end]) == GAP {
                        end -= 1;
                    }
                    let runs = (i..=end).filter(|&k| self.majority(columns[k]) == base).count();
                    (i, end, runs >= 2 && mixed[i..=end].iter().any(|&m| m))
                }
            };

            if triggered {
                let lo = start.saturating_sub(1).max(free);
                let hi = (end + 1).min(len - 1).min(lo + MAX_WINDOW_FOR_ABACUS_REFINE - 1);
                windows.push((lo, hi));
                free = hi + 1;
                i = hi + 1;
            } else {
                i = end + 1;
            }
        }
        windows
    }

    /// Applies the better of the left- and right-justified layouts of one window, if it beats the
    /// current layout. Returns the score improvement.
    fn refine_window(&mut self, columns: &[ColumnId]) -> u32 {
        let width = columns.len();

        let mut order: Vec<SeqId> = Vec::new();
        let mut grid: AHashMap<SeqId, Vec<BeadId>> = AHashMap::new();
        for (k, &column) in columns.iter().enumerate() {
            for bead in self.column_beads(column) {
                let sid = self.bead(bead).seq_idx();
                let cells = grid.entry(sid).or_insert_with(|| {
                    order.push(sid);
                    vec![BeadId::INVALID; width]
                });
                cells[k] = bead;
            }
        }

        let mut rows = Vec::with_capacity(order.len());
        for sid in &order {
            let cells = &grid[sid];
            let (Some(lo), Some(hi)) =
                (cells.iter().position(|b| b.is_valid()), cells.iter().rposition(|b| b.is_valid()))
            else {
                continue;
            };
            let beads = cells[lo..=hi].to_vec();
            assert!(
                beads.iter().all(|b| b.is_valid()),
                "row of {sid:?} is not contiguous across columns {:?}",
                &columns[lo..=hi]
            );
            rows.push(RowSegment {
                lo,
                symbols: beads.iter().map(|&b| self.base(b)).collect(),
                pin_first: self.bead(beads[0]).prev().is_invalid(),
                pin_last: self.bead(beads[beads.len() - 1]).next().is_invalid(),
                beads,
            });
        }

        let current: Vec<Vec<usize>> = rows.iter().map(|r| (0..r.beads.len()).collect()).collect();
        let left: Vec<Vec<usize>> = rows.iter().map(|r| r.justify(true)).collect();
        let right: Vec<Vec<usize>> = rows.iter().map(|r| r.justify(false)).collect();

        let score = window_score(&rows, &current, width);
        let left_score = window_score(&rows, &left, width);
        let right_score = window_score(&rows, &right, width);
        trace!(
            "refine window {:?}..{:?}: score {score}, left {left_score}, right {right_score}",
            columns[0],
            columns[width - 1]
        );

        let (best, best_score) =
            if left_score <= right_score { (left, left_score) } else { (right, right_score) };
        if best_score >= score {
            return 0;
        }

        for (row, new_order) in rows.iter().zip(&best) {
            if !is_identity(new_order) {
                self.reorder_row_segment(row, new_order, columns);
            }
        }
        score - best_score
    }

    /// Moves a row's beads so that slot `k` of the segment holds bead `new_order[k]`.
    fn reorder_row_segment(&mut self, row: &RowSegment, new_order: &[usize], columns: &[ColumnId]) {
        let n = row.beads.len();
        let outer_prev = self.bead(row.beads[0]).prev();
        let outer_next = self.bead(row.beads[n - 1]).next();
        let beads: Vec<BeadId> = new_order.iter().map(|&i| row.beads[i]).collect();

        for (slot, &i) in new_order.iter().enumerate() {
            if slot != i {
                self.unalign_bead_from_column(row.beads[i]);
            }
        }

        for (slot, &bead) in beads.iter().enumerate() {
            let prev = if slot == 0 { outer_prev } else { beads[slot - 1] };
            let next = if slot + 1 == n { outer_next } else { beads[slot + 1] };
            let b = self.bead_mut(bead);
            b.prev = prev;
            b.next = next;
        }
        if outer_prev.is_valid() {
            self.bead_mut(outer_prev).next = beads[0];
        }
        if outer_next.is_valid() {
            self.bead_mut(outer_next).prev = beads[n - 1];
        }

        for (slot, &i) in new_order.iter().enumerate() {
            if slot != i {
                self.align_bead_to_column(columns[row.lo + slot], row.beads[i], "refine");
            }
        }
    }

    /// Merges compatible neighbouring columns, strips gap beads from row ends and removes columns
    /// without bases, until nothing changes; then renumbers and recalls every column.
    pub fn merge_refine(&mut self, ma: MultiAlignId, high_quality: bool) {
        let mut merged = 0;
        let mut removed = 0;
        loop {
            self.refresh_multi_align(ma, false, false);
            let columns = self.multi_align(ma).columns().to_vec();
            let mut changed = 0;

            for pair in columns.windows(2) {
                if self.merge_columns(pair[0], pair[1]) {
                    merged += 1;
                    changed += 1;
                }
            }

            changed += self.strip_row_end_gaps(ma);

            let mut remaining = columns.len();
            for &column in &columns {
                if remaining > 1 && self.column(column).base_count().non_gap() == 0 {
                    self.remove_column(ma, column);
                    remaining -= 1;
                    removed += 1;
                    changed += 1;
                }
            }

            if changed == 0 {
                break;
            }
        }

        self.refresh_multi_align(ma, true, high_quality);
        debug!(
            "merge_refine of {ma:?}: {merged} merges, {removed} columns removed, {} columns left",
            self.multi_align(ma).len()
        );
    }

    /// Folds the bases of a gap-majority column into its neighbour when no row has a base in both.
    fn merge_columns(&mut self, column: ColumnId, next: ColumnId) -> bool {
        let (cc, nc) = (*self.column(column).base_count(), *self.column(next).base_count());
        if cc.non_gap() == 0 || nc.non_gap() == 0 {
            return false;
        }

        let conflict = self.column_beads(column).any(|bead| {
            let following = self.bead(bead).next();
            self.base(bead) != GAP
                && following.is_valid()
                && self.bead(following).col_idx() == next
                && self.base(following) != GAP
        });
        if conflict {
            return false;
        }

        let gap_majority = |counts: &BaseCount| counts.count(GAP) > counts.non_gap();
        if gap_majority(&nc) {
            self.move_bases_left(column, next);
        } else if gap_majority(&cc) {
            self.move_bases_right(column, next);
        } else {
            return false;
        }
        trace!("merged columns {column:?} and {next:?}");
        true
    }

    fn move_bases_left(&mut self, column: ColumnId, next: ColumnId) {
        let donors: Vec<BeadId> =
            self.column_beads(next).filter(|&b| self.base(b) != GAP).collect();
        for bead in donors {
            let prev = self.bead(bead).prev();
            if prev.is_valid() {
                assert_eq!(self.bead(prev).col_idx(), column, "row of {bead:?} skips {column:?}");
                self.lateral_exchange_bead(prev, bead);
            } else {
                self.unalign_bead_from_column(bead);
                self.align_bead_to_column(column, bead, "merge_columns");
                if self.bead(bead).next().is_valid() {
                    let gap = self.append_gap_bead(bead);
                    self.align_bead_to_column(next, gap, "merge_columns");
                }
            }
        }
    }

    fn move_bases_right(&mut self, column: ColumnId, next: ColumnId) {
        let donors: Vec<BeadId> =
            self.column_beads(column).filter(|&b| self.base(b) != GAP).collect();
        for bead in donors {
            let following = self.bead(bead).next();
            if following.is_valid() {
                assert_eq!(self.bead(following).col_idx(), next, "row of {bead:?} skips {next:?}");
                self.lateral_exchange_bead(bead, following);
            } else {
                self.unalign_bead_from_column(bead);
                self.align_bead_to_column(next, bead, "merge_columns");
                if self.bead(bead).prev().is_valid() {
                    let gap = self.prepend_gap_bead(bead);
                    self.align_bead_to_column(column, gap, "merge_columns");
                }
            }
        }
    }

    /// Removes leading and trailing gap beads from every row aligned in `ma`.
    fn strip_row_end_gaps(&mut self, ma: MultiAlignId) -> usize {
        let mut stripped = 0;
        for s in 0..self.num_sequences() {
            let first = self.sequence(SeqId::from_index(s)).first_bead();
            let column = self.bead(first).col_idx();
            if column.is_invalid() || self.column(column).ma_id() != ma {
                continue;
            }
            stripped += self.unalign_leading_gap_beads(first);
            stripped += self.unalign_trailing_gap_beads(first);
        }
        stripped
    }
}
