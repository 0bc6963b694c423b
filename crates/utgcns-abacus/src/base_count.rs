//! Per-column symbol tallies.

/// The gap symbol.
pub const GAP: u8 = b'-';

/// Number of symbols tracked per column: gap, A, C, G, T and N.
pub const NUM_SYMBOLS: usize = 6;

/// Symbols in tally order.
pub const SYMBOLS: [u8; NUM_SYMBOLS] = [GAP, b'A', b'C', b'G', b'T', b'N'];

const GAP_INDEX: usize = 0;
const A_INDEX: usize = 1;
const T_INDEX: usize = 4;
const N_INDEX: usize = 5;

/// Maps a base (either case) or gap to its tally slot.
#[inline]
#[must_use]
pub const fn symbol_index(base: u8) -> Option<usize> {
    match base {
        b'-' => Some(0),
        b'A' | b'a' => Some(1),
        b'C' | b'c' => Some(2),
        b'G' | b'g' => Some(3),
        b'T' | b't' => Some(4),
        b'N' | b'n' => Some(5),
        _ => None,
    }
}

#[inline]
fn slot(base: u8) -> usize {
    match symbol_index(base) {
        Some(i) => i,
        None => panic!("invalid base '{}' ({base}) in column tally", base.escape_ascii()),
    }
}

/// Occurrence counts of each symbol in one column's bead stack.
///
/// Kept in sync by the code paths that align and unalign beads; `depth` is always the sum of
/// the six counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BaseCount {
    depth: u32,
    counts: [u32; NUM_SYMBOLS],
}

impl BaseCount {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one occurrence of `base`, returning the new count for that symbol.
    ///
    /// # Panics
    ///
    /// Panics if `base` is not one of `-ACGTN` (either case).
    pub fn increment(&mut self, base: u8) -> u32 {
        let i = slot(base);
        self.counts[i] += 1;
        self.depth += 1;
        self.counts[i]
    }

    /// Removes one occurrence of `base`, returning the new count for that symbol.
    ///
    /// # Panics
    ///
    /// Panics if `base` is not a valid symbol or its count is already zero.
    pub fn decrement(&mut self, base: u8) -> u32 {
        let i = slot(base);
        assert!(self.counts[i] > 0, "decrement of '{}' below zero", base.escape_ascii());
        self.counts[i] -= 1;
        self.depth -= 1;
        self.counts[i]
    }

    #[must_use]
    pub fn count(&self, base: u8) -> u32 {
        symbol_index(base).map_or(0, |i| self.counts[i])
    }

    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Counts in [`SYMBOLS`] order.
    #[must_use]
    pub fn counts(&self) -> &[u32; NUM_SYMBOLS] {
        &self.counts
    }

    /// Number of non-gap symbols, including N.
    #[must_use]
    pub fn non_gap(&self) -> u32 {
        self.depth - self.counts[GAP_INDEX]
    }

    /// Majority symbol among gap (if `include_gap`), A, C, G and T. N never wins.
    ///
    /// When several symbols share the maximum count, every A/C/G/T symbol holding that count
    /// draws a number from `draw` and the largest draw wins. This is not a uniform choice
    /// among the tied symbols when draws repeat, and a gap tied with a base always loses.
    pub fn max_base<F: FnMut() -> u32>(&self, include_gap: bool, mut draw: F) -> u8 {
        let mut best = if include_gap { GAP_INDEX } else { A_INDEX };
        let mut tied = 0u32;

        for i in (best + 1)..N_INDEX {
            if self.counts[i] > self.counts[best] {
                best = i;
                tied = 0;
            } else if self.counts[i] == self.counts[best] {
                tied += 1;
            }
        }

        if tied > 0 {
            let max = self.counts[best];
            let mut best_draw = 0u32;
            for i in A_INDEX..=T_INDEX {
                if self.counts[i] == max {
                    let r = draw();
                    if r > best_draw {
                        best_draw = r;
                        best = i;
                    }
                }
            }
        }

        SYMBOLS[best]
    }

    /// Beads disagreeing with the majority symbol (gap included as a symbol).
    pub fn mismatch<F: FnMut() -> u32>(&self, draw: F) -> u32 {
        self.depth - self.count(self.max_base(true, draw))
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
