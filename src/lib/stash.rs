//! Setting aside contained reads to cap the depth a consensus is computed from.
//!
//! A child is contained when its layout span lies inside another child's span; of two children
//! with the same span, the later one is contained. Non-contained children are always kept, since
//! they carry the tig from end to end. Contained children are then kept longest first until the
//! kept bases reach `max_coverage` times the layout length, and the rest are stashed.
//!
//! After consensus, [`Stash::restore`] puts the stashed children back at their original index
//! with their layout positions.

use log::info;

use crate::tig::{TgPosition, Tig};
use crate::unitig_consensus::TigConsensusReport;

/// The children of a tig before stashing and which of them were handed to consensus.
#[derive(Clone, Debug, PartialEq)]
pub struct Stash {
    original: Vec<TgPosition>,
    kept: Vec<bool>,
    kept_bases: u64,
    layout_len: u64,
}

impl Stash {
    /// Removes contained children from `tig` until the remaining depth is below `max_coverage`.
    ///
    /// Returns `None`, leaving `tig` untouched, when nothing needs to be stashed.
    pub fn contained(tig: &mut Tig, max_coverage: f64) -> Option<Self> {
        if max_coverage <= 0.0 || tig.children.len() < 2 {
            return None;
        }

        let layout_len = u64::from(tig.layout_length());
        let children = &tig.children;
        if layout_len == 0 {
            return None;
        }

        let contained: Vec<bool> = (0..children.len())
            .map(|i| {
                children.iter().enumerate().any(|(j, other)| {
                    j != i
                        && children[i].is_contained_in(other)
                        && (children[i].span() < other.span() || j < i)
                })
            })
            .collect();

        let mut kept: Vec<bool> = contained.iter().map(|&c| !c).collect();
        let mut kept_bases: u64 =
            children.iter().zip(&kept).filter(|(_, k)| **k).map(|(c, _)| c.span() as u64).sum();

        let mut candidates: Vec<usize> = (0..children.len()).filter(|&i| contained[i]).collect();
        candidates.sort_by_key(|&i| (std::cmp::Reverse(children[i].span()), i));
        for i in candidates {
            if (kept_bases as f64) / (layout_len as f64) >= max_coverage {
                break;
            }
            kept[i] = true;
            kept_bases += children[i].span() as u64;
        }

        if kept.iter().all(|&k| k) {
            return None;
        }

        let original = std::mem::take(&mut tig.children);
        tig.children =
            original.iter().zip(&kept).filter(|(_, k)| **k).map(|(c, _)| c.clone()).collect();
        let stash = Self { original, kept, kept_bases, layout_len };
        info!(
            "tig {} stashed {} contained reads, kept {} reads at {:.2}x coverage",
            tig.ident,
            stash.num_stashed(),
            stash.num_kept(),
            stash.coverage()
        );
        Some(stash)
    }

    #[must_use]
    pub fn num_kept(&self) -> usize {
        self.kept.iter().filter(|&&k| k).count()
    }

    #[must_use]
    pub fn num_stashed(&self) -> usize {
        self.kept.len() - self.num_kept()
    }

    /// Depth of the kept children over the layout length.
    #[must_use]
    pub fn coverage(&self) -> f64 {
        self.kept_bases as f64 / self.layout_len as f64
    }

    /// Puts every child back as it was before stashing.
    pub fn undo(self, tig: &mut Tig) {
        tig.children = self.original;
    }

    /// Merges the stashed children back into `tig`, whose children are the exported result of
    /// consensus over the kept ones.
    ///
    /// `report.failed` is indexed by kept child. Failed children were dropped by the export
    /// unless `keep_failed` was set.
    pub fn restore(self, tig: &mut Tig, report: &TigConsensusReport, keep_failed: bool) {
        let mut exported = std::mem::take(&mut tig.children).into_iter();
        let mut failed = report.failed.iter();
        let mut children = Vec::with_capacity(self.original.len());

        for (child, kept) in self.original.into_iter().zip(self.kept) {
            if !kept {
                children.push(child);
                continue;
            }
            let was_failed = failed.next().copied().unwrap_or(false);
            if was_failed && !keep_failed {
                continue;
            }
            if let Some(placed) = exported.next() {
                children.push(placed);
            }
        }
        tig.children = children;
    }
}
