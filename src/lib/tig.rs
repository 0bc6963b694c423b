//! Tigs and the placements of their children.
//!
//! A tig is one assembled layout: a list of children (reads, for consensus) each placed at an
//! approximate interval of the layout, plus the consensus once it has been computed.

use std::fmt;

use utgcns_abacus::GAP;

/// What a tig child refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChildKind {
    Read,
    Unitig,
    Contig,
}

impl ChildKind {
    /// The keyword used for this kind in layout files.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            ChildKind::Read => "read",
            ChildKind::Unitig => "unitig",
            ChildKind::Contig => "contig",
        }
    }

    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "read" => Some(ChildKind::Read),
            "unitig" => Some(ChildKind::Unitig),
            "contig" => Some(ChildKind::Contig),
            _ => None,
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Placement of one child in a tig.
///
/// The interval is stored as `min < max` plus an orientation flag; [`TgPosition::bgn`] and
/// [`TgPosition::end`] give the layout convention where a reverse child has `bgn > end`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TgPosition {
    pub ident: u32,
    pub kind: ChildKind,
    pub reverse: bool,
    /// Child this one was placed relative to by the layout stage.
    pub anchor: Option<u32>,
    /// Offset of this child's start from the anchor's start.
    pub a_hang: i32,
    /// Offset of this child's end from the anchor's end.
    pub b_hang: i32,
    /// Bases excluded from the start of the (oriented) read.
    pub a_skip: u32,
    /// Bases excluded from the end of the (oriented) read.
    pub b_skip: u32,
    pub min: i32,
    pub max: i32,
}

impl TgPosition {
    /// A child placed at `bgn..end` in layout convention.
    #[must_use]
    pub fn new(kind: ChildKind, ident: u32, bgn: i32, end: i32) -> Self {
        Self {
            ident,
            kind,
            reverse: bgn > end,
            anchor: None,
            a_hang: 0,
            b_hang: 0,
            a_skip: 0,
            b_skip: 0,
            min: bgn.min(end),
            max: bgn.max(end),
        }
    }

    /// A read placed at `bgn..end`.
    #[must_use]
    pub fn read(ident: u32, bgn: i32, end: i32) -> Self {
        Self::new(ChildKind::Read, ident, bgn, end)
    }

    #[must_use]
    pub fn with_anchor(mut self, anchor: u32, a_hang: i32, b_hang: i32) -> Self {
        self.anchor = Some(anchor);
        self.a_hang = a_hang;
        self.b_hang = b_hang;
        self
    }

    #[must_use]
    pub fn with_skips(mut self, a_skip: u32, b_skip: u32) -> Self {
        self.a_skip = a_skip;
        self.b_skip = b_skip;
        self
    }

    #[must_use]
    pub fn is_read(&self) -> bool {
        self.kind == ChildKind::Read
    }

    #[must_use]
    pub fn bgn(&self) -> i32 {
        if self.reverse { self.max } else { self.min }
    }

    #[must_use]
    pub fn end(&self) -> i32 {
        if self.reverse { self.min } else { self.max }
    }

    /// Length of the placed interval.
    #[must_use]
    pub fn span(&self) -> i32 {
        self.max - self.min
    }

    /// Moves the interval, keeping the orientation.
    pub fn set_min_max(&mut self, min: i32, max: i32) {
        self.min = min;
        self.max = max;
    }

    /// True if this child's interval lies within `other`'s.
    #[must_use]
    pub fn is_contained_in(&self, other: &TgPosition) -> bool {
        other.min <= self.min && self.max <= other.max
    }
}

/// One layout and, once computed, its consensus.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tig {
    pub ident: u32,
    pub layout_len: u32,
    /// Gapped consensus bases; empty until computed.
    pub bases: Vec<u8>,
    /// Qualities (raw phred) parallel to `bases`.
    pub quals: Vec<u8>,
    pub coverage_stat: f64,
    pub suggest_repeat: bool,
    pub suggest_unique: bool,
    pub suggest_circular: bool,
    pub suggest_haploid: bool,
    pub children: Vec<TgPosition>,
}

impl Tig {
    #[must_use]
    pub fn new(ident: u32) -> Self {
        Self { ident, coverage_stat: 1.0, ..Self::default() }
    }

    #[must_use]
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn has_consensus(&self) -> bool {
        !self.bases.is_empty()
    }

    #[must_use]
    pub fn gapped_length(&self) -> usize {
        self.bases.len()
    }

    /// Consensus bases without gap columns.
    #[must_use]
    pub fn ungapped_bases(&self) -> Vec<u8> {
        self.bases.iter().copied().filter(|&b| b != GAP).collect()
    }

    /// Qualities of the non-gap consensus columns.
    #[must_use]
    pub fn ungapped_quals(&self) -> Vec<u8> {
        self.bases.iter().zip(&self.quals).filter(|&(&b, _)| b != GAP).map(|(_, &q)| q).collect()
    }

    #[must_use]
    pub fn ungapped_length(&self) -> usize {
        self.bases.iter().filter(|&&b| b != GAP).count()
    }

    /// The recorded layout length, or the furthest child end when none is recorded.
    #[must_use]
    pub fn layout_length(&self) -> u32 {
        if self.layout_len > 0 {
            return self.layout_len;
        }
        self.children.iter().map(|c| c.max.max(0) as u32).max().unwrap_or(0)
    }

    /// Number of bases covered by children.
    #[must_use]
    pub fn child_bases(&self) -> u64 {
        self.children.iter().map(|c| c.span().max(0) as u64).sum()
    }
}
