//! Pairwise alignment of a read against a consensus window.
//!
//! The consensus driver only needs the aligned extents, an error rate and a run-length indel
//! encoding ("delta") of one alignment; [`PairwiseAligner`] is that contract. [`OverlapAligner`]
//! implements it with rust-bio's k-mer seeded, banded affine-gap aligner.
//!
//! # Delta encoding
//!
//! Each entry describes one indel relative to the previous one (or to the alignment start):
//!
//! * `+k`: `k - 1` aligned columns, then a base of A opposite a gap in B;
//! * `-k`: `k - 1` aligned columns, then a base of B opposite a gap in A.
//!
//! Aligned columns after the last indel are implicit.

use std::ops::Range;

use bio::alignment::AlignmentOperation;
use bio::alignment::pairwise::{MIN_SCORE, Scoring, banded};
use bio::alignment::sparse;
use log::trace;

/// Columns per window of the local error scan.
const BADNESS_WINDOW: usize = 100;

/// How much of the two sequences must take part in the alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignmentMode {
    /// Local: both sequences may be clipped at both ends.
    Partial,
    /// Overlap: A may be clipped freely, B only where a hang is allowed.
    Overlap,
}

/// Shape of an accepted alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignmentKind {
    /// Reaches a start of A or B and an end of A or B.
    Dovetail,
    /// Leaves unaligned sequence on both sides of at least one end.
    Branch,
}

/// Parameters of one alignment.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignmentRequest {
    pub mode: AlignmentMode,
    /// B may start before A (B's prefix may go unaligned).
    pub allow_a_hang: bool,
    /// B may end after A (B's suffix may go unaligned).
    pub allow_b_hang: bool,
    /// Reject alignments with a higher overall error rate.
    pub max_error_rate: f64,
    /// Reject alignments with any window above this local error rate, unless forced.
    pub error_rate_max: f64,
    /// Reject alignments shorter than this in either sequence.
    pub min_overlap: usize,
    /// Skip the local error scan.
    pub forced: bool,
}

impl AlignmentRequest {
    #[must_use]
    pub fn partial(max_error_rate: f64, error_rate_max: f64, min_overlap: usize) -> Self {
        Self {
            mode: AlignmentMode::Partial,
            allow_a_hang: true,
            allow_b_hang: true,
            max_error_rate,
            error_rate_max,
            min_overlap,
            forced: false,
        }
    }

    #[must_use]
    pub fn overlap(
        allow_a_hang: bool,
        allow_b_hang: bool,
        max_error_rate: f64,
        error_rate_max: f64,
        min_overlap: usize,
    ) -> Self {
        Self {
            mode: AlignmentMode::Overlap,
            allow_a_hang,
            allow_b_hang,
            max_error_rate,
            error_rate_max,
            min_overlap,
            forced: false,
        }
    }

    #[must_use]
    pub fn forced(mut self, forced: bool) -> Self {
        self.forced = forced;
        self
    }
}

/// An accepted alignment of B against A. Coordinates are 0-based, half-open.
#[derive(Clone, Debug, PartialEq)]
pub struct PairwiseAlignment {
    pub a_bgn: usize,
    pub a_end: usize,
    pub b_bgn: usize,
    pub b_end: usize,
    pub error_rate: f64,
    pub delta: Vec<i32>,
    pub kind: AlignmentKind,
}

impl PairwiseAlignment {
    /// Length of the shorter aligned span.
    #[must_use]
    pub fn overlap_length(&self) -> usize {
        (self.a_end - self.a_bgn).min(self.b_end - self.b_bgn)
    }
}

/// Aligns a read (B) against a stretch of consensus (A).
///
/// Implementations must be deterministic.
pub trait PairwiseAligner {
    fn align(
        &mut self,
        a: &[u8],
        b: &[u8],
        request: &AlignmentRequest,
    ) -> Option<PairwiseAlignment>;
}

/// Banded affine-gap aligner over `bio::alignment::pairwise::banded`.
///
/// The band follows the best chain of shared `seed_length`-mers. In partial mode A is first cut
/// down to the span the chain projects the whole read onto, so memory scales with the read, not
/// with the consensus.
#[derive(Clone, Debug)]
pub struct OverlapAligner {
    pub match_score: i32,
    pub mismatch_score: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
    /// Longest unaligned stub re-extended without gaps at a near-miss boundary.
    pub max_end_extension: usize,
    /// Length of the exact k-mer seeds the band is built around.
    pub seed_length: usize,
    /// Band width around the seed chain.
    pub band_width: usize,
}

impl Default for OverlapAligner {
    fn default() -> Self {
        Self {
            match_score: 1,
            mismatch_score: -2,
            gap_open: -2,
            gap_extend: -1,
            max_end_extension: 16,
            seed_length: 12,
            band_width: 24,
        }
    }
}

/// The sequence an alignment end is required to reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reach {
    A,
    B,
}

/// Alignment ends pinned to a sequence end. Unpinned ends follow the request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Pins {
    start: Option<Reach>,
    end: Option<Reach>,
}

impl Pins {
    /// Pinnings that turn `walk` into a dovetail, one per combination of unreached ends.
    fn to_dovetail(walk: &Walk, a_len: usize, b_len: usize) -> Vec<Pins> {
        const REACHED: &[Option<Reach>] = &[None];
        const EITHER: &[Option<Reach>] = &[Some(Reach::A), Some(Reach::B)];
        let starts = if walk.starts() { REACHED } else { EITHER };
        let ends = if walk.ends(a_len, b_len) { REACHED } else { EITHER };
        starts
            .iter()
            .flat_map(|&start| ends.iter().map(move |&end| Pins { start, end }))
            .filter(|pins| *pins != Pins::default())
            .collect()
    }
}

/// Aligned extents and tallies walked out of an operation list.
#[derive(Debug, Default)]
struct Walk {
    a_bgn: usize,
    a_end: usize,
    b_bgn: usize,
    b_end: usize,
    mismatches: usize,
    gaps: usize,
    delta: Vec<i32>,
    column_errors: Vec<bool>,
}

impl Walk {
    /// Walks `ops`, with A coordinates offset by `a_offset`.
    fn from_operations(ops: &[AlignmentOperation], a_offset: usize) -> Option<Self> {
        let first = ops.iter().position(|op| !is_clip(op))?;
        let mut walk = Walk { a_bgn: a_offset, ..Walk::default() };

        for op in &ops[..first] {
            match *op {
                AlignmentOperation::Xclip(n) => walk.a_bgn += n,
                AlignmentOperation::Yclip(n) => walk.b_bgn += n,
                _ => {}
            }
        }

        let (mut a, mut b) = (walk.a_bgn, walk.b_bgn);
        let mut run: i32 = 0;
        for op in &ops[first..] {
            match op {
                AlignmentOperation::Match => {
                    a += 1;
                    b += 1;
                    run += 1;
                    walk.column_errors.push(false);
                }
                AlignmentOperation::Subst => {
                    a += 1;
                    b += 1;
                    run += 1;
                    walk.mismatches += 1;
                    walk.column_errors.push(true);
                }
                AlignmentOperation::Ins => {
                    a += 1;
                    walk.delta.push(run + 1);
                    run = 0;
                    walk.gaps += 1;
                    walk.column_errors.push(true);
                }
                AlignmentOperation::Del => {
                    b += 1;
                    walk.delta.push(-(run + 1));
                    run = 0;
                    walk.gaps += 1;
                    walk.column_errors.push(true);
                }
                AlignmentOperation::Xclip(_) | AlignmentOperation::Yclip(_) => {}
            }
        }
        walk.a_end = a;
        walk.b_end = b;
        Some(walk)
    }

    fn columns(&self) -> usize {
        self.column_errors.len()
    }

    fn error_rate(&self) -> f64 {
        if self.columns() == 0 {
            return 1.0;
        }
        (self.mismatches + self.gaps) as f64 / self.columns() as f64
    }

    fn starts(&self) -> bool {
        self.a_bgn == 0 || self.b_bgn == 0
    }

    fn ends(&self, a_len: usize, b_len: usize) -> bool {
        self.a_end == a_len || self.b_end == b_len
    }

    fn kind(&self, a_len: usize, b_len: usize) -> AlignmentKind {
        if self.starts() && self.ends(a_len, b_len) {
            AlignmentKind::Dovetail
        } else {
            AlignmentKind::Branch
        }
    }

    /// Worst error rate over any window of [`BADNESS_WINDOW`] columns.
    fn worst_window(&self) -> f64 {
        if self.columns() < BADNESS_WINDOW {
            return 0.0;
        }
        let mut errors = self.column_errors[..BADNESS_WINDOW].iter().filter(|&&e| e).count();
        let mut worst = errors;
        for i in BADNESS_WINDOW..self.columns() {
            errors += usize::from(self.column_errors[i]);
            errors -= usize::from(self.column_errors[i - BADNESS_WINDOW]);
            worst = worst.max(errors);
        }
        worst as f64 / BADNESS_WINDOW as f64
    }

    /// Ungapped extension of the alignment start back to a sequence start.
    fn extend_start(&mut self, a: &[u8], b: &[u8], max_len: usize, error_rate: f64) -> bool {
        let k = self.a_bgn.min(self.b_bgn);
        if k == 0 || k > max_len {
            return false;
        }
        let mismatched = (1..=k).filter(|&i| a[self.a_bgn - i] != b[self.b_bgn - i]).count();
        if mismatched > (error_rate * k as f64).ceil() as usize {
            return false;
        }

        self.a_bgn -= k;
        self.b_bgn -= k;
        self.mismatches += mismatched;
        let mut prefix: Vec<bool> =
            (0..k).map(|i| a[self.a_bgn + i] != b[self.b_bgn + i]).collect();
        prefix.append(&mut self.column_errors);
        self.column_errors = prefix;
        if let Some(first) = self.delta.first_mut() {
            *first += first.signum() * k as i32;
        }
        true
    }

    /// Ungapped extension of the alignment end forward to a sequence end.
    fn extend_end(&mut self, a: &[u8], b: &[u8], max_len: usize, error_rate: f64) -> bool {
        let k = (a.len() - self.a_end).min(b.len() - self.b_end);
        if k == 0 || k > max_len {
            return false;
        }
        let mismatched = (0..k).filter(|&i| a[self.a_end + i] != b[self.b_end + i]).count();
        if mismatched > (error_rate * k as f64).ceil() as usize {
            return false;
        }

        for i in 0..k {
            self.column_errors.push(a[self.a_end + i] != b[self.b_end + i]);
        }
        self.a_end += k;
        self.b_end += k;
        self.mismatches += mismatched;
        true
    }
}

/// One banded alignment, walked and classified.
struct Candidate {
    walk: Walk,
    kind: AlignmentKind,
    score: i32,
}

fn is_clip(op: &AlignmentOperation) -> bool {
    matches!(op, AlignmentOperation::Xclip(_) | AlignmentOperation::Yclip(_))
}

impl OverlapAligner {
    fn scoring(
        &self,
        request: &AlignmentRequest,
        pins: Pins,
    ) -> Scoring<impl Fn(u8, u8) -> i32 + use<>> {
        let (match_score, mismatch_score) = (self.match_score, self.mismatch_score);
        let score = move |x: u8, y: u8| {
            if x.eq_ignore_ascii_case(&y) && x != b'N' && x != b'n' {
                match_score
            } else {
                mismatch_score
            }
        };

        let hang = |allowed: bool| if allowed { 0 } else { MIN_SCORE };
        let (mut x_prefix, mut x_suffix, mut y_prefix, mut y_suffix) = match request.mode {
            AlignmentMode::Partial => (0, 0, 0, 0),
            AlignmentMode::Overlap => {
                (0, 0, hang(request.allow_a_hang), hang(request.allow_b_hang))
            }
        };
        match pins.start {
            Some(Reach::A) => x_prefix = MIN_SCORE,
            Some(Reach::B) => y_prefix = MIN_SCORE,
            None => {}
        }
        match pins.end {
            Some(Reach::A) => x_suffix = MIN_SCORE,
            Some(Reach::B) => y_suffix = MIN_SCORE,
            None => {}
        }

        Scoring::new(self.gap_open, self.gap_extend, score)
            .xclip_prefix(x_prefix)
            .xclip_suffix(x_suffix)
            .yclip_prefix(y_prefix)
            .yclip_suffix(y_suffix)
    }

    /// Exact `seed_length`-mer matches between A and B, ignoring case.
    fn seed_matches(&self, a: &[u8], b: &[u8]) -> Vec<(u32, u32)> {
        let (a, b) = (a.to_ascii_uppercase(), b.to_ascii_uppercase());
        sparse::find_kmer_matches(&a, &b, self.seed_length)
    }

    /// The part of A the best seed chain projects all of B onto, with room for indel drift, and
    /// the seeds inside it relative to its start.
    fn seeded_region(
        &self,
        a_len: usize,
        b_len: usize,
        matches: &[(u32, u32)],
        request: &AlignmentRequest,
    ) -> (Range<usize>, Vec<(u32, u32)>) {
        let chain = sparse::sdpkpp(
            matches,
            self.seed_length,
            self.match_score.max(1) as u32,
            self.gap_open,
            self.gap_extend,
        );
        let (Some(&first), Some(&last)) = (chain.path.first(), chain.path.last()) else {
            return (0..a_len, matches.to_vec());
        };

        let margin = self.band_width + (request.error_rate_max * b_len as f64).ceil() as usize;
        let (a_first, b_first) = (matches[first].0 as usize, matches[first].1 as usize);
        let (a_last, b_last) = (matches[last].0 as usize, matches[last].1 as usize);
        let lo = a_first.saturating_sub(b_first + margin);
        let hi = (a_last + (b_len - b_last) + margin).min(a_len);

        let seeds = matches
            .iter()
            .filter(|&&(x, _)| lo <= x as usize && x as usize + self.seed_length <= hi)
            .map(|&(x, y)| (x - lo as u32, y))
            .collect();
        (lo..hi, seeds)
    }

    /// Aligns B against `a[region]`, reporting A coordinates in the whole of `a`.
    fn run(
        &self,
        a: &[u8],
        b: &[u8],
        region: Range<usize>,
        seeds: &[(u32, u32)],
        request: &AlignmentRequest,
        pins: Pins,
    ) -> Option<Candidate> {
        let window = &a[region.clone()];
        let mut aligner = banded::Aligner::with_capacity_and_scoring(
            window.len(),
            b.len(),
            self.scoring(request, pins),
            self.seed_length,
            self.band_width,
        );
        let alignment = aligner.custom_with_matches(window, b, seeds);
        let mut walk = Walk::from_operations(&alignment.operations, region.start)?;

        let mut kind = walk.kind(a.len(), b.len());
        if kind == AlignmentKind::Branch {
            let max_len = self.max_end_extension;
            let started = walk.extend_start(a, b, max_len, request.max_error_rate);
            let ended = walk.extend_end(a, b, max_len, request.max_error_rate);
            if started || ended {
                kind = walk.kind(a.len(), b.len());
            }
        }
        Some(Candidate { walk, kind, score: alignment.score })
    }
}

impl PairwiseAligner for OverlapAligner {
    fn align(
        &mut self,
        a: &[u8],
        b: &[u8],
        request: &AlignmentRequest,
    ) -> Option<PairwiseAlignment> {
        if a.is_empty() || b.is_empty() {
            return None;
        }

        let matches = self.seed_matches(a, b);
        let (region, seeds) = match request.mode {
            AlignmentMode::Partial => self.seeded_region(a.len(), b.len(), &matches, request),
            AlignmentMode::Overlap => (0..a.len(), matches),
        };
        let mut best = self.run(a, b, region.clone(), &seeds, request, Pins::default())?;

        // A local optimum can stop just short of an end through a few errors there; the same
        // overlap with that end pinned is a dovetail.
        if best.kind == AlignmentKind::Branch && request.mode == AlignmentMode::Overlap {
            let mut pinned: Option<Candidate> = None;
            for pins in Pins::to_dovetail(&best.walk, a.len(), b.len()) {
                let Some(candidate) = self.run(a, b, region.clone(), &seeds, request, pins)
                else {
                    continue;
                };
                if candidate.kind == AlignmentKind::Dovetail
                    && pinned.as_ref().is_none_or(|p| candidate.score > p.score)
                {
                    pinned = Some(candidate);
                }
            }
            if let Some(candidate) = pinned {
                best = candidate;
            }
        }

        let Candidate { walk, kind, score } = best;
        let error_rate = walk.error_rate();
        trace!(
            "aligned A {}..{} of {} with B {}..{} of {}: \
             score {score} erate {error_rate:.4} {kind:?}",
            walk.a_bgn,
            walk.a_end,
            a.len(),
            walk.b_bgn,
            walk.b_end,
            b.len(),
        );

        if !request.forced && walk.worst_window() > request.error_rate_max {
            return None;
        }
        let aligned = (walk.a_end - walk.a_bgn).min(walk.b_end - walk.b_bgn);
        if aligned < request.min_overlap || error_rate > request.max_error_rate {
            return None;
        }

        Some(PairwiseAlignment {
            a_bgn: walk.a_bgn,
            a_end: walk.a_end,
            b_bgn: walk.b_bgn,
            b_end: walk.b_end,
            error_rate,
            delta: walk.delta,
            kind,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rstest::rstest;

    fn xorshift_state(seed: u64) -> u64 {
        seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407)
    }

    /// A deterministic pseudo-random sequence over ACGT.
    pub(crate) fn genome(len: usize, seed: u64) -> Vec<u8> {
        let mut state = xorshift_state(seed);
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                b"ACGT"[(state >> 33) as usize % 4]
            })
            .collect()
    }

    pub(crate) fn mutate(base: u8) -> u8 {
        match base {
            b'A' => b'C',
            b'C' => b'G',
            b'G' => b'T',
            _ => b'A',
        }
    }

    /// `seq` with about `rate` of its bases deleted, `rate` substituted and `rate` followed by a
    /// random insertion.
    pub(crate) fn with_noise(seq: &[u8], rate: f64, seed: u64) -> Vec<u8> {
        let mut state = xorshift_state(seed);
        let mut uniform = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64
        };

        let mut noisy = Vec::with_capacity(seq.len() + seq.len() / 10);
        for &base in seq {
            let draw = uniform();
            if draw < rate {
                continue;
            }
            noisy.push(if draw < 2.0 * rate { mutate(base) } else { base });
            if uniform() < rate {
                noisy.push(b"ACGT"[(uniform() * 4.0) as usize % 4]);
            }
        }
        noisy
    }

    fn overlap(allow_a_hang: bool, allow_b_hang: bool) -> AlignmentRequest {
        AlignmentRequest::overlap(allow_a_hang, allow_b_hang, 0.06, 0.40, 20)
    }

    #[test]
    fn test_identical_sequences() {
        let a = genome(80, 1);
        let aln = OverlapAligner::default().align(&a, &a, &overlap(false, false)).unwrap();
        assert_eq!((aln.a_bgn, aln.a_end, aln.b_bgn, aln.b_end), (0, 80, 0, 80));
        assert!(aln.delta.is_empty());
        assert_eq!(aln.error_rate, 0.0);
        assert_eq!(aln.kind, AlignmentKind::Dovetail);
        assert_eq!(aln.overlap_length(), 80);
    }

    #[test]
    fn test_extra_base_in_b_is_negative_delta() {
        let a = genome(80, 2);
        let mut b = a[..30].to_vec();
        let extra =
            [b'A', b'C', b'G', b'T'].into_iter().find(|&x| x != a[29] && x != a[30]).unwrap();
        b.push(extra);
        b.extend_from_slice(&a[30..]);

        let aln = OverlapAligner::default().align(&a, &b, &overlap(false, false)).unwrap();
        assert_eq!(aln.delta, vec![-31]);
        assert_eq!((aln.a_end, aln.b_end), (80, 81));
    }

    #[test]
    fn test_missing_base_in_b_is_positive_delta() {
        let mut a = genome(80, 3);
        // make the deleted base unambiguous
        a[40] =
            [b'A', b'C', b'G', b'T'].into_iter().find(|&x| x != a[39] && x != a[41]).unwrap();
        let mut b = a[..40].to_vec();
        b.extend_from_slice(&a[41..]);

        let aln = OverlapAligner::default().align(&a, &b, &overlap(false, false)).unwrap();
        assert_eq!(aln.delta, vec![41]);
        assert_eq!((aln.a_end, aln.b_end), (80, 79));
    }

    #[test]
    fn test_dovetail_needs_b_hang() {
        let genome = genome(150, 4);
        let a = &genome[..100];
        let b = &genome[60..150];

        let aln = OverlapAligner::default().align(a, b, &overlap(false, true)).unwrap();
        assert_eq!((aln.a_bgn, aln.a_end, aln.b_bgn, aln.b_end), (60, 100, 0, 40));
        assert_eq!(aln.kind, AlignmentKind::Dovetail);

        assert!(OverlapAligner::default().align(a, b, &overlap(false, false)).is_none());
    }

    #[rstest]
    #[case::errors_before_a_end(false, true)]
    #[case::errors_after_a_start(true, false)]
    fn test_errors_at_an_end_still_dovetail(#[case] a_hang: bool, #[case] b_hang: bool) {
        let g = genome(400, 14);
        // two substitutions among the last three bases of A on the side B hangs off
        let (a, b, expected) = if b_hang {
            let mut a = g[..300].to_vec();
            a[297] = mutate(a[297]);
            a[299] = mutate(a[299]);
            (a, g[150..400].to_vec(), (150, 300, 0, 150))
        } else {
            let mut a = g[100..400].to_vec();
            a[0] = mutate(a[0]);
            a[2] = mutate(a[2]);
            (a, g[..250].to_vec(), (0, 150, 100, 250))
        };

        let request = AlignmentRequest::overlap(a_hang, b_hang, 0.06, 0.40, 40);
        let aln = OverlapAligner::default().align(&a, &b, &request).unwrap();
        assert_eq!(aln.kind, AlignmentKind::Dovetail);
        assert_eq!((aln.a_bgn, aln.a_end, aln.b_bgn, aln.b_end), expected);
        assert!(aln.delta.is_empty());
        assert!((aln.error_rate - 2.0 / 150.0).abs() < 1e-9, "{}", aln.error_rate);
    }

    #[test]
    fn test_partial_alignment_against_long_consensus() {
        let mut a = genome(20_000, 15);
        let mut b = a[12_000..12_400].to_vec();
        b[200] = mutate(b[200]);
        // consensus columns outvoted by gaps are lowercase
        a[12_100..12_150].make_ascii_lowercase();

        let aln = OverlapAligner::default()
            .align(&a, &b, &AlignmentRequest::partial(0.06, 0.40, 40))
            .unwrap();
        assert_eq!((aln.a_bgn, aln.a_end, aln.b_bgn, aln.b_end), (12_000, 12_400, 0, 400));
        assert_eq!(aln.kind, AlignmentKind::Dovetail);
        assert!((aln.error_rate - 1.0 / 400.0).abs() < 1e-9, "{}", aln.error_rate);
    }

    #[test]
    fn test_noisy_read_overlap() {
        let g = genome(700, 16);
        let a = with_noise(&g[..500], 0.01, 1);
        let b = with_noise(&g[200..700], 0.01, 2);
        let request = AlignmentRequest::overlap(false, true, 0.15, 0.40, 40);

        let aln = OverlapAligner::default().align(&a, &b, &request).unwrap();
        assert_eq!(aln.kind, AlignmentKind::Dovetail);
        assert_eq!((aln.a_end, aln.b_bgn), (a.len(), 0));
        assert!(aln.a_bgn.abs_diff(200) <= 15, "{}", aln.a_bgn);
    }

    #[test]
    fn test_contained_read_in_partial_mode() {
        let a = genome(100, 5);
        let b = &a[20..80];
        let aln = OverlapAligner::default()
            .align(&a, b, &AlignmentRequest::partial(0.06, 0.40, 20))
            .unwrap();
        assert_eq!((aln.a_bgn, aln.a_end, aln.b_bgn, aln.b_end), (20, 80, 0, 60));
        assert_eq!(aln.kind, AlignmentKind::Dovetail);
    }

    #[test]
    fn test_near_miss_start_is_extended() {
        let a = genome(100, 6);
        let mut b = a[20..80].to_vec();
        b[1] = mutate(b[1]);

        let aln = OverlapAligner::default()
            .align(&a, &b, &AlignmentRequest::partial(0.06, 0.40, 20))
            .unwrap();
        assert_eq!((aln.a_bgn, aln.b_bgn), (20, 0));
        assert_eq!(aln.kind, AlignmentKind::Dovetail);
        assert!((aln.error_rate - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_overlap_is_rejected() {
        let genome = genome(120, 7);
        let a = &genome[..100];
        let b = &genome[90..120];
        assert!(OverlapAligner::default().align(a, b, &overlap(false, true)).is_none());
    }

    #[test]
    fn test_bad_window_is_rejected_unless_forced() {
        let a = genome(300, 8);
        let mut b = a.clone();
        for i in (100..205).step_by(3) {
            b[i] = mutate(b[i]);
        }
        let request = AlignmentRequest::overlap(false, false, 0.2, 0.3, 40);

        assert!(OverlapAligner::default().align(&a, &b, &request).is_none());
        let aln = OverlapAligner::default().align(&a, &b, &request.clone().forced(true)).unwrap();
        assert!(aln.error_rate > 0.1 && aln.error_rate < 0.2, "{}", aln.error_rate);
    }
}
