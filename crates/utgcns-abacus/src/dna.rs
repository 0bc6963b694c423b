//! Base normalisation and reverse complement for read ingest.

/// Uppercases A/C/G/T and maps every other byte to `N`.
#[inline]
#[must_use]
pub const fn normalize_base(base: u8) -> u8 {
    match base {
        b'A' | b'a' => b'A',
        b'C' | b'c' => b'C',
        b'G' | b'g' => b'G',
        b'T' | b't' => b'T',
        _ => b'N',
    }
}

/// Watson-Crick complement of a normalised base; anything else becomes `N`.
#[inline]
#[must_use]
pub const fn complement_base(base: u8) -> u8 {
    match base {
        b'A' | b'a' => b'T',
        b'T' | b't' => b'A',
        b'C' | b'c' => b'G',
        b'G' | b'g' => b'C',
        _ => b'N',
    }
}

/// Reverse complements a read, normalising to uppercase.
///
/// # Examples
///
/// ```
/// use utgcns_abacus::dna::reverse_complement;
///
/// assert_eq!(reverse_complement(b"AACGTN"), b"NACGTT".to_vec());
/// assert_eq!(reverse_complement(b"acgr"), b"NCGT".to_vec());
/// ```
#[must_use]
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&base| complement_base(base)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b'a', b'A')]
    #[case(b'G', b'G')]
    #[case(b'R', b'N')]
    #[case(b'-', b'N')]
    fn test_normalize_base(#[case] input: u8, #[case] expected: u8) {
        assert_eq!(normalize_base(input), expected);
    }

    #[test]
    fn test_reverse_complement_is_involution() {
        let seq = b"ACGTTGCAAN".to_vec();
        assert_eq!(reverse_complement(&reverse_complement(&seq)), seq);
    }
}
