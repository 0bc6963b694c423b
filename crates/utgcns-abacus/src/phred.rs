//! Phred score conversions in natural-log space.
//!
//! Consensus qualities live in `[CNS_MIN_QV, CNS_MAX_QV]`; read qualities above the ceiling are
//! clamped on ingest.

use std::f64::consts::{LN_2, LN_10};

/// Lowest quality assigned to a consensus call.
pub const CNS_MIN_QV: u8 = 0;

/// Highest quality stored in the abacus and assigned to a consensus call.
pub const CNS_MAX_QV: u8 = 60;

/// Rounding slack used when converting a probability back to an integer score.
const PHRED_PRECISION: f64 = 0.001;

/// Phred score type
pub type PhredScore = u8;

/// Log probability type (natural log)
pub type LogProbability = f64;

/// Converts a Phred score to ln(probability of error).
///
/// # Examples
/// ```
/// use utgcns_abacus::phred::phred_to_ln_error_prob;
///
/// assert!((phred_to_ln_error_prob(20) - 0.01_f64.ln()).abs() < 1e-10);
/// ```
#[inline]
#[must_use]
pub fn phred_to_ln_error_prob(phred: PhredScore) -> LogProbability {
    -f64::from(phred) * LN_10 / 10.0
}

/// Converts a Phred score to ln(probability the base is correct).
#[inline]
#[must_use]
pub fn phred_to_ln_correct_prob(phred: PhredScore) -> LogProbability {
    ln_not(phred_to_ln_error_prob(phred))
}

/// ln(1 - e^x) for x <= 0, stable at both ends of the range.
#[inline]
#[must_use]
pub fn ln_not(x: LogProbability) -> LogProbability {
    if x >= 0.0 {
        f64::NEG_INFINITY
    } else if x >= -LN_2 {
        (-x.exp_m1()).ln()
    } else {
        (-x.exp()).ln_1p()
    }
}

/// ln(e^a + e^b).
#[must_use]
pub fn ln_sum_exp(ln_a: LogProbability, ln_b: LogProbability) -> LogProbability {
    if ln_a == f64::NEG_INFINITY {
        return ln_b;
    }
    if ln_b == f64::NEG_INFINITY {
        return ln_a;
    }
    let (lo, hi) = if ln_a < ln_b { (ln_a, ln_b) } else { (ln_b, ln_a) };
    hi + (lo - hi).exp().ln_1p()
}

/// ln(sum(e^v)) over a slice; negative infinity for an empty slice.
///
/// # Examples
/// ```
/// use utgcns_abacus::phred::ln_sum_exp_array;
///
/// let values = [0.1_f64.ln(), 0.2_f64.ln(), 0.3_f64.ln()];
/// assert!((ln_sum_exp_array(&values) - 0.6_f64.ln()).abs() < 1e-10);
/// ```
#[must_use]
pub fn ln_sum_exp_array(values: &[LogProbability]) -> LogProbability {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Converts ln(probability of error) to a Phred score clamped to the consensus range.
///
/// # Examples
/// ```
/// use utgcns_abacus::phred::{CNS_MAX_QV, ln_prob_to_phred};
///
/// assert_eq!(ln_prob_to_phred(0.001_f64.ln()), 30);
/// assert_eq!(ln_prob_to_phred(1e-20_f64.ln()), CNS_MAX_QV);
/// assert_eq!(ln_prob_to_phred(0.0), 0);
/// ```
#[inline]
#[must_use]
pub fn ln_prob_to_phred(ln_prob: LogProbability) -> PhredScore {
    if ln_prob < phred_to_ln_error_prob(CNS_MAX_QV) {
        return CNS_MAX_QV;
    }
    let phred = (-10.0 * ln_prob / LN_10 + PHRED_PRECISION).floor();
    phred.clamp(f64::from(CNS_MIN_QV), f64::from(CNS_MAX_QV)) as PhredScore
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_correct_and_error_sum_to_one() {
        for q in [1u8, 10, 20, 40, 60] {
            let total = phred_to_ln_error_prob(q).exp() + phred_to_ln_correct_prob(q).exp();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_ln_not_near_zero() {
        assert_abs_diff_eq!(ln_not(0.9_f64.ln()), 0.1_f64.ln(), epsilon = 1e-10);
        assert_abs_diff_eq!(ln_not(1e-6_f64.ln()), (1.0 - 1e-6_f64).ln(), epsilon = 1e-12);
        assert_eq!(ln_not(0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_ln_sum_exp_handles_infinity() {
        assert_abs_diff_eq!(ln_sum_exp(f64::NEG_INFINITY, 0.5_f64.ln()), 0.5_f64.ln());
        let sum = ln_sum_exp(0.25_f64.ln(), 0.5_f64.ln());
        assert_abs_diff_eq!(sum, 0.75_f64.ln(), epsilon = 1e-12);
        assert_eq!(ln_sum_exp_array(&[]), f64::NEG_INFINITY);
        assert_abs_diff_eq!(
            ln_sum_exp_array(&[f64::NEG_INFINITY, 0.5_f64.ln()]),
            0.5_f64.ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_phred_round_trip() {
        for q in CNS_MIN_QV..=CNS_MAX_QV {
            assert_eq!(ln_prob_to_phred(phred_to_ln_error_prob(q)), q);
        }
    }
}
