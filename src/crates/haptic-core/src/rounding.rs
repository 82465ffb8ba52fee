//! Integer rounding shared by every derived number in an artifact.
//!
//! All values here are non-negative, so half-up and half-away-from-zero
//! coincide. Working in integers keeps results identical across platforms.

/// `numerator / denominator` rounded half away from zero.
///
/// Returns 0 when `denominator` is 0.
pub fn div_round_half_away(numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return 0;
    }
    let num = u128::from(numerator);
    let den = u128::from(denominator);
    let rounded = (2 * num + den) / (2 * den);
    u64::try_from(rounded).unwrap_or(u64::MAX)
}

/// Fixed-point `numerator / denominator` with `decimals` fractional digits.
pub fn ratio_to_decimals(numerator: u64, denominator: u64, decimals: u32) -> f64 {
    let scale = 10u64.pow(decimals);
    let scaled = div_round_half_away(numerator.saturating_mul(scale), denominator);
    scaled as f64 / scale as f64
}
