// Combined Match Score
//
// combined = 0.4 * name + 0.3 * phone + 0.3 * address
//
// The weights are a design constant of the scoring model, not configuration:
// changing them changes the meaning of every stored confidence.

/// Weight of the claimed-vs-document name similarity
pub const NAME_WEIGHT: f64 = 0.4;
/// Weight of phone validity (1.0 valid / 0.0 invalid)
pub const PHONE_WEIGHT: f64 = 0.3;
/// Weight of the claimed-vs-document address similarity
pub const ADDRESS_WEIGHT: f64 = 0.3;

/// Weighted combination of the per-field match signals, clamped to [0, 1].
///
/// Non-finite inputs are treated as 0.0 (worst case).
pub fn combined_score(name_score: f64, phone_valid: bool, address_score: f64) -> f64 {
    let phone_score = if phone_valid { 1.0 } else { 0.0 };
    let score = NAME_WEIGHT * sanitize(name_score)
        + PHONE_WEIGHT * phone_score
        + ADDRESS_WEIGHT * sanitize(address_score);
    score.clamp(0.0, 1.0)
}

/// Round to 3 decimal places
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Clamp a similarity into [0, 1], mapping NaN/inf to 0.0
pub fn sanitize(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        assert!((NAME_WEIGHT + PHONE_WEIGHT + ADDRESS_WEIGHT - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_phone_only() {
        assert!((combined_score(0.0, true, 0.0) - 0.3).abs() < 1e-12);
        assert_eq!(combined_score(0.0, false, 0.0), 0.0);
    }

    #[test]
    fn test_all_perfect() {
        assert!((combined_score(1.0, true, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bad_inputs_degrade() {
        assert_eq!(combined_score(f64::NAN, false, f64::INFINITY), 0.0);
        assert!((combined_score(7.0, false, -3.0) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(0.12345), 0.123);
        assert_eq!(round3(0.4996), 0.5);
        assert_eq!(round3(0.0), 0.0);
    }
}
