use crate::model::ScoreMap;

pub const IDEAL_SCORE: f64 = 10.0;

/// Euclidean distance of a score map from the all-10s point, rounded to
/// two decimals. Lower is better; an empty map is 0.
///
/// Not normalized by vector count: a row scored on more vectors can sit
/// further from ideal than one scored on fewer, at the same per-vector gap.
pub fn distance_from_ideal(scores: &ScoreMap) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let sum: f64 = scores.values().map(|s| (IDEAL_SCORE - s).powi(2)).sum();
    round2(sum.sqrt())
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> ScoreMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(distance_from_ideal(&ScoreMap::new()), 0.0);
    }

    #[test]
    fn test_perfect_scores_are_zero() {
        assert_eq!(distance_from_ideal(&scores(&[("a", 10.0), ("b", 10.0)])), 0.0);
    }

    #[test]
    fn test_price_comfort_example() {
        // sqrt((10-8)^2 + (10-6)^2) = sqrt(20)
        let d = distance_from_ideal(&scores(&[("Price", 8.0), ("Comfort", 6.0)]));
        assert_eq!(d, 4.47);
    }

    #[test]
    fn test_out_of_range_not_clamped() {
        let d = distance_from_ideal(&scores(&[("a", 12.0)]));
        assert_eq!(d, 2.0);
    }
}
