use crate::config::ModelParams;
use crate::outcome::OutcomeProbabilities;

/// How decisive a prediction is, in `[0, 100]`.
///
/// Grows with the gap between the favourite and the middle outcome, scaled down while
/// either team has fewer than `min_reliable_sample` matches behind its rates.
pub fn confidence(
    probs: &OutcomeProbabilities,
    played_home: u32,
    played_away: u32,
    params: &ModelParams,
) -> f64 {
    let spread = probs.max() - probs.median();
    let factor = sample_factor(played_home, played_away, params.min_reliable_sample);
    let raw = (spread * factor + params.base_confidence).clamp(0.0, 100.0);
    (raw * 10.0).round() / 10.0
}

pub fn sample_factor(played_home: u32, played_away: u32, min_reliable_sample: u32) -> f64 {
    let needed = 2.0 * min_reliable_sample.max(1) as f64;
    ((played_home as f64 + played_away as f64) / needed).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisive_and_well_sampled_is_confident() {
        let params = ModelParams::default();
        let p = OutcomeProbabilities::from_raw(73.4, 15.0, 11.6);
        let c = confidence(&p, 10, 10, &params);
        assert!((c - 78.4).abs() < 1e-9);
    }

    #[test]
    fn thin_samples_shrink_toward_base() {
        let params = ModelParams::default();
        let p = OutcomeProbabilities::from_raw(73.4, 15.0, 11.6);
        let full = confidence(&p, 10, 10, &params);
        let half = confidence(&p, 5, 5, &params);
        let none = confidence(&p, 0, 0, &params);
        assert!(half < full);
        assert_eq!(none, params.base_confidence);
    }

    #[test]
    fn sample_factor_saturates() {
        assert_eq!(sample_factor(40, 40, 10), 1.0);
        assert_eq!(sample_factor(5, 5, 10), 0.5);
    }
}
