use serde::{Deserialize, Serialize};

use crate::outcome::OutcomeProbabilities;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

/// 1X2 probabilities as fractions in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];
}

impl Prob3 {
    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    pub fn of(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    /// Most probable outcome; ties go to home, then draw.
    pub fn favourite(&self) -> Outcome {
        Outcome::ALL
            .into_iter()
            .fold(Outcome::Home, |best, o| if self.of(o) > self.of(best) { o } else { best })
    }

    /// Multi-class Brier score against the observed outcome, in `[0, 2]`.
    pub fn brier(&self, observed: Outcome) -> f64 {
        Outcome::ALL
            .into_iter()
            .map(|o| {
                let hit = if o == observed { 1.0 } else { 0.0 };
                (self.of(o) - hit).powi(2)
            })
            .sum()
    }

    pub fn log_loss(&self, observed: Outcome) -> f64 {
        -self.of(observed).clamp(1e-12, 1.0).ln()
    }
}

impl From<OutcomeProbabilities> for Prob3 {
    fn from(p: OutcomeProbabilities) -> Self {
        Self {
            home: p.home_win / 100.0,
            draw: p.draw / 100.0,
            away: p.away_win / 100.0,
        }
    }
}

pub fn classify_outcome(home_goals: u32, away_goals: u32) -> Outcome {
    if home_goals > away_goals {
        Outcome::Home
    } else if home_goals < away_goals {
        Outcome::Away
    } else {
        Outcome::Draw
    }
}

/// Mean Brier, log-loss and hit rate. Empty or mismatched inputs give zero samples.
pub fn evaluate_probs(predictions: &[Prob3], outcomes: &[Outcome]) -> Metrics {
    if predictions.is_empty() || predictions.len() != outcomes.len() {
        return Metrics {
            samples: 0,
            brier: 0.0,
            log_loss: 0.0,
            accuracy: 0.0,
        };
    }
    let n = predictions.len() as f64;
    let pairs = || predictions.iter().zip(outcomes.iter().copied());
    Metrics {
        samples: predictions.len(),
        brier: pairs().map(|(p, o)| p.brier(o)).sum::<f64>() / n,
        log_loss: pairs().map(|(p, o)| p.log_loss(o)).sum::<f64>() / n,
        accuracy: pairs().filter(|(p, o)| p.favourite() == *o).count() as f64 / n,
    }
}

/// Reliability table for one class: predictions bucketed by that class's probability.
pub fn calibration_bins(
    predictions: &[Prob3],
    outcomes: &[Outcome],
    class: Outcome,
    bins: usize,
) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let width = 1.0 / bins as f64;
    let mut table: Vec<CalibrationBin> = (0..bins)
        .map(|i| CalibrationBin {
            bucket_start: i as f64 * width,
            bucket_end: (i + 1) as f64 * width,
            count: 0,
            avg_pred: 0.0,
            actual_rate: 0.0,
        })
        .collect();

    for (p, outcome) in predictions.iter().zip(outcomes) {
        let prob = p.of(class).clamp(0.0, 1.0);
        let bin = &mut table[((prob * bins as f64) as usize).min(bins - 1)];
        bin.count += 1;
        bin.avg_pred += prob;
        if *outcome == class {
            bin.actual_rate += 1.0;
        }
    }
    // Sums become means.
    for bin in table.iter_mut().filter(|b| b.count > 0) {
        bin.avg_pred /= bin.count as f64;
        bin.actual_rate /= bin.count as f64;
    }
    table
}

/// Count-weighted gap between predicted and observed rates, averaged over the three classes.
pub fn expected_calibration_error(predictions: &[Prob3], outcomes: &[Outcome], bins: usize) -> f64 {
    if predictions.is_empty() || predictions.len() != outcomes.len() || bins == 0 {
        return 0.0;
    }
    let n = predictions.len() as f64;
    let gap: f64 = Outcome::ALL
        .into_iter()
        .flat_map(|class| calibration_bins(predictions, outcomes, class, bins))
        .map(|bin| bin.count as f64 / n * (bin.avg_pred - bin.actual_rate).abs())
        .sum();
    gap / 3.0
}
