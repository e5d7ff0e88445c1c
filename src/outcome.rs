use serde::{Deserialize, Serialize};

const TENTHS_TOTAL: i64 = 1000;

const FALLBACK_SIDE: f64 = 35.0;
const FALLBACK_DRAW: f64 = 30.0;
const FALLBACK_MAX_TILT: f64 = 5.0;

/// 1X2 probabilities in percent, one decimal each, summing to exactly 100.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
}

impl OutcomeProbabilities {
    /// Sum counted in tenths of a percent, which is exact where the float sum may not be.
    pub fn total_tenths(&self) -> i64 {
        to_tenths(self.home_win) + to_tenths(self.draw) + to_tenths(self.away_win)
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.home_win, self.draw, self.away_win]
    }

    pub fn max(&self) -> f64 {
        self.home_win.max(self.draw).max(self.away_win)
    }

    pub fn median(&self) -> f64 {
        let mut v = self.as_array();
        v.sort_by(|a, b| a.total_cmp(b));
        v[1]
    }

    /// Rounds raw percentages to tenths, pushing the rounding residue into the largest bucket.
    pub fn from_raw(home: f64, draw: f64, away: f64) -> Self {
        let mut tenths = [home, draw, away].map(|v| (v.max(0.0) * 10.0).round() as i64);
        let residue = TENTHS_TOTAL - tenths.iter().sum::<i64>();
        let largest = (0..3)
            .max_by(|&a, &b| tenths[a].cmp(&tenths[b]).then(b.cmp(&a)))
            .unwrap_or(0);
        tenths[largest] = (tenths[largest] + residue).max(0);

        Self {
            home_win: tenths[0] as f64 / 10.0,
            draw: tenths[1] as f64 / 10.0,
            away_win: tenths[2] as f64 / 10.0,
        }
    }
}

/// Strength-share 1X2 model.
///
/// Home and away shares of the combined strength are scaled by `draw_reserve`; whatever
/// is left over becomes the draw probability.
pub fn outcome_probs(
    home_rating: f64,
    away_rating: f64,
    home_advantage: f64,
    draw_reserve: f64,
) -> OutcomeProbabilities {
    let w_home = (home_rating + home_advantage).max(0.0);
    let w_away = away_rating.max(0.0);
    let total = w_home + w_away;

    if total <= f64::EPSILON {
        let tilt = (home_advantage * 10.0).clamp(0.0, FALLBACK_MAX_TILT);
        return OutcomeProbabilities::from_raw(
            FALLBACK_SIDE + tilt,
            FALLBACK_DRAW,
            FALLBACK_SIDE - tilt,
        );
    }

    let reserve = draw_reserve.clamp(0.0, 1.0);
    let home = 100.0 * reserve * w_home / total;
    let away = 100.0 * reserve * w_away / total;
    OutcomeProbabilities::from_raw(home, 100.0 - home - away, away)
}

fn to_tenths(v: f64) -> i64 {
    (v * 10.0).round() as i64
}
