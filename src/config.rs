use std::env;

use serde::{Deserialize, Serialize};

use crate::league_params::LeagueParams;

/// Fixed constants of the prediction model.
///
/// The engine itself never reads the environment; callers build a `ModelParams` once
/// (usually via [`ModelParams::from_env`]) and pass it into every prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Added to the home team's strength rating in the 1X2 model.
    pub home_advantage: f64,
    /// Multiplier applied to the home expected-goal rate.
    pub home_goal_multiplier: f64,
    /// League average goals scored per team per match.
    pub league_avg_goals: f64,
    /// Share of probability mass left to home/away wins; the rest is the draw.
    pub draw_reserve: f64,
    pub neutral_rating: f64,
    pub rating_max: f64,
    /// Scoreline grid covers `0..=max_goals` for both sides.
    pub max_goals: u32,
    pub lambda_floor: f64,
    /// Upper bound on either expected-goal rate; keeps the scoreline grid near full mass.
    pub lambda_ceiling: f64,
    pub min_reliable_sample: u32,
    pub base_confidence: f64,
    /// How many recent matches a stats provider aggregates into a form.
    pub form_window: usize,
    /// Feed the goal model home-only form for the home side and away-only form for the
    /// away side, when the provider has them.
    pub venue_split: bool,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            home_advantage: 0.30,
            home_goal_multiplier: 1.10,
            league_avg_goals: 1.35,
            draw_reserve: 0.85,
            neutral_rating: 1.0,
            rating_max: 3.0,
            max_goals: 8,
            lambda_floor: 0.05,
            lambda_ceiling: 10.0,
            min_reliable_sample: 10,
            base_confidence: 20.0,
            form_window: 10,
            venue_split: false,
        }
    }
}

impl ModelParams {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds params from an arbitrary key lookup. Missing or unparseable values keep
    /// their defaults; parsed values are clamped to a sane band.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let f = |key: &str, default: f64, lo: f64, hi: f64| {
            lookup(key)
                .and_then(|val| val.trim().parse::<f64>().ok())
                .filter(|val| val.is_finite())
                .unwrap_or(default)
                .clamp(lo, hi)
        };
        let u = |key: &str, default: u64, lo: u64, hi: u64| {
            lookup(key)
                .and_then(|val| val.trim().parse::<u64>().ok())
                .unwrap_or(default)
                .clamp(lo, hi)
        };

        Self {
            home_advantage: f("PREDICT_HOME_ADVANTAGE", d.home_advantage, 0.0, 2.0),
            home_goal_multiplier: f("PREDICT_HOME_GOAL_MULTIPLIER", d.home_goal_multiplier, 0.5, 2.0),
            league_avg_goals: f("PREDICT_LEAGUE_AVG_GOALS", d.league_avg_goals, 0.3, 5.0),
            draw_reserve: f("PREDICT_DRAW_RESERVE", d.draw_reserve, 0.5, 1.0),
            neutral_rating: f("PREDICT_NEUTRAL_RATING", d.neutral_rating, 0.0, d.rating_max),
            rating_max: d.rating_max,
            max_goals: u("PREDICT_MAX_GOALS", d.max_goals as u64, 4, 15) as u32,
            lambda_floor: f("PREDICT_LAMBDA_FLOOR", d.lambda_floor, 0.01, 0.5),
            lambda_ceiling: f("PREDICT_LAMBDA_CEILING", d.lambda_ceiling, 3.0, 12.0),
            min_reliable_sample: u("PREDICT_MIN_RELIABLE_SAMPLE", d.min_reliable_sample as u64, 1, 100)
                as u32,
            base_confidence: f("PREDICT_BASE_CONFIDENCE", d.base_confidence, 0.0, 50.0),
            form_window: u("PREDICT_FORM_WINDOW", d.form_window as u64, 1, 50) as usize,
            venue_split: lookup("PREDICT_VENUE_SPLIT")
                .map(|val| matches!(val.trim(), "1" | "true" | "yes"))
                .unwrap_or(d.venue_split),
        }
    }

    /// Replaces the league-level constants with values estimated from match history.
    pub fn with_league(mut self, league: &LeagueParams) -> Self {
        self.league_avg_goals = league.league_avg_goals;
        self.home_goal_multiplier = league.home_goal_multiplier;
        self
    }

    /// Same params with home advantage switched off in both the 1X2 and goal models.
    pub fn neutral_venue(mut self) -> Self {
        self.home_advantage = 0.0;
        self.home_goal_multiplier = 1.0;
        self
    }
}
