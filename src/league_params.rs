use serde::{Deserialize, Serialize};

use crate::config::ModelParams;
use crate::history::PlayedMatch;

// Below this many matches the estimates are blended toward the defaults.
const MIN_N: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeagueParams {
    pub sample_matches: usize,
    /// Goals per team per match.
    pub league_avg_goals: f64,
    /// Average home goals over average away goals.
    pub home_goal_multiplier: f64,
}

impl Default for LeagueParams {
    fn default() -> Self {
        let d = ModelParams::default();
        Self {
            sample_matches: 0,
            league_avg_goals: d.league_avg_goals,
            home_goal_multiplier: d.home_goal_multiplier,
        }
    }
}

pub fn compute_league_params(matches: &[PlayedMatch]) -> LeagueParams {
    let n = matches.len();
    let d = LeagueParams::default();
    if n == 0 {
        return d;
    }

    let home_goals: f64 = matches.iter().map(|m| m.home_goals as f64).sum();
    let away_goals: f64 = matches.iter().map(|m| m.away_goals as f64).sum();

    let avg_goals = (home_goals + away_goals) / (2.0 * n as f64);
    let multiplier = if away_goals > 0.0 {
        (home_goals / away_goals).clamp(0.8, 1.5)
    } else {
        d.home_goal_multiplier
    };

    let w = (n as f64 / MIN_N).clamp(0.0, 1.0);
    LeagueParams {
        sample_matches: n,
        league_avg_goals: ((1.0 - w) * d.league_avg_goals + w * avg_goals).max(0.3),
        home_goal_multiplier: (1.0 - w) * d.home_goal_multiplier + w * multiplier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn played(hg: u32, ag: u32) -> PlayedMatch {
        PlayedMatch {
            date: None,
            date_raw: String::new(),
            home_team: "H".to_string(),
            away_team: "A".to_string(),
            home_goals: hg,
            away_goals: ag,
        }
    }

    #[test]
    fn empty_history_keeps_defaults() {
        assert_eq!(compute_league_params(&[]), LeagueParams::default());
    }

    #[test]
    fn large_sample_uses_observed_rates() {
        let rows: Vec<PlayedMatch> = (0..400).map(|_| played(2, 1)).collect();
        let p = compute_league_params(&rows);
        assert_eq!(p.sample_matches, 400);
        assert!((p.league_avg_goals - 1.5).abs() < 1e-9);
        assert!((p.home_goal_multiplier - 1.5).abs() < 1e-9);
    }

    #[test]
    fn small_sample_is_shrunk() {
        let rows: Vec<PlayedMatch> = (0..20).map(|_| played(4, 4)).collect();
        let p = compute_league_params(&rows);
        // w = 0.1: 0.9 * 1.35 + 0.1 * 4.0
        assert!((p.league_avg_goals - 1.615).abs() < 1e-9);
        assert!(p.home_goal_multiplier < 1.10);
    }
}
