use serde::{Deserialize, Serialize};

use crate::config::ModelParams;
use crate::form::TeamForm;

const POINT_RATE_WEIGHT: f64 = 0.7;
const GOAL_DIFF_WEIGHT: f64 = 0.3;

const STRONG_ATTACK_RATIO: f64 = 1.2;
const WEAK_ATTACK_RATIO: f64 = 0.8;

/// Relative strength scalar used by the 1X2 model.
///
/// Weighted blend of points per match and goal difference per match, clamped to
/// `[0, rating_max]`. Teams without matches get the neutral rating.
pub fn rating(form: &TeamForm, params: &ModelParams) -> f64 {
    if form.played == 0 {
        return params.neutral_rating;
    }
    let played = form.played.max(1) as f64;
    let point_rate = form.points() as f64 / played;
    let goal_diff = (form.goals_for as f64 - form.goals_against as f64) / played;
    (point_rate * POINT_RATE_WEIGHT + goal_diff * GOAL_DIFF_WEIGHT).clamp(0.0, params.rating_max)
}

/// Attack classification for display. Never feeds into the goal model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStrength {
    Strong,
    Average,
    Weak,
}

impl GoalStrength {
    pub fn classify(avg_goals_for: f64, league_avg_goals: f64) -> Self {
        if avg_goals_for >= league_avg_goals * STRONG_ATTACK_RATIO {
            Self::Strong
        } else if avg_goals_for <= league_avg_goals * WEAK_ATTACK_RATIO {
            Self::Weak
        } else {
            Self::Average
        }
    }
}

/// Points-ratio label for recent form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormRating {
    Excellent,
    Good,
    Average,
    Poor,
    NoData,
}

impl FormRating {
    pub fn classify(form: &TeamForm) -> Self {
        if form.played == 0 {
            return Self::NoData;
        }
        let ratio = form.points() as f64 / (form.played as f64 * 3.0);
        if ratio >= 0.8 {
            Self::Excellent
        } else if ratio >= 0.5 {
            Self::Good
        } else if ratio >= 0.3 {
            Self::Average
        } else {
            Self::Poor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_matches_weighted_blend() {
        let form = TeamForm::from_totals("A", 7, 2, 1, 20, 8);
        let r = rating(&form, &ModelParams::default());
        // 2.3 * 0.7 + 1.2 * 0.3
        assert!((r - 1.97).abs() < 1e-9);
    }

    #[test]
    fn rating_is_clamped() {
        let params = ModelParams::default();
        let dominant = TeamForm::from_totals("A", 10, 0, 0, 60, 0);
        let hopeless = TeamForm::from_totals("B", 0, 0, 10, 0, 50);
        assert_eq!(rating(&dominant, &params), params.rating_max);
        assert_eq!(rating(&hopeless, &params), 0.0);
    }

    #[test]
    fn empty_form_is_neutral() {
        let params = ModelParams::default();
        assert_eq!(rating(&TeamForm::new("C"), &params), params.neutral_rating);
    }

    #[test]
    fn rating_is_monotonic_in_results_and_goals() {
        let params = ModelParams::default();
        let base = TeamForm::from_totals("A", 4, 3, 3, 12, 12);
        let more_wins = TeamForm::from_totals("A", 5, 3, 2, 12, 12);
        let better_gd = TeamForm::from_totals("A", 4, 3, 3, 15, 10);
        assert!(rating(&more_wins, &params) > rating(&base, &params));
        assert!(rating(&better_gd, &params) > rating(&base, &params));
    }

    #[test]
    fn classifies_attack_and_form() {
        assert_eq!(GoalStrength::classify(2.0, 1.35), GoalStrength::Strong);
        assert_eq!(GoalStrength::classify(1.35, 1.35), GoalStrength::Average);
        assert_eq!(GoalStrength::classify(0.9, 1.35), GoalStrength::Weak);

        assert_eq!(
            FormRating::classify(&TeamForm::from_totals("A", 4, 1, 0, 9, 2)),
            FormRating::Excellent
        );
        assert_eq!(
            FormRating::classify(&TeamForm::from_totals("B", 0, 2, 3, 2, 9)),
            FormRating::Poor
        );
        assert_eq!(FormRating::classify(&TeamForm::new("C")), FormRating::NoData);
    }
}
