use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::confidence::confidence;
use crate::config::ModelParams;
use crate::error::{PredictError, PredictResult};
use crate::form::{FormSummary, TeamForm, Venue, normalize_team_name, team_key};
use crate::outcome::{OutcomeProbabilities, outcome_probs};
use crate::poisson::{
    ExpectedGoals, GRID_MASS_TOLERANCE, GoalModel, GoalProbabilities, Scoreline, goal_model,
};
use crate::provider::StatsProvider;
use crate::strength::rating;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub home_form: FormSummary,
    pub away_form: FormSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub home_team: String,
    pub away_team: String,
    pub predicted_score: Scoreline,
    pub probabilities: OutcomeProbabilities,
    pub goal_probabilities: GoalProbabilities,
    pub confidence: f64,
    pub expected_goals: ExpectedGoals,
    /// Set when at least one side had no matches and league defaults stood in for its rates.
    pub low_confidence: bool,
    pub insights: Insights,
    /// Home-only and away-only forms that fed the goal model, when venue split was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_forms: Option<Insights>,
}

/// Goal-model inputs taken from one venue each: the home side's home matches and the
/// away side's away matches.
#[derive(Debug, Clone, Copy)]
pub struct VenueForms<'a> {
    pub home_at_home: &'a TeamForm,
    pub away_on_road: &'a TeamForm,
}

/// Predicts a single fixture from both teams' form.
///
/// Pure: the same inputs always give the same result, and nothing is shared between calls.
pub fn predict(
    home_team: &str,
    away_team: &str,
    home_form: &TeamForm,
    away_form: &TeamForm,
    params: &ModelParams,
) -> PredictResult<PredictionResult> {
    assemble(home_team, away_team, home_form, away_form, None, params)
}

/// Like [`predict`], but the expected-goal rates come from `venue` forms. Ratings,
/// the 1X2 split and confidence still use the overall forms.
pub fn predict_with_venue_forms(
    home_team: &str,
    away_team: &str,
    home_form: &TeamForm,
    away_form: &TeamForm,
    venue: VenueForms<'_>,
    params: &ModelParams,
) -> PredictResult<PredictionResult> {
    assemble(home_team, away_team, home_form, away_form, Some(venue), params)
}

fn assemble(
    home_team: &str,
    away_team: &str,
    home_form: &TeamForm,
    away_form: &TeamForm,
    venue: Option<VenueForms<'_>>,
    params: &ModelParams,
) -> PredictResult<PredictionResult> {
    let home_team = requested_name(home_team)?;
    let away_team = requested_name(away_team)?;
    if same_team(&home_team, &away_team) {
        return Err(PredictError::SameTeam(home_team));
    }
    let home_team = ensure_form_for(&home_team, home_form)?;
    let away_team = ensure_form_for(&away_team, away_form)?;
    home_form.validate()?;
    away_form.validate()?;
    let (goals_home, goals_away) = match venue {
        Some(v) => {
            ensure_form_for(&home_team, v.home_at_home)?;
            ensure_form_for(&away_team, v.away_on_road)?;
            v.home_at_home.validate()?;
            v.away_on_road.validate()?;
            (v.home_at_home, v.away_on_road)
        }
        None => (home_form, away_form),
    };

    let low_confidence = home_form.played == 0 || away_form.played == 0;
    if home_form.played == 0 && away_form.played == 0 {
        warn!(%home_team, %away_team, "no matches for either team, using league defaults");
    }

    let home_rating = rating(home_form, params);
    let away_rating = rating(away_form, params);
    let probabilities = outcome_probs(
        home_rating,
        away_rating,
        params.home_advantage,
        params.draw_reserve,
    );

    let GoalModel {
        expected,
        grid,
        predicted_score,
        goal_probabilities,
    } = goal_model(goals_home, goals_away, params);
    debug!(
        %home_team,
        %away_team,
        home_rating,
        away_rating,
        lambda_home = expected.lambda_home,
        lambda_away = expected.lambda_away,
        "match model inputs"
    );

    let confidence = confidence(&probabilities, home_form.played, away_form.played, params);

    let result = PredictionResult {
        home_team,
        away_team,
        predicted_score,
        probabilities,
        goal_probabilities,
        confidence,
        expected_goals: expected,
        low_confidence,
        insights: Insights {
            home_form: FormSummary::new(home_form, home_rating, params.league_avg_goals),
            away_form: FormSummary::new(away_form, away_rating, params.league_avg_goals),
        },
        venue_forms: venue.map(|v| Insights {
            home_form: summarize(v.home_at_home, params),
            away_form: summarize(v.away_on_road, params),
        }),
    };
    check_invariants(&result, grid.total_mass())?;
    Ok(result)
}

/// Looks both teams up in `provider` and predicts the fixture.
///
/// With `params.venue_split`, the goal model uses the home side's home form and the away
/// side's away form; a side with no matches at that venue keeps its overall form.
pub fn predict_with_provider(
    provider: &impl StatsProvider,
    home_team: &str,
    away_team: &str,
    params: &ModelParams,
) -> PredictResult<PredictionResult> {
    let home = requested_name(home_team)?;
    if same_team(&home, &requested_name(away_team)?) {
        return Err(PredictError::SameTeam(home));
    }
    let home_form = provider.team_form(home_team)?;
    let away_form = provider.team_form(away_team)?;
    if !params.venue_split {
        return predict(home_team, away_team, &home_form, &away_form, params);
    }

    let home_at_home = provider
        .team_form_at(home_team, Venue::Home)
        .unwrap_or_else(|_| home_form.clone());
    let away_on_road = provider
        .team_form_at(away_team, Venue::Away)
        .unwrap_or_else(|_| away_form.clone());
    let venue = VenueForms {
        home_at_home: &home_at_home,
        away_on_road: &away_on_road,
    };
    predict_with_venue_forms(home_team, away_team, &home_form, &away_form, venue, params)
}

fn summarize(form: &TeamForm, params: &ModelParams) -> FormSummary {
    FormSummary::new(form, rating(form, params), params.league_avg_goals)
}

fn requested_name(raw: &str) -> PredictResult<String> {
    let name = normalize_team_name(raw);
    if name.is_empty() {
        return Err(PredictError::UnknownTeam(raw.to_string()));
    }
    Ok(name)
}

fn same_team(a: &str, b: &str) -> bool {
    team_key(a) == team_key(b)
}

/// Returns the form's own spelling of the team name once it matches the request.
fn ensure_form_for(team: &str, form: &TeamForm) -> PredictResult<String> {
    let canonical = normalize_team_name(&form.team_name);
    if !same_team(team, &canonical) {
        return Err(PredictError::UnknownTeam(team.to_string()));
    }
    Ok(canonical)
}

fn check_invariants(result: &PredictionResult, grid_mass: f64) -> PredictResult<()> {
    let p = &result.probabilities;
    let g = &result.goal_probabilities;
    let in_range = |v: f64| (0.0..=100.0).contains(&v);

    let violation = if p.total_tenths() != 1000 {
        Some(format!("1X2 sums to {} tenths", p.total_tenths()))
    } else if !p.as_array().into_iter().all(in_range) {
        Some(format!("1X2 bucket out of range: {p:?}"))
    } else if ![g.over_1_5, g.over_2_5, g.btts].into_iter().all(in_range) {
        Some(format!("goal probability out of range: {g:?}"))
    } else if g.over_2_5 > g.over_1_5 {
        Some(format!("over 2.5 ({}) above over 1.5 ({})", g.over_2_5, g.over_1_5))
    } else if !in_range(result.confidence) {
        Some(format!("confidence out of range: {}", result.confidence))
    } else if (grid_mass - 1.0).abs() > GRID_MASS_TOLERANCE {
        Some(format!("scoreline grid holds {grid_mass} of the mass"))
    } else {
        None
    };

    match violation {
        Some(msg) => {
            error!(home = %result.home_team, away = %result.away_team, "{msg}");
            Err(PredictError::InvariantViolation(msg))
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team_a() -> TeamForm {
        TeamForm::from_totals("Team A", 7, 2, 1, 20, 8)
    }

    fn team_b() -> TeamForm {
        TeamForm::from_totals("Team B", 2, 3, 5, 9, 18)
    }

    #[test]
    fn strong_home_team_is_favoured() {
        let r = predict("Team A", "Team B", &team_a(), &team_b(), &ModelParams::default())
            .unwrap();
        assert!(r.probabilities.home_win > 60.0);
        assert!(r.expected_goals.lambda_home > r.expected_goals.lambda_away);
        assert!(r.predicted_score.home >= r.predicted_score.away);
        assert!(!r.low_confidence);
    }

    #[test]
    fn same_team_is_rejected() {
        let err = predict("Team A", "team  a", &team_a(), &team_a(), &ModelParams::default())
            .unwrap_err();
        assert_eq!(err, PredictError::SameTeam("Team A".to_string()));
    }

    #[test]
    fn mismatched_or_blank_names_are_unknown() {
        let params = ModelParams::default();
        assert!(matches!(
            predict("  ", "Team B", &team_a(), &team_b(), &params),
            Err(PredictError::UnknownTeam(_))
        ));
        assert!(matches!(
            predict("Team C", "Team B", &team_a(), &team_b(), &params),
            Err(PredictError::UnknownTeam(_))
        ));
    }

    #[test]
    fn invalid_form_is_rejected() {
        let mut broken = team_b();
        broken.losses += 1;
        assert!(matches!(
            predict("Team A", "Team B", &team_a(), &broken, &ModelParams::default()),
            Err(PredictError::InvalidForm { .. })
        ));
    }

    #[test]
    fn invariant_check_catches_bad_totals() {
        let mut r = predict("Team A", "Team B", &team_a(), &team_b(), &ModelParams::default())
            .unwrap();
        r.probabilities.draw += 1.0;
        assert!(matches!(
            check_invariants(&r, 1.0),
            Err(PredictError::InvariantViolation(_))
        ));
    }

    #[test]
    fn invariant_check_catches_truncated_grid() {
        let r = predict("Team A", "Team B", &team_a(), &team_b(), &ModelParams::default())
            .unwrap();
        assert!(check_invariants(&r, 1.0).is_ok());
        assert!(matches!(
            check_invariants(&r, 0.9),
            Err(PredictError::InvariantViolation(_))
        ));
    }

    #[test]
    fn runaway_scoring_stays_within_bounds() {
        let rampant = TeamForm::from_totals("Rampant", 2, 0, 0, 40, 0);
        let sieve = TeamForm::from_totals("Sieve", 0, 0, 2, 0, 40);
        let r = predict("Rampant", "Sieve", &rampant, &sieve, &ModelParams::default()).unwrap();
        assert_eq!(r.expected_goals.lambda_home, ModelParams::default().lambda_ceiling);
        assert!(r.goal_probabilities.over_1_5 > 99.0);
        assert!(r.goal_probabilities.over_2_5 > 99.0);
        assert!(r.predicted_score.home <= 10);
    }

    #[test]
    fn venue_forms_drive_expected_goals_only() {
        let params = ModelParams::default();
        let home_at_home = TeamForm::from_totals("Team A", 5, 0, 0, 15, 2);
        let away_on_road = TeamForm::from_totals("Team B", 0, 1, 4, 2, 12);
        let venue = VenueForms {
            home_at_home: &home_at_home,
            away_on_road: &away_on_road,
        };
        let plain = predict("Team A", "Team B", &team_a(), &team_b(), &params).unwrap();
        let split =
            predict_with_venue_forms("Team A", "Team B", &team_a(), &team_b(), venue, &params)
                .unwrap();

        assert_eq!(plain.probabilities, split.probabilities);
        assert!(split.expected_goals.lambda_home > plain.expected_goals.lambda_home);
        assert!(plain.venue_forms.is_none());
        let shown = split.venue_forms.expect("venue forms reported");
        assert_eq!(shown.home_form.played, 5);

        let stranger = TeamForm::from_totals("Team C", 1, 0, 0, 1, 0);
        let wrong = VenueForms {
            home_at_home: &stranger,
            away_on_road: &away_on_road,
        };
        assert!(matches!(
            predict_with_venue_forms("Team A", "Team B", &team_a(), &team_b(), wrong, &params),
            Err(PredictError::UnknownTeam(_))
        ));
    }
}
