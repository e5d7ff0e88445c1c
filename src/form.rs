use serde::{Deserialize, Serialize};

use crate::error::{PredictError, PredictResult};
use crate::strength::{FormRating, GoalStrength};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Win,
    Draw,
    Loss,
}

impl MatchOutcome {
    pub fn from_goals(goals_for: u32, goals_against: u32) -> Self {
        if goals_for > goals_against {
            Self::Win
        } else if goals_for < goals_against {
            Self::Loss
        } else {
            Self::Draw
        }
    }
}

/// One played match seen from a single team's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: String,
    pub opponent: String,
    pub venue: Venue,
    /// Home-away score, e.g. `"2-1"`, regardless of which side this team was.
    pub score: String,
    pub outcome: MatchOutcome,
}

/// Aggregated recent form for one team, as supplied by a stats provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamForm {
    pub team_name: String,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    #[serde(default)]
    pub match_history: Vec<MatchRecord>,
}

impl TeamForm {
    pub fn new(team_name: impl Into<String>) -> Self {
        Self {
            team_name: team_name.into(),
            played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            goals_for: 0,
            goals_against: 0,
            match_history: Vec::new(),
        }
    }

    /// Convenience constructor for aggregate-only forms; `played` is derived from the results.
    pub fn from_totals(
        team_name: impl Into<String>,
        wins: u32,
        draws: u32,
        losses: u32,
        goals_for: u32,
        goals_against: u32,
    ) -> Self {
        Self {
            team_name: team_name.into(),
            played: wins.saturating_add(draws).saturating_add(losses),
            wins,
            draws,
            losses,
            goals_for,
            goals_against,
            match_history: Vec::new(),
        }
    }

    /// Folds one match into the aggregate and appends it to the history.
    pub fn record(&mut self, record: MatchRecord, goals_for: u32, goals_against: u32) {
        self.played += 1;
        self.goals_for += goals_for;
        self.goals_against += goals_against;
        match record.outcome {
            MatchOutcome::Win => self.wins += 1,
            MatchOutcome::Draw => self.draws += 1,
            MatchOutcome::Loss => self.losses += 1,
        }
        self.match_history.push(record);
    }

    pub fn validate(&self) -> PredictResult<()> {
        let results = u64::from(self.wins) + u64::from(self.draws) + u64::from(self.losses);
        if results != u64::from(self.played) {
            return Err(PredictError::InvalidForm {
                team: self.team_name.clone(),
                reason: format!(
                    "wins+draws+losses = {results} but played = {}",
                    self.played
                ),
            });
        }
        Ok(())
    }

    pub fn points(&self) -> u64 {
        3 * u64::from(self.wins) + u64::from(self.draws)
    }

    /// Goals scored per match, or `fallback` when the team has no matches.
    pub fn avg_goals_for(&self, fallback: f64) -> f64 {
        if self.played == 0 {
            fallback
        } else {
            self.goals_for as f64 / self.played as f64
        }
    }

    pub fn avg_goals_against(&self, fallback: f64) -> f64 {
        if self.played == 0 {
            fallback
        } else {
            self.goals_against as f64 / self.played as f64
        }
    }
}

/// Display-ready digest of a [`TeamForm`], returned in prediction insights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSummary {
    pub team: String,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub avg_goals_for: f64,
    pub avg_goals_against: f64,
    pub rating: f64,
    pub form: FormRating,
    pub strength: GoalStrength,
    pub match_history: Vec<MatchRecord>,
}

impl FormSummary {
    pub fn new(form: &TeamForm, rating: f64, league_avg_goals: f64) -> Self {
        let avg_for = form.avg_goals_for(league_avg_goals);
        Self {
            team: form.team_name.clone(),
            played: form.played,
            wins: form.wins,
            draws: form.draws,
            losses: form.losses,
            avg_goals_for: round3(avg_for),
            avg_goals_against: round3(form.avg_goals_against(league_avg_goals)),
            rating: round3(rating),
            form: FormRating::classify(form),
            strength: GoalStrength::classify(avg_for, league_avg_goals),
            match_history: form.match_history.clone(),
        }
    }
}

/// Collapses runs of whitespace (including newlines from scraped names) into single spaces.
pub fn normalize_team_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lookup key for a team: normalized whitespace, case folded.
pub fn team_key(raw: &str) -> String {
    normalize_team_name(raw).to_lowercase()
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
