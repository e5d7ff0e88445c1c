use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::error::{PredictError, PredictResult};
use crate::form::{MatchOutcome, MatchRecord, TeamForm, Venue, normalize_team_name, team_key};
use crate::provider::StatsProvider;

pub const DEFAULT_FORM_WINDOW: usize = 10;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

/// Match row as written by the collector. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMatch {
    home_team: String,
    away_team: String,
    home_score: Option<u32>,
    away_score: Option<u32>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedMatch {
    pub date: Option<NaiveDate>,
    pub date_raw: String,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: u32,
    pub away_goals: u32,
}

impl PlayedMatch {
    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    pub fn venue_of(&self, team: &str) -> Option<Venue> {
        if self.home_team == team {
            Some(Venue::Home)
        } else if self.away_team == team {
            Some(Venue::Away)
        } else {
            None
        }
    }

    fn date_label(&self) -> String {
        match self.date {
            Some(d) => d.format("%Y-%m-%d").to_string(),
            None if !self.date_raw.trim().is_empty() => self.date_raw.trim().to_string(),
            None => "Unknown".to_string(),
        }
    }
}

/// Finished matches in chronological order. Rows with unparseable dates sort first.
#[derive(Debug, Clone, Default)]
pub struct MatchHistory {
    matches: Vec<PlayedMatch>,
    form_window: usize,
}

impl MatchHistory {
    pub fn from_matches(mut matches: Vec<PlayedMatch>) -> Self {
        matches.sort_by_key(|m| m.date);
        Self {
            matches,
            form_window: DEFAULT_FORM_WINDOW,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read match history {}", path.display()))?;
        let history = Self::parse_json(&raw)
            .with_context(|| format!("parse match history {}", path.display()))?;
        debug!(path = %path.display(), matches = history.len(), "match history loaded");
        Ok(history)
    }

    pub fn parse_json(raw: &str) -> Result<Self> {
        let rows: Vec<RawMatch> = serde_json::from_str(raw).context("invalid match json")?;
        let matches = rows
            .into_iter()
            .filter_map(|row| {
                let (Some(home_goals), Some(away_goals)) = (row.home_score, row.away_score) else {
                    return None;
                };
                let home_team = normalize_team_name(&row.home_team);
                let away_team = normalize_team_name(&row.away_team);
                if home_team.is_empty() || away_team.is_empty() {
                    return None;
                }
                let date_raw = row.date.unwrap_or_default();
                Some(PlayedMatch {
                    date: parse_match_date(&date_raw),
                    date_raw,
                    home_team,
                    away_team,
                    home_goals,
                    away_goals,
                })
            })
            .collect();
        Ok(Self::from_matches(matches))
    }

    pub fn with_form_window(mut self, form_window: usize) -> Self {
        self.form_window = form_window.max(1);
        self
    }

    pub fn matches(&self) -> &[PlayedMatch] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn view(&self) -> HistoryView<'_> {
        self.before(self.matches.len())
    }

    /// Provider over the matches strictly before `index`; used for look-ahead-free backtests.
    pub fn before(&self, index: usize) -> HistoryView<'_> {
        HistoryView {
            matches: &self.matches[..index.min(self.matches.len())],
            form_window: self.form_window,
        }
    }
}

impl StatsProvider for MatchHistory {
    fn known_teams(&self) -> BTreeSet<String> {
        self.view().known_teams()
    }

    fn team_form(&self, team: &str) -> PredictResult<TeamForm> {
        self.view().team_form(team)
    }

    fn team_form_at(&self, team: &str, venue: Venue) -> PredictResult<TeamForm> {
        self.view().team_form_at(team, venue)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HistoryView<'a> {
    matches: &'a [PlayedMatch],
    form_window: usize,
}

impl<'a> HistoryView<'a> {
    /// The history's own spelling of `team`, matched without regard to case or spacing.
    fn canonical_name(&self, team: &str) -> PredictResult<&'a str> {
        let key = team_key(team);
        self.matches
            .iter()
            .rev()
            .flat_map(|m| [m.home_team.as_str(), m.away_team.as_str()])
            .find(|name| name.to_lowercase() == key)
            .ok_or_else(|| PredictError::UnknownTeam(normalize_team_name(team)))
    }

    fn lookup(&self, team: &str, venue: Option<Venue>) -> PredictResult<TeamForm> {
        let canonical = self.canonical_name(team)?;
        form_from_matches(self.matches, canonical, self.form_window, venue)
            .ok_or_else(|| PredictError::UnknownTeam(canonical.to_string()))
    }
}

impl StatsProvider for HistoryView<'_> {
    fn known_teams(&self) -> BTreeSet<String> {
        self.matches
            .iter()
            .flat_map(|m| [m.home_team.clone(), m.away_team.clone()])
            .collect()
    }

    fn team_form(&self, team: &str) -> PredictResult<TeamForm> {
        self.lookup(team, None)
    }

    /// Last-N form over matches at `venue` only; `UnknownTeam` when there are none.
    fn team_form_at(&self, team: &str, venue: Venue) -> PredictResult<TeamForm> {
        self.lookup(team, Some(venue))
    }
}

/// Aggregates the team's last `last_n` matches, optionally only those at `venue`.
/// `None` when no match qualifies.
pub fn form_from_matches(
    matches: &[PlayedMatch],
    team: &str,
    last_n: usize,
    venue: Option<Venue>,
) -> Option<TeamForm> {
    let mut recent: Vec<&PlayedMatch> = matches
        .iter()
        .rev()
        .filter(|m| match (m.venue_of(team), venue) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(at), Some(wanted)) => at == wanted,
        })
        .take(last_n)
        .collect();
    if recent.is_empty() {
        return None;
    }
    recent.reverse();

    let mut form = TeamForm::new(team);
    for m in recent {
        let is_home = m.home_team == team;
        let (goals_for, goals_against) = if is_home {
            (m.home_goals, m.away_goals)
        } else {
            (m.away_goals, m.home_goals)
        };
        let record = MatchRecord {
            date: m.date_label(),
            opponent: if is_home {
                m.away_team.clone()
            } else {
                m.home_team.clone()
            },
            venue: if is_home { Venue::Home } else { Venue::Away },
            score: format!("{}-{}", m.home_goals, m.away_goals),
            outcome: MatchOutcome::from_goals(goals_for, goals_against),
        };
        form.record(record, goals_for, goals_against);
    }
    Some(form)
}

pub fn parse_match_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let s = s.split_once('T').map(|(d, _)| d).unwrap_or(s);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn played(date: &str, home: &str, away: &str, hg: u32, ag: u32) -> PlayedMatch {
        PlayedMatch {
            date: parse_match_date(date),
            date_raw: date.to_string(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_goals: hg,
            away_goals: ag,
        }
    }

    #[test]
    fn parses_supported_date_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_match_date("2024-03-09"), d);
        assert_eq!(parse_match_date("09/03/2024"), d);
        assert_eq!(parse_match_date("2024-03-09T18:30:00Z"), d);
        assert_eq!(parse_match_date("Sat 9 March"), None);
    }

    #[test]
    fn form_uses_most_recent_matches_in_order() {
        let history = MatchHistory::from_matches(vec![
            played("2024-03-10", "Sevilla", "Valencia", 2, 0),
            played("2024-01-05", "Valencia", "Sevilla", 1, 1),
            played("2024-02-01", "Girona", "Sevilla", 3, 1),
        ])
        .with_form_window(2);

        let form = history.team_form("Sevilla").unwrap();
        assert_eq!(form.played, 2);
        assert_eq!((form.wins, form.draws, form.losses), (1, 0, 1));
        assert_eq!((form.goals_for, form.goals_against), (3, 3));
        let last = form.match_history.last().unwrap();
        assert_eq!(last.date, "2024-03-10");
        assert_eq!(last.venue, Venue::Home);
        assert_eq!(last.outcome, MatchOutcome::Win);
    }

    #[test]
    fn venue_filter_keeps_only_matching_side() {
        let history = MatchHistory::from_matches(vec![
            played("2024-01-01", "Sevilla", "Valencia", 2, 0),
            played("2024-01-08", "Girona", "Sevilla", 3, 1),
            played("2024-01-15", "Sevilla", "Getafe", 1, 1),
        ]);
        let home = history.team_form_at("sevilla", Venue::Home).unwrap();
        assert_eq!(home.team_name, "Sevilla");
        assert_eq!((home.played, home.goals_for, home.goals_against), (2, 3, 1));
        assert!(home.match_history.iter().all(|r| r.venue == Venue::Home));

        let away = history.team_form_at("Sevilla", Venue::Away).unwrap();
        assert_eq!((away.wins, away.draws, away.losses), (0, 0, 1));
        assert!(history.team_form_at("Valencia", Venue::Home).is_err());
    }

    #[test]
    fn lookups_ignore_case() {
        let history =
            MatchHistory::from_matches(vec![played("2024-01-01", "Real Madrid", "Getafe", 2, 0)]);
        assert_eq!(history.team_form("REAL madrid").unwrap().team_name, "Real Madrid");
        assert!(history.is_known("getafe"));
    }

    #[test]
    fn view_before_hides_later_matches() {
        let history = MatchHistory::from_matches(vec![
            played("2024-01-01", "Mallorca", "Getafe", 0, 0),
            played("2024-02-01", "Getafe", "Alaves", 2, 1),
        ]);
        let early = history.before(1);
        assert!(early.team_form("Alaves").is_err());
        assert_eq!(early.known_teams().len(), 2);
        assert_eq!(history.known_teams().len(), 3);
    }

    #[test]
    fn unplayed_rows_are_skipped() {
        let raw = r#"[
            {"homeTeam":"Real\nMadrid","awayTeam":"Barcelona","homeScore":3,"awayScore":2,"date":"21/04/2024","stadium":"Bernabeu"},
            {"homeTeam":"Barcelona","awayTeam":"Real Madrid","homeScore":null,"awayScore":null}
        ]"#;
        let history = MatchHistory::parse_json(raw).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.matches()[0].home_team, "Real Madrid");
    }
}
