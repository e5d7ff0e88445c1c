use std::collections::{BTreeSet, HashMap};

use crate::error::{PredictError, PredictResult};
use crate::form::{TeamForm, Venue, normalize_team_name, team_key};

/// Source of aggregated team form. Lookups may be expensive; the engine never calls
/// a provider itself, only [`crate::predict::predict_with_provider`] does.
pub trait StatsProvider {
    fn known_teams(&self) -> BTreeSet<String>;

    fn team_form(&self, team: &str) -> PredictResult<TeamForm>;

    /// Form over matches played at `venue`. Providers without per-match venues return
    /// the overall form.
    fn team_form_at(&self, team: &str, _venue: Venue) -> PredictResult<TeamForm> {
        self.team_form(team)
    }

    /// Names are compared without regard to case or spacing.
    fn is_known(&self, team: &str) -> bool {
        let key = team_key(team);
        self.known_teams().iter().any(|known| team_key(known) == key)
    }
}

/// Fixed set of forms keyed by case-folded team name.
#[derive(Debug, Clone, Default)]
pub struct StaticForms {
    forms: HashMap<String, TeamForm>,
}

impl StaticForms {
    pub fn new(forms: impl IntoIterator<Item = TeamForm>) -> Self {
        Self {
            forms: forms
                .into_iter()
                .map(|f| (team_key(&f.team_name), f))
                .collect(),
        }
    }
}

impl StatsProvider for StaticForms {
    fn known_teams(&self) -> BTreeSet<String> {
        self.forms
            .values()
            .map(|f| normalize_team_name(&f.team_name))
            .collect()
    }

    fn team_form(&self, team: &str) -> PredictResult<TeamForm> {
        self.forms
            .get(&team_key(team))
            .cloned()
            .ok_or_else(|| PredictError::UnknownTeam(team.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_forms_lookup_normalizes_names() {
        let provider = StaticForms::new([TeamForm::from_totals("Real Betis", 3, 1, 1, 8, 5)]);
        assert!(provider.is_known("Real  Betis"));
        assert_eq!(provider.team_form("Real\nBetis").unwrap().wins, 3);
        assert_eq!(provider.team_form("real betis").unwrap().team_name, "Real Betis");
        assert!(provider.known_teams().contains("Real Betis"));
        assert_eq!(
            provider.team_form("Cadiz"),
            Err(PredictError::UnknownTeam("Cadiz".to_string()))
        );
    }
}
