use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::calibration::Prob3;
use crate::config::ModelParams;
use crate::form::TeamForm;

const MAX_GRID_GOALS: u32 = 30;
const TAIL_TOLERANCE: f64 = 1e-4;
/// Largest allowed gap between the grid's total mass and 1.
pub const GRID_MASS_TOLERANCE: f64 = 1e-3;

/// Poisson rate parameters for each side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedGoals {
    pub lambda_home: f64,
    pub lambda_away: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scoreline {
    pub home: u32,
    pub away: u32,
}

impl Scoreline {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    pub fn total(&self) -> u32 {
        self.home + self.away
    }
}

impl fmt::Display for Scoreline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

impl FromStr for Scoreline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, a) = s
            .split_once('-')
            .ok_or_else(|| format!("scoreline {s:?} is not H-A"))?;
        let home = h
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("bad home goals in {s:?}: {e}"))?;
        let away = a
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("bad away goals in {s:?}: {e}"))?;
        Ok(Self { home, away })
    }
}

impl Serialize for Scoreline {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Scoreline {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Joint probability of every exact scoreline in `0..=max_goals` for both sides,
/// assuming the two goal counts are independent Poisson variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorelineGrid {
    max_goals: u32,
    cells: Vec<f64>,
}

impl ScorelineGrid {
    pub fn new(expected: ExpectedGoals, max_goals: u32) -> Self {
        let pmf_h = poisson_pmf(expected.lambda_home, max_goals);
        let pmf_a = poisson_pmf(expected.lambda_away, max_goals);

        let mut cells = Vec::with_capacity(pmf_h.len() * pmf_a.len());
        for p_h in &pmf_h {
            for p_a in &pmf_a {
                cells.push(p_h * p_a);
            }
        }
        Self { max_goals, cells }
    }

    pub fn max_goals(&self) -> u32 {
        self.max_goals
    }

    pub fn get(&self, home: u32, away: u32) -> f64 {
        if home > self.max_goals || away > self.max_goals {
            return 0.0;
        }
        self.cells[(home * (self.max_goals + 1) + away) as usize]
    }

    /// Cells in row-major order (home goals outer, away goals inner).
    pub fn iter(&self) -> impl Iterator<Item = (Scoreline, f64)> + '_ {
        let side = self.max_goals + 1;
        self.cells.iter().enumerate().map(move |(idx, p)| {
            let idx = idx as u32;
            (Scoreline::new(idx / side, idx % side), *p)
        })
    }

    pub fn total_mass(&self) -> f64 {
        self.cells.iter().sum()
    }

    pub fn mass_where(&self, pred: impl Fn(Scoreline) -> bool) -> f64 {
        self.iter()
            .filter(|(s, _)| pred(*s))
            .map(|(_, p)| p)
            .sum()
    }

    /// Most probable cell; ties go to the fewest total goals, then the fewest home goals.
    pub fn most_likely(&self) -> Scoreline {
        let mut best = Scoreline::new(0, 0);
        let mut best_p = f64::NEG_INFINITY;
        for (score, p) in self.iter() {
            let better = p > best_p
                || (p == best_p && (score.total(), score.home) < (best.total(), best.home));
            if better {
                best = score;
                best_p = p;
            }
        }
        best
    }

    /// Probability of each match total, `0..=2*max_goals`.
    pub fn total_goals_distribution(&self) -> Vec<f64> {
        let mut out = vec![0.0; (2 * self.max_goals + 1) as usize];
        for (score, p) in self.iter() {
            out[score.total() as usize] += p;
        }
        out
    }

    /// 1X2 split implied by the grid, normalized over the covered mass.
    pub fn outcome_split(&self) -> Prob3 {
        let mut home = 0.0;
        let mut draw = 0.0;
        let mut away = 0.0;
        for (score, p) in self.iter() {
            if score.home > score.away {
                home += p;
            } else if score.home < score.away {
                away += p;
            } else {
                draw += p;
            }
        }
        let sum = home + draw + away;
        if sum > 0.0 {
            Prob3 {
                home: home / sum,
                draw: draw / sum,
                away: away / sum,
            }
        } else {
            Prob3::uniform()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalProbabilities {
    pub over_1_5: f64,
    pub over_2_5: f64,
    pub btts: f64,
}

impl GoalProbabilities {
    /// Closed-form thresholds from the untruncated marginals.
    ///
    /// The match total of two independent Poisson counts is Poisson(λh + λa), so the
    /// overs are complements of its first cells and BTTS is the product of both
    /// "scored at least once" probabilities.
    pub fn from_rates(expected: ExpectedGoals) -> Self {
        let lambda_home = expected.lambda_home.max(0.0);
        let lambda_away = expected.lambda_away.max(0.0);
        let total = poisson_pmf(lambda_home + lambda_away, 2);
        Self {
            over_1_5: percent(1.0 - total[0] - total[1]),
            over_2_5: percent(1.0 - total[0] - total[1] - total[2]),
            btts: percent((1.0 - (-lambda_home).exp()) * (1.0 - (-lambda_away).exp())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalModel {
    pub expected: ExpectedGoals,
    pub grid: ScorelineGrid,
    pub predicted_score: Scoreline,
    pub goal_probabilities: GoalProbabilities,
}

/// Attack rate times opponent defensive weakness, normalized by the league average.
///
/// Teams with no matches fall back to the league average for both rates. Both rates
/// are kept inside `[lambda_floor, lambda_ceiling]`.
pub fn expected_goals(
    home: &TeamForm,
    away: &TeamForm,
    league_avg_goals: f64,
    home_goal_multiplier: f64,
    (lambda_floor, lambda_ceiling): (f64, f64),
) -> ExpectedGoals {
    let league = league_avg_goals.max(f64::EPSILON);
    let lambda_home = home.avg_goals_for(league) * away.avg_goals_against(league) / league
        * home_goal_multiplier;
    let lambda_away = away.avg_goals_for(league) * home.avg_goals_against(league) / league;
    let ceiling = lambda_ceiling.max(lambda_floor);
    ExpectedGoals {
        lambda_home: lambda_home.clamp(lambda_floor, ceiling),
        lambda_away: lambda_away.clamp(lambda_floor, ceiling),
    }
}

pub fn goal_model(home: &TeamForm, away: &TeamForm, params: &ModelParams) -> GoalModel {
    let expected = expected_goals(
        home,
        away,
        params.league_avg_goals,
        params.home_goal_multiplier,
        (params.lambda_floor, params.lambda_ceiling),
    );
    let grid = ScorelineGrid::new(expected, grid_size(expected, params.max_goals));
    let predicted_score = grid.most_likely();
    let goal_probabilities = GoalProbabilities::from_rates(expected);
    GoalModel {
        expected,
        grid,
        predicted_score,
        goal_probabilities,
    }
}

/// Smallest grid side, at least `min_goals`, whose truncated tail for the larger rate is
/// below `TAIL_TOLERANCE`.
pub fn grid_size(expected: ExpectedGoals, min_goals: u32) -> u32 {
    let lambda = expected.lambda_home.max(expected.lambda_away);
    let mut k = min_goals;
    while k < MAX_GRID_GOALS && 1.0 - poisson_pmf(lambda, k).iter().sum::<f64>() > TAIL_TOLERANCE {
        k += 1;
    }
    k
}

/// Truncated pmf `P(0..=max_k)`; the tail beyond `max_k` is left out.
pub fn poisson_pmf(lambda: f64, max_k: u32) -> Vec<f64> {
    let max_k = max_k as usize;
    let lambda = lambda.max(0.0);
    let mut out = vec![0.0; max_k + 1];
    out[0] = (-lambda).exp();
    for k in 1..=max_k {
        out[k] = out[k - 1] * lambda / k as f64;
    }
    out
}

fn percent(p: f64) -> f64 {
    ((p * 100.0).clamp(0.0, 100.0) * 10.0).round() / 10.0
}
