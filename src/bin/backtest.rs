use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use laliga_predictor::calibration::{self, Metrics, Outcome, Prob3};
use laliga_predictor::form::Venue;
use laliga_predictor::history::MatchHistory;
use laliga_predictor::league_params::compute_league_params;
use laliga_predictor::poisson::goal_model;
use laliga_predictor::provider::StatsProvider;
use laliga_predictor::{ModelParams, TeamForm, VenueForms, predict, predict_with_venue_forms};

const DEFAULT_WARMUP: usize = 50;
const ECE_BINS: usize = 10;

#[derive(Debug, Clone, Copy)]
struct WalkRow {
    engine: Prob3,
    grid: Prob3,
    over_2_5: f64,
    outcome: Outcome,
    total_goals: u32,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = positional_args(&args())
        .into_iter()
        .next()
        .map(PathBuf::from)
        .or_else(|| std::env::var("MATCHES_PATH").ok().map(PathBuf::from))
        .context("usage: backtest <matches.json> [--warmup N] [--league] [--venue-split]")?;
    let warmup = parse_usize_arg("--warmup").unwrap_or(DEFAULT_WARMUP);

    let mut params = ModelParams::from_env();
    if has_flag("--venue-split") {
        params.venue_split = true;
    }
    let history = MatchHistory::load(&path)?.with_form_window(params.form_window);
    if history.len() <= warmup {
        return Err(anyhow!(
            "need more than {warmup} matches, {} found in {}",
            history.len(),
            path.display()
        ));
    }
    if has_flag("--league") {
        params = warmup_league(&history, warmup, params);
    }

    let pool = build_pool();
    let rows: Vec<WalkRow> = with_pool(&pool, || {
        (warmup..history.len())
            .into_par_iter()
            .filter_map(|idx| walk_forward_row(&history, idx, &params))
            .collect()
    });

    let outcomes: Vec<Outcome> = rows.iter().map(|r| r.outcome).collect();
    let engine: Vec<Prob3> = rows.iter().map(|r| r.engine).collect();
    let grid: Vec<Prob3> = rows.iter().map(|r| r.grid).collect();

    println!("Walk-forward backtest over {} matches (warmup {warmup})", rows.len());
    print_metrics(
        "strength 1X2",
        calibration::evaluate_probs(&engine, &outcomes),
        calibration::expected_calibration_error(&engine, &outcomes, ECE_BINS),
    );
    print_metrics(
        "poisson grid 1X2",
        calibration::evaluate_probs(&grid, &outcomes),
        calibration::expected_calibration_error(&grid, &outcomes, ECE_BINS),
    );

    let n = rows.len().max(1) as f64;
    let mean_over = rows.iter().map(|r| r.over_2_5).sum::<f64>() / n;
    let hit_over = rows.iter().filter(|r| r.total_goals >= 3).count() as f64 / n * 100.0;
    println!("over 2.5: predicted {mean_over:.1}%  observed {hit_over:.1}%");

    Ok(())
}

/// League constants fitted on the warmup matches only; scored matches never feed them.
fn warmup_league(history: &MatchHistory, warmup: usize, params: ModelParams) -> ModelParams {
    let warmup = warmup.min(history.len());
    let league = compute_league_params(&history.matches()[..warmup]);
    tracing::info!(
        samples = league.sample_matches,
        league_avg_goals = league.league_avg_goals,
        home_goal_multiplier = league.home_goal_multiplier,
        "league parameters fitted on warmup"
    );
    params.with_league(&league)
}

fn walk_forward_row(history: &MatchHistory, idx: usize, params: &ModelParams) -> Option<WalkRow> {
    let m = &history.matches()[idx];
    let view = history.before(idx);
    let home_form = view
        .team_form(&m.home_team)
        .unwrap_or_else(|_| TeamForm::new(m.home_team.clone()));
    let away_form = view
        .team_form(&m.away_team)
        .unwrap_or_else(|_| TeamForm::new(m.away_team.clone()));

    let (home_at_home, away_on_road) = if params.venue_split {
        (
            view.team_form_at(&m.home_team, Venue::Home)
                .unwrap_or_else(|_| home_form.clone()),
            view.team_form_at(&m.away_team, Venue::Away)
                .unwrap_or_else(|_| away_form.clone()),
        )
    } else {
        (home_form.clone(), away_form.clone())
    };

    let predicted = if params.venue_split {
        let venue = VenueForms {
            home_at_home: &home_at_home,
            away_on_road: &away_on_road,
        };
        predict_with_venue_forms(&m.home_team, &m.away_team, &home_form, &away_form, venue, params)
    } else {
        predict(&m.home_team, &m.away_team, &home_form, &away_form, params)
    };
    let result = match predicted {
        Ok(r) => r,
        Err(err) => {
            tracing::warn!(home = %m.home_team, away = %m.away_team, "skipping match: {err}");
            return None;
        }
    };
    let grid = goal_model(&home_at_home, &away_on_road, params).grid.outcome_split();

    Some(WalkRow {
        engine: result.probabilities.into(),
        grid,
        over_2_5: result.goal_probabilities.over_2_5,
        outcome: calibration::classify_outcome(m.home_goals, m.away_goals),
        total_goals: m.home_goals + m.away_goals,
    })
}

fn print_metrics(label: &str, m: Metrics, ece: f64) {
    println!(
        "{label:<18} n={:<5} brier={:.4} logloss={:.4} acc={:.3} ece={:.4}",
        m.samples, m.brier, m.log_loss, m.accuracy, ece
    );
}

fn build_pool() -> Option<rayon::ThreadPool> {
    let threads = std::env::var("BACKTEST_PARALLELISM")
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(4)
        .clamp(1, 32);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .ok()
}

fn with_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}

const VALUE_FLAGS: &[&str] = &["--warmup"];

fn args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

fn has_flag(name: &str) -> bool {
    args().iter().any(|a| a == name)
}

/// Accepts both `--name=N` and `--name N`.
fn parse_usize_arg(name: &str) -> Option<usize> {
    let args = args();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(val) = arg.strip_prefix(&prefix) {
            return val.trim().parse().ok();
        }
        if arg == name {
            return args.get(idx + 1).and_then(|v| v.trim().parse().ok());
        }
    }
    None
}

/// Arguments that are neither flags nor flag values.
fn positional_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        out.push(arg.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use laliga_predictor::history::PlayedMatch;

    use super::*;

    fn argv(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|a| a.to_string()).collect()
    }

    fn played(home: &str, away: &str, home_goals: u32, away_goals: u32) -> PlayedMatch {
        PlayedMatch {
            date: None,
            date_raw: String::new(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_goals,
            away_goals,
        }
    }

    #[test]
    fn flag_values_are_not_taken_as_the_path() {
        let args = argv(&["--warmup", "20", "matches.json", "--league"]);
        assert_eq!(positional_args(&args), ["matches.json"]);
        let args = argv(&["--warmup=20", "matches.json"]);
        assert_eq!(positional_args(&args), ["matches.json"]);
    }

    #[test]
    fn league_fit_ignores_scored_matches() {
        let mut matches = vec![played("A", "B", 1, 1); 4];
        matches.extend(vec![played("C", "D", 9, 9); 4]);
        let history = MatchHistory::from_matches(matches);
        let defaults = ModelParams::default();

        let fitted = warmup_league(&history, 4, defaults);
        let expected = defaults.with_league(&compute_league_params(&history.matches()[..4]));
        assert_eq!(fitted, expected);
        let leaky = defaults.with_league(&compute_league_params(history.matches()));
        assert!(fitted.league_avg_goals < leaky.league_avg_goals);
    }
}
