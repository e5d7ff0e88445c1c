use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use laliga_predictor::form::Venue;
use laliga_predictor::history::MatchHistory;
use laliga_predictor::league_params::compute_league_params;
use laliga_predictor::poisson::goal_model;
use laliga_predictor::provider::StatsProvider;
use laliga_predictor::sample::simulate;
use laliga_predictor::{ModelParams, predict_with_provider};

const DEFAULT_DATA_PATH: &str = "data/matches.json";

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let data_path = parse_str_arg("--data")
        .or_else(|| std::env::var("MATCHES_PATH").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

    let mut params = ModelParams::from_env();
    if let Some(n) = parse_u64_arg("--last-n") {
        params.form_window = (n as usize).clamp(1, 50);
    }
    if has_flag("--venue-split") {
        params.venue_split = true;
    }

    let history = MatchHistory::load(&data_path)?.with_form_window(params.form_window);
    if has_flag("--league") {
        let league = compute_league_params(history.matches());
        tracing::info!(
            samples = league.sample_matches,
            league_avg_goals = league.league_avg_goals,
            home_goal_multiplier = league.home_goal_multiplier,
            "using league parameters from history"
        );
        params = params.with_league(&league);
    }

    if has_flag("--list-teams") {
        for team in history.known_teams() {
            println!("{team}");
        }
        return Ok(());
    }

    let teams = positional_args();
    let [home, away] = teams.as_slice() else {
        return Err(anyhow!(
            "usage: predict [--data PATH] [--last-n N] [--league] [--venue-split] [--simulate N --seed S] HOME AWAY"
        ));
    };

    let result = predict_with_provider(&history, home, away, &params)
        .with_context(|| format!("predict {home} vs {away}"))?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(draws) = parse_u64_arg("--simulate") {
        let seed = parse_u64_arg("--seed").unwrap_or(0);
        let (home_form, away_form) = if params.venue_split {
            (
                history
                    .team_form_at(home, Venue::Home)
                    .or_else(|_| history.team_form(home))?,
                history
                    .team_form_at(away, Venue::Away)
                    .or_else(|_| history.team_form(away))?,
            )
        } else {
            (history.team_form(home)?, history.team_form(away)?)
        };
        let model = goal_model(&home_form, &away_form, &params);
        let counts = simulate(&model.grid, &mut StdRng::seed_from_u64(seed), draws as usize);

        let mut rows: Vec<_> = counts.into_iter().collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        println!("Simulated {draws} matches (seed {seed}):");
        for (score, count) in rows.into_iter().take(10) {
            println!("  {score}  {:.1}%", count as f64 / draws.max(1) as f64 * 100.0);
        }
    }

    Ok(())
}

fn args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

fn has_flag(name: &str) -> bool {
    args().iter().any(|a| a == name)
}

fn parse_str_arg(name: &str) -> Option<String> {
    let args = args();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(val) = arg.strip_prefix(&prefix) {
            let trimmed = val.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.clone());
            }
        }
    }
    None
}

fn parse_u64_arg(name: &str) -> Option<u64> {
    parse_str_arg(name).and_then(|v| v.parse::<u64>().ok())
}

/// Arguments that are neither flags nor flag values.
fn positional_args() -> Vec<String> {
    const VALUE_FLAGS: &[&str] = &["--data", "--last-n", "--simulate", "--seed"];
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args() {
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
        out.push(arg);
    }
    out
}
