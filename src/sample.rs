use std::collections::BTreeMap;

use rand::Rng;

use crate::poisson::{Scoreline, ScorelineGrid};

/// Draws one scoreline in proportion to the grid's probability mass.
///
/// The engine never samples on its own; callers that want variety pass their own
/// (ideally seeded) rng. Mass outside the grid falls to the highest-scoring cell.
pub fn sample_scoreline<R: Rng>(grid: &ScorelineGrid, rng: &mut R) -> Scoreline {
    let target: f64 = rng.gen_range(0.0..1.0);
    let mut acc = 0.0;
    let mut last = Scoreline::new(grid.max_goals(), grid.max_goals());
    for (score, p) in grid.iter() {
        acc += p;
        last = score;
        if target < acc {
            return score;
        }
    }
    last
}

/// Frequency of each sampled scoreline over `n` draws.
pub fn simulate<R: Rng>(
    grid: &ScorelineGrid,
    rng: &mut R,
    n: usize,
) -> BTreeMap<Scoreline, usize> {
    let mut counts = BTreeMap::new();
    for _ in 0..n {
        *counts.entry(sample_scoreline(grid, rng)).or_insert(0) += 1;
    }
    counts
}
