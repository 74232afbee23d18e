use std::collections::HashMap;

use crate::domain::{Candidate, Position, Ranks};
use crate::score::{ScoreStrategy, Scorer};

/// Stable sort, best first. Equal scores keep their input order.
pub fn sort_by_score(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Scores every candidate, sorts best first and writes overall and per-position ranks.
pub fn rank<S: ScoreStrategy>(mut candidates: Vec<Candidate>, scorer: &Scorer<S>) -> Vec<Candidate> {
    for candidate in candidates.iter_mut() {
        candidate.score = scorer.score(candidate);
    }
    sort_by_score(&mut candidates);

    let mut per_position: HashMap<Position, usize> = HashMap::new();
    for (idx, candidate) in candidates.iter_mut().enumerate() {
        let position_rank = per_position.entry(candidate.position()).or_insert(0);
        *position_rank += 1;
        candidate.ranks = Some(Ranks {
            overall: idx + 1,
            position: *position_rank,
        });
    }
    candidates
}

pub fn ordinal(n: usize) -> String {
    let suffix = if (11..=13).contains(&(n % 100)) {
        "th"
    } else {
        match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        }
    };
    format!("{n}{suffix}")
}
