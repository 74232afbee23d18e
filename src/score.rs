use std::cell::RefCell;
use std::collections::HashMap;

use crate::domain::{Candidate, FixtureId, PlayerId};
use crate::error::{PickerError, PickerResult};

/// How the difficulty-majority term treats a balanced fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DifficultyPolicy {
    /// `max(1, dm + 1)`: a balanced fixture leaves the score untouched.
    #[default]
    FloorOfOne,
    /// Multiply by the majority itself; a balanced fixture scores zero.
    Raw,
}

impl DifficultyPolicy {
    pub fn multiplier(self, difficulty_majority: u32) -> f64 {
        match self {
            DifficultyPolicy::FloorOfOne => (difficulty_majority as f64 + 1.0).max(1.0),
            DifficultyPolicy::Raw => difficulty_majority as f64,
        }
    }

    pub fn parse(raw: &str) -> PickerResult<DifficultyPolicy> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "floor" | "floor-of-one" | "" => Ok(DifficultyPolicy::FloorOfOne),
            "raw" | "zero" => Ok(DifficultyPolicy::Raw),
            other => Err(PickerError::Config(format!(
                "unknown difficulty policy {other:?} (expected floor or raw)"
            ))),
        }
    }
}

pub trait ScoreStrategy {
    fn score(&self, candidate: &Candidate) -> f64;
}

/// Multiplicative score built from form, ICT index and the fixture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreFormula {
    pub difficulty: DifficultyPolicy,
    pub starts_rate: bool,
    pub availability: bool,
}

impl ScoreFormula {
    pub const CANONICAL: ScoreFormula = ScoreFormula {
        difficulty: DifficultyPolicy::FloorOfOne,
        starts_rate: true,
        availability: true,
    };

    pub const FORM_AND_FIXTURE: ScoreFormula = ScoreFormula {
        difficulty: DifficultyPolicy::Raw,
        starts_rate: false,
        availability: false,
    };

    pub fn with_difficulty(self, difficulty: DifficultyPolicy) -> ScoreFormula {
        ScoreFormula { difficulty, ..self }
    }
}

impl Default for ScoreFormula {
    fn default() -> Self {
        ScoreFormula::CANONICAL
    }
}

impl ScoreStrategy for ScoreFormula {
    fn score(&self, candidate: &Candidate) -> f64 {
        let player = &candidate.player;
        let mut score = player.form
            * player.stats.ict_index
            * self.difficulty.multiplier(candidate.difficulty_majority());
        if self.starts_rate {
            score *= player.stats.starts_per_90;
        }
        if self.availability {
            score *= candidate.chance_of_playing();
        }
        score
    }
}

/// Scores candidates, remembering each (player, fixture) result for the run.
/// A double gameweek gives one player two fixtures, so the gameweek alone is not a key.
pub struct Scorer<S = ScoreFormula> {
    strategy: S,
    cache: RefCell<HashMap<(PlayerId, FixtureId), f64>>,
}

impl Scorer<ScoreFormula> {
    pub fn canonical() -> Self {
        Scorer::new(ScoreFormula::CANONICAL)
    }
}

impl<S: ScoreStrategy> Scorer<S> {
    pub fn new(strategy: S) -> Self {
        Scorer {
            strategy,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn score(&self, candidate: &Candidate) -> f64 {
        let key = (candidate.id(), candidate.fixture.id);
        if let Some(score) = self.cache.borrow().get(&key).copied() {
            return score;
        }
        let score = self.strategy.score(candidate);
        self.cache.borrow_mut().insert(key, score);
        score
    }

    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }
}
