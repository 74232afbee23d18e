use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dataset::Dataset;
use crate::domain::{Candidate, FixtureId, PlayerId};

/// One past appearance of a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerFixture {
    pub fixture: FixtureId,
    pub player: PlayerId,
    pub minutes: u32,
    pub total_points: i32,
}

pub trait HistoryProvider {
    fn player_history(&self, player: PlayerId) -> Result<Vec<PlayerFixture>>;
}

type FixtureHistory = Rc<HashMap<FixtureId, PlayerFixture>>;

/// Fetches each player's history at most once per run.
pub struct HistoryCache<'a> {
    provider: &'a dyn HistoryProvider,
    entries: RefCell<HashMap<PlayerId, Option<FixtureHistory>>>,
}

impl<'a> HistoryCache<'a> {
    pub fn new(provider: &'a dyn HistoryProvider) -> Self {
        HistoryCache {
            provider,
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// `None` when the fetch failed; the failure is remembered for the run.
    pub fn get(&self, player: PlayerId) -> Option<FixtureHistory> {
        if let Some(entry) = self.entries.borrow().get(&player) {
            return entry.clone();
        }
        let entry = match self.provider.player_history(player) {
            Ok(rows) => {
                debug!(player = %player, rows = rows.len(), "history fetched");
                Some(Rc::new(
                    rows.into_iter().map(|row| (row.fixture, row)).collect(),
                ))
            }
            Err(err) => {
                warn!(player = %player, error = %err, "history unavailable, using points per game");
                None
            }
        };
        self.entries.borrow_mut().insert(player, entry.clone());
        entry
    }

    pub fn fetched(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// Average points over the team's past fixtures with the same difficulty majority
/// as the candidate's fixture. Falls back to season points per game.
pub fn weighted_points_average(
    candidate: &Candidate,
    dataset: &Dataset,
    history: &HistoryCache<'_>,
) -> f64 {
    let fallback = candidate.player.points_per_game;
    let majority = candidate.difficulty_majority();
    let similar: Vec<FixtureId> = dataset
        .team_fixtures(candidate.club())
        .filter(|f| f.id != candidate.fixture.id)
        .filter(|f| f.finished || f.gameweek < candidate.gameweek())
        .filter(|f| f.difficulty_majority() == majority)
        .map(|f| f.id)
        .collect();
    if similar.is_empty() {
        return fallback;
    }

    let Some(rows) = history.get(candidate.id()) else {
        return fallback;
    };
    let points: Vec<i32> = similar
        .iter()
        .filter_map(|id| rows.get(id))
        .map(|row| row.total_points)
        .collect();
    if points.is_empty() {
        return fallback;
    }
    points.iter().sum::<i32>() as f64 / points.len() as f64
}
