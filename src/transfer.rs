use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::TeamConfig;
use crate::domain::{Candidate, PlayerId, Price, TeamId};
use crate::error::{PickerError, PickerResult};
use crate::lookup::resolve_names;
use crate::squad::MAX_PLAYERS_PER_CLUB;

/// The manager's current players, weakest first, plus money in the bank.
#[derive(Debug, Clone)]
pub struct OwnedSquad {
    players: Vec<Candidate>,
    bank: Price,
}

impl OwnedSquad {
    pub fn new(mut players: Vec<Candidate>, bank: Price, required: usize) -> PickerResult<Self> {
        if players.len() < required {
            return Err(PickerError::InsufficientSquad {
                matched: players.len(),
                required,
            });
        }
        players.sort_by(|a, b| a.score.total_cmp(&b.score));
        Ok(OwnedSquad { players, bank })
    }

    /// Matches the configured names against `pool`. Unmatched names come back as errors
    /// next to the squad so the caller can report them.
    pub fn from_config(
        config: &TeamConfig,
        pool: &[Candidate],
        required: usize,
    ) -> PickerResult<(Self, Vec<PickerError>)> {
        if config.players.len() < required {
            return Err(PickerError::InsufficientSquad {
                matched: config.players.len(),
                required,
            });
        }
        let (found, missing) = resolve_names(&config.players, pool);
        let squad = OwnedSquad::new(found, config.bank(), required)?;
        Ok((squad, missing))
    }

    pub fn from_picks(
        ids: &[PlayerId],
        bank: Price,
        pool: &[Candidate],
        required: usize,
    ) -> PickerResult<Self> {
        let by_id: HashMap<PlayerId, &Candidate> = pool.iter().map(|c| (c.id(), c)).collect();
        let mut players = Vec::with_capacity(ids.len());
        for id in ids {
            match by_id.get(id) {
                Some(candidate) => players.push((*candidate).clone()),
                None => warn!(player = %id, "picked player has no fixture this gameweek"),
            }
        }
        OwnedSquad::new(players, bank, required)
    }

    pub fn players(&self) -> &[Candidate] {
        &self.players
    }

    pub fn bank(&self) -> Price {
        self.bank
    }

    pub fn weakest(&self, n: usize) -> &[Candidate] {
        &self.players[..n.min(self.players.len())]
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.iter().any(|c| c.id() == id)
    }

    /// Owned players sorted best first, ready for the squad builder.
    pub fn ranked(&self) -> Vec<Candidate> {
        self.players.iter().rev().cloned().collect()
    }

    fn club_counts_without(&self, sold: &[Candidate]) -> HashMap<TeamId, usize> {
        let mut counts = HashMap::new();
        for candidate in &self.players {
            if sold.iter().any(|s| s.id() == candidate.id()) {
                continue;
            }
            *counts.entry(candidate.club()).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferSuggestion {
    pub sell: Vec<Candidate>,
    pub buy: Vec<Candidate>,
    pub budget: Price,
}

impl TransferSuggestion {
    pub fn combined_score(&self) -> f64 {
        self.buy.iter().map(|c| c.score).sum()
    }

    pub fn score_gain(&self) -> f64 {
        self.combined_score() - self.sell.iter().map(|c| c.score).sum::<f64>()
    }

    pub fn cost(&self) -> Price {
        self.buy.iter().fold(Price(0), |acc, c| acc + c.player.price)
    }
}

fn club_has_room(counts: &HashMap<TeamId, usize>, club: TeamId) -> bool {
    counts.get(&club).copied().unwrap_or(0) < MAX_PLAYERS_PER_CLUB
}

/// Replaces the weakest owned player with the best affordable one in the same position.
pub fn suggest_single(owned: &OwnedSquad, pool: &[Candidate]) -> Option<TransferSuggestion> {
    let sell = owned.weakest(1).first()?.clone();
    let budget = sell.player.price + owned.bank();
    let clubs = owned.club_counts_without(std::slice::from_ref(&sell));

    let mut best: Option<&Candidate> = None;
    for candidate in pool {
        if candidate.position() != sell.position()
            || candidate.player.price > budget
            || owned.contains(candidate.id())
            || !club_has_room(&clubs, candidate.club())
        {
            continue;
        }
        if best.is_none_or(|b| candidate.score > b.score) {
            best = Some(candidate);
        }
    }

    let buy = best?.clone();
    debug!(sell = %sell.player.name, buy = %buy.player.name, "single transfer found");
    Some(TransferSuggestion {
        sell: vec![sell],
        buy: vec![buy],
        budget,
    })
}

/// Replaces the two weakest owned players jointly, searching every affordable pair.
pub fn suggest_double(owned: &OwnedSquad, pool: &[Candidate]) -> Option<TransferSuggestion> {
    let sold = owned.weakest(2);
    let [first_out, second_out] = sold else {
        return None;
    };
    let budget = first_out.player.price + second_out.player.price + owned.bank();
    let clubs = owned.club_counts_without(sold);

    let eligible = |c: &Candidate, counts: &HashMap<TeamId, usize>, limit: Price| {
        c.player.price <= limit && !owned.contains(c.id()) && club_has_room(counts, c.club())
    };

    let mut best: Option<(f64, &Candidate, &Candidate)> = None;
    for first in pool {
        let other_position = if first.position() == first_out.position() {
            second_out.position()
        } else if first.position() == second_out.position() {
            first_out.position()
        } else {
            continue;
        };
        if !eligible(first, &clubs, budget) {
            continue;
        }
        let Some(remaining) = budget.checked_sub(first.player.price) else {
            continue;
        };
        let mut after_first = clubs.clone();
        *after_first.entry(first.club()).or_insert(0) += 1;

        for second in pool {
            if second.position() != other_position
                || second.id() == first.id()
                || !eligible(second, &after_first, remaining)
            {
                continue;
            }
            let total = first.score + second.score;
            if best.is_none_or(|(score, _, _)| total > score) {
                best = Some((total, first, second));
            }
        }
    }

    let (_, first, second) = best?;
    Some(TransferSuggestion {
        sell: vec![first_out.clone(), second_out.clone()],
        buy: vec![first.clone(), second.clone()],
        budget,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Position;
    use crate::fake_data::sample_candidate;

    #[test]
    fn owned_squad_sorts_weakest_first() {
        let players = vec![
            sample_candidate(1, Position::Defender, TeamId(1), 5.0),
            sample_candidate(2, Position::Defender, TeamId(2), 1.0),
            sample_candidate(3, Position::Defender, TeamId(3), 3.0),
        ];
        let owned = OwnedSquad::new(players, Price(0), 3).unwrap();
        let ids: Vec<u32> = owned.players().iter().map(|c| c.id().0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(owned.ranked()[0].id(), PlayerId(1));
    }

    #[test]
    fn too_few_players_is_insufficient() {
        let players = vec![sample_candidate(1, Position::Defender, TeamId(1), 5.0)];
        let err = OwnedSquad::new(players, Price(0), 15).unwrap_err();
        assert!(matches!(
            err,
            PickerError::InsufficientSquad {
                matched: 1,
                required: 15
            }
        ));
    }
}
