use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use tracing::{debug, warn};

use crate::domain::{Candidate, PlayerId, Position, PositionRules, TeamId};

pub const MAX_PLAYERS_PER_CLUB: usize = 3;
pub const STARTING_XI: usize = 11;
pub const FULL_SQUAD_SIZE: usize = 15;
pub const DIFFERENTIAL_THRESHOLD: f64 = 15.0;

/// Counts per position for one line-up shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Formation {
    pub goalkeepers: usize,
    pub defenders: usize,
    pub midfielders: usize,
    pub forwards: usize,
}

impl Formation {
    pub const fn new(goalkeepers: usize, defenders: usize, midfielders: usize, forwards: usize) -> Self {
        Formation {
            goalkeepers,
            defenders,
            midfielders,
            forwards,
        }
    }

    pub fn quota(&self, position: Position) -> usize {
        match position {
            Position::Goalkeeper => self.goalkeepers,
            Position::Defender => self.defenders,
            Position::Midfielder => self.midfielders,
            Position::Forward => self.forwards,
        }
    }

    pub fn size(&self) -> usize {
        self.goalkeepers + self.defenders + self.midfielders + self.forwards
    }

    /// True when every quota sits inside the league's starting bounds.
    pub fn within(&self, rules: &[PositionRules]) -> bool {
        rules
            .iter()
            .all(|r| (r.min_play..=r.max_play).contains(&self.quota(r.position)))
    }
}

impl fmt::Display for Formation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.goalkeepers, self.defenders, self.midfielders, self.forwards
        )
    }
}

pub const FORMATIONS: [Formation; 7] = [
    Formation::new(1, 3, 5, 2),
    Formation::new(1, 4, 4, 2),
    Formation::new(1, 5, 3, 2),
    Formation::new(1, 3, 4, 3),
    Formation::new(1, 4, 3, 3),
    Formation::new(1, 5, 4, 1),
    Formation::new(1, 5, 2, 3),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Squad {
    pub formation: Option<Formation>,
    players: BTreeMap<Position, Vec<Candidate>>,
}

impl Squad {
    pub fn new(formation: Option<Formation>) -> Self {
        Squad {
            formation,
            players: BTreeMap::new(),
        }
    }

    pub fn players(&self, position: Position) -> &[Candidate] {
        self.players.get(&position).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn push(&mut self, candidate: Candidate) {
        self.players
            .entry(candidate.position())
            .or_default()
            .push(candidate);
    }

    /// Goalkeepers first, then defenders, midfielders, forwards.
    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.players.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.players.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_score(&self) -> f64 {
        self.iter().map(|c| c.score).sum()
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.iter().any(|c| c.id() == id)
    }

    pub fn club_counts(&self) -> HashMap<TeamId, usize> {
        let mut counts = HashMap::new();
        for candidate in self.iter() {
            *counts.entry(candidate.club()).or_insert(0) += 1;
        }
        counts
    }

    /// Every quota of the formation was met.
    pub fn is_complete(&self) -> bool {
        match self.formation {
            Some(shape) => Position::ALL
                .iter()
                .all(|p| self.players(*p).len() == shape.quota(*p)),
            None => false,
        }
    }
}

pub struct SquadBuilder {
    shapes: Vec<Formation>,
    club_cap: usize,
}

impl SquadBuilder {
    pub fn standard() -> Self {
        SquadBuilder::new(FORMATIONS.to_vec())
    }

    pub fn new(shapes: Vec<Formation>) -> Self {
        SquadBuilder {
            shapes,
            club_cap: MAX_PLAYERS_PER_CLUB,
        }
    }

    pub fn with_club_cap(mut self, club_cap: usize) -> Self {
        self.club_cap = club_cap;
        self
    }

    /// Drops shapes the league's line-up bounds do not allow.
    pub fn restricted_to(mut self, rules: &[PositionRules]) -> Self {
        if rules.is_empty() {
            return self;
        }
        self.shapes.retain(|shape| shape.within(rules));
        if self.shapes.is_empty() {
            warn!("no formation fits the league's line-up bounds");
        }
        self
    }

    pub fn shapes(&self) -> &[Formation] {
        &self.shapes
    }

    /// One greedy pass over `ranked` for a single shape. No backtracking.
    pub fn fill(&self, ranked: &[Candidate], shape: Formation) -> Squad {
        let mut squad = Squad::new(Some(shape));
        let mut clubs: HashMap<TeamId, usize> = HashMap::new();
        let mut seen: HashSet<PlayerId> = HashSet::new();
        let mut remaining = shape.size();

        for candidate in ranked {
            if remaining == 0 {
                break;
            }
            if squad.players(candidate.position()).len() >= shape.quota(candidate.position()) {
                continue;
            }
            let club = clubs.entry(candidate.club()).or_insert(0);
            if *club >= self.club_cap {
                continue;
            }
            if !seen.insert(candidate.id()) {
                continue;
            }
            *club += 1;
            remaining -= 1;
            squad.push(candidate.clone());
        }
        squad
    }

    /// Best squad over every shape. `ranked` must already be sorted best first.
    pub fn build(&self, ranked: &[Candidate]) -> Squad {
        let mut best: Option<Squad> = None;
        for shape in &self.shapes {
            let squad = self.fill(ranked, *shape);
            debug!(
                formation = %shape,
                total = squad.total_score(),
                players = squad.len(),
                "formation filled"
            );
            let better = match &best {
                Some(current) => squad.total_score() > current.total_score(),
                None => true,
            };
            if better {
                best = Some(squad);
            }
        }
        best.unwrap_or_default()
    }
}

pub fn build_best_squad(ranked: &[Candidate]) -> Squad {
    SquadBuilder::standard().build(ranked)
}

pub fn filter_candidates<F>(ranked: &[Candidate], predicate: F) -> Vec<Candidate>
where
    F: Fn(&Candidate) -> bool,
{
    ranked.iter().filter(|c| predicate(c)).cloned().collect()
}

/// Candidates picked by fewer than `threshold` percent of managers.
pub fn differentials(ranked: &[Candidate], threshold: f64) -> Vec<Candidate> {
    filter_candidates(ranked, |c| c.player.selected_by_percent < threshold)
}

/// Players of `a` that also sit in the same position of `b`, in `a`'s order.
pub fn intersect(a: &Squad, b: &Squad) -> Squad {
    let mut out = Squad::new(a.formation);
    for position in Position::ALL {
        let ids: HashSet<PlayerId> = b.players(position).iter().map(Candidate::id).collect();
        for candidate in a.players(position) {
            if ids.contains(&candidate.id()) {
                out.push(candidate.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_data::sample_candidate;

    fn rules(position: Position, min_play: usize, max_play: usize) -> PositionRules {
        PositionRules {
            type_id: position as u32 + 1,
            position,
            name: position.name().to_string(),
            plural_name: format!("{}s", position.name()),
            short_name: position.short_name().to_string(),
            squad_select: 0,
            min_play,
            max_play,
        }
    }

    #[test]
    fn catalogue_shapes_are_starting_elevens() {
        assert!(FORMATIONS.iter().all(|f| f.size() == STARTING_XI));
        assert_eq!(FORMATIONS[0].to_string(), "1-3-5-2");
    }

    #[test]
    fn restricted_to_drops_shapes_outside_bounds() {
        let league = vec![
            rules(Position::Goalkeeper, 1, 1),
            rules(Position::Defender, 3, 4),
            rules(Position::Midfielder, 2, 5),
            rules(Position::Forward, 1, 3),
        ];
        let builder = SquadBuilder::standard().restricted_to(&league);
        assert!(builder.shapes().iter().all(|s| s.defenders <= 4));
        assert_eq!(builder.shapes().len(), 4);
    }

    #[test]
    fn fill_skips_repeated_player_ids() {
        let gk = sample_candidate(1, Position::Goalkeeper, TeamId(1), 9.0);
        let squad = SquadBuilder::new(vec![Formation::new(2, 0, 0, 0)])
            .build(&[gk.clone(), gk.clone(), sample_candidate(2, Position::Goalkeeper, TeamId(2), 1.0)]);
        assert_eq!(squad.len(), 2);
        assert!(squad.contains(PlayerId(2)));
    }

    #[test]
    fn tie_between_shapes_keeps_first() {
        let ranked = vec![
            sample_candidate(1, Position::Defender, TeamId(1), 5.0),
            sample_candidate(2, Position::Midfielder, TeamId(2), 5.0),
        ];
        let first = Formation::new(0, 1, 0, 0);
        let second = Formation::new(0, 0, 1, 0);
        let squad = SquadBuilder::new(vec![first, second]).build(&ranked);
        assert_eq!(squad.formation, Some(first));
    }

    #[test]
    fn no_shapes_yields_empty_squad() {
        let squad = SquadBuilder::new(Vec::new()).build(&[]);
        assert!(squad.is_empty());
        assert!(squad.formation.is_none());
    }
}
