use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::{
    Candidate, Fixture, FixtureId, Gameweek, GameweekId, Player, PlayerId, PlayerStats, Position,
    PositionRules, Price, Team, TeamId,
};
use crate::error::{PickerError, PickerResult};
use crate::fpl_api::{ApiElement, ApiEvent, ApiFixture, Bootstrap};

/// Everything one data pull knows about the league. Immutable once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    position_rules: Vec<PositionRules>,
    gameweeks: Vec<Gameweek>,
    teams: Vec<Team>,
    players: Vec<Player>,
    fixtures: Vec<Fixture>,
    team_index: HashMap<TeamId, usize>,
    player_index: HashMap<PlayerId, usize>,
    fixture_index: HashMap<FixtureId, usize>,
    gameweek_index: HashMap<GameweekId, usize>,
}

impl Dataset {
    /// Links players and fixtures to their teams. Any dangling reference is an error.
    pub fn from_parts(
        position_rules: Vec<PositionRules>,
        gameweeks: Vec<Gameweek>,
        mut teams: Vec<Team>,
        players: Vec<Player>,
        fixtures: Vec<Fixture>,
    ) -> PickerResult<Dataset> {
        let gameweek_index: HashMap<GameweekId, usize> = gameweeks
            .iter()
            .enumerate()
            .map(|(idx, gw)| (gw.id, idx))
            .collect();
        for team in teams.iter_mut() {
            team.players.clear();
            team.fixtures.clear();
        }
        let team_index: HashMap<TeamId, usize> = teams
            .iter()
            .enumerate()
            .map(|(idx, team)| (team.id, idx))
            .collect();
        let positions: HashSet<Position> = position_rules.iter().map(|r| r.position).collect();

        let mut player_index = HashMap::new();
        for (idx, player) in players.iter().enumerate() {
            let Some(&team_idx) = team_index.get(&player.team) else {
                return Err(PickerError::DataIntegrity(format!(
                    "player {} ({}) references unknown team {}",
                    player.name, player.id, player.team
                )));
            };
            if !positions.is_empty() && !positions.contains(&player.position) {
                return Err(PickerError::DataIntegrity(format!(
                    "player {} ({}) has position {} with no rules",
                    player.name, player.id, player.position
                )));
            }
            if player_index.insert(player.id, idx).is_some() {
                return Err(PickerError::DataIntegrity(format!(
                    "player id {} appears twice",
                    player.id
                )));
            }
            teams[team_idx].players.push(player.id);
        }

        let mut fixture_index = HashMap::new();
        for (idx, fixture) in fixtures.iter().enumerate() {
            if !gameweek_index.contains_key(&fixture.gameweek) {
                return Err(PickerError::DataIntegrity(format!(
                    "fixture {} references unknown gameweek {}",
                    fixture.id, fixture.gameweek
                )));
            }
            let (Some(&home), Some(&away)) =
                (team_index.get(&fixture.home), team_index.get(&fixture.away))
            else {
                return Err(PickerError::DataIntegrity(format!(
                    "fixture {} references unknown team ({} v {})",
                    fixture.id, fixture.home, fixture.away
                )));
            };
            fixture_index.insert(fixture.id, idx);
            teams[home].fixtures.push(fixture.id);
            teams[away].fixtures.push(fixture.id);
        }

        debug!(
            teams = teams.len(),
            players = players.len(),
            fixtures = fixtures.len(),
            "dataset linked"
        );
        Ok(Dataset {
            position_rules,
            gameweeks,
            teams,
            players,
            fixtures,
            team_index,
            player_index,
            fixture_index,
            gameweek_index,
        })
    }

    /// Normalizes a provider pull into the domain model.
    pub fn build(bootstrap: &Bootstrap, fixtures: &[ApiFixture]) -> PickerResult<Dataset> {
        let mut position_rules = Vec::new();
        let mut type_positions: HashMap<u32, Position> = HashMap::new();
        let mut skipped_types: HashSet<u32> = HashSet::new();
        for element_type in &bootstrap.element_types {
            let Some(position) = Position::from_short_name(&element_type.singular_name_short)
            else {
                warn!(
                    type_id = element_type.id,
                    name = %element_type.singular_name,
                    "skipping element type with no squad position"
                );
                skipped_types.insert(element_type.id);
                continue;
            };
            type_positions.insert(element_type.id, position);
            position_rules.push(PositionRules {
                type_id: element_type.id,
                position,
                name: element_type.singular_name.clone(),
                plural_name: element_type.plural_name.clone(),
                short_name: element_type.singular_name_short.clone(),
                squad_select: element_type.squad_select,
                min_play: element_type.squad_min_play,
                max_play: element_type.squad_max_play,
            });
        }
        position_rules.sort_by_key(|r| r.position);

        let gameweeks = bootstrap
            .events
            .iter()
            .map(gameweek_from_api)
            .collect::<PickerResult<Vec<_>>>()?;
        let current = gameweeks.iter().find(|gw| gw.is_current).map(|gw| gw.id);
        let next = gameweeks
            .iter()
            .find(|gw| gw.is_next)
            .map(|gw| gw.id)
            .or_else(|| current.map(GameweekId::next));

        let teams = bootstrap
            .teams
            .iter()
            .map(|t| Team {
                id: TeamId(t.id),
                name: t.name.clone(),
                short_name: t.short_name.clone(),
                players: Vec::new(),
                fixtures: Vec::new(),
            })
            .collect();

        let mut players = Vec::with_capacity(bootstrap.elements.len());
        for element in &bootstrap.elements {
            if skipped_types.contains(&element.element_type) {
                continue;
            }
            let Some(&position) = type_positions.get(&element.element_type) else {
                return Err(PickerError::DataIntegrity(format!(
                    "player {} ({}) references unknown type {}",
                    element.web_name, element.id, element.element_type
                )));
            };
            players.push(player_from_api(element, position, current, next)?);
        }

        let mut linked = Vec::with_capacity(fixtures.len());
        for fixture in fixtures {
            let Some(event) = fixture.event else {
                continue;
            };
            linked.push(Fixture {
                id: FixtureId(fixture.id),
                gameweek: GameweekId(event),
                home: TeamId(fixture.team_h),
                away: TeamId(fixture.team_a),
                home_difficulty: fixture.team_h_difficulty,
                away_difficulty: fixture.team_a_difficulty,
                finished: fixture.finished,
            });
        }

        Dataset::from_parts(position_rules, gameweeks, teams, players, linked)
    }

    pub fn rules(&self) -> &[PositionRules] {
        &self.position_rules
    }

    pub fn rules_for(&self, position: Position) -> Option<&PositionRules> {
        self.position_rules.iter().find(|r| r.position == position)
    }

    /// Full-squad size implied by the position rules.
    pub fn squad_size(&self) -> usize {
        self.position_rules.iter().map(|r| r.squad_select).sum()
    }

    pub fn gameweeks(&self) -> &[Gameweek] {
        &self.gameweeks
    }

    pub fn gameweek(&self, id: GameweekId) -> Option<&Gameweek> {
        self.gameweek_index.get(&id).map(|&idx| &self.gameweeks[idx])
    }

    pub fn current_gameweek(&self) -> Option<&Gameweek> {
        self.gameweeks.iter().find(|gw| gw.is_current)
    }

    pub fn next_gameweek(&self) -> Option<&Gameweek> {
        self.gameweeks.iter().find(|gw| gw.is_next)
    }

    pub fn previous_gameweek(&self, id: GameweekId) -> Option<&Gameweek> {
        id.previous().and_then(|prev| self.gameweek(prev))
    }

    /// The round to plan for when none is asked for: next, else current.
    pub fn default_gameweek(&self) -> Option<&Gameweek> {
        self.next_gameweek().or_else(|| self.current_gameweek())
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.team_index.get(&id).map(|&idx| &self.teams[idx])
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.player_index.get(&id).map(|&idx| &self.players[idx])
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn fixture(&self, id: FixtureId) -> Option<&Fixture> {
        self.fixture_index.get(&id).map(|&idx| &self.fixtures[idx])
    }

    pub fn fixtures_in(&self, gameweek: GameweekId) -> impl Iterator<Item = &Fixture> {
        self.fixtures.iter().filter(move |f| f.gameweek == gameweek)
    }

    pub fn team_fixtures(&self, team: TeamId) -> impl Iterator<Item = &Fixture> {
        self.team(team)
            .into_iter()
            .flat_map(|t| t.fixtures.iter())
            .filter_map(|id| self.fixture(*id))
    }

    /// One candidate per player whose team plays in `gameweek`.
    pub fn gameweek_candidates(&self, gameweek: GameweekId) -> Vec<Candidate> {
        self.collect_candidates(gameweek, |_, _| true)
    }

    /// Only players on the side expected to win. Balanced fixtures contribute nobody.
    pub fn likely_winner_candidates(&self, gameweek: GameweekId) -> Vec<Candidate> {
        self.collect_candidates(gameweek, |fixture, side| {
            fixture.likely_winner() == Some(side)
        })
    }

    // A player with two fixtures in the round keeps the later one, in the slot of the first.
    fn collect_candidates<F>(&self, gameweek: GameweekId, keep: F) -> Vec<Candidate>
    where
        F: Fn(&Fixture, TeamId) -> bool,
    {
        let most_captained = self
            .previous_gameweek(gameweek)
            .and_then(|gw| gw.most_captained);
        let mut out: Vec<Candidate> = Vec::new();
        let mut slots: HashMap<PlayerId, usize> = HashMap::new();

        for fixture in self.fixtures_in(gameweek) {
            for side in [fixture.home, fixture.away] {
                if !keep(fixture, side) {
                    continue;
                }
                let Some(team) = self.team(side) else {
                    continue;
                };
                let Some(opponent) = fixture.opponent_of(side).and_then(|id| self.team(id))
                else {
                    continue;
                };
                for player in team.players.iter().filter_map(|id| self.player(*id)) {
                    let mut candidate = Candidate::new(
                        player.clone(),
                        team.to_ref(),
                        fixture.clone(),
                        opponent.to_ref(),
                    );
                    candidate.most_captained = most_captained == Some(player.id);
                    match slots.get(&player.id) {
                        Some(&idx) => out[idx] = candidate,
                        None => {
                            slots.insert(player.id, out.len());
                            out.push(candidate);
                        }
                    }
                }
            }
        }
        out
    }
}

fn gameweek_from_api(event: &ApiEvent) -> PickerResult<Gameweek> {
    let deadline = DateTime::parse_from_rfc3339(&event.deadline_time)
        .map_err(|_| PickerError::Parse {
            field: "deadline_time",
            record: format!("gameweek {}", event.id),
            value: event.deadline_time.clone(),
        })?
        .with_timezone(&Utc);
    Ok(Gameweek {
        id: GameweekId(event.id),
        name: event.name.clone(),
        deadline,
        is_current: event.is_current,
        is_next: event.is_next,
        finished: event.finished,
        most_captained: event.most_captained.map(PlayerId),
    })
}

fn player_from_api(
    element: &ApiElement,
    position: Position,
    current: Option<GameweekId>,
    next: Option<GameweekId>,
) -> PickerResult<Player> {
    let record = || format!("player {} ({})", element.web_name, element.id);
    let mut chance_of_playing = HashMap::new();
    if let (Some(gw), Some(chance)) = (current, element.chance_of_playing_this_round) {
        chance_of_playing.insert(gw, chance as f64 / 100.0);
    }
    if let (Some(gw), Some(chance)) = (next, element.chance_of_playing_next_round) {
        chance_of_playing.insert(gw, chance as f64 / 100.0);
    }

    Ok(Player {
        id: PlayerId(element.id),
        name: element.web_name.clone(),
        team: TeamId(element.team),
        position,
        form: parse_decimal("form", &element.form, record)?,
        points_per_game: parse_decimal("points_per_game", &element.points_per_game, record)?,
        total_points: element.total_points,
        price: Price(element.now_cost),
        selected_by_percent: parse_decimal(
            "selected_by_percent",
            &element.selected_by_percent,
            record,
        )?,
        news: element.news.clone(),
        stats: PlayerStats {
            minutes: element.minutes,
            goals_scored: element.goals_scored,
            assists: element.assists,
            goals_conceded: element.goals_conceded,
            clean_sheets: element.clean_sheets,
            yellow_cards: element.yellow_cards,
            red_cards: element.red_cards,
            bonus: element.bonus,
            starts: element.starts,
            starts_per_90: element.starts_per_90,
            ict_index: parse_decimal("ict_index", &element.ict_index, record)?,
            ict_index_rank: element.ict_index_rank,
        },
        chance_of_playing,
    })
}

fn parse_decimal(
    field: &'static str,
    raw: &str,
    record: impl Fn() -> String,
) -> PickerResult<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| PickerError::Parse {
            field,
            record: record(),
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_decimal_accepts_blank_and_rejects_text() {
        let record = || "player x".to_string();
        assert_eq!(parse_decimal("form", "", record).unwrap(), 0.0);
        assert_eq!(parse_decimal("form", " 4.5", record).unwrap(), 4.5);
        let err = parse_decimal("form", "n/a", record).unwrap_err();
        assert!(matches!(err, PickerError::Parse { field: "form", .. }));
        assert!(parse_decimal("form", "NaN", record).is_err());
    }
}
