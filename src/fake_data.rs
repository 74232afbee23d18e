use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataset::Dataset;
use crate::domain::{
    Candidate, Fixture, FixtureId, Gameweek, GameweekId, Player, PlayerId, PlayerStats, Position,
    PositionRules, Price, Team, TeamId, TeamRef,
};
use crate::error::PickerResult;
use crate::history::{HistoryProvider, PlayerFixture};

pub const DEMO_GAMEWEEKS: u32 = 38;
pub const DEMO_CURRENT_GAMEWEEK: u32 = 10;

// 2025-08-15T17:30:00Z
const SEASON_START_TS: i64 = 1_755_279_000;
const WEEK_SECS: i64 = 7 * 24 * 60 * 60;

const TEAMS: [(&str, &str); 20] = [
    ("Arsenal", "ARS"),
    ("Aston Villa", "AVL"),
    ("Bournemouth", "BOU"),
    ("Brentford", "BRE"),
    ("Brighton", "BHA"),
    ("Burnley", "BUR"),
    ("Chelsea", "CHE"),
    ("Crystal Palace", "CRY"),
    ("Everton", "EVE"),
    ("Fulham", "FUL"),
    ("Leeds", "LEE"),
    ("Liverpool", "LIV"),
    ("Man City", "MCI"),
    ("Man Utd", "MUN"),
    ("Newcastle", "NEW"),
    ("Nott'm Forest", "NFO"),
    ("Sunderland", "SUN"),
    ("Spurs", "TOT"),
    ("West Ham", "WHU"),
    ("Wolves", "WOL"),
];

const SURNAMES: [&str; 40] = [
    "Adebayo", "Bergström", "Castro", "Dalot", "Eze", "Fernández", "García", "Højlund", "Isak",
    "Jiménez", "Kovačić", "Lindelöf", "Martínez", "Núñez", "Ødegaard", "Palmer", "Quansah",
    "Rodríguez", "Šeško", "Tavernier", "Udogie", "Vardy", "Wissa", "Xhaka", "Yates", "Zabarnyi",
    "Andersen", "Bowen", "Cunha", "Diaz", "Elanga", "Foden", "Gordon", "Havertz", "Iwobi",
    "James", "Kelleher", "Lukić", "Mbeumo", "Nketiah",
];

const INITIALS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

// Per team: goalkeepers, defenders, midfielders, forwards.
const ROSTER: [(Position, usize); 4] = [
    (Position::Goalkeeper, 3),
    (Position::Defender, 8),
    (Position::Midfielder, 8),
    (Position::Forward, 4),
];

pub fn demo_position_rules() -> Vec<PositionRules> {
    [
        (Position::Goalkeeper, "Goalkeepers", 2, 1, 1),
        (Position::Defender, "Defenders", 5, 3, 5),
        (Position::Midfielder, "Midfielders", 5, 2, 5),
        (Position::Forward, "Forwards", 3, 1, 3),
    ]
    .into_iter()
    .enumerate()
    .map(|(idx, (position, plural, squad_select, min_play, max_play))| PositionRules {
        type_id: idx as u32 + 1,
        position,
        name: position.name().to_string(),
        plural_name: plural.to_string(),
        short_name: position.short_name().to_string(),
        squad_select,
        min_play,
        max_play,
    })
    .collect()
}

/// A synthetic 20-club season, ten rounds in. Same seed, same league.
pub fn demo_dataset(seed: u64) -> PickerResult<Dataset> {
    let mut rng = StdRng::seed_from_u64(seed);
    let strength: Vec<i32> = (0..TEAMS.len()).map(|_| rng.gen_range(1..=5)).collect();

    let teams: Vec<Team> = TEAMS
        .iter()
        .enumerate()
        .map(|(idx, (name, short))| Team {
            id: TeamId(idx as u32 + 1),
            name: name.to_string(),
            short_name: short.to_string(),
            players: Vec::new(),
            fixtures: Vec::new(),
        })
        .collect();

    let fixtures = round_robin(&strength);

    let current = GameweekId(DEMO_CURRENT_GAMEWEEK);
    let next = current.next();
    let mut players = Vec::new();
    let mut next_id = 1u32;
    for (team_idx, team) in teams.iter().enumerate() {
        let bias = strength[team_idx] as f64 / 5.0;
        for (position, count) in ROSTER {
            for _ in 0..count {
                let id = PlayerId(next_id);
                next_id += 1;
                players.push(demo_player(&mut rng, id, team.id, position, bias, current, next));
            }
        }
    }

    let mut gameweeks = Vec::with_capacity(DEMO_GAMEWEEKS as usize);
    for gw in 1..=DEMO_GAMEWEEKS {
        let deadline = DateTime::<Utc>::from_timestamp(
            SEASON_START_TS + WEEK_SECS * (gw as i64 - 1),
            0,
        )
        .unwrap_or_default();
        let finished = gw <= DEMO_CURRENT_GAMEWEEK;
        gameweeks.push(Gameweek {
            id: GameweekId(gw),
            name: format!("Gameweek {gw}"),
            deadline,
            is_current: gw == current.0,
            is_next: gw == next.0,
            finished,
            most_captained: finished.then(|| PlayerId(rng.gen_range(1..next_id))),
        });
    }

    Dataset::from_parts(demo_position_rules(), gameweeks, teams, players, fixtures)
}

// Circle method: club 0 stays put, the rest rotate. The second half swaps venues.
fn round_robin(strength: &[i32]) -> Vec<Fixture> {
    let n = strength.len();
    let half_season = (n - 1) as u32;
    let mut ring: Vec<usize> = (0..n).collect();
    let mut fixtures = Vec::new();
    let mut next_id = 1u32;

    for round in 0..half_season {
        for i in 0..n / 2 {
            let (mut home, mut away) = (ring[i], ring[n - 1 - i]);
            if (round + i as u32) % 2 == 1 {
                std::mem::swap(&mut home, &mut away);
            }
            for (gw, h, a) in [
                (round + 1, home, away),
                (round + 1 + half_season, away, home),
            ] {
                fixtures.push(Fixture {
                    id: FixtureId(next_id),
                    gameweek: GameweekId(gw),
                    home: TeamId(h as u32 + 1),
                    away: TeamId(a as u32 + 1),
                    home_difficulty: strength[a],
                    away_difficulty: strength[h],
                    finished: gw <= DEMO_CURRENT_GAMEWEEK,
                });
                next_id += 1;
            }
        }
        ring[1..].rotate_right(1);
    }
    fixtures.sort_by_key(|f| (f.gameweek, f.id));
    fixtures
}

fn demo_player(
    rng: &mut StdRng,
    id: PlayerId,
    team: TeamId,
    position: Position,
    bias: f64,
    current: GameweekId,
    next: GameweekId,
) -> Player {
    let base_price = match position {
        Position::Goalkeeper => 40,
        Position::Defender => 40,
        Position::Midfielder => 45,
        Position::Forward => 45,
    };
    let quality: f64 = rng.gen_range(0.0..1.0) * 0.7 + bias * 0.3;
    let form = round1(quality * 8.0);
    let mut chance_of_playing = HashMap::new();
    if rng.gen_bool(0.1) {
        chance_of_playing.insert(current, [0.0, 0.25, 0.5, 0.75][rng.gen_range(0..4)]);
        chance_of_playing.insert(next, [0.25, 0.5, 0.75, 1.0][rng.gen_range(0..4)]);
    }
    let starts = rng.gen_range(0..=DEMO_CURRENT_GAMEWEEK);
    let name_idx = id.0 as usize;
    let initial = INITIALS
        .chars()
        .nth((name_idx / SURNAMES.len()) % INITIALS.len())
        .unwrap_or('X');

    Player {
        id,
        name: format!("{initial}. {}", SURNAMES[name_idx % SURNAMES.len()]),
        team,
        position,
        form,
        points_per_game: round1(1.0 + quality * 6.0),
        total_points: (quality * 80.0) as i32,
        price: Price(base_price + (quality * 90.0) as u32),
        selected_by_percent: round1(rng.gen_range(0.1..3.0) * quality * 20.0),
        news: String::new(),
        stats: PlayerStats {
            minutes: starts * 85,
            goals_scored: rng.gen_range(0..=(quality * 8.0) as u32),
            assists: rng.gen_range(0..=(quality * 6.0) as u32),
            goals_conceded: rng.gen_range(0..=15),
            clean_sheets: rng.gen_range(0..=starts),
            yellow_cards: rng.gen_range(0..=3),
            red_cards: u32::from(rng.gen_bool(0.05)),
            bonus: rng.gen_range(0..=(quality * 10.0) as u32),
            starts,
            starts_per_90: round1(starts as f64 / DEMO_CURRENT_GAMEWEEK as f64),
            ict_index: round1(quality * 80.0),
            ict_index_rank: None,
        },
        chance_of_playing,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Seeded match history for the demo league.
pub struct DemoHistory<'a> {
    dataset: &'a Dataset,
    seed: u64,
}

impl<'a> DemoHistory<'a> {
    pub fn new(dataset: &'a Dataset, seed: u64) -> Self {
        DemoHistory { dataset, seed }
    }
}

impl HistoryProvider for DemoHistory<'_> {
    fn player_history(&self, player: PlayerId) -> Result<Vec<PlayerFixture>> {
        let found = self
            .dataset
            .player(player)
            .ok_or_else(|| anyhow!("no demo player {player}"))?;
        let mut rng = StdRng::seed_from_u64(self.seed ^ (player.0 as u64).rotate_left(17));
        Ok(self
            .dataset
            .team_fixtures(found.team)
            .filter(|f| f.finished)
            .map(|f| {
                let minutes = if rng.gen_bool(found.stats.starts_per_90.clamp(0.0, 1.0)) {
                    90
                } else {
                    0
                };
                PlayerFixture {
                    fixture: f.id,
                    player,
                    minutes,
                    total_points: if minutes > 0 { rng.gen_range(1..=12) } else { 0 },
                }
            })
            .collect())
    }
}

pub fn sample_player(id: u32, position: Position, team: TeamId) -> Player {
    Player {
        id: PlayerId(id),
        name: format!("Player {id}"),
        team,
        position,
        form: 5.0,
        points_per_game: 4.0,
        total_points: 40,
        price: Price(50),
        selected_by_percent: 10.0,
        news: String::new(),
        stats: PlayerStats {
            starts_per_90: 0.9,
            ict_index: 2.0,
            ..PlayerStats::default()
        },
        chance_of_playing: HashMap::new(),
    }
}

/// A candidate with a preset score, for exercising the builder without a dataset.
pub fn sample_candidate(id: u32, position: Position, club: TeamId, score: f64) -> Candidate {
    let opponent = TeamId(club.0 + 100);
    let fixture = Fixture {
        id: FixtureId(club.0),
        gameweek: GameweekId(1),
        home: club,
        away: opponent,
        home_difficulty: 2,
        away_difficulty: 4,
        finished: false,
    };
    let mut candidate = Candidate::new(
        sample_player(id, position, club),
        TeamRef {
            id: club,
            name: format!("Club {}", club.0),
            short_name: format!("C{:02}", club.0),
        },
        fixture,
        TeamRef {
            id: opponent,
            name: format!("Club {}", opponent.0),
            short_name: format!("C{:02}", opponent.0),
        },
    );
    candidate.score = score;
    candidate
}
