use std::collections::HashMap;
use std::fmt;
use std::ops::Add;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(PlayerId);
id_type!(TeamId);
id_type!(FixtureId);
id_type!(GameweekId);

impl GameweekId {
    pub fn next(self) -> GameweekId {
        GameweekId(self.0 + 1)
    }

    pub fn previous(self) -> Option<GameweekId> {
        self.0.checked_sub(1).filter(|id| *id > 0).map(GameweekId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    pub fn short_name(self) -> &'static str {
        match self {
            Position::Goalkeeper => "GKP",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Position::Goalkeeper => "Goalkeeper",
            Position::Defender => "Defender",
            Position::Midfielder => "Midfielder",
            Position::Forward => "Forward",
        }
    }

    pub fn from_short_name(raw: &str) -> Option<Position> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GKP" | "GK" => Some(Position::Goalkeeper),
            "DEF" => Some(Position::Defender),
            "MID" => Some(Position::Midfielder),
            "FWD" => Some(Position::Forward),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// League-mandated counts for one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRules {
    pub type_id: u32,
    pub position: Position,
    pub name: String,
    pub plural_name: String,
    pub short_name: String,
    /// How many of this position a full squad carries.
    pub squad_select: usize,
    pub min_play: usize,
    pub max_play: usize,
}

/// Money in tenths of a million, the unit the provider reports.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(pub u32);

impl Price {
    pub fn from_millions(value: f64) -> Price {
        Price((value * 10.0).round().max(0.0) as u32)
    }

    pub fn millions(self) -> f64 {
        self.0 as f64 / 10.0
    }

    pub fn checked_sub(self, other: Price) -> Option<Price> {
        self.0.checked_sub(other.0).map(Price)
    }
}

impl Add for Price {
    type Output = Price;

    fn add(self, rhs: Price) -> Price {
        Price(self.0 + rhs.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "£{:.1}m", self.millions())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub minutes: u32,
    pub goals_scored: u32,
    pub assists: u32,
    pub goals_conceded: u32,
    pub clean_sheets: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub bonus: u32,
    pub starts: u32,
    pub starts_per_90: f64,
    pub ict_index: f64,
    pub ict_index_rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: TeamId,
    pub position: Position,
    pub form: f64,
    pub points_per_game: f64,
    pub total_points: i32,
    pub price: Price,
    pub selected_by_percent: f64,
    pub news: String,
    pub stats: PlayerStats,
    /// Probability of appearing, keyed by gameweek. Absent means no doubt.
    pub chance_of_playing: HashMap<GameweekId, f64>,
}

impl Player {
    pub fn chance_of_playing(&self, gameweek: GameweekId) -> f64 {
        self.chance_of_playing
            .get(&gameweek)
            .copied()
            .unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub short_name: String,
    pub players: Vec<PlayerId>,
    pub fixtures: Vec<FixtureId>,
}

impl Team {
    pub fn to_ref(&self) -> TeamRef {
        TeamRef {
            id: self.id,
            name: self.name.clone(),
            short_name: self.short_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: TeamId,
    pub name: String,
    pub short_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: FixtureId,
    pub gameweek: GameweekId,
    pub home: TeamId,
    pub away: TeamId,
    pub home_difficulty: i32,
    pub away_difficulty: i32,
    pub finished: bool,
}

impl Fixture {
    /// How lopsided the match looks: the gap between the two difficulty ratings.
    pub fn difficulty_majority(&self) -> u32 {
        self.home_difficulty.abs_diff(self.away_difficulty)
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.home == team || self.away == team
    }

    pub fn opponent_of(&self, team: TeamId) -> Option<TeamId> {
        if self.home == team {
            Some(self.away)
        } else if self.away == team {
            Some(self.home)
        } else {
            None
        }
    }

    /// The side facing the easier task, or `None` for a balanced fixture.
    pub fn likely_winner(&self) -> Option<TeamId> {
        match self.home_difficulty.cmp(&self.away_difficulty) {
            std::cmp::Ordering::Less => Some(self.home),
            std::cmp::Ordering::Greater => Some(self.away),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gameweek {
    pub id: GameweekId,
    pub name: String,
    pub deadline: DateTime<Utc>,
    pub is_current: bool,
    pub is_next: bool,
    pub finished: bool,
    pub most_captained: Option<PlayerId>,
}

impl Gameweek {
    pub fn deadline_label(&self) -> String {
        self.deadline.format("%d %b %H:%M").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranks {
    pub overall: usize,
    pub position: usize,
}

/// One player joined with one fixture of the evaluated round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub player: Player,
    pub team: TeamRef,
    pub fixture: Fixture,
    pub opponent: TeamRef,
    pub most_captained: bool,
    pub score: f64,
    pub ranks: Option<Ranks>,
}

impl Candidate {
    pub fn new(player: Player, team: TeamRef, fixture: Fixture, opponent: TeamRef) -> Candidate {
        Candidate {
            player,
            team,
            fixture,
            opponent,
            most_captained: false,
            score: 0.0,
            ranks: None,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.player.id
    }

    pub fn position(&self) -> Position {
        self.player.position
    }

    pub fn club(&self) -> TeamId {
        self.team.id
    }

    pub fn gameweek(&self) -> GameweekId {
        self.fixture.gameweek
    }

    pub fn difficulty_majority(&self) -> u32 {
        self.fixture.difficulty_majority()
    }

    pub fn chance_of_playing(&self) -> f64 {
        self.player.chance_of_playing(self.gameweek())
    }

    pub fn rank_label(&self) -> String {
        match self.ranks {
            Some(ranks) => format!(
                "{} ({})",
                crate::ranking::ordinal(ranks.overall),
                crate::ranking::ordinal(ranks.position)
            ),
            None => "-".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(home: i32, away: i32) -> Fixture {
        Fixture {
            id: FixtureId(1),
            gameweek: GameweekId(3),
            home: TeamId(1),
            away: TeamId(2),
            home_difficulty: home,
            away_difficulty: away,
            finished: false,
        }
    }

    #[test]
    fn difficulty_majority_is_magnitude() {
        assert_eq!(fixture(2, 5).difficulty_majority(), 3);
        assert_eq!(fixture(5, 2).difficulty_majority(), 3);
        assert_eq!(fixture(3, 3).difficulty_majority(), 0);
    }

    #[test]
    fn likely_winner_is_lower_difficulty_side() {
        assert_eq!(fixture(2, 4).likely_winner(), Some(TeamId(1)));
        assert_eq!(fixture(4, 2).likely_winner(), Some(TeamId(2)));
        assert_eq!(fixture(3, 3).likely_winner(), None);
        assert_eq!(fixture(2, 4).opponent_of(TeamId(2)), Some(TeamId(1)));
        assert_eq!(fixture(2, 4).opponent_of(TeamId(9)), None);
    }

    #[test]
    fn price_display_and_arithmetic() {
        let price = Price::from_millions(5.5);
        assert_eq!(price, Price(55));
        assert_eq!(price.to_string(), "£5.5m");
        assert_eq!(Price(55) + Price(10), Price(65));
        assert_eq!(Price(10).checked_sub(Price(55)), None);
    }

    #[test]
    fn position_short_names_round_trip() {
        for position in Position::ALL {
            assert_eq!(Position::from_short_name(position.short_name()), Some(position));
        }
        assert_eq!(Position::from_short_name("MNG"), None);
    }

    #[test]
    fn previous_gameweek_stops_at_one() {
        assert_eq!(GameweekId(2).previous(), Some(GameweekId(1)));
        assert_eq!(GameweekId(1).previous(), None);
    }
}
