use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::config::Settings;
use crate::dataset::Dataset;
use crate::domain::{FixtureId, GameweekId, PlayerId, Price};
use crate::history::{HistoryProvider, PlayerFixture};
use crate::http_cache::{CachePolicy, fetch_json};
use crate::http_client::{DEFAULT_TIMEOUT_SECS, http_client};

pub const DEFAULT_API_BASE: &str = "https://fantasy.premierleague.com/api";

#[derive(Debug, Clone, Deserialize)]
pub struct Bootstrap {
    pub teams: Vec<ApiTeam>,
    pub events: Vec<ApiEvent>,
    pub elements: Vec<ApiElement>,
    pub element_types: Vec<ApiElementType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTeam {
    pub id: u32,
    pub name: String,
    pub short_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiEvent {
    pub id: u32,
    pub name: String,
    pub deadline_time: String,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub is_next: bool,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub most_captained: Option<u32>,
}

/// Player record as the provider sends it. Several numbers arrive as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiElement {
    pub id: u32,
    pub web_name: String,
    pub team: u32,
    pub element_type: u32,
    pub form: String,
    pub points_per_game: String,
    #[serde(default)]
    pub total_points: i32,
    pub now_cost: u32,
    pub selected_by_percent: String,
    #[serde(default)]
    pub news: String,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub goals_scored: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default)]
    pub goals_conceded: u32,
    #[serde(default)]
    pub clean_sheets: u32,
    #[serde(default)]
    pub yellow_cards: u32,
    #[serde(default)]
    pub red_cards: u32,
    #[serde(default)]
    pub bonus: u32,
    #[serde(default)]
    pub starts: u32,
    #[serde(default)]
    pub starts_per_90: f64,
    pub ict_index: String,
    #[serde(default)]
    pub ict_index_rank: Option<u32>,
    #[serde(default)]
    pub chance_of_playing_this_round: Option<u32>,
    #[serde(default)]
    pub chance_of_playing_next_round: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiElementType {
    pub id: u32,
    pub singular_name: String,
    pub plural_name: String,
    pub singular_name_short: String,
    #[serde(default)]
    pub squad_select: usize,
    #[serde(default)]
    pub squad_min_play: usize,
    #[serde(default)]
    pub squad_max_play: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiFixture {
    pub id: u32,
    pub event: Option<u32>,
    pub team_h: u32,
    pub team_a: u32,
    pub team_h_difficulty: i32,
    pub team_a_difficulty: i32,
    #[serde(default)]
    pub finished: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ElementSummary {
    #[serde(default)]
    history: Vec<ApiHistoryRow>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiHistoryRow {
    element: u32,
    fixture: u32,
    #[serde(default)]
    minutes: u32,
    #[serde(default)]
    total_points: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManagerPicks {
    pub picks: Vec<ApiPick>,
    pub entry_history: EntryHistory,
}

impl ManagerPicks {
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.picks.iter().map(|p| PlayerId(p.element)).collect()
    }

    pub fn bank(&self) -> Price {
        Price(self.entry_history.bank.max(0.0).round() as u32)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPick {
    pub element: u32,
    #[serde(default)]
    pub is_captain: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryHistory {
    /// Tenths of a million.
    #[serde(default)]
    pub bank: f64,
}

pub fn parse_bootstrap_json(raw: &str) -> Result<Bootstrap> {
    serde_json::from_str(raw).context("invalid bootstrap-static json")
}

pub fn parse_fixtures_json(raw: &str) -> Result<Vec<ApiFixture>> {
    serde_json::from_str(raw).context("invalid fixtures json")
}

pub fn parse_element_summary_json(raw: &str) -> Result<Vec<PlayerFixture>> {
    let summary: ElementSummary =
        serde_json::from_str(raw).context("invalid element-summary json")?;
    Ok(summary
        .history
        .into_iter()
        .map(|row| PlayerFixture {
            fixture: FixtureId(row.fixture),
            player: PlayerId(row.element),
            minutes: row.minutes,
            total_points: row.total_points,
        })
        .collect())
}

pub fn parse_manager_picks_json(raw: &str) -> Result<ManagerPicks> {
    serde_json::from_str(raw).context("invalid manager picks json")
}

pub struct FplClient {
    base_url: String,
    static_policy: CachePolicy,
    timeout_secs: u64,
}

impl FplClient {
    pub fn new(base_url: &str, static_policy: CachePolicy) -> Self {
        FplClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            static_policy,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let mut client = FplClient::new(
            &settings.api_base,
            CachePolicy::Revalidate {
                max_age_secs: settings.cache_max_age_secs,
            },
        );
        client.timeout_secs = settings.http_timeout_secs;
        client
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn get(&self, path: &str, policy: CachePolicy) -> Result<String> {
        let client = http_client(self.timeout_secs)?;
        fetch_json(client, &self.url(path), policy)
    }

    pub fn fetch_bootstrap(&self) -> Result<Bootstrap> {
        let raw = self.get("bootstrap-static/", self.static_policy)?;
        parse_bootstrap_json(&raw)
    }

    pub fn fetch_fixtures(&self) -> Result<Vec<ApiFixture>> {
        let raw = self.get("fixtures/", self.static_policy)?;
        parse_fixtures_json(&raw)
    }

    pub fn fetch_dataset(&self) -> Result<Dataset> {
        let bootstrap = self.fetch_bootstrap()?;
        let fixtures = self.fetch_fixtures()?;
        info!(
            teams = bootstrap.teams.len(),
            players = bootstrap.elements.len(),
            fixtures = fixtures.len(),
            "provider data loaded"
        );
        let dataset = Dataset::build(&bootstrap, &fixtures)?;
        Ok(dataset)
    }

    pub fn fetch_manager_picks(&self, manager: u32, gameweek: GameweekId) -> Result<ManagerPicks> {
        let raw = self
            .get(
                &format!("entry/{manager}/event/{gameweek}/picks/"),
                CachePolicy::Bypass,
            )
            .with_context(|| format!("fetch picks for manager {manager}"))?;
        parse_manager_picks_json(&raw)
    }
}

impl HistoryProvider for FplClient {
    fn player_history(&self, player: PlayerId) -> Result<Vec<PlayerFixture>> {
        let raw = self
            .get(&format!("element-summary/{player}/"), CachePolicy::Bypass)
            .with_context(|| format!("fetch history for player {player}"))?;
        parse_element_summary_json(&raw)
    }
}
