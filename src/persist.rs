use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::info;

use crate::domain::{Candidate, GameweekId, PlayerId, PositionRules};
use crate::http_cache::app_cache_dir;

/// A player's numbers as they stood for one gameweek.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub player_id: PlayerId,
    pub gameweek_id: GameweekId,
    pub name: String,
    pub team_id: u32,
    pub position: String,
    pub form: f64,
    pub points_per_game: f64,
    pub total_points: i32,
    pub cost: u32,
    pub selected_by_percent: f64,
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
    pub difficulty_majority: u32,
    pub chance_of_playing: f64,
    pub most_captained: bool,
    pub score: f64,
}

impl PlayerSnapshot {
    pub fn from_candidate(candidate: &Candidate) -> Self {
        let player = &candidate.player;
        let stats = &player.stats;
        PlayerSnapshot {
            player_id: player.id,
            gameweek_id: candidate.gameweek(),
            name: player.name.clone(),
            team_id: candidate.club().0,
            position: candidate.position().short_name().to_string(),
            form: player.form,
            points_per_game: player.points_per_game,
            total_points: player.total_points,
            cost: player.price.0,
            selected_by_percent: player.selected_by_percent,
            minutes: stats.minutes,
            goals_scored: stats.goals_scored,
            assists: stats.assists,
            goals_conceded: stats.goals_conceded,
            clean_sheets: stats.clean_sheets,
            yellow_cards: stats.yellow_cards,
            red_cards: stats.red_cards,
            bonus: stats.bonus,
            starts: stats.starts,
            starts_per_90: stats.starts_per_90,
            ict_index: stats.ict_index,
            ict_index_rank: stats.ict_index_rank,
            difficulty_majority: candidate.difficulty_majority(),
            chance_of_playing: candidate.chance_of_playing(),
            most_captained: candidate.most_captained,
            score: candidate.score,
        }
    }
}

pub struct SnapshotStore {
    conn: Connection,
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("players.sqlite"))
}

impl SnapshotStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(SnapshotStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(SnapshotStore { conn })
    }

    pub fn store_position_rules(&mut self, rules: &[PositionRules]) -> Result<()> {
        let tx = self.conn.transaction().context("begin rules transaction")?;
        for rule in rules {
            tx.execute(
                r#"
                INSERT INTO position_rules (
                    type_id, position, name, plural_name, short_name,
                    squad_select, min_play, max_play
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(type_id) DO UPDATE SET
                    position = excluded.position,
                    name = excluded.name,
                    plural_name = excluded.plural_name,
                    short_name = excluded.short_name,
                    squad_select = excluded.squad_select,
                    min_play = excluded.min_play,
                    max_play = excluded.max_play
                "#,
                params![
                    rule.type_id as i64,
                    rule.position.short_name(),
                    rule.name,
                    rule.plural_name,
                    rule.short_name,
                    rule.squad_select as i64,
                    rule.min_play as i64,
                    rule.max_play as i64,
                ],
            )
            .context("upsert position rules")?;
        }
        tx.commit().context("commit rules transaction")?;
        Ok(())
    }

    /// Upserts one row per (player, gameweek) and records the run. Returns rows written.
    pub fn store_candidates(
        &mut self,
        gameweek: GameweekId,
        candidates: &[Candidate],
    ) -> Result<usize> {
        let started_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction().context("begin snapshot transaction")?;
        let mut written = 0usize;
        for candidate in candidates.iter().filter(|c| c.gameweek() == gameweek) {
            upsert_snapshot(&tx, &PlayerSnapshot::from_candidate(candidate))?;
            written += 1;
        }
        tx.execute(
            r#"
            INSERT INTO snapshot_runs (gameweek_id, started_at, finished_at, players_written)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                gameweek.0 as i64,
                started_at,
                Utc::now().to_rfc3339(),
                written as i64
            ],
        )
        .context("record snapshot run")?;
        tx.commit().context("commit snapshot transaction")?;
        info!(gameweek = %gameweek, players = written, "snapshot stored");
        Ok(written)
    }

    pub fn load_snapshot(&self, gameweek: GameweekId) -> Result<Vec<PlayerSnapshot>> {
        self.query_snapshots(
            "WHERE gameweek_id = ?1 ORDER BY score DESC, player_id ASC",
            gameweek.0,
        )
    }

    /// Every stored gameweek for one player, oldest first.
    pub fn player_snapshots(&self, player: PlayerId) -> Result<Vec<PlayerSnapshot>> {
        self.query_snapshots("WHERE player_id = ?1 ORDER BY gameweek_id ASC", player.0)
    }

    pub fn run_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM snapshot_runs", [], |row| row.get(0))
            .context("count snapshot runs")?;
        Ok(count as usize)
    }

    fn query_snapshots(&self, clause: &str, key: u32) -> Result<Vec<PlayerSnapshot>> {
        let sql = format!(
            r#"
            SELECT
                player_id, gameweek_id, name, team_id, position,
                form, points_per_game, total_points, cost, selected_by_percent,
                minutes, goals_scored, assists, goals_conceded, clean_sheets,
                yellow_cards, red_cards, bonus, starts, starts_per_90,
                ict_index, ict_index_rank, difficulty_majority, chance_of_playing,
                most_captained, score
            FROM player_snapshots
            {clause}
            "#
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("prepare snapshot query")?;
        let rows = stmt
            .query_map(params![key as i64], |row| {
                Ok(PlayerSnapshot {
                    player_id: PlayerId(row.get::<_, u32>(0)?),
                    gameweek_id: GameweekId(row.get::<_, u32>(1)?),
                    name: row.get(2)?,
                    team_id: row.get(3)?,
                    position: row.get(4)?,
                    form: row.get(5)?,
                    points_per_game: row.get(6)?,
                    total_points: row.get(7)?,
                    cost: row.get(8)?,
                    selected_by_percent: row.get(9)?,
                    minutes: row.get(10)?,
                    goals_scored: row.get(11)?,
                    assists: row.get(12)?,
                    goals_conceded: row.get(13)?,
                    clean_sheets: row.get(14)?,
                    yellow_cards: row.get(15)?,
                    red_cards: row.get(16)?,
                    bonus: row.get(17)?,
                    starts: row.get(18)?,
                    starts_per_90: row.get(19)?,
                    ict_index: row.get(20)?,
                    ict_index_rank: row.get(21)?,
                    difficulty_majority: row.get(22)?,
                    chance_of_playing: row.get(23)?,
                    most_captained: row.get::<_, i64>(24)? != 0,
                    score: row.get(25)?,
                })
            })
            .context("query snapshots")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode snapshot row")?);
        }
        Ok(out)
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS position_rules (
            type_id INTEGER PRIMARY KEY,
            position TEXT NOT NULL,
            name TEXT NOT NULL,
            plural_name TEXT NOT NULL,
            short_name TEXT NOT NULL,
            squad_select INTEGER NOT NULL,
            min_play INTEGER NOT NULL,
            max_play INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS player_snapshots (
            player_id INTEGER NOT NULL,
            gameweek_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            team_id INTEGER NOT NULL,
            position TEXT NOT NULL,
            form REAL NOT NULL,
            points_per_game REAL NOT NULL,
            total_points INTEGER NOT NULL,
            cost INTEGER NOT NULL,
            selected_by_percent REAL NOT NULL,
            minutes INTEGER NOT NULL,
            goals_scored INTEGER NOT NULL,
            assists INTEGER NOT NULL,
            goals_conceded INTEGER NOT NULL,
            clean_sheets INTEGER NOT NULL,
            yellow_cards INTEGER NOT NULL,
            red_cards INTEGER NOT NULL,
            bonus INTEGER NOT NULL,
            starts INTEGER NOT NULL,
            starts_per_90 REAL NOT NULL,
            ict_index REAL NOT NULL,
            ict_index_rank INTEGER NULL,
            difficulty_majority INTEGER NOT NULL,
            chance_of_playing REAL NOT NULL,
            most_captained INTEGER NOT NULL,
            score REAL NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (player_id, gameweek_id)
        );
        CREATE INDEX IF NOT EXISTS idx_snapshots_gameweek ON player_snapshots(gameweek_id);

        CREATE TABLE IF NOT EXISTS snapshot_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            gameweek_id INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            players_written INTEGER NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

fn upsert_snapshot(tx: &rusqlite::Transaction<'_>, s: &PlayerSnapshot) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO player_snapshots (
            player_id, gameweek_id, name, team_id, position,
            form, points_per_game, total_points, cost, selected_by_percent,
            minutes, goals_scored, assists, goals_conceded, clean_sheets,
            yellow_cards, red_cards, bonus, starts, starts_per_90,
            ict_index, ict_index_rank, difficulty_majority, chance_of_playing,
            most_captained, score, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14, ?15,
            ?16, ?17, ?18, ?19, ?20,
            ?21, ?22, ?23, ?24,
            ?25, ?26, ?27
        )
        ON CONFLICT(player_id, gameweek_id) DO UPDATE SET
            name = excluded.name,
            team_id = excluded.team_id,
            position = excluded.position,
            form = excluded.form,
            points_per_game = excluded.points_per_game,
            total_points = excluded.total_points,
            cost = excluded.cost,
            selected_by_percent = excluded.selected_by_percent,
            minutes = excluded.minutes,
            goals_scored = excluded.goals_scored,
            assists = excluded.assists,
            goals_conceded = excluded.goals_conceded,
            clean_sheets = excluded.clean_sheets,
            yellow_cards = excluded.yellow_cards,
            red_cards = excluded.red_cards,
            bonus = excluded.bonus,
            starts = excluded.starts,
            starts_per_90 = excluded.starts_per_90,
            ict_index = excluded.ict_index,
            ict_index_rank = excluded.ict_index_rank,
            difficulty_majority = excluded.difficulty_majority,
            chance_of_playing = excluded.chance_of_playing,
            most_captained = excluded.most_captained,
            score = excluded.score,
            updated_at = excluded.updated_at
        "#,
        params![
            s.player_id.0 as i64,
            s.gameweek_id.0 as i64,
            s.name,
            s.team_id as i64,
            s.position,
            s.form,
            s.points_per_game,
            s.total_points as i64,
            s.cost as i64,
            s.selected_by_percent,
            s.minutes as i64,
            s.goals_scored as i64,
            s.assists as i64,
            s.goals_conceded as i64,
            s.clean_sheets as i64,
            s.yellow_cards as i64,
            s.red_cards as i64,
            s.bonus as i64,
            s.starts as i64,
            s.starts_per_90,
            s.ict_index,
            s.ict_index_rank.map(|r| r as i64),
            s.difficulty_majority as i64,
            s.chance_of_playing,
            s.most_captained as i64,
            s.score,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert player snapshot")?;
    Ok(())
}
