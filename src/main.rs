use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use simple_fantasy::config::{Settings, TeamConfig};
use simple_fantasy::dataset::Dataset;
use simple_fantasy::domain::{Candidate, Gameweek, GameweekId};
use simple_fantasy::export::{ExportSection, export_workbook};
use simple_fantasy::fake_data::{DemoHistory, demo_dataset};
use simple_fantasy::fpl_api::FplClient;
use simple_fantasy::history::{HistoryCache, HistoryProvider, weighted_points_average};
use simple_fantasy::lookup::find_player;
use simple_fantasy::persist::{SnapshotStore, default_db_path};
use simple_fantasy::ranking::rank;
use simple_fantasy::report::{
    Columns, candidate_row, render_table, render_transfer, squad_rows,
};
use simple_fantasy::score::{DifficultyPolicy, ScoreFormula, Scorer};
use simple_fantasy::squad::{SquadBuilder, differentials, intersect};
use simple_fantasy::transfer::{OwnedSquad, suggest_double, suggest_single};

#[derive(Debug, clap::Parser, Clone)]
#[command(name = "simple_fantasy", about = "Pick a fantasy football team for the coming gameweek")]
struct Args {
    /// gameweek to plan for; defaults to the next one
    #[clap(short = 'g', long)]
    gameweek: Option<u32>,

    /// show details for one player
    #[clap(short = 'p', long)]
    player: Option<String>,

    /// JSON file listing your current players and bank
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// manager id whose current picks should be used for transfers
    #[clap(short = 'm', long)]
    manager: Option<u32>,

    /// store a snapshot of every ranked player in SQLite
    #[clap(long)]
    store: bool,

    /// SQLite file for --store
    #[clap(long)]
    db: Option<PathBuf>,

    /// write the tables to an xlsx workbook
    #[clap(long)]
    export: Option<PathBuf>,

    /// how a balanced fixture affects the score: floor or raw
    #[clap(long, value_parser = parse_difficulty)]
    difficulty: Option<DifficultyPolicy>,

    /// use a generated offline league instead of the live API
    #[clap(long)]
    demo: bool,

    /// seed for --demo
    #[clap(long, default_value_t = 42)]
    seed: u64,
}

impl Args {
    fn validate(&self) -> Result<()> {
        if self.gameweek == Some(0) {
            bail!("gameweek numbers start at 1");
        }
        if self.config.is_some() && self.manager.is_some() {
            bail!("use either --config or --manager, not both");
        }
        if self.demo && self.manager.is_some() {
            bail!("--manager needs the live API and cannot be combined with --demo");
        }
        Ok(())
    }
}

fn parse_difficulty(raw: &str) -> Result<DifficultyPolicy, String> {
    DifficultyPolicy::parse(raw).map_err(|err| err.to_string())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    let args = Args::parse();
    args.validate()?;
    debug!(?args, "args");

    let mut settings = Settings::from_env()?;
    if let Some(difficulty) = args.difficulty {
        settings.difficulty = difficulty;
    }
    if let Some(db) = &args.db {
        settings.db_path = Some(db.clone());
    }

    let client = FplClient::from_settings(&settings);
    let dataset = if args.demo {
        demo_dataset(args.seed)?
    } else {
        client.fetch_dataset()?
    };
    let demo_history = DemoHistory::new(&dataset, args.seed);
    let provider: &dyn HistoryProvider = if args.demo {
        &demo_history
    } else {
        &client
    };
    let history = HistoryCache::new(provider);

    let run = Run {
        args: &args,
        settings: &settings,
        dataset: &dataset,
        client: &client,
        history: &history,
        styled: io::stdout().is_terminal(),
    };
    run.execute()
}

struct Run<'a> {
    args: &'a Args,
    settings: &'a Settings,
    dataset: &'a Dataset,
    client: &'a FplClient,
    history: &'a HistoryCache<'a>,
    styled: bool,
}

impl Run<'_> {
    fn execute(&self) -> Result<()> {
        let gameweek = match self.args.gameweek {
            Some(id) => self
                .dataset
                .gameweek(GameweekId(id))
                .ok_or_else(|| anyhow!("gameweek {id} does not exist"))?,
            None => self
                .dataset
                .default_gameweek()
                .context("no current or next gameweek in the data")?,
        };
        if gameweek.finished {
            println!("\n{} is finished\n", gameweek.name);
            return Ok(());
        }

        let scorer = Scorer::new(ScoreFormula::CANONICAL.with_difficulty(self.settings.difficulty));
        let likely_winners = rank(self.dataset.likely_winner_candidates(gameweek.id), &scorer);
        let pool = rank(self.dataset.gameweek_candidates(gameweek.id), &scorer);
        info!(
            gameweek = %gameweek.id,
            likely_winners = likely_winners.len(),
            candidates = pool.len(),
            "candidates ranked"
        );

        if self.args.store {
            self.store_snapshot(gameweek.id, &pool)?;
        }

        let stdout = io::stdout();
        let mut out = stdout.lock();

        if let Some(name) = &self.args.player {
            return self.print_player(&mut out, name, &pool);
        }
        if self.args.config.is_some() || self.args.manager.is_some() {
            return self.print_transfers(&mut out, gameweek, &pool);
        }
        self.print_best_squads(&mut out, gameweek, &likely_winners)
    }

    fn weighted_points(&self, candidate: &Candidate) -> f64 {
        weighted_points_average(candidate, self.dataset, self.history)
    }

    fn builder(&self) -> SquadBuilder {
        SquadBuilder::standard().restricted_to(self.dataset.rules())
    }

    fn store_snapshot(&self, gameweek: GameweekId, pool: &[Candidate]) -> Result<()> {
        let path = self
            .settings
            .db_path
            .clone()
            .or_else(default_db_path)
            .context("no database path; pass --db or set FPL_DB_PATH")?;
        let mut store = SnapshotStore::open(&path)?;
        store.store_position_rules(self.dataset.rules())?;
        let written = store.store_candidates(gameweek, pool)?;
        eprintln!("stored {written} player snapshots in {}", path.display());
        Ok(())
    }

    fn print_player<W: Write>(&self, out: &mut W, name: &str, pool: &[Candidate]) -> Result<()> {
        let candidate = match find_player(name, pool) {
            Ok((candidate, _)) => candidate,
            Err(err) if !err.is_fatal() => {
                writeln!(out, "{err}")?;
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let player = &candidate.player;
        let position = self
            .dataset
            .rules_for(player.position)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| player.position.name().to_string());

        writeln!(out, "Player: {}, Type: {}", player.name, position)?;
        writeln!(out, "Team: {}", candidate.team.name)?;
        writeln!(out, "Cost: {}", player.price)?;
        writeln!(out, "Form: {:.2}", player.form)?;
        writeln!(out, "Score: {:.0}", candidate.score)?;
        writeln!(
            out,
            "PPG: {:.2}, WPPG: {:.2}",
            player.points_per_game,
            self.weighted_points(candidate)
        )?;
        writeln!(out, "Picked: {:.0}%", player.selected_by_percent)?;
        writeln!(out, "Overall Rank (by Type): {}", candidate.rank_label())?;
        writeln!(out, "Opposition: {}", candidate.opponent.name)?;
        let chance = candidate.chance_of_playing();
        if chance < 1.0 {
            writeln!(out, "Chance of playing: {:.0}%", chance * 100.0)?;
        }
        if !player.news.is_empty() {
            writeln!(out, "News: {}", player.news)?;
        }
        Ok(())
    }

    fn owned_squad<W: Write>(
        &self,
        out: &mut W,
        gameweek: &Gameweek,
        pool: &[Candidate],
    ) -> Result<OwnedSquad> {
        let required = self.settings.min_owned_squad;
        if let Some(path) = &self.args.config {
            let config = TeamConfig::load(path)?;
            let (owned, missing) = OwnedSquad::from_config(&config, pool, required)?;
            for err in missing {
                warn!(%err, "owned player not matched");
                writeln!(out, "{err}")?;
            }
            return Ok(owned);
        }
        let Some(manager) = self.args.manager else {
            bail!("no owned squad given");
        };
        let picks_gameweek = self
            .dataset
            .current_gameweek()
            .map(|gw| gw.id)
            .unwrap_or(gameweek.id);
        let picks = self.client.fetch_manager_picks(manager, picks_gameweek)?;
        Ok(OwnedSquad::from_picks(
            &picks.player_ids(),
            picks.bank(),
            pool,
            required,
        )?)
    }

    fn print_transfers<W: Write>(
        &self,
        out: &mut W,
        gameweek: &Gameweek,
        pool: &[Candidate],
    ) -> Result<()> {
        let owned = self.owned_squad(out, gameweek, pool)?;
        let best = self.builder().build(&owned.ranked());
        let rows = squad_rows(&best, |_| None);
        let columns = Columns {
            selected_by: true,
            ..Columns::BRIEF
        };
        render_table(
            out,
            &format!(
                "With your current players, the best team you could pick for {} is:",
                gameweek.name
            ),
            &rows,
            columns,
            self.styled,
        )?;

        match suggest_single(&owned, pool) {
            Some(single) => {
                let (sell, buy) = (&single.sell[0], &single.buy[0]);
                writeln!(
                    out,
                    "\nYou might want to consider selling {} and buying {}, who costs {} and has a score of {:.0}.",
                    sell.player.name, buy.player.name, buy.player.price, buy.score
                )?;
                writeln!(
                    out,
                    "Run 'simple_fantasy --gameweek {} --player \"{}\"' to find out more.",
                    gameweek.id, buy.player.name
                )?;
                render_transfer(out, "Single transfer", &single)?;
            }
            None => writeln!(out, "\nNo affordable single transfer improves on your squad.")?,
        }

        if let Some(double) = suggest_double(&owned, pool) {
            writeln!(
                out,
                "\nOr if you were willing to make two transfers you could sell {} and {} for {} and buy {} and {}, costing {} and {}, with scores {:.0} and {:.0}.",
                double.sell[0].player.name,
                double.sell[1].player.name,
                double.budget,
                double.buy[0].player.name,
                double.buy[1].player.name,
                double.buy[0].player.price,
                double.buy[1].player.price,
                double.buy[0].score,
                double.buy[1].score,
            )?;
            render_transfer(out, "Double transfer", &double)?;
        }

        writeln!(out, "\n(Scores may vary where team expected to draw.)\n")?;
        Ok(())
    }

    fn print_best_squads<W: Write>(
        &self,
        out: &mut W,
        gameweek: &Gameweek,
        ranked: &[Candidate],
    ) -> Result<()> {
        let builder = self.builder();
        let best = builder.build(ranked);
        let differential_squad =
            builder.build(&differentials(ranked, self.settings.differential_threshold));
        let buy_now = intersect(&best, &differential_squad);

        let weighted = |c: &Candidate| Some(self.weighted_points(c));
        let best_rows = squad_rows(&best, weighted);
        let differential_rows = squad_rows(&differential_squad, weighted);
        let buy_rows = squad_rows(&buy_now, weighted);

        let formation = best
            .formation
            .map(|f| format!(" ({f})"))
            .unwrap_or_default();
        let title = if gameweek.is_current {
            format!(
                "The best team you could have played going into the current gameweek (deadline {}) was{formation}:",
                gameweek.deadline_label()
            )
        } else {
            format!(
                "The best team you can play in {} (deadline {}) is{formation}:",
                gameweek.name,
                gameweek.deadline_label()
            )
        };
        let best_columns = Columns {
            selected_by: false,
            ..Columns::FULL
        };
        render_table(out, &title, &best_rows, best_columns, self.styled)?;
        render_table(out, "Differentials:", &differential_rows, Columns::FULL, self.styled)?;

        if !buy_now.is_empty() && gameweek.is_next {
            render_table(out, "Buy these players now!", &buy_rows, Columns::FULL, self.styled)?;
        }

        writeln!(
            out,
            "\n(PPG = Points Per Game, WPPG = Weighted Points Per Game (by match difficulty))\n"
        )?;

        if let Some(path) = &self.args.export {
            let ranking_rows: Vec<_> = ranked.iter().map(|c| candidate_row(c, None)).collect();
            let report = export_workbook(
                path,
                &[
                    ExportSection {
                        sheet: "Rankings",
                        rows: &ranking_rows,
                    },
                    ExportSection {
                        sheet: "BestSquad",
                        rows: &best_rows,
                    },
                    ExportSection {
                        sheet: "Differentials",
                        rows: &differential_rows,
                    },
                    ExportSection {
                        sheet: "BuyNow",
                        rows: &buy_rows,
                    },
                ],
            )?;
            eprintln!(
                "exported {} rows across {} sheets to {}",
                report.rows,
                report.sheets,
                path.display()
            );
        }
        Ok(())
    }
}
