//! PGN Spy - compare a player's moves with an engine's top choices.

mod config;
mod table;

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use config::{ConfigFile, Overrides};
use move_quality::{list_players, load_games_from_path, GameAnalyzer, ProcessInvoker};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pgn-spy")]
#[command(about = "Compare a player's moves with an engine's top choices")]
struct Cli {
    /// Configuration file (defaults to ./pgn-spy.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the players found in a PGN file
    Players {
        /// PGN file
        pgn: PathBuf,
    },
    /// Analyse one player's games
    Analyse(AnalyseArgs),
}

#[derive(Args, Debug)]
struct AnalyseArgs {
    /// PGN file
    pgn: PathBuf,

    /// Player name, exactly as in the White/Black headers
    #[arg(short, long)]
    player: String,

    /// Analyser executable
    #[arg(long)]
    analyser: Option<PathBuf>,

    /// UCI engine executable
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Engine search depth
    #[arg(long)]
    depth: Option<u32>,

    /// Opening plies to skip
    #[arg(long)]
    book_depth: Option<u32>,

    /// Centipawn bound of undecided positions
    #[arg(long)]
    undecided: Option<u32>,

    /// Centipawn bound of decided positions
    #[arg(long)]
    lost: Option<u32>,

    /// Engine variations per position
    #[arg(long)]
    variations: Option<u32>,

    /// Analyser processes to run at once
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Skip games whose analysis fails instead of aborting
    #[arg(long)]
    skip_failures: bool,

    /// Per-game analyser timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Whole-run timeout in seconds
    #[arg(long)]
    run_timeout: Option<u64>,

    /// Keep per-game analyser input and output files
    #[arg(long)]
    keep_artifacts: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl AnalyseArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            analyser_path: self.analyser.clone(),
            engine_path: self.engine.clone(),
            search_depth: self.depth,
            book_depth: self.book_depth,
            undecided_threshold: self.undecided,
            lost_threshold: self.lost,
            variations: self.variations,
            jobs: self.jobs,
            skip_failures: self.skip_failures,
            invocation_timeout_secs: self.timeout,
            run_timeout_secs: self.run_timeout,
            keep_artifacts: self.keep_artifacts,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Players { pgn } => {
            let games = load_games_from_path(&pgn)
                .with_context(|| format!("Failed to load {}", pgn.display()))?;
            for player in list_players(&games) {
                println!("{}", player);
            }
        }
        Commands::Analyse(args) => {
            let mut config = ConfigFile::load(cli.config.as_deref())?.analysis;
            args.overrides().apply(&mut config);

            let games = load_games_from_path(&args.pgn)
                .with_context(|| format!("Failed to load {}", args.pgn.display()))?;
            tracing::info!(games = games.len(), pgn = %args.pgn.display(), "loaded games");

            let invoker = ProcessInvoker::new(&config.analyser_path);
            let analyzer = GameAnalyzer::new(invoker, config)?;
            let report = analyzer
                .analyze_player(&games, &args.player)
                .with_context(|| format!("Analysis of {} failed", args.player))?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", table::render(&report));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_analyse_with_overrides() {
        let cli = Cli::try_parse_from([
            "pgn-spy",
            "analyse",
            "games.pgn",
            "--player",
            "Carlsen, Magnus",
            "--depth",
            "18",
            "-j",
            "4",
            "--skip-failures",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Analyse(args) => {
                assert_eq!(args.player, "Carlsen, Magnus");
                assert!(args.json);
                let overrides = args.overrides();
                assert_eq!(overrides.search_depth, Some(18));
                assert_eq!(overrides.jobs, Some(4));
                assert!(overrides.skip_failures);
                assert_eq!(overrides.variations, None);
            }
            Commands::Players { .. } => panic!("Expected analyse command"),
        }
    }

    #[test]
    fn test_analyse_requires_player() {
        assert!(Cli::try_parse_from(["pgn-spy", "analyse", "games.pgn"]).is_err());
    }

    #[test]
    fn test_parses_players_with_config() {
        let cli =
            Cli::try_parse_from(["pgn-spy", "players", "games.pgn", "--config", "spy.toml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("spy.toml")));
        assert!(matches!(cli.command, Commands::Players { .. }));
    }
}
