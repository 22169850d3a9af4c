//! UCI game analyser.
//!
//! Reads one game in analyser text format, searches every selected position
//! with a UCI engine in multi-PV mode and prints an XML result document to
//! stdout. Logs go to stderr.

mod analyser;
mod document;
mod engine;
mod info;

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use move_quality::{parse_uci_text, Color};
use tracing_subscriber::EnvFilter;

use analyser::{analyse_moves, PlyFilter};
use document::{write_document, AnalysisSettings};
use engine::{Search, UciEngine};

/// Analyse a game's moves against a UCI engine's top variations.
#[derive(Parser, Debug)]
#[command(name = "uci-analyser")]
#[command(about = "Analyse a game's moves against a UCI engine's top variations")]
struct Args {
    /// UCI engine executable
    #[arg(long)]
    engine: PathBuf,

    /// Search depth per position
    #[arg(long, default_value = "15", value_parser = clap::value_parser!(u32).range(1..))]
    searchdepth: u32,

    /// Number of opening plies to skip
    #[arg(long, default_value = "0")]
    bookdepth: u32,

    /// Number of variations to report per position
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    variations: u32,

    /// Only analyse White's moves
    #[arg(long, conflicts_with = "blackonly")]
    whiteonly: bool,

    /// Only analyse Black's moves
    #[arg(long)]
    blackonly: bool,

    /// Game file in analyser text format
    input: PathBuf,
}

impl Args {
    fn filter(&self) -> PlyFilter {
        let color = if self.whiteonly {
            Some(Color::White)
        } else if self.blackonly {
            Some(Color::Black)
        } else {
            None
        };
        PlyFilter {
            book_depth: self.bookdepth as usize,
            color,
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
    let args = Args::parse();

    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let game = parse_uci_text(&text)
        .with_context(|| format!("Malformed game file {}", args.input.display()))?;
    tracing::info!(input = %args.input.display(), moves = game.moves.len(), "loaded game");

    let mut engine = UciEngine::start(&args.engine, args.variations, args.searchdepth)
        .with_context(|| format!("Failed to start engine {}", args.engine.display()))?;
    let analysed = analyse_moves(&mut engine, &game.moves, args.filter())?;

    let settings = AnalysisSettings {
        engine: engine.name(),
        search_depth: args.searchdepth,
        book_depth: args.bookdepth,
        variations: args.variations,
    };
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_document(&mut out, &game, &settings, &analysed)?;
    out.flush()?;

    tracing::info!(analysed = analysed.len(), "analysis complete");
    Ok(())
}
