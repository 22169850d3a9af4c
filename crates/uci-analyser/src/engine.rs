//! UCI engine process wrapper.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use move_quality::EvalValue;
use thiserror::Error;

use crate::info::parse_pv_info;

/// Maximum number of lines to wait through for a handshake response.
pub const MAX_UCI_LINES: usize = 1000;

/// Errors that can occur when working with the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Engine executable was not found.
    #[error("Engine not found: {0}")]
    NotFound(String),
    /// Communicating with the engine process failed.
    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The engine never identified itself or never became ready.
    #[error("Engine initialization failed: {0}")]
    InitFailed(String),
    /// The engine replied with something unusable.
    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),
}

/// A ranked candidate move from one search.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub move_id: String,
    pub score: EvalValue,
}

/// Position search used by the analyser.
pub trait Search {
    /// Search the position reached by `moves` from the start position.
    ///
    /// With `only` set, the search is restricted to that move. Candidates
    /// come back best first.
    fn search(&mut self, moves: &[String], only: Option<&str>) -> Result<Vec<Candidate>, EngineError>;

    /// Engine name for the result document.
    fn name(&self) -> &str;
}

/// A running UCI engine in multi-PV analysis mode.
pub struct UciEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    name: String,
    search_depth: u32,
    /// Configured `MultiPV`; reports for higher slots are ignored.
    variations: usize,
}

impl UciEngine {
    /// Spawn the engine and complete the UCI handshake.
    ///
    /// Enables `UCI_AnalyseMode`, sets `MultiPV` to `variations` and starts a
    /// new game.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if the executable does not exist
    /// - `EngineError::InitFailed` if the engine never sends `id name`,
    ///   `uciok` or `readyok`
    pub fn start(engine_path: &Path, variations: u32, search_depth: u32) -> Result<Self, EngineError> {
        let mut process = Command::new(engine_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    EngineError::NotFound(engine_path.display().to_string())
                }
                _ => EngineError::Io(e),
            })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::InitFailed("no stdin".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::InitFailed("no stdout".to_string()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
            name: String::new(),
            search_depth,
            variations: usize::try_from(variations).unwrap_or(usize::MAX).max(1),
        };
        engine.init_uci(variations)?;
        tracing::info!(engine = %engine.name, variations, search_depth, "engine ready");

        Ok(engine)
    }

    fn init_uci(&mut self, variations: u32) -> Result<(), EngineError> {
        self.send_command("uci")?;

        let mut name = None;
        for _ in 0..MAX_UCI_LINES {
            let line = self.read_line()?;
            if let Some(id) = line.strip_prefix("id name ") {
                name = Some(id.to_string());
            } else if line == "uciok" {
                break;
            }
        }
        self.name = name.ok_or_else(|| EngineError::InitFailed("no \"id name\" found".to_string()))?;

        self.send_command("setoption name UCI_AnalyseMode value true")?;
        self.send_command(&format!("setoption name MultiPV value {}", variations))?;
        self.send_command("ucinewgame")?;
        self.wait_ready()
    }

    fn wait_ready(&mut self) -> Result<(), EngineError> {
        self.send_command("isready")?;
        for _ in 0..MAX_UCI_LINES {
            if self.read_line()? == "readyok" {
                return Ok(());
            }
        }
        Err(EngineError::InitFailed("no readyok".to_string()))
    }

    fn send_command(&mut self, command: &str) -> Result<(), EngineError> {
        tracing::trace!(command, "to engine");
        writeln!(self.stdin, "{}", command)?;
        self.stdin.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        let bytes = self.stdout.read_line(&mut line)?;
        if bytes == 0 {
            return Err(EngineError::InvalidResponse(
                "Engine closed unexpectedly".to_string(),
            ));
        }
        Ok(line.trim().to_string())
    }
}

impl Search for UciEngine {
    fn search(&mut self, moves: &[String], only: Option<&str>) -> Result<Vec<Candidate>, EngineError> {
        if moves.is_empty() {
            self.send_command("position startpos")?;
        } else {
            self.send_command(&format!("position startpos moves {}", moves.join(" ")))?;
        }
        match only {
            Some(mv) => self.send_command(&format!("go depth {} searchmoves {}", self.search_depth, mv))?,
            None => self.send_command(&format!("go depth {}", self.search_depth))?,
        }

        // Latest report per variation; deeper iterations overwrite shallower ones.
        let mut lines: Vec<Option<(u32, Candidate)>> = Vec::new();
        let slots = self.variations;
        loop {
            let line = self.read_line()?;
            if line.starts_with("bestmove") {
                break;
            }
            let Some(info) = parse_pv_info(&line) else {
                continue;
            };
            if info.multipv > slots {
                tracing::debug!(multipv = info.multipv, slots, "ignoring extra variation");
                continue;
            }
            if info.multipv > lines.len() {
                lines.resize(info.multipv, None);
            }
            let slot = &mut lines[info.multipv - 1];
            if !matches!(slot, Some((depth, _)) if info.depth < *depth) {
                *slot = Some((
                    info.depth,
                    Candidate {
                        move_id: info.first_move,
                        score: info.score,
                    },
                ));
            }
        }

        let candidates: Vec<Candidate> = lines.into_iter().flatten().map(|(_, c)| c).collect();
        if candidates.is_empty() {
            return Err(EngineError::InvalidResponse(format!(
                "no scored variation after {} moves",
                moves.len()
            )));
        }
        Ok(candidates)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        let _ = self.send_command("quit");
        let _ = self.process.wait();
    }
}
