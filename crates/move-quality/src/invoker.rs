//! Running the external analyser.
//!
//! The analyser is a separate executable invoked once per game:
//!
//! ```text
//! <analyser> --engine <path> --searchdepth <n> --bookdepth <n> --variations <n>
//!            [--whiteonly|--blackonly] <movetext_path>
//! ```
//!
//! It writes an XML result document to stdout. [`AnalysisInvoker`] is the seam
//! between the pipeline and that process, so tests can substitute fixtures.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use thiserror::Error;

use crate::game::Color;

/// How often a running analyser is polled when a timeout is set.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Maximum number of stderr bytes kept in an error message.
const STDERR_TAIL: usize = 2000;

/// Errors from a single analyser invocation.
#[derive(Error, Debug)]
pub enum InvocationError {
    /// The analyser process could not be started.
    #[error("Failed to spawn analyser {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The analyser exited unsuccessfully.
    #[error("Analyser exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    /// The analyser ran past its timeout and was killed.
    #[error("Analyser timed out after {0:?}")]
    TimedOut(Duration),
    /// The analyser produced no output.
    #[error("Analyser produced no output")]
    EmptyOutput,
    /// Reading or writing an artifact failed.
    #[error("Analyser I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parameters of one analyser run.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationConfig {
    pub engine_path: PathBuf,
    pub search_depth: u32,
    pub book_depth: u32,
    pub variations: u32,
    /// Only analyse the moves of this colour; `None` analyses both.
    pub color: Option<Color>,
    /// Converted movetext file.
    pub input_path: PathBuf,
    /// Kill the analyser when it runs longer than this.
    pub timeout: Option<Duration>,
}

impl InvocationConfig {
    /// Command-line arguments, in the order the analyser expects.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--engine".into(),
            self.engine_path.clone().into_os_string(),
            "--searchdepth".into(),
            self.search_depth.to_string().into(),
            "--bookdepth".into(),
            self.book_depth.to_string().into(),
            "--variations".into(),
            self.variations.to_string().into(),
        ];
        match self.color {
            Some(Color::White) => args.push("--whiteonly".into()),
            Some(Color::Black) => args.push("--blackonly".into()),
            None => {}
        }
        args.push(self.input_path.clone().into_os_string());
        args
    }

    /// Where the result document for this input is written.
    pub fn result_path(&self) -> PathBuf {
        let stem = self
            .input_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "game".to_string());
        self.input_path.with_file_name(format!("{}_results.xml", stem))
    }
}

/// Raw output of one analyser run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDocument(String);

impl ResultDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Produces a result document for one game.
pub trait AnalysisInvoker: Send + Sync {
    /// Analyse the game described by `config`.
    fn invoke(&self, config: &InvocationConfig) -> Result<ResultDocument, InvocationError>;
}

/// Runs the analyser as a child process.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    analyser_path: PathBuf,
}

impl ProcessInvoker {
    pub fn new(analyser_path: impl Into<PathBuf>) -> Self {
        Self {
            analyser_path: analyser_path.into(),
        }
    }

    pub fn analyser_path(&self) -> &Path {
        &self.analyser_path
    }
}

impl AnalysisInvoker for ProcessInvoker {
    fn invoke(&self, config: &InvocationConfig) -> Result<ResultDocument, InvocationError> {
        let result_path = config.result_path();
        let stderr_path = result_path.with_extension("stderr");
        let stdout = File::create(&result_path)?;
        let stderr = File::create(&stderr_path)?;

        tracing::debug!(
            analyser = %self.analyser_path.display(),
            args = ?config.args(),
            "spawning analyser"
        );

        let mut child = Command::new(&self.analyser_path)
            .args(config.args())
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|source| InvocationError::Spawn {
                program: self.analyser_path.display().to_string(),
                source,
            })?;

        let status = wait_with_timeout(&mut child, config.timeout)?;
        if !status.success() {
            let stderr = fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(InvocationError::Failed {
                status: status.to_string(),
                stderr: tail(stderr.trim(), STDERR_TAIL).to_string(),
            });
        }

        let content = fs::read_to_string(&result_path)?;
        if content.trim().is_empty() {
            return Err(InvocationError::EmptyOutput);
        }
        Ok(ResultDocument::new(content))
    }
}

/// Wait for `child`, killing it once `timeout` elapses.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
) -> Result<ExitStatus, InvocationError> {
    let Some(timeout) = timeout else {
        return Ok(child.wait()?);
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(InvocationError::TimedOut(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

/// Scratch directory owning one game's input and result files.
///
/// The directory is deleted on drop unless it was created with `keep`.
#[derive(Debug)]
pub struct GameWorkspace {
    dir: Option<TempDir>,
    game_number: usize,
    keep: bool,
}

impl GameWorkspace {
    pub fn create(game_number: usize, keep: bool) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("pgn-spy-game-{}-", game_number))
            .tempdir()?;
        Ok(Self {
            dir: Some(dir),
            game_number,
            keep,
        })
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new("."),
        }
    }

    /// Path of the converted movetext file.
    pub fn input_path(&self) -> PathBuf {
        self.path()
            .join(format!("long_algebraic_game_{}.pgn", self.game_number))
    }
}

impl Drop for GameWorkspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if self.keep {
                let kept = dir.keep();
                tracing::info!(game = self.game_number, path = %kept.display(), "kept analysis artifacts");
            }
        }
    }
}
