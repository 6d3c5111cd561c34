//! Blockfall — classic falling-block puzzle game in the terminal.

mod app;
mod board;
mod game;
mod highscores;
mod input;
mod piece;
mod scoring;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use highscores::HighScoreStore;
use std::path::PathBuf;

/// Options derived from CLI that affect the engine (board size, queue length, seed).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub width: u16,
    pub height: u16,
    pub lookahead: usize,
    pub seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = args.log_file.as_deref() {
        init_logging(path)?;
    }
    let theme = match theme::Theme::load(args.theme.as_deref()) {
        Ok(t) => t,
        Err(e) => {
            log::warn!("falling back to the default theme: {}", e);
            theme::Theme::default()
        }
    };
    let config = GameConfig {
        width: args.width,
        height: args.height,
        lookahead: args.preview.max(piece::DEFAULT_LOOKAHEAD),
        seed: args.seed,
    };
    let scores_path = args
        .scores_file
        .clone()
        .unwrap_or_else(highscores::default_path);
    let store = HighScoreStore::load(scores_path);
    log::info!(
        "blockfall {} starting, scores at {}",
        env!("CARGO_PKG_VERSION"),
        store.path().display()
    );
    let mut app = App::new(args, config, theme, store);
    app.run()?;
    Ok(())
}

/// Route `log` output to a file; the terminal itself belongs to the game.
fn init_logging(path: &std::path::Path) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("logger already initialised")?;
    Ok(())
}

/// Classic falling-block puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "blockfall",
    version,
    about = "Classic falling-block puzzle game in the terminal. Clear full rows to score; the game speeds up as your score grows.",
    long_about = "Blockfall is a terminal take on the classic falling-block puzzle.\n\n\
        Steer the falling tetromino, complete horizontal rows to clear them, and keep the \
        stack below the top. Scores: 40 / 100 / 300 / 1200 for 1-4 rows at once.\n\n\
        CONTROLS:\n  Left/Right (h/l)  Move     Up (k)  Rotate     Down (j)  Soft drop (hold)\n  \
        Enter / s         Start    P       Pause      R         Restart    Q / Esc  Quit\n\n\
        High scores are kept in the config directory (see --scores-file)."
)]
pub struct Args {
    /// Board width in columns.
    #[arg(
        long,
        default_value_t = board::DEFAULT_WIDTH,
        value_name = "COLS",
        value_parser = clap::value_parser!(u16).range(i64::from(board::MIN_SIZE)..=i64::from(board::MAX_WIDTH))
    )]
    pub width: u16,

    /// Board height in rows.
    #[arg(
        long,
        default_value_t = board::DEFAULT_HEIGHT,
        value_name = "ROWS",
        value_parser = clap::value_parser!(u16).range(i64::from(board::MIN_SIZE)..=i64::from(board::MAX_HEIGHT))
    )]
    pub height: u16,

    /// Number of upcoming pieces kept in the preview queue (at least 3).
    #[arg(long, default_value_t = piece::DEFAULT_LOOKAHEAD, value_name = "N")]
    pub preview: usize,

    /// High score file. Defaults to $XDG_CONFIG_HOME/blockfall/highscores.json.
    #[arg(long, value_name = "FILE")]
    pub scores_file: Option<PathBuf>,

    /// Path to theme file (btop-style theme[key]=\"value\").
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Name pre-filled in the game-over prompt.
    #[arg(long, value_name = "NAME")]
    pub player: Option<String>,

    /// Seed for the piece generator (same seed, same piece sequence).
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Disable the line-clear flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Start playing immediately instead of waiting for Enter.
    #[arg(long)]
    pub autostart: bool,

    /// Append log output to this file (filter with RUST_LOG).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}
