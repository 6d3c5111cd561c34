//! App: terminal init, main loop, tick and key handling.

use crate::game::{Command, GameState, LineClear, TickOutcome};
use crate::highscores::HighScoreStore;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, View};
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use log::info;
use ratatui::DefaultTerminal;
use std::io::Write;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Longest accepted player name, in characters.
const MAX_NAME_LEN: usize = 16;

const DEFAULT_FRAME_RATE: f64 = 60.0;
const MIN_FRAME_RATE: f64 = 1.0;
const MAX_FRAME_RATE: f64 = 240.0;

/// Frame budget for `--frame-rate`; non-positive or non-finite rates fall back
/// to the default, the rest are clamped to a playable range.
fn frame_duration(rate: f64) -> Duration {
    let rate = if rate.is_finite() && rate > 0.0 {
        rate.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE)
    } else {
        DEFAULT_FRAME_RATE
    };
    Duration::from_secs_f64(1.0 / rate)
}

/// Restores the terminal when dropped, so every exit path out of `App::run`
/// leaves raw mode and the alternate screen.
struct TerminalGuard<W: Write> {
    out: W,
    /// Keyboard enhancement flags were pushed and must be popped.
    releases: bool,
}

impl<W: Write> Drop for TerminalGuard<W> {
    fn drop(&mut self) {
        use crossterm::{
            event::PopKeyboardEnhancementFlags,
            execute,
            terminal::{LeaveAlternateScreen, disable_raw_mode},
        };
        if self.releases {
            let _ = execute!(self.out, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(self.out, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Player-name prompt shown while the engine holds a finished game's score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    pub score: u32,
    pub name: String,
    pub new_best: bool,
}

impl NameEntry {
    fn push(&mut self, c: char) {
        if !c.is_control() && self.name.chars().count() < MAX_NAME_LEN {
            self.name.push(c);
        }
    }
}

pub struct App {
    args: Args,
    theme: Theme,
    state: GameState,
    store: HighScoreStore,
    /// Terminal reports key releases (keyboard enhancement accepted).
    releases: bool,
    name_entry: Option<NameEntry>,
    /// Line clear being flashed; dropped when the effect finishes.
    flash: Option<LineClear>,
    /// TachyonFX flash for line-clear (created when the flash starts).
    line_clear_effect: Option<Effect>,
    /// Last time we processed the line-clear effect (for delta).
    line_clear_effect_process_time: Option<Instant>,
    running: bool,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme, store: HighScoreStore) -> Self {
        let state = GameState::new(&config);
        Self {
            args,
            theme,
            state,
            store,
            releases: false,
            name_entry: None,
            flash: None,
            line_clear_effect: None,
            line_clear_effect_process_time: None,
            running: true,
        }
    }

    /// End the main loop after the current iteration.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut guard = TerminalGuard {
            out: std::io::stdout(),
            releases: false,
        };
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Release events let soft drop last exactly as long as the key is held.
        self.releases = crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false)
            && execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .is_ok();
        guard.releases = self.releases;
        info!("key release events: {}", self.releases);

        let mut terminal = DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        if self.args.autostart {
            self.state.start(Instant::now());
        }
        self.run_loop(&mut terminal)
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = frame_duration(self.args.frame_rate);

        while self.running {
            let now = Instant::now();
            terminal.draw(|f| {
                let view = View {
                    state: &self.state,
                    theme: &self.theme,
                    scores: &self.store,
                    name_entry: self.name_entry.as_ref(),
                    flash: self.flash.as_ref(),
                    animate: !self.args.no_animation,
                };
                ui::draw(
                    f,
                    &view,
                    &mut self.line_clear_effect,
                    &mut self.line_clear_effect_process_time,
                    now,
                );
            })?;

            if self.line_clear_effect.as_ref().is_some_and(Effect::done) {
                self.flash = None;
                self.line_clear_effect = None;
                self.line_clear_effect_process_time = None;
            }

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                // Drain everything queued so input is applied before the next tick.
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        self.handle_key(key, Instant::now());
                    }
                }
            }

            self.tick(Instant::now());
        }
        Ok(())
    }

    /// One gravity check; reacts to clears and game over.
    fn tick(&mut self, now: Instant) {
        match self.state.tick(now) {
            TickOutcome::Locked { lines } if lines > 0 => {
                if !self.args.no_animation {
                    self.flash = self.state.last_clear.clone();
                    self.line_clear_effect = None;
                    self.line_clear_effect_process_time = None;
                }
            }
            TickOutcome::GameOver { score } => self.begin_name_entry(score),
            _ => {}
        }
    }

    fn begin_name_entry(&mut self, score: u32) {
        self.name_entry = Some(NameEntry {
            score,
            name: self.args.player.clone().unwrap_or_default(),
            new_best: self.store.is_new_best(score),
        });
    }

    /// Record the pending score under the typed name and return to the start screen.
    fn submit_name(&mut self) {
        let Some(entry) = self.name_entry.take() else {
            return;
        };
        self.store.record(entry.score, &entry.name);
        self.state.acknowledge_game_over();
        self.flash = None;
        self.line_clear_effect = None;
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if let Some(entry) = self.name_entry.as_mut() {
            if key.kind == KeyEventKind::Release {
                return;
            }
            match key.code {
                KeyCode::Enter => self.submit_name(),
                KeyCode::Esc => {
                    entry.name.clear();
                    self.submit_name();
                }
                KeyCode::Backspace => {
                    entry.name.pop();
                }
                KeyCode::Char(c) => entry.push(c),
                _ => {}
            }
            return;
        }

        match key_to_action(key, self.releases) {
            Action::Quit => self.stop(),
            Action::Game(command) => self.state.apply(command, now),
            Action::SoftDropTap => {
                self.state.apply(Command::SoftDropOn, now);
                self.state.apply(Command::SoftDropOff, now);
            }
            Action::None => {}
        }
        if let Some(score) = self.state.pending_score() {
            // Start on a board that cannot fit a piece ends immediately.
            self.begin_name_entry(score);
        }
    }
}
