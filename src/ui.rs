//! Layout and drawing: board, active piece, next queue, score, high scores and overlays.

use crate::app::NameEntry;
use crate::game::{GameState, LineClear, Status};
use crate::highscores::{HighScoreStore, MAX_ENTRIES};
use crate::piece::Piece;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count};

/// Each board cell is two terminal columns wide so blocks look square.
const CELL_WIDTH: u16 = 2;
const CELL_HEIGHT: u16 = 1;
const BLOCK: &str = "██";

const SIDEBAR_WIDTH: u16 = 26;

/// Rows reserved per queued piece in the preview (tallest spawn shape + gap).
const PREVIEW_ROWS_PER_PIECE: u16 = 3;

/// Duration of the line-clear flash (TachyonFX) in ms.
const LINE_CLEAR_FLASH_MS: u32 = 250;

/// Everything the renderer reads in one frame.
pub struct View<'a> {
    pub state: &'a GameState,
    pub theme: &'a Theme,
    pub scores: &'a HighScoreStore,
    pub name_entry: Option<&'a NameEntry>,
    /// Line clear being flashed: drawn from its pre-clear board.
    pub flash: Option<&'a LineClear>,
    pub animate: bool,
}

/// Board size in terminal cells, border included.
fn board_outer_size(state: &GameState) -> (u16, u16) {
    let (w, h) = board_cells_size(state);
    (w.saturating_add(2), h.saturating_add(2))
}

/// Board cells in terminal cells, saturating at `u16::MAX`.
fn board_cells_size(state: &GameState) -> (u16, u16) {
    let cols = u16::try_from(state.board.width).unwrap_or(u16::MAX);
    let rows = u16::try_from(state.board.height).unwrap_or(u16::MAX);
    (cols.saturating_mul(CELL_WIDTH), rows.saturating_mul(CELL_HEIGHT))
}

/// Board outer rect and sidebar rect, centred in `area`.
fn game_layout(area: Rect, state: &GameState) -> (Rect, Rect) {
    let (bw, bh) = board_outer_size(state);
    let total_w = bw.saturating_add(SIDEBAR_WIDTH);

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(bh.max(sidebar_height(state))),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    (inner[0], inner[1])
}

fn sidebar_height(state: &GameState) -> u16 {
    let preview = state.generator.lookahead() as u16 * PREVIEW_ROWS_PER_PIECE + 2;
    preview + 6 + MAX_ENTRIES as u16 + 3
}

/// Board cells rect (inside the border).
fn board_inner(outer: Rect, state: &GameState) -> Rect {
    let (w, h) = board_cells_size(state);
    Rect {
        x: outer.x.saturating_add(1),
        y: outer.y.saturating_add(1),
        width: w.min(outer.width.saturating_sub(2)),
        height: h.min(outer.height.saturating_sub(2)),
    }
}

/// Draw the current frame. While a line clear is flashing and animation is on,
/// runs the TachyonFX line-clear flash and updates `line_clear_effect` /
/// `line_clear_process_time`.
pub fn draw(
    frame: &mut Frame,
    view: &View,
    line_clear_effect: &mut Option<Effect>,
    line_clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    let (board_area, sidebar_area) = game_layout(area, view.state);
    draw_board(frame.buffer_mut(), view, board_area);
    draw_sidebar(frame.buffer_mut(), view, sidebar_area);

    if let Some(flash) = view.flash.filter(|_| view.animate) {
        let board_rect = board_inner(board_area, view.state);
        apply_line_clear_effect(
            frame,
            &flash.rows,
            board_rect,
            line_clear_effect,
            line_clear_process_time,
            now,
        );
    }

    match view.state.status {
        Status::Idle => draw_start_overlay(frame.buffer_mut(), view, board_area),
        Status::Paused => draw_pause_overlay(frame.buffer_mut(), view.theme, board_area),
        Status::GameOver => {
            if let Some(entry) = view.name_entry {
                draw_name_entry(frame.buffer_mut(), view.theme, entry, board_area);
            }
        }
        Status::Running => {}
    }
}

/// Paint one board cell (two columns) if it lies inside `clip`.
fn paint_cell(buf: &mut Buffer, clip: Rect, col: i32, row: i32, style: Style, symbol: &str) {
    let (Ok(col), Ok(row)) = (u16::try_from(col), u16::try_from(row)) else {
        return;
    };
    let x = u32::from(clip.x) + u32::from(col) * u32::from(CELL_WIDTH);
    let y = u32::from(clip.y) + u32::from(row) * u32::from(CELL_HEIGHT);
    if x + u32::from(CELL_WIDTH) <= u32::from(clip.right()) && y < u32::from(clip.bottom()) {
        buf.set_string(x as u16, y as u16, symbol, style);
    }
}

fn draw_board(buf: &mut Buffer, view: &View, area: Rect) {
    let state = view.state;
    let theme = view.theme;
    let title = match state.status {
        Status::Paused => " Blockfall  paused ",
        Status::GameOver => " Blockfall  game over ",
        _ => " Blockfall ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, Style::default().fg(theme.title)));
    let inner = board_inner(area, state);
    block.render(area, buf);
    buf.set_style(inner, Style::default().bg(theme.bg));

    let empty = Style::default().fg(theme.div_line).bg(theme.bg);
    // Cleared rows stay visible until their flash ends.
    let board = view.flash.map_or(&state.board, |f| &f.board);
    for (y, row) in board.rows().enumerate() {
        if y >= usize::from(inner.height) {
            break;
        }
        for (x, &cell) in row.iter().enumerate().take(usize::from(inner.width / CELL_WIDTH)) {
            match theme.cell_color(cell) {
                Some(c) => paint_cell(buf, inner, x as i32, y as i32, Style::default().fg(c).bg(theme.bg), BLOCK),
                None => paint_cell(buf, inner, x as i32, y as i32, empty, " ·"),
            }
        }
    }

    if matches!(state.status, Status::Running | Status::Paused) {
        if let Some(piece) = state.piece.as_ref() {
            draw_shape(buf, theme, inner, piece, state.position.x, state.position.y);
        }
    }
}

fn draw_shape(buf: &mut Buffer, theme: &Theme, clip: Rect, piece: &Piece, px: i32, py: i32) {
    for (r, row) in piece.shape.iter().enumerate() {
        for (c, &cell) in row.iter().enumerate() {
            if let Some(color) = theme.cell_color(cell) {
                let style = Style::default().fg(color).bg(theme.bg);
                paint_cell(buf, clip, px + c as i32, py + r as i32, style, BLOCK);
            }
        }
    }
}

fn sidebar_block(theme: &Theme, title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(format!(" {title} "), Style::default().fg(theme.title)))
}

fn draw_sidebar(buf: &mut Buffer, view: &View, area: Rect) {
    let state = view.state;
    let theme = view.theme;
    let label = Style::default().fg(theme.title);
    let value = Style::default().fg(theme.main_fg);
    let preview_h = state.generator.lookahead() as u16 * PREVIEW_ROWS_PER_PIECE + 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(preview_h),
            Constraint::Length(6),
            Constraint::Length(MAX_ENTRIES as u16 + 2),
            Constraint::Min(1),
        ])
        .split(area);

    // --- Next ---
    let next_block = sidebar_block(theme, "Next");
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], buf);
    if state.status != Status::Idle {
        for (i, piece) in state.upcoming().take(state.generator.lookahead()).enumerate() {
            let (w, _) = piece.dims();
            let slot = Rect {
                x: next_inner.x,
                y: next_inner.y + i as u16 * PREVIEW_ROWS_PER_PIECE,
                width: next_inner.width,
                height: PREVIEW_ROWS_PER_PIECE.min(next_inner.height.saturating_sub(i as u16 * PREVIEW_ROWS_PER_PIECE)),
            };
            let cols = slot.width / CELL_WIDTH;
            let px = (i32::from(cols) - w as i32).max(0) / 2;
            draw_shape(buf, theme, slot, piece, px, 0);
        }
    }

    // --- Stats ---
    let best = view.scores.best();
    let stats_block = sidebar_block(theme, "Stats");
    let stats_inner = stats_block.inner(chunks[1]);
    stats_block.render(chunks[1], buf);
    let stats = vec![
        Line::from(vec![
            Span::styled("Score: ", label),
            Span::styled(state.score.to_string(), value),
        ]),
        Line::from(vec![
            Span::styled("Lines: ", label),
            Span::styled(state.lines_cleared.to_string(), value),
        ]),
        Line::from(vec![
            Span::styled("Speed: ", label),
            Span::styled(format!("{} ms", state.drop_interval.as_millis()), value),
        ]),
        Line::from(vec![
            Span::styled("Best:  ", label),
            Span::styled(format!("{} ({})", best.score, best.player), value),
        ]),
    ];
    Paragraph::new(stats).render(stats_inner, buf);

    // --- High scores ---
    let hs_block = sidebar_block(theme, "High scores");
    let hs_inner = hs_block.inner(chunks[2]);
    hs_block.render(chunks[2], buf);
    let entries = view.scores.entries();
    let lines: Vec<Line> = if entries.is_empty() {
        vec![Line::from(Span::styled(
            "no games yet",
            Style::default().fg(theme.inactive_fg),
        ))]
    } else {
        entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                Line::from(vec![
                    Span::styled(format!("{:>2}. ", i + 1), label),
                    Span::styled(format!("{:<12.12} {:>6}", e.player, e.score), value),
                ])
            })
            .collect()
    };
    Paragraph::new(lines).render(hs_inner, buf);

    // --- Help ---
    let help = Line::from(Span::styled(
        "←→ move ↑ rotate ↓ drop  P pause  R restart  Q quit",
        Style::default().fg(theme.inactive_fg),
    ));
    Paragraph::new(help)
        .wrap(ratatui::widgets::Wrap { trim: true })
        .render(chunks[3], buf);
}

/// Centred popup inside `area`.
fn popup_rect(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_popup(buf: &mut Buffer, theme: &Theme, area: Rect, lines: Vec<Line>) {
    let popup = popup_rect(area, area.width.saturating_sub(2).min(30), lines.len() as u16 + 2);
    Clear.render(popup, buf);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .style(Style::default().bg(theme.bg))
        .render(popup, buf);
}

fn draw_start_overlay(buf: &mut Buffer, view: &View, area: Rect) {
    let theme = view.theme;
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(" Blockfall ", Style::default().fg(theme.title).bold())),
        Line::from(""),
        Line::from(Span::styled(
            "Enter — start",
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!("Best: {}", view.scores.best().score),
            Style::default().fg(theme.inactive_fg),
        )),
        Line::from(""),
    ];
    draw_popup(buf, theme, area, lines);
}

fn draw_pause_overlay(buf: &mut Buffer, theme: &Theme, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "P — Resume   Q — Quit",
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
    ];
    draw_popup(buf, theme, area, lines);
}

fn draw_name_entry(buf: &mut Buffer, theme: &Theme, entry: &NameEntry, area: Rect) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("Score: {}", entry.score),
            Style::default().fg(theme.main_fg),
        )),
    ];
    if entry.new_best {
        lines.push(Line::from(Span::styled(
            "New high score!",
            Style::default().fg(Color::Yellow).bold(),
        )));
    }
    lines.extend([
        Line::from(""),
        Line::from(vec![
            Span::styled("Name: ", Style::default().fg(theme.title)),
            Span::styled(format!("{}_", entry.name), Style::default().fg(theme.main_fg)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Enter — save",
            Style::default().fg(theme.inactive_fg),
        )),
        Line::from(""),
    ]);
    draw_popup(buf, theme, area, lines);
}

/// Create or update the line-clear flash and process it: cleared rows start
/// white and fade back to their current colours.
fn apply_line_clear_effect(
    frame: &mut Frame,
    flash_rows: &[usize],
    board_rect: Rect,
    line_clear_effect: &mut Option<Effect>,
    line_clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = line_clear_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *line_clear_process_time = Some(now);

    if line_clear_effect.is_none() {
        let rows: HashSet<u16> = flash_rows
            .iter()
            .filter_map(|&r| u16::try_from(r).ok())
            .map(|r| board_rect.y.saturating_add(r.saturating_mul(CELL_HEIGHT)))
            .collect();
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| rows.contains(&pos.y)));
        let effect = fx::fade_from(
            Color::White,
            Color::White,
            (LINE_CLEAR_FLASH_MS, Interpolation::Linear),
        )
        .with_filter(filter)
        .with_area(board_rect);
        *line_clear_effect = Some(effect);
    }

    if let Some(effect) = line_clear_effect {
        frame.render_effect(effect, board_rect, tfx_delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;
    use crate::board::Position as BoardPos;
    use crate::piece::TetrominoKind;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn render(state: &GameState, scores: &HighScoreStore, name_entry: Option<&NameEntry>) -> Buffer {
        render_with_flash(state, scores, name_entry, None)
    }

    fn render_with_flash(
        state: &GameState,
        scores: &HighScoreStore,
        name_entry: Option<&NameEntry>,
        flash: Option<&LineClear>,
    ) -> Buffer {
        let theme = Theme::default();
        let mut terminal = Terminal::new(TestBackend::new(80, 40)).unwrap();
        let mut effect = None;
        let mut t = None;
        terminal
            .draw(|f| {
                let view = View {
                    state,
                    theme: &theme,
                    scores,
                    name_entry,
                    flash,
                    animate: false,
                };
                draw(f, &view, &mut effect, &mut t, Instant::now());
            })
            .unwrap();
        terminal.backend().buffer().clone()
    }

    fn text(buf: &Buffer) -> String {
        let area = buf.area;
        (area.y..area.y + area.height)
            .map(|y| {
                (area.x..area.x + area.width)
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn sized_state(width: u16, height: u16) -> GameState {
        GameState::new(&GameConfig {
            width,
            height,
            lookahead: 3,
            seed: Some(2),
        })
    }

    fn state() -> GameState {
        sized_state(12, 20)
    }

    fn scores(dir: &tempfile::TempDir) -> HighScoreStore {
        HighScoreStore::load(dir.path().join("hs.json"))
    }

    #[test]
    fn test_idle_shows_start_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let out = text(&render(&state(), &scores(&dir), None));
        assert!(out.contains("Enter — start"));
        assert!(out.contains("no games yet"));
    }

    #[test]
    fn test_running_draws_piece_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = state();
        s.start(Instant::now());
        s.place_for_test(Piece::new(TetrominoKind::I), BoardPos::new(4, 0));
        s.score = 1200;
        let out = text(&render(&s, &scores(&dir), None));
        assert!(out.contains("████████"));
        assert!(out.contains("Score: 1200"));
        assert!(!out.contains("Enter — start"));
    }

    #[test]
    fn test_high_score_list_is_ranked() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = scores(&dir);
        store.record(40, "bo");
        store.record(1200, "ana");
        let out = text(&render(&state(), &store, None));
        let first = out.find(" 1. ana").unwrap();
        let second = out.find(" 2. bo").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_game_over_shows_name_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = state();
        s.status = Status::GameOver;
        let entry = NameEntry {
            score: 300,
            name: "ana".to_string(),
            new_best: true,
        };
        let out = text(&render(&s, &scores(&dir), Some(&entry)));
        assert!(out.contains("Name: ana_"));
        assert!(out.contains("New high score!"));
    }

    #[test]
    fn test_oversized_boards_render_clipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = scores(&dir);
        for (w, h) in [(40_000, 20), (12, 60_000), (u16::MAX, 4)] {
            let mut s = sized_state(w, h);
            s.start(Instant::now());
            let buf = render(&s, &store, None);
            assert_eq!(buf.area, Rect::new(0, 0, 80, 40), "{w}x{h}");
        }
    }

    #[test]
    fn test_flash_draws_rows_before_removal() {
        let dir = tempfile::tempdir().unwrap();
        let s = state();
        let mut before = s.board.clone();
        for x in 0..12 {
            before.set(x, 19, 3);
        }
        let flash = LineClear {
            rows: vec![19],
            board: before,
        };
        let full_row = BLOCK.repeat(12);

        let out = text(&render(&s, &scores(&dir), None));
        assert!(!out.contains(&full_row));
        let out = text(&render_with_flash(&s, &scores(&dir), None, Some(&flash)));
        assert!(out.contains(&full_row));
    }
}
