//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::board::Cell;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Theme keys for piece colours, in colour-id order (id 1 first).
const PIECE_KEYS: [&str; 7] = ["cyan", "blue", "orange", "yellow", "green", "purple", "red"];

const DEFAULT_PIECES: [&str; 7] = [
    "#56B6C2", // cyan
    "#61AFEF", // blue
    "#D19A66", // orange
    "#E5C07B", // yellow
    "#98C379", // green
    "#C678DD", // purple
    "#E06C75", // red
];

/// Piece palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Piece colours for ids 1..=7.
    pub pieces: [Color; 7],
    /// Playfield background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, lines).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text (help line, empty list slots).
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_map(&HashMap::new())
    }
}

impl Theme {
    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Missing keys keep their defaults; no path means all defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ThemeError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let s = std::fs::read_to_string(path)?;
        Ok(Self::from_map(&parse_theme_file(&s)))
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str, fallback: Color| {
            map.get(key)
                .and_then(|v| parse_hex(v).ok())
                .unwrap_or(fallback)
        };
        let mut pieces = [Color::Reset; 7];
        for (i, slot) in pieces.iter_mut().enumerate() {
            let fallback = parse_hex(DEFAULT_PIECES[i]).unwrap_or(Color::White);
            *slot = get(PIECE_KEYS[i], fallback);
        }
        Self {
            pieces,
            bg: get("main_bg", Color::Rgb(0x28, 0x2C, 0x34)),
            div_line: get("div_line", Color::Rgb(0x3F, 0x44, 0x4F)),
            main_fg: get("main_fg", Color::Rgb(0xAB, 0xB2, 0xBF)),
            title: get("title", Color::Rgb(0xE5, 0xC0, 0x7B)),
            inactive_fg: get("inactive_fg", Color::Rgb(0x5C, 0x63, 0x70)),
        }
    }

    /// Colour for a cell id; empty cells have none.
    #[inline]
    pub fn cell_color(&self, cell: Cell) -> Option<Color> {
        match cell {
            0 => None,
            id => self.pieces.get(usize::from(id) - 1).copied(),
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>, scale: u8| {
        u8::from_str_radix(&s[range], 16)
            .map(|v| v * scale)
            .map_err(|_| invalid())
    };
    if !s.is_ascii() {
        return Err(invalid());
    }
    let (r, g, b) = match s.len() {
        6 => (channel(0..2, 1)?, channel(2..4, 1)?, channel(4..6, 1)?),
        3 => (channel(0..1, 17)?, channel(1..2, 17)?, channel(2..3, 17)?),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}
