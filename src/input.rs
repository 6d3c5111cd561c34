//! Key bindings: arrows or vim keys, mapped to game commands.

use crate::game::Command;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Action from a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Game(Command),
    /// One-shot soft drop for terminals that never report key releases.
    SoftDropTap,
    Quit,
    None,
}

/// Map a key event to an action. `releases` tells whether the terminal reports
/// key-up events; without them a held soft drop could never end.
pub fn key_to_action(key: KeyEvent, releases: bool) -> Action {
    let KeyEvent {
        code,
        modifiers,
        kind,
        ..
    } = key;
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    let is_down = matches!(code, KeyCode::Down | KeyCode::Char('j'));
    match kind {
        KeyEventKind::Release if is_down => return Action::Game(Command::SoftDropOff),
        KeyEventKind::Release => return Action::None,
        // Auto-repeat: keep moving sideways, soft drop is already held.
        KeyEventKind::Repeat if is_down && releases => return Action::None,
        KeyEventKind::Press | KeyEventKind::Repeat => {}
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Game(Command::Pause),
        KeyCode::Char('r') => Action::Game(Command::Restart),
        KeyCode::Enter | KeyCode::Char('s') => Action::Game(Command::Start),
        KeyCode::Left | KeyCode::Char('h') => Action::Game(Command::MoveLeft),
        KeyCode::Right | KeyCode::Char('l') => Action::Game(Command::MoveRight),
        KeyCode::Up | KeyCode::Char('k') => Action::Game(Command::Rotate),
        KeyCode::Down | KeyCode::Char('j') if releases => Action::Game(Command::SoftDropOn),
        KeyCode::Down | KeyCode::Char('j') => Action::SoftDropTap,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        key(code, KeyEventKind::Press)
    }

    #[test]
    fn test_arrows_and_vim_keys() {
        for (a, b, cmd) in [
            (KeyCode::Left, KeyCode::Char('h'), Command::MoveLeft),
            (KeyCode::Right, KeyCode::Char('l'), Command::MoveRight),
            (KeyCode::Up, KeyCode::Char('k'), Command::Rotate),
        ] {
            assert_eq!(key_to_action(press(a), true), Action::Game(cmd));
            assert_eq!(key_to_action(press(b), false), Action::Game(cmd));
        }
    }

    #[test]
    fn test_soft_drop_press_and_release() {
        assert_eq!(
            key_to_action(press(KeyCode::Down), true),
            Action::Game(Command::SoftDropOn)
        );
        assert_eq!(
            key_to_action(key(KeyCode::Down, KeyEventKind::Release), true),
            Action::Game(Command::SoftDropOff)
        );
        assert_eq!(
            key_to_action(key(KeyCode::Down, KeyEventKind::Repeat), true),
            Action::None
        );
    }

    #[test]
    fn test_soft_drop_without_release_reporting_is_a_tap() {
        assert_eq!(key_to_action(press(KeyCode::Down), false), Action::SoftDropTap);
    }

    #[test]
    fn test_session_keys() {
        assert_eq!(key_to_action(press(KeyCode::Enter), true), Action::Game(Command::Start));
        assert_eq!(key_to_action(press(KeyCode::Char('p')), true), Action::Game(Command::Pause));
        assert_eq!(key_to_action(press(KeyCode::Char('r')), true), Action::Game(Command::Restart));
        assert_eq!(key_to_action(press(KeyCode::Esc), true), Action::Quit);
    }

    #[test]
    fn test_other_releases_and_modifiers_ignored() {
        assert_eq!(
            key_to_action(key(KeyCode::Left, KeyEventKind::Release), true),
            Action::None
        );
        let ctrl = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl, true), Action::None);
    }
}
