//! Key conversion from crossterm to front-end keys.

use crossterm::event::{KeyCode as CtKeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// A key press as the panes see it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Ctrl(char),
    Alt(char),
    Enter,
    AltEnter,
    Tab,
    BackTab,
    Esc,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
    /// Releases, repeats of unsupported keys and the like
    Ignored,
}

/// Convert a crossterm KeyEvent to a [`Key`].
pub fn convert_key(event: KeyEvent) -> Key {
    if event.kind == KeyEventKind::Release {
        return Key::Ignored;
    }
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = event.modifiers.contains(KeyModifiers::ALT);

    match event.code {
        CtKeyCode::Char(c) if ctrl => Key::Ctrl(c.to_ascii_lowercase()),
        CtKeyCode::Char(c) if alt => Key::Alt(c),
        CtKeyCode::Char(c) => Key::Char(c),
        CtKeyCode::Enter if alt => Key::AltEnter,
        CtKeyCode::Enter => Key::Enter,
        CtKeyCode::Tab => Key::Tab,
        CtKeyCode::BackTab => Key::BackTab,
        CtKeyCode::Esc => Key::Esc,
        CtKeyCode::Backspace => Key::Backspace,
        CtKeyCode::Delete => Key::Delete,
        CtKeyCode::Left => Key::Left,
        CtKeyCode::Right => Key::Right,
        CtKeyCode::Up => Key::Up,
        CtKeyCode::Down => Key::Down,
        CtKeyCode::Home => Key::Home,
        CtKeyCode::End => Key::End,
        CtKeyCode::PageUp => Key::PageUp,
        CtKeyCode::PageDown => Key::PageDown,
        CtKeyCode::F(n) => Key::F(n),
        _ => Key::Ignored,
    }
}
