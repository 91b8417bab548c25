//! Pane focus and navigation.
//!
//! Exactly one of the input line, the source pane and the stack pane has
//! focus. Keys that belong to the input editor come back as
//! [`NavOutcome::Unhandled`].

use crate::keys::Key;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    Source,
    Stack,
}

impl Focus {
    /// Next pane in the Ctrl-X ring
    pub fn next(self) -> Self {
        match self {
            Focus::Input => Focus::Source,
            Focus::Source => Focus::Stack,
            Focus::Stack => Focus::Input,
        }
    }
}

/// What a key did to the navigation state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    /// The key belongs to the input editor
    Unhandled,
    Handled,
    FocusChanged { from: Focus, to: Focus },
    /// Toggle the breakpoint on this (1-based) source line
    ToggleBreakpoint(usize),
    /// A synthesized command, already canonical
    Submit(String),
}

#[derive(Debug, Clone)]
pub struct Navigator {
    focus: Focus,
    selected_frame: usize,
    frame_count: usize,
    current_frame: usize,
    source_line: usize,
    source_len: usize,
    page: usize,
    exit_confirmation: bool,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            focus: Focus::Input,
            selected_frame: 0,
            frame_count: 0,
            current_frame: 0,
            source_line: 1,
            source_len: 0,
            page: 10,
            exit_confirmation: false,
        }
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn selected_frame(&self) -> usize {
        self.selected_frame
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn source_line(&self) -> usize {
        self.source_line
    }

    pub fn exit_confirmation(&self) -> bool {
        self.exit_confirmation
    }

    /// Rows moved by PageUp/PageDown
    pub fn set_page(&mut self, rows: usize) {
        self.page = rows.max(1);
    }

    /// Reset per-prompt state. Focus survives across prompts.
    pub fn begin_prompt(
        &mut self,
        frame_count: usize,
        current_frame: usize,
        source_line: usize,
        source_len: usize,
    ) {
        self.frame_count = frame_count;
        self.current_frame = current_frame.min(frame_count.saturating_sub(1));
        self.selected_frame = self.current_frame;
        self.source_len = source_len;
        self.source_line = source_line.clamp(1, source_len.max(1));
        self.exit_confirmation = false;
    }

    /// Raise the quit prompt
    pub fn ask_exit(&mut self) {
        self.exit_confirmation = true;
    }

    pub fn set_focus(&mut self, to: Focus) -> NavOutcome {
        let from = self.focus;
        if from == to {
            return NavOutcome::Handled;
        }
        self.focus = to;
        debug!(?from, ?to, "focus changed");
        NavOutcome::FocusChanged { from, to }
    }

    pub fn handle(&mut self, key: Key) -> NavOutcome {
        if self.exit_confirmation {
            return match key {
                Key::Char('y') | Key::Char('Y') | Key::Enter => {
                    self.exit_confirmation = false;
                    NavOutcome::Submit("quit".to_string())
                }
                Key::Char('n') | Key::Char('N') | Key::Esc => {
                    self.exit_confirmation = false;
                    NavOutcome::Handled
                }
                Key::Ctrl('c') => {
                    self.exit_confirmation = false;
                    self.set_focus(Focus::Input)
                }
                _ => NavOutcome::Handled,
            };
        }

        match key {
            Key::Ctrl('x') => return self.set_focus(self.focus.next()),
            Key::Ctrl('c') if self.focus != Focus::Input => return self.set_focus(Focus::Input),
            _ => {}
        }

        match self.focus {
            Focus::Input => NavOutcome::Unhandled,
            Focus::Source => self.handle_source(key),
            Focus::Stack => self.handle_stack(key),
        }
    }

    fn move_source(&mut self, delta: isize) {
        let last = self.source_len.max(1);
        let line = self.source_line.saturating_add_signed(delta);
        self.source_line = line.clamp(1, last);
    }

    fn handle_source(&mut self, key: Key) -> NavOutcome {
        let page = self.page as isize;
        match key {
            Key::Up | Key::Char('k') | Key::Ctrl('p') => self.move_source(-1),
            Key::Down | Key::Char('j') | Key::Ctrl('n') => self.move_source(1),
            Key::PageUp => self.move_source(-page),
            Key::PageDown => self.move_source(page),
            Key::Home | Key::Char('g') => self.source_line = 1,
            Key::End | Key::Char('G') => self.source_line = self.source_len.max(1),
            Key::Char(' ') | Key::Char('b') | Key::Enter | Key::Ctrl('j') => {
                return NavOutcome::ToggleBreakpoint(self.source_line);
            }
            Key::Char('n') => return NavOutcome::Submit("next".to_string()),
            Key::Char('s') => return NavOutcome::Submit("step".to_string()),
            Key::Char('c') => return NavOutcome::Submit("continue".to_string()),
            Key::Char('q') => self.ask_exit(),
            _ => {}
        }
        NavOutcome::Handled
    }

    fn handle_stack(&mut self, key: Key) -> NavOutcome {
        match key {
            Key::Up | Key::Char('k') | Key::Ctrl('p') => {
                self.selected_frame = self.selected_frame.saturating_sub(1);
            }
            Key::Down | Key::Char('j') | Key::Ctrl('n') => {
                self.selected_frame =
                    (self.selected_frame + 1).min(self.frame_count.saturating_sub(1));
            }
            Key::Enter | Key::Ctrl('j') => {
                let delta = self.current_frame as isize - self.selected_frame as isize;
                return match delta {
                    d if d > 0 => NavOutcome::Submit(format!("up {}", d)),
                    d if d < 0 => NavOutcome::Submit(format!("down {}", -d)),
                    _ => NavOutcome::Handled,
                };
            }
            _ => {}
        }
        NavOutcome::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nav() -> Navigator {
        let mut nav = Navigator::new();
        nav.begin_prompt(3, 2, 10, 50);
        nav
    }

    #[test]
    fn test_ctrl_x_cycles_three_panes() {
        let mut nav = nav();
        assert_eq!(
            nav.handle(Key::Ctrl('x')),
            NavOutcome::FocusChanged {
                from: Focus::Input,
                to: Focus::Source
            }
        );
        nav.handle(Key::Ctrl('x'));
        assert_eq!(nav.focus(), Focus::Stack);
        nav.handle(Key::Ctrl('x'));
        assert_eq!(nav.focus(), Focus::Input);
    }

    #[test]
    fn test_input_keys_are_unhandled() {
        let mut nav = nav();
        assert_eq!(nav.handle(Key::Char('n')), NavOutcome::Unhandled);
        assert_eq!(nav.handle(Key::Ctrl('c')), NavOutcome::Unhandled);
        assert_eq!(nav.handle(Key::Enter), NavOutcome::Unhandled);
    }

    #[test]
    fn test_stack_selection_clamps() {
        let mut nav = nav();
        nav.set_focus(Focus::Stack);
        assert_eq!(nav.selected_frame(), 2);
        nav.handle(Key::Down);
        assert_eq!(nav.selected_frame(), 2);
        for _ in 0..5 {
            nav.handle(Key::Char('k'));
        }
        assert_eq!(nav.selected_frame(), 0);
        nav.handle(Key::Ctrl('n'));
        assert_eq!(nav.selected_frame(), 1);
    }

    #[test]
    fn test_stack_enter_synthesizes_up_and_down() {
        let mut nav = nav();
        nav.set_focus(Focus::Stack);
        assert_eq!(nav.handle(Key::Enter), NavOutcome::Handled);

        nav.handle(Key::Up);
        nav.handle(Key::Up);
        assert_eq!(nav.handle(Key::Enter), NavOutcome::Submit("up 2".to_string()));

        nav.begin_prompt(3, 0, 10, 50);
        nav.handle(Key::Down);
        assert_eq!(nav.handle(Key::Ctrl('j')), NavOutcome::Submit("down 1".to_string()));
    }

    #[test]
    fn test_source_keys() {
        let mut nav = nav();
        nav.set_focus(Focus::Source);
        nav.handle(Key::Down);
        nav.handle(Key::Char('j'));
        assert_eq!(nav.source_line(), 12);
        assert_eq!(nav.handle(Key::Char('b')), NavOutcome::ToggleBreakpoint(12));
        assert_eq!(nav.handle(Key::Char(' ')), NavOutcome::ToggleBreakpoint(12));
        assert_eq!(nav.handle(Key::Char('n')), NavOutcome::Submit("next".to_string()));
        assert_eq!(nav.handle(Key::Char('s')), NavOutcome::Submit("step".to_string()));
        assert_eq!(nav.handle(Key::Char('c')), NavOutcome::Submit("continue".to_string()));

        nav.handle(Key::Home);
        nav.handle(Key::Up);
        assert_eq!(nav.source_line(), 1);
        nav.handle(Key::End);
        nav.handle(Key::PageDown);
        assert_eq!(nav.source_line(), 50);
    }

    #[test]
    fn test_ctrl_c_returns_to_input() {
        let mut nav = nav();
        nav.set_focus(Focus::Stack);
        assert_eq!(
            nav.handle(Key::Ctrl('c')),
            NavOutcome::FocusChanged {
                from: Focus::Stack,
                to: Focus::Input
            }
        );
    }

    #[test]
    fn test_exit_confirmation() {
        let mut nav = nav();
        nav.set_focus(Focus::Source);
        nav.handle(Key::Char('q'));
        assert!(nav.exit_confirmation());
        assert_eq!(nav.handle(Key::Ctrl('x')), NavOutcome::Handled);
        assert_eq!(nav.handle(Key::Char('n')), NavOutcome::Handled);
        assert!(!nav.exit_confirmation());

        nav.handle(Key::Char('q'));
        assert_eq!(nav.handle(Key::Char('y')), NavOutcome::Submit("quit".to_string()));
        assert!(!nav.exit_confirmation());

        nav.handle(Key::Char('q'));
        assert_eq!(
            nav.handle(Key::Ctrl('c')),
            NavOutcome::FocusChanged {
                from: Focus::Source,
                to: Focus::Input
            }
        );
        assert!(!nav.exit_confirmation());
    }

    #[test]
    fn test_begin_prompt_resets_selection_keeps_focus() {
        let mut nav = nav();
        nav.set_focus(Focus::Stack);
        nav.handle(Key::Up);
        nav.ask_exit();
        nav.begin_prompt(4, 3, 1, 10);
        assert_eq!(nav.selected_frame(), 3);
        assert_eq!(nav.focus(), Focus::Stack);
        assert!(!nav.exit_confirmation());
    }
}
