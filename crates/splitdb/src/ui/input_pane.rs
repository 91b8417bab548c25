//! Input Pane Widget
//!
//! Displays the transcript of accepted commands and engine output above
//! the current input line, with the prompt, a block cursor and a usage
//! hint for a lone command word.

use crate::commands;
use crate::completion::{Completion, Document};
use crate::config::PromptConfig;
use crate::theme::{StyleTag, StyledLine, Theme};
use crate::ui::highlight::Highlighter;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use std::collections::BTreeSet;

/// A single transcript entry
#[derive(Debug, Clone, Default)]
pub struct HistoryEntry {
    /// The accepted input, if this entry echoes one
    pub input: Option<String>,
    /// Output lines
    pub output: Vec<StyledLine>,
    /// Whether this entry is an error
    pub is_error: bool,
}

impl HistoryEntry {
    /// Echo of an accepted input line
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: Some(input.into()),
            ..Self::default()
        }
    }

    /// Output with no echoed input
    pub fn output(lines: Vec<StyledLine>) -> Self {
        Self {
            output: lines,
            ..Self::default()
        }
    }

    /// Set plain output text
    pub fn with_output(mut self, output: &str) -> Self {
        self.output = output
            .lines()
            .map(|l| StyledLine::tagged(StyleTag::Output, l))
            .collect();
        self
    }

    /// Mark as an error
    pub fn with_error(mut self, error: &str) -> Self {
        self.output = error
            .lines()
            .map(|l| StyledLine::tagged(StyleTag::Error, l))
            .collect();
        self.is_error = true;
        self
    }
}

/// The input line state
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Transcript
    pub history: Vec<HistoryEntry>,
    /// Current input (may span lines in multiline mode)
    pub input: String,
    /// Cursor position in the input (byte offset)
    pub cursor: usize,
    /// Newlines are inserted by Enter instead of accepting
    pub paste_mode: bool,
    /// Accepted inputs, oldest first, for Up/Down recall
    recalled: Vec<String>,
    /// History navigation index (None = current input)
    history_index: Option<usize>,
    /// Saved input when browsing history
    saved_input: String,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, entry: HistoryEntry) {
        if let Some(input) = &entry.input
            && !input.trim().is_empty()
        {
            self.recalled.push(input.clone());
        }
        self.history.push(entry);
    }

    /// Clear the current input and reset history navigation
    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor = 0;
        self.history_index = None;
        self.saved_input.clear();
    }

    pub fn document(&self) -> Document {
        Document::new(self.input.clone(), self.cursor)
    }

    /// Insert a character at the cursor
    pub fn insert_char(&mut self, ch: char) {
        self.input.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn insert_str(&mut self, text: &str) {
        self.input.insert_str(self.cursor, text);
        self.cursor += text.len();
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.input[..self.cursor].char_indices().last().map(|(i, _)| i)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.input[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }

    /// Delete the character before the cursor
    pub fn backspace(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.input.replace_range(prev..self.cursor, "");
            self.cursor = prev;
        }
    }

    /// Delete the character at the cursor
    pub fn delete(&mut self) {
        if let Some(next) = self.next_boundary() {
            self.input.replace_range(self.cursor..next, "");
        }
    }

    pub fn cursor_left(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.cursor = prev;
        }
    }

    pub fn cursor_right(&mut self) {
        if let Some(next) = self.next_boundary() {
            self.cursor = next;
        }
    }

    pub fn cursor_home(&mut self) {
        self.cursor = self.input[..self.cursor].rfind('\n').map_or(0, |i| i + 1);
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input[self.cursor..]
            .find('\n')
            .map_or(self.input.len(), |i| self.cursor + i);
    }

    /// Delete from the start of the line to the cursor (Ctrl-U)
    pub fn kill_to_start(&mut self) {
        let start = self.input[..self.cursor].rfind('\n').map_or(0, |i| i + 1);
        self.input.replace_range(start..self.cursor, "");
        self.cursor = start;
    }

    /// Delete the word before the cursor (Ctrl-W)
    pub fn kill_word(&mut self) {
        let before = &self.input[..self.cursor];
        let trimmed = before.trim_end();
        let start = trimmed
            .rfind(char::is_whitespace)
            .map_or(0, |i| i + 1);
        self.input.replace_range(start..self.cursor, "");
        self.cursor = start;
    }

    /// Replace the text a completion covers
    pub fn apply_completion(&mut self, completion: &Completion) {
        let start = self.cursor.saturating_sub(completion.replace_len);
        self.input.replace_range(start..self.cursor, &completion.text);
        self.cursor = start + completion.text.len();
    }

    /// Navigate to previous command in history
    pub fn history_up(&mut self) {
        if self.recalled.is_empty() {
            return;
        }

        match self.history_index {
            None => {
                self.saved_input = self.input.clone();
                let last_idx = self.recalled.len() - 1;
                self.history_index = Some(last_idx);
                self.input = self.recalled[last_idx].clone();
            }
            Some(idx) if idx > 0 => {
                self.history_index = Some(idx - 1);
                self.input = self.recalled[idx - 1].clone();
            }
            Some(_) => {
                // Already at oldest entry
            }
        }
        self.cursor = self.input.len();
    }

    /// Navigate to next command in history
    pub fn history_down(&mut self) {
        match self.history_index {
            Some(idx) if idx + 1 < self.recalled.len() => {
                self.history_index = Some(idx + 1);
                self.input = self.recalled[idx + 1].clone();
            }
            Some(_) => {
                self.history_index = None;
                self.input = std::mem::take(&mut self.saved_input);
            }
            None => {}
        }
        self.cursor = self.input.len();
    }
}

/// Whether `first_word` can still become a command name
pub fn is_command_prefix(first_word: &str, names: &BTreeSet<String>) -> bool {
    names.iter().any(|n| n.starts_with(first_word))
}

/// Usage hint fragments for input that is exactly one command word
pub fn completion_hint(input: &str, names: &BTreeSet<String>) -> Vec<(StyleTag, String)> {
    let mut words = input.split_whitespace();
    let (Some(word), None) = (words.next(), words.next()) else {
        return Vec::new();
    };
    if input.ends_with(char::is_whitespace) || !names.contains(word) {
        return Vec::new();
    }
    let Some(usage) = commands::usage_hint(word) else {
        return Vec::new();
    };

    let mut out = vec![(StyleTag::Text, " ".to_string())];
    for ch in usage.chars() {
        let tag = if "[:]|.()".contains(ch) {
            StyleTag::HintSymbol
        } else {
            StyleTag::HintParameter
        };
        match out.last_mut() {
            Some((last, text)) if *last == tag => text.push(ch),
            _ => out.push((tag, ch.to_string())),
        }
    }
    out
}

/// The input pane widget
pub struct InputPane<'a> {
    state: &'a InputState,
    theme: &'a Theme,
    prompts: &'a PromptConfig,
    names: &'a BTreeSet<String>,
    highlighter: &'a dyn Highlighter,
    focused: bool,
}

impl<'a> InputPane<'a> {
    pub fn new(
        state: &'a InputState,
        theme: &'a Theme,
        prompts: &'a PromptConfig,
        names: &'a BTreeSet<String>,
        highlighter: &'a dyn Highlighter,
    ) -> Self {
        Self {
            state,
            theme,
            prompts,
            names,
            highlighter,
            focused: true,
        }
    }

    /// Set whether the pane is focused
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    fn spans(&self, fragments: Vec<(StyleTag, String)>) -> Vec<Span<'static>> {
        fragments
            .into_iter()
            .map(|(tag, text)| Span::styled(text, self.theme.style(tag)))
            .collect()
    }

    /// Prompt for the first input line
    pub fn prompt(&self) -> &'a str {
        let first = self.state.input.split_whitespace().next().unwrap_or("");
        if is_command_prefix(first, self.names) {
            &self.prompts.command
        } else {
            &self.prompts.expression
        }
    }

    /// Transcript echo: a command badge, or highlighted expression
    fn echo(&self, input_line: &str) -> Vec<Span<'static>> {
        let trimmed = input_line.trim_start();
        let first = trimmed.split_whitespace().next().unwrap_or("");
        if !first.is_empty() && self.names.contains(first) {
            let rest = &trimmed[first.len()..];
            self.spans(vec![
                (StyleTag::PdbCommand, first.to_string()),
                (StyleTag::Text, rest.to_string()),
            ])
        } else {
            self.spans(self.highlighter.tokenize(input_line))
        }
    }

    /// Live input: commands stay plain while editing
    fn editing(&self, text: &str, is_command: bool) -> Vec<Span<'static>> {
        if is_command {
            vec![Span::styled(text.to_string(), self.theme.style(StyleTag::Text))]
        } else {
            self.spans(self.highlighter.tokenize(text))
        }
    }

    /// Build the display lines
    fn build_lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        let prompt_style = self.theme.style(StyleTag::Prompt);

        for entry in &self.state.history {
            if let Some(input) = &entry.input {
                for (i, input_line) in input.split('\n').enumerate() {
                    let prompt = if i == 0 {
                        &self.prompts.command
                    } else {
                        &self.prompts.continuation
                    };
                    let mut spans = vec![Span::styled(prompt.clone(), prompt_style)];
                    spans.extend(self.echo(input_line));
                    lines.push(Line::from(spans));
                }
            }
            for line in &entry.output {
                lines.push(line.to_line(self.theme));
            }
        }

        let first = self.state.input.split_whitespace().next().unwrap_or("");
        let is_command = !first.is_empty() && self.names.contains(first);
        let input_lines: Vec<&str> = self.state.input.split('\n').collect();

        // Which line holds the cursor, and the byte column within it
        let (cursor_line, cursor_col) = {
            let mut pos = 0;
            let mut found = (input_lines.len() - 1, 0);
            for (i, line_text) in input_lines.iter().enumerate() {
                let line_end = pos + line_text.len();
                if self.state.cursor <= line_end {
                    found = (i, self.state.cursor - pos);
                    break;
                }
                pos = line_end + 1;
            }
            found
        };

        for (i, line_text) in input_lines.iter().enumerate() {
            let prompt = if i == 0 {
                self.prompt()
            } else {
                self.prompts.continuation.as_str()
            };
            let mut spans = vec![Span::styled(prompt.to_string(), prompt_style)];

            if self.focused && i == cursor_line {
                let col = cursor_col.min(line_text.len());
                let (before, after) = line_text.split_at(col);
                if !before.is_empty() {
                    spans.extend(self.editing(before, is_command));
                }

                let cursor_len = after.chars().next().map_or(0, |c| c.len_utf8());
                let cursor_char = if after.is_empty() { " " } else { &after[..cursor_len] };
                spans.push(Span::styled(
                    cursor_char.to_string(),
                    Style::default().bg(Color::White).fg(Color::Black),
                ));
                if after.len() > cursor_len {
                    spans.extend(self.editing(&after[cursor_len..], is_command));
                }
            } else {
                spans.extend(self.editing(line_text, is_command));
            }

            if i == input_lines.len() - 1 {
                spans.extend(self.spans(completion_hint(&self.state.input, self.names)));
            }
            lines.push(Line::from(spans));
        }

        lines
    }
}

impl Widget for &InputPane<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = self.build_lines();

        // Each line may wrap to multiple display lines
        let width = area.width.max(1) as usize;
        let wrapped_height: u16 = lines
            .iter()
            .map(|line| {
                let line_width: usize = line.spans.iter().map(|s| s.content.chars().count()).sum();
                line_width.max(1).div_ceil(width) as u16
            })
            .sum();

        let scroll = wrapped_height.saturating_sub(area.height);
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0))
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::highlight::KeywordHighlighter;

    fn names() -> BTreeSet<String> {
        commands::builtin_names()
    }

    #[test]
    fn test_history_entry() {
        let entry = HistoryEntry::new("p x").with_output("42\n43");
        assert_eq!(entry.input.as_deref(), Some("p x"));
        assert_eq!(entry.output.len(), 2);
        assert!(!entry.is_error);

        let error = HistoryEntry::new("ignore abc").with_error("Invalid command");
        assert!(error.is_error);
        assert_eq!(error.output[0].fragments()[0].0, StyleTag::Error);
    }

    #[test]
    fn test_input_editing_utf8() {
        let mut state = InputState::new();
        state.insert_char('p');
        state.insert_char(' ');
        state.insert_char('é');
        assert_eq!(state.input, "p é");
        assert_eq!(state.cursor, 4);

        state.backspace();
        assert_eq!(state.input, "p ");
        state.cursor_left();
        state.insert_char('x');
        assert_eq!(state.input, "px ");
        state.cursor_home();
        state.delete();
        assert_eq!(state.input, "x ");
        state.cursor_end();
        assert_eq!(state.cursor, 2);
    }

    #[test]
    fn test_kill_word_and_line() {
        let mut state = InputState::new();
        state.insert_str("break main.py:12");
        state.kill_word();
        assert_eq!(state.input, "break ");
        state.kill_to_start();
        assert_eq!(state.input, "");
    }

    #[test]
    fn test_apply_completion() {
        let mut state = InputState::new();
        state.insert_str("p se");
        state.apply_completion(&Completion::new("self", 2));
        assert_eq!(state.input, "p self");
        assert_eq!(state.cursor, 6);
    }

    #[test]
    fn test_history_recall_skips_output_entries() {
        let mut state = InputState::new();
        state.add_entry(HistoryEntry::new("next"));
        state.add_entry(HistoryEntry::output(vec![StyledLine::plain("output")]));
        state.add_entry(HistoryEntry::new("p x"));
        state.insert_str("wh");

        state.history_up();
        assert_eq!(state.input, "p x");
        state.history_up();
        assert_eq!(state.input, "next");
        state.history_up();
        assert_eq!(state.input, "next");
        state.history_down();
        state.history_down();
        assert_eq!(state.input, "wh");
    }

    #[test]
    fn test_prompt_follows_first_word() {
        let theme = Theme::default();
        let prompts = PromptConfig::default();
        let names = names();
        let highlighter = KeywordHighlighter::new();
        let mut state = InputState::new();

        state.insert_str("ne");
        let pane = InputPane::new(&state, &theme, &prompts, &names, &highlighter);
        assert_eq!(pane.prompt(), "(pdb) ");

        state.clear_input();
        state.insert_str("xyz + 1");
        let pane = InputPane::new(&state, &theme, &prompts, &names, &highlighter);
        assert_eq!(pane.prompt(), "  >>> ");

        state.clear_input();
        let pane = InputPane::new(&state, &theme, &prompts, &names, &highlighter);
        assert_eq!(pane.prompt(), "(pdb) ");
    }

    #[test]
    fn test_completion_hint() {
        let names = names();
        let hint = completion_hint("enable", &names);
        let text: String = hint.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(text, " bpnumber [bpnumber ...]");
        assert_eq!(hint[1], (StyleTag::HintParameter, "bpnumber ".to_string()));
        assert_eq!(hint[2], (StyleTag::HintSymbol, "[".to_string()));

        assert!(completion_hint("enable ", &names).is_empty());
        assert!(completion_hint("enable 1", &names).is_empty());
        assert!(completion_hint("next", &names).is_empty());
        assert!(completion_hint("bogus", &names).is_empty());
    }

    #[test]
    fn test_input_pane_render() {
        let theme = Theme::default();
        let prompts = PromptConfig::default();
        let names = names();
        let highlighter = KeywordHighlighter::new();
        let mut state = InputState::new();
        state.add_entry(HistoryEntry::new("p x").with_output("42"));
        state.insert_str("where");

        let pane = InputPane::new(&state, &theme, &prompts, &names, &highlighter);
        let area = Rect::new(0, 0, 40, 5);
        let mut buf = Buffer::empty(area);
        (&pane).render(area, &mut buf);

        let row = |y: u16| -> String { (0..40).map(|x| buf[(x, y)].symbol().to_string()).collect() };
        assert!(row(0).starts_with("(pdb) p x"));
        assert!(row(1).starts_with("42"));
        assert!(row(2).starts_with("(pdb) where"));
    }
}
