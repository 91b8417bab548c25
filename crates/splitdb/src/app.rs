//! The front-end application.
//!
//! [`Frontend`] owns everything that lives across prompts: grammar cache,
//! source caches, focus, transcript and completion state. The engine is
//! lent to it for each call and never stored.

use crate::EventSource;
use crate::commands::ShortcutTable;
use crate::completion::{
    Completer, CompletionPopup, DynamicCompleter, DynamicValidator, GrammarCompleter,
    GrammarValidator, Validator,
};
use crate::config::FrontendConfig;
use crate::engine::{Breakpoint, DebugEngine, Frame as StackFrame};
use crate::error::FrontendError;
use crate::focus::{Focus, NavOutcome, Navigator};
use crate::grammar::cache::GrammarCache;
use crate::grammar::{BalancedDelimiters, ExpressionValidator};
use crate::keys::{Key, convert_key};
use crate::source::{Listing, SourceView, margin};
use crate::stack::{format_entry, render_stack};
use crate::theme::{StyleTag, StyledLine, Theme};
use crate::ui::highlight::{Highlighter, KeywordHighlighter};
use crate::ui::input_pane::{HistoryEntry, InputPane, InputState, is_command_prefix};
use crate::ui::layout::{ComputedLayout, StatusContent};
use crate::ui::toolbars;
use crossterm::event::Event;
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Rows shown in the completion popup
const POPUP_ROWS: usize = 8;

type BreakpointHook = Box<dyn FnMut(&Path, usize, bool)>;
type FocusHook = Box<dyn FnMut(Focus, Focus)>;

pub struct Frontend {
    config: FrontendConfig,
    theme: Theme,
    grammars: GrammarCache,
    active_completer: Rc<RefCell<Option<Rc<dyn Completer>>>>,
    active_validator: Rc<RefCell<Option<Rc<dyn Validator>>>>,
    completer: DynamicCompleter,
    validator: DynamicValidator,
    expressions: Rc<dyn ExpressionValidator>,
    shortcuts: ShortcutTable,
    source: SourceView,
    input_highlighter: Box<dyn Highlighter>,
    lister: crate::source::Lister,
    nav: Navigator,
    input: InputState,
    popup: CompletionPopup,
    /// Command names of the active grammar
    names: BTreeSet<String>,
    status: Option<(String, bool)>,
    /// Base directory for file-path completion
    root: PathBuf,

    // Engine state captured at the start of the prompt
    file: PathBuf,
    current_line: usize,
    frames: Vec<StackFrame>,
    breaks: BTreeSet<usize>,
    /// Breakpoints on the line the source cursor is on
    cursor_breakpoints: Vec<Breakpoint>,
    last_stop: Option<(PathBuf, usize)>,
    source_top: usize,
    stack_top: usize,

    on_breakpoint_toggle: Option<BreakpointHook>,
    on_focus_change: Option<FocusHook>,
}

impl Frontend {
    pub fn new(config: FrontendConfig) -> Result<Self, FrontendError> {
        let theme = config.theme()?;

        let active_completer: Rc<RefCell<Option<Rc<dyn Completer>>>> =
            Rc::new(RefCell::new(None));
        let active_validator: Rc<RefCell<Option<Rc<dyn Validator>>>> =
            Rc::new(RefCell::new(None));
        let completer = {
            let active = Rc::clone(&active_completer);
            DynamicCompleter::new(move || active.borrow().clone())
        };
        let validator = {
            let active = Rc::clone(&active_validator);
            DynamicValidator::new(move || active.borrow().clone())
        };

        Ok(Self {
            config,
            theme,
            grammars: GrammarCache::new(),
            active_completer,
            active_validator,
            completer,
            validator,
            expressions: Rc::new(BalancedDelimiters),
            shortcuts: ShortcutTable::builtin(),
            source: SourceView::new(Box::new(KeywordHighlighter::new())),
            input_highlighter: Box::new(KeywordHighlighter::new()),
            lister: crate::source::Lister::new(),
            nav: Navigator::new(),
            input: InputState::new(),
            popup: CompletionPopup::new(),
            names: BTreeSet::new(),
            status: None,
            root: PathBuf::from("."),
            file: PathBuf::new(),
            current_line: 1,
            frames: Vec::new(),
            breaks: BTreeSet::new(),
            cursor_breakpoints: Vec::new(),
            last_stop: None,
            source_top: 0,
            stack_top: 0,
            on_breakpoint_toggle: None,
            on_focus_change: None,
        })
    }

    /// Checker for expressions embedded in commands
    pub fn with_expression_validator(mut self, validator: Rc<dyn ExpressionValidator>) -> Self {
        self.expressions = validator;
        self
    }

    /// Highlighter for both the source pane and expression input
    pub fn with_highlighter<H>(mut self, highlighter: H) -> Self
    where
        H: Highlighter + Clone + 'static,
    {
        self.source = SourceView::new(Box::new(highlighter.clone()));
        self.input_highlighter = Box::new(highlighter);
        self
    }

    /// Directory file paths are completed against
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Called after a breakpoint is toggled from the source pane
    pub fn on_breakpoint_toggle(&mut self, hook: impl FnMut(&Path, usize, bool) + 'static) {
        self.on_breakpoint_toggle = Some(Box::new(hook));
    }

    /// Called with `(old, new)` whenever focus moves
    pub fn on_focus_change(&mut self, hook: impl FnMut(Focus, Focus) + 'static) {
        self.on_focus_change = Some(Box::new(hook));
    }

    pub fn focus(&self) -> Focus {
        self.nav.focus()
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn popup(&self) -> &CompletionPopup {
        &self.popup
    }

    /// Current status-line message and whether it is an error
    pub fn status(&self) -> Option<(&str, bool)> {
        self.status.as_ref().map(|(msg, err)| (msg.as_str(), *err))
    }

    pub fn grammar_compiles(&self) -> usize {
        self.grammars.compiles()
    }

    /// Prepare panes, grammar and input for a new prompt
    pub fn begin_prompt(&mut self, engine: &dyn DebugEngine) -> Result<(), FrontendError> {
        self.input.paste_mode = false;
        self.input.clear_input();
        self.popup.hide();
        self.status = None;
        self.refresh(engine)?;

        let stop = (self.file.clone(), self.current_line);
        if self.last_stop.as_ref() != Some(&stop) {
            self.lister.reset();
            self.last_stop = Some(stop);
        }

        let source_len = self.source.line_count(&self.file);
        self.nav.begin_prompt(
            self.frames.len(),
            engine.current_frame_index(),
            self.current_line,
            source_len,
        );
        self.sync_cursor_breakpoints(engine);
        info!(
            file = %self.file.display(),
            line = self.current_line,
            frames = self.frames.len(),
            "prompt started"
        );
        Ok(())
    }

    /// Re-read engine state and activate the grammar for its command names
    fn refresh(&mut self, engine: &dyn DebugEngine) -> Result<(), FrontendError> {
        let current = engine.current_frame();
        self.file = engine.canonicalize(&current.file);
        self.current_line = current.line;
        self.frames = engine.frame_stack();
        self.breaks = engine.breakpoints_for(&self.file);
        self.names = engine.known_command_names();

        let grammar = self.grammars.get(&self.names)?;
        let completer: Rc<dyn Completer> =
            Rc::new(GrammarCompleter::new(Rc::clone(&grammar), engine, &self.root));
        let validator: Rc<dyn Validator> =
            Rc::new(GrammarValidator::new(grammar, Rc::clone(&self.expressions)));
        *self.active_completer.borrow_mut() = Some(completer);
        *self.active_validator.borrow_mut() = Some(validator);
        Ok(())
    }

    /// Handle one key. Returns the command text once input is accepted.
    pub fn handle_key(&mut self, key: Key, engine: &mut dyn DebugEngine) -> Option<String> {
        let command = self.dispatch_key(key, engine);
        self.sync_cursor_breakpoints(engine);
        command
    }

    /// The line the source pane's cursor row shows
    fn cursor_line(&self) -> usize {
        if self.nav.focus() == Focus::Source {
            self.nav.source_line()
        } else {
            self.current_line
        }
    }

    fn sync_cursor_breakpoints(&mut self, engine: &dyn DebugEngine) {
        self.cursor_breakpoints = engine.breakpoints_at(&self.file, self.cursor_line());
    }

    fn dispatch_key(&mut self, key: Key, engine: &mut dyn DebugEngine) -> Option<String> {
        if key == Key::Ignored {
            return None;
        }
        self.status = None;

        if self.nav.exit_confirmation() || key == Key::Ctrl('x') || self.nav.focus() != Focus::Input
        {
            self.popup.hide();
            match self.nav.handle(key) {
                NavOutcome::Unhandled => {}
                outcome => return self.apply(outcome, engine),
            }
        }

        if self.popup.is_visible() {
            match key {
                Key::Esc => {
                    self.popup.hide();
                    return None;
                }
                Key::Up | Key::BackTab => {
                    self.popup.up();
                    return None;
                }
                Key::Down | Key::Tab => {
                    self.popup.down();
                    return None;
                }
                Key::Enter => {
                    if let Some(completion) = self.popup.accept() {
                        self.input.apply_completion(&completion);
                    }
                    return None;
                }
                // Any other key hides completions and continues
                _ => self.popup.hide(),
            }
        }

        match key {
            Key::Ctrl('c') => self.input.clear_input(),
            Key::Ctrl('d') if self.input.input.is_empty() => return Some("quit".to_string()),
            Key::Ctrl('d') | Key::Delete => self.input.delete(),
            Key::Tab => self.complete(),
            Key::F(6) => self.input.paste_mode = !self.input.paste_mode,
            Key::AltEnter => self.input.insert_char('\n'),
            Key::Enter if self.input.paste_mode => self.input.insert_char('\n'),
            Key::Enter => return self.accept(),
            Key::Char(c) => self.input.insert_char(c),
            Key::Backspace => self.input.backspace(),
            Key::Left | Key::Ctrl('b') => self.input.cursor_left(),
            Key::Right | Key::Ctrl('f') => self.input.cursor_right(),
            Key::Home | Key::Ctrl('a') => self.input.cursor_home(),
            Key::End | Key::Ctrl('e') => self.input.cursor_end(),
            Key::Ctrl('u') => self.input.kill_to_start(),
            Key::Ctrl('w') => self.input.kill_word(),
            Key::Up | Key::Ctrl('p') => self.input.history_up(),
            Key::Down | Key::Ctrl('n') => self.input.history_down(),
            _ => {}
        }
        None
    }

    /// Handle a terminal event
    pub fn handle_event(&mut self, event: Event, engine: &mut dyn DebugEngine) -> Option<String> {
        match event {
            Event::Key(key) => self.handle_key(convert_key(key), engine),
            Event::Paste(text) if self.nav.focus() == Focus::Input => {
                self.popup.hide();
                self.input.insert_str(&text);
                None
            }
            _ => None,
        }
    }

    fn apply(&mut self, outcome: NavOutcome, engine: &mut dyn DebugEngine) -> Option<String> {
        match outcome {
            NavOutcome::Unhandled | NavOutcome::Handled => None,
            NavOutcome::FocusChanged { from, to } => {
                if let Some(hook) = self.on_focus_change.as_mut() {
                    hook(from, to);
                }
                None
            }
            NavOutcome::ToggleBreakpoint(line) => {
                self.toggle_breakpoint(line, engine);
                None
            }
            // Already canonical, not rewritten
            NavOutcome::Submit(command) => {
                self.input.add_entry(HistoryEntry::new(command.clone()));
                info!(command = %command, "synthesized command");
                Some(command)
            }
        }
    }

    fn toggle_breakpoint(&mut self, line: usize, engine: &mut dyn DebugEngine) {
        let file = engine.canonicalize(&self.file);
        let was_set = engine.breakpoints_for(&file).contains(&line);
        let result = if was_set {
            engine.clear_breakpoint(&file, line)
        } else {
            engine.set_breakpoint(&file, line)
        };

        match result {
            Ok(()) => {
                info!(file = %file.display(), line, set = !was_set, "breakpoint toggled");
                if let Some(hook) = self.on_breakpoint_toggle.as_mut() {
                    hook(&file, line, !was_set);
                }
                if let Err(e) = self.refresh(engine) {
                    self.error(&e.to_string());
                }
            }
            Err(e) => {
                warn!(file = %file.display(), line, error = %e, "breakpoint toggle failed");
                self.reject(&FrontendError::Engine(e));
            }
        }
    }

    /// Show an error on the status line until the next key
    fn reject(&mut self, error: &FrontendError) {
        self.status = Some((error.to_string(), true));
    }

    fn complete(&mut self) {
        let items = self.completer.completions(&self.input.document());
        debug!(count = items.len(), "completions requested");
        if items.len() == 1 {
            self.input.apply_completion(&items[0]);
        } else if !self.popup.show(items) {
            self.status = Some(("No completions".to_string(), false));
        }
    }

    /// Validate, echo and rewrite the input line
    fn accept(&mut self) -> Option<String> {
        let raw = self.input.input.clone();
        if let Err(e) = self.validator.validate(&self.input.document()) {
            debug!(error = %e, "input rejected");
            self.reject(&e);
            return None;
        }

        self.input.add_entry(HistoryEntry::new(raw.clone()));
        self.input.clear_input();
        let command = self.shortcuts.rewrite(&raw);
        info!(command = %command.trim_end(), "input accepted");
        Some(command)
    }

    /// Run a full prompt: draw, read events, return the accepted command.
    ///
    /// An exhausted event source yields `quit`.
    pub fn prompt<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        engine: &mut dyn DebugEngine,
        events: &mut dyn EventSource,
    ) -> Result<String, FrontendError> {
        self.begin_prompt(engine)?;
        loop {
            terminal
                .draw(|frame| self.render(frame))
                .map_err(|e| FrontendError::Terminal(e.to_string()))?;

            let Some(event) = events.next_event()? else {
                debug!("event source exhausted");
                return Ok("quit".to_string());
            };
            if let Some(command) = self.handle_event(event, engine) {
                return Ok(command);
            }
        }
    }

    // Transcript output

    /// Engine output lines
    pub fn print_output(&mut self, output: &[String]) {
        if output.is_empty() {
            return;
        }
        let lines = output
            .iter()
            .map(|l| StyledLine::tagged(StyleTag::Output, l.clone()))
            .collect();
        self.input.add_entry(HistoryEntry::output(lines));
    }

    /// Error message in the error style
    pub fn error(&mut self, message: &str) {
        let lines = message
            .lines()
            .map(|l| StyledLine::tagged(StyleTag::Error, l))
            .collect();
        self.input.add_entry(HistoryEntry::output(lines));
    }

    pub fn print_stack_entry(&mut self, frame: &StackFrame, is_current: bool) {
        self.input
            .add_entry(HistoryEntry::output(vec![format_entry(frame, is_current, false)]));
    }

    /// Source lines with the breakpoint margin
    pub fn print_lines(&mut self, listing: &Listing, breaks: &BTreeSet<usize>, current: usize) {
        let mut out: Vec<StyledLine> = listing
            .lines
            .iter()
            .map(|(n, text)| {
                let mut line = margin(*n, breaks.contains(n), *n == current);
                for (tag, fragment) in self.input_highlighter.tokenize(text) {
                    line.push(tag, fragment);
                }
                line
            })
            .collect();
        if listing.eof {
            out.push(StyledLine::tagged(StyleTag::Comment, "[EOF]"));
        }
        self.input.add_entry(HistoryEntry::output(out));
    }

    /// The `list` command, run against the executing frame's file
    pub fn list(&mut self, arg: &str, engine: &dyn DebugEngine) -> Result<(), FrontendError> {
        let frame = engine.current_frame();
        let file = engine.canonicalize(&frame.file);
        let lines = self.source.lines(&file)?;
        let listing = self.lister.list(arg, &lines, frame.line)?;
        let breaks = engine.breakpoints_for(&file);
        self.print_lines(&listing, &breaks, frame.line);
        Ok(())
    }

    // Rendering

    /// Keep `cursor` (1-based) inside the window with the scroll offset
    fn scroll_source(&mut self, cursor: usize, height: usize) {
        if height == 0 {
            return;
        }
        let offset = (self.config.layout.scroll_offset as usize).min(height.saturating_sub(1) / 2);
        let row = cursor.saturating_sub(1);
        if row < self.source_top + offset {
            self.source_top = row.saturating_sub(offset);
        } else if row + offset >= self.source_top + height {
            self.source_top = row + offset + 1 - height;
        }
    }

    /// Render the application to a frame
    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let layout = ComputedLayout::compute(area, &self.config.layout.clone().normalized());
        self.nav.set_page(layout.source.height as usize);
        let focus = self.nav.focus();

        if self.nav.exit_confirmation() {
            self.render_exit_confirmation(frame, layout.panes());
        } else {
            self.render_source(frame, &layout);
            if layout.stack_visible() {
                self.render_stack(frame, &layout);
            }
        }

        let pane = InputPane::new(
            &self.input,
            &self.theme,
            &self.config.prompt,
            &self.names,
            self.input_highlighter.as_ref(),
        )
        .focused(focus == Focus::Input);
        frame.render_widget(&pane, layout.repl);

        let toolbar = toolbars::shortcuts_toolbar(focus).to_line(&self.theme);
        frame.render_widget(Paragraph::new(toolbar), layout.toolbar);

        self.render_status_bar(frame, layout.status);

        // Render completion popup (on top of everything)
        if self.popup.is_visible() && !self.popup.items().is_empty() {
            self.render_completions(frame, layout.repl);
        }
    }

    fn render_source(&mut self, frame: &mut Frame, layout: &ComputedLayout) {
        let height = layout.source.height as usize;
        let width = layout.source.width as usize;
        let focused = self.nav.focus() == Focus::Source;
        let cursor = self.cursor_line();
        self.scroll_source(cursor, height);

        let title = toolbars::source_title(&self.file, cursor, width);
        frame.render_widget(Paragraph::new(title.to_line(&self.theme)), layout.source_title);

        let window = self.source_top..self.source_top + height;
        let rendered = self
            .source
            .render(&self.file, window, &self.breaks, Some(self.current_line));
        let lines: Vec<Line> = rendered
            .iter()
            .enumerate()
            .map(|(row, line)| {
                let line = line.to_line(&self.theme);
                if focused && self.source_top + row + 1 == cursor {
                    line.patch_style(Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    line
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), layout.source);

        // Breakpoint info float for the cursor line
        if let Some(info) = toolbars::breakpoint_info(&self.cursor_breakpoints) {
            let info_width = (info.width() as u16).min(layout.source.width);
            let float = Rect {
                x: layout.source.right().saturating_sub(info_width),
                y: layout.source.y,
                width: info_width,
                height: 1.min(layout.source.height),
            };
            frame.render_widget(Clear, float);
            frame.render_widget(Paragraph::new(info.to_line(&self.theme)), float);
        }
    }

    fn render_stack(&mut self, frame: &mut Frame, layout: &ComputedLayout) {
        let focused = self.nav.focus() == Focus::Stack;
        let selected = self.nav.selected_frame();
        let height = layout.stack.height as usize;

        let separator: Vec<Line> = (0..layout.separator.height)
            .map(|_| Line::from(Span::styled("│", self.theme.style(StyleTag::Separator))))
            .collect();
        frame.render_widget(Paragraph::new(separator), layout.separator);

        let title = toolbars::stack_title(
            selected,
            self.frames.len(),
            focused,
            layout.stack_title.width as usize,
        );
        frame.render_widget(Paragraph::new(title.to_line(&self.theme)), layout.stack_title);

        if selected < self.stack_top {
            self.stack_top = selected;
        } else if height > 0 && selected >= self.stack_top + height {
            self.stack_top = selected + 1 - height;
        }

        let view = render_stack(&self.frames, selected, self.nav.current_frame(), focused);
        let lines: Vec<Line> = view
            .lines
            .iter()
            .skip(self.stack_top)
            .take(height)
            .map(|l| l.to_line(&self.theme))
            .collect();
        frame.render_widget(Paragraph::new(lines), layout.stack);

        if let Some((row, col)) = view.cursor
            && row >= self.stack_top
        {
            let x = layout.stack.x + (col as u16).min(layout.stack.width.saturating_sub(1));
            let y = layout.stack.y + (row - self.stack_top) as u16;
            frame.set_cursor_position((x, y));
        }
    }

    fn render_exit_confirmation(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(Clear, area);
        if area.height == 0 {
            return;
        }
        let row = Rect {
            y: area.y + area.height / 2,
            height: 1,
            ..area
        };
        let paragraph = Paragraph::new(toolbars::exit_confirmation().to_line(&self.theme))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, row);
    }

    /// Render the status bar
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mut status = StatusContent::new()
            .focus(format!("{:?}", self.nav.focus()))
            .paste_mode(self.input.paste_mode);
        let mut style = self.theme.style(StyleTag::ToolbarTitle);
        if let Some((message, is_error)) = &self.status {
            if *is_error {
                status = status.error(message);
                style = self.theme.style(StyleTag::Error);
            } else {
                status = status.message(message);
            }
        }

        let paragraph = Paragraph::new(Line::from(Span::styled(status.format(area.width), style)));
        frame.render_widget(paragraph, area);
    }

    /// Render the completion popup
    fn render_completions(&self, frame: &mut Frame, repl_area: Rect) {
        let items = self.popup.items();
        let selected_index = self.popup.index();

        let first = selected_index.saturating_sub(POPUP_ROWS - 1);
        let shown = &items[first..items.len().min(first + POPUP_ROWS)];

        let text_width = shown.iter().map(|c| c.text.chars().count()).max().unwrap_or(0);
        let meta_width = shown
            .iter()
            .map(|c| c.display_meta.as_ref().map_or(0, |m| m.chars().count() + 1))
            .max()
            .unwrap_or(0);

        // +2 for padding, +2 for border
        let popup_width = ((text_width + meta_width + 4) as u16).min(repl_area.width);
        let popup_height = ((shown.len() + 2) as u16).min(repl_area.height.max(3));

        // Position popup near the cursor
        let first_word = self.input.input.split_whitespace().next().unwrap_or("");
        let prompt_len = if is_command_prefix(first_word, &self.names) {
            self.config.prompt.command.chars().count()
        } else {
            self.config.prompt.expression.chars().count()
        };
        let before_cursor = &self.input.input[..self.input.cursor];
        let column = before_cursor.rsplit('\n').next().unwrap_or("").chars().count();
        let x = repl_area.x + (prompt_len + column) as u16;
        let x = x.min(repl_area.right().saturating_sub(popup_width));

        // Put it above the current line if possible
        let y = if repl_area.bottom() > popup_height + 1 {
            repl_area.bottom() - popup_height - 1
        } else {
            repl_area.y
        };

        let popup_area = Rect::new(x, y, popup_width, popup_height);

        // Clear the area first
        frame.render_widget(Clear, popup_area);

        let lines: Vec<Line> = shown
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let style = if first + i == selected_index {
                    self.theme.style(StyleTag::CompletionSelected)
                } else {
                    self.theme.style(StyleTag::CompletionMenu)
                };
                let mut spans = vec![Span::styled(
                    format!(" {:<width$} ", item.text, width = text_width),
                    style,
                )];
                if let Some(meta) = &item.display_meta {
                    spans.push(Span::styled(
                        format!("{} ", meta),
                        self.theme.style(StyleTag::CompletionMeta),
                    ));
                }
                Line::from(spans)
            })
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.style(StyleTag::Separator));

        let paragraph = Paragraph::new(lines).block(block);
        frame.render_widget(paragraph, popup_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::ScriptedEngine;
    use crate::grammar::AcceptAll;
    use ratatui::backend::TestBackend;
    use std::io::Write;

    const PROGRAM: &str = "import os\n\
def main():\n\
    count = 0\n\
    for name in os.listdir('.'):\n\
        count += 1\n\
    return count\n\
\n\
main()\n";

    fn setup() -> Result<(tempfile::NamedTempFile, ScriptedEngine, Frontend), String> {
        let mut file = tempfile::Builder::new()
            .suffix(".py")
            .tempfile()
            .map_err(|e| e.to_string())?;
        file.write_all(PROGRAM.as_bytes())
            .map_err(|e| e.to_string())?;
        let engine = ScriptedEngine::new(file.path(), 3)?;
        let mut frontend = Frontend::new(FrontendConfig::default()).map_err(|e| e.to_string())?;
        frontend.begin_prompt(&engine).map_err(|e| e.to_string())?;
        Ok((file, engine, frontend))
    }

    fn type_str(frontend: &mut Frontend, engine: &mut ScriptedEngine, text: &str) {
        for c in text.chars() {
            frontend.handle_key(Key::Char(c), engine);
        }
    }

    #[test]
    fn test_accept_rewrites_shortcut() -> Result<(), String> {
        let (_file, mut engine, mut frontend) = setup()?;
        type_str(&mut frontend, &mut engine, "n");
        let command = frontend.handle_key(Key::Enter, &mut engine);
        assert_eq!(command.as_deref(), Some("next "));
        assert!(frontend.input().input.is_empty());
        // The transcript keeps the literal keystrokes
        let last = frontend.input().history.last().and_then(|e| e.input.clone());
        assert_eq!(last.as_deref(), Some("n"));
        Ok(())
    }

    #[test]
    fn test_invalid_input_is_not_submitted() -> Result<(), String> {
        let (_file, mut engine, mut frontend) = setup()?;
        type_str(&mut frontend, &mut engine, "p (count");
        assert_eq!(frontend.handle_key(Key::Enter, &mut engine), None);
        assert_eq!(frontend.input().input, "p (count");
        let (message, is_error) = frontend.status().ok_or("no status")?;
        assert!(is_error);
        assert!(message.starts_with("Invalid expression"));

        // Next key clears the message
        frontend.handle_key(Key::End, &mut engine);
        assert!(frontend.status().is_none());
        Ok(())
    }

    #[test]
    fn test_ctrl_x_wins_over_popup() -> Result<(), String> {
        let (_file, mut engine, mut frontend) = setup()?;
        type_str(&mut frontend, &mut engine, "c");
        frontend.handle_key(Key::Tab, &mut engine);
        assert!(frontend.popup().is_visible());

        frontend.handle_key(Key::Ctrl('x'), &mut engine);
        assert_eq!(frontend.focus(), Focus::Source);
        assert!(!frontend.popup().is_visible());
        Ok(())
    }

    #[test]
    fn test_popup_cycles_and_accepts() -> Result<(), String> {
        let (_file, mut engine, mut frontend) = setup()?;
        type_str(&mut frontend, &mut engine, "co");
        frontend.handle_key(Key::Tab, &mut engine);
        let items: Vec<String> = frontend.popup().items().iter().map(|c| c.text.clone()).collect();
        assert!(items.contains(&"continue".to_string()));

        let target = items.iter().position(|t| t == "condition").ok_or("no condition")?;
        for _ in 0..target {
            frontend.handle_key(Key::Tab, &mut engine);
        }
        assert_eq!(frontend.handle_key(Key::Enter, &mut engine), None);
        assert_eq!(frontend.input().input, "condition");
        Ok(())
    }

    #[test]
    fn test_source_toggle_calls_engine_and_hook() -> Result<(), String> {
        let (_file, mut engine, mut frontend) = setup()?;
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        frontend.on_breakpoint_toggle(move |_, line, set| log.borrow_mut().push((line, set)));

        frontend.handle_key(Key::Ctrl('x'), &mut engine);
        frontend.handle_key(Key::Down, &mut engine);
        frontend.handle_key(Key::Char('b'), &mut engine);
        let file = engine.file().to_path_buf();
        assert!(engine.breakpoints_for(&file).contains(&4));

        frontend.handle_key(Key::Char(' '), &mut engine);
        assert!(engine.breakpoints_for(&file).is_empty());
        assert_eq!(*seen.borrow(), vec![(4, true), (4, false)]);
        Ok(())
    }

    #[test]
    fn test_toggle_error_shows_on_status_line() -> Result<(), String> {
        let (mut file, mut engine, mut frontend) = setup()?;
        // The engine only knows the first eight lines
        file.write_all(b"print('done')\n").map_err(|e| e.to_string())?;
        file.flush().map_err(|e| e.to_string())?;
        frontend.begin_prompt(&engine).map_err(|e| e.to_string())?;

        let toggles = Rc::new(RefCell::new(0));
        let count = Rc::clone(&toggles);
        frontend.on_breakpoint_toggle(move |_, _, _| *count.borrow_mut() += 1);
        let entries = frontend.input().history.len();

        frontend.handle_key(Key::Ctrl('x'), &mut engine);
        frontend.handle_key(Key::End, &mut engine);
        frontend.handle_key(Key::Char('b'), &mut engine);

        let (message, is_error) = frontend.status().ok_or("no status")?;
        assert!(is_error);
        assert_eq!(message, "*** Line 9 does not exist");
        assert_eq!(frontend.input().history.len(), entries);
        assert!(engine.breakpoints().is_empty());
        assert_eq!(*toggles.borrow(), 0);
        assert_eq!(frontend.focus(), Focus::Source);
        Ok(())
    }

    #[test]
    fn test_breakpoint_info_follows_source_cursor() -> Result<(), String> {
        let (_file, mut engine, mut frontend) = setup()?;
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).map_err(|e| e.to_string())?;
        let mut screen = |frontend: &mut Frontend| -> Result<String, String> {
            terminal
                .draw(|frame| frontend.render(frame))
                .map_err(|e| e.to_string())?;
            Ok(terminal
                .backend()
                .buffer()
                .content()
                .iter()
                .map(|c| c.symbol())
                .collect())
        };

        frontend.handle_key(Key::Ctrl('x'), &mut engine);
        frontend.handle_key(Key::Down, &mut engine);
        frontend.handle_key(Key::Char('b'), &mut engine);
        assert!(screen(&mut frontend)?.contains("BP 1"));

        frontend.handle_key(Key::Down, &mut engine);
        assert!(!screen(&mut frontend)?.contains("BP 1"));

        frontend.handle_key(Key::Up, &mut engine);
        assert!(screen(&mut frontend)?.contains("BP 1"));
        Ok(())
    }

    #[test]
    fn test_synthesized_commands_bypass_rewriter() -> Result<(), String> {
        let (_file, mut engine, mut frontend) = setup()?;
        let changes = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&changes);
        frontend.on_focus_change(move |from, to| log.borrow_mut().push((from, to)));

        frontend.handle_key(Key::Ctrl('x'), &mut engine);
        assert_eq!(frontend.handle_key(Key::Char('n'), &mut engine).as_deref(), Some("next"));
        assert_eq!(*changes.borrow(), vec![(Focus::Input, Focus::Source)]);
        Ok(())
    }

    #[test]
    fn test_ctrl_c_and_ctrl_d() -> Result<(), String> {
        let (_file, mut engine, mut frontend) = setup()?;
        type_str(&mut frontend, &mut engine, "p count");
        assert_eq!(frontend.handle_key(Key::Ctrl('c'), &mut engine), None);
        assert!(frontend.input().input.is_empty());
        assert_eq!(frontend.handle_key(Key::Ctrl('d'), &mut engine).as_deref(), Some("quit"));
        Ok(())
    }

    #[test]
    fn test_paste_mode_and_multiline() -> Result<(), String> {
        let (_file, mut engine, mut frontend) = setup()?;
        frontend.handle_key(Key::F(6), &mut engine);
        type_str(&mut frontend, &mut engine, "p 1");
        assert_eq!(frontend.handle_key(Key::Enter, &mut engine), None);
        type_str(&mut frontend, &mut engine, "+ 2");
        assert_eq!(frontend.input().input, "p 1\n+ 2");

        // A new prompt leaves paste mode
        frontend.begin_prompt(&engine).map_err(|e| e.to_string())?;
        assert!(!frontend.input().paste_mode);
        assert!(frontend.input().input.is_empty());
        Ok(())
    }

    #[test]
    fn test_list_prints_margin() -> Result<(), String> {
        let (_file, engine, mut frontend) = setup()?;
        frontend.list("", &engine).map_err(|e| e.to_string())?;
        let entry = frontend.input().history.last().ok_or("no output")?;
        assert_eq!(entry.output[0].text(), "     1 import os");
        assert_eq!(entry.output[2].text(), "->   3     count = 0");
        assert_eq!(entry.output.last().map(|l| l.text()).as_deref(), Some("[EOF]"));

        let err = frontend.list("x,y", &engine);
        assert!(matches!(err, Err(FrontendError::ArgumentParse { .. })));
        Ok(())
    }

    #[derive(Clone)]
    struct Upper;

    impl Highlighter for Upper {
        fn tokenize(&self, text: &str) -> Vec<(StyleTag, String)> {
            vec![(StyleTag::Text, text.to_uppercase())]
        }
    }

    #[test]
    fn test_builders_replace_collaborators() -> Result<(), String> {
        let (_file, mut engine, _) = setup()?;
        let dir = tempfile::tempdir().map_err(|e| e.to_string())?;
        std::fs::write(dir.path().join("helpers.py"), "").map_err(|e| e.to_string())?;

        let mut frontend = Frontend::new(FrontendConfig::default())
            .map_err(|e| e.to_string())?
            .with_root(dir.path())
            .with_highlighter(Upper)
            .with_expression_validator(Rc::new(AcceptAll));
        frontend.begin_prompt(&engine).map_err(|e| e.to_string())?;

        type_str(&mut frontend, &mut engine, "b hel");
        frontend.handle_key(Key::Tab, &mut engine);
        assert_eq!(frontend.input().input, "b helpers.py");

        frontend.handle_key(Key::Ctrl('c'), &mut engine);
        type_str(&mut frontend, &mut engine, "p (count");
        assert_eq!(
            frontend.handle_key(Key::Enter, &mut engine).as_deref(),
            Some("p (count")
        );

        frontend.list("1,1", &engine).map_err(|e| e.to_string())?;
        let entry = frontend.input().history.last().ok_or("no output")?;
        assert_eq!(entry.output[0].text(), "     1 IMPORT OS");
        Ok(())
    }

    #[test]
    fn test_render_panes() -> Result<(), String> {
        let (_file, _engine, mut frontend) = setup()?;
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).map_err(|e| e.to_string())?;
        terminal
            .draw(|frame| frontend.render(frame))
            .map_err(|e| e.to_string())?;

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("count = 0"));
        assert!(text.contains("Stack"));
        assert!(text.contains("(3)"));
        assert!(text.contains("(pdb)"));
        assert!(text.contains("[Ctrl-X]Focus source code"));
        Ok(())
    }
}
