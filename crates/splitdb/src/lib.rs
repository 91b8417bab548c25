//! Split-pane terminal front-end for a line-oriented debugger shell
//!
//! Provides:
//! - A source pane with a breakpoint margin and a call-stack pane
//! - An input line with grammar-aware completion and validation
//! - Shortcut expansion and pane navigation that synthesizes commands
//!
//! The debugger itself sits behind [`engine::DebugEngine`].

pub mod app;
pub mod commands;
pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod focus;
pub mod grammar;
pub mod keys;
pub mod source;
pub mod stack;
pub mod theme;
pub mod ui;

pub use app::Frontend;
pub use config::FrontendConfig;
pub use engine::{Breakpoint, DebugEngine, Frame, SubmitOutcome};
pub use error::FrontendError;
pub use focus::Focus;

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::Backend, backend::CrosstermBackend};
use std::io::stdout;
use tracing::{debug, info};

/// Where a prompt reads terminal events from.
///
/// `Ok(None)` means input is exhausted and the prompt answers `quit`.
pub trait EventSource {
    fn next_event(&mut self) -> Result<Option<Event>, FrontendError>;
}

/// Blocking reads from the real terminal
#[derive(Debug, Default)]
pub struct CrosstermEvents;

impl EventSource for CrosstermEvents {
    fn next_event(&mut self) -> Result<Option<Event>, FrontendError> {
        event::read()
            .map(Some)
            .map_err(|e| FrontendError::Terminal(format!("Failed to read event: {}", e)))
    }
}

/// Prompt, submit and print until the engine terminates.
///
/// `list` and `where` are answered by the front-end; everything else goes
/// to the engine.
pub fn run_session<B: Backend>(
    frontend: &mut Frontend,
    terminal: &mut Terminal<B>,
    engine: &mut dyn DebugEngine,
    events: &mut dyn EventSource,
) -> Result<Vec<String>, FrontendError> {
    let mut submitted = Vec::new();
    loop {
        let command = frontend.prompt(terminal, engine, events)?;
        let (name, arg) = match command.trim().split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command.trim(), ""),
        };

        if name == "list" {
            if let Err(e) = frontend.list(arg, engine) {
                frontend.error(&e.to_string());
            }
            continue;
        }
        if name == "where" {
            let current = engine.current_frame_index();
            for (i, frame) in engine.frame_stack().iter().enumerate() {
                frontend.print_stack_entry(frame, i == current);
            }
            continue;
        }

        debug!(command = %command, "submitting");
        submitted.push(command.clone());
        match engine.submit(&command) {
            SubmitOutcome::Suspended { output } => frontend.print_output(&output),
            SubmitOutcome::Terminated { output } => {
                frontend.print_output(&output);
                info!("engine terminated");
                return Ok(submitted);
            }
        }
    }
}

/// Run a full session on the real terminal
pub fn run(engine: &mut dyn DebugEngine, config: FrontendConfig) -> Result<(), String> {
    let mut frontend = Frontend::new(config).map_err(|e| e.to_string())?;

    // Setup terminal
    enable_raw_mode().map_err(|e| format!("Failed to enable raw mode: {}", e))?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)
        .map_err(|e| format!("Failed to enter alternate screen: {}", e))?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal =
        Terminal::new(backend).map_err(|e| format!("Failed to create terminal: {}", e))?;

    let result = run_session(&mut frontend, &mut terminal, engine, &mut CrosstermEvents);

    // Restore terminal
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    result
        .map(|_| ())
        .map_err(|e| format!("Application error: {}", e))
}
