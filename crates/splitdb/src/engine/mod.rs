//! The debugger engine boundary.
//!
//! The front-end never steps, unwinds or stores breakpoints itself. It reads
//! frames and breakpoints through [`DebugEngine`] and hands accepted command
//! text back through [`DebugEngine::submit`].

pub mod memory;

use crate::commands;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A breakpoint as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub number: u32,
    pub file: PathBuf,
    pub line: usize,
    pub enabled: bool,
    pub condition: Option<String>,
    pub hit_count: u32,
}

impl Breakpoint {
    /// Create an enabled, unconditional breakpoint
    pub fn new(number: u32, file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            number,
            file: file.into(),
            line,
            enabled: true,
            condition: None,
            hit_count: 0,
        }
    }

    /// `file:line`, used as completion meta text
    pub fn location(&self) -> String {
        format!("{}:{}", self.file.display(), self.line)
    }
}

/// One entry of the call stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub file: PathBuf,
    pub line: usize,
    pub function_name: Option<String>,
    pub args_repr: Option<String>,
    pub return_repr: Option<String>,
}

impl Frame {
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
            function_name: None,
            args_repr: None,
            return_repr: None,
        }
    }

    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args_repr = Some(args.into());
        self
    }

    pub fn with_return(mut self, value: impl Into<String>) -> Self {
        self.return_repr = Some(value.into());
        self
    }
}

/// What the engine did with a submitted command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The engine is suspended again and wants the next command
    Suspended { output: Vec<String> },
    /// The debugged program ended or the user quit
    Terminated { output: Vec<String> },
}

/// Execution-control capability consumed by the front-end.
///
/// Frames are ordered outermost-first. The front-end only holds an engine
/// for the duration of a call; it never owns one.
pub trait DebugEngine {
    /// The frame that is actually executing
    fn current_frame(&self) -> Frame;

    /// Every frame of the suspended program, outermost-first
    fn frame_stack(&self) -> Vec<Frame>;

    /// Index of [`current_frame`](Self::current_frame) in
    /// [`frame_stack`](Self::frame_stack)
    fn current_frame_index(&self) -> usize {
        let current = self.current_frame();
        self.frame_stack()
            .iter()
            .rposition(|f| *f == current)
            .unwrap_or(0)
    }

    fn set_breakpoint(&mut self, file: &Path, line: usize) -> Result<(), String>;

    fn clear_breakpoint(&mut self, file: &Path, line: usize) -> Result<(), String>;

    /// Line numbers carrying at least one breakpoint in `file`
    fn breakpoints_for(&self, file: &Path) -> BTreeSet<usize>;

    fn breakpoints_at(&self, file: &Path, line: usize) -> Vec<Breakpoint>;

    /// Every breakpoint, used for breakpoint-number completion
    fn breakpoints(&self) -> Vec<Breakpoint>;

    fn canonicalize(&self, file: &Path) -> PathBuf {
        file.canonicalize().unwrap_or_else(|_| file.to_path_buf())
    }

    /// User-defined aliases, name to replacement text
    fn aliases(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Names visible in the current frame (locals, then globals)
    fn visible_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Built-ins, shortcuts and aliases. A change here recompiles the grammar.
    fn known_command_names(&self) -> BTreeSet<String> {
        let mut names = commands::builtin_names();
        names.extend(self.aliases().into_keys());
        names
    }

    fn submit(&mut self, command: &str) -> SubmitOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_builder() {
        let frame = Frame::new("src/app.py", 12)
            .with_function("handle")
            .with_args("(x=1)");
        assert_eq!(frame.line, 12);
        assert_eq!(frame.function_name.as_deref(), Some("handle"));
        assert_eq!(frame.args_repr.as_deref(), Some("(x=1)"));
        assert!(frame.return_repr.is_none());
    }

    #[test]
    fn test_breakpoint_location() {
        let bp = Breakpoint::new(3, "/tmp/prog.py", 40);
        assert!(bp.enabled);
        assert_eq!(bp.location(), "/tmp/prog.py:40");
    }
}
