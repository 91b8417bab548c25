//! A scripted, in-memory engine.
//!
//! Walks a real source file line by line and keeps breakpoints, aliases and
//! a fixed call stack in memory. It backs the demo binary and the
//! integration tests; it does not execute anything.

use super::{Breakpoint, DebugEngine, Frame, SubmitOutcome};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// In-memory engine over a single source file
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    file: PathBuf,
    line_count: usize,
    /// Outermost-first; the last frame is the one executing
    stack: Vec<Frame>,
    /// Frame the user moved to with up/down
    selected: usize,
    breakpoints: Vec<Breakpoint>,
    next_number: u32,
    aliases: BTreeMap<String, String>,
    values: BTreeMap<String, String>,
    last_command: String,
    /// Every command submitted, after alias expansion
    pub submitted: Vec<String>,
}

impl ScriptedEngine {
    /// Start suspended at `line` of `file`, inside a single `<module>` frame
    pub fn new(file: impl AsRef<Path>, line: usize) -> Result<Self, String> {
        let path = file.as_ref();
        let file = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let content = fs::read_to_string(&file)
            .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
        let line_count = content.lines().count();
        if line_count == 0 {
            return Err(format!("{} is empty", file.display()));
        }

        let frame = Frame::new(&file, line.clamp(1, line_count)).with_function("<module>");
        Ok(Self {
            file,
            line_count,
            stack: vec![frame],
            selected: 0,
            breakpoints: Vec::new(),
            next_number: 1,
            aliases: BTreeMap::new(),
            values: BTreeMap::new(),
            last_command: String::new(),
            submitted: Vec::new(),
        })
    }

    /// Replace the call stack (outermost-first); the innermost frame executes
    pub fn with_frames(mut self, frames: Vec<Frame>) -> Self {
        if !frames.is_empty() {
            self.stack = frames;
        }
        self.selected = self.stack.len() - 1;
        self
    }

    /// Name/value pairs visible to `p` and to expression completion
    pub fn with_values<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// The source file being walked
    pub fn file(&self) -> &Path {
        &self.file
    }

    fn innermost(&mut self) -> &mut Frame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn step_line(&mut self) -> SubmitOutcome {
        self.selected = self.stack.len() - 1;
        let next = self.innermost().line + 1;
        if next > self.line_count {
            return SubmitOutcome::Terminated {
                output: vec!["The program finished.".to_string()],
            };
        }
        self.innermost().line = next;
        SubmitOutcome::Suspended { output: Vec::new() }
    }

    fn run_to_breakpoint(&mut self) -> SubmitOutcome {
        self.selected = self.stack.len() - 1;
        let from = self.innermost().line;
        let file = self.file.clone();
        let hit = self
            .breakpoints
            .iter_mut()
            .filter(|b| b.enabled && b.file == file && b.line > from)
            .min_by_key(|b| b.line);

        match hit {
            Some(bp) => {
                bp.hit_count += 1;
                let (number, line) = (bp.number, bp.line);
                self.innermost().line = line;
                SubmitOutcome::Suspended {
                    output: vec![format!("Breakpoint {} at {}:{}", number, file.display(), line)],
                }
            }
            None => SubmitOutcome::Terminated {
                output: vec!["The program finished.".to_string()],
            },
        }
    }

    fn move_frame(&mut self, arg: &str, up: bool) -> Vec<String> {
        let count = if arg.is_empty() {
            1
        } else {
            match arg.parse::<usize>() {
                Ok(n) => n,
                Err(_) => return vec![format!("*** Invalid frame count ({})", arg)],
            }
        };
        if up {
            if self.selected == 0 {
                return vec!["*** Oldest frame".to_string()];
            }
            self.selected = self.selected.saturating_sub(count);
        } else {
            if self.selected + 1 >= self.stack.len() {
                return vec!["*** Newest frame".to_string()];
            }
            self.selected = (self.selected + count).min(self.stack.len() - 1);
        }
        let frame = &self.stack[self.selected];
        vec![format!(
            "> {}({}){}()",
            frame.file.display(),
            frame.line,
            frame.function_name.as_deref().unwrap_or("<lambda>")
        )]
    }

    fn parse_location(&self, arg: &str) -> Result<(PathBuf, usize), String> {
        let (file, line) = match arg.rsplit_once(':') {
            Some((file, line)) => (self.canonicalize(Path::new(file)), line),
            None => (self.file.clone(), arg),
        };
        let line = line
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("*** Bad lineno: {}", line.trim()))?;
        Ok((file, line))
    }

    fn numbered(&mut self, args: &str) -> Result<Vec<&mut Breakpoint>, String> {
        let mut numbers = Vec::new();
        for word in args.split_whitespace() {
            let n = word
                .parse::<u32>()
                .map_err(|_| format!("*** Non-numeric breakpoint number {}", word))?;
            numbers.push(n);
        }
        Ok(self
            .breakpoints
            .iter_mut()
            .filter(|b| numbers.contains(&b.number))
            .collect())
    }

    fn dispatch(&mut self, command: &str, args: &str) -> SubmitOutcome {
        let output = match command {
            "next" | "n" | "step" | "s" | "until" | "unt" => return self.step_line(),
            "continue" | "c" | "cont" => return self.run_to_breakpoint(),
            "quit" | "q" | "exit" => {
                return SubmitOutcome::Terminated {
                    output: Vec::new(),
                };
            }
            "up" | "u" => self.move_frame(args, true),
            "down" | "d" => self.move_frame(args, false),
            "break" | "b" | "tbreak" if args.is_empty() => self
                .breakpoints
                .iter()
                .map(|b| {
                    format!(
                        "{:<4}{:<5}{}",
                        b.number,
                        if b.enabled { "yes" } else { "no" },
                        b.location()
                    )
                })
                .collect(),
            "break" | "b" | "tbreak" => {
                let location = args.split(',').next().unwrap_or("").trim();
                match self.parse_location(location) {
                    Ok((file, line)) => match self.set_breakpoint(&file, line) {
                        Ok(()) => vec![format!(
                            "Breakpoint {} at {}:{}",
                            self.next_number - 1,
                            file.display(),
                            line
                        )],
                        Err(e) => vec![e],
                    },
                    Err(e) => vec![e],
                }
            }
            "clear" | "cl" => match self.numbered(args) {
                Ok(found) => {
                    let gone: Vec<u32> = found.iter().map(|b| b.number).collect();
                    self.breakpoints.retain(|b| !gone.contains(&b.number));
                    gone.iter()
                        .map(|n| format!("Deleted breakpoint {}", n))
                        .collect()
                }
                Err(e) => vec![e],
            },
            "enable" | "disable" => {
                let enabled = command == "enable";
                match self.numbered(args) {
                    Ok(found) => found
                        .into_iter()
                        .map(|b| {
                            b.enabled = enabled;
                            let verb = if enabled { "Enabled" } else { "Disabled" };
                            format!("{} breakpoint {}", verb, b.number)
                        })
                        .collect(),
                    Err(e) => vec![e],
                }
            }
            "condition" => {
                let (number, cond) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
                match self.numbered(number) {
                    Ok(mut found) => match found.first_mut() {
                        Some(bp) => {
                            bp.condition = (!cond.trim().is_empty()).then(|| cond.trim().to_string());
                            vec![format!("New condition set for breakpoint {}.", bp.number)]
                        }
                        None => vec![format!("*** No breakpoint numbered {}", number)],
                    },
                    Err(e) => vec![e],
                }
            }
            "alias" => match args.split_once(char::is_whitespace) {
                Some((name, body)) => {
                    self.aliases.insert(name.to_string(), body.trim().to_string());
                    Vec::new()
                }
                None if args.is_empty() => self
                    .aliases
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect(),
                None => match self.aliases.get(args) {
                    Some(body) => vec![format!("{} = {}", args, body)],
                    None => vec![format!("*** Unknown alias '{}'", args)],
                },
            },
            "unalias" => {
                self.aliases.remove(args);
                Vec::new()
            }
            "where" | "w" | "bt" => self
                .stack
                .iter()
                .enumerate()
                .map(|(i, f)| {
                    format!(
                        "{} {}({}){}()",
                        if i == self.selected { ">" } else { " " },
                        f.file.display(),
                        f.line,
                        f.function_name.as_deref().unwrap_or("<lambda>")
                    )
                })
                .collect(),
            "p" | "pp" | "print" => match self.values.get(args) {
                Some(v) => vec![v.clone()],
                None => vec![format!("*** NameError: name '{}' is not defined", args)],
            },
            _ => vec![format!("*** Unknown syntax: {} {}", command, args)],
        };
        SubmitOutcome::Suspended { output }
    }
}

impl DebugEngine for ScriptedEngine {
    fn current_frame(&self) -> Frame {
        self.stack[self.selected].clone()
    }

    fn frame_stack(&self) -> Vec<Frame> {
        self.stack.clone()
    }

    fn current_frame_index(&self) -> usize {
        self.selected
    }

    fn set_breakpoint(&mut self, file: &Path, line: usize) -> Result<(), String> {
        let file = self.canonicalize(file);
        if file == self.file && (line == 0 || line > self.line_count) {
            return Err(format!("*** Line {} does not exist", line));
        }
        self.breakpoints
            .push(Breakpoint::new(self.next_number, file, line));
        self.next_number += 1;
        Ok(())
    }

    fn clear_breakpoint(&mut self, file: &Path, line: usize) -> Result<(), String> {
        let file = self.canonicalize(file);
        let before = self.breakpoints.len();
        self.breakpoints
            .retain(|b| !(b.file == file && b.line == line));
        if self.breakpoints.len() == before {
            return Err(format!("*** There is no breakpoint at {}:{}", file.display(), line));
        }
        Ok(())
    }

    fn breakpoints_for(&self, file: &Path) -> BTreeSet<usize> {
        let file = self.canonicalize(file);
        self.breakpoints
            .iter()
            .filter(|b| b.file == file)
            .map(|b| b.line)
            .collect()
    }

    fn breakpoints_at(&self, file: &Path, line: usize) -> Vec<Breakpoint> {
        let file = self.canonicalize(file);
        self.breakpoints
            .iter()
            .filter(|b| b.file == file && b.line == line)
            .cloned()
            .collect()
    }

    fn breakpoints(&self) -> Vec<Breakpoint> {
        self.breakpoints.clone()
    }

    fn aliases(&self) -> BTreeMap<String, String> {
        self.aliases.clone()
    }

    fn visible_names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn submit(&mut self, command: &str) -> SubmitOutcome {
        let mut line = command.trim().to_string();
        if line.is_empty() {
            line = self.last_command.clone();
        }
        if line.is_empty() {
            return SubmitOutcome::Suspended { output: Vec::new() };
        }

        let (word, args) = line
            .split_once(char::is_whitespace)
            .map(|(w, a)| (w.to_string(), a.trim().to_string()))
            .unwrap_or_else(|| (line.clone(), String::new()));

        let (word, args) = match self.aliases.get(&word) {
            Some(body) => {
                let expanded = format!("{} {}", body, args);
                let expanded = expanded.trim();
                match expanded.split_once(char::is_whitespace) {
                    Some((w, a)) => (w.to_string(), a.trim().to_string()),
                    None => (expanded.to_string(), String::new()),
                }
            }
            None => (word, args),
        };

        debug!(command = %word, args = %args, "scripted engine dispatch");
        self.submitted.push(format!("{} {}", word, args).trim_end().to_string());
        self.last_command = line;
        self.dispatch(&word, &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn program(lines: usize) -> Result<tempfile::NamedTempFile, String> {
        let mut file = tempfile::NamedTempFile::new().map_err(|e| e.to_string())?;
        for i in 1..=lines {
            writeln!(file, "x{} = {}", i, i).map_err(|e| e.to_string())?;
        }
        Ok(file)
    }

    #[test]
    fn test_next_advances_and_terminates() -> Result<(), String> {
        let src = program(3)?;
        let mut engine = ScriptedEngine::new(src.path(), 2)?;
        assert_eq!(
            engine.submit("next "),
            SubmitOutcome::Suspended { output: vec![] }
        );
        assert_eq!(engine.current_frame().line, 3);
        assert!(matches!(
            engine.submit("next"),
            SubmitOutcome::Terminated { .. }
        ));
        Ok(())
    }

    #[test]
    fn test_empty_command_repeats_last() -> Result<(), String> {
        let src = program(5)?;
        let mut engine = ScriptedEngine::new(src.path(), 1)?;
        engine.submit("step ");
        engine.submit(" ");
        assert_eq!(engine.current_frame().line, 3);
        Ok(())
    }

    #[test]
    fn test_continue_stops_at_enabled_breakpoint() -> Result<(), String> {
        let src = program(10)?;
        let mut engine = ScriptedEngine::new(src.path(), 1)?;
        let file = engine.file().to_path_buf();
        engine.set_breakpoint(&file, 4)?;
        engine.set_breakpoint(&file, 7)?;
        engine.submit("disable 1");

        engine.submit("continue");
        assert_eq!(engine.current_frame().line, 7);
        assert_eq!(engine.breakpoints_at(&file, 7)[0].hit_count, 1);
        Ok(())
    }

    #[test]
    fn test_breakpoint_on_missing_line_is_an_error() -> Result<(), String> {
        let src = program(3)?;
        let mut engine = ScriptedEngine::new(src.path(), 1)?;
        let file = engine.file().to_path_buf();
        assert!(engine.set_breakpoint(&file, 9).is_err());
        assert!(engine.clear_breakpoint(&file, 2).is_err());
        Ok(())
    }

    #[test]
    fn test_up_down_moves_selected_frame() -> Result<(), String> {
        let src = program(10)?;
        let engine = ScriptedEngine::new(src.path(), 1)?;
        let file = engine.file().to_path_buf();
        let mut engine = engine.with_frames(vec![
            Frame::new(&file, 2).with_function("main"),
            Frame::new(&file, 5).with_function("helper"),
            Frame::new(&file, 8).with_function("leaf"),
        ]);
        assert_eq!(engine.current_frame_index(), 2);
        engine.submit("up 2");
        assert_eq!(engine.current_frame_index(), 0);
        assert_eq!(engine.current_frame().function_name.as_deref(), Some("main"));
        engine.submit("down 1");
        assert_eq!(engine.current_frame_index(), 1);
        Ok(())
    }

    #[test]
    fn test_alias_changes_known_names() -> Result<(), String> {
        let src = program(3)?;
        let mut engine = ScriptedEngine::new(src.path(), 1)?;
        assert!(!engine.known_command_names().contains("nn"));
        engine.submit("alias nn next");
        assert!(engine.known_command_names().contains("nn"));
        engine.submit("nn");
        assert_eq!(engine.current_frame().line, 2);
        engine.submit("unalias nn");
        assert!(!engine.known_command_names().contains("nn"));
        Ok(())
    }
}
