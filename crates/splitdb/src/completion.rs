//! Completion and validation for the input line.
//!
//! Every call site goes through [`DynamicCompleter`] / [`DynamicValidator`],
//! which look up the currently active implementation on each call. The
//! active implementation is swapped at the start of every prompt, so a
//! grammar rebuilt for new aliases takes effect without touching the input
//! widget.

use crate::commands;
use crate::engine::DebugEngine;
use crate::error::FrontendError;
use crate::grammar::{ExpressionValidator, Grammar, SlotKind};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Input text and cursor (byte offset)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub cursor: usize,
}

impl Document {
    pub fn new(text: impl Into<String>, cursor: usize) -> Self {
        let text = text.into();
        let cursor = cursor.min(text.len());
        Self { text, cursor }
    }

    /// Document with the cursor at the end
    pub fn at_end(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.len();
        Self { text, cursor }
    }

    pub fn before_cursor(&self) -> &str {
        &self.text[..self.cursor]
    }
}

/// A single completion candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Replacement text
    pub text: String,
    /// Bytes before the cursor that `text` replaces
    pub replace_len: usize,
    /// Extra text shown next to the candidate
    pub display_meta: Option<String>,
}

impl Completion {
    pub fn new(text: impl Into<String>, replace_len: usize) -> Self {
        Self {
            text: text.into(),
            replace_len,
            display_meta: None,
        }
    }

    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        self.display_meta = Some(meta.into());
        self
    }
}

pub trait Completer {
    fn completions(&self, document: &Document) -> Vec<Completion>;
}

pub trait Validator {
    fn validate(&self, document: &Document) -> Result<(), FrontendError>;
}

type CompleterThunk = Box<dyn Fn() -> Option<Rc<dyn Completer>>>;
type ValidatorThunk = Box<dyn Fn() -> Option<Rc<dyn Validator>>>;

/// Forwards to whatever completer the thunk returns at call time
pub struct DynamicCompleter {
    current: CompleterThunk,
}

impl DynamicCompleter {
    pub fn new(current: impl Fn() -> Option<Rc<dyn Completer>> + 'static) -> Self {
        Self {
            current: Box::new(current),
        }
    }
}

impl Completer for DynamicCompleter {
    fn completions(&self, document: &Document) -> Vec<Completion> {
        match (self.current)() {
            Some(completer) => completer.completions(document),
            None => Vec::new(),
        }
    }
}

/// Forwards to whatever validator the thunk returns at call time
pub struct DynamicValidator {
    current: ValidatorThunk,
}

impl DynamicValidator {
    pub fn new(current: impl Fn() -> Option<Rc<dyn Validator>> + 'static) -> Self {
        Self {
            current: Box::new(current),
        }
    }
}

impl Validator for DynamicValidator {
    fn validate(&self, document: &Document) -> Result<(), FrontendError> {
        match (self.current)() {
            Some(validator) => validator.validate(document),
            None => Ok(()),
        }
    }
}

/// Completes the contents of one grammar slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotCompleter {
    /// Command names with their help text
    Commands(Vec<(String, String)>),
    /// Breakpoint numbers with their `file:line`
    Breakpoints(Vec<(u32, String)>),
    /// Alias names with their replacement text
    Aliases(Vec<(String, String)>),
    /// Names visible in the current frame
    Expression(Vec<String>),
    /// Paths relative to `root`
    Files { root: PathBuf },
    /// Function definitions found in `file`
    Functions { file: PathBuf },
}

impl SlotCompleter {
    /// Build the completer for `kind` from the engine's current state
    pub fn for_kind(kind: SlotKind, engine: &dyn DebugEngine, root: &Path) -> Self {
        let breakpoints = |keep: fn(bool) -> bool| {
            SlotCompleter::Breakpoints(
                engine
                    .breakpoints()
                    .into_iter()
                    .filter(|b| keep(b.enabled))
                    .map(|b| (b.number, b.location()))
                    .collect(),
            )
        };

        match kind {
            SlotKind::CommandName => {
                let aliases = engine.aliases();
                SlotCompleter::Commands(
                    engine
                        .known_command_names()
                        .into_iter()
                        .map(|name| {
                            let meta = match aliases.get(&name) {
                                Some(body) => format!("Alias for: {}", body),
                                None => commands::lookup(&name)
                                    .map(|c| c.help.to_string())
                                    .unwrap_or_default(),
                            };
                            (name, meta)
                        })
                        .collect(),
                )
            }
            SlotKind::EnabledBreakpoint => breakpoints(|enabled| enabled),
            SlotKind::DisabledBreakpoint => breakpoints(|enabled| !enabled),
            SlotKind::AnyBreakpoint => breakpoints(|_| true),
            SlotKind::AliasName => SlotCompleter::Aliases(engine.aliases().into_iter().collect()),
            SlotKind::EmbeddedExpression => SlotCompleter::Expression(engine.visible_names()),
            SlotKind::FilePath => SlotCompleter::Files {
                root: root.to_path_buf(),
            },
            SlotKind::FunctionName => SlotCompleter::Functions {
                file: engine.current_frame().file,
            },
        }
    }

    /// Candidates for the slot text typed so far
    pub fn complete(&self, text: &str) -> Vec<Completion> {
        match self {
            SlotCompleter::Commands(names) => {
                let lower = text.to_lowercase();
                names
                    .iter()
                    .filter(|(name, _)| name.to_lowercase().starts_with(&lower) && name != text)
                    .map(|(name, meta)| Completion::new(name, text.len()).with_meta(meta))
                    .collect()
            }
            SlotCompleter::Breakpoints(numbers) => numbers
                .iter()
                .map(|(n, meta)| (n.to_string(), meta))
                .filter(|(n, _)| n.starts_with(text))
                .map(|(n, meta)| Completion::new(n, text.len()).with_meta(meta))
                .collect(),
            SlotCompleter::Aliases(aliases) => aliases
                .iter()
                .filter(|(name, _)| name.starts_with(text))
                .map(|(name, body)| Completion::new(name, text.len()).with_meta(body))
                .collect(),
            SlotCompleter::Expression(names) => {
                let word = trailing_identifier(text);
                let before = &text[..text.len() - word.len()];
                if word.is_empty() || before.ends_with('.') {
                    return Vec::new();
                }
                let mut out: Vec<Completion> = names
                    .iter()
                    .filter(|n| n.starts_with(word) && n.as_str() != word)
                    .map(|n| Completion::new(n, word.len()))
                    .collect();
                out.dedup();
                out
            }
            SlotCompleter::Files { root } => complete_path(root, text),
            SlotCompleter::Functions { file } => complete_function(file, text),
        }
    }
}

fn trailing_identifier(text: &str) -> &str {
    let start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
        .last()
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    &text[start..]
}

fn complete_path(root: &Path, text: &str) -> Vec<Completion> {
    let (dir, prefix) = match text.rfind('/') {
        Some(i) => (&text[..=i], &text[i + 1..]),
        None => ("", text),
    };
    let Ok(entries) = fs::read_dir(root.join(dir)) else {
        return Vec::new();
    };

    let mut out: Vec<Completion> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(prefix) || (name.starts_with('.') && !prefix.starts_with('.')) {
                return None;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let shown = if is_dir { format!("{}/", name) } else { name };
            Some(Completion::new(shown, prefix.len()))
        })
        .collect();
    out.sort_by(|a, b| a.text.cmp(&b.text));
    out
}

fn complete_function(file: &Path, text: &str) -> Vec<Completion> {
    let Ok(source) = fs::read_to_string(file) else {
        return Vec::new();
    };
    let Ok(definition) =
        Regex::new(r"^\s*(?:async\s+)?(?:pub\s+)?(?:def|fn|func|function)\s+([^\s(<]+)\s*[(<]")
    else {
        return Vec::new();
    };
    let basename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    source
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let name = definition.captures(line)?.get(1)?.as_str();
            name.starts_with(text).then(|| {
                Completion::new(name, text.len())
                    .with_meta(format!("{}:{} - {}", basename, i + 1, line.trim()))
            })
        })
        .collect()
}

/// Routes each active grammar slot to its slot completer
pub struct GrammarCompleter {
    grammar: Rc<Grammar>,
    slots: HashMap<SlotKind, SlotCompleter>,
}

impl GrammarCompleter {
    /// Snapshot the engine state every slot kind needs
    pub fn new(grammar: Rc<Grammar>, engine: &dyn DebugEngine, root: &Path) -> Self {
        let kinds = [
            SlotKind::CommandName,
            SlotKind::EnabledBreakpoint,
            SlotKind::DisabledBreakpoint,
            SlotKind::AnyBreakpoint,
            SlotKind::AliasName,
            SlotKind::EmbeddedExpression,
            SlotKind::FilePath,
            SlotKind::FunctionName,
        ];
        let slots = kinds
            .into_iter()
            .map(|kind| (kind, SlotCompleter::for_kind(kind, engine, root)))
            .collect();
        Self { grammar, slots }
    }
}

impl Completer for GrammarCompleter {
    fn completions(&self, document: &Document) -> Vec<Completion> {
        let mut out: Vec<Completion> = Vec::new();
        for active in self.grammar.active_slots(document.before_cursor()) {
            let Some(completer) = self.slots.get(&active.kind) else {
                continue;
            };
            for candidate in completer.complete(&active.text) {
                if !out.iter().any(|c| c.text == candidate.text) {
                    out.push(candidate);
                }
            }
        }
        out
    }
}

/// Grammar match plus embedded-expression check
pub struct GrammarValidator {
    grammar: Rc<Grammar>,
    expressions: Rc<dyn ExpressionValidator>,
}

impl GrammarValidator {
    pub fn new(grammar: Rc<Grammar>, expressions: Rc<dyn ExpressionValidator>) -> Self {
        Self {
            grammar,
            expressions,
        }
    }
}

impl Validator for GrammarValidator {
    fn validate(&self, document: &Document) -> Result<(), FrontendError> {
        self.grammar
            .validate(&document.text, self.expressions.as_ref())
    }
}

/// Popup state for tab completion
#[derive(Debug, Clone, Default)]
pub struct CompletionPopup {
    items: Vec<Completion>,
    index: usize,
    visible: bool,
}

impl CompletionPopup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn items(&self) -> &[Completion] {
        &self.items
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Show `items`; an empty list leaves the popup hidden
    pub fn show(&mut self, items: Vec<Completion>) -> bool {
        self.items = items;
        self.index = 0;
        self.visible = !self.items.is_empty();
        self.visible
    }

    /// Move up in completion list (wraps around).
    pub fn up(&mut self) {
        if !self.items.is_empty() {
            if self.index > 0 {
                self.index -= 1;
            } else {
                self.index = self.items.len() - 1;
            }
        }
    }

    /// Move down in completion list (wraps around).
    pub fn down(&mut self) {
        if !self.items.is_empty() {
            self.index = (self.index + 1) % self.items.len();
        }
    }

    /// Hide completion popup and clear items.
    pub fn hide(&mut self) {
        self.visible = false;
        self.items.clear();
        self.index = 0;
    }

    /// Take the selected completion and hide the popup
    pub fn accept(&mut self) -> Option<Completion> {
        let item = self.items.get(self.index).cloned();
        self.hide();
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::ScriptedEngine;
    use crate::grammar::{BalancedDelimiters, GrammarCache};
    use std::cell::RefCell;
    use std::io::Write;

    struct Fixed(Vec<&'static str>);

    impl Completer for Fixed {
        fn completions(&self, _document: &Document) -> Vec<Completion> {
            self.0.iter().map(|s| Completion::new(*s, 0)).collect()
        }
    }

    struct Reject;

    impl Validator for Reject {
        fn validate(&self, document: &Document) -> Result<(), FrontendError> {
            Err(FrontendError::GrammarMismatch {
                input: document.text.clone(),
            })
        }
    }

    fn texts(items: &[Completion]) -> Vec<&str> {
        items.iter().map(|c| c.text.as_str()).collect()
    }

    fn setup() -> Result<(tempfile::TempDir, ScriptedEngine), String> {
        let dir = tempfile::tempdir().map_err(|e| e.to_string())?;
        let path = dir.path().join("prog.py");
        let mut file = fs::File::create(&path).map_err(|e| e.to_string())?;
        writeln!(file, "def main(argv):").map_err(|e| e.to_string())?;
        writeln!(file, "    return helper(argv)").map_err(|e| e.to_string())?;
        writeln!(file, "def helper(x):").map_err(|e| e.to_string())?;
        writeln!(file, "    return x").map_err(|e| e.to_string())?;
        let engine = ScriptedEngine::new(&path, 1)?.with_values([("self", "<obj>"), ("second", "2")]);
        Ok((dir, engine))
    }

    #[test]
    fn test_dynamic_completer_follows_active() {
        let active: Rc<RefCell<Option<Rc<dyn Completer>>>> = Rc::new(RefCell::new(None));
        let handle = Rc::clone(&active);
        let proxy = DynamicCompleter::new(move || handle.borrow().clone());

        let doc = Document::at_end("x");
        assert!(proxy.completions(&doc).is_empty());

        *active.borrow_mut() = Some(Rc::new(Fixed(vec!["a", "b"])));
        assert_eq!(texts(&proxy.completions(&doc)), vec!["a", "b"]);

        *active.borrow_mut() = Some(Rc::new(Fixed(vec!["c"])));
        assert_eq!(texts(&proxy.completions(&doc)), vec!["c"]);
    }

    #[test]
    fn test_dynamic_validator_without_active_accepts() {
        let active: Rc<RefCell<Option<Rc<dyn Validator>>>> = Rc::new(RefCell::new(None));
        let handle = Rc::clone(&active);
        let proxy = DynamicValidator::new(move || handle.borrow().clone());

        let doc = Document::at_end("anything at all");
        assert!(proxy.validate(&doc).is_ok());

        *active.borrow_mut() = Some(Rc::new(Reject));
        assert!(proxy.validate(&doc).is_err());
    }

    #[test]
    fn test_enable_completes_disabled_breakpoints_only() -> Result<(), String> {
        let (_dir, mut engine) = setup()?;
        let file = engine.file().to_path_buf();
        engine.set_breakpoint(&file, 1)?;
        engine.set_breakpoint(&file, 3)?;
        engine.submit("disable 2");

        let mut cache = GrammarCache::new();
        let grammar = cache
            .get(&engine.known_command_names())
            .map_err(|e| e.to_string())?;
        let completer = GrammarCompleter::new(grammar, &engine, Path::new("."));

        let items = completer.completions(&Document::at_end("enable "));
        assert_eq!(texts(&items), vec!["2"]);
        assert_eq!(items[0].display_meta, Some(format!("{}:3", file.display())));

        let items = completer.completions(&Document::at_end("disable "));
        assert_eq!(texts(&items), vec!["1"]);
        Ok(())
    }

    #[test]
    fn test_command_names_with_meta() -> Result<(), String> {
        let (_dir, mut engine) = setup()?;
        engine.submit("alias nn next");
        let mut cache = GrammarCache::new();
        let grammar = cache
            .get(&engine.known_command_names())
            .map_err(|e| e.to_string())?;
        let completer = GrammarCompleter::new(grammar, &engine, Path::new("."));

        let items = completer.completions(&Document::at_end("N"));
        assert!(texts(&items).contains(&"next"));
        let alias = items
            .iter()
            .find(|c| c.text == "nn")
            .ok_or("alias missing")?;
        assert_eq!(alias.display_meta.as_deref(), Some("Alias for: next"));
        assert_eq!(alias.replace_len, 1);
        Ok(())
    }

    #[test]
    fn test_expression_completes_visible_names() -> Result<(), String> {
        let (_dir, engine) = setup()?;
        let mut cache = GrammarCache::new();
        let grammar = cache
            .get(&engine.known_command_names())
            .map_err(|e| e.to_string())?;
        let completer = GrammarCompleter::new(grammar, &engine, Path::new("."));

        let items = completer.completions(&Document::at_end("p 1 + se"));
        assert_eq!(texts(&items), vec!["second", "self"]);
        assert_eq!(items[0].replace_len, 2);
        assert!(completer.completions(&Document::at_end("p x.se")).is_empty());
        Ok(())
    }

    #[test]
    fn test_break_completes_functions_and_files() -> Result<(), String> {
        let (dir, engine) = setup()?;
        let mut cache = GrammarCache::new();
        let grammar = cache
            .get(&engine.known_command_names())
            .map_err(|e| e.to_string())?;
        let completer = GrammarCompleter::new(grammar, &engine, dir.path());

        let items = completer.completions(&Document::at_end("break he"));
        assert_eq!(texts(&items), vec!["helper"]);
        assert_eq!(
            items[0].display_meta.as_deref(),
            Some("prog.py:3 - def helper(x):")
        );

        let items = completer.completions(&Document::at_end("b pr"));
        assert_eq!(texts(&items), vec!["prog.py"]);
        Ok(())
    }

    #[test]
    fn test_empty_input_gets_no_completions() -> Result<(), String> {
        let (_dir, engine) = setup()?;
        let mut cache = GrammarCache::new();
        let grammar = cache
            .get(&engine.known_command_names())
            .map_err(|e| e.to_string())?;
        let completer = GrammarCompleter::new(Rc::clone(&grammar), &engine, Path::new("."));
        assert!(completer.completions(&Document::at_end("  ")).is_empty());

        let validator = GrammarValidator::new(grammar, Rc::new(BalancedDelimiters));
        assert!(validator.validate(&Document::at_end("  ")).is_ok());
        assert!(validator.validate(&Document::at_end("ignore abc")).is_ok());
        assert!(validator.validate(&Document::at_end("p (x")).is_err());
        Ok(())
    }

    #[test]
    fn test_popup_navigation() {
        let mut popup = CompletionPopup::new();
        assert!(!popup.show(Vec::new()));
        assert!(popup.show(vec![
            Completion::new("dup", 0),
            Completion::new("drop", 0),
            Completion::new("swap", 0),
        ]));

        popup.down();
        assert_eq!(popup.index(), 1);
        popup.down();
        popup.down();
        assert_eq!(popup.index(), 0);
        popup.up();
        assert_eq!(popup.index(), 2);

        let picked = popup.accept();
        assert_eq!(picked.map(|c| c.text), Some("swap".to_string()));
        assert!(!popup.is_visible());
        assert!(popup.items().is_empty());
    }
}
