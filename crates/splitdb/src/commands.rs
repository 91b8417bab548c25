//! Built-in debugger commands and the shortcut rewriter.
//!
//! The command table drives three things: the set of names the grammar is
//! compiled from, the help/usage text shown by completion, and the
//! single-letter shortcuts that are expanded when input is accepted.

use std::collections::{BTreeSet, HashMap};

/// A built-in debugger command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub shortcut: Option<&'static str>,
    pub help: &'static str,
    /// Argument synopsis shown as a completion hint
    pub usage: Option<&'static str>,
}

const fn cmd(
    name: &'static str,
    shortcut: Option<&'static str>,
    help: &'static str,
    usage: Option<&'static str>,
) -> CommandSpec {
    CommandSpec {
        name,
        shortcut,
        help,
        usage,
    }
}

/// The built-in command table
pub const COMMANDS: &[CommandSpec] = &[
    cmd(
        "alias",
        None,
        "Create an alias called name that executes command.",
        Some("[name [command [parameter parameter ...]]]"),
    ),
    cmd(
        "args",
        Some("a"),
        "Print the argument list of the current function.",
        None,
    ),
    cmd(
        "break",
        Some("b"),
        "Set a break at a line or function.",
        Some("([filename:]lineno | function) [, condition]"),
    ),
    cmd(
        "clear",
        Some("cl"),
        "Clear breakpoints by number or location.",
        Some("[filename:lineno | bpnumber [bpnumber ...]]"),
    ),
    cmd(
        "commands",
        None,
        "Attach commands to a breakpoint.",
        Some("[bpnumber]"),
    ),
    cmd(
        "condition",
        None,
        "Set a condition on a breakpoint.",
        Some("bpnumber [condition]"),
    ),
    cmd(
        "continue",
        Some("c"),
        "Continue execution, only stop at a breakpoint.",
        None,
    ),
    cmd(
        "disable",
        None,
        "Disable the given breakpoints.",
        Some("bpnumber [bpnumber ...]"),
    ),
    cmd(
        "display",
        None,
        "Display the value of an expression on every stop.",
        Some("[expression]"),
    ),
    cmd(
        "down",
        Some("d"),
        "Move the current frame count levels down (to a newer frame).",
        Some("[count]"),
    ),
    cmd(
        "enable",
        None,
        "Enable the given breakpoints.",
        Some("bpnumber [bpnumber ...]"),
    ),
    cmd(
        "help",
        Some("h"),
        "Print help about a command.",
        Some("[command]"),
    ),
    cmd(
        "ignore",
        None,
        "Set the ignore count for a breakpoint.",
        Some("bpnumber [count]"),
    ),
    cmd(
        "interact",
        None,
        "Start an interactive interpreter in the current scope.",
        None,
    ),
    cmd(
        "jump",
        Some("j"),
        "Set the next line that will be executed.",
        Some("lineno"),
    ),
    cmd(
        "list",
        Some("l"),
        "List source code for the current file.",
        Some("[first [,last] | .]"),
    ),
    cmd(
        "longlist",
        Some("ll"),
        "List the whole source code of the current function.",
        None,
    ),
    cmd(
        "next",
        Some("n"),
        "Continue until the next line in the current function is reached.",
        None,
    ),
    cmd(
        "p",
        None,
        "Print the value of an expression.",
        Some("expression"),
    ),
    cmd(
        "pp",
        None,
        "Pretty-print the value of an expression.",
        Some("expression"),
    ),
    cmd(
        "quit",
        Some("q"),
        "Quit the debugger.",
        None,
    ),
    cmd(
        "restart",
        None,
        "Restart the debugged program.",
        Some("[args ...]"),
    ),
    cmd(
        "retval",
        Some("rv"),
        "Print the return value of the last return of a function.",
        None,
    ),
    cmd(
        "return",
        Some("r"),
        "Continue until the current function returns.",
        None,
    ),
    cmd(
        "run",
        None,
        "Restart the debugged program.",
        Some("[args ...]"),
    ),
    cmd(
        "source",
        None,
        "Try to get source code for the given object.",
        Some("expression"),
    ),
    cmd(
        "step",
        Some("s"),
        "Execute the current line, stop at the first possible occasion.",
        None,
    ),
    cmd(
        "tbreak",
        None,
        "Temporary breakpoint, removed when first hit.",
        Some("([filename:]lineno | function) [, condition]"),
    ),
    cmd(
        "unalias",
        None,
        "Delete the specified alias.",
        Some("name"),
    ),
    cmd(
        "undisplay",
        None,
        "Stop displaying an expression.",
        Some("[expression]"),
    ),
    cmd(
        "until",
        Some("unt"),
        "Continue until a line greater than the current is reached.",
        Some("[lineno]"),
    ),
    cmd(
        "up",
        Some("u"),
        "Move the current frame count levels up (to an older frame).",
        Some("[count]"),
    ),
    cmd(
        "whatis",
        None,
        "Print the type of an expression.",
        Some("expression"),
    ),
    cmd(
        "where",
        Some("w"),
        "Print a stack trace, most recent frame at the bottom.",
        None,
    ),
];

/// Look up a command by full name or shortcut.
pub fn lookup(word: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|c| c.name == word || c.shortcut == Some(word))
}

/// All built-in names, including shortcuts.
pub fn builtin_names() -> BTreeSet<String> {
    COMMANDS
        .iter()
        .flat_map(|c| std::iter::once(c.name).chain(c.shortcut))
        .map(String::from)
        .collect()
}

/// Usage synopsis for a single typed word, if it names a command.
pub fn usage_hint(word: &str) -> Option<&'static str> {
    lookup(word).and_then(|c| c.usage)
}

/// Maps shortcut letters to full command names.
#[derive(Debug, Clone, Default)]
pub struct ShortcutTable {
    map: HashMap<String, String>,
}

impl ShortcutTable {
    /// Create a table from explicit pairs
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            map: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The shortcuts of the built-in command table
    pub fn builtin() -> Self {
        Self::new(
            COMMANDS
                .iter()
                .filter_map(|c| c.shortcut.map(|s| (s, c.name))),
        )
    }

    /// Full command name for a shortcut
    pub fn get(&self, shortcut: &str) -> Option<&str> {
        self.map.get(shortcut).map(String::as_str)
    }

    /// Expand a leading shortcut into its full command name.
    ///
    /// The result is always `command + " " + remainder`, so a bare command
    /// keeps a single trailing space.
    pub fn rewrite(&self, raw_input: &str) -> String {
        let trimmed = raw_input.trim();
        let (first, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest.trim_start()),
            None => (trimmed, ""),
        };
        let command = self.get(first).unwrap_or(first);
        format!("{} {}", command, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcut_expansion() {
        let table = ShortcutTable::new([("s", "step"), ("n", "next")]);
        assert_eq!(table.rewrite("s"), "step ");
        assert_eq!(table.rewrite("n 3"), "next 3");
        assert_eq!(table.rewrite("  n    3  "), "next 3");
    }

    #[test]
    fn test_rewrite_keeps_canonical_names() {
        let table = ShortcutTable::builtin();
        for spec in COMMANDS {
            if table.get(spec.name).is_some() {
                continue;
            }
            let line = format!("{} x", spec.name);
            assert_eq!(table.rewrite(&line), line);
        }
    }

    #[test]
    fn test_rewrite_empty_input() {
        let table = ShortcutTable::builtin();
        assert_eq!(table.rewrite(""), " ");
        assert_eq!(table.rewrite("   "), " ");
    }

    #[test]
    fn test_rewrite_leaves_unknown_words() {
        let table = ShortcutTable::builtin();
        assert_eq!(table.rewrite("x = 1"), "x = 1");
        assert_eq!(table.rewrite("b main.rs:12"), "break main.rs:12");
    }

    #[test]
    fn test_builtin_names_include_shortcuts() {
        let names = builtin_names();
        assert!(names.contains("break"));
        assert!(names.contains("b"));
        assert!(names.contains("where"));
        assert!(names.contains("w"));
        assert!(!names.contains("x"));
    }

    #[test]
    fn test_lookup_and_usage() {
        assert_eq!(lookup("c").map(|c| c.name), Some("continue"));
        assert_eq!(usage_hint("enable"), Some("bpnumber [bpnumber ...]"));
        assert_eq!(usage_hint("next"), None);
        assert_eq!(usage_hint("nonsense"), None);
    }
}
