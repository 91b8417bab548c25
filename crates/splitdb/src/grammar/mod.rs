//! Command grammar compiler and slot router.
//!
//! The grammar is built from the set of command names the engine currently
//! knows (built-ins, shortcuts and aliases). It answers two questions:
//! does a whole input line parse, and which slot is the cursor in.

pub mod ast;
pub mod cache;

pub use ast::Slot;
pub use cache::GrammarCache;

use crate::error::FrontendError;
use ast::{Node, alt, many, opt, pattern, seq, slot, space, words};
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

/// What a slot completes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotKind {
    CommandName,
    EnabledBreakpoint,
    DisabledBreakpoint,
    AnyBreakpoint,
    AliasName,
    EmbeddedExpression,
    FilePath,
    FunctionName,
}

/// A slot the cursor can be in, with what has been typed of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSlot {
    pub kind: SlotKind,
    pub text: String,
}

/// Checks the expression text embedded in a command
pub trait ExpressionValidator {
    fn check(&self, expression: &str) -> Result<(), String>;
}

/// Accepts every expression
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ExpressionValidator for AcceptAll {
    fn check(&self, _expression: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Rejects unbalanced brackets and unterminated string literals
#[derive(Debug, Clone, Copy, Default)]
pub struct BalancedDelimiters;

impl ExpressionValidator for BalancedDelimiters {
    fn check(&self, expression: &str) -> Result<(), String> {
        let mut open: Vec<char> = Vec::new();
        let mut quote: Option<char> = None;
        let mut escaped = false;

        for ch in expression.chars() {
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
                continue;
            }
            match ch {
                '\'' | '"' => quote = Some(ch),
                '(' | '[' | '{' => open.push(ch),
                ')' | ']' | '}' => {
                    let expected = match ch {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    if open.pop() != Some(expected) {
                        return Err(format!("unmatched '{}'", ch));
                    }
                }
                _ => {}
            }
        }

        if quote.is_some() {
            return Err("unterminated string literal".to_string());
        }
        if let Some(ch) = open.last() {
            return Err(format!("'{}' was never closed", ch));
        }
        Ok(())
    }
}

const EXPRESSION_COMMANDS: &[&str] = &["p", "pp", "whatis"];
const BREAK_COMMANDS: &[&str] = &["break", "b", "tbreak"];
const HELP_COMMANDS: &[&str] = &["help", "h"];

fn command<'a>(names: impl IntoIterator<Item = &'a str>) -> Node {
    slot(SlotKind::CommandName, words(names), r"\S*")
}

fn expression() -> Node {
    slot(SlotKind::EmbeddedExpression, ".*", ".*")
}

fn breakpoint(kind: SlotKind) -> Node {
    slot(kind, "[0-9]+", "[0-9]*")
}

fn present<'a>(names: &BTreeSet<String>, wanted: &[&'a str]) -> Vec<&'a str> {
    wanted
        .iter()
        .copied()
        .filter(|w| names.contains(*w))
        .collect()
}

/// Productions for `names`. The alias body reuses these one level down,
/// without the alias production itself.
fn productions(names: &BTreeSet<String>, with_alias: bool) -> Vec<Node> {
    let mut out = Vec::new();
    let single = |name: &str, out: &mut Vec<Node>, build: fn(Node) -> Node| {
        if names.contains(name) {
            out.push(build(command([name])));
        }
    };

    let exprs = present(names, EXPRESSION_COMMANDS);
    if !exprs.is_empty() {
        out.push(seq([command(exprs), space(), expression()]));
    }

    single("display", &mut out, |cmd| {
        seq([cmd, opt(seq([space(), expression()]))])
    });
    single("enable", &mut out, |cmd| {
        seq([
            cmd,
            many(seq([space(), breakpoint(SlotKind::DisabledBreakpoint)])),
        ])
    });
    single("disable", &mut out, |cmd| {
        seq([
            cmd,
            many(seq([space(), breakpoint(SlotKind::EnabledBreakpoint)])),
        ])
    });
    single("condition", &mut out, |cmd| {
        seq([
            cmd,
            space(),
            breakpoint(SlotKind::AnyBreakpoint),
            opt(seq([space(), expression()])),
        ])
    });
    single("ignore", &mut out, |cmd| {
        seq([
            cmd,
            space(),
            breakpoint(SlotKind::AnyBreakpoint),
            opt(seq([space(), pattern("[0-9]+")])),
        ])
    });
    single("commands", &mut out, |cmd| {
        seq([cmd, opt(seq([space(), breakpoint(SlotKind::AnyBreakpoint)]))])
    });
    single("unalias", &mut out, |cmd| {
        seq([cmd, space(), slot(SlotKind::AliasName, r"\S+", r"\S*")])
    });

    let help = present(names, HELP_COMMANDS);
    if !help.is_empty() {
        out.push(seq([
            command(help),
            opt(seq([
                space(),
                slot(SlotKind::CommandName, r"\S+", r"\S*"),
            ])),
        ]));
    }

    let breaks = present(names, BREAK_COMMANDS);
    if !breaks.is_empty() {
        let location = alt([
            seq([
                slot(SlotKind::FilePath, r"[^\s:0-9][^\s:]*", r"(?:[^\s:0-9][^\s:]*)?"),
                pattern(":"),
                pattern("[0-9]+"),
            ]),
            pattern("[0-9]+"),
            slot(SlotKind::FunctionName, r"[^\s:,]+", r"[^\s:,]*"),
        ]);
        out.push(seq([
            command(breaks),
            opt(seq([
                space(),
                location,
                opt(seq([pattern(r"\s*,\s*"), expression()])),
            ])),
        ]));
    }

    // Any command with any arguments; the engine reports usage errors
    if !names.is_empty() {
        out.push(seq([
            command(names.iter().map(String::as_str)),
            opt(seq([space(), pattern(".*")])),
        ]));
    }

    out.push(seq([pattern("!"), expression()]));

    if with_alias && names.contains("alias") {
        let mut body = productions(names, false);
        body.push(pattern(".+"));
        out.push(seq([
            command(["alias"]),
            opt(seq([
                space(),
                pattern(r"\S+"),
                opt(seq([space(), alt(body)])),
            ])),
        ]));
    }

    out
}

/// A compiled command grammar
#[derive(Debug)]
pub struct Grammar {
    names: BTreeSet<String>,
    full: Regex,
    slots: Vec<Slot>,
    prefixes: Vec<(Regex, SlotKind)>,
}

impl Grammar {
    /// Compile the grammar for a command-name set. Deterministic in the set.
    pub fn compile(names: &BTreeSet<String>) -> Result<Self, FrontendError> {
        let productions = productions(names, true);

        let mut slots = Vec::new();
        let bodies: Vec<String> = productions.iter().map(|p| p.lower(&mut slots)).collect();
        let full = Regex::new(&format!(r"(?s)^\s*(?:{})\s*$", bodies.join("|")))?;

        let mut seen = BTreeSet::new();
        let mut prefixes = Vec::new();
        for (src, kind) in productions.iter().flat_map(Node::prefixes) {
            if seen.insert((src.clone(), kind)) {
                prefixes.push((Regex::new(&format!(r"(?s)^\s*{}$", src))?, kind));
            }
        }

        debug!(
            names = names.len(),
            slots = slots.len(),
            prefixes = prefixes.len(),
            "compiled command grammar"
        );
        Ok(Self {
            names: names.clone(),
            full,
            slots,
            prefixes,
        })
    }

    /// The command-name set this grammar was built from
    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    /// Named slots of the full-match regex, in group order
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Every slot the cursor can be in at the end of `before_cursor`.
    ///
    /// Whitespace-only input is never routed.
    pub fn active_slots(&self, before_cursor: &str) -> Vec<ActiveSlot> {
        if before_cursor.trim().is_empty() {
            return Vec::new();
        }
        let mut out: Vec<ActiveSlot> = Vec::new();
        for (regex, kind) in &self.prefixes {
            let Some(caps) = regex.captures(before_cursor) else {
                continue;
            };
            let text = caps.name("text").map(|m| m.as_str()).unwrap_or("");
            let found = ActiveSlot {
                kind: *kind,
                text: text.to_string(),
            };
            if !out.contains(&found) {
                out.push(found);
            }
        }
        out
    }

    /// Slot captures of a whole input line, or None when nothing matches
    pub fn captures(&self, input: &str) -> Option<Vec<(SlotKind, String)>> {
        let caps = self.full.captures(input)?;
        Some(
            self.slots
                .iter()
                .filter_map(|s| {
                    caps.name(&s.name)
                        .map(|m| (s.kind, m.as_str().to_string()))
                })
                .collect(),
        )
    }

    /// Whether `input` should be accepted.
    ///
    /// Input whose first word is not a command name (and does not start
    /// with `!`) is treated as a bare expression.
    pub fn validate(
        &self,
        input: &str,
        expressions: &dyn ExpressionValidator,
    ) -> Result<(), FrontendError> {
        if input.trim().is_empty() {
            return Ok(());
        }

        let check = |expression: &str| {
            expressions
                .check(expression)
                .map_err(|reason| FrontendError::InvalidExpression {
                    expression: expression.to_string(),
                    reason,
                })
        };

        if let Some(captures) = self.captures(input) {
            for (kind, text) in captures {
                let text = text.trim();
                if kind == SlotKind::EmbeddedExpression && !text.is_empty() {
                    check(text)?;
                }
            }
            return Ok(());
        }

        let first = input.split_whitespace().next().unwrap_or("");
        if !first.starts_with('!') && !self.names.contains(first) {
            return check(input.trim());
        }

        Err(FrontendError::GrammarMismatch {
            input: input.to_string(),
        })
    }
}
