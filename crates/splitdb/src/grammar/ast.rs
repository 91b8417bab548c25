//! Grammar AST and its lowering into regex source.
//!
//! A production is a tree of [`Node`]s. Lowering produces two things:
//! the full-match source (every slot becomes a uniquely named group) and
//! one prefix source per slot position, used to find the slot the cursor
//! is in while the user is still typing.

use super::SlotKind;

/// One node of a command production
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A fixed regex fragment that never receives completion
    Pattern(String),
    /// A completable slot. `partial` matches any prefix of `full`.
    Slot {
        kind: SlotKind,
        full: String,
        partial: String,
    },
    Seq(Vec<Node>),
    Alt(Vec<Node>),
    Opt(Box<Node>),
    /// Zero or more repetitions
    Many(Box<Node>),
}

/// A named group of the full-match regex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub name: String,
    pub kind: SlotKind,
}

pub fn pattern(src: impl Into<String>) -> Node {
    Node::Pattern(src.into())
}

/// At least one whitespace character
pub fn space() -> Node {
    pattern(r"\s+")
}

pub fn slot(kind: SlotKind, full: impl Into<String>, partial: impl Into<String>) -> Node {
    Node::Slot {
        kind,
        full: full.into(),
        partial: partial.into(),
    }
}

pub fn seq(nodes: impl IntoIterator<Item = Node>) -> Node {
    Node::Seq(nodes.into_iter().collect())
}

pub fn alt(nodes: impl IntoIterator<Item = Node>) -> Node {
    Node::Alt(nodes.into_iter().collect())
}

pub fn opt(node: Node) -> Node {
    Node::Opt(Box::new(node))
}

pub fn many(node: Node) -> Node {
    Node::Many(Box::new(node))
}

/// Alternation of literal words, longest first
pub fn words<'a>(words: impl IntoIterator<Item = &'a str>) -> String {
    let mut words: Vec<&str> = words.into_iter().collect();
    words.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    words.dedup();
    let escaped: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    format!("(?:{})", escaped.join("|"))
}

impl Node {
    /// Lower to full-match source. Slots become `(?P<sN>...)` groups and
    /// are appended to `slots` in group order.
    pub fn lower(&self, slots: &mut Vec<Slot>) -> String {
        match self {
            Node::Pattern(src) => format!("(?:{})", src),
            Node::Slot { kind, full, .. } => {
                let name = format!("s{}", slots.len());
                let out = format!("(?P<{}>{})", name, full);
                slots.push(Slot { name, kind: *kind });
                out
            }
            Node::Seq(nodes) => nodes.iter().map(|n| n.lower(slots)).collect(),
            Node::Alt(nodes) => {
                let parts: Vec<String> = nodes.iter().map(|n| n.lower(slots)).collect();
                format!("(?:{})", parts.join("|"))
            }
            Node::Opt(inner) => format!("(?:{})?", inner.lower(slots)),
            Node::Many(inner) => format!("(?:{})*", inner.lower(slots)),
        }
    }

    /// Full-match source without any capture groups
    pub fn plain(&self) -> String {
        match self {
            Node::Pattern(src) => format!("(?:{})", src),
            Node::Slot { full, .. } => format!("(?:{})", full),
            Node::Seq(nodes) => nodes.iter().map(Node::plain).collect(),
            Node::Alt(nodes) => {
                let parts: Vec<String> = nodes.iter().map(Node::plain).collect();
                format!("(?:{})", parts.join("|"))
            }
            Node::Opt(inner) => format!("(?:{})?", inner.plain()),
            Node::Many(inner) => format!("(?:{})*", inner.plain()),
        }
    }

    /// Sources matching every input that ends inside a slot of this node.
    ///
    /// Each source holds exactly one `text` group: what has been typed of
    /// the slot so far.
    pub fn prefixes(&self) -> Vec<(String, SlotKind)> {
        match self {
            Node::Pattern(_) => Vec::new(),
            Node::Slot { kind, partial, .. } => {
                vec![(format!("(?P<text>{})", partial), *kind)]
            }
            Node::Seq(nodes) => {
                let mut out = Vec::new();
                let mut before = String::new();
                for node in nodes {
                    for (src, kind) in node.prefixes() {
                        out.push((format!("{}{}", before, src), kind));
                    }
                    before.push_str(&node.plain());
                }
                out
            }
            Node::Alt(nodes) => nodes.iter().flat_map(Node::prefixes).collect(),
            Node::Opt(inner) => inner.prefixes(),
            Node::Many(inner) => {
                let repeated = format!("(?:{})*", inner.plain());
                inner
                    .prefixes()
                    .into_iter()
                    .map(|(src, kind)| (format!("{}{}", repeated, src), kind))
                    .collect()
            }
        }
    }
}
