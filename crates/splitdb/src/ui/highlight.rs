//! Syntax highlighting for source and expressions
//!
//! The source pane tokenizes a whole file at once and splits the result on
//! newlines afterwards, so a highlighter must keep newlines in its output.

use crate::theme::StyleTag;
use std::ops::Range;

/// Turns text into tagged fragments whose concatenation is the input
pub trait Highlighter {
    fn tokenize(&self, text: &str) -> Vec<(StyleTag, String)>;
}

/// A highlighted token with its position (in chars)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub tag: StyleTag,
    pub span: Range<usize>,
    pub text: String,
}

impl Token {
    fn new(tag: StyleTag, chars: &[char], span: Range<usize>) -> Self {
        Self {
            tag,
            text: chars[span.clone()].iter().collect(),
            span,
        }
    }
}

/// Keywords shared by the scripting languages this is usually pointed at
const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "fn", "for", "from", "global", "if", "impl", "import", "in",
    "is", "lambda", "let", "loop", "match", "mut", "nonlocal", "not", "or", "pass", "pub",
    "raise", "return", "struct", "try", "while", "with", "yield",
];

const BUILTINS: &[&str] = &[
    "True", "False", "None", "true", "false", "self", "Self", "print", "len", "range", "str",
    "int", "float", "list", "dict", "set", "tuple", "isinstance", "super",
];

/// Lexical highlighter driven by fixed keyword and builtin lists
#[derive(Debug, Clone, Default)]
pub struct KeywordHighlighter {
    extra_keywords: Vec<String>,
}

impl KeywordHighlighter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `words` as keywords in addition to the built-in list
    pub fn with_keywords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_keywords.extend(words.into_iter().map(Into::into));
        self
    }

    fn classify(&self, word: &str) -> StyleTag {
        if KEYWORDS.contains(&word) || self.extra_keywords.iter().any(|k| k == word) {
            StyleTag::Keyword
        } else if BUILTINS.contains(&word) {
            StyleTag::Builtin
        } else {
            StyleTag::Name
        }
    }

    /// Tokenize with positions
    pub fn tokens(&self, source: &str) -> Vec<Token> {
        let chars: Vec<char> = source.chars().collect();
        let mut tokens = Vec::new();
        let mut pos = 0;

        while pos < chars.len() {
            let start = pos;
            let ch = chars[pos];

            if ch.is_whitespace() {
                while pos < chars.len() && chars[pos].is_whitespace() {
                    pos += 1;
                }
                tokens.push(Token::new(StyleTag::Text, &chars, start..pos));
                continue;
            }

            // Comments run to end of line
            if ch == '#' || (ch == '/' && chars.get(pos + 1) == Some(&'/')) {
                while pos < chars.len() && chars[pos] != '\n' {
                    pos += 1;
                }
                tokens.push(Token::new(StyleTag::Comment, &chars, start..pos));
                continue;
            }

            if ch == '"' || ch == '\'' {
                pos += 1;
                while pos < chars.len() && chars[pos] != ch && chars[pos] != '\n' {
                    if chars[pos] == '\\' && pos + 1 < chars.len() {
                        pos += 2;
                    } else {
                        pos += 1;
                    }
                }
                if pos < chars.len() && chars[pos] == ch {
                    pos += 1;
                }
                let end = pos.min(chars.len());
                tokens.push(Token::new(StyleTag::String, &chars, start..end));
                pos = end;
                continue;
            }

            if ch.is_ascii_digit() {
                while pos < chars.len()
                    && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_' || chars[pos] == '.')
                {
                    pos += 1;
                }
                tokens.push(Token::new(StyleTag::Number, &chars, start..pos));
                continue;
            }

            if ch.is_alphabetic() || ch == '_' {
                while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                    pos += 1;
                }
                let word: String = chars[start..pos].iter().collect();
                let tag = self.classify(&word);
                tokens.push(Token::new(tag, &chars, start..pos));
                continue;
            }

            pos += 1;
            let tag = if "()[]{},.:;".contains(ch) {
                StyleTag::Punctuation
            } else {
                StyleTag::Operator
            };
            tokens.push(Token::new(tag, &chars, start..pos));
        }

        tokens
    }
}

impl Highlighter for KeywordHighlighter {
    fn tokenize(&self, text: &str) -> Vec<(StyleTag, String)> {
        self.tokens(text)
            .into_iter()
            .map(|t| (t.tag, t.text))
            .collect()
    }
}
