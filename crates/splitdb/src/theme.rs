//! Style tags and the theme that maps them to terminal styles.
//!
//! Renderers produce [`StyledLine`]s tagged with [`StyleTag`]s; the theme
//! turns tags into ratatui styles only when a frame is drawn. The theme is
//! built once: base styles, then the debugger extensions, then user
//! overrides from the config file.

use crate::error::FrontendError;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use std::collections::HashMap;

/// Semantic style of a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleTag {
    Text,
    Keyword,
    Builtin,
    Name,
    NameSelected,
    Number,
    String,
    Comment,
    Operator,
    Punctuation,
    Break,
    BreakCondition,
    CurrentLine,
    LineNumber,
    Prompt,
    PdbCommand,
    Error,
    Output,
    ToolbarTitle,
    ToolbarTitleText,
    ShortcutKey,
    ShortcutDescription,
    HintSymbol,
    HintParameter,
    Separator,
    CompletionMenu,
    CompletionSelected,
    CompletionMeta,
}

impl StyleTag {
    /// Every tag, in config-key order
    pub const ALL: [StyleTag; 28] = [
        StyleTag::Text,
        StyleTag::Keyword,
        StyleTag::Builtin,
        StyleTag::Name,
        StyleTag::NameSelected,
        StyleTag::Number,
        StyleTag::String,
        StyleTag::Comment,
        StyleTag::Operator,
        StyleTag::Punctuation,
        StyleTag::Break,
        StyleTag::BreakCondition,
        StyleTag::CurrentLine,
        StyleTag::LineNumber,
        StyleTag::Prompt,
        StyleTag::PdbCommand,
        StyleTag::Error,
        StyleTag::Output,
        StyleTag::ToolbarTitle,
        StyleTag::ToolbarTitleText,
        StyleTag::ShortcutKey,
        StyleTag::ShortcutDescription,
        StyleTag::HintSymbol,
        StyleTag::HintParameter,
        StyleTag::Separator,
        StyleTag::CompletionMenu,
        StyleTag::CompletionSelected,
        StyleTag::CompletionMeta,
    ];

    /// Key used for this tag in the `[theme]` config table
    pub fn key(self) -> &'static str {
        match self {
            StyleTag::Text => "text",
            StyleTag::Keyword => "keyword",
            StyleTag::Builtin => "builtin",
            StyleTag::Name => "name",
            StyleTag::NameSelected => "name_selected",
            StyleTag::Number => "number",
            StyleTag::String => "string",
            StyleTag::Comment => "comment",
            StyleTag::Operator => "operator",
            StyleTag::Punctuation => "punctuation",
            StyleTag::Break => "break",
            StyleTag::BreakCondition => "break_condition",
            StyleTag::CurrentLine => "current_line",
            StyleTag::LineNumber => "line_number",
            StyleTag::Prompt => "prompt",
            StyleTag::PdbCommand => "command",
            StyleTag::Error => "error",
            StyleTag::Output => "output",
            StyleTag::ToolbarTitle => "toolbar_title",
            StyleTag::ToolbarTitleText => "toolbar_title_text",
            StyleTag::ShortcutKey => "shortcut_key",
            StyleTag::ShortcutDescription => "shortcut_description",
            StyleTag::HintSymbol => "hint_symbol",
            StyleTag::HintParameter => "hint_parameter",
            StyleTag::Separator => "separator",
            StyleTag::CompletionMenu => "completion_menu",
            StyleTag::CompletionSelected => "completion_selected",
            StyleTag::CompletionMeta => "completion_meta",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key() == key)
    }
}

/// A line of tagged fragments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledLine(pub Vec<(StyleTag, String)>);

impl StyledLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self(vec![(StyleTag::Text, text.into())])
    }

    pub fn tagged(tag: StyleTag, text: impl Into<String>) -> Self {
        Self(vec![(tag, text.into())])
    }

    pub fn push(&mut self, tag: StyleTag, text: impl Into<String>) {
        self.0.push((tag, text.into()));
    }

    pub fn fragments(&self) -> &[(StyleTag, String)] {
        &self.0
    }

    /// The text without styling
    pub fn text(&self) -> String {
        self.0.iter().map(|(_, t)| t.as_str()).collect()
    }

    /// Display width in characters
    pub fn width(&self) -> usize {
        self.0.iter().map(|(_, t)| t.chars().count()).sum()
    }

    pub fn to_line(&self, theme: &Theme) -> Line<'static> {
        Line::from(
            self.0
                .iter()
                .map(|(tag, text)| Span::styled(text.clone(), theme.style(*tag)))
                .collect::<Vec<_>>(),
        )
    }
}

/// Parse a style string such as `"bg:#ff4444 #ffffff bold"`.
///
/// Words are `bold`, `italic`, `underline`, `reverse`, `noinherit`,
/// `#rrggbb` (foreground), `bg:#rrggbb` (background) and ansi color names.
pub fn parse_style(spec: &str) -> Result<Style, FrontendError> {
    let mut style = Style::default();
    for word in spec.split_whitespace() {
        style = match word {
            "bold" => style.add_modifier(Modifier::BOLD),
            "italic" => style.add_modifier(Modifier::ITALIC),
            "underline" => style.add_modifier(Modifier::UNDERLINED),
            "reverse" => style.add_modifier(Modifier::REVERSED),
            "noinherit" => style,
            _ => match word.strip_prefix("bg:") {
                Some(color) => style.bg(parse_color(color)?),
                None => style.fg(parse_color(word)?),
            },
        };
    }
    Ok(style)
}

fn parse_color(word: &str) -> Result<Color, FrontendError> {
    if let Some(hex) = word.strip_prefix('#')
        && hex.len() == 6
        && let Ok(rgb) = u32::from_str_radix(hex, 16)
    {
        return Ok(Color::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8));
    }
    let named = match word {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "white" => Color::White,
        "default" => Color::Reset,
        _ => return Err(FrontendError::Config(format!("unknown color {:?}", word))),
    };
    Ok(named)
}

/// Tag to style mapping
#[derive(Debug, Clone)]
pub struct Theme {
    styles: HashMap<StyleTag, Style>,
}

impl Default for Theme {
    fn default() -> Self {
        let mut theme = Self::base();
        theme.extend_with_debugger_styles();
        theme
    }
}

impl Theme {
    /// Plain syntax colors, before any debugger styles
    pub fn base() -> Self {
        let mut styles = HashMap::new();
        styles.insert(
            StyleTag::Keyword,
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        );
        styles.insert(StyleTag::Builtin, Style::default().fg(Color::Cyan));
        styles.insert(StyleTag::Number, Style::default().fg(Color::Blue));
        styles.insert(StyleTag::String, Style::default().fg(Color::Green));
        styles.insert(StyleTag::Comment, Style::default().fg(Color::DarkGray));
        styles.insert(StyleTag::Operator, Style::default().fg(Color::Yellow));
        styles.insert(StyleTag::LineNumber, Style::default().fg(Color::DarkGray));
        styles.insert(StyleTag::Output, Style::default().fg(Color::White));
        styles.insert(
            StyleTag::CompletionMenu,
            Style::default().bg(Color::DarkGray).fg(Color::White),
        );
        styles.insert(
            StyleTag::CompletionSelected,
            Style::default().bg(Color::Blue).fg(Color::White),
        );
        styles.insert(
            StyleTag::CompletionMeta,
            Style::default().bg(Color::DarkGray).fg(Color::Gray),
        );
        Self { styles }
    }

    /// Overlay the breakpoint, toolbar and prompt styles
    pub fn extend_with_debugger_styles(&mut self) {
        let extensions = [
            (StyleTag::Break, "bg:#ff4444 #ffffff"),
            (StyleTag::BreakCondition, "bg:#880000 #ffffff"),
            (StyleTag::CurrentLine, "bg:#4444ff #ffffff"),
            (StyleTag::ToolbarTitle, "#888888"),
            (StyleTag::ToolbarTitleText, "bg:#444444 #ffffff"),
            (StyleTag::ShortcutKey, "bg:#444444 #ffffff"),
            (StyleTag::ShortcutDescription, "bg:#888888 #ffffff"),
            (StyleTag::NameSelected, "bold underline"),
            (StyleTag::Error, "#aa0000 bold"),
            (StyleTag::PdbCommand, "bg:#444444 #ffffff bold"),
            (StyleTag::HintSymbol, "#9a8888"),
            (StyleTag::HintParameter, "#ba4444 bold"),
            (StyleTag::Prompt, "bold #008800"),
            (StyleTag::Separator, "#888888"),
        ];
        for (tag, spec) in extensions {
            if let Ok(style) = parse_style(spec) {
                self.styles.insert(tag, style);
            }
        }
    }

    /// Apply `[theme]` overrides keyed by [`StyleTag::key`]
    pub fn with_overrides<'a>(
        mut self,
        overrides: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Result<Self, FrontendError> {
        for (key, spec) in overrides {
            let tag = StyleTag::from_key(key)
                .ok_or_else(|| FrontendError::Config(format!("unknown theme key {:?}", key)))?;
            self.styles.insert(tag, parse_style(spec)?);
        }
        Ok(self)
    }

    pub fn style(&self, tag: StyleTag) -> Style {
        self.styles.get(&tag).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_parse_style() -> Result<(), String> {
        let style = parse_style("bg:#ff4444 #ffffff bold").map_err(|e| e.to_string())?;
        assert_eq!(style.bg, Some(Color::Rgb(0xff, 0x44, 0x44)));
        assert_eq!(style.fg, Some(Color::Rgb(0xff, 0xff, 0xff)));
        assert!(style.add_modifier.contains(Modifier::BOLD));
        assert!(parse_style("#zzzzzz").is_err());
        assert!(parse_style("").is_ok());
        Ok(())
    }

    #[test]
    fn test_debugger_styles_override_base() {
        let base = Theme::base();
        let theme = Theme::default();
        assert_eq!(base.style(StyleTag::Break), Style::default());
        assert_eq!(
            theme.style(StyleTag::CurrentLine).bg,
            Some(Color::Rgb(0x44, 0x44, 0xff))
        );
    }

    #[test]
    fn test_user_overrides() -> Result<(), String> {
        let mut overrides = BTreeMap::new();
        overrides.insert("break".to_string(), "bg:#00ff00".to_string());
        let theme = Theme::default()
            .with_overrides(&overrides)
            .map_err(|e| e.to_string())?;
        assert_eq!(theme.style(StyleTag::Break).bg, Some(Color::Rgb(0, 0xff, 0)));

        let mut bad = BTreeMap::new();
        bad.insert("nope".to_string(), "bold".to_string());
        assert!(Theme::default().with_overrides(&bad).is_err());
        Ok(())
    }

    #[test]
    fn test_keys_round_trip() {
        for tag in StyleTag::ALL {
            assert_eq!(StyleTag::from_key(tag.key()), Some(tag));
        }
    }

    #[test]
    fn test_styled_line_text() {
        let mut line = StyledLine::tagged(StyleTag::Break, " B ");
        line.push(StyleTag::LineNumber, " 12 ");
        assert_eq!(line.text(), " B  12 ");
        assert_eq!(line.width(), 7);
    }
}
