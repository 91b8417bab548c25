//! Layout Manager
//!
//! Source pane (left) and stack pane (right) on top, each with a title bar
//! and separated by a vertical rule. Below them the transcript with the
//! input line, the shortcuts toolbar and the status line.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use serde::Deserialize;

/// Layout configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Percentage of the pane row given to the source pane (10-90)
    pub source_width_percent: u16,
    /// Percentage of the height given to the source and stack panes (10-90)
    pub pane_height_percent: u16,
    /// Below twice this width the stack pane is hidden
    pub min_pane_width: u16,
    /// Rows always kept for the transcript and input
    pub input_min_height: u16,
    /// Input lines shown before the input scrolls
    pub input_max_height: u16,
    /// Rows kept visible above and below the source cursor
    pub scroll_offset: u16,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            source_width_percent: 65,
            pane_height_percent: 60,
            min_pane_width: 20,
            input_min_height: 3,
            input_max_height: 6,
            scroll_offset: 3,
        }
    }
}

impl LayoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source width percentage
    pub fn source_width(mut self, percent: u16) -> Self {
        self.source_width_percent = percent.clamp(10, 90);
        self
    }

    /// Set the pane height percentage
    pub fn pane_height(mut self, percent: u16) -> Self {
        self.pane_height_percent = percent.clamp(10, 90);
        self
    }

    /// Clamp values that came from a config file
    pub fn normalized(mut self) -> Self {
        self.input_min_height = self.input_min_height.max(1);
        self.input_max_height = self.input_max_height.max(self.input_min_height);
        self.source_width_percent = self.source_width_percent.clamp(10, 90);
        self.pane_height_percent = self.pane_height_percent.clamp(10, 90);
        self
    }
}

/// The computed layout areas
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputedLayout {
    pub source_title: Rect,
    pub source: Rect,
    pub separator: Rect,
    pub stack_title: Rect,
    pub stack: Rect,
    /// Transcript and input line
    pub repl: Rect,
    pub toolbar: Rect,
    pub status: Rect,
}

impl ComputedLayout {
    /// Compute the layout for a given terminal area
    pub fn compute(area: Rect, config: &LayoutConfig) -> Self {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(config.pane_height_percent),
                Constraint::Min(config.input_min_height),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        let panes = vertical[0];
        let mut layout = Self {
            repl: vertical[1],
            toolbar: vertical[2],
            status: vertical[3],
            ..Self::default()
        };

        let (source_col, stack_col) = if panes.width > config.min_pane_width * 2 {
            let horizontal = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(config.source_width_percent),
                    Constraint::Length(1),
                    Constraint::Min(0),
                ])
                .split(panes);
            layout.separator = horizontal[1];
            (horizontal[0], horizontal[2])
        } else {
            // Too narrow - source only
            (panes, Rect::default())
        };

        (layout.source_title, layout.source) = split_title(source_col);
        (layout.stack_title, layout.stack) = split_title(stack_col);
        layout
    }

    /// Check if the stack pane is visible
    pub fn stack_visible(&self) -> bool {
        self.stack.width > 0 && self.stack.height > 0
    }

    /// All panes above the transcript, used by the exit confirmation
    pub fn panes(&self) -> Rect {
        self.source_title
            .union(self.source)
            .union(self.separator)
            .union(self.stack_title)
            .union(self.stack)
    }
}

fn split_title(column: Rect) -> (Rect, Rect) {
    if column.height == 0 {
        return (Rect::default(), Rect::default());
    }
    let title = Rect { height: 1, ..column };
    let body = Rect {
        y: column.y + 1,
        height: column.height - 1,
        ..column
    };
    (title, body)
}

/// Status line content
#[derive(Debug, Clone, Default)]
pub struct StatusContent {
    /// Validation or engine message, shown on the left
    pub message: Option<String>,
    pub is_error: bool,
    /// Focused pane name
    pub focus: String,
    /// Whether paste mode is on
    pub paste_mode: bool,
}

impl StatusContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = focus.into();
        self
    }

    pub fn paste_mode(mut self, on: bool) -> Self {
        self.paste_mode = on;
        self
    }

    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    pub fn error(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self.is_error = true;
        self
    }

    /// Format for display
    pub fn format(&self, width: u16) -> String {
        let left = match &self.message {
            Some(msg) => format!(" {} ", msg),
            None => String::new(),
        };
        let right = if self.paste_mode {
            format!(" [F6] Paste mode (on) | {} ", self.focus)
        } else {
            format!(" {} ", self.focus)
        };

        let padding = (width as usize)
            .saturating_sub(left.chars().count())
            .saturating_sub(right.chars().count());
        format!("{}{}{}", left, " ".repeat(padding), right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_config_bounds() {
        let config = LayoutConfig::new().source_width(5);
        assert_eq!(config.source_width_percent, 10);
        let config = LayoutConfig::new().pane_height(95);
        assert_eq!(config.pane_height_percent, 90);

        let config = LayoutConfig {
            input_min_height: 0,
            input_max_height: 0,
            ..LayoutConfig::default()
        }
        .normalized();
        assert_eq!(config.input_min_height, 1);
        assert_eq!(config.input_max_height, 1);
    }

    #[test]
    fn test_computed_layout() {
        let area = Rect::new(0, 0, 100, 40);
        let layout = ComputedLayout::compute(area, &LayoutConfig::default());

        assert_eq!(layout.status.height, 1);
        assert_eq!(layout.status.y, 39);
        assert_eq!(layout.toolbar.y, 38);

        assert_eq!(layout.source_title.height, 1);
        assert_eq!(layout.source.y, layout.source_title.y + 1);
        assert_eq!(layout.separator.width, 1);
        assert!(layout.stack_visible());
        assert_eq!(layout.stack.x, layout.separator.x + 1);
        assert!(layout.repl.height >= LayoutConfig::default().input_min_height);
    }

    #[test]
    fn test_narrow_layout_hides_stack() {
        let area = Rect::new(0, 0, 30, 30);
        let layout = ComputedLayout::compute(area, &LayoutConfig::default());
        assert!(!layout.stack_visible());
        assert_eq!(layout.source.width, 30);
    }

    #[test]
    fn test_status_content_format() {
        let status = StatusContent::new()
            .focus("Source")
            .error("Invalid command: \"ignore abc\"");
        let formatted = status.format(80);
        assert!(formatted.starts_with(" Invalid command"));
        assert!(formatted.ends_with(" Source "));
        assert_eq!(formatted.chars().count(), 80);
        assert!(status.is_error);
    }
}
