//! Call-stack pane rendering.

use crate::engine::Frame;
use crate::theme::{StyleTag, StyledLine};

/// Rendered stack pane
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackView {
    pub lines: Vec<StyledLine>,
    /// `(row, column)` just after the selected entry, only while focused
    pub cursor: Option<(usize, usize)>,
}

/// One stack entry: marker, basename, `(line)`, function, arguments and
/// return value.
pub fn format_entry(frame: &Frame, is_current: bool, is_selected: bool) -> StyledLine {
    let mut line = StyledLine::new();
    line.push(StyleTag::Text, if is_current { "-> " } else { "   " });

    let basename = frame
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| frame.file.display().to_string());
    let name_tag = if is_selected {
        StyleTag::NameSelected
    } else {
        StyleTag::Name
    };
    line.push(name_tag, basename);
    line.push(StyleTag::Punctuation, format!("({})", frame.line));
    line.push(
        StyleTag::Text,
        frame.function_name.as_deref().unwrap_or("<lambda>"),
    );
    line.push(StyleTag::Text, frame.args_repr.as_deref().unwrap_or("()"));
    if let Some(value) = &frame.return_repr {
        line.push(StyleTag::Operator, "->");
        line.push(StyleTag::Text, value.clone());
    }
    line
}

/// Render every frame, outermost-first.
///
/// `current` is the executing frame and gets the `->` marker; `selected`
/// is the navigation cursor and gets the selected-name style.
pub fn render_stack(frames: &[Frame], selected: usize, current: usize, has_focus: bool) -> StackView {
    let lines: Vec<StyledLine> = frames
        .iter()
        .enumerate()
        .map(|(i, frame)| format_entry(frame, i == current, i == selected))
        .collect();

    let cursor = if has_focus {
        lines.get(selected).map(|line| (selected, line.width()))
    } else {
        None
    };
    StackView { lines, cursor }
}
