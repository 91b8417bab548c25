//! Title bars, the shortcuts toolbar and the breakpoint info float.

use crate::engine::Breakpoint;
use crate::focus::Focus;
use crate::theme::{StyleTag, StyledLine};
use std::path::Path;

const RULE: char = '─';

/// Key/description pairs for the focused pane
pub fn shortcuts(focus: Focus) -> &'static [(&'static str, &'static str)] {
    match focus {
        Focus::Input => &[("[Ctrl-X]", "Focus source code"), ("[Tab]", "Complete")],
        Focus::Source => &[
            ("[Ctrl-X]", "Focus stack"),
            ("[s]", "tep"),
            ("[n]", "ext"),
            ("[c]", "ontinue"),
            ("[q]", "uit"),
            ("[b]", "reak"),
        ],
        Focus::Stack => &[
            ("[Ctrl-X]", "Focus CLI"),
            ("[Enter]", "Go to frame"),
            ("[Arrows]", "Navigate"),
        ],
    }
}

pub fn shortcuts_toolbar(focus: Focus) -> StyledLine {
    let mut line = StyledLine::new();
    for (i, (key, description)) in shortcuts(focus).iter().enumerate() {
        if i > 0 {
            line.push(StyleTag::Text, " ");
        }
        line.push(StyleTag::ShortcutKey, *key);
        line.push(StyleTag::ShortcutDescription, *description);
    }
    line
}

fn fill(line: &mut StyledLine, width: usize) {
    let rest = width.saturating_sub(line.width());
    if rest > 0 {
        line.push(StyleTag::ToolbarTitle, " ".to_string() + &RULE.to_string().repeat(rest - 1));
    }
}

/// `── file : line ───`
pub fn source_title(file: &Path, line_number: usize, width: usize) -> StyledLine {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let mut line = StyledLine::new();
    line.push(StyleTag::ToolbarTitle, format!("{}{} ", RULE, RULE));
    line.push(StyleTag::ToolbarTitleText, format!(" {} ", name));
    line.push(StyleTag::ToolbarTitle, " : ");
    line.push(StyleTag::ToolbarTitleText, format!(" {} ", line_number));
    fill(&mut line, width);
    line
}

/// `── Stack (frame i/n) ───`, the frame counter only while focused
pub fn stack_title(selected: usize, count: usize, focused: bool, width: usize) -> StyledLine {
    let mut line = StyledLine::new();
    line.push(StyleTag::ToolbarTitle, format!("{}{} ", RULE, RULE));
    line.push(StyleTag::ToolbarTitleText, " Stack ");
    if focused && count > 0 {
        line.push(
            StyleTag::ToolbarTitle,
            format!(" (frame {}/{})", selected + 1, count),
        );
    }
    fill(&mut line, width);
    line
}

/// Number, state, condition and hit count of the breakpoints on a line
pub fn breakpoint_info(breakpoints: &[Breakpoint]) -> Option<StyledLine> {
    if breakpoints.is_empty() {
        return None;
    }
    let mut line = StyledLine::new();
    for bp in breakpoints {
        line.push(StyleTag::Break, format!(" BP {} ", bp.number));
        if !bp.enabled {
            line.push(StyleTag::Text, " [disabled]");
        }
        if let Some(condition) = &bp.condition {
            line.push(StyleTag::BreakCondition, format!(" {} ", condition));
        }
        if bp.hit_count > 0 {
            let plural = if bp.hit_count == 1 { "" } else { "s" };
            line.push(StyleTag::Text, format!(", {} hit{}", bp.hit_count, plural));
        }
        line.push(StyleTag::Text, " ");
    }
    Some(line)
}

/// Shown in place of the panes while waiting for y/n
pub fn exit_confirmation() -> StyledLine {
    let mut line = StyledLine::new();
    line.push(StyleTag::Error, " Do you want to quit? ");
    line.push(StyleTag::Text, "(");
    line.push(StyleTag::ShortcutKey, "y");
    line.push(StyleTag::Text, "/");
    line.push(StyleTag::ShortcutKey, "n");
    line.push(StyleTag::Text, ")");
    line
}
