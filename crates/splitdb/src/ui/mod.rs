//! UI components for the split-pane front-end
//!
//! These modules handle rendering of the panes, bars and input line.

pub mod highlight;
pub mod input_pane;
pub mod layout;
pub mod toolbars;
