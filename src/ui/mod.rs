//! Terminal UI components
//!
//! All UI widgets and rendering logic using ratatui. Components read the
//! data-layer types but never own them; the [`App`](crate::app::App) holds
//! the state and hands the relevant piece to each widget per frame.

pub mod command_bar;
pub mod connections;
pub mod dialog;
pub mod editor;
pub mod help;
pub mod layout;
pub mod render;
pub mod results;
pub mod theme;
pub mod tree;

use crossterm::event::KeyEvent;
use ratatui::{Frame, layout::Rect};

use crate::ui::theme::Theme;

/// Actions a component can return to signal intent to the parent.
/// Components never mutate siblings; they declare what should happen,
/// and `App::process_component_action` decides how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentAction {
    /// Event consumed, no further action needed
    Consumed,
    /// Event not handled, parent should try
    Ignored,
    /// Execute a command string
    ExecuteCommand(String),
    /// Dismiss command bar (cancel)
    DismissCommandBar,
    /// Bind the active tab to this profile and open it
    UseProfile(String),
    /// Show the first rows of a relation, by qualified name
    PreviewRelation(String),
}

/// Trait for UI components
pub trait Component {
    /// Handle a key event, returning an action for the parent to process
    fn handle_key(&mut self, key: KeyEvent) -> ComponentAction;

    /// Render the component to the frame
    fn render(&self, frame: &mut Frame, area: Rect, focused: bool, theme: &Theme);
}

/// Keep `selected` inside a window of `height` rows starting at `offset`
pub(crate) fn scroll_into_view(selected: usize, offset: usize, height: usize) -> usize {
    if height == 0 || selected < offset {
        selected
    } else if selected >= offset + height {
        selected + 1 - height
    } else {
        offset
    }
}
