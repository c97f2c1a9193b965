//! Command bar widget
//!
//! Single-line input for `/` commands. Enter and Esc are resolved by the
//! keymap; everything else edits the line.

use crate::ui::theme::Theme;
use crate::ui::{Component, ComponentAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthStr;

const PROMPT: &str = "/";

/// Command bar component
pub struct CommandBar {
    /// Input buffer
    input: String,

    /// Cursor position (byte offset, always on a char boundary)
    cursor: usize,

    /// Whether the command bar is visible/active
    active: bool,
}

impl CommandBar {
    /// Create a new command bar
    pub fn new() -> Self {
        Self {
            input: String::new(),
            cursor: 0,
            active: false,
        }
    }

    /// Activate the command bar
    pub fn activate(&mut self) {
        self.active = true;
        self.input.clear();
        self.cursor = 0;
    }

    /// Activate with `text` already typed
    pub fn activate_with(&mut self, text: &str) {
        self.activate();
        self.input.push_str(text);
        self.cursor = self.input.len();
    }

    /// Deactivate the command bar
    pub fn deactivate(&mut self) {
        self.active = false;
        self.input.clear();
        self.cursor = 0;
    }

    /// Close the bar and hand back what was typed
    pub fn submit(&mut self) -> String {
        let input = std::mem::take(&mut self.input);
        self.deactivate();
        input
    }

    /// Check if command bar is active
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Get the current input
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Insert character at cursor
    pub fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    /// Delete character before cursor
    pub fn delete_char(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.input.drain(prev..self.cursor);
            self.cursor = prev;
        }
    }

    /// Move cursor left
    pub fn move_left(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.cursor = prev;
        }
    }

    /// Move cursor right
    pub fn move_right(&mut self) {
        if let Some(c) = self.input[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.input[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
    }
}

impl Default for CommandBar {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for CommandBar {
    fn handle_key(&mut self, key: KeyEvent) -> ComponentAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return ComponentAction::Ignored;
        }
        match key.code {
            KeyCode::Char(c) => self.insert_char(c),
            KeyCode::Backspace if self.input.is_empty() => {
                return ComponentAction::DismissCommandBar;
            }
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Delete => {
                if let Some(c) = self.input[self.cursor..].chars().next() {
                    self.input.drain(self.cursor..self.cursor + c.len_utf8());
                }
            }
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.input.len(),
            _ => return ComponentAction::Ignored,
        }
        ComponentAction::Consumed
    }

    fn render(&self, frame: &mut Frame, area: Rect, focused: bool, theme: &Theme) {
        let line = Line::from(vec![
            Span::styled(PROMPT, theme.command_prompt),
            Span::styled(self.input.as_str(), theme.command_input),
        ]);
        frame.render_widget(Paragraph::new(line), area);

        if focused {
            let x = PROMPT.len() + self.input[..self.cursor].width();
            let max_x = area.width.saturating_sub(1) as usize;
            frame.set_cursor_position((area.x + x.min(max_x) as u16, area.y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bar_new() {
        let bar = CommandBar::new();
        assert!(!bar.is_active());
        assert_eq!(bar.input(), "");
    }

    #[test]
    fn test_activate_deactivate() {
        let mut bar = CommandBar::new();
        bar.activate();
        assert!(bar.is_active());
        bar.deactivate();
        assert!(!bar.is_active());
    }

    #[test]
    fn test_insert_char() {
        let mut bar = CommandBar::new();
        for c in "quit".chars() {
            bar.insert_char(c);
        }
        assert_eq!(bar.input(), "quit");
        assert_eq!(bar.cursor, 4);
    }

    #[test]
    fn test_delete_char_multibyte() {
        let mut bar = CommandBar::new();
        bar.insert_char('a');
        bar.insert_char('é');
        bar.delete_char();
        assert_eq!(bar.input(), "a");
        assert_eq!(bar.cursor, 1);
    }

    #[test]
    fn test_submit_returns_input_and_closes() {
        let mut bar = CommandBar::new();
        bar.activate_with("use ");
        bar.insert_char('x');
        assert_eq!(bar.submit(), "use x");
        assert!(!bar.is_active());
        assert_eq!(bar.input(), "");
    }

    #[test]
    fn test_backspace_on_empty_dismisses() {
        let mut bar = CommandBar::new();
        bar.activate();
        assert_eq!(
            bar.handle_key(KeyEvent::from(KeyCode::Backspace)),
            ComponentAction::DismissCommandBar
        );
    }

    #[test]
    fn test_cursor_movement_and_insert_in_middle() {
        let mut bar = CommandBar::new();
        bar.activate_with("qit");
        bar.handle_key(KeyEvent::from(KeyCode::Home));
        bar.handle_key(KeyEvent::from(KeyCode::Right));
        bar.handle_key(KeyEvent::from(KeyCode::Char('u')));
        assert_eq!(bar.input(), "quit");
    }
}
