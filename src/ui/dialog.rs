//! Connection profile dialog
//!
//! A modal form for adding or editing a profile: a URL, a name and an
//! optional group. The dialog only builds and validates the profile; saving
//! and testing happen in the connection manager.

use crate::config::{ConnectionProfile, EngineConfig};
use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Rows the dialog needs, borders included
pub const DIALOG_HEIGHT: u16 = 10;

/// Actions returned by the dialog to the parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogAction {
    /// Save a new profile, or replace `original` when editing
    Save {
        original: Option<String>,
        profile: ConnectionProfile,
    },
    /// Try the profile without saving it
    Test(ConnectionProfile),
    /// User dismissed the dialog (Esc)
    Dismissed,
    /// Key was consumed by the dialog (no further handling needed)
    Consumed,
}

/// Which field currently has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DialogField {
    Url,
    Name,
    Group,
}

impl DialogField {
    fn next(self) -> Self {
        match self {
            DialogField::Url => DialogField::Name,
            DialogField::Name => DialogField::Group,
            DialogField::Group => DialogField::Url,
        }
    }

    fn prev(self) -> Self {
        match self {
            DialogField::Url => DialogField::Group,
            DialogField::Name => DialogField::Url,
            DialogField::Group => DialogField::Name,
        }
    }
}

/// Single-line input with a byte cursor on a char boundary
#[derive(Debug, Default, Clone)]
struct TextField {
    value: String,
    cursor: usize,
}

impl TextField {
    fn set(&mut self, value: &str) {
        self.value = value.to_string();
        self.cursor = self.value.len();
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) => {
                self.value.insert(self.cursor, c);
                self.cursor += c.len_utf8();
            }
            KeyCode::Backspace => {
                let Some((prev, _)) = self.value[..self.cursor].char_indices().next_back() else {
                    return false;
                };
                self.value.drain(prev..self.cursor);
                self.cursor = prev;
            }
            KeyCode::Delete => {
                let Some(c) = self.value[self.cursor..].chars().next() else {
                    return false;
                };
                self.value.drain(self.cursor..self.cursor + c.len_utf8());
            }
            KeyCode::Left => {
                if let Some((prev, _)) = self.value[..self.cursor].char_indices().next_back() {
                    self.cursor = prev;
                }
            }
            KeyCode::Right => {
                if let Some(c) = self.value[self.cursor..].chars().next() {
                    self.cursor += c.len_utf8();
                }
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            _ => return false,
        }
        true
    }
}

/// Profile dialog state
pub struct ProfileDialog {
    visible: bool,
    /// Name of the profile being edited; `None` when adding
    original: Option<String>,
    /// Profile being edited, for fields the form does not show
    base: Option<ConnectionProfile>,
    url: TextField,
    name: TextField,
    group: TextField,
    focus: DialogField,
    error: Option<String>,
}

impl ProfileDialog {
    pub fn new() -> Self {
        Self {
            visible: false,
            original: None,
            base: None,
            url: TextField::default(),
            name: TextField::default(),
            group: TextField::default(),
            focus: DialogField::Url,
            error: None,
        }
    }

    /// Open an empty form, optionally with a URL already filled in
    pub fn show_add(&mut self, url: Option<&str>) {
        self.reset();
        self.visible = true;
        if let Some(url) = url {
            self.url.set(url);
        }
    }

    /// Open the form pre-filled from `profile`
    pub fn show_edit(&mut self, profile: &ConnectionProfile) {
        self.reset();
        self.visible = true;
        self.original = Some(profile.name.clone());
        self.url.set(&profile.to_url());
        self.name.set(&profile.name);
        self.group.set(profile.group.as_deref().unwrap_or(""));
        self.base = Some(profile.clone());
    }

    /// Hide and reset the dialog
    pub fn hide(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_editing(&self) -> bool {
        self.original.is_some()
    }

    /// Show an error under the form (e.g. a failed save)
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    /// Handle a key event, returning a DialogAction
    pub fn handle_key(&mut self, key: KeyEvent) -> DialogAction {
        match key.code {
            KeyCode::Esc => return DialogAction::Dismissed,
            KeyCode::Tab if key.modifiers == KeyModifiers::NONE => {
                self.focus = self.focus.next();
                return DialogAction::Consumed;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                return DialogAction::Consumed;
            }
            KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return match self.build() {
                    Ok(profile) => DialogAction::Test(profile),
                    Err(e) => {
                        self.error = Some(e);
                        DialogAction::Consumed
                    }
                };
            }
            KeyCode::Enter => {
                return match self.build() {
                    Ok(profile) => DialogAction::Save {
                        original: self.original.clone(),
                        profile,
                    },
                    Err(e) => {
                        self.error = Some(e);
                        DialogAction::Consumed
                    }
                };
            }
            _ => {}
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return DialogAction::Consumed;
        }
        let field = match self.focus {
            DialogField::Url => &mut self.url,
            DialogField::Name => &mut self.name,
            DialogField::Group => &mut self.group,
        };
        if field.handle_key(key) {
            self.error = None;
        }
        DialogAction::Consumed
    }

    /// Turn the form into a validated profile
    fn build(&self) -> Result<ConnectionProfile, String> {
        if self.url.value.trim().is_empty() {
            return Err("URL is required".to_string());
        }
        let mut profile = ConnectionProfile::from_url(&self.url.value).map_err(|e| e.to_string())?;

        let name = self.name.value.trim();
        if !name.is_empty() {
            profile.name = name.to_string();
        }
        let group = self.group.value.trim();
        profile.group = (!group.is_empty()).then(|| group.to_string());

        match (&self.base, &mut profile.engine) {
            (Some(base), engine) => {
                profile.usage_count = base.usage_count;
                if let (EngineConfig::Sqlite(old), EngineConfig::Sqlite(new)) = (&base.engine, engine) {
                    new.create_if_missing = old.create_if_missing;
                }
            }
            // a path typed into the add form is meant to exist afterwards
            (None, EngineConfig::Sqlite(cfg)) => cfg.create_if_missing = true,
            (None, EngineConfig::Postgres(_)) => {}
        }

        profile.validate().map_err(|e| e.to_string())?;
        Ok(profile)
    }

    /// Render the dialog centered over `area`
    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let title = if self.is_editing() {
            " Edit connection "
        } else {
            " Add connection "
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(theme.dialog_border);
        let inner = block.inner(area);
        frame.render_widget(Clear, area);
        frame.render_widget(block, area);

        if inner.height < 4 || inner.width < 20 {
            return;
        }

        let x = inner.x + 1;
        let width = inner.width.saturating_sub(2);
        let mut y = inner.y;

        for (label, field, focus) in [
            ("  URL:   ", &self.url, DialogField::Url),
            ("  Name:  ", &self.name, DialogField::Name),
            ("  Group: ", &self.group, DialogField::Group),
        ] {
            let focused = self.focus == focus;
            let input_width = width.saturating_sub(label.len() as u16) as usize;
            let visible = visible_slice(&field.value, field.cursor, input_width);
            let style = if focused {
                theme.dialog_input_focused
            } else {
                theme.dialog_input
            };
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(label, theme.dialog_label),
                    Span::styled(visible.text, style),
                ])),
                Rect::new(x, y, width, 1),
            );
            if focused {
                let cursor_x = x + label.len() as u16 + visible.cursor_offset as u16;
                frame.set_cursor_position((cursor_x.min(x + width.saturating_sub(1)), y));
            }
            y += 1;
        }

        y += 1;
        if let Some(ref err) = self.error {
            let msg: String = err.chars().take(width.saturating_sub(2) as usize).collect();
            frame.render_widget(
                Paragraph::new(Span::styled(format!("  {}", msg), theme.status_error)),
                Rect::new(x, y, width, 1),
            );
        }

        let bottom = inner.y + inner.height;
        if bottom >= 2 && bottom - 2 > y {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "  Enter=save  Ctrl+T=test  Tab=next field  Esc=cancel",
                    theme.dialog_hint,
                )),
                Rect::new(x, bottom - 2, width, 1),
            );
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "  \u{26a0} Passwords are stored in plaintext",
                    theme.dialog_warning,
                )),
                Rect::new(x, bottom - 1, width, 1),
            );
        }
    }
}

impl Default for ProfileDialog {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper for showing a visible slice of a string with cursor position
struct VisibleSlice {
    text: String,
    cursor_offset: usize,
}

/// The part of `input` that fits within `width` chars while keeping the
/// cursor (a byte offset) on screen
fn visible_slice(input: &str, cursor: usize, width: usize) -> VisibleSlice {
    let cursor_chars = input[..cursor].chars().count();
    let total = input.chars().count();
    if total <= width {
        return VisibleSlice {
            text: input.to_string(),
            cursor_offset: cursor_chars,
        };
    }
    let start = (cursor_chars + 1).saturating_sub(width);
    VisibleSlice {
        text: input.chars().skip(start).take(width).collect(),
        cursor_offset: cursor_chars - start,
    }
}
