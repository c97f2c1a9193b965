//! Query editor widget
//!
//! Key handling and rendering for a tab's [`TextBuffer`]. The buffer lives
//! in the tab, so this module works on a borrowed buffer rather than owning
//! one.

use crate::editor::TextBuffer;
use crate::ui::ComponentAction;
use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Apply an editing key to `buffer`. Keys with Ctrl/Alt are left to the
/// keymap.
pub fn handle_key(buffer: &mut TextBuffer, key: KeyEvent) -> ComponentAction {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return ComponentAction::Ignored;
    }
    match key.code {
        KeyCode::Char(c) => buffer.insert_char(c),
        KeyCode::Enter => buffer.newline(),
        KeyCode::Backspace => buffer.backspace(),
        KeyCode::Delete => buffer.delete(),
        KeyCode::Left => buffer.move_left(),
        KeyCode::Right => buffer.move_right(),
        KeyCode::Up => buffer.move_up(),
        KeyCode::Down => buffer.move_down(),
        KeyCode::Home => buffer.home(),
        KeyCode::End => buffer.end(),
        _ => return ComponentAction::Ignored,
    }
    ComponentAction::Consumed
}

/// Draw `buffer`, scrolled so the cursor stays visible
pub fn render(buffer: &TextBuffer, frame: &mut Frame, area: Rect, focused: bool, theme: &Theme) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    if buffer.is_blank() && buffer.lines().len() == 1 && !focused {
        frame.render_widget(
            Paragraph::new("-- write SQL here, F5 or Ctrl+Enter runs it").style(theme.editor_placeholder),
            area,
        );
        return;
    }

    let (row, col) = buffer.cursor();
    let height = area.height as usize;
    let top = row.saturating_sub(height - 1);

    let cursor_line = &buffer.lines()[row];
    let cursor_x = prefix_width(cursor_line, col);
    let width = area.width as usize;
    // leave the last cell for the cursor itself
    let left = cursor_x.saturating_sub(width - 1);

    let lines: Vec<Line> = buffer
        .lines()
        .iter()
        .skip(top)
        .take(height)
        .map(|line| Line::styled(clip_columns(line, left, width), theme.editor_text))
        .collect();
    frame.render_widget(Paragraph::new(lines), area);

    if focused {
        frame.set_cursor_position((
            area.x + (cursor_x - left) as u16,
            area.y + (row - top) as u16,
        ));
    }
}

/// Display width of the first `chars` characters
fn prefix_width(line: &str, chars: usize) -> usize {
    line.chars().take(chars).map(|c| c.width().unwrap_or(0)).sum()
}

/// The part of `line` between display columns `left` and `left + width`
fn clip_columns(line: &str, left: usize, width: usize) -> String {
    if left == 0 && line.width() <= width {
        return line.to_string();
    }
    let mut out = String::new();
    let mut x = 0;
    for c in line.chars() {
        let w = c.width().unwrap_or(0);
        if x >= left && x + w <= left + width {
            out.push(c);
        }
        x += w;
        if x >= left + width {
            break;
        }
    }
    out
}
