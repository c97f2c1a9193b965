//! Help overlay: keybinding and command reference
//!
//! Displays all keybindings organized by panel context as a centered popup.

use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Help overlay showing keybinding reference
pub struct HelpOverlay {
    visible: bool,
    scroll_offset: usize,
}

/// Total number of content lines in the help text
const HELP_LINE_COUNT: usize = 60;

impl HelpOverlay {
    pub fn new() -> Self {
        Self {
            visible: false,
            scroll_offset: 0,
        }
    }

    pub fn show(&mut self) {
        self.visible = true;
        self.scroll_offset = 0;
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.scroll_offset = 0;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn scroll_up(&mut self) {
        if self.scroll_offset > 0 {
            self.scroll_offset -= 1;
        }
    }

    pub fn scroll_down(&mut self) {
        if self.scroll_offset + 1 < HELP_LINE_COUNT {
            self.scroll_offset += 1;
        }
    }

    pub fn page_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(20);
    }

    pub fn page_down(&mut self) {
        self.scroll_offset = (self.scroll_offset + 20).min(HELP_LINE_COUNT.saturating_sub(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = HELP_LINE_COUNT.saturating_sub(1);
    }

    /// Build styled help content lines
    fn build_lines<'a>(&self, theme: &Theme) -> Vec<Line<'a>> {
        let section = theme.help_section;
        let key = theme.help_key;
        let desc = theme.help_desc;
        let blank = Line::from("");

        vec![
            Line::from(Span::styled("Global", section)),
            help_line("  Ctrl+Q", "Quit", key, desc),
            help_line("  Tab / Shift+Tab", "Cycle panel focus", key, desc),
            help_line("  Ctrl+P  /", "Command bar", key, desc),
            help_line("  F1", "Help", key, desc),
            help_line("  Ctrl+T", "New worksheet tab", key, desc),
            help_line("  Ctrl+W", "Close tab", key, desc),
            help_line("  Ctrl+N / Ctrl+B", "Next / previous tab", key, desc),
            help_line("  Alt+1..9", "Jump to tab", key, desc),
            help_line("  Ctrl+R", "Refresh schema", key, desc),
            help_line("  Ctrl+C", "Cancel running query", key, desc),
            blank.clone(),
            Line::from(Span::styled("Connections", section)),
            help_line("  j/k  \u{2191}/\u{2193}", "Navigate", key, desc),
            help_line("  Enter", "Use for this tab", key, desc),
            help_line("  c / x", "Connect / disconnect", key, desc),
            help_line("  a / e / d", "Add / edit / delete", key, desc),
            help_line("  t", "Test connection", key, desc),
            blank.clone(),
            Line::from(Span::styled("Schema Tree", section)),
            help_line("  j/k  \u{2191}/\u{2193}", "Navigate", key, desc),
            help_line("  Enter  l", "Expand", key, desc),
            help_line("  Space", "Toggle expand", key, desc),
            help_line("  h", "Collapse / parent", key, desc),
            help_line("  p", "Preview first rows", key, desc),
            blank.clone(),
            Line::from(Span::styled("Editor", section)),
            help_line("  F5 / Ctrl+Enter", "Execute worksheet", key, desc),
            help_line("  Ctrl+L", "Clear editor", key, desc),
            blank.clone(),
            Line::from(Span::styled("Results", section)),
            help_line("  j/k  \u{2191}/\u{2193}", "Navigate rows", key, desc),
            help_line("  h/l  \u{2190}/\u{2192}", "Navigate columns", key, desc),
            help_line("  g / G", "Top / Bottom", key, desc),
            help_line("  Home / End", "First / Last column", key, desc),
            help_line("  PgUp / PgDn", "Page up / down", key, desc),
            blank.clone(),
            Line::from(Span::styled("Profile Dialog", section)),
            help_line("  Enter", "Save", key, desc),
            help_line("  Ctrl+T", "Test without saving", key, desc),
            help_line("  Esc", "Cancel", key, desc),
            blank.clone(),
            Line::from(Span::styled("Commands", section)),
            help_line("  /connect [name]", "Open a connection", key, desc),
            help_line("  /disconnect [name]", "Close a connection", key, desc),
            help_line("  /use <name>", "Bind this tab to a connection", key, desc),
            help_line("  /new [name]", "New tab", key, desc),
            help_line("  /close", "Close this tab", key, desc),
            help_line("  /add [url]", "Add a connection", key, desc),
            help_line("  /edit [name]", "Edit a connection", key, desc),
            help_line("  /delete <name>", "Delete a connection", key, desc),
            help_line("  /test [name]", "Test a connection", key, desc),
            help_line("  /preview <table> [all|first|last] [n]", "Preview rows", key, desc),
            help_line("  /refresh", "Reload schema", key, desc),
            help_line("  /cancel", "Cancel running query", key, desc),
            help_line("  /help", "Show this help", key, desc),
            help_line("  /quit", "Quit", key, desc),
            blank.clone(),
            Line::from(Span::styled("Esc or q closes this help", desc)),
            blank,
        ]
    }

    /// Render the help popup over `area`
    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .border_style(theme.border_focused);
        let inner = block.inner(area);
        frame.render_widget(Clear, area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let lines: Vec<Line> = self
            .build_lines(theme)
            .into_iter()
            .skip(self.scroll_offset)
            .take(inner.height as usize)
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

impl Default for HelpOverlay {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a single help line: "  key           description"
fn help_line<'a>(
    key_text: &'a str,
    desc_text: &'a str,
    key_style: Style,
    desc_style: Style,
) -> Line<'a> {
    let padded_key = format!("{:<24} ", key_text);
    Line::from(vec![
        Span::styled(padded_key, key_style),
        Span::styled(desc_text, desc_style),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_default_not_visible() {
        let help = HelpOverlay::new();
        assert!(!help.is_visible());
        assert_eq!(help.scroll_offset, 0);
    }

    #[test]
    fn test_help_show_hide() {
        let mut help = HelpOverlay::new();

        help.show();
        assert!(help.is_visible());

        help.scroll_down();
        assert_eq!(help.scroll_offset, 1);

        help.hide();
        assert!(!help.is_visible());
        assert_eq!(help.scroll_offset, 0);
    }

    #[test]
    fn test_help_scroll_boundaries() {
        let mut help = HelpOverlay::new();
        help.show();

        help.scroll_up();
        assert_eq!(help.scroll_offset, 0);

        help.scroll_to_bottom();
        assert_eq!(help.scroll_offset, HELP_LINE_COUNT - 1);
        help.scroll_down();
        assert_eq!(help.scroll_offset, HELP_LINE_COUNT - 1);

        help.scroll_to_top();
        help.page_down();
        assert_eq!(help.scroll_offset, 20);
        help.page_up();
        assert_eq!(help.scroll_offset, 0);
    }

    #[test]
    fn test_help_line_count_matches_content() {
        let help = HelpOverlay::new();
        let theme = Theme::default();
        let lines = help.build_lines(&theme);
        assert_eq!(
            lines.len(),
            HELP_LINE_COUNT,
            "HELP_LINE_COUNT constant ({}) doesn't match actual line count ({})",
            HELP_LINE_COUNT,
            lines.len()
        );
    }
}
