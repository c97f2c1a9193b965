//! UI theme and styling
//!
//! Defines colors, styles, and visual appearance for all UI components.

use ratatui::style::{Color, Modifier, Style};

/// Application theme
#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    pub border_focused: Style,
    pub border_unfocused: Style,

    // Connections panel
    pub connection_name: Style,
    pub connection_open: Style,
    pub connection_group: Style,
    pub connection_detail: Style,
    pub connection_selected: Style,

    // Schema tree
    pub tree_schema: Style,
    pub tree_table: Style,
    pub tree_view: Style,
    pub tree_column: Style,
    pub tree_type: Style,
    pub tree_selected: Style,
    pub tree_error: Style,
    pub tree_hint: Style,

    // Tab bar
    pub tab_active: Style,
    pub tab_inactive: Style,
    pub tab_running: Style,

    // Query editor
    pub editor_text: Style,
    pub editor_placeholder: Style,

    // Results table
    pub results_header: Style,
    pub results_header_selected: Style,
    pub results_row_even: Style,
    pub results_row_odd: Style,
    pub results_selected: Style,
    pub results_null: Style,
    pub results_footer: Style,
    pub results_empty: Style,
    pub results_error_title: Style,
    pub results_error_text: Style,

    // Command bar
    pub command_prompt: Style,
    pub command_input: Style,

    // Profile dialog
    pub dialog_border: Style,
    pub dialog_label: Style,
    pub dialog_input: Style,
    pub dialog_input_focused: Style,
    pub dialog_hint: Style,
    pub dialog_warning: Style,

    // Help overlay
    pub help_section: Style,
    pub help_key: Style,
    pub help_desc: Style,

    // Status messages
    pub status_success: Style,
    pub status_error: Style,
    pub status_info: Style,
    pub status_warning: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            // Borders
            border_focused: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            border_unfocused: Style::default().fg(Color::DarkGray),

            // Connections
            connection_name: Style::default().fg(Color::White),
            connection_open: Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            connection_group: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            connection_detail: Style::default().fg(Color::DarkGray),
            connection_selected: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),

            // Tree browser
            tree_schema: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            tree_table: Style::default().fg(Color::Green),
            tree_view: Style::default().fg(Color::LightGreen),
            tree_column: Style::default().fg(Color::Gray),
            tree_type: Style::default().fg(Color::DarkGray),
            tree_selected: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            tree_error: Style::default().fg(Color::Red),
            tree_hint: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),

            // Tabs
            tab_active: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            tab_running: Style::default().fg(Color::Yellow),

            // Query editor
            editor_text: Style::default().fg(Color::White),
            editor_placeholder: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),

            // Results table
            results_header: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            results_header_selected: Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            results_row_even: Style::default().fg(Color::White),
            results_row_odd: Style::default().fg(Color::Gray),
            results_selected: Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow),
            results_null: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            results_footer: Style::default().fg(Color::DarkGray),
            results_empty: Style::default().fg(Color::DarkGray),
            results_error_title: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            results_error_text: Style::default().fg(Color::LightRed),

            // Command bar
            command_prompt: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            command_input: Style::default().fg(Color::White),

            // Dialog
            dialog_border: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            dialog_label: Style::default().fg(Color::Gray),
            dialog_input: Style::default().fg(Color::White),
            dialog_input_focused: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::UNDERLINED),
            dialog_hint: Style::default().fg(Color::DarkGray),
            dialog_warning: Style::default().fg(Color::Yellow),

            // Help
            help_section: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            help_key: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            help_desc: Style::default().fg(Color::Gray),

            // Status messages
            status_success: Style::default().fg(Color::Green),
            status_error: Style::default().fg(Color::Red),
            status_info: Style::default().fg(Color::Blue),
            status_warning: Style::default().fg(Color::Yellow),
        }
    }
}

impl Theme {
    /// Create a new theme with default colors
    pub fn new() -> Self {
        Self::default()
    }

    /// Get border style based on focus
    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            self.border_focused
        } else {
            self.border_unfocused
        }
    }
}
