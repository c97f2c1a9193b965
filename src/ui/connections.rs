//! Connections panel
//!
//! Lists saved profiles in manager order with an open/closed marker. Keys
//! here are shortcuts for the profile commands.

use crate::config::ConnectionProfile;
use crate::keymap::KeyAction;
use crate::ui::theme::Theme;
use crate::ui::{Component, ComponentAction, scroll_into_view};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use std::collections::HashSet;

pub struct ConnectionsPanel {
    profiles: Vec<ConnectionProfile>,
    open: HashSet<String>,
    selected: usize,
}

impl ConnectionsPanel {
    pub fn new() -> Self {
        Self {
            profiles: Vec::new(),
            open: HashSet::new(),
            selected: 0,
        }
    }

    /// Replace the list, keeping the selection on the same profile name
    pub fn set_profiles(&mut self, profiles: Vec<ConnectionProfile>, open: Vec<String>) {
        let current = self.selected_name().map(str::to_string);
        self.profiles = profiles;
        self.open = open.into_iter().collect();
        self.selected = current
            .and_then(|name| self.profiles.iter().position(|p| p.name == name))
            .unwrap_or(0)
            .min(self.profiles.len().saturating_sub(1));
    }

    pub fn set_open(&mut self, name: &str, open: bool) {
        if open {
            self.open.insert(name.to_string());
        } else {
            self.open.remove(name);
        }
    }

    pub fn profiles(&self) -> &[ConnectionProfile] {
        &self.profiles
    }

    pub fn get(&self, name: &str) -> Option<&ConnectionProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.open.contains(name)
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.profiles.get(self.selected).map(|p| p.name.as_str())
    }

    pub fn navigate(&mut self, action: KeyAction) -> bool {
        let count = self.profiles.len();
        match action {
            KeyAction::MoveUp => self.selected = self.selected.saturating_sub(1),
            KeyAction::MoveDown => {
                if self.selected + 1 < count {
                    self.selected += 1;
                }
            }
            KeyAction::GoToTop => self.selected = 0,
            KeyAction::GoToBottom => self.selected = count.saturating_sub(1),
            _ => return false,
        }
        true
    }
}

impl Default for ConnectionsPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ConnectionsPanel {
    fn handle_key(&mut self, key: KeyEvent) -> ComponentAction {
        if key.code == KeyCode::Char('a') {
            return ComponentAction::ExecuteCommand("add".to_string());
        }
        let Some(name) = self.selected_name().map(str::to_string) else {
            return ComponentAction::Ignored;
        };
        let command = match key.code {
            KeyCode::Enter => return ComponentAction::UseProfile(name),
            KeyCode::Char('c') => "connect",
            KeyCode::Char('x') => "disconnect",
            KeyCode::Char('e') => "edit",
            KeyCode::Char('d') => "delete",
            KeyCode::Char('t') => "test",
            _ => return ComponentAction::Ignored,
        };
        ComponentAction::ExecuteCommand(format!("{} {}", command, name))
    }

    fn render(&self, frame: &mut Frame, area: Rect, focused: bool, theme: &Theme) {
        if area.height == 0 {
            return;
        }
        if self.profiles.is_empty() {
            frame.render_widget(
                Paragraph::new("No connections. Press a to add.").style(theme.tree_hint),
                area,
            );
            return;
        }

        let height = area.height as usize;
        let offset = scroll_into_view(self.selected, 0, height);
        let lines: Vec<Line> = self
            .profiles
            .iter()
            .enumerate()
            .skip(offset)
            .take(height)
            .map(|(i, profile)| {
                let open = self.open.contains(&profile.name);
                let (marker, marker_style) = if open {
                    ("\u{25cf} ", theme.connection_open)
                } else {
                    ("\u{25cb} ", theme.connection_detail)
                };
                let name_style = if focused && i == self.selected {
                    theme.connection_selected
                } else {
                    theme.connection_name
                };
                let mut spans = vec![
                    Span::styled(marker, marker_style),
                    Span::styled(profile.name.clone(), name_style),
                    Span::styled(format!(" {}", profile.engine_kind()), theme.connection_detail),
                ];
                if let Some(ref group) = profile.group {
                    spans.push(Span::styled(format!(" [{}]", group), theme.connection_group));
                }
                Line::from(spans)
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> ConnectionsPanel {
        let mut panel = ConnectionsPanel::new();
        panel.set_profiles(
            vec![
                ConnectionProfile::sqlite("local", "/tmp/local.db"),
                ConnectionProfile::postgres("prod", "db.example.com", "app", "alice").with_group("work"),
            ],
            vec!["prod".to_string()],
        );
        panel
    }

    #[test]
    fn test_selection_follows_name_across_reorder() {
        let mut panel = panel();
        panel.navigate(KeyAction::MoveDown);
        assert_eq!(panel.selected_name(), Some("prod"));

        let reordered = vec![
            ConnectionProfile::postgres("prod", "db.example.com", "app", "alice"),
            ConnectionProfile::sqlite("local", "/tmp/local.db"),
        ];
        panel.set_profiles(reordered, vec![]);
        assert_eq!(panel.selected_name(), Some("prod"));
        assert!(!panel.is_open("prod"));
    }

    #[test]
    fn test_selection_clamped_after_removal() {
        let mut panel = panel();
        panel.navigate(KeyAction::GoToBottom);
        panel.set_profiles(vec![ConnectionProfile::sqlite("local", "/tmp/local.db")], vec![]);
        assert_eq!(panel.selected_name(), Some("local"));
        panel.set_profiles(vec![], vec![]);
        assert_eq!(panel.selected_name(), None);
    }

    #[test]
    fn test_keys_map_to_commands() {
        let mut panel = panel();
        assert_eq!(
            panel.handle_key(KeyEvent::from(KeyCode::Enter)),
            ComponentAction::UseProfile("local".to_string())
        );
        assert_eq!(
            panel.handle_key(KeyEvent::from(KeyCode::Char('d'))),
            ComponentAction::ExecuteCommand("delete local".to_string())
        );
        assert_eq!(
            panel.handle_key(KeyEvent::from(KeyCode::Char('a'))),
            ComponentAction::ExecuteCommand("add".to_string())
        );
        assert_eq!(
            panel.handle_key(KeyEvent::from(KeyCode::Char('z'))),
            ComponentAction::Ignored
        );
    }

    #[test]
    fn test_open_markers() {
        let mut panel = panel();
        assert!(panel.is_open("prod"));
        panel.set_open("local", true);
        panel.set_open("prod", false);
        assert!(panel.is_open("local"));
        assert!(!panel.is_open("prod"));
    }
}
