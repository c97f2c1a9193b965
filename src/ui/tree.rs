//! Database tree browser widget
//!
//! Renders the [`SchemaBrowser`] tree with expand/collapse state. Schemas
//! start expanded; tables and views start collapsed.

use crate::browser::SchemaBrowser;
use crate::db::schema::{NodeKind, SchemaNode};
use crate::error::DbResult;
use crate::keymap::KeyAction;
use crate::ui::theme::Theme;
use crate::ui::{Component, ComponentAction, scroll_into_view};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use std::collections::HashSet;

const PAGE_ROWS: usize = 10;

/// One visible line of the flattened tree
#[derive(Debug, Clone, PartialEq, Eq)]
struct TreeRow<'a> {
    depth: usize,
    /// `/`-joined names from the root, used as the expansion key
    path: String,
    /// `schema.name` or `name`, for relations only
    qualified: Option<String>,
    node: &'a SchemaNode,
}

/// Tree browser component
pub struct TreeBrowser {
    browser: SchemaBrowser,
    expanded: HashSet<String>,
    selected: usize,
    /// Profile whose tree the expansion state belongs to
    expanded_for: Option<String>,
}

impl TreeBrowser {
    pub fn new() -> Self {
        Self {
            browser: SchemaBrowser::new(),
            expanded: HashSet::new(),
            selected: 0,
            expanded_for: None,
        }
    }

    pub fn browser(&self) -> &SchemaBrowser {
        &self.browser
    }

    pub fn browser_mut(&mut self) -> &mut SchemaBrowser {
        &mut self.browser
    }

    /// Start a refresh for `profile` (see [`SchemaBrowser::begin`])
    pub fn begin_refresh(&mut self, profile: &str) -> u64 {
        self.browser.begin(profile)
    }

    /// Apply a finished refresh, keeping expansion state for the same
    /// profile. Returns false if the refresh was superseded.
    pub fn apply(&mut self, refresh_id: u64, result: DbResult<Vec<SchemaNode>>) -> bool {
        if !self.browser.apply(refresh_id, result) {
            return false;
        }
        let profile = self.browser.profile().map(str::to_string);
        if profile != self.expanded_for {
            self.expanded = self
                .browser
                .nodes()
                .iter()
                .filter(|n| n.kind == NodeKind::Schema)
                .map(|n| n.name.clone())
                .collect();
            self.selected = 0;
            self.expanded_for = profile;
        }
        self.clamp_selection();
        true
    }

    /// Forget the tree (its connection went away)
    pub fn clear(&mut self) {
        self.browser.clear();
        self.expanded.clear();
        self.expanded_for = None;
        self.selected = 0;
    }

    /// Qualified name of the selected table or view
    pub fn selected_relation(&self) -> Option<String> {
        self.rows()
            .into_iter()
            .nth(self.selected)
            .and_then(|r| r.qualified)
    }

    /// Apply a navigation or expansion action. Returns false for anything else.
    pub fn navigate(&mut self, action: KeyAction) -> bool {
        let count = self.rows().len();
        match action {
            KeyAction::MoveUp => self.selected = self.selected.saturating_sub(1),
            KeyAction::MoveDown => {
                if self.selected + 1 < count {
                    self.selected += 1;
                }
            }
            KeyAction::PageUp => self.selected = self.selected.saturating_sub(PAGE_ROWS),
            KeyAction::PageDown => {
                self.selected = (self.selected + PAGE_ROWS).min(count.saturating_sub(1))
            }
            KeyAction::GoToTop => self.selected = 0,
            KeyAction::GoToBottom => self.selected = count.saturating_sub(1),
            KeyAction::Expand => self.set_expanded(true),
            KeyAction::Collapse => self.collapse(),
            KeyAction::ToggleExpand => self.toggle_expand(),
            _ => return false,
        }
        true
    }

    pub fn toggle_expand(&mut self) {
        if let Some(path) = self.selected_expandable() {
            if !self.expanded.remove(&path) {
                self.expanded.insert(path);
            }
        }
    }

    fn set_expanded(&mut self, open: bool) {
        if let Some(path) = self.selected_expandable() {
            if open {
                self.expanded.insert(path);
            } else {
                self.expanded.remove(&path);
            }
        }
    }

    /// Collapse the selected node, or jump to its parent when it is a leaf
    /// or already collapsed
    fn collapse(&mut self) {
        let rows = self.rows();
        let Some(row) = rows.get(self.selected) else {
            return;
        };
        if self.expanded.contains(&row.path) {
            let path = row.path.clone();
            self.expanded.remove(&path);
            return;
        }
        if row.depth > 0
            && let Some(parent) = rows[..self.selected]
                .iter()
                .rposition(|r| r.depth + 1 == row.depth)
        {
            self.selected = parent;
        }
    }

    fn selected_expandable(&self) -> Option<String> {
        self.rows()
            .into_iter()
            .nth(self.selected)
            .filter(|r| !r.node.children.is_empty())
            .map(|r| r.path)
    }

    fn clamp_selection(&mut self) {
        let count = self.rows().len();
        self.selected = self.selected.min(count.saturating_sub(1));
    }

    fn rows(&self) -> Vec<TreeRow<'_>> {
        let mut rows = Vec::new();
        for node in self.browser.nodes() {
            self.flatten(node, 0, "", None, &mut rows);
        }
        rows
    }

    fn flatten<'a>(
        &self,
        node: &'a SchemaNode,
        depth: usize,
        parent_path: &str,
        schema: Option<&str>,
        out: &mut Vec<TreeRow<'a>>,
    ) {
        let path = if parent_path.is_empty() {
            node.name.clone()
        } else {
            format!("{}/{}", parent_path, node.name)
        };
        let qualified = node.is_relation().then(|| match schema {
            Some(s) => format!("{}.{}", s, node.name),
            None => node.name.clone(),
        });
        let open = self.expanded.contains(&path);
        out.push(TreeRow {
            depth,
            path: path.clone(),
            qualified,
            node,
        });
        if open {
            let child_schema = (node.kind == NodeKind::Schema).then_some(node.name.as_str());
            for child in &node.children {
                self.flatten(child, depth + 1, &path, child_schema.or(schema), out);
            }
        }
    }

    fn row_line<'a>(&self, row: &TreeRow<'a>, selected: bool, theme: &Theme) -> Line<'a> {
        let indent = "  ".repeat(row.depth);
        let marker = if row.node.children.is_empty() {
            "  "
        } else if self.expanded.contains(&row.path) {
            "\u{25be} "
        } else {
            "\u{25b8} "
        };
        let base = match row.node.kind {
            NodeKind::Schema => theme.tree_schema,
            NodeKind::Table => theme.tree_table,
            NodeKind::View => theme.tree_view,
            NodeKind::Column => theme.tree_column,
        };
        let name_style = if selected { theme.tree_selected } else { base };

        let mut spans = vec![
            Span::raw(format!("{}{}", indent, marker)),
            Span::styled(row.node.name.clone(), name_style),
        ];
        if row.node.kind == NodeKind::View {
            spans.push(Span::styled(" (view)", theme.tree_type));
        }
        if let Some(ref dt) = row.node.data_type {
            spans.push(Span::styled(format!(" {}", dt.display_name()), theme.tree_type));
        }
        if row.node.is_primary_key {
            spans.push(Span::styled(" PK", theme.tree_type));
        }
        Line::from(spans)
    }
}

impl Default for TreeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for TreeBrowser {
    fn handle_key(&mut self, key: KeyEvent) -> ComponentAction {
        match key.code {
            KeyCode::Char('p') => match self.selected_relation() {
                Some(name) => ComponentAction::PreviewRelation(name),
                None => ComponentAction::Consumed,
            },
            _ => ComponentAction::Ignored,
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect, focused: bool, theme: &Theme) {
        if area.height == 0 {
            return;
        }
        let rows = self.rows();

        if rows.is_empty() {
            let (text, style) = if let Some(err) = self.browser.error() {
                (err.to_string(), theme.tree_error)
            } else if self.browser.is_loading() {
                ("Loading schema...".to_string(), theme.tree_hint)
            } else if self.browser.profile().is_none() {
                ("Not connected (c on a connection opens it)".to_string(), theme.tree_hint)
            } else {
                ("No tables".to_string(), theme.tree_hint)
            };
            frame.render_widget(
                Paragraph::new(text)
                    .style(style)
                    .wrap(ratatui::widgets::Wrap { trim: true }),
                area,
            );
            return;
        }

        let height = area.height as usize;
        let offset = scroll_into_view(self.selected, 0, height);
        let lines: Vec<Line> = rows
            .iter()
            .enumerate()
            .skip(offset)
            .take(height)
            .map(|(i, row)| self.row_line(row, focused && i == self.selected, theme))
            .collect();
        frame.render_widget(Paragraph::new(lines), area);
    }
}
