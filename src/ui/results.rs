//! Query results viewer widget
//!
//! Displays a tab's result set in a scrollable grid with cell-level
//! selection. Command results show their affected-row count and a failed
//! execution shows its error in place of the grid.

use crate::db::types::{CellValue, QueryResults};
use crate::error::DbError;
use crate::keymap::KeyAction;
use crate::ui::theme::Theme;
use crate::ui::{Component, ComponentAction, scroll_into_view};
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Wrap};
use std::sync::Arc;
use unicode_truncate::{Alignment, UnicodeTruncateStr};
use unicode_width::UnicodeWidthStr;

/// Rows sampled when sizing columns
const WIDTH_SAMPLE_ROWS: usize = 100;
const MIN_COL_WIDTH: u16 = 4;
const MAX_COL_WIDTH: u16 = 40;
const PAGE_ROWS: usize = 20;

/// Results grid viewer for one tab
pub struct ResultsViewer {
    results: Option<Arc<QueryResults>>,
    selected_row: usize,
    selected_col: usize,
    scroll_offset: usize,
    h_scroll_offset: usize,
    /// Computed column widths
    col_widths: Vec<u16>,
    /// Last query error (shown in results area)
    error: Option<String>,
}

impl ResultsViewer {
    pub fn new() -> Self {
        Self {
            results: None,
            selected_row: 0,
            selected_col: 0,
            scroll_offset: 0,
            h_scroll_offset: 0,
            col_widths: Vec::new(),
            error: None,
        }
    }

    /// Display `results`. Selection resets only when the set actually changed.
    pub fn display(&mut self, results: Arc<QueryResults>) {
        if self
            .results
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &results))
        {
            return;
        }
        self.col_widths = compute_column_widths(&results);
        self.results = Some(results);
        self.selected_row = 0;
        self.selected_col = 0;
        self.scroll_offset = 0;
        self.h_scroll_offset = 0;
    }

    /// Mirror a tab's last results and last error
    pub fn sync(&mut self, results: Option<&Arc<QueryResults>>, error: Option<&DbError>) {
        match results {
            Some(r) => self.display(Arc::clone(r)),
            None => self.clear(),
        }
        self.error = error.map(|e| e.to_string());
    }

    /// Set an error to display in the results area. The previous results
    /// stay loaded underneath.
    pub fn set_error(&mut self, error: String) {
        self.error = Some(error);
    }

    pub fn clear(&mut self) {
        self.results = None;
        self.error = None;
        self.selected_row = 0;
        self.selected_col = 0;
        self.scroll_offset = 0;
        self.h_scroll_offset = 0;
        self.col_widths.clear();
    }

    pub fn results(&self) -> Option<&Arc<QueryResults>> {
        self.results.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Get text of the selected cell
    pub fn selected_cell_text(&self) -> Option<String> {
        let results = self.results.as_ref()?;
        let cell = results.cell(self.selected_row, self.selected_col)?;
        Some(cell.display_string(10000))
    }

    /// Apply a navigation action. Returns false for anything else.
    pub fn navigate(&mut self, action: KeyAction) -> bool {
        match action {
            KeyAction::MoveUp => self.move_up(),
            KeyAction::MoveDown => self.move_down(),
            KeyAction::MoveLeft => self.move_left(),
            KeyAction::MoveRight => self.move_right(),
            KeyAction::PageUp => self.page_up(),
            KeyAction::PageDown => self.page_down(),
            KeyAction::GoToTop => self.go_to_top(),
            KeyAction::GoToBottom => self.go_to_bottom(),
            KeyAction::Home => self.go_to_home(),
            KeyAction::End => self.go_to_end(),
            _ => return false,
        }
        true
    }

    pub fn move_up(&mut self) {
        if self.selected_row > 0 {
            self.selected_row -= 1;
        }
        self.scroll_offset = self.scroll_offset.min(self.selected_row);
    }

    pub fn move_down(&mut self) {
        let count = self.row_count();
        if count > 0 && self.selected_row < count - 1 {
            self.selected_row += 1;
        }
    }

    pub fn move_left(&mut self) {
        if self.selected_col > 0 {
            self.selected_col -= 1;
        }
    }

    pub fn move_right(&mut self) {
        let count = self.col_count();
        if self.selected_col < count.saturating_sub(1) {
            self.selected_col += 1;
        }
    }

    pub fn page_up(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(PAGE_ROWS);
        self.scroll_offset = self.scroll_offset.min(self.selected_row);
    }

    pub fn page_down(&mut self) {
        let count = self.row_count();
        self.selected_row = (self.selected_row + PAGE_ROWS).min(count.saturating_sub(1));
    }

    pub fn go_to_top(&mut self) {
        self.selected_row = 0;
        self.scroll_offset = 0;
    }

    pub fn go_to_bottom(&mut self) {
        let count = self.row_count();
        self.selected_row = count.saturating_sub(1);
    }

    pub fn go_to_home(&mut self) {
        self.selected_col = 0;
        self.h_scroll_offset = 0;
    }

    pub fn go_to_end(&mut self) {
        let count = self.col_count();
        self.selected_col = count.saturating_sub(1);
    }

    fn row_count(&self) -> usize {
        self.results.as_ref().map_or(0, |r| r.row_count())
    }

    fn col_count(&self) -> usize {
        self.results.as_ref().map_or(0, |r| r.columns().len())
    }

    /// First column to draw so that the selected one is fully visible
    fn horizontal_offset(&self, width: u16) -> usize {
        let widths = &self.col_widths;
        let col_width = |i: usize| widths.get(i).copied().unwrap_or(10);

        if self.selected_col < self.h_scroll_offset {
            return self.selected_col;
        }

        let mut x: u16 = 0;
        for ci in self.h_scroll_offset..widths.len() {
            let w = col_width(ci);
            if ci == self.selected_col {
                if x + w <= width {
                    return self.h_scroll_offset;
                }
                break;
            }
            x += w + 1;
            if x >= width {
                break;
            }
        }

        // scroll right to the smallest offset that still shows selected_col
        let mut offset = self.selected_col;
        let mut total = col_width(self.selected_col);
        while offset > 0 {
            let prev = col_width(offset - 1);
            if total + prev + 1 > width {
                break;
            }
            total += prev + 1;
            offset -= 1;
        }
        offset
    }

    fn render_message(&self, frame: &mut Frame, area: Rect, text: String, style: Style) {
        frame.render_widget(Paragraph::new(text).style(style), area);
    }
}

impl Default for ResultsViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ResultsViewer {
    /// Navigation arrives through the keymap; nothing else is handled here.
    fn handle_key(&mut self, _key: KeyEvent) -> ComponentAction {
        ComponentAction::Ignored
    }

    fn render(&self, frame: &mut Frame, area: Rect, focused: bool, theme: &Theme) {
        if let Some(ref error) = self.error {
            let lines: Vec<Line> = vec![
                Line::from(Span::styled("Query Error", theme.results_error_title)),
                Line::from(""),
                Line::from(Span::styled(error.as_str(), theme.results_error_text)),
            ];
            frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
            return;
        }

        let Some(results) = self.results.as_ref() else {
            self.render_message(
                frame,
                area,
                "No results yet. Write a query and press F5 to execute.".to_string(),
                theme.results_empty,
            );
            return;
        };

        if let Some(affected) = results.rows_affected() {
            self.render_message(
                frame,
                area,
                format!(
                    "{} rows affected ({:.1}ms)",
                    affected,
                    results.execution_time().as_secs_f64() * 1000.0
                ),
                theme.results_footer,
            );
            return;
        }

        if results.columns().is_empty() {
            self.render_message(
                frame,
                area,
                "Query returned no columns".to_string(),
                theme.results_empty,
            );
            return;
        }

        if area.height < 2 || area.width < 5 {
            return;
        }

        let visible_height = (area.height as usize).saturating_sub(2); // header + footer
        let scroll_offset = scroll_into_view(self.selected_row, self.scroll_offset, visible_height);
        let h_scroll = self.horizontal_offset(area.width);
        let right = area.x + area.width;
        let col_width = |i: usize, x: u16| {
            self.col_widths
                .get(i)
                .copied()
                .unwrap_or(10)
                .min(right - x)
        };

        // Header
        let mut x = area.x;
        for (col_idx, col_def) in results.columns().iter().enumerate().skip(h_scroll) {
            if x >= right {
                break;
            }
            let w = col_width(col_idx, x);
            let style = if focused && col_idx == self.selected_col {
                theme.results_header_selected
            } else {
                theme.results_header
            };
            frame.render_widget(
                Paragraph::new(fit(&col_def.name, w)).style(style),
                Rect::new(x, area.y, w, 1),
            );
            x += w + 1;
        }

        // Rows
        for (vis_row, row) in results
            .rows()
            .iter()
            .skip(scroll_offset)
            .take(visible_height)
            .enumerate()
        {
            let row_idx = scroll_offset + vis_row;
            let y = area.y + 1 + vis_row as u16;
            let row_style = if vis_row % 2 == 0 {
                theme.results_row_even
            } else {
                theme.results_row_odd
            };

            let mut x = area.x;
            for (col_idx, cell) in row.values.iter().enumerate().skip(h_scroll) {
                if x >= right {
                    break;
                }
                let w = col_width(col_idx, x);
                let style = if focused && row_idx == self.selected_row && col_idx == self.selected_col {
                    theme.results_selected
                } else if cell.is_null() {
                    theme.results_null
                } else {
                    row_style
                };
                frame.render_widget(
                    Paragraph::new(fit(&cell_text(cell), w)).style(style),
                    Rect::new(x, y, w, 1),
                );
                x += w + 1;
            }
        }

        let footer = format!(
            "Row {}/{} | Col {}/{} | {} rows | {:.1}ms",
            self.selected_row + 1,
            results.row_count(),
            self.selected_col + 1,
            results.columns().len(),
            results.row_count(),
            results.execution_time().as_secs_f64() * 1000.0,
        );
        frame.render_widget(
            Paragraph::new(footer).style(theme.results_footer),
            Rect::new(area.x, area.y + area.height - 1, area.width, 1),
        );
    }
}

/// Single-line text for a grid cell
fn cell_text(cell: &CellValue) -> String {
    cell.display_string(MAX_COL_WIDTH as usize * 2)
        .replace(['\n', '\r', '\t'], " ")
}

/// Pad or truncate to exactly `width` terminal columns
fn fit(text: &str, width: u16) -> String {
    text.unicode_pad(width as usize, Alignment::Left, true)
        .into_owned()
}

/// Compute column widths from header names and the first rows of data
fn compute_column_widths(results: &QueryResults) -> Vec<u16> {
    let mut widths: Vec<u16> = results
        .columns()
        .iter()
        .map(|c| c.name.width() as u16 + 1)
        .collect();

    for row in results.rows().iter().take(WIDTH_SAMPLE_ROWS) {
        for (w, cell) in widths.iter_mut().zip(&row.values) {
            let cell_width = cell_text(cell).width().min(u16::MAX as usize) as u16;
            *w = (*w).max(cell_width.saturating_add(1));
        }
    }

    for w in &mut widths {
        *w = (*w).clamp(MIN_COL_WIDTH, MAX_COL_WIDTH);
    }

    widths
}
