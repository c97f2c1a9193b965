//! Panel layout management
//!
//! Left column: connections over the schema tree. Right column: tab bar,
//! editor and results. A single status/command line runs along the bottom.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Narrowest the left column gets before the editor side starves
const MIN_SIDEBAR: u16 = 24;

/// Screen areas for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppLayout {
    pub connections: Rect,
    pub schema: Rect,
    pub tabs: Rect,
    pub editor: Rect,
    pub results: Rect,
    pub command: Rect,
}

impl AppLayout {
    /// Split `area`, giving the connections panel room for `profile_count`
    /// entries (bounded to a third of the height).
    pub fn new(area: Rect, profile_count: usize) -> Self {
        let [main, command] = split_vertical(area, [Constraint::Min(3), Constraint::Length(1)]);

        let sidebar = (main.width / 4).max(MIN_SIDEBAR).min(main.width / 2);
        let [left, right] = split_horizontal(main, [Constraint::Length(sidebar), Constraint::Min(10)]);

        // borders take two rows
        let wanted = profile_count.max(1) as u16 + 2;
        let conn_height = wanted.min(left.height / 3).max(3.min(left.height));
        let [connections, schema] = split_vertical(left, [Constraint::Length(conn_height), Constraint::Min(0)]);

        let [tabs, editor, results] = split_vertical(
            right,
            [
                Constraint::Length(1),
                Constraint::Percentage(40),
                Constraint::Min(3),
            ],
        );

        Self {
            connections,
            schema,
            tabs,
            editor,
            results,
            command,
        }
    }
}

/// Centered rect for overlays, `percent_x` wide and `height` rows tall
pub fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = (area.width * percent_x / 100).min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn split_vertical<const N: usize>(area: Rect, constraints: [Constraint; N]) -> [Rect; N] {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .areas(area)
}

fn split_horizontal<const N: usize>(area: Rect, constraints: [Constraint; N]) -> [Rect; N] {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .areas(area)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_covers_screen() {
        let area = Rect::new(0, 0, 120, 40);
        let layout = AppLayout::new(area, 3);

        assert_eq!(layout.command.height, 1);
        assert_eq!(layout.command.y, 39);
        assert_eq!(layout.tabs.height, 1);
        assert_eq!(layout.connections.x, 0);
        assert_eq!(layout.tabs.x, layout.editor.x);
        assert_eq!(layout.connections.width + layout.editor.width, 120);
        assert_eq!(
            layout.tabs.height + layout.editor.height + layout.results.height,
            39
        );
    }

    #[test]
    fn test_connections_panel_sized_to_profiles() {
        let area = Rect::new(0, 0, 120, 60);
        let small = AppLayout::new(area, 2);
        let large = AppLayout::new(area, 50);
        assert_eq!(small.connections.height, 4);
        assert_eq!(large.connections.height, 59 / 3);
    }

    #[test]
    fn test_sidebar_minimum_width() {
        let layout = AppLayout::new(Rect::new(0, 0, 80, 24), 1);
        assert_eq!(layout.connections.width, MIN_SIDEBAR);
    }

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 100, 50);
        let r = centered_rect(60, 10, area);
        assert_eq!(r, Rect::new(20, 20, 60, 10));
    }
}
