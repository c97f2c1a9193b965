//! Top-level render function
//!
//! Orchestrates rendering of all panels using the layout module.

use crate::app::{App, PanelFocus, StatusLevel};
use crate::ui::Component;
use crate::ui::dialog::DIALOG_HEIGHT;
use crate::ui::editor;
use crate::ui::layout::{AppLayout, centered_rect};
use crate::ui::results::ResultsViewer;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Render the entire application
pub fn render(frame: &mut Frame, app: &App) {
    let theme = &app.theme;
    let layout = AppLayout::new(frame.area(), app.connections.profiles().len());

    // Connections
    let inner = panel(frame, layout.connections, " Connections ", app.focus == PanelFocus::Connections, theme);
    app.connections
        .render(frame, inner, app.focus == PanelFocus::Connections, theme);

    // Schema tree
    let title = match app.tree.browser().profile() {
        Some(name) => format!(" Schema: {} ", name),
        None => " Schema ".to_string(),
    };
    let inner = panel(frame, layout.schema, &title, app.focus == PanelFocus::Schema, theme);
    app.tree.render(frame, inner, app.focus == PanelFocus::Schema, theme);

    render_tab_bar(frame, layout.tabs, app, theme);

    // Editor
    let tab = app.tabs.active();
    let title = match tab.profile() {
        Some(name) if tab.is_disconnected() => format!(" Query [{}: disconnected] ", name),
        Some(name) => format!(" Query [{}] ", name),
        None => " Query [no connection] ".to_string(),
    };
    let inner = panel(frame, layout.editor, &title, app.focus == PanelFocus::Editor, theme);
    editor::render(&tab.buffer, frame, inner, app.focus == PanelFocus::Editor, theme);

    // Results
    let title = match tab.running_for() {
        Some(elapsed) => format!(" Results (running {:.1}s, Ctrl+C cancels) ", elapsed.as_secs_f64()),
        None => " Results ".to_string(),
    };
    let inner = panel(frame, layout.results, &title, app.focus == PanelFocus::Results, theme);
    match app.active_viewer() {
        Some(viewer) => viewer.render(frame, inner, app.focus == PanelFocus::Results, theme),
        None => ResultsViewer::new().render(frame, inner, false, theme),
    }

    render_command_bar(frame, layout.command, app, theme);

    // Overlays
    if app.help.is_visible() {
        let area = centered_rect(70, frame.area().height.saturating_sub(4), frame.area());
        app.help.render(frame, area, theme);
    }
    if app.dialog.is_visible() {
        let area = centered_rect(60, DIALOG_HEIGHT, frame.area());
        app.dialog.render(frame, area, theme);
    }
}

/// Draw a bordered panel and return its inner area
fn panel(frame: &mut Frame, area: Rect, title: &str, focused: bool, theme: &Theme) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .border_style(theme.border_style(focused));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    inner
}

fn render_tab_bar(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let active = app.tabs.active_index();
    let mut spans = Vec::new();
    for (i, tab) in app.tabs.iter().enumerate() {
        let marker = if tab.is_running() {
            " ⟳"
        } else if tab.is_disconnected() {
            " ✗"
        } else {
            ""
        };
        let label = match tab.profile() {
            Some(profile) => format!(" {} ({}){} ", tab.title(), profile, marker),
            None => format!(" {}{} ", tab.title(), marker),
        };
        let style = if i == active {
            theme.tab_active
        } else if tab.is_running() {
            theme.tab_running
        } else {
            theme.tab_inactive
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw("│"));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_command_bar(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    if app.command_bar.is_active() {
        app.command_bar.render(frame, area, true, theme);
        return;
    }

    let conn_info = match app.tabs.active().profile() {
        Some(name) if app.connections.is_open(name) => format!("[{}]", name),
        Some(name) => format!("[{}: not connected]", name),
        None => "[no connection]".to_string(),
    };

    let paragraph = match app.status_message {
        Some(ref status) => {
            let style = match status.level {
                StatusLevel::Info => theme.status_info,
                StatusLevel::Success => theme.status_success,
                StatusLevel::Warning => theme.status_warning,
                StatusLevel::Error => theme.status_error,
            };
            Paragraph::new(format!("{} {}", conn_info, status.message)).style(style)
        }
        None => Paragraph::new(format!(
            "{} | / for commands, F1 for help, Ctrl+Q to quit",
            conn_info
        ))
        .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppEvent;
    use crate::config::{ConnectionProfile, Settings};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        let mut text = String::new();
        for row in buffer.content.chunks(width) {
            for cell in row {
                text.push_str(cell.symbol());
            }
            text.push('\n');
        }
        text
    }

    fn app() -> App {
        App::new(
            &Settings::default(),
            vec![ConnectionProfile::sqlite("notes", "/tmp/notes.db")],
            Some("notes".to_string()),
        )
    }

    #[test]
    fn test_renders_panels_and_tab_bar() {
        let text = screen(&app());
        assert!(text.contains("Connections"));
        assert!(text.contains("Worksheet 1 (notes)"));
        assert!(text.contains("Query [notes]"));
        assert!(text.contains("[notes: not connected]"));
    }

    #[test]
    fn test_renders_help_overlay() {
        let mut app = app();
        app.handle_event(AppEvent::Key(KeyEvent::new(KeyCode::F(1), KeyModifiers::NONE)))
            .unwrap();
        assert!(screen(&app).contains(" Help "));
    }

    #[test]
    fn test_renders_running_marker() {
        let mut app = app();
        app.tabs.active_mut().buffer.set_text("SELECT 1");
        app.handle_event(AppEvent::Key(KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE)))
            .unwrap();
        let text = screen(&app);
        assert!(text.contains("⟳"));
        assert!(text.contains("running"));
    }
}
