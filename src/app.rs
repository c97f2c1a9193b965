//! Application state and event handling
//!
//! Central state machine: events come in, state updates, actions go out.
//! Nothing in here talks to a database. An [`Action`] describes the work,
//! [`crate::dispatch::Dispatcher`] runs it on a background task and the
//! outcome comes back as an [`AppEvent`].

use crate::commands::{Command, parse_command};
use crate::config::{ConnectionProfile, Settings};
use crate::db::{QueryResults, SchemaNode};
use crate::error::{ConfigError, DbError, DbResult, Result};
use crate::keymap::{KeyAction, KeyMap};
use crate::sql::{PreviewKind, preview_query};
use crate::tabs::{Abandoned, ExecutionTicket, TabId, TabSet};
use crate::ui::command_bar::CommandBar;
use crate::ui::connections::ConnectionsPanel;
use crate::ui::dialog::{DialogAction, ProfileDialog};
use crate::ui::editor;
use crate::ui::help::HelpOverlay;
use crate::ui::results::ResultsViewer;
use crate::ui::theme::Theme;
use crate::ui::tree::TreeBrowser;
use crate::ui::{Component, ComponentAction};
use crossterm::event::{KeyCode, KeyEvent};
use std::collections::HashMap;

/// Main application state
pub struct App {
    /// Which panel currently has focus
    pub focus: PanelFocus,

    /// Focus before a modal was opened (restored on dismiss)
    pub previous_focus: PanelFocus,

    /// UI components
    pub connections: ConnectionsPanel,
    pub tree: TreeBrowser,
    pub command_bar: CommandBar,
    pub help: HelpOverlay,
    pub dialog: ProfileDialog,

    /// Worksheet tabs (text, binding, last results)
    pub tabs: TabSet,

    /// Grid state per tab; the results themselves live in the tab
    viewers: HashMap<TabId, ResultsViewer>,

    /// Row count for first/last previews
    preview_rows: usize,

    /// Data-driven keybinding configuration
    pub keymap: KeyMap,

    /// UI theme (created once, reused every frame)
    pub theme: Theme,

    /// Status message to display
    pub status_message: Option<StatusMessage>,

    /// Whether the application is running
    pub running: bool,
}

/// Panel focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelFocus {
    Connections,
    Schema,
    Editor,
    Results,
    CommandBar,
    Help,
    Dialog,
}

impl PanelFocus {
    /// Next panel in Tab order; modals stay put
    fn next(self) -> Self {
        match self {
            PanelFocus::Connections => PanelFocus::Schema,
            PanelFocus::Schema => PanelFocus::Editor,
            PanelFocus::Editor => PanelFocus::Results,
            PanelFocus::Results => PanelFocus::Connections,
            other => other,
        }
    }

    fn prev(self) -> Self {
        match self {
            PanelFocus::Connections => PanelFocus::Results,
            PanelFocus::Schema => PanelFocus::Connections,
            PanelFocus::Editor => PanelFocus::Schema,
            PanelFocus::Results => PanelFocus::Editor,
            other => other,
        }
    }

    pub fn is_modal(self) -> bool {
        matches!(
            self,
            PanelFocus::CommandBar | PanelFocus::Help | PanelFocus::Dialog
        )
    }
}

/// Status message with severity level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub message: String,
    pub level: StatusLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Application events from the event loop and background tasks
#[derive(Debug)]
pub enum AppEvent {
    /// Keyboard input event
    Key(KeyEvent),
    /// Bracketed paste event
    Paste(String),
    /// Terminal resize event
    Resize,
    /// Periodic redraw (running timers)
    Tick,
    /// An execution finished, successfully or not
    QueryFinished {
        tab_id: TabId,
        exec_id: u64,
        result: DbResult<QueryResults>,
    },
    /// A schema refresh finished
    SchemaLoaded {
        refresh_id: u64,
        result: DbResult<Vec<SchemaNode>>,
    },
    /// A connection attempt finished
    Connected {
        profile: String,
        result: DbResult<()>,
    },
    /// A connection was closed on request
    Disconnected { profile: String },
    /// A live connection dropped on its own
    ConnectionLost { profile: String, message: String },
    /// Fresh profile list after any change to the store or open set
    ProfilesChanged {
        profiles: Vec<ConnectionProfile>,
        open: Vec<String>,
    },
    /// A profile was saved from the dialog
    ProfileSaved {
        original: Option<String>,
        name: String,
    },
    /// A profile was deleted
    ProfileRemoved(String),
    /// Saving or deleting a profile failed
    ProfileError(String),
    /// A connection test finished
    TestFinished {
        profile: String,
        result: DbResult<()>,
    },
}

/// Actions returned by event handlers for the main loop to execute
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Run a tab's text on its profile
    Execute(ExecutionTicket),
    /// Stop an execution the tab no longer waits for
    Cancel(Abandoned),
    /// Reload the schema tree
    RefreshSchema { profile: String, refresh_id: u64 },
    /// Open (or reuse) a connection
    Open(String),
    /// Close a connection
    Close(String),
    /// Add a profile, or replace `original`
    SaveProfile {
        original: Option<String>,
        profile: ConnectionProfile,
    },
    RemoveProfile(String),
    TestProfile(ConnectionProfile),
    /// Several actions, run in order
    Batch(Vec<Action>),
    Quit,
    None,
}

impl App {
    /// Create an app over the saved profiles. `initial` binds the first tab.
    pub fn new(settings: &Settings, profiles: Vec<ConnectionProfile>, initial: Option<String>) -> Self {
        let mut connections = ConnectionsPanel::new();
        connections.set_profiles(profiles, Vec::new());
        let tabs = TabSet::new(settings.max_tabs, initial);
        let viewers = HashMap::from([(tabs.active().id(), ResultsViewer::new())]);

        Self {
            focus: PanelFocus::Editor,
            previous_focus: PanelFocus::Editor,
            connections,
            tree: TreeBrowser::new(),
            command_bar: CommandBar::new(),
            help: HelpOverlay::new(),
            dialog: ProfileDialog::new(),
            tabs,
            viewers,
            preview_rows: settings.preview_rows,
            keymap: KeyMap::default(),
            theme: Theme::new(),
            status_message: None,
            running: true,
        }
    }

    /// Handle an application event and return resulting action
    pub fn handle_event(&mut self, event: AppEvent) -> Result<Action> {
        match event {
            AppEvent::Key(key) => Ok(self.handle_key(key)),
            AppEvent::Paste(data) => {
                self.paste(&data);
                Ok(Action::None)
            }
            AppEvent::Resize | AppEvent::Tick => Ok(Action::None),
            AppEvent::QueryFinished {
                tab_id,
                exec_id,
                result,
            } => Ok(self.finish_query(tab_id, exec_id, result)),
            AppEvent::SchemaLoaded { refresh_id, result } => {
                let failure = result.as_ref().err().map(ToString::to_string);
                if !self.tree.apply(refresh_id, result) {
                    tracing::debug!(refresh_id, "dropping superseded schema refresh");
                    return Ok(Action::None);
                }
                match failure {
                    Some(err) => self.set_status(err, StatusLevel::Error),
                    None => self.set_status("Schema refreshed".to_string(), StatusLevel::Info),
                }
                Ok(Action::None)
            }
            AppEvent::Connected { profile, result } => match result {
                Ok(()) => {
                    self.connections.set_open(&profile, true);
                    self.set_status(format!("Connected to {}", profile), StatusLevel::Success);
                    if self.tabs.active().profile() == Some(profile.as_str()) {
                        Ok(self.refresh_schema(profile))
                    } else {
                        Ok(Action::None)
                    }
                }
                Err(e) => {
                    if self.tree.browser().profile() == Some(profile.as_str()) {
                        self.tree.clear();
                    }
                    self.set_status(format!("{}: {}", profile, e), StatusLevel::Error);
                    Ok(Action::None)
                }
            },
            AppEvent::Disconnected { profile } => {
                self.forget_connection(&profile);
                self.set_status(format!("Disconnected from {}", profile), StatusLevel::Info);
                Ok(Action::None)
            }
            AppEvent::ConnectionLost { profile, message } => {
                self.connections.set_open(&profile, false);
                self.tabs.mark_disconnected(&profile);
                self.set_status(
                    format!("Connection to {} lost: {}", profile, message),
                    StatusLevel::Error,
                );
                Ok(Action::None)
            }
            AppEvent::ProfilesChanged { profiles, open } => {
                self.connections.set_profiles(profiles, open);
                Ok(Action::None)
            }
            AppEvent::ProfileSaved { original, name } => {
                if let Some(old) = original.as_deref() {
                    // Saving an edit closes the old connection
                    self.forget_connection(old);
                    if old != name {
                        self.tabs.rename_profile(old, &name);
                    }
                }
                self.close_dialog();
                self.set_status(format!("Saved connection '{}'", name), StatusLevel::Success);
                Ok(self.sync_schema())
            }
            AppEvent::ProfileRemoved(name) => {
                if self.tree.browser().profile() == Some(name.as_str()) {
                    self.tree.clear();
                }
                self.set_status(format!("Deleted connection '{}'", name), StatusLevel::Info);
                Ok(Action::None)
            }
            AppEvent::ProfileError(message) => {
                if self.dialog.is_visible() {
                    self.dialog.set_error(message.clone());
                }
                self.set_status(message, StatusLevel::Error);
                Ok(Action::None)
            }
            AppEvent::TestFinished { profile, result } => {
                match result {
                    Ok(()) => self.set_status(
                        format!("Connection '{}' is reachable", profile),
                        StatusLevel::Success,
                    ),
                    Err(e) => {
                        if self.dialog.is_visible() {
                            self.dialog.set_error(e.to_string());
                        }
                        self.set_status(format!("{}: {}", profile, e), StatusLevel::Error);
                    }
                }
                Ok(Action::None)
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Action {
        self.status_message = None;

        // The profile dialog intercepts all keys when visible
        if self.focus == PanelFocus::Dialog {
            return match self.dialog.handle_key(key) {
                DialogAction::Save { original, profile } => Action::SaveProfile { original, profile },
                DialogAction::Test(profile) => {
                    self.set_status(format!("Testing '{}'...", profile.name), StatusLevel::Info);
                    Action::TestProfile(profile)
                }
                DialogAction::Dismissed => {
                    self.close_dialog();
                    Action::None
                }
                DialogAction::Consumed => Action::None,
            };
        }

        // Try KeyMap first: global bindings, then panel-specific
        if let Some(key_action) = self.keymap.resolve(self.focus, key) {
            // Suppress global actions that make no sense inside a modal, so
            // the key is swallowed instead of typed into the command bar.
            match key_action {
                KeyAction::OpenCommandBar if self.focus == PanelFocus::CommandBar => {
                    return Action::None;
                }
                KeyAction::CycleFocus
                | KeyAction::CycleFocusReverse
                | KeyAction::NewTab
                | KeyAction::CloseTab
                | KeyAction::NextTab
                | KeyAction::PrevTab
                | KeyAction::SelectTab(_)
                | KeyAction::RefreshSchema
                    if self.focus.is_modal() =>
                {
                    return Action::None;
                }
                KeyAction::ShowHelp if self.focus == PanelFocus::Help => {
                    return Action::None;
                }
                _ => return self.execute_key_action(key_action),
            }
        }

        // Fall through to the focused component
        let component_action = match self.focus {
            PanelFocus::Editor => editor::handle_key(&mut self.tabs.active_mut().buffer, key),
            PanelFocus::CommandBar => self.command_bar.handle_key(key),
            PanelFocus::Connections => self.connections.handle_key(key),
            PanelFocus::Schema => self.tree.handle_key(key),
            PanelFocus::Results | PanelFocus::Help | PanelFocus::Dialog => ComponentAction::Ignored,
        };
        self.process_component_action(component_action)
    }

    fn execute_key_action(&mut self, action: KeyAction) -> Action {
        match action {
            // ── Global ───────────────────────────────────────
            KeyAction::Quit => self.quit(),
            KeyAction::OpenCommandBar => {
                self.open_command_bar();
                Action::None
            }
            KeyAction::CycleFocus => {
                self.focus = self.focus.next();
                Action::None
            }
            KeyAction::CycleFocusReverse => {
                self.focus = self.focus.prev();
                Action::None
            }
            KeyAction::ShowHelp => {
                self.show_help();
                Action::None
            }
            KeyAction::NewTab => self.new_tab(None),
            KeyAction::CloseTab => self.close_tab(),
            KeyAction::NextTab => {
                self.tabs.select_next();
                self.sync_schema()
            }
            KeyAction::PrevTab => {
                self.tabs.select_prev();
                self.sync_schema()
            }
            KeyAction::SelectTab(index) => {
                self.tabs.select(index);
                self.sync_schema()
            }
            KeyAction::RefreshSchema => self.execute_command(Command::Refresh),
            KeyAction::CancelQuery => self.cancel_query(),

            // ── Navigation ───────────────────────────────────
            KeyAction::MoveUp
            | KeyAction::MoveDown
            | KeyAction::MoveLeft
            | KeyAction::MoveRight
            | KeyAction::PageUp
            | KeyAction::PageDown
            | KeyAction::GoToTop
            | KeyAction::GoToBottom
            | KeyAction::Home
            | KeyAction::End => {
                self.navigate(action);
                Action::None
            }

            // ── Editor ───────────────────────────────────────
            KeyAction::ExecuteQuery => self.execute_active(),
            KeyAction::ClearEditor => {
                self.tabs.active_mut().buffer.clear();
                Action::None
            }

            // ── Tree ─────────────────────────────────────────
            KeyAction::ToggleExpand | KeyAction::Expand | KeyAction::Collapse => {
                self.tree.navigate(action);
                Action::None
            }

            // ── Modal (command bar, help) ────────────────────
            KeyAction::Dismiss => {
                match self.focus {
                    PanelFocus::CommandBar => self.command_bar.deactivate(),
                    PanelFocus::Help => self.help.hide(),
                    _ => return Action::None,
                }
                self.focus = self.previous_focus;
                Action::None
            }
            KeyAction::Submit => {
                if self.focus != PanelFocus::CommandBar {
                    return Action::None;
                }
                let input = self.command_bar.submit();
                self.focus = self.previous_focus;
                if input.trim().is_empty() {
                    return Action::None;
                }
                self.run_command_line(&input)
            }
        }
    }

    fn navigate(&mut self, action: KeyAction) {
        match self.focus {
            PanelFocus::Connections => {
                self.connections.navigate(action);
            }
            PanelFocus::Schema => {
                self.tree.navigate(action);
            }
            PanelFocus::Results => {
                self.active_viewer_mut().navigate(action);
            }
            PanelFocus::Help => match action {
                KeyAction::MoveUp => self.help.scroll_up(),
                KeyAction::MoveDown => self.help.scroll_down(),
                KeyAction::PageUp => self.help.page_up(),
                KeyAction::PageDown => self.help.page_down(),
                KeyAction::GoToTop => self.help.scroll_to_top(),
                KeyAction::GoToBottom => self.help.scroll_to_bottom(),
                _ => {}
            },
            PanelFocus::Editor | PanelFocus::CommandBar | PanelFocus::Dialog => {}
        }
    }

    fn process_component_action(&mut self, action: ComponentAction) -> Action {
        match action {
            ComponentAction::Consumed | ComponentAction::Ignored => Action::None,
            ComponentAction::ExecuteCommand(cmd) => self.run_command_line(&cmd),
            ComponentAction::DismissCommandBar => {
                self.command_bar.deactivate();
                self.focus = self.previous_focus;
                Action::None
            }
            ComponentAction::UseProfile(name) => self.execute_command(Command::Use(name)),
            ComponentAction::PreviewRelation(relation) => {
                self.preview(&relation, PreviewKind::First(self.preview_rows))
            }
        }
    }

    fn paste(&mut self, data: &str) {
        match self.focus {
            PanelFocus::Editor => self.tabs.active_mut().buffer.insert_text(data),
            PanelFocus::CommandBar => {
                for c in data.chars().filter(|c| !c.is_control()) {
                    self.command_bar.insert_char(c);
                }
            }
            PanelFocus::Dialog => {
                for c in data.chars().filter(|c| !c.is_control()) {
                    self.dialog.handle_key(KeyEvent::from(KeyCode::Char(c)));
                }
            }
            _ => {}
        }
    }

    // ── Commands ─────────────────────────────────────────────

    fn run_command_line(&mut self, input: &str) -> Action {
        match parse_command(input) {
            Ok(cmd) => self.execute_command(cmd),
            Err(e) => {
                self.set_status(e.to_string(), StatusLevel::Error);
                Action::None
            }
        }
    }

    /// Apply a parsed command
    pub fn execute_command(&mut self, cmd: Command) -> Action {
        match cmd {
            Command::Refresh => {
                let Some(profile) = self.tabs.active().profile().map(str::to_string) else {
                    self.set_status(
                        "No connection selected for this tab".to_string(),
                        StatusLevel::Warning,
                    );
                    return Action::None;
                };
                if self.connections.is_open(&profile) {
                    self.refresh_schema(profile)
                } else {
                    // Connected triggers the refresh
                    self.connect(profile)
                }
            }
            Command::Connect(name) => {
                let Some(name) = self.target_profile(name) else {
                    self.set_status("No connection selected".to_string(), StatusLevel::Warning);
                    return Action::None;
                };
                if !self.require_profile(&name) {
                    return Action::None;
                }
                if self.tabs.active().profile().is_none() {
                    let id = self.tabs.active().id();
                    // Nothing can be running on an unbound tab
                    let _ = self.tabs.set_profile(id, &name);
                }
                self.connect(name)
            }
            Command::Disconnect(name) => {
                let Some(name) = self.target_profile(name) else {
                    self.set_status("No connection selected".to_string(), StatusLevel::Warning);
                    return Action::None;
                };
                if !self.connections.is_open(&name) {
                    self.set_status(format!("'{}' is not connected", name), StatusLevel::Info);
                    return Action::None;
                }
                Action::Close(name)
            }
            Command::Use(name) => {
                if !self.require_profile(&name) {
                    return Action::None;
                }
                let id = self.tabs.active().id();
                if let Err(e) = self.tabs.set_profile(id, &name) {
                    self.set_status(e.to_string(), StatusLevel::Warning);
                    return Action::None;
                }
                self.focus = PanelFocus::Editor;
                let refresh = self.sync_schema();
                if self.connections.is_open(&name) {
                    self.set_status(format!("Using {}", name), StatusLevel::Info);
                    refresh
                } else {
                    self.connect(name)
                }
            }
            Command::NewTab(name) => self.new_tab(name),
            Command::CloseTab => self.close_tab(),
            Command::Add(url) => {
                self.dialog.show_add(url.as_deref());
                self.open_dialog();
                Action::None
            }
            Command::Edit(name) => {
                let Some(name) = self.target_profile(name) else {
                    self.set_status("No connection selected".to_string(), StatusLevel::Warning);
                    return Action::None;
                };
                let Some(profile) = self.connections.get(&name).cloned() else {
                    self.unknown_profile(&name);
                    return Action::None;
                };
                self.dialog.show_edit(&profile);
                self.open_dialog();
                Action::None
            }
            Command::Delete(name) => {
                if !self.require_profile(&name) {
                    return Action::None;
                }
                if self.tabs.references(&name) {
                    self.set_status(
                        ConfigError::ProfileInUse(name).to_string(),
                        StatusLevel::Error,
                    );
                    return Action::None;
                }
                Action::RemoveProfile(name)
            }
            Command::Test(name) => {
                let Some(name) = self.target_profile(name) else {
                    self.set_status("No connection selected".to_string(), StatusLevel::Warning);
                    return Action::None;
                };
                let Some(profile) = self.connections.get(&name).cloned() else {
                    self.unknown_profile(&name);
                    return Action::None;
                };
                self.set_status(format!("Testing '{}'...", name), StatusLevel::Info);
                Action::TestProfile(profile)
            }
            Command::Preview {
                relation,
                mode,
                limit,
            } => match PreviewKind::parse(&mode, limit.unwrap_or(self.preview_rows)) {
                Some(kind) => self.preview(&relation, kind),
                None => {
                    self.set_status(format!("Unknown preview mode '{}'", mode), StatusLevel::Error);
                    Action::None
                }
            },
            Command::Cancel => self.cancel_query(),
            Command::Clear => {
                self.tabs.active_mut().buffer.clear();
                Action::None
            }
            Command::Help => {
                self.show_help();
                Action::None
            }
            Command::Quit => self.quit(),
        }
    }

    /// Explicit name, else the active tab's profile, else the highlighted one
    fn target_profile(&self, name: Option<String>) -> Option<String> {
        name.or_else(|| self.tabs.active().profile().map(str::to_string))
            .or_else(|| self.connections.selected_name().map(str::to_string))
    }

    fn require_profile(&mut self, name: &str) -> bool {
        if self.connections.get(name).is_some() {
            return true;
        }
        self.unknown_profile(name);
        false
    }

    fn unknown_profile(&mut self, name: &str) {
        self.set_status(
            ConfigError::ProfileNotFound(name.to_string()).to_string(),
            StatusLevel::Error,
        );
    }

    fn connect(&mut self, name: String) -> Action {
        self.set_status(format!("Connecting to {}...", name), StatusLevel::Info);
        Action::Open(name)
    }

    fn quit(&mut self) -> Action {
        self.running = false;
        Action::Quit
    }

    // ── Tabs & execution ─────────────────────────────────────

    fn new_tab(&mut self, profile: Option<String>) -> Action {
        let profile = profile.or_else(|| self.tabs.active().profile().map(str::to_string));
        if let Some(name) = profile.as_deref()
            && !self.require_profile(name)
        {
            return Action::None;
        }
        match self.tabs.new_tab(profile) {
            Ok(id) => {
                self.viewers.insert(id, ResultsViewer::new());
                self.focus = PanelFocus::Editor;
                self.sync_schema()
            }
            Err(e) => {
                self.set_status(e.to_string(), StatusLevel::Warning);
                Action::None
            }
        }
    }

    fn close_tab(&mut self) -> Action {
        let id = self.tabs.active().id();
        match self.tabs.close_tab(id) {
            Ok(abandoned) => {
                self.viewers.remove(&id);
                let refresh = self.sync_schema();
                match abandoned {
                    Some(abandoned) => Action::Batch(vec![Action::Cancel(abandoned), refresh]),
                    None => refresh,
                }
            }
            Err(e) => {
                self.set_status(e.to_string(), StatusLevel::Warning);
                Action::None
            }
        }
    }

    fn execute_active(&mut self) -> Action {
        let id = self.tabs.active().id();
        match self.tabs.begin_execution(id) {
            Ok(ticket) => {
                tracing::debug!(tab_id = id, exec_id = ticket.exec_id, profile = %ticket.profile, "query submitted");
                self.set_status(format!("Running on {}...", ticket.profile), StatusLevel::Info);
                Action::Execute(ticket)
            }
            Err(e) => {
                self.set_status(e.to_string(), StatusLevel::Warning);
                Action::None
            }
        }
    }

    fn cancel_query(&mut self) -> Action {
        let id = self.tabs.active().id();
        match self.tabs.cancel(id) {
            Ok(Some(abandoned)) => {
                self.sync_viewer(id);
                self.set_status("Query cancelled".to_string(), StatusLevel::Warning);
                Action::Cancel(abandoned)
            }
            Ok(None) => {
                self.set_status("No query running".to_string(), StatusLevel::Info);
                Action::None
            }
            Err(e) => {
                self.set_status(e.to_string(), StatusLevel::Error);
                Action::None
            }
        }
    }

    fn finish_query(&mut self, tab_id: TabId, exec_id: u64, result: DbResult<QueryResults>) -> Action {
        let (message, level) = match &result {
            Ok(results) => {
                let ms = results.execution_time().as_secs_f64() * 1000.0;
                match results.rows_affected() {
                    Some(n) => (format!("{} rows affected in {:.1}ms", n, ms), StatusLevel::Success),
                    None => (format!("{} rows in {:.1}ms", results.row_count(), ms), StatusLevel::Success),
                }
            }
            Err(DbError::Cancelled) => ("Query cancelled".to_string(), StatusLevel::Warning),
            Err(e) => (e.to_string(), StatusLevel::Error),
        };
        let changed_schema = matches!(&result, Ok(r) if r.is_command());
        let reached_server = !matches!(
            &result,
            Err(DbError::ConnectionFailed(_) | DbError::NotConnected(_))
        );

        if !self.tabs.complete(tab_id, exec_id, result) {
            tracing::debug!(tab_id, exec_id, "dropping stale query completion");
            return Action::None;
        }
        self.sync_viewer(tab_id);

        let Some(tab) = self.tabs.get(tab_id) else {
            return Action::None;
        };
        let profile = tab.profile().map(str::to_string);
        if self.tabs.active().id() == tab_id {
            if self.focus == PanelFocus::Editor {
                self.focus = PanelFocus::Results;
            }
            self.set_status(message, level);
        } else {
            let title = tab.title().to_string();
            self.set_status(format!("{}: {}", title, message), level);
        }

        if reached_server && let Some(profile) = profile {
            self.connections.set_open(&profile, true);
            if changed_schema && self.tree.browser().profile() == Some(profile.as_str()) {
                return self.refresh_schema(profile);
            }
        }
        Action::None
    }

    fn preview(&mut self, relation: &str, kind: PreviewKind) -> Action {
        let Some(profile) = self.tree.browser().profile().map(str::to_string) else {
            self.set_status("Not connected".to_string(), StatusLevel::Warning);
            return Action::None;
        };
        let Some(engine) = self.connections.get(&profile).map(ConnectionProfile::engine_kind) else {
            self.unknown_profile(&profile);
            return Action::None;
        };
        let Some((schema, node)) = self.tree.browser().find(relation) else {
            self.set_status(format!("Unknown table or view '{}'", relation), StatusLevel::Error);
            return Action::None;
        };
        let sql = preview_query(engine, schema, node, kind);

        let tab = self.tabs.active_mut();
        if tab.is_running() {
            self.set_status(
                crate::error::TabError::AlreadyRunning.to_string(),
                StatusLevel::Warning,
            );
            return Action::None;
        }
        tab.buffer.set_text(&sql);
        self.execute_active()
    }

    // ── Schema & connections ─────────────────────────────────

    fn refresh_schema(&mut self, profile: String) -> Action {
        let refresh_id = self.tree.begin_refresh(&profile);
        Action::RefreshSchema {
            profile,
            refresh_id,
        }
    }

    /// Point the schema tree at the active tab's profile
    fn sync_schema(&mut self) -> Action {
        let Some(profile) = self.tabs.active().profile().map(str::to_string) else {
            self.tree.clear();
            return Action::None;
        };
        if self.tree.browser().profile() == Some(profile.as_str()) {
            return Action::None;
        }
        if self.connections.is_open(&profile) {
            self.refresh_schema(profile)
        } else {
            self.tree.clear();
            Action::None
        }
    }

    fn forget_connection(&mut self, profile: &str) {
        self.connections.set_open(profile, false);
        self.tabs.mark_disconnected(profile);
        if self.tree.browser().profile() == Some(profile) {
            self.tree.clear();
        }
    }

    // ── Viewers ──────────────────────────────────────────────

    fn sync_viewer(&mut self, id: TabId) {
        if let Some(tab) = self.tabs.get(id) {
            self.viewers
                .entry(id)
                .or_insert_with(ResultsViewer::new)
                .sync(tab.last_results(), tab.last_error());
        }
    }

    /// Grid state for the active tab
    pub fn active_viewer(&self) -> Option<&ResultsViewer> {
        self.viewers.get(&self.tabs.active().id())
    }

    fn active_viewer_mut(&mut self) -> &mut ResultsViewer {
        self.viewers
            .entry(self.tabs.active().id())
            .or_insert_with(ResultsViewer::new)
    }

    // ── Modals & status ──────────────────────────────────────

    fn open_command_bar(&mut self) {
        self.previous_focus = self.focus;
        self.focus = PanelFocus::CommandBar;
        self.command_bar.activate();
    }

    fn show_help(&mut self) {
        if self.focus != PanelFocus::Help {
            self.previous_focus = self.focus;
        }
        self.focus = PanelFocus::Help;
        self.help.show();
    }

    fn open_dialog(&mut self) {
        if self.focus != PanelFocus::Dialog {
            self.previous_focus = self.focus;
        }
        self.focus = PanelFocus::Dialog;
    }

    fn close_dialog(&mut self) {
        self.dialog.hide();
        if self.focus == PanelFocus::Dialog {
            self.focus = self.previous_focus;
        }
    }

    pub fn set_status(&mut self, message: String, level: StatusLevel) {
        self.status_message = Some(StatusMessage { message, level });
    }
}
