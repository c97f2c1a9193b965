//! Data-driven keybinding configuration
//!
//! All keybindings are defined as data in `KeyMap::default()`, not as match arms
//! scattered across components. To add a new binding, add an entry to the
//! appropriate context in `KeyMap::default()` and handle the `KeyAction` in
//! `App::execute_key_action()`. Keys that resolve to nothing fall through to
//! the focused component (text input in the editor and command bar).

use crate::app::PanelFocus;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

/// A key combination (code + modifiers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBind {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBind {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }
}

impl From<KeyEvent> for KeyBind {
    fn from(event: KeyEvent) -> Self {
        Self {
            code: event.code,
            modifiers: event.modifiers,
        }
    }
}

/// Semantic key actions: what a key means, not what key it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    // Global
    Quit,
    OpenCommandBar,
    CycleFocus,
    CycleFocusReverse,
    ShowHelp,
    NewTab,
    CloseTab,
    NextTab,
    PrevTab,
    /// Jump to a tab by zero-based position
    SelectTab(usize),
    RefreshSchema,
    CancelQuery,

    // Navigation (shared by lists, tree, results, help)
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    PageUp,
    PageDown,
    GoToTop,
    GoToBottom,
    Home,
    End,

    // Editor-specific
    ExecuteQuery,
    ClearEditor,

    // Tree-specific
    ToggleExpand,
    Expand,
    Collapse,

    // Modal dismiss/submit
    Dismiss,
    Submit,
}

/// Keybinding configuration: maps key combos to semantic actions per context.
pub struct KeyMap {
    /// Bindings that apply regardless of focus (checked first)
    global: HashMap<KeyBind, KeyAction>,
    /// Per-panel bindings (checked after global)
    panels: HashMap<PanelFocus, HashMap<KeyBind, KeyAction>>,
}

impl KeyMap {
    /// Resolve a key event to a semantic action.
    /// Checks global bindings first, then panel-specific bindings.
    pub fn resolve(&self, focus: PanelFocus, key: KeyEvent) -> Option<KeyAction> {
        let bind = KeyBind::from(key);
        if let Some(action) = self.global.get(&bind) {
            return Some(*action);
        }
        self.panels
            .get(&focus)
            .and_then(|m| m.get(&bind))
            .copied()
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        let mut global = HashMap::from([
            (KeyBind::ctrl('q'), KeyAction::Quit),
            (KeyBind::ctrl('p'), KeyAction::OpenCommandBar),
            (KeyBind::plain(KeyCode::Tab), KeyAction::CycleFocus),
            (
                KeyBind::new(KeyCode::BackTab, KeyModifiers::SHIFT),
                KeyAction::CycleFocusReverse,
            ),
            (KeyBind::plain(KeyCode::F(1)), KeyAction::ShowHelp),
            (KeyBind::ctrl('t'), KeyAction::NewTab),
            (KeyBind::ctrl('w'), KeyAction::CloseTab),
            (KeyBind::ctrl('n'), KeyAction::NextTab),
            (KeyBind::ctrl('b'), KeyAction::PrevTab),
            (KeyBind::ctrl('r'), KeyAction::RefreshSchema),
            (KeyBind::ctrl('c'), KeyAction::CancelQuery),
        ]);
        for (i, digit) in ('1'..='9').enumerate() {
            global.insert(
                KeyBind::new(KeyCode::Char(digit), KeyModifiers::ALT),
                KeyAction::SelectTab(i),
            );
        }

        let mut panels = HashMap::new();

        // ── Connections ──────────────────────────────────────────
        let mut connections = HashMap::new();
        insert_scroll_nav(&mut connections);
        insert_slash_command(&mut connections);
        panels.insert(PanelFocus::Connections, connections);

        // ── Schema tree ──────────────────────────────────────────
        let mut tree = HashMap::new();
        insert_scroll_nav(&mut tree);
        insert_slash_command(&mut tree);
        tree.insert(KeyBind::plain(KeyCode::Enter), KeyAction::Expand);
        tree.insert(KeyBind::plain(KeyCode::Char('l')), KeyAction::Expand);
        tree.insert(KeyBind::plain(KeyCode::Right), KeyAction::Expand);
        tree.insert(KeyBind::plain(KeyCode::Char('h')), KeyAction::Collapse);
        tree.insert(KeyBind::plain(KeyCode::Left), KeyAction::Collapse);
        tree.insert(KeyBind::plain(KeyCode::Char(' ')), KeyAction::ToggleExpand);
        panels.insert(PanelFocus::Schema, tree);

        // ── Editor ───────────────────────────────────────────────
        let editor = HashMap::from([
            (KeyBind::plain(KeyCode::F(5)), KeyAction::ExecuteQuery),
            (
                KeyBind::new(KeyCode::Enter, KeyModifiers::CONTROL),
                KeyAction::ExecuteQuery,
            ),
            (KeyBind::ctrl('l'), KeyAction::ClearEditor),
        ]);
        panels.insert(PanelFocus::Editor, editor);

        // ── Results ──────────────────────────────────────────────
        let mut results = HashMap::new();
        insert_vim_nav(&mut results);
        insert_slash_command(&mut results);
        results.insert(KeyBind::plain(KeyCode::F(5)), KeyAction::ExecuteQuery);
        panels.insert(PanelFocus::Results, results);

        // ── Help ─────────────────────────────────────────────────
        let mut help = HashMap::new();
        insert_scroll_nav(&mut help);
        help.insert(KeyBind::plain(KeyCode::Esc), KeyAction::Dismiss);
        help.insert(KeyBind::plain(KeyCode::Char('q')), KeyAction::Dismiss);
        panels.insert(PanelFocus::Help, help);

        // ── Command bar ──────────────────────────────────────────
        let command_bar = HashMap::from([
            (KeyBind::plain(KeyCode::Enter), KeyAction::Submit),
            (KeyBind::plain(KeyCode::Esc), KeyAction::Dismiss),
        ]);
        panels.insert(PanelFocus::CommandBar, command_bar);

        Self { global, panels }
    }
}

/// `/` opens the command bar outside text-entry panels
fn insert_slash_command(map: &mut HashMap<KeyBind, KeyAction>) {
    map.insert(KeyBind::plain(KeyCode::Char('/')), KeyAction::OpenCommandBar);
    map.insert(KeyBind::plain(KeyCode::Char(':')), KeyAction::OpenCommandBar);
}

/// Insert vim-style navigation bindings (arrows + hjkl + page + g/G + Home/End)
fn insert_vim_nav(map: &mut HashMap<KeyBind, KeyAction>) {
    insert_scroll_nav(map);

    map.insert(KeyBind::plain(KeyCode::Right), KeyAction::MoveRight);
    map.insert(KeyBind::plain(KeyCode::Char('l')), KeyAction::MoveRight);
    map.insert(KeyBind::plain(KeyCode::Left), KeyAction::MoveLeft);
    map.insert(KeyBind::plain(KeyCode::Char('h')), KeyAction::MoveLeft);
    map.insert(KeyBind::plain(KeyCode::Home), KeyAction::Home);
    map.insert(KeyBind::plain(KeyCode::End), KeyAction::End);
}

/// Insert vertical navigation bindings (arrows + jk + page + g/G)
fn insert_scroll_nav(map: &mut HashMap<KeyBind, KeyAction>) {
    map.insert(KeyBind::plain(KeyCode::Down), KeyAction::MoveDown);
    map.insert(KeyBind::plain(KeyCode::Char('j')), KeyAction::MoveDown);
    map.insert(KeyBind::plain(KeyCode::Up), KeyAction::MoveUp);
    map.insert(KeyBind::plain(KeyCode::Char('k')), KeyAction::MoveUp);
    map.insert(KeyBind::plain(KeyCode::PageDown), KeyAction::PageDown);
    map.insert(KeyBind::plain(KeyCode::PageUp), KeyAction::PageUp);
    map.insert(KeyBind::plain(KeyCode::Char('g')), KeyAction::GoToTop);
    map.insert(
        KeyBind::new(KeyCode::Char('G'), KeyModifiers::SHIFT),
        KeyAction::GoToBottom,
    );
    map.insert(KeyBind::plain(KeyCode::Home), KeyAction::GoToTop);
    map.insert(KeyBind::plain(KeyCode::End), KeyAction::GoToBottom);
}
