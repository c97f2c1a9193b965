//! Worksheet tabs
//!
//! Each tab owns a text buffer and remembers the profile it runs against.
//! Executions are numbered from one counter shared by all tabs; a tab only
//! accepts the completion for the execution it is currently waiting on, so
//! stale or cancelled results are dropped instead of overwriting newer ones.

use crate::db::QueryResults;
use crate::editor::TextBuffer;
use crate::error::{DbError, DbResult, TabError, TabResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Stable tab identifier (never reused)
pub type TabId = usize;

/// Whether a tab is waiting on the database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running { exec_id: u64, started: Instant },
}

/// One "Worksheet N" tab
#[derive(Debug)]
pub struct QueryTab {
    id: TabId,
    title: String,
    pub buffer: TextBuffer,
    profile: Option<String>,
    last_results: Option<Arc<QueryResults>>,
    last_error: Option<DbError>,
    run: RunState,
    /// Set when the tab's connection was closed under it
    disconnected: bool,
}

impl QueryTab {
    fn new(id: TabId, profile: Option<String>) -> Self {
        Self {
            id,
            title: String::new(),
            buffer: TextBuffer::new(),
            profile,
            last_results: None,
            last_error: None,
            run: RunState::Idle,
            disconnected: false,
        }
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    pub fn last_results(&self) -> Option<&Arc<QueryResults>> {
        self.last_results.as_ref()
    }

    pub fn last_error(&self) -> Option<&DbError> {
        self.last_error.as_ref()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.run, RunState::Running { .. })
    }

    /// How long the current execution has been running
    pub fn running_for(&self) -> Option<Duration> {
        match self.run {
            RunState::Running { started, .. } => Some(started.elapsed()),
            RunState::Idle => None,
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

/// Everything the background task needs to run one execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionTicket {
    pub exec_id: u64,
    pub tab_id: TabId,
    pub profile: String,
    pub sql: String,
}

/// An execution that was in flight when its tab gave it up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abandoned {
    pub exec_id: u64,
    pub profile: String,
}

/// The ordered set of open tabs
#[derive(Debug)]
pub struct TabSet {
    tabs: Vec<QueryTab>,
    active: usize,
    next_id: TabId,
    next_exec: u64,
    max_tabs: usize,
}

impl TabSet {
    /// Start with a single tab, optionally bound to `profile`
    pub fn new(max_tabs: usize, profile: Option<String>) -> Self {
        let mut set = Self {
            tabs: vec![QueryTab::new(0, profile)],
            active: 0,
            next_id: 1,
            next_exec: 1,
            max_tabs: max_tabs.max(1),
        };
        set.renumber();
        set
    }

    // ── Lookup ──────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryTab> {
        self.tabs.iter()
    }

    pub fn active(&self) -> &QueryTab {
        &self.tabs[self.active]
    }

    pub fn active_mut(&mut self) -> &mut QueryTab {
        &mut self.tabs[self.active]
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn get(&self, id: TabId) -> Option<&QueryTab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: TabId) -> Option<&mut QueryTab> {
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    fn index_of(&self, id: TabId) -> TabResult<usize> {
        self.tabs
            .iter()
            .position(|t| t.id == id)
            .ok_or(TabError::NotFound(id))
    }

    // ── Open / close ────────────────────────────────────────

    /// Open a tab and make it active
    pub fn new_tab(&mut self, profile: Option<String>) -> TabResult<TabId> {
        if self.tabs.len() >= self.max_tabs {
            return Err(TabError::LimitReached(self.max_tabs));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.tabs.push(QueryTab::new(id, profile));
        self.active = self.tabs.len() - 1;
        self.renumber();
        Ok(id)
    }

    /// Close a tab. If it had a query in flight, the execution is returned
    /// so the caller can cancel it.
    pub fn close_tab(&mut self, id: TabId) -> TabResult<Option<Abandoned>> {
        let idx = self.index_of(id)?;
        if self.tabs.len() <= 1 {
            return Err(TabError::LastTab);
        }
        let tab = self.tabs.remove(idx);
        if self.active > idx || self.active >= self.tabs.len() {
            self.active = self.active.saturating_sub(1);
        }
        self.renumber();

        Ok(match (tab.run, tab.profile) {
            (RunState::Running { exec_id, .. }, Some(profile)) => Some(Abandoned { exec_id, profile }),
            _ => None,
        })
    }

    fn renumber(&mut self) {
        for (i, tab) in self.tabs.iter_mut().enumerate() {
            tab.title = format!("Worksheet {}", i + 1);
        }
    }

    /// Make the tab at `index` active, clamped to the last tab
    pub fn select(&mut self, index: usize) {
        self.active = index.min(self.tabs.len() - 1);
    }

    /// Cycle forward, wrapping around
    pub fn select_next(&mut self) {
        self.active = (self.active + 1) % self.tabs.len();
    }

    pub fn select_prev(&mut self) {
        self.active = (self.active + self.tabs.len() - 1) % self.tabs.len();
    }

    // ── Connection binding ──────────────────────────────────

    /// Bind a tab to a profile
    pub fn set_profile(&mut self, id: TabId, profile: &str) -> TabResult<()> {
        let idx = self.index_of(id)?;
        let tab = &mut self.tabs[idx];
        if tab.is_running() {
            return Err(TabError::AlreadyRunning);
        }
        tab.profile = Some(profile.to_string());
        tab.disconnected = false;
        Ok(())
    }

    /// Flag every tab bound to `profile` as disconnected
    pub fn mark_disconnected(&mut self, profile: &str) -> usize {
        let mut count = 0;
        for tab in self.tabs.iter_mut().filter(|t| t.profile() == Some(profile)) {
            tab.disconnected = true;
            count += 1;
        }
        count
    }

    /// Rewrite references after a profile rename
    pub fn rename_profile(&mut self, old: &str, new: &str) {
        for tab in self.tabs.iter_mut().filter(|t| t.profile() == Some(old)) {
            tab.profile = Some(new.to_string());
        }
    }

    /// Whether any tab is bound to `profile`
    pub fn references(&self, profile: &str) -> bool {
        self.tabs.iter().any(|t| t.profile() == Some(profile))
    }

    // ── Execution ───────────────────────────────────────────

    /// Mark a tab as running and hand out a ticket for its text
    pub fn begin_execution(&mut self, id: TabId) -> TabResult<ExecutionTicket> {
        let idx = self.index_of(id)?;
        let tab = &self.tabs[idx];
        if tab.is_running() {
            return Err(TabError::AlreadyRunning);
        }
        if tab.buffer.is_blank() {
            return Err(TabError::EmptyQuery);
        }
        let profile = tab.profile.clone().ok_or(TabError::NoConnection)?;
        let sql = tab.buffer.text();

        let exec_id = self.next_exec;
        self.next_exec += 1;

        let tab = &mut self.tabs[idx];
        tab.run = RunState::Running {
            exec_id,
            started: Instant::now(),
        };
        tab.disconnected = false;

        Ok(ExecutionTicket {
            exec_id,
            tab_id: id,
            profile,
            sql,
        })
    }

    /// Apply a finished execution. Returns false (and changes nothing) when
    /// the tab is gone or is no longer waiting on `exec_id`.
    ///
    /// A failure keeps the previous results and records the error.
    pub fn complete(&mut self, tab_id: TabId, exec_id: u64, result: DbResult<QueryResults>) -> bool {
        let Some(tab) = self.get_mut(tab_id) else {
            return false;
        };
        match tab.run {
            RunState::Running { exec_id: current, .. } if current == exec_id => {}
            _ => return false,
        }
        tab.run = RunState::Idle;
        match result {
            Ok(results) => {
                tab.last_results = Some(Arc::new(results));
                tab.last_error = None;
            }
            Err(e) => tab.last_error = Some(e),
        }
        true
    }

    /// Stop waiting on the tab's execution. Its completion, if one still
    /// arrives, will be dropped.
    pub fn cancel(&mut self, id: TabId) -> TabResult<Option<Abandoned>> {
        let idx = self.index_of(id)?;
        let tab = &mut self.tabs[idx];
        let RunState::Running { exec_id, .. } = tab.run else {
            return Ok(None);
        };
        tab.run = RunState::Idle;
        tab.last_error = Some(DbError::Cancelled);
        Ok(tab.profile.clone().map(|profile| Abandoned { exec_id, profile }))
    }
}
