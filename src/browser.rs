//! Schema browser state
//!
//! Holds the tree for one connection at a time. Every refresh replaces the
//! whole tree; a failed refresh empties it and keeps the error for display.

use crate::db::schema::{SchemaNode, find_relation};
use crate::db::{ActiveConnection, NodeKind};
use crate::error::DbResult;

#[derive(Debug, Default)]
pub struct SchemaBrowser {
    /// Profile the tree belongs to
    profile: Option<String>,
    nodes: Vec<SchemaNode>,
    error: Option<String>,
    /// Id of the newest refresh; older completions are ignored
    pending: Option<u64>,
    next_refresh: u64,
}

impl SchemaBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load catalog metadata from an open connection
    pub async fn refresh(conn: &ActiveConnection) -> DbResult<Vec<SchemaNode>> {
        conn.introspect().await
    }

    /// Start tracking a refresh for `profile`. Switching profiles clears the
    /// old tree right away.
    pub fn begin(&mut self, profile: &str) -> u64 {
        if self.profile.as_deref() != Some(profile) {
            self.nodes.clear();
            self.profile = Some(profile.to_string());
        }
        self.error = None;
        self.next_refresh += 1;
        self.pending = Some(self.next_refresh);
        self.next_refresh
    }

    /// Apply a finished refresh. Returns false if it was superseded.
    pub fn apply(&mut self, refresh_id: u64, result: DbResult<Vec<SchemaNode>>) -> bool {
        if self.pending != Some(refresh_id) {
            return false;
        }
        self.pending = None;
        match result {
            Ok(nodes) => {
                self.nodes = nodes;
                self.error = None;
            }
            Err(e) => {
                self.nodes.clear();
                self.error = Some(e.to_string());
            }
        }
        true
    }

    /// Forget the tree (e.g. its connection was closed)
    pub fn clear(&mut self) {
        self.profile = None;
        self.nodes.clear();
        self.error = None;
        self.pending = None;
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    pub fn nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Look up a relation, accepting `name` or `schema.name`
    pub fn find(&self, qualified: &str) -> Option<(Option<&str>, &SchemaNode)> {
        let (schema, name) = match qualified.split_once('.') {
            Some((s, n)) => (Some(s), n),
            None => (None, qualified),
        };
        let node = find_relation(&self.nodes, schema, name)?;
        let owner = self
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::Schema && n.children.iter().any(|c| std::ptr::eq(c, node)))
            .map(|n| n.name.as_str());
        Some((owner, node))
    }
}
