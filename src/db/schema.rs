//! Database schema introspection
//!
//! The schema browser shows one tree per connection. Nodes are rebuilt
//! wholesale on every refresh and never patched in place.

use crate::db::types::DataType;

/// What a schema node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// PostgreSQL namespace
    Schema,
    Table,
    View,
    Column,
}

/// One entry in the schema tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    pub kind: NodeKind,
    pub name: String,
    /// Declared type, for columns only
    pub data_type: Option<DataType>,
    /// Part of the primary key (columns only)
    pub is_primary_key: bool,
    pub children: Vec<SchemaNode>,
}

impl SchemaNode {
    pub fn schema(name: impl Into<String>, children: Vec<SchemaNode>) -> Self {
        Self::container(NodeKind::Schema, name, children)
    }

    pub fn table(name: impl Into<String>, columns: Vec<SchemaNode>) -> Self {
        Self::container(NodeKind::Table, name, columns)
    }

    pub fn view(name: impl Into<String>, columns: Vec<SchemaNode>) -> Self {
        Self::container(NodeKind::View, name, columns)
    }

    pub fn column(name: impl Into<String>, data_type: DataType, is_primary_key: bool) -> Self {
        Self {
            kind: NodeKind::Column,
            name: name.into(),
            data_type: Some(data_type),
            is_primary_key,
            children: Vec::new(),
        }
    }

    fn container(kind: NodeKind, name: impl Into<String>, children: Vec<SchemaNode>) -> Self {
        Self {
            kind,
            name: name.into(),
            data_type: None,
            is_primary_key: false,
            children,
        }
    }

    /// Tables and views can be previewed
    pub fn is_relation(&self) -> bool {
        matches!(self.kind, NodeKind::Table | NodeKind::View)
    }

    /// First primary-key column, if any
    pub fn primary_key(&self) -> Option<&str> {
        self.children
            .iter()
            .find(|c| c.kind == NodeKind::Column && c.is_primary_key)
            .map(|c| c.name.as_str())
    }

    pub fn first_column(&self) -> Option<&str> {
        self.children
            .iter()
            .find(|c| c.kind == NodeKind::Column)
            .map(|c| c.name.as_str())
    }
}

/// Find a table or view by name, optionally qualified by schema
pub fn find_relation<'a>(
    nodes: &'a [SchemaNode],
    schema: Option<&str>,
    name: &str,
) -> Option<&'a SchemaNode> {
    for node in nodes {
        match node.kind {
            NodeKind::Schema => {
                if schema.is_none_or(|s| s == node.name)
                    && let Some(found) = find_relation(&node.children, None, name)
                {
                    return Some(found);
                }
            }
            NodeKind::Table | NodeKind::View if schema.is_none() && node.name == name => {
                return Some(node);
            }
            _ => {}
        }
    }
    None
}
