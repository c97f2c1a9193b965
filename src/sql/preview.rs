//! Table preview queries
//!
//! Builds the SQL behind "all rows", "first N" and "last N" on a table or
//! view picked in the schema tree. The text is placed in a tab and runs
//! like anything the user typed.

use crate::config::EngineKind;
use crate::db::schema::{NodeKind, SchemaNode};

/// Which rows to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    All,
    First(usize),
    Last(usize),
}

impl PreviewKind {
    /// Parse `all`, `first`, `last` (with `n` as the default limit)
    pub fn parse(word: &str, n: usize) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "all" => Some(PreviewKind::All),
            "first" | "head" => Some(PreviewKind::First(n)),
            "last" | "tail" => Some(PreviewKind::Last(n)),
            _ => None,
        }
    }
}

/// Double-quote an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Build the preview statement for `relation`, optionally inside `schema`
pub fn preview_query(
    engine: EngineKind,
    schema: Option<&str>,
    relation: &SchemaNode,
    kind: PreviewKind,
) -> String {
    let target = match schema {
        Some(s) => format!("{}.{}", quote_ident(s), quote_ident(&relation.name)),
        None => quote_ident(&relation.name),
    };
    let base = format!("SELECT * FROM {}", target);

    match kind {
        PreviewKind::All => base,
        PreviewKind::First(n) => format!("{} LIMIT {}", base, n),
        PreviewKind::Last(n) => match relation.primary_key() {
            Some(pk) => last_rows(&base, &quote_ident(pk), n),
            None if engine == EngineKind::Sqlite && relation.kind == NodeKind::Table => format!(
                "{base} WHERE rowid IN (SELECT rowid FROM {target} ORDER BY rowid DESC LIMIT {n}) ORDER BY rowid"
            ),
            None => last_rows(&base, "1", n),
        },
    }
}

fn last_rows(base: &str, order: &str, n: usize) -> String {
    format!(
        "SELECT * FROM ({} ORDER BY {} DESC LIMIT {}) AS last_rows ORDER BY {} ASC",
        base, order, n, order
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::DataType;

    fn table(pk: bool) -> SchemaNode {
        SchemaNode::table(
            "orders",
            vec![
                SchemaNode::column("id", DataType::Integer, pk),
                SchemaNode::column("total", DataType::Numeric, false),
            ],
        )
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_all_and_first() {
        let t = table(true);
        assert_eq!(
            preview_query(EngineKind::Sqlite, None, &t, PreviewKind::All),
            "SELECT * FROM \"orders\""
        );
        assert_eq!(
            preview_query(EngineKind::Postgres, Some("public"), &t, PreviewKind::First(100)),
            "SELECT * FROM \"public\".\"orders\" LIMIT 100"
        );
    }

    #[test]
    fn test_last_orders_by_primary_key() {
        let sql = preview_query(EngineKind::Sqlite, None, &table(true), PreviewKind::Last(5));
        assert_eq!(
            sql,
            "SELECT * FROM (SELECT * FROM \"orders\" ORDER BY \"id\" DESC LIMIT 5) AS last_rows ORDER BY \"id\" ASC"
        );
    }

    #[test]
    fn test_last_falls_back_to_rowid_on_sqlite_tables() {
        let sql = preview_query(EngineKind::Sqlite, None, &table(false), PreviewKind::Last(5));
        assert!(sql.contains("rowid IN (SELECT rowid FROM \"orders\" ORDER BY rowid DESC LIMIT 5)"));
    }

    #[test]
    fn test_last_on_view_uses_first_column() {
        let view = SchemaNode::view("v", vec![SchemaNode::column("a", DataType::Text, false)]);
        let sql = preview_query(EngineKind::Sqlite, None, &view, PreviewKind::Last(3));
        assert!(sql.ends_with("ORDER BY 1 ASC"));
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(PreviewKind::parse("LAST", 50), Some(PreviewKind::Last(50)));
        assert_eq!(PreviewKind::parse("all", 50), Some(PreviewKind::All));
        assert_eq!(PreviewKind::parse("middle", 50), None);
    }
}
