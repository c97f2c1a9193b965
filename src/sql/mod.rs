//! SQL text helpers
//!
//! The editor sends text verbatim; the only SQL the application writes
//! itself is the table previews.

pub mod preview;

pub use preview::{PreviewKind, preview_query, quote_ident};
