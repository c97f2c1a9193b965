//! Command parsing
//!
//! Handles the command bar system (commands starting with `/`). Execution
//! lives in `App::execute_command`, next to the state it changes.

pub mod parser;

pub use parser::{Command, parse_command};
