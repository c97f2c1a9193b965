//! Command parsing
//!
//! Parses user input from the command bar into structured Command enums.
//! Commands use `/` prefix (e.g., `/help`, `/quit`); `:` and no prefix are
//! accepted too.

use crate::error::{CommandError, CommandResult};
use crate::sql::preview::PreviewKind;

/// Commands that can be executed from the command bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Reload the schema tree for the active tab's connection
    Refresh,

    /// Open a connection (default: the active tab's)
    Connect(Option<String>),

    /// Close a connection (default: the active tab's)
    Disconnect(Option<String>),

    /// Bind the active tab to a connection
    Use(String),

    /// Open a new tab, optionally bound to a connection
    NewTab(Option<String>),

    /// Close the active tab
    CloseTab,

    /// Open the profile dialog, optionally pre-filled with a URL
    Add(Option<String>),

    /// Edit a profile (default: the active tab's)
    Edit(Option<String>),

    /// Delete a profile
    Delete(String),

    /// Test a profile (default: the active tab's)
    Test(Option<String>),

    /// Put a preview query for a table or view into the active tab and run it.
    /// `mode` is `all`, `first` or `last`; `limit` defaults to the configured
    /// preview size.
    Preview {
        relation: String,
        mode: String,
        limit: Option<usize>,
    },

    /// Cancel the active tab's running query
    Cancel,

    /// Clear the query editor
    Clear,

    /// Show help
    Help,

    /// Quit the application
    Quit,
}

/// Parse a command string into a Command enum
pub fn parse_command(input: &str) -> CommandResult<Command> {
    let input = input.trim();
    let input = input
        .strip_prefix('/')
        .or_else(|| input.strip_prefix(':'))
        .unwrap_or(input);
    let parts: Vec<&str> = input.split_whitespace().collect();

    let Some((&name, args)) = parts.split_first() else {
        return Err(CommandError::Unknown(String::new()));
    };
    let first = || args.first().map(|s| s.to_string());

    match name {
        "refresh" | "r" => Ok(Command::Refresh),
        "connect" | "c" => Ok(Command::Connect(first())),
        "disconnect" | "dc" => Ok(Command::Disconnect(first())),
        "use" | "u" => first()
            .map(Command::Use)
            .ok_or(CommandError::MissingArgument("use")),
        "new" | "tab" => Ok(Command::NewTab(first())),
        "close" => Ok(Command::CloseTab),
        // URLs never contain spaces, but paths might
        "add" => Ok(Command::Add((!args.is_empty()).then(|| args.join(" ")))),
        "edit" => Ok(Command::Edit(first())),
        "delete" | "del" | "rm" => first()
            .map(Command::Delete)
            .ok_or(CommandError::MissingArgument("delete")),
        "test" => Ok(Command::Test(first())),
        "preview" | "p" => parse_preview(args),
        "cancel" => Ok(Command::Cancel),
        "clear" | "cl" => Ok(Command::Clear),
        "help" | "h" | "?" => Ok(Command::Help),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        unknown => Err(CommandError::Unknown(unknown.to_string())),
    }
}

/// `/preview <relation> [all|first|last|N] [N]`
fn parse_preview(args: &[&str]) -> CommandResult<Command> {
    let (&relation, rest) = args
        .split_first()
        .ok_or(CommandError::MissingArgument("preview"))?;

    let parse_limit = |s: &str| {
        s.parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| CommandError::InvalidArgument(format!("'{}' is not a row count", s)))
    };

    let (mode, limit) = match rest {
        [] => ("first".to_string(), None),
        [n] if n.chars().all(|c| c.is_ascii_digit()) => ("first".to_string(), Some(parse_limit(*n)?)),
        [word] => (word.to_ascii_lowercase(), None),
        [word, n] => (word.to_ascii_lowercase(), Some(parse_limit(*n)?)),
        _ => {
            return Err(CommandError::InvalidArgument(
                "usage: /preview <table> [all|first|last] [n]".to_string(),
            ));
        }
    };

    if PreviewKind::parse(&mode, 0).is_none() {
        return Err(CommandError::InvalidArgument(format!(
            "'{}' is not one of all, first, last",
            mode
        )));
    }

    Ok(Command::Preview {
        relation: relation.to_string(),
        mode,
        limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_refresh() {
        assert_eq!(parse_command("/refresh").unwrap(), Command::Refresh);
        assert_eq!(parse_command("/r").unwrap(), Command::Refresh);
    }

    #[test]
    fn test_parse_quit_variants() {
        assert_eq!(parse_command("/quit").unwrap(), Command::Quit);
        assert_eq!(parse_command("/q").unwrap(), Command::Quit);
        assert_eq!(parse_command("/exit").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_help() {
        assert_eq!(parse_command("/help").unwrap(), Command::Help);
        assert_eq!(parse_command("/?").unwrap(), Command::Help);
    }

    #[test]
    fn test_parse_unknown_command() {
        let result = parse_command("/foobar");
        assert!(matches!(result, Err(CommandError::Unknown(_))));
        assert!(matches!(parse_command("   "), Err(CommandError::Unknown(_))));
    }

    #[test]
    fn test_parse_without_prefix_and_colon_prefix() {
        assert_eq!(parse_command("quit").unwrap(), Command::Quit);
        assert_eq!(parse_command(":help").unwrap(), Command::Help);
    }

    #[test]
    fn test_parse_connection_commands() {
        assert_eq!(parse_command("/connect").unwrap(), Command::Connect(None));
        assert_eq!(
            parse_command("/connect prod").unwrap(),
            Command::Connect(Some("prod".to_string()))
        );
        assert_eq!(
            parse_command("/disconnect prod").unwrap(),
            Command::Disconnect(Some("prod".to_string()))
        );
        assert_eq!(parse_command("/use local").unwrap(), Command::Use("local".to_string()));
        assert!(matches!(
            parse_command("/use"),
            Err(CommandError::MissingArgument("use"))
        ));
    }

    #[test]
    fn test_parse_profile_commands() {
        assert_eq!(parse_command("/add").unwrap(), Command::Add(None));
        assert_eq!(
            parse_command("/add sqlite:///tmp/my notes.db").unwrap(),
            Command::Add(Some("sqlite:///tmp/my notes.db".to_string()))
        );
        assert_eq!(parse_command("/edit").unwrap(), Command::Edit(None));
        assert_eq!(parse_command("/rm old").unwrap(), Command::Delete("old".to_string()));
        assert!(matches!(
            parse_command("/delete"),
            Err(CommandError::MissingArgument("delete"))
        ));
        assert_eq!(
            parse_command("/test prod").unwrap(),
            Command::Test(Some("prod".to_string()))
        );
    }

    #[test]
    fn test_parse_tab_commands() {
        assert_eq!(parse_command("/new").unwrap(), Command::NewTab(None));
        assert_eq!(
            parse_command("/new local").unwrap(),
            Command::NewTab(Some("local".to_string()))
        );
        assert_eq!(parse_command("/close").unwrap(), Command::CloseTab);
        assert_eq!(parse_command("/cancel").unwrap(), Command::Cancel);
    }

    #[test]
    fn test_parse_preview() {
        assert_eq!(
            parse_command("/preview users").unwrap(),
            Command::Preview {
                relation: "users".to_string(),
                mode: "first".to_string(),
                limit: None
            }
        );
        assert_eq!(
            parse_command("/preview public.users LAST 5").unwrap(),
            Command::Preview {
                relation: "public.users".to_string(),
                mode: "last".to_string(),
                limit: Some(5)
            }
        );
        assert_eq!(
            parse_command("/p users 20").unwrap(),
            Command::Preview {
                relation: "users".to_string(),
                mode: "first".to_string(),
                limit: Some(20)
            }
        );
    }

    #[test]
    fn test_parse_preview_errors() {
        assert!(matches!(
            parse_command("/preview"),
            Err(CommandError::MissingArgument("preview"))
        ));
        assert!(matches!(
            parse_command("/preview users sideways"),
            Err(CommandError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_command("/preview users last zero"),
            Err(CommandError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_command("/preview users 0"),
            Err(CommandError::InvalidArgument(_))
        ));
    }
}
