//! Command parser.
//!
//! Turns raw message text into a [`Command`]. Text that does not start with
//! `/` is a plain message; everything else is a command, possibly unknown.

use regex::Regex;
use std::sync::LazyLock;

use memobot_core::types::MessageId;

use crate::error::UsageError;

/// `/name` or `/name@botname`, then whitespace or end of text.
static COMMAND_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/([A-Za-z0-9_]+)(?:@[A-Za-z0-9_]+)?(?:\s+|$)").expect("Invalid command regex")
});

pub const USAGE_ECHO: &str = "/echo <text>";
pub const USAGE_SAVE: &str = "/save <key> <value>";
pub const USAGE_GET: &str = "/get <key>";
pub const USAGE_GETID: &str = "/getid <message_id>";
pub const USAGE_SEARCH: &str = "/search <keyword>";
pub const USAGE_ASK: &str = "/ask <question>";

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Hello,
    Help,
    Echo { text: String },
    Save { key: String, value: String },
    Get { key: String },
    List,
    /// `None` means the configured default count.
    History { limit: Option<u32> },
    GetId { message_id: MessageId },
    Search { keyword: String },
    Ask { question: String },
    /// A `/command` the bot does not know. `name` keeps the leading slash.
    Unknown { name: String },
    /// Not a command at all.
    Plain,
}

impl Command {
    pub fn is_command(&self) -> bool {
        !matches!(self, Command::Plain)
    }

    /// Short name used in logs.
    pub fn name(&self) -> &str {
        match self {
            Command::Start => "start",
            Command::Hello => "hello",
            Command::Help => "help",
            Command::Echo { .. } => "echo",
            Command::Save { .. } => "save",
            Command::Get { .. } => "get",
            Command::List => "list",
            Command::History { .. } => "history",
            Command::GetId { .. } => "getid",
            Command::Search { .. } => "search",
            Command::Ask { .. } => "ask",
            Command::Unknown { .. } => "unknown",
            Command::Plain => "plain",
        }
    }
}

/// Parse message text into a command.
pub fn parse(text: &str) -> Result<Command, UsageError> {
    let text = text.trim();
    if !text.starts_with('/') {
        return Ok(Command::Plain);
    }

    let Some(caps) = COMMAND_HEADER_RE.captures(text) else {
        let name = text.split_whitespace().next().unwrap_or("/").to_lowercase();
        return Ok(Command::Unknown { name });
    };

    let name = caps[1].to_lowercase();
    let rest = &text[caps[0].len()..];

    let command = match name.as_str() {
        "start" => Command::Start,
        "hello" => Command::Hello,
        "help" | "menu" => Command::Help,
        "echo" => {
            if rest.is_empty() {
                return Err(UsageError::MissingArgument(USAGE_ECHO));
            }
            Command::Echo {
                text: rest.to_string(),
            }
        }
        "save" => {
            let (key, value) = split_first_token(rest);
            match (key, value) {
                (Some(key), Some(value)) => Command::Save {
                    key: key.to_string(),
                    value: value.to_string(),
                },
                _ => return Err(UsageError::MissingArgument(USAGE_SAVE)),
            }
        }
        "get" => Command::Get {
            key: first_token(rest, USAGE_GET)?.to_string(),
        },
        "list" => Command::List,
        "history" => Command::History {
            limit: parse_history_limit(rest)?,
        },
        "getid" => Command::GetId {
            message_id: MessageId::from(first_token(rest, USAGE_GETID)?),
        },
        "search" => {
            let mut tokens = rest.split_whitespace();
            match (tokens.next(), tokens.next()) {
                (Some(keyword), None) => Command::Search {
                    keyword: keyword.to_lowercase(),
                },
                _ => return Err(UsageError::MissingArgument(USAGE_SEARCH)),
            }
        }
        "ask" => {
            if rest.is_empty() {
                return Err(UsageError::MissingArgument(USAGE_ASK));
            }
            Command::Ask {
                question: rest.to_string(),
            }
        }
        _ => Command::Unknown {
            name: format!("/{}", name),
        },
    };
    Ok(command)
}

fn first_token<'a>(rest: &'a str, usage: &'static str) -> Result<&'a str, UsageError> {
    rest.split_whitespace()
        .next()
        .ok_or(UsageError::MissingArgument(usage))
}

/// Split off the first whitespace-delimited token; the remainder is kept
/// verbatim apart from the separating whitespace.
fn split_first_token(rest: &str) -> (Option<&str>, Option<&str>) {
    let rest = rest.trim_start();
    if rest.is_empty() {
        return (None, None);
    }
    match rest.find(char::is_whitespace) {
        Some(idx) => {
            let value = rest[idx..].trim_start();
            let value = if value.is_empty() { None } else { Some(value) };
            (Some(&rest[..idx]), value)
        }
        None => (Some(rest), None),
    }
}

fn parse_history_limit(rest: &str) -> Result<Option<u32>, UsageError> {
    let Some(raw) = rest.split_whitespace().next() else {
        return Ok(None);
    };
    let invalid = || {
        UsageError::InvalidArgument(format!(
            "History count must be a positive number, got '{}'.",
            raw
        ))
    };
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match raw.parse::<u32>() {
        Ok(0) => Err(invalid()),
        Ok(n) => Ok(Some(n)),
        // All digits, just too big: saturate and let the dispatcher clamp.
        Err(_) => Ok(Some(u32::MAX)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // Plain text and command headers
    // =====================================================================

    #[test]
    fn test_plain_text() {
        assert_eq!(parse("hello there").unwrap(), Command::Plain);
        assert_eq!(parse("  not /a command").unwrap(), Command::Plain);
        assert_eq!(parse("").unwrap(), Command::Plain);
    }

    #[test]
    fn test_command_is_case_insensitive() {
        assert_eq!(parse("/START").unwrap(), Command::Start);
        assert_eq!(parse("/Hello").unwrap(), Command::Hello);
    }

    #[test]
    fn test_bot_suffix_is_stripped() {
        assert_eq!(parse("/help@memo_bot").unwrap(), Command::Help);
        assert_eq!(
            parse("/get@memo_bot color").unwrap(),
            Command::Get {
                key: "color".to_string()
            }
        );
    }

    #[test]
    fn test_menu_is_help() {
        assert_eq!(parse("/menu").unwrap(), Command::Help);
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse("/frobnicate now").unwrap(),
            Command::Unknown {
                name: "/frobnicate".to_string()
            }
        );
        assert_eq!(
            parse("/").unwrap(),
            Command::Unknown {
                name: "/".to_string()
            }
        );
        assert_eq!(
            parse("/?? x").unwrap(),
            Command::Unknown {
                name: "/??".to_string()
            }
        );
    }

    #[test]
    fn test_command_glued_to_text_is_unknown() {
        assert!(matches!(parse("/hello-world").unwrap(), Command::Unknown { .. }));
    }

    // =====================================================================
    // Arguments
    // =====================================================================

    #[test]
    fn test_echo() {
        assert_eq!(
            parse("/echo  hi   there ").unwrap(),
            Command::Echo {
                text: "hi   there".to_string()
            }
        );
        assert_eq!(
            parse("/echo").unwrap_err(),
            UsageError::MissingArgument(USAGE_ECHO)
        );
    }

    #[test]
    fn test_save_keeps_value_verbatim() {
        assert_eq!(
            parse("/save color deep  blue, mostly").unwrap(),
            Command::Save {
                key: "color".to_string(),
                value: "deep  blue, mostly".to_string()
            }
        );
    }

    #[test]
    fn test_save_missing_arguments() {
        assert_eq!(
            parse("/save").unwrap_err(),
            UsageError::MissingArgument(USAGE_SAVE)
        );
        assert_eq!(
            parse("/save color").unwrap_err(),
            UsageError::MissingArgument(USAGE_SAVE)
        );
        assert_eq!(parse("/save color").unwrap_err().to_string(), "Usage: /save <key> <value>");
    }

    #[test]
    fn test_get_and_getid() {
        assert_eq!(
            parse("/get color extra").unwrap(),
            Command::Get {
                key: "color".to_string()
            }
        );
        assert_eq!(
            parse("/getid 42:7").unwrap(),
            Command::GetId {
                message_id: MessageId::from("42:7")
            }
        );
        assert_eq!(parse("/get").unwrap_err(), UsageError::MissingArgument(USAGE_GET));
        assert_eq!(
            parse("/getid").unwrap_err(),
            UsageError::MissingArgument(USAGE_GETID)
        );
    }

    #[test]
    fn test_history_limit() {
        assert_eq!(parse("/history").unwrap(), Command::History { limit: None });
        assert_eq!(
            parse("/history 3").unwrap(),
            Command::History { limit: Some(3) }
        );
        assert!(matches!(
            parse("/history 0").unwrap_err(),
            UsageError::InvalidArgument(_)
        ));
        assert!(matches!(
            parse("/history many").unwrap_err(),
            UsageError::InvalidArgument(_)
        ));
        assert!(matches!(
            parse("/history -2").unwrap_err(),
            UsageError::InvalidArgument(_)
        ));
    }

    #[test]
    fn test_history_limit_too_large_saturates() {
        assert_eq!(
            parse("/history 99999999999").unwrap(),
            Command::History {
                limit: Some(u32::MAX)
            }
        );
        assert_eq!(
            parse("/history 99999999999999999999999").unwrap(),
            Command::History {
                limit: Some(u32::MAX)
            }
        );
        assert!(matches!(
            parse("/history 000").unwrap_err(),
            UsageError::InvalidArgument(_)
        ));
    }

    #[test]
    fn test_search_single_keyword() {
        assert_eq!(
            parse("/search Hello").unwrap(),
            Command::Search {
                keyword: "hello".to_string()
            }
        );
        assert_eq!(
            parse("/search").unwrap_err(),
            UsageError::MissingArgument(USAGE_SEARCH)
        );
        assert_eq!(
            parse("/search two words").unwrap_err(),
            UsageError::MissingArgument(USAGE_SEARCH)
        );
    }

    #[test]
    fn test_ask() {
        assert_eq!(
            parse("/ask what is rust?").unwrap(),
            Command::Ask {
                question: "what is rust?".to_string()
            }
        );
        assert_eq!(parse("/ask").unwrap_err(), UsageError::MissingArgument(USAGE_ASK));
    }

    #[test]
    fn test_command_names() {
        assert_eq!(parse("/list").unwrap().name(), "list");
        assert!(parse("/list").unwrap().is_command());
        assert!(!Command::Plain.is_command());
    }
}
