//! Reply text for each command.
//!
//! Pure formatting over stored records; no storage access here.

use memobot_core::types::MessageRecord;
use memobot_storage::snippet;

/// Timestamp format used in every message listing (UTC).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Longest text Telegram accepts in one `sendMessage` call.
pub const MAX_REPLY_CHARS: usize = 4096;

pub const PLAIN_REPLY: &str = "I only respond to commands. Send /help to see commands.";

pub const HELP_TEXT: &str = "/start - welcome message\n\
/hello - greet\n\
/help - this message\n\
/echo <text> - echo back\n\
/save <key> <value> - save your data\n\
/get <key> - retrieve your value\n\
/list - list saved keys\n\
/history [n] - last n messages\n\
/getid <message_id> - fetch specific message\n\
/search <keyword> - search messages\n\
/ask <question> - ask a question";

pub fn welcome(first_name: Option<&str>) -> String {
    format!(
        "Welcome, {}! 🤖\nUse /help to see what I can do.",
        first_name.unwrap_or_default()
    )
}

pub fn greeting(first_name: Option<&str>) -> String {
    format!("Hello, {} 👋", first_name.unwrap_or_default())
}

pub fn saved(key: &str) -> String {
    format!("Saved key '{}'.", key)
}

pub fn value(key: &str, value: &str) -> String {
    format!("{} = {}", key, value)
}

pub fn key_list(keys: &[String]) -> String {
    if keys.is_empty() {
        return "You have no saved keys.".to_string();
    }
    format!("Your keys:\n{}", keys.join("\n"))
}

pub fn unknown_command(name: &str) -> String {
    format!("Unknown command {}. Use /help", name)
}

/// Newest-first listing, one line per message.
pub fn history(messages: &[MessageRecord], snippet_chars: usize) -> String {
    if messages.is_empty() {
        return "No history found.".to_string();
    }
    listing(messages, snippet_chars)
}

/// A single message with its full text.
pub fn message(record: &MessageRecord) -> String {
    format!(
        "[{}] {}\n{}",
        record.message_id,
        format_timestamp(record),
        record.text
    )
}

/// Search hits in result order. `scoped` selects the per-user wording
/// for the empty case.
pub fn search_results(
    keyword: &str,
    results: &[MessageRecord],
    scoped: bool,
    snippet_chars: usize,
) -> String {
    if results.is_empty() {
        return if scoped {
            format!("No results for '{}' in your messages.", keyword)
        } else {
            format!("No results for '{}'", keyword)
        };
    }
    listing(results, snippet_chars)
}

fn listing(messages: &[MessageRecord], snippet_chars: usize) -> String {
    messages
        .iter()
        .map(|m| {
            format!(
                "[{}] {} - {}",
                m.message_id,
                format_timestamp(m),
                snippet(&m.text, snippet_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split a reply into chunks of at most `max_chars` characters.
///
/// Breaks between lines where possible; a single line longer than the
/// limit is cut on a char boundary.
pub fn split_reply(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;
    let mut current_lines = 0;

    for mut line in text.split('\n') {
        loop {
            let line_chars = line.chars().count();
            let sep = usize::from(current_lines > 0);
            if current_chars + sep + line_chars <= max_chars {
                if sep == 1 {
                    current.push('\n');
                }
                current.push_str(line);
                current_chars += sep + line_chars;
                current_lines += 1;
                break;
            }
            if current_lines > 0 {
                chunks.push(std::mem::take(&mut current));
                current_chars = 0;
                current_lines = 0;
                continue;
            }
            let end = line
                .char_indices()
                .nth(max_chars)
                .map_or(line.len(), |(i, _)| i);
            chunks.push(line[..end].to_string());
            line = &line[end..];
        }
    }
    if current_lines > 0 {
        chunks.push(current);
    }
    chunks
}

fn format_timestamp(record: &MessageRecord) -> String {
    record.created_at_utc().format(TIMESTAMP_FORMAT).to_string()
}
