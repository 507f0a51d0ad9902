use std::fmt::Write;

use mediasync::SyncOutcome;

/// Characters MarkdownV2 requires to be escaped in plain text.
pub const ESCAPE_CHARS: &str = "\\!\"#$%&'()*+,./:;<=>?@[]^_`{|}~-";

/// Escape `input` for MarkdownV2, one backslash per special character.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if ESCAPE_CHARS.contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render a run's outcome as a MarkdownV2 message.
///
/// Sections without entries are left out.
pub fn render(outcome: &SyncOutcome) -> String {
    let mut message = String::from("*Synchronisation complete*\n");

    if !outcome.downloaded().is_empty() {
        message.push_str("\n*Files downloaded:*\n");
        for name in outcome.downloaded() {
            let _ = writeln!(message, "\\- {}", escape(name));
        }
    }

    if !outcome.errors().is_empty() {
        message.push_str("\n*Errors occurred:*\n");
        for error in outcome.errors() {
            let _ = writeln!(message, "\\- {}", escape(&error.to_string()));
        }
    }

    message
}
