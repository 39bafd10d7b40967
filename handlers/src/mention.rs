//! Bot @-mention detection and stripping, and the escalation trigger.

/// Returns true if `text` contains `@bot_handle` (case-insensitive; a leading `@` on the handle is
/// ignored). The handle must end at a non-word character or the end of the text, so
/// `@support_bot_admin` is not a mention of `support_bot`.
pub fn is_bot_mentioned(text: &str, bot_handle: &str) -> bool {
    let handle = normalize(bot_handle);
    !handle.is_empty() && !mention_spans(&text.to_lowercase(), &handle).is_empty()
}

/// Removes every `@bot_handle` mention from `text` and collapses whitespace.
pub fn strip_mention(text: &str, bot_handle: &str) -> String {
    let handle = normalize(bot_handle);
    if handle.is_empty() {
        return text.trim().to_string();
    }
    // Byte offsets in the lowercased copy are valid in `text` only if no char changes width.
    let same_width = text
        .chars()
        .all(|c| c.to_lowercase().map(char::len_utf8).sum::<usize>() == c.len_utf8());
    let spans = if same_width {
        mention_spans(&text.to_lowercase(), &handle)
    } else {
        mention_spans(text, &format!("@{}", bot_handle.trim().trim_start_matches('@')))
    };
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end) in spans {
        out.push_str(&text[last..start]);
        last = end;
    }
    out.push_str(&text[last..]);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Byte ranges of `needle` in `haystack` that are not followed by a word character.
fn mention_spans(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    haystack
        .match_indices(needle)
        .map(|(at, m)| (at, at + m.len()))
        .filter(|&(_, end)| {
            !haystack[end..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
        })
        .collect()
}

/// Escalation trigger: the text asks a question (`?` or full-width `？`) or addresses the bot.
pub fn wants_escalation(text: &str, addressed: bool) -> bool {
    addressed || text.contains('?') || text.contains('？')
}

fn normalize(bot_handle: &str) -> String {
    let bare = bot_handle.trim().trim_start_matches('@');
    if bare.is_empty() {
        String::new()
    } else {
        format!("@{}", bare.to_lowercase())
    }
}
