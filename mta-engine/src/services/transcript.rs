//! Action-item extraction from transcript text
//!
//! A sentence is an action item candidate when it contains one of
//! [`ACTION_KEYWORDS`]. Candidates lose a leading `mm:ss` timestamp, a
//! `Speaker:` label and a conversational lead-in ("we should", "I'll", ...),
//! and are kept when longer than [`MIN_ACTION_ITEM_CHARS`].

pub const ACTION_KEYWORDS: &[&str] = &[
    "action item",
    "todo",
    "follow up",
    "assign",
    "responsible",
    "deadline",
    "due date",
    "task",
    "deliverable",
    "owner",
    "will do",
    "need to",
    "should",
    "must",
    "commitment",
];

const LEAD_INS: &[&str] = &[
    "so we need to",
    "we should",
    "we have to",
    "we must",
    "i will",
    "i'll",
    "i need to",
    "i have to",
    "someone should",
    "someone needs to",
];

pub const MIN_ACTION_ITEM_CHARS: usize = 10;

fn is_action_sentence(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    ACTION_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// `12:30 rest` → `rest`
fn strip_timestamp(text: &str) -> &str {
    let Some((minutes, rest)) = text.split_once(':') else {
        return text;
    };
    let seconds_len = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if minutes.is_empty() || !minutes.chars().all(|c| c.is_ascii_digit()) || seconds_len == 0 {
        return text;
    }
    rest[seconds_len..].trim_start()
}

/// `Alice: rest` → `rest`
fn strip_speaker_label(text: &str) -> &str {
    match text.split_once(':') {
        Some((label, rest)) if !label.trim().is_empty() => rest.trim_start(),
        _ => text,
    }
}

fn strip_lead_ins(text: &str) -> &str {
    let mut cleaned = text.trim();
    for lead_in in LEAD_INS {
        let matches = cleaned
            .get(..lead_in.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(lead_in));
        if matches {
            cleaned = cleaned[lead_in.len()..].trim();
        }
    }
    cleaned
}

/// Tidy one candidate sentence into an action item
pub fn clean_action_item(sentence: &str) -> String {
    let text = strip_timestamp(sentence.trim());
    let text = strip_speaker_label(text);
    strip_lead_ins(text).to_string()
}

/// Action items in `text`, in order of first appearance, without duplicates
pub fn extract_action_items(text: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for sentence in text.split(&['.', '!', '?'][..]) {
        let sentence = sentence.trim();
        if sentence.is_empty() || !is_action_sentence(sentence) {
            continue;
        }
        let item = clean_action_item(sentence);
        if item.chars().count() > MIN_ACTION_ITEM_CHARS && !items.contains(&item) {
            items.push(item);
        }
    }
    items
}
