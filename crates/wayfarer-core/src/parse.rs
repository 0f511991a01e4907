//! Oracle response parsing into typed decisions.
//!
//! The oracle returns raw text that should be a single JSON object. This
//! module recovers that object from common formatting mistakes and validates
//! it into a [`DecisionResult`]. Two kinds of failure are distinguished:
//!
//! - no JSON object can be recovered at all: [`ParseError::Malformed`], which
//!   the agent answers with a fallback roam;
//! - an object was recovered but does not name a known action and a target:
//!   `Ok(None)`, which sends the agent back to idle.

use std::borrow::Cow;

use serde_json::{Map, Value};
use wayfarer_types::{DecisionAction, DecisionResult, TradeItem};

/// Errors raised while parsing an oracle response.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// No JSON object could be recovered from the text.
    #[error("no JSON object in oracle response: {0}")]
    Malformed(String),
}

/// Word limits applied to free-text fields of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyLimits {
    /// Maximum words kept from `intent`.
    pub intent_max_words: usize,
    /// Maximum words kept from `message`, if limited.
    pub message_max_words: Option<usize>,
}

impl ReplyLimits {
    /// Limits for a regular decision: intent capped, message free.
    pub const fn decision(intent_max_words: usize) -> Self {
        Self {
            intent_max_words,
            message_max_words: None,
        }
    }

    /// Limits for a chat reply: both intent and message capped.
    pub const fn chat_reply(intent_max_words: usize, message_max_words: usize) -> Self {
        Self {
            intent_max_words,
            message_max_words: Some(message_max_words),
        }
    }
}

/// Parse an oracle response into a validated decision.
///
/// Attempts several recovery strategies when the raw text is not clean JSON:
/// 1. Direct parse of the trimmed text
/// 2. Extract JSON from a markdown code block
/// 3. Extract the first balanced `{...}` object from surrounding prose
/// 4. Strip trailing commas from each of the above and retry
///
/// # Errors
///
/// Returns [`ParseError::Malformed`] if no strategy yields a JSON object.
pub fn parse_decision(
    raw: &str,
    limits: ReplyLimits,
) -> Result<Option<DecisionResult>, ParseError> {
    let object = recover_object(raw)?;
    Ok(convert_object(&object, limits))
}

/// Run the recovery strategies and return the first JSON object found.
fn recover_object(raw: &str) -> Result<Map<String, Value>, ParseError> {
    let trimmed = raw.trim();

    let mut candidates: Vec<Cow<'_, str>> = vec![Cow::Borrowed(trimmed)];
    if let Some(block) = extract_json_from_codeblock(trimmed) {
        candidates.push(Cow::Borrowed(block));
    }
    if let Some(object) = extract_first_object(trimmed) {
        candidates.push(Cow::Borrowed(object));
    }
    let cleaned: Vec<Cow<'_, str>> = candidates
        .iter()
        .map(|c| Cow::Owned(strip_trailing_commas(c)))
        .collect();
    candidates.extend(cleaned);

    candidates
        .iter()
        .find_map(|candidate| match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
        .ok_or_else(|| ParseError::Malformed(trimmed.to_owned()))
}

/// Validate a recovered object. `None` means "no usable action".
fn convert_object(object: &Map<String, Value>, limits: ReplyLimits) -> Option<DecisionResult> {
    let action = object
        .get("action")
        .and_then(Value::as_str)
        .and_then(DecisionAction::from_name)?;

    let target_id = object.get("target_id").and_then(value_as_id)?;

    let message = object
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(|m| match limits.message_max_words {
            Some(max) => truncate_words(m, max),
            None => m.to_owned(),
        });

    // A chat without anything to say is not actionable.
    if action == DecisionAction::Chat && message.is_none() {
        return None;
    }

    let intent = object
        .get("intent")
        .and_then(Value::as_str)
        .map(|i| truncate_words(i, limits.intent_max_words))
        .unwrap_or_default();

    Some(DecisionResult {
        action,
        target_id: Some(target_id),
        message,
        give_items: items(object.get("give_items")),
        receive_items: items(object.get("receive_items")),
        intent,
    })
}

/// Ids may come back as strings or bare numbers.
fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Trade item lists. Entries without an id are dropped; a missing count
/// means one.
fn items(value: Option<&Value>) -> Vec<TradeItem> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let id = entry.get("id").and_then(value_as_id)?;
            let count = entry
                .get("count")
                .and_then(Value::as_u64)
                .map_or(1, |c| u32::try_from(c).unwrap_or(u32::MAX));
            Some(TradeItem { id, count })
        })
        .collect()
}

/// Keep at most `max` whitespace-separated words.
pub fn truncate_words(text: &str, max: usize) -> String {
    text.split_whitespace().take(max).collect::<Vec<_>>().join(" ")
}

/// Extract JSON from a markdown code block.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let fence = text.find("```")?;
    let after_fence = text.get(fence..)?.strip_prefix("```")?;
    // Skip the info string (`json`, `JSON`, ...) up to the end of the line.
    let body = match after_fence.find('\n') {
        Some(nl) => after_fence.get(nl..)?,
        None => after_fence,
    };
    let end = body.find("```")?;
    body.get(..end).map(str::trim)
}

/// The first balanced `{...}` in `text`, honoring string literals.
fn extract_first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let tail = text.get(start..)?;

    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in tail.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth = depth.saturating_add(1),
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return tail.get(..i.saturating_add(1));
                }
            }
            _ => {}
        }
    }
    None
}

/// Strip trailing commas before closing braces and brackets.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == ',' {
            let next = chars.clone().find(|n| !n.is_whitespace());
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        result.push(c);
    }
    result
}
