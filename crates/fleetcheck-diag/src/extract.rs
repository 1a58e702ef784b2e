//! Payload extraction from raw tool output
//!
//! Diagnostic output reaches us in several shapes depending on how the
//! command was run: sentinel-wrapped debug messages, bare JSON, `host => {...}`
//! result dumps, one-line `stdout='...'` summaries, or a base64 file slurp.
//! Each shape has its own strategy. Strategies are pure, tried in a fixed
//! order, and return `None` instead of failing so callers can move on to the
//! next candidate blob.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tracing::debug;

use crate::types::Payload;

/// Marker preceding a sentinel-wrapped payload
pub const SENTINEL_START: &str = "RISU_RESULTS_JSON_START:";
/// Marker following a sentinel-wrapped payload
pub const SENTINEL_END: &str = ":RISU_RESULTS_JSON_END";

const ARROW: &str = "=>";
const QUOTED_FIELD_MARKER: &str = "stdout='";
const OBJECT_START: &str = "{\"";

/// Wrapper layers unwrapped before giving up
const MAX_UNWRAP_DEPTH: usize = 3;

/// A single extraction strategy
pub type Strategy = fn(&str) -> Option<Payload>;

/// Strategies in priority order; the first hit wins
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("sentinel", from_sentinel),
    ("direct", from_direct),
    ("arrow", from_arrow),
    ("quoted_field", from_quoted_field),
    ("brace_scan", from_brace_scan),
];

// ============================================================================
// Entry Points
// ============================================================================

/// Recover a payload object from a blob of text
///
/// An object whose only content is a string is unwrapped: the string is
/// extracted again as is, then base64-decoded and extracted. Slurped files
/// and debug messages therefore yield the payload they carry.
#[must_use]
pub fn extract_payload(blob: &str) -> Option<Payload> {
    extract_at_depth(blob, 0)
}

/// Whether an extracted object carries diagnostic results
#[must_use]
pub fn is_diagnostics_payload(payload: &Payload) -> bool {
    payload.contains_key("results")
}

/// Try candidates in order and return the first diagnostics payload
///
/// Objects without a `results` map are skipped, so unrelated JSON in task
/// output does not shadow the real payload.
pub fn extract_from_candidates<'a, I>(candidates: I) -> Option<Payload>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .filter(|candidate| !candidate.trim().is_empty())
        .find_map(|candidate| extract_payload(candidate).filter(is_diagnostics_payload))
}

/// Candidate blobs for a finished command: all of stdout, each stdout line,
/// then stderr
#[must_use]
pub fn output_candidates<'a>(stdout: &'a str, stderr: &'a str) -> Vec<&'a str> {
    let mut candidates = vec![stdout];
    candidates.extend(stdout.lines());
    candidates.push(stderr);
    candidates
}

fn extract_at_depth(blob: &str, depth: usize) -> Option<Payload> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        strategy(blob).map(|payload| {
            debug!(strategy = name, depth, "payload extracted");
            unwrap_encoded(payload, depth)
        })
    })
}

// ============================================================================
// Strategies
// ============================================================================

/// Text between the sentinel markers
#[must_use]
pub fn from_sentinel(blob: &str) -> Option<Payload> {
    let start = blob.find(SENTINEL_START)? + SENTINEL_START.len();
    let len = blob[start..].find(SENTINEL_END)?;
    parse_object(&blob[start..start + len])
}

/// The whole blob is a JSON object
#[must_use]
pub fn from_direct(blob: &str) -> Option<Payload> {
    parse_object(blob)
}

/// First balanced object after a `=>`
#[must_use]
pub fn from_arrow(blob: &str) -> Option<Payload> {
    let arrow = blob.find(ARROW)?;
    let open = arrow + blob[arrow..].find('{')?;
    parse_object(balanced_object(blob, open)?)
}

/// Single-quoted `stdout='...'` field of a one-line summary
///
/// `\\`, `\'` and `\n` are unescaped; any other escape is kept verbatim so
/// JSON string escapes survive. If the unescaped text does not parse, the
/// raw field content is tried instead.
#[must_use]
pub fn from_quoted_field(blob: &str) -> Option<Payload> {
    let start = blob.find(QUOTED_FIELD_MARKER)? + QUOTED_FIELD_MARKER.len();
    let body = &blob[start..];

    let mut unescaped = String::with_capacity(body.len());
    let mut end = None;
    let mut chars = body.char_indices();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, '\\')) => unescaped.push('\\'),
                Some((_, '\'')) => unescaped.push('\''),
                Some((_, 'n')) => unescaped.push('\n'),
                Some((_, other)) => {
                    unescaped.push('\\');
                    unescaped.push(other);
                }
                None => unescaped.push('\\'),
            },
            '\'' => {
                end = Some(idx);
                break;
            }
            _ => unescaped.push(ch),
        }
    }

    let raw = &body[..end?];
    parse_object(&unescaped).or_else(|| parse_object(raw))
}

/// First balanced object starting at `{"` anywhere in the blob
#[must_use]
pub fn from_brace_scan(blob: &str) -> Option<Payload> {
    let open = blob.find(OBJECT_START)?;
    parse_object(balanced_object(blob, open)?)
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_object(text: &str) -> Option<Payload> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Slice from `text[open] == '{'` to its matching `}`
///
/// Braces inside JSON strings are ignored.
fn balanced_object(text: &str, open: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[open..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[open..=open + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Text held by a wrapper object
///
/// Either a `content` field (with `encoding` absent or `base64`) or the only
/// field of the object. The text is either a payload in its own right (a
/// debug `msg`) or base64 (a file slurp). Objects that already carry
/// `results` are never wrappers.
fn encoded_content(payload: &Payload) -> Option<&str> {
    if is_diagnostics_payload(payload) {
        return None;
    }
    if let Some(content) = payload.get("content").and_then(Value::as_str)
        && payload
            .get("encoding")
            .and_then(Value::as_str)
            .is_none_or(|encoding| encoding == "base64")
    {
        return Some(content);
    }
    if payload.len() == 1 {
        return payload.values().next().and_then(Value::as_str);
    }
    None
}

fn unwrap_encoded(payload: Payload, depth: usize) -> Payload {
    if depth >= MAX_UNWRAP_DEPTH {
        return payload;
    }
    let Some(content) = encoded_content(&payload) else {
        return payload;
    };

    if let Some(inner) = extract_at_depth(content, depth + 1) {
        debug!(depth, "unwrapped embedded payload");
        return inner;
    }

    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return payload;
    }

    let inner = STANDARD
        .decode(compact.as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|text| extract_at_depth(&text, depth + 1));

    match inner {
        Some(inner) => {
            debug!(depth, "unwrapped base64 payload");
            inner
        }
        None => payload,
    }
}
