//! RecoveryParser: best-effort conversion of raw model output into a JSON
//! value. Tolerates markdown fences, surrounding prose, truncated JSON,
//! trailing commas, semicolon-joined arrays, and a couple of known
//! generation artifacts. Pure and deterministic; no I/O.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Top-level keys a complete extraction must carry.
pub const REQUIRED_KEYS: [&str; 7] = [
    "headline", "tokens", "event", "action", "entities", "metrics", "context",
];

#[derive(Debug, Error)]
#[error("unrecoverable model output: {0}")]
pub struct ParseFailure(pub String);

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("trailing comma regex"));

static SYMBOL_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""symbol"\s*:\s*"([^"]*)""#).expect("symbol field regex"));

/// Recover a JSON object from raw model output.
///
/// Steps, in order: strip code fences; direct parse; brace-balanced
/// candidate scan scored by required-key count; textual repairs followed by
/// one retry (direct parse, then one more candidate scan over the repaired
/// text for JSON that was truncated mid-prose).
pub fn recover(response: &str) -> Result<Value, ParseFailure> {
    let stripped = strip_code_fences(response);

    if let Ok(value) = serde_json::from_str::<Value>(stripped) {
        if value.is_object() {
            return Ok(value);
        }
    }

    if let Some(value) = best_candidate(stripped) {
        return Ok(value);
    }

    let repaired = apply_repairs(stripped);
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        if value.is_object() {
            return Ok(value);
        }
    }
    if let Some(value) = best_candidate(&repaired) {
        return Ok(value);
    }

    Err(ParseFailure(truncate_for_error(response)))
}

/// Strip markdown code-fence markers from a response.
pub fn strip_code_fences(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Scan for brace-balanced `{...}` substrings and return the parseable one
/// with the most required top-level keys. Returns immediately on a candidate
/// carrying all of them.
fn best_candidate(s: &str) -> Option<Value> {
    let mut best: Option<(usize, Value)> = None;
    for candidate in balanced_objects(s) {
        let Ok(value) = serde_json::from_str::<Value>(candidate) else {
            continue;
        };
        if !value.is_object() {
            continue;
        }
        let keys = required_key_count(&value);
        if keys == REQUIRED_KEYS.len() {
            return Some(value);
        }
        if best.as_ref().map(|(k, _)| keys > *k).unwrap_or(true) {
            best = Some((keys, value));
        }
    }
    best.map(|(_, v)| v)
}

fn required_key_count(value: &Value) -> usize {
    let Some(obj) = value.as_object() else {
        return 0;
    };
    REQUIRED_KEYS.iter().filter(|k| obj.contains_key(**k)).count()
}

/// Top-level balanced `{...}` slices, string-aware.
fn balanced_objects(s: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escape = false;

    for (i, c) in s.char_indices() {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(begin) = start.take() {
                            candidates.push(&s[begin..=i]);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    candidates
}

/// Fixed repair sequence: rebalance missing closers, delete trailing commas,
/// fix the doubled-quote headline artifact, null out non-Latin token
/// symbols, and rejoin semicolon-separated arrays.
fn apply_repairs(s: &str) -> String {
    let rejoined = fix_semicolon_arrays(s);
    let rebalanced = rebalance(&rejoined);
    let no_trailing = TRAILING_COMMA_RE.replace_all(&rebalanced, "$1").into_owned();
    let headline_fixed = no_trailing.replace("\"\"headline\"", "\"headline\"");
    SYMBOL_FIELD_RE
        .replace_all(&headline_fixed, |caps: &regex::Captures<'_>| {
            if caps[1].chars().all(|c| c.is_ascii()) {
                caps[0].to_string()
            } else {
                "\"symbol\": null".to_string()
            }
        })
        .into_owned()
}

/// Append closers for unmatched `{`/`[` (and an unterminated string) so a
/// truncated response at least parses structurally.
fn rebalance(s: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for c in s.chars() {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&c) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    let mut out = s.to_string();
    if in_string {
        out.push('"');
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

/// Replace `;` separators with `,` inside array context (string-aware).
fn fix_semicolon_arrays(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut bracket_depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for c in s.chars() {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '[' => {
                bracket_depth += 1;
                out.push(c);
            }
            ']' => {
                bracket_depth = bracket_depth.saturating_sub(1);
                out.push(c);
            }
            ';' if bracket_depth > 0 => out.push(','),
            _ => out.push(c),
        }
    }
    out
}

fn truncate_for_error(s: &str) -> String {
    let trimmed = s.trim();
    let mut end = trimmed.len().min(120);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_record() -> Value {
        json!({
            "headline": "BTC WHALE MOVES $120M TO BINANCE",
            "tokens": { "primary": { "symbol": "BTC" } },
            "event": { "category": "DATA", "subcategory": "WHALE_MOVE", "type": "TRANSFER" },
            "action": { "type": "TRANSFER", "direction": "NEUTRAL", "magnitude": "LARGE" },
            "entities": { "projects": ["Binance"], "persons": [], "locations": [] },
            "metrics": { "market": {}, "onchain": { "amount_usd": 120000000 } },
            "context": {
                "impact": 75,
                "risk": { "market": 60, "tech": 10 },
                "sentiment": { "market": -20, "social": 0 },
                "trend": { "short": "DOWN", "medium": "SIDEWAYS", "strength": 40 }
            }
        })
    }

    #[test]
    fn well_formed_round_trips() {
        let record = full_record();
        let text = serde_json::to_string_pretty(&record).unwrap();
        assert_eq!(recover(&text).unwrap(), record);
    }

    #[test]
    fn strips_markdown_fences() {
        let record = full_record();
        let fenced = format!("```json\n{}\n```", serde_json::to_string(&record).unwrap());
        assert_eq!(recover(&fenced).unwrap(), record);
    }

    #[test]
    fn extracts_object_from_surrounding_prose() {
        let record = full_record();
        let text = format!(
            "Here is the extraction you asked for:\n{}\nLet me know if you need anything else.",
            serde_json::to_string(&record).unwrap()
        );
        assert_eq!(recover(&text).unwrap(), record);
    }

    #[test]
    fn prefers_candidate_with_most_required_keys() {
        let record = full_record();
        let text = format!(
            "{{\"note\": \"partial\"}} then {}",
            serde_json::to_string(&record).unwrap()
        );
        assert_eq!(recover(&text).unwrap(), record);
    }

    #[test]
    fn repairs_trailing_comma() {
        let text = serde_json::to_string_pretty(&full_record())
            .unwrap()
            .replace("\"strength\": 40", "\"strength\": 40,");
        let value = recover(&text).unwrap();
        assert_eq!(required_key_count(&value), REQUIRED_KEYS.len());
    }

    #[test]
    fn repairs_missing_closing_brace() {
        let mut text = serde_json::to_string(&full_record()).unwrap();
        text.pop();
        let value = recover(&text).unwrap();
        assert_eq!(required_key_count(&value), REQUIRED_KEYS.len());
    }

    #[test]
    fn repairs_semicolon_joined_array() {
        let text = serde_json::to_string(&full_record())
            .unwrap()
            .replace(r#"["Binance"]"#, r#"["Binance"; "Coinbase"]"#);
        let value = recover(&text).unwrap();
        assert_eq!(required_key_count(&value), REQUIRED_KEYS.len());
        assert_eq!(value["entities"]["projects"][1], "Coinbase");
    }

    #[test]
    fn repairs_doubled_quote_headline_artifact() {
        let text = serde_json::to_string(&full_record())
            .unwrap()
            .replace("{\"headline\"", "{\"\"headline\"");
        let value = recover(&text).unwrap();
        assert_eq!(required_key_count(&value), REQUIRED_KEYS.len());
    }

    #[test]
    fn nulls_non_latin_symbol() {
        let mut text = serde_json::to_string(&full_record())
            .unwrap()
            .replace(r#""symbol":"BTC""#, r#""symbol": "ビット""#);
        // Force the repair path; the direct parse would otherwise accept it.
        text.pop();
        let value = recover(&text).unwrap();
        assert!(value["tokens"]["primary"]["symbol"].is_null());
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scan() {
        let record = json!({
            "headline": "odd {brace} in text",
            "tokens": { "primary": { "symbol": null } },
            "event": { "category": "NEWS", "subcategory": "TECHNICAL", "type": "UPDATE" },
            "action": { "type": "NONE", "direction": "NEUTRAL", "magnitude": "MEDIUM" },
            "entities": { "projects": [], "persons": [], "locations": [] },
            "metrics": { "market": {}, "onchain": {} },
            "context": {
                "impact": 0,
                "risk": { "market": 0, "tech": 0 },
                "sentiment": { "market": 0, "social": 0 },
                "trend": { "short": "SIDEWAYS", "medium": "SIDEWAYS", "strength": 0 }
            }
        });
        let text = format!("output: {}", serde_json::to_string(&record).unwrap());
        assert_eq!(recover(&text).unwrap(), record);
    }

    #[test]
    fn truncated_mid_string_recovers() {
        let text = r#"{"headline": "BTC hits new high", "tokens": {"primary": {"symbol": "BT"#;
        let value = recover(text).unwrap();
        assert_eq!(value["headline"], "BTC hits new high");
    }

    #[test]
    fn hopeless_input_fails() {
        assert!(recover("no structure here at all").is_err());
        assert!(recover("").is_err());
    }

    #[test]
    fn bare_array_is_not_an_object() {
        assert!(recover("[1, 2, 3]").is_err());
    }
}
