//! StructureNormalizer: turns the loose JSON value the extractor recovered
//! into a typed `CandidateRecord`. Fills defaults for every field, coerces
//! enum-like strings to their canonical values, clamps the impact score, and
//! relocates a known extraction defect (an `action` object nested under
//! `event`). Idempotent; never fails on malformed input.

use serde_json::Value;

use tickerwire_common::taxonomy::{
    self, DEFAULT_ACTION_KIND, DEFAULT_EVENT_KIND, DEFAULT_SUBCATEGORY,
};
use tickerwire_common::{
    Action, CandidateRecord, Context, Direction, Entities, Event, EventCategory, Magnitude,
    Metrics, Risk, Sentiment, TokenRef, Tokens, Trend, TrendDirection,
};

/// Provenance flags recorded on the candidate when a repair fires.
pub const FLAG_RELOCATED_ACTION: &str = "relocated_action";
pub const FLAG_DEFAULTED_CATEGORY: &str = "defaulted_category";
pub const FLAG_DEFAULTED_SUBCATEGORY: &str = "defaulted_subcategory";
pub const FLAG_DEFAULTED_EVENT_KIND: &str = "defaulted_event_type";
pub const FLAG_DEFAULTED_ACTION_KIND: &str = "defaulted_action_type";

/// Normalize a recovered JSON value into a candidate record.
///
/// Returns `None` only when the input itself is absent or JSON null; any
/// other shape normalizes best-effort.
pub fn normalize(value: Option<Value>) -> Option<CandidateRecord> {
    let value = value?;
    if value.is_null() {
        return None;
    }
    let mut obj = value.as_object().cloned().unwrap_or_default();
    let mut flags: Vec<String> = obj
        .get("repairs")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    // Known extraction defect: action nested under event instead of at the
    // top level. Relocate before reading anything else.
    let nested_action = obj
        .get("event")
        .and_then(Value::as_object)
        .and_then(|e| e.get("action"))
        .filter(|a| a.is_object())
        .cloned();
    if let Some(action) = nested_action {
        if !obj.get("action").map(Value::is_object).unwrap_or(false) {
            obj.insert("action".into(), action);
            push_flag(&mut flags, FLAG_RELOCATED_ACTION);
        }
        if let Some(event) = obj.get_mut("event").and_then(Value::as_object_mut) {
            event.remove("action");
        }
    }

    let headline = obj
        .get("headline")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();

    let symbol = obj
        .get("tokens")
        .and_then(|t| t.get("primary"))
        .and_then(|p| p.get("symbol"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty());

    let event_obj = obj.get("event").cloned().unwrap_or(Value::Null);
    let category = match event_obj
        .get("category")
        .and_then(Value::as_str)
        .and_then(EventCategory::parse)
    {
        Some(cat) => cat,
        None => {
            push_flag(&mut flags, FLAG_DEFAULTED_CATEGORY);
            EventCategory::News
        }
    };

    let subcategory_raw = event_obj
        .get("subcategory")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_default();
    let row = match taxonomy::row(category, &subcategory_raw) {
        Some(row) => row,
        None => {
            push_flag(&mut flags, FLAG_DEFAULTED_SUBCATEGORY);
            // Fall back to the first row for this category so the pair stays
            // a taxonomy member (NEWS keeps its canonical default).
            taxonomy::row(category, DEFAULT_SUBCATEGORY)
                .or_else(|| taxonomy::TAXONOMY.iter().find(|r| r.category == category))
                .expect("every category has at least one taxonomy row")
        }
    };

    let kind_raw = event_obj
        .get("type")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_default();
    let kind = if row.kinds.contains(&kind_raw.as_str()) {
        kind_raw
    } else {
        push_flag(&mut flags, FLAG_DEFAULTED_EVENT_KIND);
        if row.kinds.contains(&DEFAULT_EVENT_KIND) {
            DEFAULT_EVENT_KIND.to_string()
        } else {
            row.kinds[0].to_string()
        }
    };

    let action_obj = obj.get("action").cloned().unwrap_or(Value::Null);
    let action_kind_raw = action_obj
        .get("type")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_default();
    let action_kind = if row.actions.contains(&action_kind_raw.as_str()) {
        action_kind_raw
    } else {
        push_flag(&mut flags, FLAG_DEFAULTED_ACTION_KIND);
        DEFAULT_ACTION_KIND.to_string()
    };

    let direction = action_obj
        .get("direction")
        .and_then(Value::as_str)
        .and_then(Direction::parse)
        .unwrap_or(Direction::Neutral);
    let magnitude = action_obj
        .get("magnitude")
        .and_then(Value::as_str)
        .and_then(Magnitude::parse)
        .unwrap_or(Magnitude::Medium);

    let entities = Entities {
        projects: string_list(obj.get("entities").and_then(|e| e.get("projects"))),
        persons: string_list(obj.get("entities").and_then(|e| e.get("persons"))),
        locations: string_list(obj.get("entities").and_then(|e| e.get("locations"))),
    };

    let metrics = Metrics {
        market: object_or_empty(obj.get("metrics").and_then(|m| m.get("market"))),
        onchain: object_or_empty(obj.get("metrics").and_then(|m| m.get("onchain"))),
    };

    let ctx_obj = obj.get("context").cloned().unwrap_or(Value::Null);
    let context = Context {
        impact: clamp_u8(ctx_obj.get("impact"), 0, 100),
        risk: Risk {
            market: clamp_u8(ctx_obj.get("risk").and_then(|r| r.get("market")), 0, 100),
            tech: clamp_u8(ctx_obj.get("risk").and_then(|r| r.get("tech")), 0, 100),
        },
        sentiment: Sentiment {
            market: clamp_i8(ctx_obj.get("sentiment").and_then(|s| s.get("market"))),
            social: clamp_i8(ctx_obj.get("sentiment").and_then(|s| s.get("social"))),
        },
        trend: Trend {
            short: trend_dir(ctx_obj.get("trend").and_then(|t| t.get("short"))),
            medium: trend_dir(ctx_obj.get("trend").and_then(|t| t.get("medium"))),
            strength: clamp_u8(ctx_obj.get("trend").and_then(|t| t.get("strength")), 0, 100),
        },
    };

    Some(CandidateRecord {
        headline,
        tokens: Tokens {
            primary: TokenRef { symbol },
        },
        event: Event {
            category,
            subcategory: row.subcategory.to_string(),
            kind,
        },
        action: Action {
            kind: action_kind,
            direction,
            magnitude,
        },
        entities,
        metrics,
        context,
        repairs: flags,
    })
}

fn push_flag(flags: &mut Vec<String>, flag: &str) {
    if !flags.iter().any(|f| f == flag) {
        flags.push(flag.to_string());
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn object_or_empty(value: Option<&Value>) -> Value {
    match value {
        Some(v) if v.is_object() => v.clone(),
        _ => Value::Object(serde_json::Map::new()),
    }
}

fn clamp_u8(value: Option<&Value>, min: i64, max: i64) -> u8 {
    value
        .and_then(Value::as_f64)
        .map(|n| (n.round() as i64).clamp(min, max) as u8)
        .unwrap_or(0)
}

fn clamp_i8(value: Option<&Value>) -> i8 {
    value
        .and_then(Value::as_f64)
        .map(|n| (n.round() as i64).clamp(-100, 100) as i8)
        .unwrap_or(0)
}

fn trend_dir(value: Option<&Value>) -> TrendDirection {
    value
        .and_then(Value::as_str)
        .and_then(TrendDirection::parse)
        .unwrap_or(TrendDirection::Sideways)
}
