//! SimilarityGate: queries recent history for near-duplicates of a message
//! fingerprint and returns a duplicate/novel verdict. The duplicate
//! threshold depends on the content category: DATA events (whale moves,
//! on-chain flows) are worded so uniformly that only a much tighter match
//! counts as a duplicate.
//!
//! Invoked twice per message: before extraction with a keyword category
//! guess, and after extraction when the confirmed category is DATA.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use tickerwire_common::{EventCategory, PipelineError, SimilarityMatch};

use crate::store::SimilarityStore;

/// Matches below this similarity are never considered.
pub const CANDIDATE_FLOOR: f64 = 0.65;
/// Duplicate threshold for DATA-category content.
pub const DATA_DUP_THRESHOLD: f64 = 0.92;
/// Duplicate threshold for everything else.
pub const DEFAULT_DUP_THRESHOLD: f64 = 0.65;
/// How many neighbors to consider.
pub const TOP_K: usize = 5;

/// Dollar transfers at or above this size always get processed, however
/// similar they look to recent history.
const WHALE_BYPASS_USD: f64 = 50_000_000.0;

static DOLLAR_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)\s*(million|billion|mln|bln|m|b)?\b")
        .expect("dollar amount regex")
});

const DATA_KEYWORDS: &[&str] = &[
    "whale",
    "transferred",
    "transfer",
    "moved",
    "minted",
    "burned",
    "deposited",
    "withdrawn",
    "wallet",
    "on-chain",
    "onchain",
];

#[derive(Debug, Clone, PartialEq)]
pub struct GateVerdict {
    pub is_duplicate: bool,
    pub matches: Vec<SimilarityMatch>,
}

/// The duplicate threshold for a (possibly unknown) category.
pub fn duplicate_threshold(category: Option<EventCategory>) -> f64 {
    match category {
        Some(EventCategory::Data) => DATA_DUP_THRESHOLD,
        _ => DEFAULT_DUP_THRESHOLD,
    }
}

/// Cheap keyword-based category guess used for the pre-extraction check,
/// before the model has confirmed anything.
pub fn guess_category(raw: &str) -> Option<EventCategory> {
    let lower = raw.to_lowercase();
    if DATA_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        Some(EventCategory::Data)
    } else {
        None
    }
}

/// True when the raw text evidences a monetary transfer of $50M or more.
pub fn has_whale_amount(raw: &str) -> bool {
    for caps in DOLLAR_AMOUNT_RE.captures_iter(raw) {
        let digits: String = caps[1].chars().filter(|c| *c != ',').collect();
        let Ok(base) = digits.parse::<f64>() else {
            continue;
        };
        let multiplier = match caps.get(2).map(|m| m.as_str().to_lowercase()) {
            Some(s) if s == "million" || s == "mln" || s == "m" => 1_000_000.0,
            Some(s) if s == "billion" || s == "bln" || s == "b" => 1_000_000_000.0,
            _ => 1.0,
        };
        if base * multiplier >= WHALE_BYPASS_USD {
            return true;
        }
    }
    false
}

pub struct SimilarityGate<S> {
    store: Arc<S>,
    window_hours: i64,
}

impl<S: SimilarityStore> SimilarityGate<S> {
    pub fn new(store: Arc<S>, window_hours: i64) -> Self {
        Self {
            store,
            window_hours,
        }
    }

    /// Query the recent window for near-duplicates of `embedding` and apply
    /// the category-dependent threshold.
    pub async fn check(
        &self,
        embedding: &[f32],
        category: Option<EventCategory>,
    ) -> Result<GateVerdict, PipelineError> {
        let matches = self
            .store
            .query_nearest(embedding, self.window_hours, CANDIDATE_FLOOR, TOP_K)
            .await?;
        let threshold = duplicate_threshold(category);
        let is_duplicate = matches.iter().any(|m| m.score > threshold);
        debug!(
            candidates = matches.len(),
            threshold,
            is_duplicate,
            "similarity gate checked"
        );
        Ok(GateVerdict {
            is_duplicate,
            matches,
        })
    }
}
