//! The fixed table of valid (category, subcategory, event type, action type)
//! combinations. Rows are data; StructureNormalizer substitutes defaults for
//! anything that fails membership.

use crate::types::EventCategory;

pub const DEFAULT_SUBCATEGORY: &str = "TECHNICAL";
pub const DEFAULT_EVENT_KIND: &str = "UPDATE";
pub const DEFAULT_ACTION_KIND: &str = "NONE";

pub struct TaxonomyRow {
    pub category: EventCategory,
    pub subcategory: &'static str,
    pub kinds: &'static [&'static str],
    pub actions: &'static [&'static str],
}

pub const TAXONOMY: &[TaxonomyRow] = &[
    TaxonomyRow {
        category: EventCategory::Market,
        subcategory: "PRICE_MOVE",
        kinds: &["PUMP", "DUMP", "BREAKOUT", "BREAKDOWN"],
        actions: &["BUY", "SELL", "HOLD", "ALERT", "NONE"],
    },
    TaxonomyRow {
        category: EventCategory::Market,
        subcategory: "LIQUIDATION",
        kinds: &["LONG_LIQUIDATION", "SHORT_LIQUIDATION", "CASCADE"],
        actions: &["ALERT", "NONE"],
    },
    TaxonomyRow {
        category: EventCategory::Market,
        subcategory: "LISTING",
        kinds: &["LISTING", "DELISTING"],
        actions: &["BUY", "SELL", "ALERT", "NONE"],
    },
    TaxonomyRow {
        category: EventCategory::Market,
        subcategory: "VOLUME",
        kinds: &["SPIKE", "DROP"],
        actions: &["ALERT", "NONE"],
    },
    TaxonomyRow {
        category: EventCategory::Data,
        subcategory: "WHALE_MOVE",
        kinds: &["TRANSFER", "DEPOSIT", "WITHDRAW", "MINT", "BURN"],
        actions: &["TRANSFER", "DEPOSIT", "WITHDRAW", "ALERT", "NONE"],
    },
    TaxonomyRow {
        category: EventCategory::Data,
        subcategory: "ONCHAIN",
        kinds: &["FLOW", "SUPPLY", "ACTIVITY"],
        actions: &["ALERT", "NONE"],
    },
    TaxonomyRow {
        category: EventCategory::Data,
        subcategory: "FUNDING",
        kinds: &["RATE_SPIKE", "RATE_FLIP"],
        actions: &["ALERT", "NONE"],
    },
    TaxonomyRow {
        category: EventCategory::News,
        subcategory: "REGULATORY",
        kinds: &["POLICY", "ENFORCEMENT", "APPROVAL", "BAN", "LAWSUIT", "HEARING"],
        actions: &["ALERT", "NONE"],
    },
    TaxonomyRow {
        category: EventCategory::News,
        subcategory: "TECHNICAL",
        kinds: &["UPDATE", "UPGRADE", "OUTAGE", "HACK", "EXPLOIT"],
        actions: &["ALERT", "NONE"],
    },
    TaxonomyRow {
        category: EventCategory::News,
        subcategory: "BUSINESS",
        kinds: &["PARTNERSHIP", "ACQUISITION", "FUNDING_ROUND", "LISTING"],
        actions: &["ALERT", "NONE"],
    },
    TaxonomyRow {
        category: EventCategory::News,
        subcategory: "MACRO",
        kinds: &["RATE_DECISION", "INFLATION", "GEOPOLITICAL"],
        actions: &["ALERT", "NONE"],
    },
    TaxonomyRow {
        category: EventCategory::Ignored,
        subcategory: "OTHER",
        kinds: &["UPDATE"],
        actions: &["NONE"],
    },
];

/// Look up the row for a (category, subcategory) pair.
pub fn row(category: EventCategory, subcategory: &str) -> Option<&'static TaxonomyRow> {
    TAXONOMY
        .iter()
        .find(|r| r.category == category && r.subcategory == subcategory)
}

/// Full membership check for a (category, subcategory, type, action) tuple.
pub fn is_valid(category: EventCategory, subcategory: &str, kind: &str, action: &str) -> bool {
    row(category, subcategory)
        .map(|r| r.kinds.contains(&kind) && r.actions.contains(&action))
        .unwrap_or(false)
}
