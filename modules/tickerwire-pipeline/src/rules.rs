//! ValidationRuleEngine: the ordered chain of hallucination checks, taxonomy
//! checks, and impact-scoring rules. Rules are data — an ordered slice of
//! named entries evaluated by one interpreter — so each is testable in
//! isolation and reorderable without touching control flow.
//!
//! The first matching rejection short-circuits. The pre-persistence sweep
//! (`final_sweep`) runs after the confirmed-category re-dedup and is
//! authoritative for what gets persisted.

use tracing::debug;

use tickerwire_common::{CandidateRecord, EventCategory, ExtractedText, RejectReason};

use crate::normalize::FLAG_DEFAULTED_CATEGORY;

// --- Vocabulary ---

/// Symbols never rejected as hallucinated, even when absent from the text.
const ALWAYS_ALLOWED_SYMBOLS: &[&str] = &["BTC", "ETH"];

const MAJOR_EXCHANGES: &[&str] = &["binance", "coinbase", "kraken", "okx", "bybit"];

const MAJOR_COMPANIES: &[&str] = &[
    "microstrategy",
    "blackrock",
    "tether",
    "circle",
    "ripple",
    "grayscale",
];

const MAJOR_ASSETS: &[&str] = &[
    "btc", "bitcoin", "eth", "ethereum", "sol", "solana", "xrp", "usdt", "usdc",
];

const US_SYNONYMS: &[&str] = &["united states", "u.s.", "us", "usa", "u.s.a.", "america"];

const DISCUSSION_TERMS: &[&str] = &[
    "roundtable",
    "panel",
    "discussion",
    "debate",
    "considers",
    "considering",
    "exploring",
    "to discuss",
    "workshop",
];

const ACTION_VERBS: &[&str] = &[
    "approved",
    "passed",
    "signed",
    "enacted",
    "banned",
    "fined",
    "charged",
    "sued",
    "sanctioned",
    "ordered",
    "ruled",
    "finalized",
];

const SANCTION_TERMS: &[&str] = &["sanction", "sanctions", "designated", "sdn list", "added to"];

/// Headline terms that must be corroborated by the clean text.
const CRITICAL_SWEEP_TERMS: &[&str] = &[
    "white house",
    "strategic reserve",
    "policy clarification",
    "executive order",
    "emergency meeting",
];

// Impact floors for structurally recognizable high-value news (rule 3).
const FLOOR_BITCOIN_RESERVE: u8 = 75;
const FLOOR_LIQUIDATION: u8 = 70;
const FLOOR_EXCHANGE_LISTING: u8 = 55;
const FLOOR_MAJOR_COMPANY: u8 = 40;

const POLICY_NO_SUBSTANCE_CAP: u8 = 45;
const TREASURY_SANCTIONS_CAP: u8 = 60;
const TREASURY_DEFAULT_CAP: u8 = 40;

const LOW_IMPACT_FLOOR: u8 = 30;
const REGULATORY_RELEVANCE_FLOOR: u8 = 45;

// --- Rule plumbing ---

pub struct RuleCtx<'a> {
    pub record: &'a mut CandidateRecord,
    raw_lower: String,
    clean_lower: String,
    headline_lower: String,
}

impl<'a> RuleCtx<'a> {
    fn new(record: &'a mut CandidateRecord, text: &ExtractedText) -> Self {
        let headline_lower = record.headline.to_lowercase();
        Self {
            record,
            raw_lower: text.raw.to_lowercase(),
            clean_lower: text.clean.to_lowercase(),
            headline_lower,
        }
    }

    fn is_regulatory(&self) -> bool {
        self.record.event.category == EventCategory::News
            && self.record.event.subcategory == "REGULATORY"
    }
}

pub struct Rule {
    pub name: &'static str,
    pub check: fn(&mut RuleCtx<'_>) -> Option<RejectReason>,
}

/// The ordered rule chain. First rejection wins.
pub const PIPELINE_RULES: &[Rule] = &[
    Rule {
        name: "taxonomy_completeness",
        check: taxonomy_completeness,
    },
    Rule {
        name: "symbol_hallucination",
        check: symbol_hallucination,
    },
    Rule {
        name: "impact_floors",
        check: impact_floors,
    },
    Rule {
        name: "regulatory_suppression",
        check: regulatory_suppression,
    },
    Rule {
        name: "low_impact_floor",
        check: low_impact_floor,
    },
    Rule {
        name: "regulatory_relevance_floor",
        check: regulatory_relevance_floor,
    },
];

/// Run the synchronous rule chain. Mutates the record (floors, caps, symbol
/// nulling) as rules fire. The confirmed-category re-dedup and the final
/// sweep run separately, in that order, after this returns `Ok`.
pub fn evaluate(record: &mut CandidateRecord, text: &ExtractedText) -> Result<(), RejectReason> {
    // Looser early pass: null out (never reject) symbols with no substring
    // evidence at all, so later decisions see a defensible record.
    null_unevidenced_symbol(record, &text.raw.to_lowercase());

    let mut ctx = RuleCtx::new(record, text);
    for rule in PIPELINE_RULES {
        if let Some(reason) = (rule.check)(&mut ctx) {
            debug!(rule = rule.name, reason = %reason, "rule rejected record");
            return Err(reason);
        }
    }
    Ok(())
}

/// Pre-persistence sweep: silently strip entities and locations without
/// literal evidence in the raw text, null any still-unverified symbol, and
/// reject on critical headline terms absent from the clean text. This pass
/// is authoritative for what is persisted.
pub fn final_sweep(record: &mut CandidateRecord, text: &ExtractedText) -> Result<(), RejectReason> {
    let raw_lower = text.raw.to_lowercase();
    let clean_lower = text.clean.to_lowercase();

    record
        .entities
        .locations
        .retain(|loc| location_present(&raw_lower, loc));
    record
        .entities
        .persons
        .retain(|p| contains_word(&raw_lower, &p.to_lowercase()));
    record
        .entities
        .projects
        .retain(|p| contains_word(&raw_lower, &p.to_lowercase()));

    if let Some(symbol) = record.tokens.primary.symbol.clone() {
        if !symbol_verified(&raw_lower, &symbol) && !is_always_allowed(&symbol) {
            record.tokens.primary.symbol = None;
        }
    }

    let headline_lower = record.headline.to_lowercase();
    for term in CRITICAL_SWEEP_TERMS {
        if headline_lower.contains(term) && !clean_lower.contains(term) {
            return Err(RejectReason::SevereHallucination);
        }
    }
    Ok(())
}

// --- Rules, in chain order ---

/// Rule 1: the model must have asserted a category itself; records that only
/// have the defaulted category are incomplete. IGNORED classifications never
/// persist either.
fn taxonomy_completeness(ctx: &mut RuleCtx<'_>) -> Option<RejectReason> {
    if ctx
        .record
        .repairs
        .iter()
        .any(|f| f == FLAG_DEFAULTED_CATEGORY)
    {
        return Some(RejectReason::MissingCategory);
    }
    if ctx.record.event.category == EventCategory::Ignored {
        return Some(RejectReason::IgnoredCategory);
    }
    None
}

/// Rule 2: a non-null symbol must appear literally in the raw text (bare or
/// $-prefixed, case-insensitive) unless it is an always-allowed major.
fn symbol_hallucination(ctx: &mut RuleCtx<'_>) -> Option<RejectReason> {
    let Some(symbol) = ctx.record.tokens.primary.symbol.as_deref() else {
        return None;
    };
    if is_always_allowed(symbol) || symbol_verified(&ctx.raw_lower, symbol) {
        return None;
    }
    Some(RejectReason::HallucinatedSymbol)
}

/// Rule 3: category-conditioned impact floors. Only fires while impact is
/// still at its default of 0, so a model-scored record is never inflated.
fn impact_floors(ctx: &mut RuleCtx<'_>) -> Option<RejectReason> {
    if ctx.record.context.impact != 0 {
        return None;
    }
    let mut floor = 0u8;

    if ctx.is_regulatory()
        && ctx.headline_lower.contains("bitcoin")
        && ctx.headline_lower.contains("reserve")
    {
        floor = floor.max(FLOOR_BITCOIN_RESERVE);
    }
    if ctx.record.event.category == EventCategory::Market
        && ctx.headline_lower.contains("liquidat")
    {
        floor = floor.max(FLOOR_LIQUIDATION);
    }
    if MAJOR_EXCHANGES
        .iter()
        .any(|e| ctx.raw_lower.contains(e) || ctx.headline_lower.contains(e))
        && (ctx.headline_lower.contains("list") || ctx.raw_lower.contains("listing"))
    {
        floor = floor.max(FLOOR_EXCHANGE_LISTING);
    }
    if MAJOR_COMPANIES
        .iter()
        .any(|c| ctx.raw_lower.contains(c) || ctx.headline_lower.contains(c))
    {
        floor = floor.max(FLOOR_MAJOR_COMPANY);
    }

    if floor > 0 {
        ctx.record.context.impact = floor;
        ctx.record.repairs.push(format!("impact_floor_{floor}"));
    }
    None
}

/// Rule 4: regulatory-specific suppression (NEWS/REGULATORY only).
fn regulatory_suppression(ctx: &mut RuleCtx<'_>) -> Option<RejectReason> {
    if !ctx.is_regulatory() {
        return None;
    }

    // 4a: every named location must appear literally in the raw text.
    let locations = &ctx.record.entities.locations;
    if !locations.is_empty()
        && locations
            .iter()
            .all(|loc| !location_present(&ctx.raw_lower, loc))
    {
        return Some(RejectReason::HallucinatedLocation);
    }

    // 4b: discussion vocabulary without any decision language.
    let discussed = DISCUSSION_TERMS
        .iter()
        .any(|t| ctx.raw_lower.contains(t) || ctx.headline_lower.contains(t));
    let decided = ACTION_VERBS.iter().any(|v| contains_word(&ctx.raw_lower, v));
    if discussed && !decided {
        ctx.record.context.impact = 0;
        return Some(RejectReason::RegulatoryDiscussionNoAction);
    }

    // 4c: POLICY events need the literal word and a concrete action.
    if ctx.record.event.kind == "POLICY" {
        if !ctx.raw_lower.contains("policy") {
            return Some(RejectReason::PolicyHallucination);
        }
        if !decided {
            ctx.record.context.impact = 0;
            return Some(RejectReason::PolicyWithoutAction);
        }
    }

    // 4d: a White House headline must be backed by the raw text.
    if ctx.headline_lower.contains("white house") && !ctx.raw_lower.contains("white house") {
        return Some(RejectReason::WhiteHouseHallucination);
    }

    // 4e: caps. POLICY without a major token and a major action verb stays
    // mid-tier; Treasury/OFAC content caps at 60 with sanctions language,
    // 40 without.
    if ctx.record.event.kind == "POLICY" {
        let has_major = MAJOR_ASSETS.iter().any(|a| contains_word(&ctx.raw_lower, a));
        if !has_major && !decided {
            ctx.record.context.impact = ctx.record.context.impact.min(POLICY_NO_SUBSTANCE_CAP);
        }
    }
    if ctx.raw_lower.contains("treasury") || ctx.raw_lower.contains("ofac") {
        let cap = if SANCTION_TERMS.iter().any(|t| ctx.raw_lower.contains(t)) {
            TREASURY_SANCTIONS_CAP
        } else {
            TREASURY_DEFAULT_CAP
        };
        ctx.record.context.impact = ctx.record.context.impact.min(cap);
    }

    None
}

/// Rule 5: nothing at or below the global impact floor persists.
fn low_impact_floor(ctx: &mut RuleCtx<'_>) -> Option<RejectReason> {
    if ctx.record.context.impact <= LOW_IMPACT_FLOOR {
        return Some(RejectReason::LowImpact);
    }
    None
}

/// Rule 6: mid-impact regulatory news must at least mention a major asset.
fn regulatory_relevance_floor(ctx: &mut RuleCtx<'_>) -> Option<RejectReason> {
    if ctx.is_regulatory()
        && ctx.record.context.impact < REGULATORY_RELEVANCE_FLOOR
        && !MAJOR_ASSETS
            .iter()
            .any(|a| contains_word(&ctx.clean_lower, a))
    {
        return Some(RejectReason::LowRelevanceRegulatory);
    }
    None
}

// --- Shared predicates ---

fn is_always_allowed(symbol: &str) -> bool {
    ALWAYS_ALLOWED_SYMBOLS
        .iter()
        .any(|s| s.eq_ignore_ascii_case(symbol))
}

/// Strict verification: the symbol appears as a bare word or $-prefixed word.
fn symbol_verified(raw_lower: &str, symbol: &str) -> bool {
    let sym = symbol.to_lowercase();
    contains_word(raw_lower, &sym) || raw_lower.contains(&format!("${sym}"))
}

/// Looser early pass: any substring evidence keeps the symbol; none nulls it.
fn null_unevidenced_symbol(record: &mut CandidateRecord, raw_lower: &str) {
    if let Some(symbol) = record.tokens.primary.symbol.clone() {
        if !is_always_allowed(&symbol) && !raw_lower.contains(&symbol.to_lowercase()) {
            record.tokens.primary.symbol = None;
            record.repairs.push("unverified_symbol_nulled".to_string());
        }
    }
}

fn location_present(raw_lower: &str, location: &str) -> bool {
    let loc = location.trim().to_lowercase();
    if loc.is_empty() {
        return false;
    }
    if US_SYNONYMS.contains(&loc.as_str()) {
        return US_SYNONYMS.iter().any(|s| contains_word(raw_lower, s));
    }
    contains_word(raw_lower, &loc)
}

/// Word-boundary containment: `needle` must not be flanked by alphanumerics.
/// Both sides are expected to be lowercase already.
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(needle) {
        let begin = from + pos;
        let end = begin + needle.len();
        let before_ok = begin == 0
            || !haystack[..begin]
                .chars()
                .next_back()
                .is_some_and(char::is_alphanumeric);
        let after_ok = end == haystack.len()
            || !haystack[end..].chars().next().is_some_and(char::is_alphanumeric);
        if before_ok && after_ok {
            return true;
        }
        from = end;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tickerwire_common::{
        Action, Context, Direction, Entities, Event, Magnitude, Metrics, Risk, Sentiment,
        TokenRef, Tokens, Trend, TrendDirection,
    };

    fn text(raw: &str) -> ExtractedText {
        ExtractedText {
            raw: raw.to_string(),
            clean: crate::text::clean_view(raw),
            author: "unknown".to_string(),
            retransmit_author: None,
        }
    }

    fn record(
        category: EventCategory,
        subcategory: &str,
        kind: &str,
        headline: &str,
        impact: u8,
    ) -> CandidateRecord {
        CandidateRecord {
            headline: headline.to_string(),
            tokens: Tokens {
                primary: TokenRef { symbol: None },
            },
            event: Event {
                category,
                subcategory: subcategory.to_string(),
                kind: kind.to_string(),
            },
            action: Action {
                kind: "NONE".to_string(),
                direction: Direction::Neutral,
                magnitude: Magnitude::Medium,
            },
            entities: Entities::default(),
            metrics: Metrics::default(),
            context: Context {
                impact,
                risk: Risk::default(),
                sentiment: Sentiment::default(),
                trend: Trend {
                    short: TrendDirection::Sideways,
                    medium: TrendDirection::Sideways,
                    strength: 0,
                },
            },
            repairs: Vec::new(),
        }
    }

    #[test]
    fn defaulted_category_is_rejected_as_missing() {
        let mut r = record(EventCategory::News, "TECHNICAL", "UPDATE", "Something", 50);
        r.repairs.push(FLAG_DEFAULTED_CATEGORY.to_string());
        let err = evaluate(&mut r, &text("some perfectly fine raw text here")).unwrap_err();
        assert_eq!(err, RejectReason::MissingCategory);
    }

    #[test]
    fn ignored_category_is_rejected() {
        let mut r = record(EventCategory::Ignored, "OTHER", "UPDATE", "noise", 50);
        let err = evaluate(&mut r, &text("chatter with no market content at all")).unwrap_err();
        assert_eq!(err, RejectReason::IgnoredCategory);
    }

    #[test]
    fn hallucinated_symbol_rejects() {
        let mut r = record(EventCategory::Market, "PRICE_MOVE", "PUMP", "PEPE pumps", 60);
        // Substring evidence ("pepecoin") survives the loose pass but fails
        // the strict word-boundary check.
        r.tokens.primary.symbol = Some("PEPE".to_string());
        let err = evaluate(&mut r, &text("pepecoin community is excited today")).unwrap_err();
        assert_eq!(err, RejectReason::HallucinatedSymbol);
    }

    #[test]
    fn dollar_prefixed_symbol_verifies() {
        let mut r = record(EventCategory::Market, "PRICE_MOVE", "PUMP", "SOL pumps", 60);
        r.tokens.primary.symbol = Some("SOL".to_string());
        assert!(evaluate(&mut r, &text("$SOL breaks out above resistance level")).is_ok());
        assert_eq!(r.tokens.primary.symbol.as_deref(), Some("SOL"));
    }

    #[test]
    fn major_symbol_is_always_allowed() {
        let mut r = record(EventCategory::Market, "PRICE_MOVE", "PUMP", "leader pumps", 60);
        r.tokens.primary.symbol = Some("BTC".to_string());
        assert!(evaluate(&mut r, &text("the market leader is pumping hard today")).is_ok());
        assert_eq!(r.tokens.primary.symbol.as_deref(), Some("BTC"));
    }

    #[test]
    fn unevidenced_symbol_is_nulled_not_rejected() {
        let mut r = record(EventCategory::Market, "PRICE_MOVE", "PUMP", "alt pumps", 60);
        r.tokens.primary.symbol = Some("WIF".to_string());
        assert!(evaluate(&mut r, &text("an unnamed altcoin is moving fast today")).is_ok());
        assert!(r.tokens.primary.symbol.is_none());
        assert!(r.repairs.iter().any(|f| f == "unverified_symbol_nulled"));
    }

    #[test]
    fn bitcoin_reserve_headline_gets_floor() {
        let mut r = record(
            EventCategory::News,
            "REGULATORY",
            "APPROVAL",
            "Bitcoin strategic reserve approved",
            0,
        );
        let raw = "BREAKING: strategic reserve of bitcoin approved by congress";
        assert!(evaluate(&mut r, &text(raw)).is_ok());
        assert_eq!(r.context.impact, 75);
    }

    #[test]
    fn liquidation_headline_gets_floor() {
        let mut r = record(
            EventCategory::Market,
            "LIQUIDATION",
            "CASCADE",
            "Massive liquidations cascade across exchanges",
            0,
        );
        assert!(evaluate(&mut r, &text("over $800 million in longs liquidated in an hour")).is_ok());
        assert_eq!(r.context.impact, 70);
    }

    #[test]
    fn exchange_listing_gets_floor() {
        let mut r = record(
            EventCategory::Market,
            "LISTING",
            "LISTING",
            "Coinbase lists new asset",
            0,
        );
        assert!(evaluate(&mut r, &text("coinbase announces listing of a new asset today")).is_ok());
        assert_eq!(r.context.impact, 55);
    }

    #[test]
    fn model_scored_impact_is_never_inflated() {
        let mut r = record(
            EventCategory::Market,
            "LIQUIDATION",
            "CASCADE",
            "Liquidations cascade",
            35,
        );
        assert!(evaluate(&mut r, &text("a modest liquidation event unfolded overnight")).is_ok());
        assert_eq!(r.context.impact, 35);
    }

    #[test]
    fn hallucinated_location_rejects() {
        let mut r = record(
            EventCategory::News,
            "REGULATORY",
            "ENFORCEMENT",
            "Regulators fined exchange",
            60,
        );
        r.entities.locations = vec!["Singapore".to_string()];
        let err = evaluate(&mut r, &text("regulators fined a bitcoin exchange yesterday")).unwrap_err();
        assert_eq!(err, RejectReason::HallucinatedLocation);
    }

    #[test]
    fn us_synonyms_verify_united_states() {
        let mut r = record(
            EventCategory::News,
            "REGULATORY",
            "ENFORCEMENT",
            "Exchange fined",
            60,
        );
        r.entities.locations = vec!["United States".to_string()];
        assert!(evaluate(
            &mut r,
            &text("the u.s. regulator fined a bitcoin exchange yesterday")
        )
        .is_ok());
    }

    #[test]
    fn roundtable_discussion_rejects_with_zero_impact() {
        let mut r = record(
            EventCategory::News,
            "REGULATORY",
            "HEARING",
            "SEC roundtable on crypto policy",
            55,
        );
        let err = evaluate(
            &mut r,
            &text("SEC holds roundtable discussion on crypto policy with bitcoin industry"),
        )
        .unwrap_err();
        assert_eq!(err, RejectReason::RegulatoryDiscussionNoAction);
        assert_eq!(r.context.impact, 0);
    }

    #[test]
    fn policy_without_the_word_policy_rejects() {
        let mut r = record(
            EventCategory::News,
            "REGULATORY",
            "POLICY",
            "New crypto policy framework",
            60,
        );
        let err = evaluate(&mut r, &text("lawmakers signed a bill about bitcoin mining")).unwrap_err();
        assert_eq!(err, RejectReason::PolicyHallucination);
    }

    #[test]
    fn policy_without_action_rejects() {
        let mut r = record(
            EventCategory::News,
            "REGULATORY",
            "POLICY",
            "Crypto policy shift",
            60,
        );
        let err = evaluate(
            &mut r,
            &text("a new bitcoin policy framework may be coming soon"),
        )
        .unwrap_err();
        assert_eq!(err, RejectReason::PolicyWithoutAction);
        assert_eq!(r.context.impact, 0);
    }

    #[test]
    fn policy_with_decision_language_passes() {
        let mut r = record(
            EventCategory::News,
            "REGULATORY",
            "POLICY",
            "Crypto policy enacted",
            60,
        );
        assert!(evaluate(
            &mut r,
            &text("lawmakers enacted a new bitcoin policy yesterday"),
        )
        .is_ok());
        assert_eq!(r.context.impact, 60);
    }

    #[test]
    fn white_house_headline_needs_raw_evidence() {
        let mut r = record(
            EventCategory::News,
            "REGULATORY",
            "APPROVAL",
            "WHITE HOUSE CONSIDERS BITCOIN RESERVE",
            80,
        );
        // Raw carries decision language, so the discussion rule passes and
        // the White House check is what fires.
        let err = evaluate(
            &mut r,
            &text("an executive order on the bitcoin reserve was signed today"),
        )
        .unwrap_err();
        assert_eq!(err, RejectReason::WhiteHouseHallucination);
    }

    #[test]
    fn treasury_content_is_capped() {
        let mut r = record(
            EventCategory::News,
            "REGULATORY",
            "ENFORCEMENT",
            "Treasury moves on mixer",
            90,
        );
        assert!(evaluate(
            &mut r,
            &text("the treasury sanctioned a bitcoin mixer and designated its operators"),
        )
        .is_ok());
        assert_eq!(r.context.impact, 60);
    }

    #[test]
    fn treasury_without_sanctions_language_caps_lower() {
        let mut r = record(
            EventCategory::News,
            "REGULATORY",
            "ENFORCEMENT",
            "Treasury fined a custodian",
            90,
        );
        // Capped to 40; survives rule 6 because a major asset is named.
        assert!(evaluate(
            &mut r,
            &text("the treasury fined a bitcoin custodian over reporting failures"),
        )
        .is_ok());
        assert_eq!(r.context.impact, 40);
    }

    #[test]
    fn low_impact_rejects() {
        let mut r = record(EventCategory::Market, "PRICE_MOVE", "PUMP", "small move", 30);
        let err = evaluate(&mut r, &text("a very small move in some minor market")).unwrap_err();
        assert_eq!(err, RejectReason::LowImpact);
    }

    #[test]
    fn accepted_records_clear_the_impact_floor() {
        let mut r = record(EventCategory::Market, "PRICE_MOVE", "PUMP", "big move", 31);
        assert!(evaluate(&mut r, &text("a decent move in the btc market today")).is_ok());
    }

    #[test]
    fn mid_impact_regulatory_without_major_asset_rejects() {
        let mut r = record(
            EventCategory::News,
            "REGULATORY",
            "ENFORCEMENT",
            "Regulator fined a small broker",
            40,
        );
        let err = evaluate(
            &mut r,
            &text("a regional regulator fined a small securities broker"),
        )
        .unwrap_err();
        assert_eq!(err, RejectReason::LowRelevanceRegulatory);
    }

    #[test]
    fn whale_move_scenario_is_accepted() {
        let raw = "BTC whale alert: $120 million transferred to Binance 🚨";
        let mut r = record(
            EventCategory::Data,
            "WHALE_MOVE",
            "TRANSFER",
            "BTC whale moves $120M to Binance",
            75,
        );
        r.tokens.primary.symbol = Some("BTC".to_string());
        r.action.kind = "TRANSFER".to_string();
        assert!(evaluate(&mut r, &text(raw)).is_ok());
        assert!(final_sweep(&mut r, &text(raw)).is_ok());
        assert!((70..=85).contains(&r.context.impact));
    }

    // --- final sweep ---

    #[test]
    fn sweep_strips_unevidenced_entities() {
        let raw = "binance saw heavy inflows from a btc whale this morning";
        let mut r = record(EventCategory::Data, "WHALE_MOVE", "TRANSFER", "whale inflow", 70);
        r.entities.projects = vec!["Binance".to_string(), "Coinbase".to_string()];
        r.entities.persons = vec!["CZ".to_string()];
        r.entities.locations = vec!["Malta".to_string()];
        assert!(final_sweep(&mut r, &text(raw)).is_ok());
        assert_eq!(r.entities.projects, vec!["Binance"]);
        assert!(r.entities.persons.is_empty());
        assert!(r.entities.locations.is_empty());
    }

    #[test]
    fn sweep_rejects_critical_headline_terms_without_evidence() {
        let raw = "regulators approved a new bitcoin framework this week";
        let mut r = record(
            EventCategory::News,
            "REGULATORY",
            "APPROVAL",
            "Strategic reserve announced",
            70,
        );
        let err = final_sweep(&mut r, &text(raw)).unwrap_err();
        assert_eq!(err, RejectReason::SevereHallucination);
    }

    #[test]
    fn sweep_keeps_corroborated_critical_terms() {
        let raw = "the white house announced an executive order on crypto custody";
        let mut r = record(
            EventCategory::News,
            "REGULATORY",
            "APPROVAL",
            "White House executive order on custody",
            70,
        );
        assert!(final_sweep(&mut r, &text(raw)).is_ok());
    }

    #[test]
    fn contains_word_respects_boundaries() {
        assert!(contains_word("btc pumps", "btc"));
        assert!(contains_word("buy $btc now", "btc"));
        assert!(!contains_word("webtc fork", "btc"));
        assert!(!contains_word("bonus round", "us"));
        assert!(contains_word("the us treasury", "us"));
    }

    #[test]
    fn rule_chain_order_is_stable() {
        let names: Vec<&str> = PIPELINE_RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "taxonomy_completeness",
                "symbol_hallucination",
                "impact_floors",
                "regulatory_suppression",
                "low_impact_floor",
                "regulatory_relevance_floor",
            ]
        );
    }

    #[test]
    fn repairs_survive_serialization_for_audit() {
        let mut r = record(EventCategory::Market, "PRICE_MOVE", "PUMP", "liq", 0);
        r.headline = "Liquidation cascade".to_string();
        r.event.subcategory = "LIQUIDATION".to_string();
        r.event.kind = "CASCADE".to_string();
        assert!(evaluate(&mut r, &text("liquidations across the market this morning")).is_ok());
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["repairs"], json!(["impact_floor_70"]));
    }
}
