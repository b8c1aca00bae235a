use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- Inbound feed shapes ---

/// One message as delivered by the feed adapter. Opaque to the pipeline
/// beyond the fields named here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub author_name: Option<String>,
}

/// Embedded fragment carried alongside the primary text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Channel configuration the feed adapter passes along with each message:
/// which agent is ingesting and which category label the channel maps to.
#[derive(Debug, Clone)]
pub struct ChannelMapping {
    pub agent_id: String,
    pub label: String,
}

/// The two text views derived from an inbound message, plus attribution.
/// `raw` keeps links for provenance matching; `clean` is what the LLM sees.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub raw: String,
    pub clean: String,
    pub author: String,
    pub retransmit_author: Option<String>,
}

// --- Enum fields ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventCategory {
    Market,
    Data,
    News,
    Ignored,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Market => "MARKET",
            EventCategory::Data => "DATA",
            EventCategory::News => "NEWS",
            EventCategory::Ignored => "IGNORED",
        }
    }

    /// Case-insensitive parse; anything unrecognized is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "MARKET" => Some(EventCategory::Market),
            "DATA" => Some(EventCategory::Data),
            "NEWS" => Some(EventCategory::News),
            "IGNORED" => Some(EventCategory::Ignored),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Neutral,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "UP" => Some(Direction::Up),
            "DOWN" => Some(Direction::Down),
            "NEUTRAL" => Some(Direction::Neutral),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Magnitude {
    Small,
    Medium,
    Large,
}

impl Magnitude {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SMALL" => Some(Magnitude::Small),
            "MEDIUM" => Some(Magnitude::Medium),
            "LARGE" => Some(Magnitude::Large),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendDirection {
    Up,
    Down,
    Sideways,
}

impl TrendDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "UP" => Some(TrendDirection::Up),
            "DOWN" => Some(TrendDirection::Down),
            "SIDEWAYS" => Some(TrendDirection::Sideways),
            _ => None,
        }
    }
}

// --- Candidate record ---

/// The structured event record after normalization. Every field has a
/// well-defined default so a partially extracted record still normalizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub headline: String,
    pub tokens: Tokens,
    pub event: Event,
    pub action: Action,
    pub entities: Entities,
    pub metrics: Metrics,
    pub context: Context,
    /// Which normalization repairs fired on this record. Kept for audit,
    /// not semantic content.
    #[serde(default)]
    pub repairs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tokens {
    pub primary: TokenRef,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenRef {
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub category: EventCategory,
    pub subcategory: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    pub direction: Direction,
    pub magnitude: Magnitude,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub persons: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
}

/// Market and on-chain metrics are passed through untouched; no rule reads
/// them, so no schema is imposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default = "empty_object")]
    pub market: Value,
    #[serde(default = "empty_object")]
    pub onchain: Value,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            market: empty_object(),
            onchain: empty_object(),
        }
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub impact: u8,
    pub risk: Risk,
    pub sentiment: Sentiment,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Risk {
    pub market: u8,
    pub tech: u8,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sentiment {
    pub market: i8,
    pub social: i8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub short: TrendDirection,
    pub medium: TrendDirection,
    pub strength: u8,
}

// --- Similarity ---

/// One near-neighbor from the similarity store. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatch {
    pub content: String,
    pub category: String,
    pub score: f64,
}
