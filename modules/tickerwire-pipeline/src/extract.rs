//! EntityExtractor: sends normalized message text to the generation service
//! under a fixed schema contract and recovers a JSON value from whatever
//! comes back. Service failures follow the shared retry policy; parse
//! failures surface as extraction errors.

use ai_client::util::truncate_to_char_boundary;
use ai_client::{with_retries, GenerateAgent};
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use tickerwire_common::{
    Direction, EventCategory, ExtractedText, Magnitude, PipelineError, TrendDirection,
};

use crate::recovery;

/// Keep prompts bounded; feed messages are short, embeds occasionally not.
const MAX_MESSAGE_BYTES: usize = 8_000;

const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a crypto market event extractor for a live news feed.

Your job: read one short message and emit exactly one JSON object describing the market event it reports, or an IGNORED classification when it reports none.

## Categories
- **MARKET**: price action, liquidations, exchange listings, volume anomalies.
- **DATA**: on-chain facts — whale transfers, deposits/withdrawals, mints/burns, funding rates.
- **NEWS**: regulatory, technical, business, or macro developments.
- **IGNORED**: chatter, memes, giveaways, anything without market content.

## Rules
- Only name a token symbol that appears literally in the message.
- Only name entities (projects, persons, locations) the message itself mentions.
- `context.impact` is 0-100: 0-30 noise, 31-60 notable, 61-85 significant, 86-100 market-moving.
- Use UPPERCASE for every enum-like field.
- Respond with the JSON object only — no commentary, no code fences."#;

/// The shape the generation service is asked to produce. Loose on purpose:
/// every field optional so a partial response still parses downstream.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractionShape {
    pub headline: String,
    pub tokens: ShapeTokens,
    pub event: ShapeEvent,
    pub action: ShapeAction,
    pub entities: ShapeEntities,
    pub metrics: ShapeMetrics,
    pub context: ShapeContext,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShapeTokens {
    pub primary: ShapeTokenRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShapeTokenRef {
    /// Ticker symbol literally present in the message, or null.
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShapeEvent {
    pub category: EventCategory,
    /// Subcategory from the taxonomy, e.g. WHALE_MOVE, REGULATORY, PRICE_MOVE.
    pub subcategory: String,
    /// Event type within the subcategory, e.g. TRANSFER, POLICY, PUMP.
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShapeAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub direction: Direction,
    pub magnitude: Magnitude,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShapeEntities {
    pub projects: Vec<String>,
    pub persons: Vec<String>,
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShapeMetrics {
    pub market: Value,
    pub onchain: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShapeContext {
    /// 0-100 market significance estimate.
    pub impact: u8,
    pub risk: ShapeRisk,
    pub sentiment: ShapeSentiment,
    pub trend: ShapeTrend,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShapeRisk {
    pub market: u8,
    pub tech: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShapeSentiment {
    pub market: i8,
    pub social: i8,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShapeTrend {
    pub short: TrendDirection,
    pub medium: TrendDirection,
    pub strength: u8,
}

pub struct EntityExtractor<G> {
    agent: G,
    system_prompt: String,
}

impl<G: GenerateAgent> EntityExtractor<G> {
    pub fn new(agent: G) -> Self {
        let schema = serde_json::to_string_pretty(&schema_for!(ExtractionShape))
            .unwrap_or_else(|_| "{}".to_string());
        let system_prompt =
            format!("{EXTRACTION_SYSTEM_PROMPT}\n\nThe object must match this JSON Schema:\n{schema}");
        Self {
            agent,
            system_prompt,
        }
    }

    /// Extract a structured event from normalized text. Returns the recovered
    /// JSON value; StructureNormalizer owns typing it.
    pub async fn extract(&self, text: &ExtractedText) -> Result<Value, PipelineError> {
        let message = truncate_to_char_boundary(&text.clean, MAX_MESSAGE_BYTES);
        let user = format!(
            "Message:\n{message}\n\nAuthor: {}\nRetransmitted from: {}",
            text.author,
            text.retransmit_author.as_deref().unwrap_or("none"),
        );

        let response =
            with_retries("extraction", || self.agent.generate(&self.system_prompt, &user)).await?;

        let value = recovery::recover(&response)
            .map_err(|e| PipelineError::Extraction(e.to_string()))?;

        debug!(
            keys = value.as_object().map(|o| o.len()).unwrap_or(0),
            "extraction recovered"
        );
        Ok(value)
    }
}
