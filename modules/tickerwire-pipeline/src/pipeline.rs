//! The end-to-end per-message pipeline. Every failure kind is caught here
//! and converted to a skip outcome; nothing escapes to the queue.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use ai_client::{with_retries, EmbedAgent, GenerateAgent};
use tickerwire_common::{
    ChannelMapping, EventCategory, InboundMessage, PipelineError, RejectReason,
};

use crate::extract::EntityExtractor;
use crate::gate::{self, SimilarityGate};
use crate::normalize;
use crate::persist::PersistenceGateway;
use crate::rules;
use crate::store::SimilarityStore;
use crate::text;

/// Terminal result for one submitted message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Saved { id: Uuid },
    Skipped { reason: RejectReason },
}

pub struct Pipeline<G, E, S> {
    extractor: EntityExtractor<G>,
    embedder: E,
    gate: SimilarityGate<S>,
    gateway: PersistenceGateway<S>,
}

impl<G, E, S> Pipeline<G, E, S>
where
    G: GenerateAgent,
    E: EmbedAgent,
    S: SimilarityStore,
{
    pub fn new(generate_agent: G, embedder: E, store: Arc<S>, dedup_window_hours: i64) -> Self {
        Self {
            extractor: EntityExtractor::new(generate_agent),
            embedder,
            gate: SimilarityGate::new(store.clone(), dedup_window_hours),
            gateway: PersistenceGateway::new(store),
        }
    }

    /// Process one message to a terminal outcome. Never panics, never
    /// returns an error; any internal failure becomes a skip.
    pub async fn process(&self, message: &InboundMessage, mapping: &ChannelMapping) -> Outcome {
        match self.run(message, mapping).await {
            Ok(id) => {
                info!(message_id = message.id.as_str(), record_id = %id, "message accepted");
                Outcome::Saved { id }
            }
            Err(err) => {
                let reason = err.reject_reason();
                match &err {
                    PipelineError::Rejected(_) => {
                        debug!(message_id = message.id.as_str(), reason = %reason, "message skipped")
                    }
                    _ => {
                        warn!(message_id = message.id.as_str(), reason = %reason, error = %err, "pipeline failure")
                    }
                }
                Outcome::Skipped { reason }
            }
        }
    }

    async fn run(
        &self,
        message: &InboundMessage,
        mapping: &ChannelMapping,
    ) -> Result<Uuid, PipelineError> {
        let text = text::extract_text(message).map_err(PipelineError::Rejected)?;

        // One embedding per message, reused for both gate checks and the
        // persisted row.
        let embedding = with_retries("embed", || self.embedder.embed(&text.raw)).await?;

        // Pre-extraction check with a heuristic category guess. Very large
        // transfers always get through regardless of apparent similarity.
        if gate::has_whale_amount(&text.raw) {
            info!(message_id = message.id.as_str(), "whale amount detected, bypassing pre-check");
        } else {
            let guess = gate::guess_category(&text.raw);
            let verdict = self.gate.check(&embedding, guess).await?;
            if verdict.is_duplicate {
                return Err(PipelineError::Rejected(RejectReason::DuplicateContent));
            }
        }

        let value = self.extractor.extract(&text).await?;
        let mut record = normalize::normalize(Some(value))
            .ok_or_else(|| PipelineError::Extraction("empty extraction".to_string()))?;

        rules::evaluate(&mut record, &text).map_err(PipelineError::Rejected)?;

        // Re-check with the confirmed category: DATA content gets the
        // stricter threshold now that the category is certain.
        if record.event.category == EventCategory::Data {
            let verdict = self
                .gate
                .check(&embedding, Some(EventCategory::Data))
                .await?;
            if verdict.is_duplicate {
                return Err(PipelineError::Rejected(RejectReason::DuplicateDataContent));
            }
        }

        rules::final_sweep(&mut record, &text).map_err(PipelineError::Rejected)?;

        self.gateway.save(mapping, &embedding, &record, &text).await
    }
}
