//! PersistenceGateway: serializes an accepted record with its provenance,
//! verifies the serialization round-trips, and appends it to the durable
//! store. Failures here are never fatal; they surface as `save_error`.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use tickerwire_common::{CandidateRecord, ChannelMapping, ExtractedText, PipelineError};

use crate::store::{NewRecord, SimilarityStore};

pub struct PersistenceGateway<S> {
    store: Arc<S>,
}

impl<S: SimilarityStore> PersistenceGateway<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Persist one accepted record. The payload is the serialized record
    /// plus provenance; both must round-trip before anything is written.
    pub async fn save(
        &self,
        mapping: &ChannelMapping,
        embedding: &[f32],
        record: &CandidateRecord,
        text: &ExtractedText,
    ) -> Result<Uuid, PipelineError> {
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::Persistence(
                "embedding contains non-finite components".to_string(),
            ));
        }

        let payload = json!({
            "record": record,
            "provenance": {
                "raw": text.raw,
                "author": text.author,
                "retransmit_author": text.retransmit_author,
            },
        });

        let encoded = serde_json::to_string(&payload)
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;
        let reparsed: Value = serde_json::from_str(&encoded)
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;
        if reparsed != payload {
            return Err(PipelineError::Persistence(
                "payload does not round-trip".to_string(),
            ));
        }
        let round: CandidateRecord = serde_json::from_value(reparsed["record"].clone())
            .map_err(|e| PipelineError::Persistence(format!("record does not round-trip: {e}")))?;
        if &round != record {
            return Err(PipelineError::Persistence(
                "record changed across serialization".to_string(),
            ));
        }

        let id = self
            .store
            .insert(NewRecord {
                category: mapping.label.clone(),
                agent_id: mapping.agent_id.clone(),
                content: text.raw.clone(),
                payload,
                embedding: embedding.to_vec(),
            })
            .await?;

        info!(
            record_id = %id,
            category = mapping.label.as_str(),
            headline = record.headline.as_str(),
            "record persisted"
        );
        Ok(id)
    }
}
