//! The similarity/history store: accepted records with their embeddings.
//!
//! The trait is the seam the gate and the persistence gateway share.
//! `PgStore` is the production implementation (Postgres via sqlx, embedding
//! kept as a JSON float array, cosine computed in-process over the bounded
//! recent window). `MemoryStore` backs tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use tickerwire_common::{PipelineError, SimilarityMatch};

/// A row to append: category label, ingesting agent, the serialized record
/// plus provenance, the raw text (used as match content), and the embedding.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub category: String,
    pub agent_id: String,
    pub content: String,
    pub payload: Value,
    pub embedding: Vec<f32>,
}

#[async_trait]
pub trait SimilarityStore: Send + Sync {
    /// Top `limit` neighbors of `embedding` within the last `window_hours`,
    /// restricted to similarity above `floor`, ordered best-first.
    async fn query_nearest(
        &self,
        embedding: &[f32],
        window_hours: i64,
        floor: f64,
        limit: usize,
    ) -> Result<Vec<SimilarityMatch>, PipelineError>;

    /// Append one accepted record. Returns the freshly generated id.
    async fn insert(&self, record: NewRecord) -> Result<Uuid, PipelineError>;
}

/// Cosine similarity for f32 embedding vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

/// Rank `rows` (content, category, embedding) against a probe vector and
/// keep the top matches above the floor. Shared by both store impls.
fn rank_matches(
    rows: impl Iterator<Item = (String, String, Vec<f32>)>,
    embedding: &[f32],
    floor: f64,
    limit: usize,
) -> Vec<SimilarityMatch> {
    let mut matches: Vec<SimilarityMatch> = rows
        .filter_map(|(content, category, candidate)| {
            let score = cosine_similarity(embedding, &candidate);
            (score > floor).then_some(SimilarityMatch {
                content,
                category,
                score,
            })
        })
        .collect();
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(limit);
    matches
}

// --- Postgres ---

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent schema migration.
    pub async fn migrate(&self) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                id UUID PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                category TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                content TEXT NOT NULL,
                payload JSONB NOT NULL,
                embedding JSONB NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::Persistence(e.to_string()))?;
        sqlx::query("CREATE INDEX IF NOT EXISTS records_created_at_idx ON records (created_at)")
            .execute(&self.pool)
            .await
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SimilarityStore for PgStore {
    async fn query_nearest(
        &self,
        embedding: &[f32],
        window_hours: i64,
        floor: f64,
        limit: usize,
    ) -> Result<Vec<SimilarityMatch>, PipelineError> {
        let cutoff: DateTime<Utc> = Utc::now() - Duration::hours(window_hours);
        let rows = sqlx::query(
            "SELECT content, category, embedding FROM records WHERE created_at > $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        let parsed = rows.into_iter().filter_map(|row| {
            let content: String = row.try_get("content").ok()?;
            let category: String = row.try_get("category").ok()?;
            let raw: Value = row.try_get("embedding").ok()?;
            let vector: Vec<f32> = serde_json::from_value(raw).ok()?;
            Some((content, category, vector))
        });

        Ok(rank_matches(parsed, embedding, floor, limit))
    }

    async fn insert(&self, record: NewRecord) -> Result<Uuid, PipelineError> {
        let id = Uuid::new_v4();
        let embedding = serde_json::to_value(&record.embedding)
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;
        sqlx::query(
            "INSERT INTO records (id, created_at, category, agent_id, content, payload, embedding) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(Utc::now())
        .bind(&record.category)
        .bind(&record.agent_id)
        .bind(&record.content)
        .bind(&record.payload)
        .bind(&embedding)
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::Persistence(e.to_string()))?;
        Ok(id)
    }
}

// --- In-memory (tests and local runs) ---

struct MemoryRow {
    created_at: DateTime<Utc>,
    category: String,
    content: String,
    embedding: Vec<f32>,
}

#[derive(Default)]
pub struct MemoryStore {
    rows: std::sync::RwLock<Vec<MemoryRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row directly (test helper).
    pub fn push(&self, content: &str, category: &str, embedding: Vec<f32>) {
        self.rows.write().expect("store lock poisoned").push(MemoryRow {
            created_at: Utc::now(),
            category: category.to_string(),
            content: content.to_string(),
            embedding,
        });
    }

    pub fn len(&self) -> usize {
        self.rows.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SimilarityStore for MemoryStore {
    async fn query_nearest(
        &self,
        embedding: &[f32],
        window_hours: i64,
        floor: f64,
        limit: usize,
    ) -> Result<Vec<SimilarityMatch>, PipelineError> {
        let cutoff = Utc::now() - Duration::hours(window_hours);
        let rows = self.rows.read().expect("store lock poisoned");
        let recent = rows
            .iter()
            .filter(|r| r.created_at > cutoff)
            .map(|r| (r.content.clone(), r.category.clone(), r.embedding.clone()))
            .collect::<Vec<_>>();
        Ok(rank_matches(recent.into_iter(), embedding, floor, limit))
    }

    async fn insert(&self, record: NewRecord) -> Result<Uuid, PipelineError> {
        let id = Uuid::new_v4();
        self.rows.write().expect("store lock poisoned").push(MemoryRow {
            created_at: Utc::now(),
            category: record.category,
            content: record.content,
            embedding: record.embedding,
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_handles_zero_and_mismatched_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[tokio::test]
    async fn memory_store_ranks_and_truncates() {
        let store = MemoryStore::new();
        store.push("far", "a", vec![0.0, 1.0]);
        store.push("close", "b", vec![1.0, 0.1]);
        store.push("exact", "c", vec![1.0, 0.0]);

        let matches = store
            .query_nearest(&[1.0, 0.0], 24, 0.65, 2)
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].content, "exact");
        assert_eq!(matches[1].content, "close");
    }

    #[tokio::test]
    async fn insert_is_visible_to_next_query() {
        let store = MemoryStore::new();
        store
            .insert(NewRecord {
                category: "feed".into(),
                agent_id: "agent".into(),
                content: "BTC whale alert".into(),
                payload: serde_json::json!({}),
                embedding: vec![1.0, 0.0],
            })
            .await
            .unwrap();

        let matches = store
            .query_nearest(&[1.0, 0.0], 24, 0.65, 5)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].category, "feed");
    }
}
