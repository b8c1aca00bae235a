use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::{Claude, OpenAi};
use tickerwire_common::{ChannelMapping, Config, InboundMessage};
use tickerwire_pipeline::{Ingestor, Outcome, Pipeline, PgStore};

const VOYAGE_API_URL: &str = "https://api.voyageai.com/v1";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tickerwire=info".parse()?))
        .init();

    info!("Tickerwire ingestion starting...");

    // Load config
    let config = Config::from_env();

    // Connect to Postgres and run migrations
    let pool = sqlx::postgres::PgPool::connect(&config.database_url).await?;
    let store = PgStore::new(pool);
    store.migrate().await?;

    let generate = Claude::new(&config.anthropic_api_key, &config.generation_model);
    let embed =
        OpenAi::new(&config.voyage_api_key, &config.embedding_model).with_base_url(VOYAGE_API_URL);

    let pipeline = Pipeline::new(generate, embed, Arc::new(store), config.dedup_window_hours);
    let ingestor = Ingestor::spawn(pipeline);

    let mapping = ChannelMapping {
        agent_id: config.agent_id.clone(),
        label: config.channel_label.clone(),
    };

    // Feed adapter: newline-delimited InboundMessage JSON on stdin.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut saved = 0u64;
    let mut skipped = 0u64;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let message: InboundMessage = match serde_json::from_str(&line) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "unparseable input line, skipping");
                continue;
            }
        };
        match ingestor.submit(message, mapping.clone()).await {
            Outcome::Saved { id } => {
                saved += 1;
                info!(record_id = %id, "saved");
            }
            Outcome::Skipped { reason } => {
                skipped += 1;
                info!(reason = %reason, "skipped");
            }
        }
    }

    info!(saved, skipped, "Ingestion run complete");
    Ok(())
}
