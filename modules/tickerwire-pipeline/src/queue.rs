//! Serialized ingestion front door. All submissions funnel through one
//! unbounded channel into a single worker task, so messages are processed
//! strictly in arrival order and the history store never sees concurrent
//! read-modify-write cycles.

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use ai_client::{EmbedAgent, GenerateAgent};
use tickerwire_common::{ChannelMapping, InboundMessage, RejectReason};

use crate::pipeline::{Outcome, Pipeline};
use crate::store::SimilarityStore;

struct Job {
    message: InboundMessage,
    mapping: ChannelMapping,
    reply: oneshot::Sender<Outcome>,
}

/// Handle for submitting messages. Cheap to clone; all clones feed the same
/// worker. Dropping every clone shuts the worker down.
#[derive(Clone)]
pub struct Ingestor {
    tx: mpsc::UnboundedSender<Job>,
}

impl Ingestor {
    /// Spawn the worker task around a pipeline and return the handle.
    pub fn spawn<G, E, S>(pipeline: Pipeline<G, E, S>) -> Self
    where
        G: GenerateAgent + Send + Sync + 'static,
        E: EmbedAgent + Send + Sync + 'static,
        S: SimilarityStore + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let outcome = pipeline.process(&job.message, &job.mapping).await;
                // A dropped receiver means the submitter gave up waiting;
                // the outcome is already logged by the pipeline.
                let _ = job.reply.send(outcome);
            }
            info!("ingestion worker stopped");
        });
        Self { tx }
    }

    /// Submit one message and wait for its terminal outcome. Queue failures
    /// (worker gone) surface as a service-error skip, never a panic.
    pub async fn submit(&self, message: InboundMessage, mapping: ChannelMapping) -> Outcome {
        let (reply, wait) = oneshot::channel();
        let job = Job {
            message,
            mapping,
            reply,
        };
        if self.tx.send(job).is_err() {
            error!("ingestion worker is gone, dropping message");
            return Outcome::Skipped {
                reason: RejectReason::ServiceError,
            };
        }
        match wait.await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("ingestion worker dropped a job without replying");
                Outcome::Skipped {
                    reason: RejectReason::ServiceError,
                }
            }
        }
    }
}
