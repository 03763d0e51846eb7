//! Audit pipeline built on a normalizer, a sink, and a dead-letter handler
//!
//! `AuditPipeline` is the consumer-side glue: every decoded message is
//! normalized once, the record goes to the sink, and messages that cannot be
//! normalized are parked in the dead-letter handler. Nothing is retried.

use crate::cluster::{ClusterResolver, ClusterTable};
use crate::config::AuditConfig;
use crate::dlq::{DeadLetterHandler, MemoryDeadLetterQueue, RejectedMessage};
use crate::error::Result;
use crate::normalizer::AuditEventNormalizer;
use crate::sink::AuditSink;
use std::sync::Arc;

/// What happened to one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Normalized and written to the sink
    Stored,
    /// Empty message, nothing to do
    Skipped,
    /// Rejected by the normalizer and handed to the dead-letter handler
    DeadLettered { reason: String },
}

/// Outcome counts for a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub stored: u64,
    pub skipped: u64,
    pub dead_lettered: u64,
}

impl PipelineStats {
    pub fn total(&self) -> u64 {
        self.stored + self.skipped + self.dead_lettered
    }

    fn record(&mut self, outcome: &ProcessOutcome) {
        match outcome {
            ProcessOutcome::Stored => self.stored += 1,
            ProcessOutcome::Skipped => self.skipped += 1,
            ProcessOutcome::DeadLettered { .. } => self.dead_lettered += 1,
        }
    }
}

/// Normalizes messages and routes the results
pub struct AuditPipeline<R = ClusterTable> {
    normalizer: Arc<AuditEventNormalizer<R>>,
    sink: Arc<dyn AuditSink>,
    dead_letters: Arc<dyn DeadLetterHandler>,
}

impl AuditPipeline<ClusterTable> {
    /// Build a pipeline from config, with an in-memory dead-letter queue
    pub fn from_config(config: &AuditConfig, sink: Arc<dyn AuditSink>) -> Self {
        Self::new(
            AuditEventNormalizer::new(config.cluster_table()),
            sink,
            Arc::new(MemoryDeadLetterQueue::new(config.dead_letter_capacity)),
        )
    }
}

impl<R: ClusterResolver> AuditPipeline<R> {
    pub fn new(
        normalizer: AuditEventNormalizer<R>,
        sink: Arc<dyn AuditSink>,
        dead_letters: Arc<dyn DeadLetterHandler>,
    ) -> Self {
        Self {
            normalizer: Arc::new(normalizer),
            sink,
            dead_letters,
        }
    }

    pub fn normalizer(&self) -> &AuditEventNormalizer<R> {
        &self.normalizer
    }

    pub fn dead_letters(&self) -> &dyn DeadLetterHandler {
        self.dead_letters.as_ref()
    }

    /// Process one decoded message.
    ///
    /// Normalization failures are dead-lettered and reported as an outcome;
    /// sink and dead-letter failures are returned as errors.
    pub async fn process(
        &self,
        topic: &str,
        message: Option<serde_json::Value>,
    ) -> Result<ProcessOutcome> {
        let err = match self.normalizer.normalize(message.as_ref(), topic) {
            Ok(Some(record)) => {
                self.sink.write(record).await?;
                return Ok(ProcessOutcome::Stored);
            }
            Ok(None) => return Ok(ProcessOutcome::Skipped),
            Err(e) if e.is_message_fault() => e,
            Err(e) => return Err(e),
        };

        let reason = err.to_string();
        let message = message.unwrap_or(serde_json::Value::Null);
        self.dead_letters
            .handle(RejectedMessage::new(topic, message, reason.clone()))
            .await?;

        Ok(ProcessOutcome::DeadLettered { reason })
    }

    /// Process messages in order, stopping at the first sink failure
    pub async fn process_batch<I>(&self, topic: &str, messages: I) -> Result<PipelineStats>
    where
        I: IntoIterator<Item = Option<serde_json::Value>>,
    {
        let mut stats = PipelineStats::default();
        for message in messages {
            let outcome = self.process(topic, message).await?;
            stats.record(&outcome);
        }

        tracing::info!(
            topic = %topic,
            stored = stats.stored,
            skipped = stats.skipped,
            dead_lettered = stats.dead_lettered,
            "Audit batch processed"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_record() {
        let mut stats = PipelineStats::default();
        stats.record(&ProcessOutcome::Stored);
        stats.record(&ProcessOutcome::Stored);
        stats.record(&ProcessOutcome::Skipped);
        stats.record(&ProcessOutcome::DeadLettered {
            reason: "bad".to_string(),
        });

        assert_eq!(stats.stored, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.dead_lettered, 1);
        assert_eq!(stats.total(), 4);
    }
}
