//! Dead Letter Queue — keep messages that can never normalize
//!
//! Normalization failures are properties of the message, so redelivery
//! would fail the same way. The pipeline parks such messages here together
//! with the reason they were rejected.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A rejected message with context about why it was rejected
#[derive(Debug, Clone)]
pub struct RejectedMessage {
    /// Unique identifier (dlq-<uuid>)
    pub id: String,

    /// Topic the message was consumed from
    pub topic: String,

    /// The original decoded message
    pub message: serde_json::Value,

    /// Rendered normalization error
    pub reason: String,

    /// Unix timestamp in milliseconds when the message was rejected
    pub rejected_at: i64,
}

impl RejectedMessage {
    pub fn new(
        topic: impl Into<String>,
        message: serde_json::Value,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("dlq-{}", uuid::Uuid::new_v4()),
            topic: topic.into(),
            message,
            reason: reason.into(),
            rejected_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Trait for dead letter handlers
///
/// Implementations decide what to do with rejected messages: store them,
/// forward them to a dead-letter topic, or alert on them.
#[async_trait]
pub trait DeadLetterHandler: Send + Sync {
    /// Handle a rejected message
    async fn handle(&self, rejected: RejectedMessage) -> Result<()>;

    /// Number of messages currently held
    async fn count(&self) -> Result<usize>;

    /// Most recently rejected messages first
    async fn list(&self, limit: usize) -> Result<Vec<RejectedMessage>>;
}

/// In-memory dead letter queue for development and testing
///
/// Holds at most `max_messages` entries, dropping the oldest first.
/// A capacity of 0 means unbounded.
pub struct MemoryDeadLetterQueue {
    messages: Arc<RwLock<Vec<RejectedMessage>>>,
    max_messages: usize,
}

impl MemoryDeadLetterQueue {
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
            max_messages,
        }
    }
}

impl Default for MemoryDeadLetterQueue {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl DeadLetterHandler for MemoryDeadLetterQueue {
    async fn handle(&self, rejected: RejectedMessage) -> Result<()> {
        tracing::warn!(
            id = %rejected.id,
            topic = %rejected.topic,
            reason = %rejected.reason,
            "Audit message dead-lettered"
        );

        let mut messages = self.messages.write().await;
        messages.push(rejected);

        if self.max_messages > 0 && messages.len() > self.max_messages {
            let drain_count = messages.len() - self.max_messages;
            messages.drain(..drain_count);
        }

        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.messages.read().await.len())
    }

    async fn list(&self, limit: usize) -> Result<Vec<RejectedMessage>> {
        let messages = self.messages.read().await;
        Ok(messages.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(reason: impl Into<String>) -> RejectedMessage {
        RejectedMessage::new("audit-topic", serde_json::json!({"bogus": true}), reason)
    }

    #[test]
    fn test_rejected_message_creation() {
        let msg = rejected("Unrecognized metastore audit event");
        assert!(msg.id.starts_with("dlq-"));
        assert_eq!(msg.topic, "audit-topic");
        assert_eq!(msg.message["bogus"], true);
        assert!(msg.rejected_at > 0);
    }

    #[test]
    fn test_handle_blocking() {
        let dlq = MemoryDeadLetterQueue::default();
        tokio_test::block_on(async {
            dlq.handle(rejected("failed")).await.unwrap();
            assert_eq!(dlq.count().await.unwrap(), 1);
        });
    }

    #[tokio::test]
    async fn test_list_most_recent_first() {
        let dlq = MemoryDeadLetterQueue::default();
        for i in 0..5 {
            dlq.handle(rejected(format!("reason {}", i))).await.unwrap();
        }

        let list = dlq.list(3).await.unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].reason, "reason 4");
        assert_eq!(list[2].reason, "reason 2");
    }

    #[tokio::test]
    async fn test_max_capacity() {
        let dlq = MemoryDeadLetterQueue::new(3);
        for i in 0..5 {
            dlq.handle(rejected(format!("reason {}", i))).await.unwrap();
        }

        assert_eq!(dlq.count().await.unwrap(), 3);
        let list = dlq.list(10).await.unwrap();
        assert_eq!(list[0].reason, "reason 4");
        assert_eq!(list[2].reason, "reason 2");
    }

    #[tokio::test]
    async fn test_zero_capacity_is_unbounded() {
        let dlq = MemoryDeadLetterQueue::new(0);
        for i in 0..20 {
            dlq.handle(rejected(format!("reason {}", i))).await.unwrap();
        }
        assert_eq!(dlq.count().await.unwrap(), 20);
    }
}
