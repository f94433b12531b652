//! Outbound notification adapters.

use std::sync::Arc;

use async_trait::async_trait;
use common::Sku;
use domain::OutOfStockData;
use tokio::sync::Mutex;

use crate::error::Result;

/// Delivers out-of-stock notifications to whoever needs to restock.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, event: &OutOfStockData) -> Result<()>;
}

/// Notification sender that only writes a structured log line.
///
/// The default in deployments without a real notification channel.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotificationSender;

impl LoggingNotificationSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSender for LoggingNotificationSender {
    async fn send(&self, event: &OutOfStockData) -> Result<()> {
        tracing::warn!(sku = %event.sku, "out of stock");
        Ok(())
    }
}

/// Notification sender that records every sku it was asked about.
#[derive(Clone, Default)]
pub struct InMemoryNotificationSender {
    sent: Arc<Mutex<Vec<Sku>>>,
}

impl InMemoryNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the skus notified so far, in order.
    pub async fn sent(&self) -> Vec<Sku> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSender for InMemoryNotificationSender {
    async fn send(&self, event: &OutOfStockData) -> Result<()> {
        self.sent.lock().await.push(event.sku.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_sender_records_skus_in_order() {
        let sender = InMemoryNotificationSender::new();
        sender
            .send(&OutOfStockData { sku: "LAMP".into() })
            .await
            .unwrap();
        sender
            .send(&OutOfStockData {
                sku: "CHAIR".into(),
            })
            .await
            .unwrap();

        assert_eq!(sender.sent().await, vec!["LAMP".into(), "CHAIR".into()]);
    }
}
