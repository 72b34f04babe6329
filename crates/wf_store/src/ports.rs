//! Collaborator ports: the key directory and the message transport.
//!
//! Both are external systems from the core's point of view. The core only
//! reads a recipient's published key before selecting a scheme, writes its
//! own key once after generating an identity, and produces/consumes
//! transport records. Delivery, ordering and retries belong to the
//! transport's owner.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use wf_proto::{PublishedKey, TransportRecord};

use crate::error::StoreError;

#[async_trait]
pub trait Directory: Send + Sync {
    async fn published_key(&self, user_id: &str) -> Result<Option<PublishedKey>, StoreError>;
    async fn publish(&self, key: PublishedKey) -> Result<(), StoreError>;
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn push(&self, record: TransportRecord) -> Result<(), StoreError>;
    async fn conversation(
        &self,
        sender_id: &str,
        recipient_id: &str,
    ) -> Result<Vec<TransportRecord>, StoreError>;
}

// ── In-memory adapters ───────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemoryDirectory {
    keys: Arc<RwLock<HashMap<String, PublishedKey>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn published_key(&self, user_id: &str) -> Result<Option<PublishedKey>, StoreError> {
        Ok(self.keys.read().await.get(user_id).cloned())
    }

    async fn publish(&self, key: PublishedKey) -> Result<(), StoreError> {
        self.keys.write().await.insert(key.user_id.clone(), key);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryTransport {
    records: Arc<RwLock<Vec<TransportRecord>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn push(&self, record: TransportRecord) -> Result<(), StoreError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn conversation(
        &self,
        sender_id: &str,
        recipient_id: &str,
    ) -> Result<Vec<TransportRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| {
                (r.sender_id == sender_id && r.recipient_id == recipient_id)
                    || (r.sender_id == recipient_id && r.recipient_id == sender_id)
            })
            .cloned()
            .collect())
    }
}
