//! The `KeyStore` port: the opaque persistent medium behind the vault.
//!
//! One record per owner, scoped to the current device/session. `put` is an
//! atomic replace (never a merge): a reader racing a writer sees the old
//! record or the new one, never a torn mix. `remove_all` backs logout.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use wf_crypto::Algorithm;

use crate::error::StoreError;

/// What actually sits at rest: public half in the clear, private half as
/// an AEAD blob only the vault's derived wrapping key can open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultRecord {
    pub owner_id: String,
    pub algorithm: Algorithm,
    /// Base64 public key bytes.
    pub public_key: String,
    /// Base64 of the iv-prefixed AES-GCM blob around the private half.
    pub wrapped_private_key: String,
}

#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn get(&self, owner_id: &str) -> Result<Option<VaultRecord>, StoreError>;
    /// Atomic replace of any prior record for the same owner.
    async fn put(&self, record: VaultRecord) -> Result<(), StoreError>;
    async fn contains(&self, owner_id: &str) -> Result<bool, StoreError>;
    /// Erase every record (logout).
    async fn remove_all(&self) -> Result<(), StoreError>;
}

// ── In-memory adapter ────────────────────────────────────────────────────────

/// Test/ephemeral adapter; nothing survives the process.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    records: Arc<RwLock<HashMap<String, VaultRecord>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get(&self, owner_id: &str) -> Result<Option<VaultRecord>, StoreError> {
        Ok(self.records.read().await.get(owner_id).cloned())
    }

    async fn put(&self, record: VaultRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.owner_id.clone(), record);
        Ok(())
    }

    async fn contains(&self, owner_id: &str) -> Result<bool, StoreError> {
        Ok(self.records.read().await.contains_key(owner_id))
    }

    async fn remove_all(&self) -> Result<(), StoreError> {
        self.records.write().await.clear();
        Ok(())
    }
}

// ── File adapter ─────────────────────────────────────────────────────────────

/// Desktop adapter: all records in one JSON file. Writes land in a
/// temporary sibling first and are renamed into place, so a concurrent
/// reader observes either the previous file or the complete new one.
#[derive(Clone)]
pub struct FileKeyStore {
    path: PathBuf,
    // Serialises read-modify-write cycles between tasks in this process.
    lock: Arc<RwLock<()>>,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(RwLock::new(())),
        }
    }

    async fn read_all(&self) -> Result<HashMap<String, VaultRecord>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, records: &HashMap<String, VaultRecord>) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(records)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn get(&self, owner_id: &str) -> Result<Option<VaultRecord>, StoreError> {
        let _guard = self.lock.read().await;
        Ok(self.read_all().await?.remove(owner_id))
    }

    async fn put(&self, record: VaultRecord) -> Result<(), StoreError> {
        let _guard = self.lock.write().await;
        let mut records = self.read_all().await?;
        records.insert(record.owner_id.clone(), record);
        self.write_all(&records).await
    }

    async fn contains(&self, owner_id: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.read().await;
        Ok(self.read_all().await?.contains_key(owner_id))
    }

    async fn remove_all(&self) -> Result<(), StoreError> {
        let _guard = self.lock.write().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
