//! Identity key lifecycle: generate, wrap at rest, load, clear.
//!
//! A failed load is indistinguishable from "no identity yet" on purpose:
//! the caller regenerates a fresh key pair and moves on. That silently
//! invalidates envelopes addressed to the old key — an accepted data-loss
//! tradeoff; the alternative is a hard stop on a corrupted vault.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use zeroize::Zeroize;

use wf_crypto::{aead, kdf, Algorithm, KeyPair, PublicKeyBytes};

use crate::error::StoreError;
use crate::keystore::{KeyStore, VaultRecord};

/// Vault over an injected [`KeyStore`] medium. Clone to share across tasks.
#[derive(Clone)]
pub struct KeyVault {
    store: Arc<dyn KeyStore>,
}

impl KeyVault {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self { store }
    }

    /// Fresh identity key pair for the given algorithm. Pure generation;
    /// call [`store`](Self::store) to persist it.
    pub fn generate_identity(&self, algorithm: Algorithm) -> Result<KeyPair, StoreError> {
        Ok(KeyPair::generate(algorithm)?)
    }

    /// Wrap the private half under the owner-derived key and persist.
    /// Replaces any prior record for this owner.
    pub async fn store(&self, owner_id: &str, keys: &KeyPair) -> Result<(), StoreError> {
        let wrapping = kdf::vault_wrapping_key(owner_id);
        let blob = aead::wrap(&wrapping.0, keys.private_bytes())?;

        self.store
            .put(VaultRecord {
                owner_id: owner_id.to_string(),
                algorithm: keys.algorithm(),
                public_key: keys.public_key().to_b64(),
                wrapped_private_key: STANDARD.encode(blob),
            })
            .await
    }

    /// Load and unwrap the identity for `owner_id`.
    ///
    /// Returns `Ok(None)` both when no record exists and when the stored
    /// record fails to decrypt (corruption, or a record wrapped for a
    /// different owner). Callers treat either case as "no identity yet".
    pub async fn load(&self, owner_id: &str) -> Result<Option<KeyPair>, StoreError> {
        let Some(record) = self.store.get(owner_id).await? else {
            return Ok(None);
        };
        match Self::unwrap_record(owner_id, &record) {
            Ok(keys) => Ok(Some(keys)),
            Err(e) => {
                tracing::warn!(
                    owner = %owner_id,
                    error = %e,
                    "vault record failed to decrypt, treating as absent"
                );
                Ok(None)
            }
        }
    }

    fn unwrap_record(owner_id: &str, record: &VaultRecord) -> Result<KeyPair, wf_crypto::CryptoError> {
        let wrapping = kdf::vault_wrapping_key(owner_id);
        let blob = STANDARD.decode(&record.wrapped_private_key)?;
        let mut private = aead::unwrap(&wrapping.0, &blob)?;
        let public = PublicKeyBytes::from_b64(&record.public_key)?;
        let keys = KeyPair::from_parts(record.algorithm, public.0, &private);
        private.zeroize();
        keys
    }

    /// Existence check without decrypting anything.
    pub async fn has_identity(&self, owner_id: &str) -> Result<bool, StoreError> {
        self.store.contains(owner_id).await
    }

    /// Erase all vault state (logout).
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.remove_all().await
    }

    /// Load the identity, or lazily create and persist one.
    ///
    /// Also the recovery path after a vault decrypt failure: `load`
    /// reported absent, so a new identity takes the old record's place.
    pub async fn identity_or_generate(
        &self,
        owner_id: &str,
        algorithm: Algorithm,
    ) -> Result<KeyPair, StoreError> {
        if let Some(keys) = self.load(owner_id).await? {
            if keys.algorithm() == algorithm {
                return Ok(keys);
            }
        }
        let keys = self.generate_identity(algorithm)?;
        self.store(owner_id, &keys).await?;
        Ok(keys)
    }
}
