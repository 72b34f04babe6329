//! The send/receive pipeline over the vault and collaborator ports.
//!
//! Failure policy (the whole point of this module): cryptographic failures
//! stop here. An encrypt failure degrades to a plaintext send with a
//! warning; an undecryptable incoming record renders a placeholder. The
//! caller never sees an error it would have to turn into UI state itself.

use std::sync::Arc;

use wf_crypto::{ecdh_v2, hybrid_v1, Algorithm, CryptoError, KeyPair};
use wf_proto::{codec, select_scheme, Envelope, PublishedKey, Scheme, TransportRecord};

use crate::error::StoreError;
use crate::ports::{Directory, Transport};
use crate::vault::KeyVault;

/// Rendered in place of a message this device cannot decrypt.
pub const ENCRYPTED_PLACEHOLDER: &str = "[message encrypted]";

/// Ties scheme selection, the ciphers, the codec and the vault together.
#[derive(Clone)]
pub struct Messenger {
    vault: KeyVault,
    directory: Arc<dyn Directory>,
    transport: Arc<dyn Transport>,
}

impl Messenger {
    pub fn new(
        vault: KeyVault,
        directory: Arc<dyn Directory>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            vault,
            directory,
            transport,
        }
    }

    /// Make sure `user_id` has an identity, publishing the public half to
    /// the directory if it was just created (or re-created after a vault
    /// decrypt failure).
    pub async fn ensure_identity(
        &self,
        user_id: &str,
        algorithm: Algorithm,
    ) -> Result<(), StoreError> {
        let had_identity = self.vault.has_identity(user_id).await?;
        let keys = self.vault.identity_or_generate(user_id, algorithm).await?;
        let published = self.directory.published_key(user_id).await?;

        let needs_publish = !had_identity
            || published.map_or(true, |p| p.public_key != *keys.public_key());
        if needs_publish {
            self.directory
                .publish(PublishedKey {
                    user_id: user_id.to_string(),
                    algorithm: keys.algorithm(),
                    public_key: keys.public_key().clone(),
                })
                .await?;
        }
        Ok(())
    }

    fn encrypt_for(
        recipient: &PublishedKey,
        scheme: Scheme,
        text: &str,
    ) -> Result<Envelope, CryptoError> {
        match scheme {
            Scheme::V2 => {
                let public = recipient.public_key.as_x25519()?;
                Ok(Envelope::V2(ecdh_v2::encrypt(text.as_bytes(), &public)?))
            }
            Scheme::V1 => Ok(Envelope::V1(hybrid_v1::encrypt(
                text.as_bytes(),
                &recipient.public_key.0,
            )?)),
            Scheme::Plaintext => Ok(Envelope::Plaintext(text.to_string())),
        }
    }

    /// Encrypt `text` for `recipient_id`, pack it and hand it to the
    /// transport. Returns the record that was pushed.
    ///
    /// A recipient with no published key gets a plaintext record; an
    /// encryption failure (e.g. a malformed published key) degrades the
    /// same way rather than blocking the send.
    pub async fn send(
        &self,
        sender_id: &str,
        recipient_id: &str,
        text: &str,
    ) -> Result<TransportRecord, StoreError> {
        let published = self.directory.published_key(recipient_id).await?;
        let scheme = select_scheme(published.as_ref());

        let envelope = match published {
            Some(recipient) => match Self::encrypt_for(&recipient, scheme, text) {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::warn!(
                        recipient = %recipient_id,
                        error = %e,
                        "encryption failed, sending unencrypted"
                    );
                    Envelope::Plaintext(text.to_string())
                }
            },
            None => Envelope::Plaintext(text.to_string()),
        };

        let record = codec::pack(&envelope, sender_id, recipient_id, Some(text));
        self.transport.push(record.clone()).await?;
        Ok(record)
    }

    fn decrypt_envelope(envelope: &Envelope, keys: &KeyPair) -> Result<String, CryptoError> {
        let plain = match envelope {
            Envelope::Plaintext(text) => return Ok(text.clone()),
            Envelope::V1(v1) => hybrid_v1::decrypt(v1, keys.private_bytes())?,
            Envelope::V2(v2) => {
                let secret: [u8; 32] = keys
                    .private_bytes()
                    .try_into()
                    .map_err(|_| CryptoError::Decryption)?;
                ecdh_v2::decrypt(v2, &secret)?
            }
        };
        String::from_utf8(plain).map_err(|_| CryptoError::Decryption)
    }

    /// Render a transport record for display on this device.
    ///
    /// Own-authored records use the `sender_content` duplicate; anything
    /// this device cannot open comes back as the placeholder string, never
    /// as an error.
    pub async fn open(&self, record: &TransportRecord, own_id: &str) -> String {
        if record.sender_id == own_id {
            if let Some(sender_content) = &record.sender_content {
                return sender_content.clone();
            }
        }

        let envelope = match codec::unpack(record) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode transport record");
                return ENCRYPTED_PLACEHOLDER.to_string();
            }
        };

        if let Envelope::Plaintext(text) = envelope {
            return text;
        }

        let keys = match self.vault.load(own_id).await {
            Ok(Some(keys)) => keys,
            Ok(None) | Err(_) => return ENCRYPTED_PLACEHOLDER.to_string(),
        };

        match Self::decrypt_envelope(&envelope, &keys) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "failed to decrypt message");
                ENCRYPTED_PLACEHOLDER.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::MemoryKeyStore;
    use crate::ports::{MemoryDirectory, MemoryTransport};

    fn messenger() -> Messenger {
        Messenger::new(
            KeyVault::new(Arc::new(MemoryKeyStore::new())),
            Arc::new(MemoryDirectory::new()),
            Arc::new(MemoryTransport::new()),
        )
    }

    #[tokio::test]
    async fn v2_end_to_end() {
        let m = messenger();
        m.ensure_identity("alice", Algorithm::X25519).await.unwrap();
        m.ensure_identity("bob", Algorithm::X25519).await.unwrap();

        let record = m.send("alice", "bob", "hello").await.unwrap();
        assert!(record.is_encrypted);
        // Ciphertext, not plaintext, on the wire.
        assert_ne!(record.content, "hello");

        assert_eq!(m.open(&record, "bob").await, "hello");
    }

    #[tokio::test]
    async fn v1_end_to_end() {
        let m = messenger();
        m.ensure_identity("alice", Algorithm::X25519).await.unwrap();
        m.ensure_identity("bob", Algorithm::RsaOaep2048).await.unwrap();

        let record = m.send("alice", "bob", "legacy hello").await.unwrap();
        assert!(record.is_encrypted);
        // v1 records carry a bare base64 wrapped key, not the v2 JSON.
        assert!(!record.encrypted_key.as_deref().unwrap().starts_with('{'));

        assert_eq!(m.open(&record, "bob").await, "legacy hello");
    }

    #[tokio::test]
    async fn no_published_key_sends_plaintext() {
        let m = messenger();
        m.ensure_identity("alice", Algorithm::X25519).await.unwrap();

        let record = m.send("alice", "newcomer", "welcome!").await.unwrap();
        assert!(!record.is_encrypted);
        assert_eq!(record.content, "welcome!");
        assert_eq!(m.open(&record, "newcomer").await, "welcome!");
    }

    #[tokio::test]
    async fn malformed_published_key_degrades_to_plaintext() {
        let m = messenger();
        m.ensure_identity("alice", Algorithm::X25519).await.unwrap();
        m.directory
            .publish(PublishedKey {
                user_id: "bob".into(),
                algorithm: Algorithm::X25519,
                public_key: wf_crypto::PublicKeyBytes(vec![1, 2, 3]),
            })
            .await
            .unwrap();

        let record = m.send("alice", "bob", "still goes through").await.unwrap();
        assert!(!record.is_encrypted);
        assert_eq!(record.content, "still goes through");
    }

    #[tokio::test]
    async fn sender_redisplays_own_message_without_decrypting() {
        let m = messenger();
        m.ensure_identity("alice", Algorithm::X25519).await.unwrap();
        m.ensure_identity("bob", Algorithm::X25519).await.unwrap();

        let record = m.send("alice", "bob", "my own words").await.unwrap();
        // The envelope is addressed to bob's key; alice reads the duplicate.
        assert_eq!(m.open(&record, "alice").await, "my own words");
    }

    #[tokio::test]
    async fn wrong_recipient_sees_placeholder() {
        let m = messenger();
        m.ensure_identity("alice", Algorithm::X25519).await.unwrap();
        m.ensure_identity("bob", Algorithm::X25519).await.unwrap();
        m.ensure_identity("eve", Algorithm::X25519).await.unwrap();

        let record = m.send("alice", "bob", "for bob only").await.unwrap();
        assert_eq!(m.open(&record, "eve").await, ENCRYPTED_PLACEHOLDER);
    }

    #[tokio::test]
    async fn missing_identity_sees_placeholder() {
        let m = messenger();
        m.ensure_identity("alice", Algorithm::X25519).await.unwrap();
        m.ensure_identity("bob", Algorithm::X25519).await.unwrap();

        let record = m.send("alice", "bob", "secret").await.unwrap();
        m.vault.clear().await.unwrap();
        assert_eq!(m.open(&record, "bob").await, ENCRYPTED_PLACEHOLDER);
    }

    #[tokio::test]
    async fn tampered_record_sees_placeholder() {
        let m = messenger();
        m.ensure_identity("alice", Algorithm::X25519).await.unwrap();
        m.ensure_identity("bob", Algorithm::X25519).await.unwrap();

        let mut record = m.send("alice", "bob", "intact").await.unwrap();
        // Corrupt the base64 ciphertext field wholesale.
        record.content = {
            use base64::{engine::general_purpose::STANDARD, Engine};
            let mut bytes = STANDARD.decode(&record.content).unwrap();
            bytes[0] ^= 0xFF;
            STANDARD.encode(bytes)
        };
        assert_eq!(m.open(&record, "bob").await, ENCRYPTED_PLACEHOLDER);
    }

    #[tokio::test]
    async fn transport_keeps_conversation_records() {
        let m = messenger();
        m.ensure_identity("alice", Algorithm::X25519).await.unwrap();
        m.ensure_identity("bob", Algorithm::X25519).await.unwrap();

        m.send("alice", "bob", "one").await.unwrap();
        m.send("bob", "alice", "two").await.unwrap();
        m.send("alice", "carol", "elsewhere").await.unwrap();

        let convo = m.transport.conversation("alice", "bob").await.unwrap();
        assert_eq!(convo.len(), 2);
    }
}
