//! Group envelopes: one shared ciphertext, one wrapped key per recipient.
//!
//! The plaintext is encrypted exactly once under a shared AES-256 key;
//! that key is then wrapped independently for each recipient using
//! whichever cipher generation matches their published algorithm:
//!
//! - `RsaOaep2048` recipients get the shared key under RSA-OAEP (v1 path).
//! - `X25519` recipients get an ephemeral-ECDH-derived KEK which AEAD-wraps
//!   the shared key (v2 path).
//!
//! A recipient whose published key turns out to be malformed is skipped
//! and logged; the send proceeds for everyone else.

use std::collections::HashMap;

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Oaep, RsaPublicKey};
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroize;

use crate::aead;
use crate::error::CryptoError;
use crate::kdf;
use crate::keys::{Algorithm, KeyPair, PublicKeyBytes};

/// A group member's published key material, as read from the directory.
#[derive(Debug, Clone)]
pub struct GroupRecipient {
    pub user_id: String,
    pub algorithm: Algorithm,
    pub public_key: PublicKeyBytes,
}

/// Per-recipient wrapped-key bundle. Every variant decrypts to the same
/// shared message key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrappedKey {
    RsaOaep {
        wrapped_key: Vec<u8>,
    },
    Ecdh {
        ephemeral_public: [u8; 32],
        salt: [u8; 16],
        /// Shared message key under the ECDH-derived KEK (iv-prefixed blob).
        wrapped_key: Vec<u8>,
    },
}

/// One ciphertext for the whole group plus a wrapped key per member.
#[derive(Debug, Clone)]
pub struct GroupEnvelope {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; aead::IV_LEN],
    pub wrapped_keys: HashMap<String, WrappedKey>,
}

fn wrap_for_recipient(
    shared_key: &[u8; aead::KEY_LEN],
    recipient: &GroupRecipient,
) -> Result<WrappedKey, CryptoError> {
    match recipient.algorithm {
        Algorithm::RsaOaep2048 => {
            let public = RsaPublicKey::from_public_key_der(&recipient.public_key.0)
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            let wrapped_key = public
                .encrypt(&mut OsRng, Oaep::new::<Sha256>(), shared_key)
                .map_err(|e| CryptoError::Encryption(e.to_string()))?;
            Ok(WrappedKey::RsaOaep { wrapped_key })
        }
        Algorithm::X25519 => {
            let their_public = recipient.public_key.as_x25519()?;
            let ephemeral = EphemeralSecret::random_from_rng(OsRng);
            let ephemeral_public = X25519Public::from(&ephemeral).to_bytes();
            let shared = ephemeral.diffie_hellman(&X25519Public::from(their_public));
            let salt = kdf::random_salt();
            let mut kek = kdf::message_key(shared.as_bytes(), &salt, kdf::INFO_GROUP_KEK_V2)?;
            let wrapped_key = aead::wrap(&kek, shared_key)?;
            kek.zeroize();
            Ok(WrappedKey::Ecdh {
                ephemeral_public,
                salt,
                wrapped_key,
            })
        }
    }
}

/// Encrypt `plaintext` once and wrap the message key for every recipient.
///
/// Fails only if no recipient at all could be wrapped; individual failures
/// are logged and skipped so one stale directory row cannot block a group
/// send.
pub fn encrypt_for_group(
    plaintext: &[u8],
    recipients: &[GroupRecipient],
) -> Result<GroupEnvelope, CryptoError> {
    let mut shared_key = aead::random_key();
    let iv = aead::random_iv();
    let ciphertext = aead::seal(&shared_key, &iv, plaintext)?;

    let mut wrapped_keys = HashMap::with_capacity(recipients.len());
    for recipient in recipients {
        match wrap_for_recipient(&shared_key, recipient) {
            Ok(wrapped) => {
                wrapped_keys.insert(recipient.user_id.clone(), wrapped);
            }
            Err(e) => {
                tracing::warn!(
                    recipient = %recipient.user_id,
                    error = %e,
                    "skipping group recipient: key wrap failed"
                );
            }
        }
    }
    shared_key.zeroize();

    if wrapped_keys.is_empty() {
        return Err(CryptoError::Encryption(
            "no group recipient could be wrapped".into(),
        ));
    }

    Ok(GroupEnvelope {
        ciphertext,
        iv,
        wrapped_keys,
    })
}

/// Recover the shared message key for `own_id` and decrypt the shared
/// ciphertext. Every recipient recovers identical plaintext.
pub fn decrypt_for_recipient(
    envelope: &GroupEnvelope,
    own_id: &str,
    own_keys: &KeyPair,
) -> Result<Vec<u8>, CryptoError> {
    let wrapped = envelope
        .wrapped_keys
        .get(own_id)
        .ok_or(CryptoError::Decryption)?;

    let mut shared_key = match wrapped {
        WrappedKey::RsaOaep { wrapped_key } => {
            let private = rsa::RsaPrivateKey::from_pkcs8_der(own_keys.private_bytes())
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
            let mut plain = private
                .decrypt(Oaep::new::<Sha256>(), wrapped_key)
                .map_err(|_| CryptoError::Decryption)?;
            let key: [u8; aead::KEY_LEN] = plain
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::Decryption)?;
            plain.zeroize();
            key
        }
        WrappedKey::Ecdh {
            ephemeral_public,
            salt,
            wrapped_key,
        } => {
            let secret: [u8; 32] = own_keys
                .private_bytes()
                .try_into()
                .map_err(|_| CryptoError::Decryption)?;
            let own = StaticSecret::from(secret);
            let shared = own.diffie_hellman(&X25519Public::from(*ephemeral_public));
            let mut kek = kdf::message_key(shared.as_bytes(), salt, kdf::INFO_GROUP_KEK_V2)?;
            let key = aead::unwrap_key(&kek, wrapped_key)?;
            kek.zeroize();
            key
        }
    };

    let plain = aead::open(&shared_key, &envelope.iv, &envelope.ciphertext);
    shared_key.zeroize();
    plain
}
