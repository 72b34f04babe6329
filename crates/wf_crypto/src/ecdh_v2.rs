//! Generation 2 cipher: ephemeral X25519 + HKDF-SHA256 + AES-256-GCM.
//!
//! Every call draws a fresh ephemeral key pair; the shared secret is
//! `DH(ephemeral_private, recipient_public)`, run through HKDF with a
//! random 16-byte salt to produce the AES-256 message key.
//!
//! Forward secrecy: `EphemeralSecret` is consumed by `diffie_hellman`, so
//! the ephemeral private key cannot outlive this function. Later
//! compromise of the recipient's long-term key does not recover the
//! ephemeral halves of past messages — they no longer exist.

use rand::rngs::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroize;

use crate::aead;
use crate::error::CryptoError;
use crate::kdf;

/// Single-recipient v2 envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeV2 {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; aead::IV_LEN],
    /// HKDF salt, fresh per message.
    pub salt: [u8; 16],
    /// Sender's ephemeral public key for this message only.
    pub ephemeral_public: [u8; 32],
}

/// Encrypt `plaintext` for the holder of the raw 32-byte X25519 public key.
pub fn encrypt(plaintext: &[u8], recipient_public: &[u8; 32]) -> Result<EnvelopeV2, CryptoError> {
    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = X25519Public::from(&ephemeral);

    let shared = ephemeral.diffie_hellman(&X25519Public::from(*recipient_public));
    let salt = kdf::random_salt();
    let mut message_key = kdf::message_key(shared.as_bytes(), &salt, kdf::INFO_MESSAGE_V2)?;

    let iv = aead::random_iv();
    let ciphertext = aead::seal(&message_key, &iv, plaintext)?;
    message_key.zeroize();

    Ok(EnvelopeV2 {
        ciphertext,
        iv,
        salt,
        ephemeral_public: ephemeral_public.to_bytes(),
    })
}

/// Recompute the shared secret from the recipient side and decrypt.
pub fn decrypt(envelope: &EnvelopeV2, own_secret: &[u8; 32]) -> Result<Vec<u8>, CryptoError> {
    let own = StaticSecret::from(*own_secret);
    let shared = own.diffie_hellman(&X25519Public::from(envelope.ephemeral_public));
    let mut message_key =
        kdf::message_key(shared.as_bytes(), &envelope.salt, kdf::INFO_MESSAGE_V2)?;
    let plain = aead::open(&message_key, &envelope.iv, &envelope.ciphertext);
    message_key.zeroize();
    plain
}
