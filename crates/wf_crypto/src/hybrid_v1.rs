//! Generation 1 hybrid cipher: RSA-OAEP(2048) key transport + AES-256-GCM.
//!
//! A fresh AES-256 key and 96-bit IV are drawn for every call; the AES key
//! is wrapped once under the recipient's RSA public key. Two calls with
//! identical inputs never share a `(ciphertext, wrapped_key)` pair.
//!
//! Kept alongside the v2 ECDH cipher for rollout: recipients who have only
//! published an RSA key keep receiving v1 envelopes until they rotate.

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::aead;
use crate::error::CryptoError;

/// Single-recipient v1 envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeV1 {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; aead::IV_LEN],
    /// AES key under RSA-OAEP(SHA-256), 256 bytes for a 2048-bit modulus.
    pub wrapped_key: Vec<u8>,
}

/// Encrypt `plaintext` for the holder of `recipient_spki_der`.
pub fn encrypt(plaintext: &[u8], recipient_spki_der: &[u8]) -> Result<EnvelopeV1, CryptoError> {
    let public = RsaPublicKey::from_public_key_der(recipient_spki_der)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let mut message_key = aead::random_key();
    let iv = aead::random_iv();
    let ciphertext = aead::seal(&message_key, &iv, plaintext)?;

    let wrapped_key = public
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &message_key)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    message_key.zeroize();

    Ok(EnvelopeV1 {
        ciphertext,
        iv,
        wrapped_key,
    })
}

/// Unwrap the message key with `private_pkcs8_der` and decrypt.
///
/// Wrong key, tampered ciphertext and tampered wrapped-key material all
/// collapse to `CryptoError::Decryption`.
pub fn decrypt(envelope: &EnvelopeV1, private_pkcs8_der: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let private = RsaPrivateKey::from_pkcs8_der(private_pkcs8_der)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let mut unwrapped = private
        .decrypt(Oaep::new::<Sha256>(), &envelope.wrapped_key)
        .map_err(|_| CryptoError::Decryption)?;
    let message_key: [u8; aead::KEY_LEN] = unwrapped
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::Decryption)?;
    unwrapped.zeroize();

    aead::open(&message_key, &envelope.iv, &envelope.ciphertext)
}
