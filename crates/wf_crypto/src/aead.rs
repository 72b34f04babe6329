//! Authenticated encryption with associated data.
//!
//! AES-256-GCM throughout. Key: 32 bytes. IV: 12 bytes (random, fresh per
//! call). Tag: 16 bytes, appended to the ciphertext by the cipher.
//!
//! Message ciphertext keeps its IV in a separate wire field (the transport
//! record has a dedicated `iv` column), so `seal`/`open` take the IV
//! explicitly. Key-wrap blobs are self-contained:
//!
//!   [ iv (12 bytes) | wrapped key + tag ]

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::{rngs::OsRng, RngCore};

use crate::error::CryptoError;

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 12;

/// Fresh random AES-256 key.
pub fn random_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    key
}

/// Fresh random 96-bit IV. Never reuse an IV with the same key.
pub fn random_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Encrypt `plaintext` under `key` with the given IV.
pub fn seal(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

/// Decrypt ciphertext+tag. Any tag mismatch (wrong key, flipped bit in
/// ciphertext or IV) surfaces as `CryptoError::Decryption`, never as
/// corrupted plaintext.
pub fn open(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Decryption)?;
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::Decryption)
}

/// Encrypt arbitrary secret bytes under a 32-byte wrapping key, producing a
/// self-contained blob with the IV prepended. Used for group key transport
/// and the vault's private-key-at-rest wrapping.
pub fn wrap(kek: &[u8; KEY_LEN], secret: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let iv = random_iv();
    let ct = seal(kek, &iv, secret)?;
    let mut out = Vec::with_capacity(IV_LEN + ct.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ct);
    Ok(out)
}

/// Decrypt a blob produced by [`wrap`].
pub fn unwrap(kek: &[u8; KEY_LEN], blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < IV_LEN {
        return Err(CryptoError::Decryption);
    }
    let (iv_bytes, ct) = blob.split_at(IV_LEN);
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(iv_bytes);
    open(kek, &iv, ct)
}

/// Unwrap a blob that must contain exactly a 32-byte key.
pub fn unwrap_key(kek: &[u8; KEY_LEN], blob: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    let plain = unwrap(kek, blob)?;
    let key: [u8; KEY_LEN] = plain
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::Decryption)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trip() {
        let key = random_key();
        let iv = random_iv();
        let ct = seal(&key, &iv, b"wish you were here").unwrap();
        assert_eq!(open(&key, &iv, &ct).unwrap(), b"wish you were here");
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let key = random_key();
        let iv = random_iv();
        let ct = seal(&key, &iv, b"payload").unwrap();
        for i in 0..ct.len() {
            let mut flipped = ct.clone();
            flipped[i] ^= 0x01;
            assert!(matches!(
                open(&key, &iv, &flipped),
                Err(CryptoError::Decryption)
            ));
        }
        // And a flipped IV bit.
        let mut bad_iv = iv;
        bad_iv[0] ^= 0x80;
        assert!(open(&key, &bad_iv, &ct).is_err());
    }

    #[test]
    fn wrap_unwrap_key_round_trip() {
        let kek = random_key();
        let inner = random_key();
        let blob = wrap(&kek, &inner).unwrap();
        assert_eq!(unwrap_key(&kek, &blob).unwrap(), inner);
    }

    #[test]
    fn unwrap_with_wrong_kek_fails() {
        let blob = wrap(&random_key(), &random_key()).unwrap();
        assert!(unwrap_key(&random_key(), &blob).is_err());
    }

    #[test]
    fn truncated_wrap_blob_is_rejected() {
        let kek = random_key();
        assert!(matches!(unwrap(&kek, &[0u8; 5]), Err(CryptoError::Decryption)));
    }
}
