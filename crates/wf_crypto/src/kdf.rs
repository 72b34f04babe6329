//! Key derivation functions.
//!
//! `vault_wrapping_key` — PBKDF2-SHA256, derives the 32-byte key that
//!   encrypts a private key at rest in the device vault.
//!
//! `message_key` — HKDF-SHA256, turns an ECDH shared secret plus a
//!   per-message salt into the AES-256 message key.

use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

use crate::error::CryptoError;

/// PBKDF2 iteration count for the vault wrapping key.
pub const VAULT_KDF_ITERATIONS: u32 = 100_000;

/// Fixed PBKDF2 salt. The wrapping input is the owner id, which is not
/// secret; see DESIGN.md for the confidentiality caveat this carries.
const VAULT_KDF_SALT: &[u8] = b"wayfare-vault-v1";

/// HKDF info string for single-recipient v2 message keys.
pub const INFO_MESSAGE_V2: &[u8] = b"wf-msg-v2";

/// HKDF info string for per-recipient group key-encryption keys.
pub const INFO_GROUP_KEK_V2: &[u8] = b"wf-group-kek-v2";

/// 32-byte vault wrapping key. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct WrappingKey(pub [u8; 32]);

/// Derive the vault wrapping key for an owner id.
///
/// Same id in, same key out; a record written for a different owner will
/// fail AEAD authentication when unwrapped with this key.
pub fn vault_wrapping_key(owner_id: &str) -> WrappingKey {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(
        owner_id.as_bytes(),
        VAULT_KDF_SALT,
        VAULT_KDF_ITERATIONS,
        &mut key,
    );
    WrappingKey(key)
}

/// Derive a 256-bit AES key from an ECDH shared secret.
pub fn message_key(
    shared_secret: &[u8; 32],
    salt: &[u8; 16],
    info: &[u8],
) -> Result<[u8; 32], CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), shared_secret);
    let mut key = [0u8; 32];
    hk.expand(info, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Fresh random 16-byte HKDF salt.
pub fn random_salt() -> [u8; 16] {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    salt
}
