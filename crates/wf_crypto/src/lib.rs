//! wf_crypto — Wayfare messaging cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize long-term secret material on drop.
//! - Expected failures (bad key, tampered ciphertext) are typed `Result`
//!   values; nothing in this crate panics on attacker-controlled input.
//!
//! # Module layout
//! - `keys`      — algorithm-tagged identity key pairs (RSA-OAEP-2048 / X25519)
//! - `aead`      — AES-256-GCM encrypt/decrypt and key-wrap helpers
//! - `kdf`       — PBKDF2 vault wrapping key, HKDF-SHA256 message keys
//! - `hybrid_v1` — generation 1: RSA-OAEP key transport + AES-GCM
//! - `ecdh_v2`   — generation 2: ephemeral X25519 + HKDF + AES-GCM
//! - `group`     — one shared ciphertext, per-recipient key wrapping
//! - `error`     — unified error type

pub mod aead;
pub mod ecdh_v2;
pub mod error;
pub mod group;
pub mod hybrid_v1;
pub mod kdf;
pub mod keys;

pub use ecdh_v2::EnvelopeV2;
pub use error::CryptoError;
pub use group::{GroupEnvelope, GroupRecipient, WrappedKey};
pub use hybrid_v1::EnvelopeV1;
pub use keys::{Algorithm, KeyPair, PublicKeyBytes};
