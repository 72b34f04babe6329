//! Identity key management.
//!
//! Each user has exactly one active identity key pair per device, tagged
//! with the algorithm generation it belongs to:
//!
//! - `RsaOaep2048` — generation 1, RSA-OAEP key transport. Public half is
//!   SPKI DER, private half PKCS#8 DER.
//! - `X25519` — generation 2, Diffie-Hellman key agreement. Both halves
//!   are raw 32-byte curve points/scalars.
//!
//! Cipher dispatch happens on the `Algorithm` tag, never on runtime
//! inspection of the key bytes. Private halves never leave this type
//! unencrypted except through `private_bytes()`, which exists solely for
//! the vault's wrap-at-rest path.

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::ZeroizeOnDrop;

use crate::error::CryptoError;

/// Which cipher generation a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    RsaOaep2048,
    X25519,
}

/// Public key bytes, base64-encoded on the wire.
///
/// RSA keys are SPKI DER (~294 bytes); X25519 keys are 32 raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKeyBytes(pub Vec<u8>);

impl PublicKeyBytes {
    pub fn to_b64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn from_b64(s: &str) -> Result<Self, CryptoError> {
        Ok(Self(STANDARD.decode(s)?))
    }

    /// Interpret as a raw X25519 public key.
    pub fn as_x25519(&self) -> Result<[u8; 32], CryptoError> {
        self.0
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKey(format!(
                "X25519 public key must be 32 bytes, got {}",
                self.0.len()
            )))
    }
}

/// Algorithm-tagged identity key pair. Drop clears the private half.
#[derive(ZeroizeOnDrop)]
pub enum KeyPair {
    RsaOaep2048 {
        #[zeroize(skip)]
        public: PublicKeyBytes,
        /// PKCS#8 DER private key.
        private_der: Vec<u8>,
    },
    X25519 {
        #[zeroize(skip)]
        public: PublicKeyBytes,
        secret: [u8; 32],
    },
}

impl KeyPair {
    /// Generate a fresh key pair for the given algorithm using the OS RNG.
    pub fn generate(algorithm: Algorithm) -> Result<Self, CryptoError> {
        match algorithm {
            Algorithm::RsaOaep2048 => {
                let private = RsaPrivateKey::new(&mut OsRng, 2048)
                    .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
                let public_der = RsaPublicKey::from(&private)
                    .to_public_key_der()
                    .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
                let private_der = private
                    .to_pkcs8_der()
                    .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
                Ok(Self::RsaOaep2048 {
                    public: PublicKeyBytes(public_der.as_bytes().to_vec()),
                    private_der: private_der.as_bytes().to_vec(),
                })
            }
            Algorithm::X25519 => {
                let secret = StaticSecret::random_from_rng(OsRng);
                let public = X25519Public::from(&secret);
                Ok(Self::X25519 {
                    public: PublicKeyBytes(public.as_bytes().to_vec()),
                    secret: secret.to_bytes(),
                })
            }
        }
    }

    /// Rebuild a key pair from stored halves (the vault's load path).
    pub fn from_parts(
        algorithm: Algorithm,
        public: Vec<u8>,
        private: &[u8],
    ) -> Result<Self, CryptoError> {
        match algorithm {
            Algorithm::RsaOaep2048 => {
                // Validate the DER before accepting it.
                RsaPrivateKey::from_pkcs8_der(private)
                    .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
                Ok(Self::RsaOaep2048 {
                    public: PublicKeyBytes(public),
                    private_der: private.to_vec(),
                })
            }
            Algorithm::X25519 => {
                let secret: [u8; 32] = private.try_into().map_err(|_| {
                    CryptoError::InvalidKey("X25519 secret must be 32 bytes".into())
                })?;
                Ok(Self::X25519 {
                    public: PublicKeyBytes(public),
                    secret,
                })
            }
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::RsaOaep2048 { .. } => Algorithm::RsaOaep2048,
            Self::X25519 { .. } => Algorithm::X25519,
        }
    }

    pub fn public_key(&self) -> &PublicKeyBytes {
        match self {
            Self::RsaOaep2048 { public, .. } | Self::X25519 { public, .. } => public,
        }
    }

    /// Raw private-half bytes, for the vault's encrypt-at-rest path only.
    pub fn private_bytes(&self) -> &[u8] {
        match self {
            Self::RsaOaep2048 { private_der, .. } => private_der,
            Self::X25519 { secret, .. } => secret,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x25519_generate_has_32_byte_halves() {
        let kp = KeyPair::generate(Algorithm::X25519).unwrap();
        assert_eq!(kp.public_key().0.len(), 32);
        assert_eq!(kp.private_bytes().len(), 32);
        assert_eq!(kp.algorithm(), Algorithm::X25519);
    }

    #[test]
    fn from_parts_round_trips_x25519() {
        let kp = KeyPair::generate(Algorithm::X25519).unwrap();
        let rebuilt = KeyPair::from_parts(
            Algorithm::X25519,
            kp.public_key().0.clone(),
            kp.private_bytes(),
        )
        .unwrap();
        assert_eq!(rebuilt.public_key(), kp.public_key());
    }

    #[test]
    fn from_parts_rejects_truncated_rsa_der() {
        let kp = KeyPair::generate(Algorithm::RsaOaep2048).unwrap();
        let truncated = &kp.private_bytes()[..kp.private_bytes().len() / 2];
        let err = KeyPair::from_parts(
            Algorithm::RsaOaep2048,
            kp.public_key().0.clone(),
            truncated,
        );
        assert!(matches!(err, Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn b64_round_trip() {
        let pk = PublicKeyBytes(vec![1, 2, 3, 255]);
        assert_eq!(PublicKeyBytes::from_b64(&pk.to_b64()).unwrap(), pk);
    }
}
