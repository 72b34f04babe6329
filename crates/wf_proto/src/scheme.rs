//! Scheme selection — which cipher generation to use for a recipient.
//!
//! Driven entirely by what the recipient has published in the directory:
//! an X25519 key gets the forward-secret v2 cipher, an RSA key gets the
//! legacy v1 cipher, and a recipient with no published key at all gets a
//! plaintext send. The last case is a deliberate availability-over-
//! confidentiality tradeoff: messaging keeps working before the recipient
//! has initialised encryption, and the record is marked unencrypted so
//! clients can upgrade the conversation once a key appears.

use serde::{Deserialize, Serialize};

use wf_crypto::{Algorithm, PublicKeyBytes};

/// A user's row in the key directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedKey {
    pub user_id: String,
    pub algorithm: Algorithm,
    pub public_key: PublicKeyBytes,
}

/// Cipher generation chosen for an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    V1,
    V2,
    Plaintext,
}

/// Pick the strongest scheme the recipient's published key supports.
pub fn select_scheme(recipient: Option<&PublishedKey>) -> Scheme {
    match recipient {
        Some(key) => match key.algorithm {
            Algorithm::X25519 => Scheme::V2,
            Algorithm::RsaOaep2048 => Scheme::V1,
        },
        None => {
            tracing::debug!("recipient has no published key, falling back to plaintext");
            Scheme::Plaintext
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn published(algorithm: Algorithm) -> PublishedKey {
        PublishedKey {
            user_id: "bob".into(),
            algorithm,
            public_key: PublicKeyBytes(vec![0u8; 32]),
        }
    }

    #[test]
    fn x25519_key_selects_v2() {
        assert_eq!(select_scheme(Some(&published(Algorithm::X25519))), Scheme::V2);
    }

    #[test]
    fn rsa_key_selects_v1() {
        assert_eq!(
            select_scheme(Some(&published(Algorithm::RsaOaep2048))),
            Scheme::V1
        );
    }

    #[test]
    fn missing_key_falls_back_to_plaintext() {
        assert_eq!(select_scheme(None), Scheme::Plaintext);
    }
}
