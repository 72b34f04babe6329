//! Envelope codec — maps cipher envelopes onto flat transport records.
//!
//! Version dispatch lives entirely in `encrypted_key`:
//! - v2 writes a JSON string `{"ephemeralPublicKey", "salt", "version": 2}`
//! - v1 writes the base64 RSA-wrapped key directly
//!
//! Decode tries the JSON shape first; anything that does not parse as JSON
//! is a legacy v1 record (records written before versioning existed carry
//! no tag at all and must keep decoding as v1).

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use wf_crypto::{aead, CryptoError, EnvelopeV1, EnvelopeV2};

use crate::transport::TransportRecord;

/// A decoded envelope, ready for the matching cipher (or, for
/// `Plaintext`, for direct display).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    V1(EnvelopeV1),
    V2(EnvelopeV2),
    Plaintext(String),
}

/// The v2 `encrypted_key` payload.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EphemeralBundle {
    ephemeral_public_key: String,
    salt: String,
    version: u8,
}

/// Serialize an envelope into a transport record.
///
/// `sender_plaintext` is stored as `sender_content` so the authoring
/// device can redisplay its own message without decrypting.
pub fn pack(
    envelope: &Envelope,
    sender_id: &str,
    recipient_id: &str,
    sender_plaintext: Option<&str>,
) -> TransportRecord {
    let (content, iv, encrypted_key, is_encrypted) = match envelope {
        Envelope::V1(v1) => (
            STANDARD.encode(&v1.ciphertext),
            Some(STANDARD.encode(v1.iv)),
            Some(STANDARD.encode(&v1.wrapped_key)),
            true,
        ),
        Envelope::V2(v2) => {
            let bundle = EphemeralBundle {
                ephemeral_public_key: STANDARD.encode(v2.ephemeral_public),
                salt: STANDARD.encode(v2.salt),
                version: 2,
            };
            (
                STANDARD.encode(&v2.ciphertext),
                Some(STANDARD.encode(v2.iv)),
                // Static struct; serialisation cannot fail.
                Some(serde_json::to_string(&bundle).unwrap_or_default()),
                true,
            )
        }
        Envelope::Plaintext(text) => (text.clone(), None, None, false),
    };

    TransportRecord {
        sender_id: sender_id.to_string(),
        recipient_id: recipient_id.to_string(),
        content,
        iv,
        encrypted_key,
        is_encrypted,
        sender_content: sender_plaintext.map(str::to_string),
        sent_at: Utc::now(),
    }
}

fn decode_iv(record: &TransportRecord) -> Result<[u8; aead::IV_LEN], CryptoError> {
    let iv_b64 = record.iv.as_deref().ok_or(CryptoError::Decryption)?;
    let bytes = STANDARD.decode(iv_b64)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::Decryption)
}

/// Deserialize a transport record back into an envelope.
///
/// `is_encrypted = false` short-circuits to `Plaintext`; no cipher is
/// invoked and `content` is taken verbatim.
pub fn unpack(record: &TransportRecord) -> Result<Envelope, CryptoError> {
    if !record.is_encrypted {
        return Ok(Envelope::Plaintext(record.content.clone()));
    }

    let ciphertext = STANDARD.decode(&record.content)?;
    let iv = decode_iv(record)?;
    let encrypted_key = record
        .encrypted_key
        .as_deref()
        .ok_or(CryptoError::Decryption)?;

    match serde_json::from_str::<EphemeralBundle>(encrypted_key) {
        Ok(bundle) => {
            if bundle.version != 2 {
                return Err(CryptoError::UnknownVersion(bundle.version));
            }
            let ephemeral_public: [u8; 32] = STANDARD
                .decode(&bundle.ephemeral_public_key)?
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::Decryption)?;
            let salt: [u8; 16] = STANDARD
                .decode(&bundle.salt)?
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::Decryption)?;
            Ok(Envelope::V2(EnvelopeV2 {
                ciphertext,
                iv,
                salt,
                ephemeral_public,
            }))
        }
        // Not JSON: legacy v1 record, encrypted_key is the wrapped AES key.
        Err(_) => Ok(Envelope::V1(EnvelopeV1 {
            ciphertext,
            iv,
            wrapped_key: STANDARD.decode(encrypted_key)?,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_crypto::{ecdh_v2, hybrid_v1, Algorithm, KeyPair};

    #[test]
    fn v1_pack_unpack_round_trip() {
        let kp = KeyPair::generate(Algorithm::RsaOaep2048).unwrap();
        let env = hybrid_v1::encrypt(b"see you in lisbon", &kp.public_key().0).unwrap();
        let record = pack(&Envelope::V1(env.clone()), "alice", "bob", Some("see you in lisbon"));

        assert!(record.is_encrypted);
        assert_eq!(record.sender_content.as_deref(), Some("see you in lisbon"));

        match unpack(&record).unwrap() {
            Envelope::V1(decoded) => {
                assert_eq!(decoded, env);
                assert_eq!(
                    hybrid_v1::decrypt(&decoded, kp.private_bytes()).unwrap(),
                    b"see you in lisbon"
                );
            }
            other => panic!("expected v1, got {other:?}"),
        }
    }

    #[test]
    fn v2_pack_unpack_round_trip() {
        let kp = KeyPair::generate(Algorithm::X25519).unwrap();
        let pk = kp.public_key().as_x25519().unwrap();
        let env = ecdh_v2::encrypt(b"gate b12", &pk).unwrap();
        let record = pack(&Envelope::V2(env.clone()), "alice", "bob", None);

        let key_json = record.encrypted_key.as_deref().unwrap();
        assert!(key_json.contains("\"ephemeralPublicKey\""));
        assert!(key_json.contains("\"version\":2"));

        match unpack(&record).unwrap() {
            Envelope::V2(decoded) => assert_eq!(decoded, env),
            other => panic!("expected v2, got {other:?}"),
        }
    }

    #[test]
    fn legacy_record_without_version_decodes_as_v1() {
        // A record written before version tagging: encrypted_key is plain
        // base64, not JSON.
        let record = TransportRecord {
            sender_id: "old-client".into(),
            recipient_id: "bob".into(),
            content: STANDARD.encode(b"opaque"),
            iv: Some(STANDARD.encode([0u8; 12])),
            encrypted_key: Some(STANDARD.encode([9u8; 256])),
            is_encrypted: true,
            sender_content: None,
            sent_at: Utc::now(),
        };
        assert!(matches!(unpack(&record).unwrap(), Envelope::V1(_)));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let record = TransportRecord {
            sender_id: "future-client".into(),
            recipient_id: "bob".into(),
            content: STANDARD.encode(b"opaque"),
            iv: Some(STANDARD.encode([0u8; 12])),
            encrypted_key: Some(
                r#"{"ephemeralPublicKey":"AA==","salt":"AA==","version":3}"#.into(),
            ),
            is_encrypted: true,
            sender_content: None,
            sent_at: Utc::now(),
        };
        assert!(matches!(
            unpack(&record),
            Err(CryptoError::UnknownVersion(3))
        ));
    }

    #[test]
    fn plaintext_record_skips_ciphers() {
        let record = pack(&Envelope::Plaintext("no key yet".into()), "alice", "bob", None);
        assert!(!record.is_encrypted);
        assert_eq!(record.content, "no key yet");
        assert_eq!(unpack(&record).unwrap(), Envelope::Plaintext("no key yet".into()));
    }

    #[test]
    fn encrypted_record_missing_iv_is_an_error() {
        let record = TransportRecord {
            sender_id: "a".into(),
            recipient_id: "b".into(),
            content: STANDARD.encode(b"x"),
            iv: None,
            encrypted_key: Some(STANDARD.encode([1u8; 16])),
            is_encrypted: true,
            sender_content: None,
            sent_at: Utc::now(),
        };
        assert!(unpack(&record).is_err());
    }
}
