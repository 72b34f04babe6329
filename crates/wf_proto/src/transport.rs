//! The persisted/transmitted message shape.
//!
//! The transport collaborator stores these rows keyed by
//! `(sender_id, recipient_id)` and notifies on inserts; it never inspects
//! the payload. Rows are immutable once written, except for deletion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message as the transport store sees it.
///
/// Field layout is authoritative and must stay stable across cipher
/// generations:
/// - `content`       — base64 AEAD ciphertext, or plaintext when
///   `is_encrypted` is false
/// - `iv`            — base64, 12 bytes; absent on plaintext records
/// - `encrypted_key` — base64 RSA-wrapped key (v1) or a JSON string
///   `{"ephemeralPublicKey": .., "salt": .., "version": 2}` (v2)
/// - `sender_content` — plaintext duplicate, present only on records the
///   authoring device wrote, so the sender's own UI can render the message
///   without decrypting an envelope addressed to someone else's key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportRecord {
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_key: Option<String>,
    pub is_encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_content: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_record_omits_crypto_fields() {
        let record = TransportRecord {
            sender_id: "alice".into(),
            recipient_id: "bob".into(),
            content: "hi".into(),
            iv: None,
            encrypted_key: None,
            is_encrypted: false,
            sender_content: None,
            sent_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("\"iv\""));
        assert!(!json.contains("encrypted_key"));
        assert!(!json.contains("sender_content"));
    }
}
