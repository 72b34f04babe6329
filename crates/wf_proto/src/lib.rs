//! wf_proto — Wire types and envelope codec for Wayfare messaging
//!
//! The transport store only ever sees [`TransportRecord`] rows; this crate
//! is the single place that knows how cipher envelopes map onto that flat
//! shape and back, across both cipher generations.
//!
//! # Modules
//! - `transport` — the persisted/transmitted record shape
//! - `codec`     — pack/unpack with version dispatch (v2 tagged, v1 legacy)
//! - `scheme`    — pick v1 / v2 / plaintext from the recipient's directory row

pub mod codec;
pub mod scheme;
pub mod transport;

pub use codec::{pack, unpack, Envelope};
pub use scheme::{select_scheme, PublishedKey, Scheme};
pub use transport::TransportRecord;
