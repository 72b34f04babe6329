//! wf_store — Device key vault and messaging pipeline for Wayfare
//!
//! # Encryption-at-rest strategy
//! The vault never persists a private key in the clear: the private half
//! is AES-256-GCM-wrapped under a PBKDF2-derived key before it reaches the
//! [`KeyStore`] port. The physical medium behind the port is swappable
//! (in-memory for tests, a JSON file for desktop; an OS keychain adapter
//! slots in the same way).
//!
//! # Modules
//! - `keystore` — the `KeyStore` port plus memory/file adapters
//! - `vault`    — identity lifecycle: generate, wrap, load, clear
//! - `ports`    — directory and transport collaborator traits
//! - `pipeline` — scheme selection, encrypt/pack on send, unpack/decrypt
//!   with graceful degradation on receive
//! - `error`    — unified error type

pub mod error;
pub mod keystore;
pub mod pipeline;
pub mod ports;
pub mod vault;

pub use error::StoreError;
pub use keystore::{FileKeyStore, KeyStore, MemoryKeyStore, VaultRecord};
pub use pipeline::Messenger;
pub use ports::{Directory, MemoryDirectory, MemoryTransport, Transport};
pub use vault::KeyVault;
