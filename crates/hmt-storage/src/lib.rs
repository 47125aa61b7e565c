//! Encrypted, content-addressed payload storage.
//!
//! Payloads are canonicalized to JSON, digested with SHA-1, encrypted for
//! a recipient with ECIES and pushed to a [`ContentStore`]. The digest
//! covers the plaintext so any key holder can verify integrity after
//! decryption.

pub mod backend;
pub mod canonical_json;
pub mod disabled;
pub mod ipfs;
pub mod memory;
pub mod payload;

pub use backend::{ContentStore, Result, StorageError};
pub use canonical_json::{content_digest, to_canonical_json, CanonicalJsonError};
pub use disabled::DisabledStore;
pub use ipfs::{IpfsConfig, IpfsStore};
pub use memory::MemoryStore;
pub use payload::{PayloadError, PayloadRef, PayloadStore};
