//! Temporary credentials.
//!
//! Minting of access key / secret key / session token triples and the
//! single-slot store holding the credential the server currently accepts.

pub mod minter;
pub mod store;
pub mod types;

pub use minter::{CredentialMinter, KeyMinter};
pub use store::CredentialStore;
pub use types::Credential;
