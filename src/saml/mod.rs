//! SAML response handling.
//!
//! Decodes the base64 SAML response forwarded by a client into the handful of
//! fields the STS endpoint needs. Signature verification is left to the IdP,
//! which receives the original payload again during confirmation.

pub mod parser;

pub use parser::{AssertionParser, SamlAssertion, SamlResponseParser, MAX_ENCODED_RESPONSE_SIZE};
