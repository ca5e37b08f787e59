//! AWS STS compatible `AssumeRoleWithSAML` endpoint.

pub mod credentials;
pub mod saml;
pub mod server;
pub mod sts;
