//! AWS STS compatible `AssumeRoleWithSAML`.
//!
//! A client forwards a SAML response; the assertion is confirmed with the IdP
//! that issued it and a temporary credential is minted and published as the
//! active server credential.

pub mod config;
pub mod error;
pub mod handler;
pub mod idp;
pub mod request;
pub mod response;

pub use config::{IdpClientConfig, StsConfig, StsConfigJson};
pub use error::{StsError, StsErrorCode};
pub use handler::{name_qualifier, Clock, StsService, SystemClock};
pub use idp::IdpClient;
pub use request::{resolve_duration, STS_API_VERSION};
pub use response::{AssumeRoleWithSamlResponse, AssumeRoleWithSamlResult, ErrorResponse};
