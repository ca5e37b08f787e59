//! STS error taxonomy.
//!
//! Internally every failure keeps its precise cause for logging. On the wire
//! the causes collapse onto two STS error codes.

use thiserror::Error;

/// Failure of an `AssumeRoleWithSAML` request.
#[derive(Debug, Error)]
pub enum StsError {
    /// Request body could not be read or is not valid form data.
    #[error("malformed request body: {0}")]
    MalformedRequest(String),

    /// `Version` is absent or unsupported.
    #[error("API version mismatch: expected {expected}, got {actual:?}")]
    VersionMismatch {
        expected: &'static str,
        actual: Option<String>,
    },

    /// `SAMLAssertion` could not be parsed.
    #[error("invalid SAML assertion: {0}")]
    InvalidAssertion(String),

    /// `DurationSeconds` is not a base-10 integer.
    #[error("invalid DurationSeconds {value:?}: {source}")]
    InvalidDuration {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// The IdP could not be reached (DNS, connect, TLS, timeout).
    #[error("IdP {destination} unreachable: {source}")]
    IdpUnreachable {
        destination: String,
        #[source]
        source: reqwest::Error,
    },

    /// The IdP answered the confirmation with a server error.
    #[error("IdP {destination} rejected the claim with status {status}")]
    IdpRejectedClaim { destination: String, status: u16 },

    /// A new credential could not be generated.
    #[error("failed to generate credential: {0}")]
    CredentialMinting(String),
}

/// Error codes visible on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StsErrorCode {
    MalformedPolicyDocument,
    IdpRejectedClaim,
}

impl StsErrorCode {
    /// STS error code string.
    pub fn as_str(&self) -> &'static str {
        match self {
            StsErrorCode::MalformedPolicyDocument => "MalformedPolicyDocument",
            StsErrorCode::IdpRejectedClaim => "IDPRejectedClaim",
        }
    }

    /// Human readable description sent in the error document.
    pub fn description(&self) -> &'static str {
        match self {
            StsErrorCode::MalformedPolicyDocument => {
                "The request was rejected because the policy document was malformed."
            }
            StsErrorCode::IdpRejectedClaim => {
                "The identity provider (IdP) reported that authentication failed, or the certificate in the SAML assertion is invalid."
            }
        }
    }

    /// HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            StsErrorCode::MalformedPolicyDocument => 400,
            StsErrorCode::IdpRejectedClaim => 403,
        }
    }
}

impl std::fmt::Display for StsErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StsError {
    /// Wire error code for this failure.
    pub fn code(&self) -> StsErrorCode {
        match self {
            StsError::IdpRejectedClaim { .. } => StsErrorCode::IdpRejectedClaim,
            StsError::MalformedRequest(_)
            | StsError::VersionMismatch { .. }
            | StsError::InvalidAssertion(_)
            | StsError::InvalidDuration { .. }
            | StsError::IdpUnreachable { .. }
            | StsError::CredentialMinting(_) => StsErrorCode::MalformedPolicyDocument,
        }
    }
}
