//! STS wire format.
//!
//! Success and error documents follow the AWS STS `2011-06-15` XML schema.

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use serde::Serialize;

use super::error::StsErrorCode;
use crate::credentials::Credential;

/// XML namespace of STS documents.
pub const STS_XMLNS: &str = "https://sts.amazonaws.com/doc/2011-06-15/";

/// Root of a successful `AssumeRoleWithSAML` response.
#[derive(Debug, Serialize)]
#[serde(rename = "AssumeRoleWithSAMLResponse")]
pub struct AssumeRoleWithSamlResponse {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "AssumeRoleWithSAMLResult")]
    pub result: AssumeRoleWithSamlResult,
    #[serde(rename = "ResponseMetadata")]
    pub metadata: ResponseMetadata,
}

impl AssumeRoleWithSamlResponse {
    pub fn new(result: AssumeRoleWithSamlResult, request_id: &str) -> Self {
        Self {
            xmlns: STS_XMLNS,
            result,
            metadata: ResponseMetadata {
                request_id: request_id.to_string(),
            },
        }
    }

    /// Serialize to an XML document.
    pub fn to_xml(&self) -> Result<String> {
        to_document(self)
    }
}

/// Result of a successful `AssumeRoleWithSAML` call.
///
/// `Audience`, `PackedPolicySize`, `Subject` and `SubjectType` are part of the
/// schema but not populated yet; they are omitted while unset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssumeRoleWithSamlResult {
    pub assumed_role_user: AssumedRoleUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    pub credentials: CredentialsXml,
    pub issuer: String,
    pub name_qualifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packed_policy_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_type: Option<String>,
}

impl AssumeRoleWithSamlResult {
    pub fn new(credential: &Credential, issuer: &str, name_qualifier: String) -> Self {
        Self {
            assumed_role_user: AssumedRoleUser::default(),
            audience: None,
            credentials: CredentialsXml::from(credential),
            issuer: issuer.to_string(),
            name_qualifier,
            packed_policy_size: None,
            subject: None,
            subject_type: None,
        }
    }
}

/// Identifiers of the assumed role.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssumedRoleUser {
    pub arn: String,
    #[serde(rename = "AssumedRoleId")]
    pub assumed_role_id: String,
}

/// Credential as rendered on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CredentialsXml {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: String,
}

impl From<&Credential> for CredentialsXml {
    fn from(credential: &Credential) -> Self {
        Self {
            access_key_id: credential.access_key.clone(),
            secret_access_key: credential.secret_key.clone(),
            session_token: credential.session_token.clone(),
            expiration: credential
                .expiration
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    #[serde(rename = "RequestId")]
    pub request_id: String,
}

/// STS error document.
#[derive(Debug, Serialize)]
#[serde(rename = "ErrorResponse")]
pub struct ErrorResponse {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "Error")]
    pub error: ErrorBody,
    #[serde(rename = "RequestId")]
    pub request_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorBody {
    #[serde(rename = "Type")]
    pub kind: String,
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: StsErrorCode, request_id: &str) -> Self {
        Self {
            xmlns: STS_XMLNS,
            error: ErrorBody {
                kind: "Sender".to_string(),
                code: code.as_str().to_string(),
                message: code.description().to_string(),
            },
            request_id: request_id.to_string(),
        }
    }

    /// Serialize to an XML document.
    pub fn to_xml(&self) -> Result<String> {
        to_document(self)
    }
}

fn to_document<T: Serialize>(value: &T) -> Result<String> {
    let body = quick_xml::se::to_string(value).context("Failed to serialize STS response")?;
    Ok(format!(r#"<?xml version="1.0" encoding="UTF-8"?>{}"#, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn credential() -> Credential {
        Credential {
            access_key: "AKIAEXAMPLE000000000".to_string(),
            secret_key: "secret+key".to_string(),
            session_token: "a.b<c>".to_string(),
            expiration: Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_success_document() {
        let result = AssumeRoleWithSamlResult::new(
            &credential(),
            "https://idp.example.com/saml",
            "nq==".to_string(),
        );
        let xml = AssumeRoleWithSamlResponse::new(result, "req-1").to_xml().unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains(r#"<AssumeRoleWithSAMLResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">"#));
        assert!(xml.contains("<AssumeRoleWithSAMLResult>"));
        assert!(xml.contains("<AssumedRoleUser>"));
        assert!(xml.contains("<AccessKeyId>AKIAEXAMPLE000000000</AccessKeyId>"));
        assert!(xml.contains("<SecretAccessKey>secret+key</SecretAccessKey>"));
        assert!(xml.contains("<SessionToken>a.b&lt;c&gt;</SessionToken>"));
        assert!(xml.contains("<Expiration>2026-10-16T12:00:00Z</Expiration>"));
        assert!(xml.contains("<Issuer>https://idp.example.com/saml</Issuer>"));
        assert!(xml.contains("<NameQualifier>nq==</NameQualifier>"));
        assert!(xml.contains("<RequestId>req-1</RequestId>"));
    }

    #[test]
    fn test_unpopulated_fields_omitted() {
        let result = AssumeRoleWithSamlResult::new(&credential(), "iss", "nq".to_string());
        let xml = AssumeRoleWithSamlResponse::new(result, "req-2").to_xml().unwrap();

        for field in ["Audience", "PackedPolicySize", "<Subject>", "SubjectType"] {
            assert!(!xml.contains(field), "{} should be omitted", field);
        }
    }

    #[test]
    fn test_error_document() {
        let xml = ErrorResponse::new(StsErrorCode::IdpRejectedClaim, "req-3")
            .to_xml()
            .unwrap();

        assert!(xml.contains("<ErrorResponse"));
        assert!(xml.contains("<Type>Sender</Type>"));
        assert!(xml.contains("<Code>IDPRejectedClaim</Code>"));
        assert!(xml.contains("<Message>The identity provider (IdP) reported"));
        assert!(xml.contains("<RequestId>req-3</RequestId>"));
    }
}
