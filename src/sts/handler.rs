//! `AssumeRoleWithSAML` pipeline.
//!
//! Stages run strictly in order: form parsing, version check, assertion
//! parsing, duration resolution, IdP confirmation, credential minting and
//! publication. The first failing stage ends the request.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::StsError;
use super::idp::IdpClient;
use super::request::{check_version, parse_form, resolve_duration};
use super::response::AssumeRoleWithSamlResult;
use crate::credentials::{CredentialMinter, CredentialStore};
use crate::saml::AssertionParser;

/// Account id folded into the name qualifier.
pub const NAME_QUALIFIER_ACCOUNT_ID: &str = "0000";

/// Provider name folded into the name qualifier.
pub const NAME_QUALIFIER_PROVIDER: &str = "myidp";

/// Wall clock source.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System UTC clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// `NameQualifier`: base64(SHA-1(issuer + account id + provider name)).
pub fn name_qualifier(issuer: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(issuer.as_bytes());
    hasher.update(NAME_QUALIFIER_ACCOUNT_ID.as_bytes());
    hasher.update(NAME_QUALIFIER_PROVIDER.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// The STS endpoint with its collaborators.
pub struct StsService {
    parser: Box<dyn AssertionParser>,
    idp_client: IdpClient,
    minter: Box<dyn CredentialMinter>,
    store: Arc<CredentialStore>,
    clock: Box<dyn Clock>,
}

impl StsService {
    pub fn new(
        parser: Box<dyn AssertionParser>,
        idp_client: IdpClient,
        minter: Box<dyn CredentialMinter>,
        store: Arc<CredentialStore>,
    ) -> Self {
        Self {
            parser,
            idp_client,
            minter,
            store,
            clock: Box::new(SystemClock),
        }
    }

    /// Replace the clock used to compute expiries.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Handle an `AssumeRoleWithSAML` request body.
    ///
    /// On success the new credential has already been published as the
    /// active server credential.
    pub async fn assume_role_with_saml(
        &self,
        body: &[u8],
    ) -> Result<AssumeRoleWithSamlResult, StsError> {
        let form = parse_form(body).map_err(|e| {
            warn!(error = %e, "Unable to parse incoming data");
            e
        })?;

        check_version(&form).map_err(|e| {
            warn!(error = %e, "API version mismatch");
            e
        })?;

        let assertion = self
            .parser
            .parse(form.saml_assertion.as_deref().unwrap_or_default())
            .map_err(|e| {
                warn!(error = %e, "Unable to parse SAML assertion");
                StsError::InvalidAssertion(format!("{:#}", e))
            })?;

        let duration = resolve_duration(form.duration_seconds.as_deref()).map_err(|e| {
            warn!(error = %e, "Unable to parse DurationSeconds");
            e
        })?;

        debug!(
            issuer = %assertion.issuer,
            destination = %assertion.destination,
            duration_secs = duration.num_seconds(),
            "AssumeRoleWithSAML request validated"
        );

        // No store lock is held while waiting on the IdP.
        self.idp_client.confirm(&assertion).await.map_err(|e| {
            warn!(error = %e, "Unable to validate SAML assertion");
            e
        })?;

        let expiration = self.clock.now() + duration;
        let credential = self.minter.mint(expiration).map_err(|e| {
            warn!(error = %e, "Failed to generate new credentials with expiry");
            StsError::CredentialMinting(format!("{:#}", e))
        })?;

        let qualifier = name_qualifier(&assertion.issuer);

        self.store.set_credential(credential.clone());

        info!(
            issuer = %assertion.issuer,
            access_key = %credential.access_key,
            expiration = %credential.expiration,
            "AssumeRoleWithSAML successful"
        );

        Ok(AssumeRoleWithSamlResult::new(
            &credential,
            &assertion.issuer,
            qualifier,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{Credential, KeyMinter};
    use crate::saml::SamlAssertion;
    use crate::sts::config::IdpClientConfig;
    use crate::sts::error::StsErrorCode;
    use anyhow::{anyhow, Result};
    use chrono::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ISSUER: &str = "https://idp.example.com/saml";

    /// Accepts any non-empty assertion and points it at a fixed destination.
    struct StaticParser {
        destination: String,
    }

    impl AssertionParser for StaticParser {
        fn parse(&self, raw: &str) -> Result<SamlAssertion> {
            if raw.is_empty() || raw == "garbage" {
                return Err(anyhow!("not a SAML response"));
            }
            Ok(SamlAssertion {
                destination: self.destination.clone(),
                issuer: ISSUER.to_string(),
                original: raw.to_string(),
                name_id: None,
                name_id_format: None,
            })
        }
    }

    struct FailingMinter;

    impl CredentialMinter for FailingMinter {
        fn mint(&self, _expiration: DateTime<Utc>) -> Result<Credential> {
            Err(anyhow!("entropy source unavailable"))
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    async fn idp_responding(status: u16, expected_calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/saml/acs"))
            .respond_with(ResponseTemplate::new(status))
            .expect(expected_calls)
            .mount(&server)
            .await;
        server
    }

    fn service(server: &MockServer, now: DateTime<Utc>) -> StsService {
        StsService::new(
            Box::new(StaticParser {
                destination: format!("{}/saml/acs", server.uri()),
            }),
            IdpClient::new(&IdpClientConfig::default()).unwrap(),
            Box::new(KeyMinter),
            Arc::new(CredentialStore::new()),
        )
        .with_clock(Box::new(FixedClock(now)))
    }

    #[test]
    fn test_name_qualifier_deterministic() {
        let a = name_qualifier(ISSUER);
        let b = name_qualifier(ISSUER);
        assert_eq!(a, b);
        assert_ne!(a, name_qualifier("https://other.example.com/saml"));

        let expected = BASE64.encode(Sha1::digest(format!("{}0000myidp", ISSUER).as_bytes()));
        assert_eq!(a, expected);
        // SHA-1 digests are 20 bytes, 28 base64 characters.
        assert_eq!(a.len(), 28);
    }

    #[tokio::test]
    async fn test_short_duration_clamped_up() {
        let server = idp_responding(200, 1).await;
        let now = Utc::now();
        let sts = service(&server, now);

        let result = sts
            .assume_role_with_saml(b"Version=2011-06-15&SAMLAssertion=dGVzdA&DurationSeconds=600")
            .await
            .unwrap();

        let active = sts.store().current().unwrap();
        assert_eq!(active.expiration, now + Duration::seconds(900));
        assert_eq!(result.credentials.access_key_id, active.access_key);
    }

    #[tokio::test]
    async fn test_long_duration_clamped_down() {
        let server = idp_responding(200, 1).await;
        let now = Utc::now();
        let sts = service(&server, now);

        sts.assume_role_with_saml(b"Version=2011-06-15&SAMLAssertion=dGVzdA&DurationSeconds=99999")
            .await
            .unwrap();

        let active = sts.store().current().unwrap();
        assert_eq!(active.expiration, now + Duration::seconds(14400));
    }

    #[tokio::test]
    async fn test_default_duration() {
        let server = idp_responding(200, 1).await;
        let now = Utc::now();
        let sts = service(&server, now);

        sts.assume_role_with_saml(b"Version=2011-06-15&SAMLAssertion=dGVzdA")
            .await
            .unwrap();

        let active = sts.store().current().unwrap();
        assert_eq!(active.expiration, now + Duration::seconds(14400));
    }

    #[tokio::test]
    async fn test_version_mismatch_makes_no_outbound_call() {
        let server = idp_responding(200, 0).await;
        let sts = service(&server, Utc::now());

        let err = sts
            .assume_role_with_saml(b"Version=2010-01-01&SAMLAssertion=dGVzdA")
            .await
            .unwrap_err();

        assert!(matches!(err, StsError::VersionMismatch { .. }));
        assert_eq!(err.code(), StsErrorCode::MalformedPolicyDocument);
        assert!(sts.store().current().is_none());
    }

    #[tokio::test]
    async fn test_missing_version() {
        let server = idp_responding(200, 0).await;
        let sts = service(&server, Utc::now());

        let err = sts
            .assume_role_with_saml(b"SAMLAssertion=dGVzdA")
            .await
            .unwrap_err();
        assert_eq!(err.code(), StsErrorCode::MalformedPolicyDocument);
    }

    #[tokio::test]
    async fn test_malformed_inputs_publish_nothing() {
        let server = idp_responding(200, 0).await;
        let sts = service(&server, Utc::now());

        let bodies: [&[u8]; 4] = [
            b"Version=2010-01-01&Version=2011-06-15&SAMLAssertion=dGVzdA",
            b"Version=2011-06-15",
            b"Version=2011-06-15&SAMLAssertion=garbage",
            b"Version=2011-06-15&SAMLAssertion=dGVzdA&DurationSeconds=4h",
        ];

        for body in bodies {
            let err = sts.assume_role_with_saml(body).await.unwrap_err();
            assert_eq!(
                err.code(),
                StsErrorCode::MalformedPolicyDocument,
                "body {:?}",
                String::from_utf8_lossy(body)
            );
        }
        assert!(sts.store().current().is_none());
    }

    #[tokio::test]
    async fn test_repeated_fields_use_first_value() {
        let server = idp_responding(200, 1).await;
        let now = Utc::now();
        let sts = service(&server, now);

        sts.assume_role_with_saml(
            b"Version=2011-06-15&Version=x&SAMLAssertion=dGVzdA&SAMLAssertion=garbage&DurationSeconds=1800&DurationSeconds=4h",
        )
        .await
        .unwrap();

        let active = sts.store().current().unwrap();
        assert_eq!(active.expiration, now + Duration::seconds(1800));
    }

    #[tokio::test]
    async fn test_idp_server_error_rejects_claim() {
        let server = idp_responding(503, 1).await;
        let sts = service(&server, Utc::now());

        let err = sts
            .assume_role_with_saml(b"Version=2011-06-15&SAMLAssertion=dGVzdA")
            .await
            .unwrap_err();

        assert!(matches!(err, StsError::IdpRejectedClaim { status: 503, .. }));
        assert_eq!(err.code(), StsErrorCode::IdpRejectedClaim);
        assert!(sts.store().current().is_none());
    }

    #[tokio::test]
    async fn test_idp_client_error_proceeds() {
        let server = idp_responding(401, 1).await;
        let sts = service(&server, Utc::now());

        let result = sts
            .assume_role_with_saml(b"Version=2011-06-15&SAMLAssertion=dGVzdA")
            .await;
        assert!(result.is_ok());
        assert!(sts.store().current().is_some());
    }

    #[tokio::test]
    async fn test_unreachable_idp_is_malformed() {
        let sts = StsService::new(
            Box::new(StaticParser {
                destination: "http://127.0.0.1:1/saml/acs".to_string(),
            }),
            IdpClient::new(&IdpClientConfig::default()).unwrap(),
            Box::new(KeyMinter),
            Arc::new(CredentialStore::new()),
        );

        let err = sts
            .assume_role_with_saml(b"Version=2011-06-15&SAMLAssertion=dGVzdA")
            .await
            .unwrap_err();

        assert!(matches!(err, StsError::IdpUnreachable { .. }));
        assert_eq!(err.code(), StsErrorCode::MalformedPolicyDocument);
        assert!(sts.store().current().is_none());
    }

    #[tokio::test]
    async fn test_minting_failure_publishes_nothing() {
        let server = idp_responding(200, 1).await;
        let sts = StsService::new(
            Box::new(StaticParser {
                destination: format!("{}/saml/acs", server.uri()),
            }),
            IdpClient::new(&IdpClientConfig::default()).unwrap(),
            Box::new(FailingMinter),
            Arc::new(CredentialStore::new()),
        );

        let err = sts
            .assume_role_with_saml(b"Version=2011-06-15&SAMLAssertion=dGVzdA")
            .await
            .unwrap_err();

        assert!(matches!(err, StsError::CredentialMinting(_)));
        assert_eq!(err.code(), StsErrorCode::MalformedPolicyDocument);
        assert!(sts.store().current().is_none());
    }

    #[tokio::test]
    async fn test_success_publishes_fresh_credential() {
        let server = idp_responding(200, 2).await;
        let sts = service(&server, Utc::now());

        let first = sts
            .assume_role_with_saml(b"Version=2011-06-15&SAMLAssertion=dGVzdA")
            .await
            .unwrap();
        let second = sts
            .assume_role_with_saml(b"Version=2011-06-15&SAMLAssertion=dGVzdA")
            .await
            .unwrap();

        assert_ne!(
            first.credentials.access_key_id,
            second.credentials.access_key_id
        );
        assert_eq!(
            sts.store().access_key().as_deref(),
            Some(second.credentials.access_key_id.as_str())
        );
        assert_eq!(first.issuer, ISSUER);
        assert_eq!(first.name_qualifier, name_qualifier(ISSUER));
        assert_eq!(first.name_qualifier, second.name_qualifier);
    }
}
