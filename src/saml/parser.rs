//! SAML response parser.

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::debug;

/// Largest base64 SAML response accepted before decoding (512 KB).
pub const MAX_ENCODED_RESPONSE_SIZE: usize = 512 * 1024;

/// Fields extracted from a SAML response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamlAssertion {
    /// `Destination` attribute of the response (the IdP endpoint to confirm with).
    pub destination: String,
    /// Issuer URL.
    pub issuer: String,
    /// The base64 payload exactly as the client sent it.
    pub original: String,
    /// NameID value of the assertion subject, if present.
    pub name_id: Option<String>,
    /// NameID format, if present.
    pub name_id_format: Option<String>,
}

/// Turns a raw `SAMLAssertion` form value into a [`SamlAssertion`].
pub trait AssertionParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<SamlAssertion>;
}

/// Parser backed by `samael`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SamlResponseParser;

impl AssertionParser for SamlResponseParser {
    fn parse(&self, raw: &str) -> Result<SamlAssertion> {
        if raw.trim().is_empty() {
            return Err(anyhow!("SAML assertion is empty"));
        }
        if raw.len() > MAX_ENCODED_RESPONSE_SIZE {
            return Err(anyhow!(
                "SAML assertion exceeds maximum size ({} > {} bytes)",
                raw.len(),
                MAX_ENCODED_RESPONSE_SIZE
            ));
        }

        // IdPs commonly wrap base64 at 76 columns.
        let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();

        let response_xml = BASE64
            .decode(compact.as_bytes())
            .context("Failed to decode SAML response")?;
        let response_str =
            String::from_utf8(response_xml).context("SAML response is not valid UTF-8")?;

        let response: samael::schema::Response = response_str
            .parse()
            .context("Failed to parse SAML response")?;

        let destination = response
            .destination
            .clone()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| anyhow!("SAML response missing Destination"))?;

        let issuer = response
            .issuer
            .as_ref()
            .and_then(|i| i.value.clone())
            .or_else(|| {
                response
                    .assertion
                    .as_ref()
                    .and_then(|a| a.issuer.value.clone())
            })
            .filter(|i| !i.is_empty())
            .ok_or_else(|| anyhow!("SAML response missing Issuer"))?;

        let name_id = response
            .assertion
            .as_ref()
            .and_then(|a| a.subject.as_ref())
            .and_then(|s| s.name_id.as_ref());

        debug!(
            destination = %destination,
            issuer = %issuer,
            "Parsed SAML response"
        );

        Ok(SamlAssertion {
            destination,
            issuer,
            original: raw.to_string(),
            name_id: name_id.map(|n| n.value.clone()),
            name_id_format: name_id.and_then(|n| n.format.clone()),
        })
    }
}
