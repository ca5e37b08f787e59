//! `AssumeRoleWithSAML` request parsing and validation.

use chrono::Duration;

use super::error::StsError;

/// Supported STS API version.
pub const STS_API_VERSION: &str = "2011-06-15";

/// Shortest session that can be requested (15 minutes).
pub const MIN_DURATION_SECS: i64 = 900;

/// Longest session that can be requested, also the default (4 hours).
pub const MAX_DURATION_SECS: i64 = 14400;

/// Form fields of an `AssumeRoleWithSAML` request.
#[derive(Debug, Default)]
pub struct AssumeRoleWithSamlForm {
    pub version: Option<String>,
    pub saml_assertion: Option<String>,
    pub duration_seconds: Option<String>,
}

/// Parse a form-urlencoded request body.
///
/// When a field is repeated the first value wins; other fields are ignored.
pub fn parse_form(body: &[u8]) -> Result<AssumeRoleWithSamlForm, StsError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| StsError::MalformedRequest(e.to_string()))?;

    let mut form = AssumeRoleWithSamlForm::default();
    for (key, value) in pairs {
        let slot = match key.as_str() {
            "Version" => &mut form.version,
            "SAMLAssertion" => &mut form.saml_assertion,
            "DurationSeconds" => &mut form.duration_seconds,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }
    Ok(form)
}

/// Require `Version` to equal [`STS_API_VERSION`].
pub fn check_version(form: &AssumeRoleWithSamlForm) -> Result<(), StsError> {
    match form.version.as_deref() {
        Some(STS_API_VERSION) => Ok(()),
        other => Err(StsError::VersionMismatch {
            expected: STS_API_VERSION,
            actual: other.map(String::from),
        }),
    }
}

/// Resolve `DurationSeconds` into a session length.
///
/// Absent or empty values default to four hours. Parsed values are clamped to
/// `[MIN_DURATION_SECS, MAX_DURATION_SECS]`.
pub fn resolve_duration(raw: Option<&str>) -> Result<Duration, StsError> {
    let secs = match raw {
        None | Some("") => MAX_DURATION_SECS,
        Some(value) => value
            .parse::<i64>()
            .map_err(|source| StsError::InvalidDuration {
                value: value.to_string(),
                source,
            })?
            .clamp(MIN_DURATION_SECS, MAX_DURATION_SECS),
    };
    Ok(Duration::seconds(secs))
}
