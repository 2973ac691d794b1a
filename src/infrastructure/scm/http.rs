//! reqwest plumbing shared by the REST-based providers.

use super::scm_interface::ScmError;
use crate::domain::value_objects::scm_type::ScmType;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("enrollsync/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ScmError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ScmError::invalid_request(format!("failed to build HTTP client: {}", e)))
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ScmError> {
    let url = Url::parse(raw)
        .map_err(|e| ScmError::invalid_request(format!("invalid base URL '{}': {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(ScmError::invalid_request(format!(
            "base URL cannot be a base: {}",
            raw
        )));
    }
    Ok(url)
}

/// Append path segments to `base`, percent-encoding each one (including '/')
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ScmError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ScmError::invalid_request(format!("base URL cannot be a base: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Classify a failure that happened before a response was received
pub(crate) fn transport_error(err: reqwest::Error) -> ScmError {
    if err.is_decode() {
        ScmError::invalid_response(err.to_string())
    } else {
        ScmError::transient(err.to_string())
    }
}

/// Pass successful responses through; translate everything else
pub(crate) async fn check_status(
    scm_type: ScmType,
    resource: &str,
    resp: Response,
) -> Result<Response, ScmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let rate_limited = resp
        .headers()
        .get("x-ratelimit-remaining")
        .map_or(false, |v| v.as_bytes() == b"0");
    let body = resp.text().await.unwrap_or_default();
    Err(classify(scm_type, resource, status, rate_limited, body))
}

/// GitHub validation failure body
#[derive(Debug, Default, Deserialize)]
struct ValidationFailure {
    #[serde(default)]
    errors: Vec<ValidationDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct ValidationDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Whether a 422 body reports a duplicate
///
/// Teams come back as `"code": "already_exists"`, repositories as a custom
/// error whose message reads "name already exists on this account".
fn is_duplicate(body: &str) -> bool {
    match serde_json::from_str::<ValidationFailure>(body) {
        Ok(failure) if !failure.errors.is_empty() => failure.errors.iter().any(|e| {
            e.code.as_deref() == Some("already_exists")
                || e.message.as_deref().map_or(false, |m| m.contains("already exists"))
        }),
        _ => body.contains("already exists") || body.contains("already_exists"),
    }
}

pub(crate) fn classify(
    scm_type: ScmType,
    resource: &str,
    status: StatusCode,
    rate_limited: bool,
    body: String,
) -> ScmError {
    match status {
        StatusCode::NOT_FOUND => ScmError::not_found(resource),
        StatusCode::CONFLICT => ScmError::conflict(resource, body),
        StatusCode::UNPROCESSABLE_ENTITY if is_duplicate(&body) => {
            ScmError::conflict(resource, body)
        }
        StatusCode::TOO_MANY_REQUESTS => ScmError::transient(format!("rate limited: {}", body)),
        StatusCode::FORBIDDEN if rate_limited => {
            ScmError::transient(format!("rate limit exhausted: {}", body))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ScmError::unauthorized(scm_type, body),
        s if s.is_server_error() => ScmError::transient(format!("{}: {}", s, body)),
        s => ScmError::provider(s.as_u16(), body),
    }
}

pub(crate) async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ScmError> {
    resp.json::<T>()
        .await
        .map_err(|e| ScmError::invalid_response(e.to_string()))
}
