//! Request dispatcher shared by every client operation.
//!
//! A request is described by an [`ApiRequest`]; [`AzureDevOpsClient::execute_api_request`]
//! computes the base address, attaches the `Accept` header with the API
//! version and the Basic auth PAT, retries transient failures and returns the
//! parsed JSON body.

use super::client::AzureDevOpsClient;
use crate::error::{ApiError, AzdoResult};
use reqwest::header::{ACCEPT, HeaderMap};
use reqwest::{Method, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_API_VERSION: &str = "5.0";
pub const DEFAULT_RETRY_COUNT: u32 = 15;

/// One REST call against an Azure DevOps service.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub account: String,
    /// Omitted from the base address when empty.
    pub project: Option<String>,
    /// Path relative to the base address, query string included.
    pub path: String,
    pub body: Option<Value>,
    /// Overrides the client's default API version.
    pub version: Option<String>,
    /// Service subdomain such as `vsrm`, `feeds` or `pkgs`.
    pub subdomain: Option<String>,
    /// Failures are logged at debug level only when false.
    pub log_failure: bool,
    /// Overrides the client's retry count.
    pub retry_count: Option<u32>,
}

impl ApiRequest {
    pub fn new(method: Method, account: &str, project: Option<&str>, path: impl Into<String>) -> Self {
        Self {
            method,
            account: account.to_string(),
            project: project.filter(|p| !p.is_empty()).map(str::to_string),
            path: path.into(),
            body: None,
            version: None,
            subdomain: None,
            log_failure: true,
            retry_count: None,
        }
    }

    pub fn get(account: &str, project: Option<&str>, path: impl Into<String>) -> Self {
        Self::new(Method::GET, account, project, path)
    }

    pub fn post(account: &str, project: Option<&str>, path: impl Into<String>) -> Self {
        Self::new(Method::POST, account, project, path)
    }

    pub fn put(account: &str, project: Option<&str>, path: impl Into<String>) -> Self {
        Self::new(Method::PUT, account, project, path)
    }

    pub fn patch(account: &str, project: Option<&str>, path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, account, project, path)
    }

    pub fn delete(account: &str, project: Option<&str>, path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, account, project, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn subdomain(mut self, subdomain: &str) -> Self {
        self.subdomain = Some(subdomain.to_string());
        self
    }

    /// Do not log failures at warn level. Used for lookups where a 404 is expected.
    pub fn quiet(mut self) -> Self {
        self.log_failure = false;
        self
    }

    pub fn retries(mut self, retry_count: u32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }
}

/// Appends `suffix` after trimming any trailing occurrences of it.
pub fn ensure_ends_with(input: &str, suffix: char) -> String {
    format!("{}{}", input.trim_end_matches(suffix), suffix)
}

/// Base address of a request.
///
/// With no endpoint override this is
/// `https://{subdomain.}dev.azure.com/{account}/[{project}/]`. An endpoint
/// override replaces the scheme and host part and ignores the subdomain.
pub fn base_address(
    endpoint: Option<&str>,
    subdomain: Option<&str>,
    account: &str,
    project: Option<&str>,
) -> String {
    let root = match endpoint {
        Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
        None => {
            let subdomain = subdomain
                .filter(|s| !s.is_empty())
                .map(|s| ensure_ends_with(s, '.'))
                .unwrap_or_default();
            format!("https://{subdomain}dev.azure.com")
        }
    };

    let mut address = format!("{root}/{account}/");
    if let Some(project) = project.filter(|p| !p.is_empty()) {
        address.push_str(project);
        address.push('/');
    }
    address
}

impl AzureDevOpsClient {
    /// Execute a request and return the JSON body.
    ///
    /// `204 No Content` and empty bodies yield `{}`.
    pub async fn execute_api_request(&self, request: ApiRequest) -> AzdoResult<Value> {
        let options = self.options();
        let max_retries = if options.allow_retries {
            request.retry_count.unwrap_or(options.retry_count)
        } else {
            0
        };

        let base = base_address(
            options.endpoint.as_deref(),
            request.subdomain.as_deref(),
            &request.account,
            request.project.as_deref(),
        );
        let url = Url::parse(&format!("{base}{}", request.path.trim_start_matches('/')))
            .map_err(ApiError::from)?;
        let version = request
            .version
            .as_deref()
            .unwrap_or(options.api_version.as_str());
        let accept = format!("application/json;api-version={version}");
        let token = self.token_provider().token_for_account(&request.account).await?;

        let mut attempt: u32 = 0;
        loop {
            let mut builder = self
                .http()
                .request(request.method.clone(), url.clone())
                .header(ACCEPT, accept.as_str())
                .basic_auth("", Some(token.expose_secret()));
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            debug!(method = %request.method, url = %url, attempt, "Sending Azure DevOps request");

            let response = match builder.send().await {
                Ok(response) => response,
                Err(err) => {
                    if attempt < max_retries {
                        let delay = self.backoff_delay(attempt, None);
                        debug!(url = %url, attempt, error = %err, ?delay, "Request failed, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    if request.log_failure {
                        warn!(method = %request.method, url = %url, error = %err, "Azure DevOps request failed");
                    }
                    return Err(ApiError::Network(err).into());
                }
            };

            let status = response.status();
            if status.is_success() {
                return read_json(response).await;
            }

            let retry_after = retry_after_seconds(response.headers());
            if is_retryable(status) && attempt < max_retries {
                let delay = self.backoff_delay(attempt, retry_after);
                let _ = response.bytes().await;
                debug!(url = %url, %status, attempt, ?delay, "Transient failure, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            let err = error_for_status(status, &text, url.path(), retry_after);
            if request.log_failure {
                warn!(method = %request.method, url = %url, %status, "Azure DevOps request failed: {err}");
            } else {
                debug!(method = %request.method, url = %url, %status, "Azure DevOps request failed: {err}");
            }
            return Err(err.into());
        }
    }

    /// Execute a request and deserialize the body.
    pub async fn execute_api_request_as<T: DeserializeOwned>(&self, request: ApiRequest) -> AzdoResult<T> {
        let value = self.execute_api_request(request).await?;
        from_value(value)
    }

    /// Delay before retry `attempt`, never above `max_retry_delay`.
    fn backoff_delay(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        let options = self.options();
        if let Some(seconds) = retry_after {
            return Duration::from_secs(seconds).min(options.max_retry_delay);
        }
        let factor = 2u32.saturating_pow(attempt.min(16));
        options
            .retry_delay
            .saturating_mul(factor)
            .min(options.max_retry_delay)
    }
}

async fn read_json(response: Response) -> AzdoResult<Value> {
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(json!({}));
    }
    let text = response.text().await.map_err(ApiError::Network)?;
    if text.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(&text).map_err(|e| {
        ApiError::ParseError {
            message: e.to_string(),
        }
        .into()
    })
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_after_seconds(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Maps a non-success response to a typed error.
pub(crate) fn error_for_status(
    status: StatusCode,
    body: &str,
    resource: &str,
    retry_after: Option<u64>,
) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::NOT_FOUND => ApiError::NotFound {
            resource: resource.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited {
            retry_after_seconds: retry_after.unwrap_or(0),
        },
        _ => ApiError::RequestFailed {
            status: status.as_u16(),
            message: server_message(body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string()),
        },
    }
}

/// The `message` field of an Azure DevOps error payload, or the raw body.
fn server_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value) => value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(body.to_string())),
        Err(_) => Some(body.to_string()),
    }
}

pub(crate) fn from_value<T: DeserializeOwned>(value: Value) -> AzdoResult<T> {
    serde_json::from_value(value).map_err(|e| {
        ApiError::ParseError {
            message: e.to_string(),
        }
        .into()
    })
}

/// Deserializes the `value` array of a list response.
pub(crate) fn value_list<T: DeserializeOwned>(mut content: Value) -> AzdoResult<Vec<T>> {
    match content.get_mut("value").map(Value::take) {
        Some(values) => from_value(values),
        None => Err(ApiError::UnexpectedResponse {
            message: "list response without a 'value' field".to_string(),
        }
        .into()),
    }
}

/// Reads a string field, failing when it is missing.
pub(crate) fn required_str<'a>(content: &'a Value, field: &str) -> AzdoResult<&'a str> {
    content.get(field).and_then(Value::as_str).ok_or_else(|| {
        ApiError::UnexpectedResponse {
            message: format!("missing '{field}' field"),
        }
        .into()
    })
}

/// Reads an integer field, failing when it is missing.
pub(crate) fn required_i64(content: &Value, field: &str) -> AzdoResult<i64> {
    content.get(field).and_then(Value::as_i64).ok_or_else(|| {
        ApiError::UnexpectedResponse {
            message: format!("missing '{field}' field"),
        }
        .into()
    })
}
