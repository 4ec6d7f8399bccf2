//! The Azure DevOps client.
//!
//! Operations are grouped by service area in the submodules; all of them go
//! through [`AzureDevOpsClient::execute_api_request`].

mod builds;
mod feeds;
mod pull_requests;
mod releases;
mod repos;

pub use pull_requests::{
    COMMENT_MARKER, MAX_PULL_REQUEST_DESCRIPTION_LENGTH, merge_status_markdown, truncate_description,
};
pub use releases::adjust_artifact_sources;
pub use repos::normalize_branch_name;

use super::token::TokenProvider;
use crate::error::{ApiError, AzdoResult};
use crate::git::{GitCli, ProcessRunner};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Tree sha cache keyed by (repository URL, reference, path).
type TreeCache = HashMap<(String, String, String), String>;

/// Display name reported for commits authored by the service account.
pub const BOT_DISPLAY_NAME: &str = "dotnet-maestro[bot]";

/// Author name of commits pushed by the service account.
pub const SERVICE_ACCOUNT_AUTHOR: &str = "DotNet-Bot";

/// Tunables of an [`AzureDevOpsClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Root replacing `https://{subdomain.}dev.azure.com`, for proxies and tests.
    pub endpoint: Option<String>,
    /// API version sent when a request does not override it.
    pub api_version: String,
    pub allow_retries: bool,
    pub retry_count: u32,
    /// Base delay of the exponential backoff.
    pub retry_delay: Duration,
    pub max_retry_delay: Duration,
    pub timeout: Duration,
    pub git_executable: String,
    /// Parent directory of temporary clones; the system temp dir when unset.
    pub temporary_repository_path: Option<PathBuf>,
    pub author_name: String,
    pub author_email: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_version: super::dispatch::DEFAULT_API_VERSION.to_string(),
            allow_retries: true,
            retry_count: super::dispatch::DEFAULT_RETRY_COUNT,
            retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(30),
            timeout: Duration::from_secs(100),
            git_executable: "git".to_string(),
            temporary_repository_path: None,
            author_name: SERVICE_ACCOUNT_AUTHOR.to_string(),
            author_email: "dn-bot@microsoft.com".to_string(),
        }
    }
}

/// Client for repositories, pull requests, builds, releases and feeds.
///
/// Cloning is cheap: the HTTP connection pool, token provider, process runner
/// and tree cache are shared.
///
/// # Example
///
/// ```rust,no_run
/// use azdo_remote::api::{AzureDevOpsClient, ClientOptions, StaticTokenProvider};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let tokens = Arc::new(StaticTokenProvider::from_string("my-pat".to_string()));
/// let client = AzureDevOpsClient::new(tokens, ClientOptions::default())?;
///
/// let exists = client
///     .does_branch_exist("https://dev.azure.com/dnceng/internal/_git/arcade", "main")
///     .await?;
/// println!("main exists: {exists}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AzureDevOpsClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    git: Arc<dyn ProcessRunner>,
    options: ClientOptions,
    tree_cache: Arc<Mutex<TreeCache>>,
}

impl AzureDevOpsClient {
    pub fn new(tokens: Arc<dyn TokenProvider>, options: ClientOptions) -> AzdoResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(ApiError::Network)?;
        let git: Arc<dyn ProcessRunner> = Arc::new(GitCli::new(&options.git_executable));

        Ok(Self {
            http,
            tokens,
            git,
            options,
            tree_cache: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Replaces the runner used for git commands.
    pub fn with_process_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.git = runner;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn allow_retries(&self) -> bool {
        self.options.allow_retries
    }

    pub fn set_allow_retries(&mut self, allow: bool) {
        self.options.allow_retries = allow;
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn token_provider(&self) -> &dyn TokenProvider {
        self.tokens.as_ref()
    }

    pub(crate) fn process_runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.git)
    }

    pub(crate) fn cached_tree_sha(&self, key: &(String, String, String)) -> Option<String> {
        self.tree_cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(key).cloned())
    }

    pub(crate) fn cache_tree_sha(&self, key: (String, String, String), sha: String) {
        if let Ok(mut cache) = self.tree_cache.lock() {
            cache.insert(key, sha);
        }
    }
}

impl std::fmt::Debug for AzureDevOpsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureDevOpsClient")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::token::StaticTokenProvider;

    /// # Default Options
    #[test]
    fn test_default_options() {
        let options = ClientOptions::default();
        assert_eq!(options.api_version, "5.0");
        assert!(options.allow_retries);
        assert_eq!(options.retry_count, 15);
        assert!(options.endpoint.is_none());
        assert_eq!(options.git_executable, "git");
    }

    /// # Client Creation
    ///
    /// ## Expected Outcome
    /// - Retries can be toggled after creation
    /// - Debug output does not expose the token provider
    #[test]
    fn test_client_creation() {
        let tokens = Arc::new(StaticTokenProvider::from_string("secret".to_string()));
        let mut client = AzureDevOpsClient::new(tokens, ClientOptions::default()).unwrap();
        assert!(client.allow_retries());
        client.set_allow_retries(false);
        assert!(!client.allow_retries());
        assert!(!format!("{client:?}").contains("secret"));
    }

    /// # Tree Cache Shared Between Clones
    #[test]
    fn test_tree_cache_shared() {
        let tokens = Arc::new(StaticTokenProvider::from_string("pat".to_string()));
        let client = AzureDevOpsClient::new(tokens, ClientOptions::default()).unwrap();
        let clone = client.clone();
        let key = ("repo".to_string(), "main".to_string(), "/src".to_string());
        client.cache_tree_sha(key.clone(), "abc".to_string());
        assert_eq!(clone.cached_tree_sha(&key).as_deref(), Some("abc"));
    }
}
