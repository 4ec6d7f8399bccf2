//! Personal Access Token providers.
//!
//! The client never owns authentication. It asks a [`TokenProvider`] for the
//! PAT of the account a request targets and sends it as HTTP Basic auth with
//! an empty user name.

use crate::error::{ApiError, AzdoResult};
use crate::uri::parse_repo_uri;
use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashMap;

/// Source of Personal Access Tokens for Azure DevOps accounts.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns the token to use for requests against `account`.
    async fn token_for_account(&self, account: &str) -> AzdoResult<SecretString>;

    /// Returns the token to use for a repository, by default the token of the
    /// account the repository lives in.
    async fn token_for_repository(&self, repo_uri: &str) -> AzdoResult<SecretString> {
        let repo = parse_repo_uri(repo_uri)?;
        self.token_for_account(&repo.account).await
    }
}

/// A single PAT used for every account.
///
/// # Example
///
/// ```rust
/// use azdo_remote::api::StaticTokenProvider;
///
/// let provider = StaticTokenProvider::from_string("your-pat-token".to_string());
/// assert!(format!("{provider:?}").contains("[REDACTED]"));
/// ```
#[derive(Clone)]
pub struct StaticTokenProvider {
    pat: SecretString,
}

impl StaticTokenProvider {
    /// Creates a provider from a SecretString.
    pub fn new(pat: SecretString) -> Self {
        Self { pat }
    }

    /// Creates a provider from a plain string.
    ///
    /// The string will be wrapped in a SecretString for secure handling.
    pub fn from_string(pat: String) -> Self {
        Self {
            pat: SecretString::from(pat),
        }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("pat", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token_for_account(&self, _account: &str) -> AzdoResult<SecretString> {
        Ok(self.pat.clone())
    }
}

/// PATs keyed by account name, with an optional fallback.
///
/// Account names are matched case-insensitively, as Azure DevOps does.
#[derive(Clone, Default)]
pub struct AccountTokenProvider {
    tokens: HashMap<String, SecretString>,
    fallback: Option<SecretString>,
}

impl AccountTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the PAT for one account, replacing any previous one.
    pub fn with_account(mut self, account: &str, pat: SecretString) -> Self {
        self.tokens.insert(account.to_lowercase(), pat);
        self
    }

    /// PAT used for accounts without a dedicated token.
    pub fn with_fallback(mut self, pat: SecretString) -> Self {
        self.fallback = Some(pat);
        self
    }

    /// Names of the accounts with a dedicated token, sorted.
    pub fn accounts(&self) -> Vec<&str> {
        let mut accounts: Vec<&str> = self.tokens.keys().map(String::as_str).collect();
        accounts.sort_unstable();
        accounts
    }
}

impl std::fmt::Debug for AccountTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountTokenProvider")
            .field("accounts", &self.accounts())
            .field("fallback", &self.fallback.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[async_trait]
impl TokenProvider for AccountTokenProvider {
    async fn token_for_account(&self, account: &str) -> AzdoResult<SecretString> {
        self.tokens
            .get(&account.to_lowercase())
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| {
                ApiError::Token {
                    account: account.to_string(),
                    message: "no PAT configured for this account and no default PAT".to_string(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AzdoError;
    use secrecy::ExposeSecret;

    /// # Static Provider Redaction
    ///
    /// Tests that the PAT never shows up in Debug output.
    ///
    /// ## Expected Outcome
    /// - Debug output contains `[REDACTED]` and not the token
    #[test]
    fn test_static_provider_debug_redacts() {
        let provider = StaticTokenProvider::from_string("super-secret".to_string());
        let debug = format!("{:?}", provider);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }

    /// # Static Provider Token Retrieval
    ///
    /// ## Expected Outcome
    /// - The same PAT is returned for every account and repository
    #[tokio::test]
    async fn test_static_provider_returns_pat_for_any_account() {
        let provider = StaticTokenProvider::new(SecretString::from("pat".to_string()));

        let a = provider.token_for_account("dnceng").await.unwrap();
        let b = provider
            .token_for_repository("https://dev.azure.com/devdiv/DevDiv/_git/repo")
            .await
            .unwrap();

        assert_eq!(a.expose_secret(), "pat");
        assert_eq!(b.expose_secret(), "pat");
    }

    /// # Account Provider Lookup
    ///
    /// ## Test Scenario
    /// - Two accounts with dedicated tokens, no fallback
    ///
    /// ## Expected Outcome
    /// - Lookups are case-insensitive
    /// - Repository lookups use the account from the URL, legacy hosts included
    /// - Unknown accounts fail with a token error
    #[tokio::test]
    async fn test_account_provider_lookup() {
        let provider = AccountTokenProvider::new()
            .with_account("dnceng", SecretString::from("dnceng-pat".to_string()))
            .with_account("DevDiv", SecretString::from("devdiv-pat".to_string()));

        assert_eq!(
            provider
                .token_for_account("DNCENG")
                .await
                .unwrap()
                .expose_secret(),
            "dnceng-pat"
        );
        assert_eq!(
            provider
                .token_for_repository("https://devdiv.visualstudio.com/DevDiv/_git/repo")
                .await
                .unwrap()
                .expose_secret(),
            "devdiv-pat"
        );

        let err = provider.token_for_account("unknown").await.unwrap_err();
        assert!(matches!(err, AzdoError::Api(ApiError::Token { .. })));
    }

    /// # Account Provider Fallback
    #[tokio::test]
    async fn test_account_provider_fallback() {
        let provider = AccountTokenProvider::new()
            .with_account("dnceng", SecretString::from("dnceng-pat".to_string()))
            .with_fallback(SecretString::from("default".to_string()));

        let token = provider.token_for_account("other").await.unwrap();
        assert_eq!(token.expose_secret(), "default");

        let debug = format!("{:?}", provider);
        assert!(debug.contains("dnceng"));
        assert!(!debug.contains("dnceng-pat"));
        assert!(!debug.contains("default\""));
    }

    /// # Repository Lookup with Invalid URL
    #[tokio::test]
    async fn test_token_for_invalid_repository() {
        let provider = StaticTokenProvider::from_string("pat".to_string());
        let err = provider
            .token_for_repository("https://github.com/dotnet/arcade")
            .await
            .unwrap_err();
        assert!(matches!(err, AzdoError::Uri(_)));
    }
}
