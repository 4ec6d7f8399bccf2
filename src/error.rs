//! Unified error handling for the azdo-remote library.
//!
//! This module provides the error hierarchy using `thiserror` so callers can
//! match on the failure they care about (a 404 while probing for a branch, a
//! malformed repository URL, a push that was rejected) instead of parsing
//! messages.
//!
//! ## Error Categories
//!
//! - [`UriError`]: Repository or pull request URLs that do not follow an accepted form
//! - [`ApiError`]: Errors from Azure DevOps REST interactions
//! - [`GitError`]: Errors from the git CLI plumbing
//! - [`ConfigError`]: Errors from configuration loading and validation
//!
//! ## Example
//!
//! ```rust,no_run
//! use azdo_remote::error::{AzdoError, ApiError};
//!
//! fn example() -> Result<(), AzdoError> {
//!     Err(ApiError::Unauthorized)?;
//!     Ok(())
//! }
//! ```

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the azdo-remote library.
#[derive(Error, Debug)]
pub enum AzdoError {
    /// A repository or pull request URL could not be parsed.
    #[error("URI error: {0}")]
    Uri(#[from] UriError),

    /// An error occurred while interacting with the Azure DevOps API.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// An error occurred during a git operation.
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    /// An error occurred while loading or validating configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A generic error for cases not covered by specific error types.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AzdoError {
    /// Returns the API error when this is one.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            AzdoError::Api(err) => Some(err),
            _ => None,
        }
    }

    /// True when the underlying API call answered 404.
    pub fn is_not_found(&self) -> bool {
        self.as_api().is_some_and(ApiError::is_not_found)
    }
}

/// Errors raised while parsing Azure DevOps URLs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    /// The repository URL matches neither the modern nor the legacy form.
    #[error(
        "Repository URI should be in the form https://dev.azure.com/:account/:project/_git/:repo or \
         https://:account.visualstudio.com/:project/_git/:repo (got '{uri}')"
    )]
    InvalidRepositoryUri {
        /// The rejected input.
        uri: String,
    },

    /// The pull request URL is not a REST API pull request URL.
    #[error(
        "Pull request URI should be in the form \
         https://dev.azure.com/:account/:project/_apis/git/repositories/:repo/pullRequests/:id (got '{uri}')"
    )]
    InvalidPullRequestUri {
        /// The rejected input.
        uri: String,
    },
}

/// Errors that can occur when interacting with the Azure DevOps API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The API request was unauthorized (401).
    #[error("Unauthorized: invalid or expired Personal Access Token")]
    Unauthorized,

    /// The requested resource was not found (404).
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the resource that was not found.
        resource: String,
    },

    /// The API rate limit was exceeded (429) and retries were exhausted.
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimited {
        /// Number of seconds the server asked us to wait.
        retry_after_seconds: u64,
    },

    /// The API returned an error response.
    #[error("API request failed with status {status}: {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Failed to parse the API response.
    #[error("Failed to parse API response: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
    },

    /// The response parsed but did not have the expected shape.
    #[error("Unexpected API response: {message}")]
    UnexpectedResponse {
        /// What was missing or unexpected.
        message: String,
    },

    /// A network error occurred.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A request URL could not be built.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// No token could be obtained for an account.
    #[error("No token available for account '{account}': {message}")]
    Token {
        /// Account the token was requested for.
        account: String,
        /// Reason reported by the token provider.
        message: String,
    },

    /// A file could not be found under any of the reference kinds.
    #[error("File '{path}' not found in repository '{repository}' at '{reference}'")]
    FileNotFound {
        /// Path of the file inside the repository.
        path: String,
        /// Repository name.
        repository: String,
        /// Branch, commit or tag that was looked up.
        reference: String,
    },

    /// The server refused to complete a pull request.
    #[error("Pull request cannot be merged: {message}")]
    PullRequestNotMergeable {
        /// Message returned by the server.
        message: String,
    },

    /// An argument was rejected before any request was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ApiError {
    /// HTTP status associated with this error, when there is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            ApiError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            ApiError::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            ApiError::RequestFailed { status, .. } => StatusCode::from_u16(*status).ok(),
            ApiError::Network(err) => err.status(),
            _ => None,
        }
    }

    /// True for 404 responses.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

/// Errors that can occur during git operations.
#[derive(Error, Debug, Clone)]
pub enum GitError {
    /// The operation has no meaning on a remote-only repository.
    #[error("Operation not supported on a remote repository: {operation}")]
    NotSupported {
        /// Name of the rejected operation.
        operation: String,
    },

    /// The git executable could not be started.
    #[error("Failed to run {executable}: {message}")]
    SpawnFailed {
        /// Executable that was started.
        executable: String,
        /// Error from the operating system.
        message: String,
    },

    /// A git command execution failed.
    #[error("Git command failed: {command} - {message}")]
    CommandFailed {
        /// The git command that failed, with credentials removed.
        command: String,
        /// Error message from git.
        message: String,
    },

    /// Pushing files to a remote branch failed.
    #[error("Something went wrong when pushing the files to repo {repository} in branch {branch}: {message}")]
    PushFailed {
        /// Repository URL.
        repository: String,
        /// Target branch.
        branch: String,
        /// Underlying failure.
        message: String,
    },

    /// Local file system work around a git command failed.
    #[error("I/O error at {path}: {message}")]
    Io {
        /// Path being written or removed.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// A file's content does not decode with its declared encoding.
    #[error("Invalid content for {path}: {message}")]
    InvalidContent {
        /// Repository path of the file.
        path: String,
        /// Decoding error.
        message: String,
    },
}

/// Errors that can occur during configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required configuration field is missing.
    #[error("{field} is required (use --{field}, {env_var} env var, or config file)")]
    MissingRequired {
        /// Name of the missing field.
        field: String,
        /// Environment variable name for this field.
        env_var: String,
    },

    /// Failed to read the configuration file.
    #[error("Failed to read config file at {path}: {message}")]
    FileReadError {
        /// Path to the config file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to parse the configuration file.
    #[error("Failed to parse config file at {path}: {message}")]
    ParseError {
        /// Path to the config file.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// An invalid value was provided for a configuration field.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Name of the field with invalid value.
        field: String,
        /// Description of why the value is invalid.
        message: String,
    },

    /// The configuration directory could not be determined or created.
    #[error("Failed to prepare config directory at {path}: {message}")]
    DirectoryCreationError {
        /// Path where directory creation failed.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}

/// Type alias for Results using AzdoError.
///
/// Not named `Result` to avoid shadowing `anyhow::Result` in the binary.
pub type AzdoResult<T> = std::result::Result<T, AzdoError>;

#[cfg(test)]
mod tests {
    use super::*;

    /// # API Error Display
    ///
    /// Tests that API errors display correctly formatted messages.
    ///
    /// ## Test Scenario
    /// - Creates various ApiError variants
    /// - Tests their Display implementation
    ///
    /// ## Expected Outcome
    /// - Each error variant produces a clear, informative message
    #[test]
    fn test_api_error_display() {
        let unauthorized = ApiError::Unauthorized;
        assert!(unauthorized.to_string().contains("Unauthorized"));

        let not_found = ApiError::NotFound {
            resource: "_apis/git/repositories/repo".to_string(),
        };
        assert!(not_found.to_string().contains("_apis/git/repositories/repo"));

        let request_failed = ApiError::RequestFailed {
            status: 500,
            message: "Internal Server Error".to_string(),
        };
        assert!(request_failed.to_string().contains("500"));
        assert!(request_failed.to_string().contains("Internal Server Error"));

        let missing_file = ApiError::FileNotFound {
            path: "eng/Versions.props".to_string(),
            repository: "arcade".to_string(),
            reference: "main".to_string(),
        };
        let msg = missing_file.to_string();
        assert!(msg.contains("eng/Versions.props"));
        assert!(msg.contains("arcade"));
        assert!(msg.contains("main"));
    }

    /// # API Error Status Mapping
    ///
    /// Tests that typed API errors report the HTTP status they stand for.
    ///
    /// ## Expected Outcome
    /// - Typed variants map to their canonical status
    /// - RequestFailed keeps the received status
    /// - Non-HTTP failures have no status
    #[test]
    fn test_api_error_status() {
        assert_eq!(
            ApiError::Unauthorized.status(),
            Some(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(
            ApiError::NotFound {
                resource: "x".to_string()
            }
            .status(),
            Some(StatusCode::NOT_FOUND)
        );
        assert_eq!(
            ApiError::RequestFailed {
                status: 400,
                message: String::new()
            }
            .status(),
            Some(StatusCode::BAD_REQUEST)
        );
        assert_eq!(
            ApiError::InvalidArgument("bad".to_string()).status(),
            None
        );
    }

    /// # URI Error Display
    ///
    /// Tests that URI errors name the accepted URL forms.
    ///
    /// ## Expected Outcome
    /// - Repository errors mention both modern and legacy hosts
    /// - Pull request errors mention the REST API path
    #[test]
    fn test_uri_error_display() {
        let repo = UriError::InvalidRepositoryUri {
            uri: "https://github.com/dotnet/arcade".to_string(),
        };
        let msg = repo.to_string();
        assert!(msg.contains("dev.azure.com"));
        assert!(msg.contains("visualstudio.com"));
        assert!(msg.contains("github.com/dotnet/arcade"));

        let pr = UriError::InvalidPullRequestUri {
            uri: "nope".to_string(),
        };
        assert!(pr.to_string().contains("_apis/git/repositories"));
    }

    /// # Error Conversion
    ///
    /// Tests that errors convert correctly through the From trait.
    ///
    /// ## Expected Outcome
    /// - All error types convert seamlessly to AzdoError
    /// - is_not_found only holds for API 404s
    #[test]
    fn test_error_conversion() {
        let err: AzdoError = ApiError::NotFound {
            resource: "r".to_string(),
        }
        .into();
        assert!(matches!(err, AzdoError::Api(_)));
        assert!(err.is_not_found());

        let err: AzdoError = GitError::NotSupported {
            operation: "checkout".to_string(),
        }
        .into();
        assert!(matches!(err, AzdoError::Git(_)));
        assert!(!err.is_not_found());

        let err: AzdoError = UriError::InvalidPullRequestUri {
            uri: String::new(),
        }
        .into();
        assert!(matches!(err, AzdoError::Uri(_)));

        let err: AzdoError = ConfigError::MissingRequired {
            field: "pat".to_string(),
            env_var: "AZDO_PAT".to_string(),
        }
        .into();
        assert!(matches!(err, AzdoError::Config(_)));
    }

    /// # Config Error Display
    ///
    /// ## Expected Outcome
    /// - Missing field errors mention the flag and environment variable
    #[test]
    fn test_config_error_display() {
        let missing = ConfigError::MissingRequired {
            field: "pat".to_string(),
            env_var: "AZDO_PAT".to_string(),
        };
        let msg = missing.to_string();
        assert!(msg.contains("--pat"));
        assert!(msg.contains("AZDO_PAT"));
    }
}
