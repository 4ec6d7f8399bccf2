//! Parsing of Azure DevOps repository and pull request URLs.
//!
//! Two repository forms are accepted:
//!
//! - `https://dev.azure.com/{account}/{project}/_git/{repo}`
//! - `https://{account}.visualstudio.com/{project}/_git/{repo}` (legacy host)
//!
//! Pull requests are only accepted in their REST API form:
//! `https://dev.azure.com/{account}/{project}/_apis/git/repositories/{repo}/pullRequests/{id}`.

use crate::error::UriError;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

static REPOSITORY_REGEX: OnceLock<Regex> = OnceLock::new();
static LEGACY_REPOSITORY_REGEX: OnceLock<Regex> = OnceLock::new();
static PULL_REQUEST_API_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_repository_regex() -> &'static Regex {
    REPOSITORY_REGEX.get_or_init(|| {
        Regex::new(
            r"^https://dev\.azure\.com/(?<account>[a-zA-Z0-9]+)/(?<project>[a-zA-Z0-9-]+)/_git/(?<repo>[a-zA-Z0-9-\.]+)",
        )
        .expect("Failed to compile repository regex")
    })
}

fn get_legacy_repository_regex() -> &'static Regex {
    LEGACY_REPOSITORY_REGEX.get_or_init(|| {
        Regex::new(
            r"^https://(?<account>[a-zA-Z0-9]+)\.visualstudio\.com/(?<project>[a-zA-Z0-9-]+)/_git/(?<repo>[a-zA-Z0-9-\.]+)",
        )
        .expect("Failed to compile legacy repository regex")
    })
}

fn get_pull_request_api_regex() -> &'static Regex {
    PULL_REQUEST_API_REGEX.get_or_init(|| {
        Regex::new(
            r"^https://dev\.azure\.com/(?<account>[a-zA-Z0-9]+)/(?<project>[a-zA-Z0-9-]+)/_apis/git/repositories/(?<repo>[a-zA-Z0-9-\.]+)/pullRequests/(?<id>\d+)",
        )
        .expect("Failed to compile pull request API regex")
    })
}

/// Account, project and repository name of an Azure DevOps repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoCoordinates {
    pub account: String,
    pub project: String,
    pub repo: String,
}

/// Repository coordinates plus the numeric id of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PullRequestCoordinates {
    pub account: String,
    pub project: String,
    pub repo: String,
    pub id: i32,
}

impl PullRequestCoordinates {
    /// Coordinates of the repository the pull request belongs to.
    pub fn repository(&self) -> RepoCoordinates {
        RepoCoordinates {
            account: self.account.clone(),
            project: self.project.clone(),
            repo: self.repo.clone(),
        }
    }
}

/// Parse a repository URL into its account, project and repository name.
///
/// The URL is normalized first, so user info and the legacy
/// `{account}.visualstudio.com` host are both accepted.
///
/// # Examples
///
/// ```
/// use azdo_remote::uri::parse_repo_uri;
///
/// let repo = parse_repo_uri("https://dnceng.visualstudio.com/internal/_git/dotnet-arcade").unwrap();
/// assert_eq!(repo.account, "dnceng");
/// assert_eq!(repo.project, "internal");
/// assert_eq!(repo.repo, "dotnet-arcade");
/// ```
pub fn parse_repo_uri(repo_uri: &str) -> Result<RepoCoordinates, UriError> {
    let normalized = normalize_url(repo_uri);

    let captures = get_repository_regex()
        .captures(&normalized)
        .or_else(|| get_legacy_repository_regex().captures(&normalized))
        .ok_or_else(|| UriError::InvalidRepositoryUri {
            uri: repo_uri.to_string(),
        })?;

    Ok(RepoCoordinates {
        account: captures["account"].to_string(),
        project: captures["project"].to_string(),
        repo: captures["repo"].to_string(),
    })
}

/// Parse a pull request REST API URL.
///
/// No normalization is applied: pull request URLs are always produced by the
/// API itself and use the `dev.azure.com` host.
pub fn parse_pull_request_uri(pr_uri: &str) -> Result<PullRequestCoordinates, UriError> {
    let invalid = || UriError::InvalidPullRequestUri {
        uri: pr_uri.to_string(),
    };

    let captures = get_pull_request_api_regex()
        .captures(pr_uri)
        .ok_or_else(invalid)?;
    let id = captures["id"].parse::<i32>().map_err(|_| invalid())?;

    Ok(PullRequestCoordinates {
        account: captures["account"].to_string(),
        project: captures["project"].to_string(),
        repo: captures["repo"].to_string(),
        id,
    })
}

/// Normalize an Azure DevOps repository URL.
///
/// - `https://dnceng@dev.azure.com/dnceng/internal/_git/repo` loses the user info
/// - `https://dnceng.visualstudio.com/internal/_git/repo` becomes
///   `https://dev.azure.com/dnceng/internal/_git/repo`
///
/// Anything that is not an absolute URL, or does not use the legacy host, is
/// returned unchanged.
pub fn normalize_url(repo_uri: &str) -> String {
    let Ok(parsed) = Url::parse(repo_uri) else {
        return repo_uri.to_string();
    };

    let mut normalized = repo_uri.to_string();

    let user_info = match (parsed.username(), parsed.password()) {
        ("", None) => None,
        (user, None) => Some(user.to_string()),
        (user, Some(password)) => Some(format!("{user}:{password}")),
    };
    if let Some(user_info) = user_info {
        normalized = normalized.replacen(&format!("{user_info}@"), "", 1);
    }

    if let Some(captures) = get_legacy_repository_regex().captures(&normalized) {
        let host = format!("{}.visualstudio.com", &captures["account"]);
        let replacement = format!("dev.azure.com/{}", &captures["account"]);
        normalized = normalized.replacen(&host, &replacement, 1);
    }

    normalized
}
