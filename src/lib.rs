//! # azdo-remote
//!
//! A client library for the Azure DevOps REST API used by dependency-flow
//! automation. It provides:
//!
//! - Repository URL parsing and normalization
//! - Branch, commit, tree and file operations
//! - Pull request creation, merging, checks, reviews and bot comments
//! - Build queuing and artifacts, release pipelines and package feeds
//! - Pushing file changes through a local `git` clone
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use azdo_remote::{AzureDevOpsClient, ClientOptions, StaticTokenProvider};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AzureDevOpsClient::new(
//!     Arc::new(StaticTokenProvider::from_string("my-pat".to_string())),
//!     ClientOptions::default(),
//! )?;
//!
//! let repo = "https://dev.azure.com/dnceng/internal/_git/dotnet-arcade";
//! if client.does_branch_exist(repo, "main").await? {
//!     let sha = client.get_last_commit_sha(repo, "main").await?;
//!     println!("main is at {sha:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod logging;
pub mod uri;

pub use api::{AccountTokenProvider, AzureDevOpsClient, ClientOptions, StaticTokenProvider, TokenProvider};
pub use config::Config;
pub use error::{AzdoError, AzdoResult};
pub use uri::{PullRequestCoordinates, RepoCoordinates, normalize_url, parse_pull_request_uri, parse_repo_uri};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
