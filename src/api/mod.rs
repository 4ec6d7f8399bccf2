//! Azure DevOps REST client.
//!
//! Every operation resolves the account (and project) it targets, asks the
//! [`TokenProvider`] for a PAT and goes through the request dispatcher, which
//! handles the API version header, retries and error mapping.
//!
//! ## Example
//!
//! ```rust,no_run
//! use azdo_remote::api::{AzureDevOpsClient, ClientOptions, StaticTokenProvider};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = Arc::new(StaticTokenProvider::from_string("my-pat".to_string()));
//! let client = AzureDevOpsClient::new(tokens, ClientOptions::default())?;
//!
//! let pr = client
//!     .get_pull_request("https://dev.azure.com/dnceng/internal/_apis/git/repositories/arcade/pullRequests/42")
//!     .await?;
//! println!("{} -> {}", pr.head_branch, pr.base_branch);
//! # Ok(())
//! # }
//! ```

pub(crate) mod client;
pub mod dispatch;
pub mod models;
pub mod token;

pub use client::{
    AzureDevOpsClient, BOT_DISPLAY_NAME, COMMENT_MARKER, ClientOptions,
    MAX_PULL_REQUEST_DESCRIPTION_LENGTH, SERVICE_ACCOUNT_AUTHOR, adjust_artifact_sources,
    merge_status_markdown, normalize_branch_name, truncate_description,
};
pub use dispatch::{ApiRequest, DEFAULT_API_VERSION, DEFAULT_RETRY_COUNT};
pub use token::{AccountTokenProvider, StaticTokenProvider, TokenProvider};
