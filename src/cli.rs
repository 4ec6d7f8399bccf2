//! Command line interface of the `azdo-remote` binary.

use crate::api::AzureDevOpsClient;
use crate::config::Config;
use crate::uri::{normalize_url, parse_pull_request_uri, parse_repo_uri};
use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

/// Connection and logging flags shared by every subcommand.
#[derive(ClapArgs, Clone, Debug, Default)]
pub struct GlobalArgs {
    /// Personal Access Token (prefer AZDO_PAT)
    #[arg(short = 't', long, global = true, help_heading = "Azure DevOps Connection")]
    pub pat: Option<String>,

    /// Root URL replacing https://dev.azure.com, e.g. a proxy
    #[arg(long, global = true, help_heading = "Azure DevOps Connection")]
    pub endpoint: Option<String>,

    /// API version sent when an operation does not pin one
    #[arg(long, global = true, help_heading = "Azure DevOps Connection")]
    pub api_version: Option<String>,

    /// Fail on the first transient error instead of retrying
    #[arg(long, global = true, help_heading = "Retries")]
    pub no_retries: bool,

    #[arg(long, global = true, help_heading = "Retries")]
    pub retry_count: Option<u32>,

    /// Request timeout in seconds
    #[arg(long = "timeout", global = true, help_heading = "Retries")]
    pub timeout_secs: Option<u64>,

    #[arg(long, global = true, help_heading = "Git")]
    pub git_executable: Option<String>,

    /// Parent directory of temporary clones
    #[arg(long, global = true, help_heading = "Git")]
    pub temp_repo_path: Option<PathBuf>,

    /// trace, debug, info, warn or error; logging is off when unset
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_level: Option<String>,

    /// Log to a file instead of stderr
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_file: Option<PathBuf>,

    /// text or json
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_format: Option<String>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Split a repository URL into account, project and repository
    ParseRepo { uri: String },

    /// Split a pull request API URL into account, project, repository and id
    ParsePr { url: String },

    /// Rewrite legacy visualstudio.com URLs and drop credentials
    Normalize { url: String },

    /// Create a sample config file
    InitConfig,

    /// Check whether a branch exists
    BranchExists { repo: String, branch: String },

    /// Print the sha of the latest commit of a branch
    LastCommit { repo: String, branch: String },

    /// Print a file at a branch, commit or tag
    File {
        repo: String,
        path: String,
        #[arg(long = "ref", default_value = "main")]
        reference: String,
    },

    /// Show a pull request
    Pr { url: String },

    /// Show the policy checks of a pull request
    PrChecks { url: String },

    /// Show a build
    Build {
        account: String,
        project: String,
        id: i64,
    },

    /// List the feeds of an account
    Feeds {
        account: String,
        /// Also list the packages of every feed
        #[arg(long)]
        with_packages: bool,
    },

    /// Show a release
    Release {
        account: String,
        project: String,
        id: i64,
    },
}

impl Commands {
    /// Whether the command talks to Azure DevOps.
    pub fn needs_client(&self) -> bool {
        !matches!(
            self,
            Commands::ParseRepo { .. }
                | Commands::ParsePr { .. }
                | Commands::Normalize { .. }
                | Commands::InitConfig
        )
    }
}

#[derive(Parser, Clone, Debug)]
#[command(
    author,
    version,
    about = "Work with Azure DevOps repositories, pull requests, builds, releases and feeds",
    long_about = "Work with Azure DevOps repositories, pull requests, builds, releases and feeds.\n\n\
        Configuration can be provided via CLI arguments, environment variables (AZDO_*),\n\
        or a config file (~/.config/azdo-remote/config.toml).",
    after_help = "EXAMPLES:\n    \
        azdo-remote parse-repo https://dnceng.visualstudio.com/internal/_git/arcade\n    \
        azdo-remote branch-exists https://dev.azure.com/dnceng/internal/_git/arcade main\n    \
        azdo-remote file https://dev.azure.com/dnceng/internal/_git/arcade global.json --ref main"
)]
pub struct Args {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

fn print_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("Failed to serialize output")?;
    writeln!(out)?;
    Ok(())
}

/// Commands that need neither configuration nor network.
pub fn run_offline(command: &Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::ParseRepo { uri } => {
            let repo = parse_repo_uri(uri)?;
            print_json(
                out,
                &json!({"account": repo.account, "project": repo.project, "repo": repo.repo}),
            )
        }
        Commands::ParsePr { url } => {
            let pr = parse_pull_request_uri(url)?;
            print_json(
                out,
                &json!({"account": pr.account, "project": pr.project, "repo": pr.repo, "id": pr.id}),
            )
        }
        Commands::Normalize { url } => {
            writeln!(out, "{}", normalize_url(url))?;
            Ok(())
        }
        Commands::InitConfig => {
            let path = Config::create_sample_config()?;
            writeln!(out, "Config file: {}", path.display())?;
            Ok(())
        }
        _ => anyhow::bail!("command requires an Azure DevOps client"),
    }
}

/// Commands that call Azure DevOps.
pub async fn run_online(client: &AzureDevOpsClient, command: &Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::BranchExists { repo, branch } => {
            let exists = client.does_branch_exist(repo, branch).await?;
            print_json(out, &json!({ "branch": branch, "exists": exists }))
        }
        Commands::LastCommit { repo, branch } => {
            let sha = client.get_last_commit_sha(repo, branch).await?;
            print_json(out, &json!({ "branch": branch, "sha": sha }))
        }
        Commands::File { repo, path, reference } => {
            let content = client
                .get_file_contents(path, repo, reference)
                .await
                .with_context(|| format!("Failed to read {path} at {reference}"))?;
            write!(out, "{content}")?;
            Ok(())
        }
        Commands::Pr { url } => print_json(out, &client.get_pull_request(url).await?),
        Commands::PrChecks { url } => print_json(out, &client.get_pull_request_checks(url).await?),
        Commands::Build { account, project, id } => {
            print_json(out, &client.get_build(account, project, *id).await?)
        }
        Commands::Feeds { account, with_packages } => {
            let feeds = if *with_packages {
                client.get_feeds_and_packages(account).await?
            } else {
                client.get_feeds(account).await?
            };
            print_json(out, &feeds)
        }
        Commands::Release { account, project, id } => {
            print_json(out, &client.get_release(account, project, *id).await?)
        }
        _ => run_offline(command, out),
    }
}

/// Resolve configuration, build a client when needed and run the command.
pub async fn run(args: Args, out: &mut impl Write) -> Result<()> {
    if !args.command.needs_client() {
        return run_offline(&args.command, out);
    }

    let config = Config::resolve(&args.global).context("Failed to load configuration")?;
    let tokens = config.token_provider()?;
    let client = AzureDevOpsClient::new(tokens, config.client_options())?;

    run_online(&client, &args.command, out).await
}
