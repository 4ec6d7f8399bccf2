//! Git CLI plumbing used to push file changes to a remote branch.

use crate::api::AzureDevOpsClient;
use crate::api::models::{GitFile, GitFileOperation};
use crate::error::{AzdoResult, GitError};
use crate::uri::parse_repo_uri;
use secrecy::{ExposeSecret, SecretString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Runs git commands. Implemented by [`GitCli`]; tests substitute a recorder.
pub trait ProcessRunner: Send + Sync {
    /// Run git with `args` in `working_dir` and return its stdout.
    fn run(&self, args: &[String], working_dir: Option<&Path>) -> Result<String, GitError>;
}

/// Runs the configured git executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    executable: String,
}

impl GitCli {
    pub fn new(executable: &str) -> Self {
        Self {
            executable: executable.to_string(),
        }
    }
}

impl ProcessRunner for GitCli {
    fn run(&self, args: &[String], working_dir: Option<&Path>) -> Result<String, GitError> {
        let mut command = Command::new(&self.executable);
        command.args(args);
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|e| GitError::SpawnFailed {
            executable: self.executable.clone(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: describe_command(args),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Removes the user info of any URL argument.
pub fn redact_credentials(arg: &str) -> String {
    match Url::parse(arg) {
        Ok(mut url) if !url.username().is_empty() || url.password().is_some() => {
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url.to_string()
        }
        _ => arg.to_string(),
    }
}

fn describe_command(args: &[String]) -> String {
    let args: Vec<String> = args.iter().map(|a| redact_credentials(a)).collect();
    format!("git {}", args.join(" "))
}

/// Clone URL of a repository carrying the token as password.
fn authenticated_url(repo_uri: &str, token: &SecretString) -> AzdoResult<String> {
    let repo = parse_repo_uri(repo_uri)?;
    let mut url = Url::parse(&format!(
        "https://dev.azure.com/{}/{}/_git/{}",
        repo.account, repo.project, repo.repo
    ))
    .map_err(crate::error::ApiError::from)?;
    let _ = url.set_username(&repo.account);
    let _ = url.set_password(Some(token.expose_secret()));
    Ok(url.to_string())
}

/// Identity and scratch location used for pushes.
struct PushSettings {
    author_name: String,
    author_email: String,
    temporary_repository_path: Option<PathBuf>,
}

fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

fn io_error(path: &Path, err: std::io::Error) -> GitError {
    GitError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Clones `branch` shallowly with only `files` checked out, applies the
/// changes and pushes them. The scratch directory is removed on return.
fn push_files(
    runner: &dyn ProcessRunner,
    settings: &PushSettings,
    clone_url: &str,
    files: &[GitFile],
    branch: &str,
    message: &str,
) -> Result<(), GitError> {
    let scratch = match &settings.temporary_repository_path {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
            tempfile::Builder::new()
                .prefix("azdo-remote-")
                .tempdir_in(parent)
                .map_err(|e| io_error(parent, e))?
        }
        None => tempfile::Builder::new()
            .prefix("azdo-remote-")
            .tempdir()
            .map_err(|e| io_error(&std::env::temp_dir(), e))?,
    };
    let repo_dir = scratch.path().join("repo");
    let repo_dir_arg = repo_dir.to_string_lossy().to_string();
    debug!("Cloning into {}", repo_dir.display());

    runner.run(
        &args([
            "clone",
            "--depth",
            "1",
            "--filter=blob:none",
            "--no-checkout",
            "--branch",
            branch,
            clone_url,
            repo_dir_arg.as_str(),
        ]),
        None,
    )?;

    let relative_paths: Vec<String> = files
        .iter()
        .map(|f| f.file_path.trim_start_matches('/').to_string())
        .collect();

    let mut sparse = args(["sparse-checkout", "set", "--no-cone"]);
    sparse.extend(relative_paths.iter().map(|p| format!("/{p}")));
    runner.run(&sparse, Some(&repo_dir))?;
    runner.run(&args(["checkout", branch]), Some(&repo_dir))?;
    runner.run(&args(["config", "user.name", settings.author_name.as_str()]), Some(&repo_dir))?;
    runner.run(&args(["config", "user.email", settings.author_email.as_str()]), Some(&repo_dir))?;

    for (file, relative) in files.iter().zip(&relative_paths) {
        let target = repo_dir.join(relative);
        match file.operation {
            GitFileOperation::Add => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
                }
                let bytes = file.content_bytes().map_err(|e| GitError::InvalidContent {
                    path: relative.clone(),
                    message: e.to_string(),
                })?;
                fs::write(&target, bytes).map_err(|e| io_error(&target, e))?;
            }
            GitFileOperation::Delete => match fs::remove_file(&target) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("{relative} is already absent");
                }
                Err(e) => return Err(io_error(&target, e)),
            },
        }
        runner.run(&args(["add", "--all", "--", relative.as_str()]), Some(&repo_dir))?;
    }

    // Identical content leaves nothing to commit; the push still succeeds.
    runner.run(&args(["commit", "--allow-empty", "-m", message]), Some(&repo_dir))?;
    runner.run(
        &args([
            "-c",
            "core.askpass=",
            "-c",
            "credential.helper=",
            "push",
            "origin",
            branch,
        ]),
        Some(&repo_dir),
    )?;

    Ok(())
}

impl AzureDevOpsClient {
    /// Commit `files` to `branch` of the repository and push.
    pub async fn commit_files(
        &self,
        files: &[GitFile],
        repo_uri: &str,
        branch: &str,
        message: &str,
    ) -> AzdoResult<()> {
        if files.is_empty() {
            info!("No files to push to {repo_uri} in branch {branch}");
            return Ok(());
        }

        info!("Pushing {} files to {repo_uri} in branch {branch}", files.len());
        let token = self.token_provider().token_for_repository(repo_uri).await?;
        let clone_url = authenticated_url(repo_uri, &token)?;

        let runner: Arc<dyn ProcessRunner> = self.process_runner();
        let options = self.options();
        let settings = PushSettings {
            author_name: options.author_name.clone(),
            author_email: options.author_email.clone(),
            temporary_repository_path: options.temporary_repository_path.clone(),
        };
        let files = files.to_vec();
        let owned_branch = branch.to_string();
        let owned_message = message.to_string();

        let result = tokio::task::spawn_blocking(move || {
            push_files(
                runner.as_ref(),
                &settings,
                &clone_url,
                &files,
                &owned_branch,
                &owned_message,
            )
        })
        .await
        .map_err(|e| GitError::CommandFailed {
            command: "push".to_string(),
            message: e.to_string(),
        })
        .and_then(|inner| inner);

        result.map_err(|err| {
            GitError::PushFailed {
                repository: repo_uri.to_string(),
                branch: branch.to_string(),
                message: err.to_string(),
            }
            .into()
        })
    }

    /// Not available: the repository only exists remotely.
    pub fn checkout(&self, _repo_dir: &str, _commit: &str, _force: bool) -> AzdoResult<()> {
        Err(GitError::NotSupported {
            operation: "checkout".to_string(),
        }
        .into())
    }

    /// Not available: the repository only exists remotely.
    pub fn add_remote_if_missing(&self, _repo_dir: &str, _repo_url: &str) -> AzdoResult<String> {
        Err(GitError::NotSupported {
            operation: "add_remote_if_missing".to_string(),
        }
        .into())
    }
}
