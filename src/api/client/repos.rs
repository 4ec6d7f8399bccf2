//! Repository operations: file contents, branches, commits and trees.

use super::AzureDevOpsClient;
use crate::api::dispatch::{ApiRequest, required_i64, required_str, value_list};
use crate::api::models::{
    BASE_OBJECT_ID, Commit, GitDiff, GitFile, GitRef, GitTreeItem, REFS_HEADS_PREFIX, RefUpdate,
};
use crate::error::{ApiError, AzdoError, AzdoResult};
use crate::uri::{RepoCoordinates, parse_repo_uri};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

/// Reference kinds tried, in order, when reading a file.
const VERSION_TYPES: [&str; 3] = ["branch", "commit", "tag"];

/// Strips a leading `refs/heads/` from a branch name.
pub fn normalize_branch_name(branch: &str) -> &str {
    branch.strip_prefix(REFS_HEADS_PREFIX).unwrap_or(branch)
}

/// Percent-encodes a query string value.
pub(crate) fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn repo_path(repo: &RepoCoordinates, rest: &str) -> String {
    format!("_apis/git/repositories/{}/{}", repo.repo, rest)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    path: String,
    #[serde(default)]
    is_folder: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreeEntry {
    relative_path: String,
    git_object_type: String,
    object_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Tree {
    #[serde(default)]
    tree_entries: Vec<TreeEntry>,
}

impl AzureDevOpsClient {
    /// Retrieve the contents of a text file at a branch, commit or tag.
    ///
    /// The REST API needs to know the kind of reference, so the reference is
    /// tried as a branch, then a commit, then a tag.
    pub async fn get_file_contents(
        &self,
        file_path: &str,
        repo_uri: &str,
        reference: &str,
    ) -> AzdoResult<String> {
        let repo = parse_repo_uri(repo_uri)?;
        self.file_contents_in(&repo, file_path, reference).await
    }

    pub(crate) async fn file_contents_in(
        &self,
        repo: &RepoCoordinates,
        file_path: &str,
        reference: &str,
    ) -> AzdoResult<String> {
        info!(
            "Getting the contents of file '{file_path}' from repo '{}/{}/{}' in branch/commit '{reference}'",
            repo.account, repo.project, repo.repo
        );

        for version_type in VERSION_TYPES {
            let request = ApiRequest::get(
                &repo.account,
                Some(repo.project.as_str()),
                repo_path(
                    repo,
                    &format!(
                        "items?path={}&versionType={version_type}&version={}&includeContent=true",
                        encode(file_path),
                        encode(reference)
                    ),
                ),
            )
            .quiet();

            match self.execute_api_request(request).await {
                Ok(content) => {
                    return Ok(content
                        .get("content")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string());
                }
                Err(AzdoError::Api(err))
                    if err.is_not_found()
                        || matches!(err, ApiError::RequestFailed { status: 400, .. }) =>
                {
                    debug!("'{file_path}' not found as {version_type} '{reference}'");
                }
                Err(err) => return Err(err),
            }
        }

        Err(ApiError::FileNotFound {
            path: file_path.to_string(),
            repository: repo.repo.clone(),
            reference: reference.to_string(),
        }
        .into())
    }

    /// Create `new_branch` at the head of `base_branch`, or move it there if
    /// it already exists.
    pub async fn create_branch(
        &self,
        repo_uri: &str,
        new_branch: &str,
        base_branch: &str,
    ) -> AzdoResult<()> {
        let repo = parse_repo_uri(repo_uri)?;

        let latest_sha = self
            .last_commit_sha_in(&repo, base_branch)
            .await?
            .ok_or_else(|| ApiError::NotFound {
                resource: format!("branch '{base_branch}' in repository '{}'", repo.repo),
            })?;

        // A missing branch is reported as an empty listing rather than a 404.
        let content = self
            .execute_api_request(
                ApiRequest::get(
                    &repo.account,
                    Some(repo.project.as_str()),
                    repo_path(&repo, &format!("refs/heads/{new_branch}")),
                )
                .retries(0),
            )
            .await?;
        let count = content.get("count").and_then(Value::as_i64).unwrap_or(0);

        let update = if count == 0 {
            info!("'{new_branch}' branch doesn't exist. Creating it...");
            RefUpdate::new(format!("{REFS_HEADS_PREFIX}{new_branch}"), latest_sha, BASE_OBJECT_ID)
        } else {
            info!("Branch '{new_branch}' exists, making sure it is in sync with '{base_branch}'...");
            let old_sha = self
                .last_commit_sha_in(&repo, new_branch)
                .await?
                .unwrap_or_else(|| BASE_OBJECT_ID.to_string());
            RefUpdate::new(format!("{REFS_HEADS_PREFIX}{new_branch}"), latest_sha, old_sha)
        };

        self.post_ref_updates(&repo, vec![update]).await
    }

    /// Delete a branch.
    pub async fn delete_branch(&self, repo_uri: &str, branch: &str) -> AzdoResult<()> {
        let repo = parse_repo_uri(repo_uri)?;
        self.delete_branch_in(&repo, branch).await
    }

    pub(crate) async fn delete_branch_in(
        &self,
        repo: &RepoCoordinates,
        branch: &str,
    ) -> AzdoResult<()> {
        let latest_sha = self
            .last_commit_sha_in(repo, branch)
            .await?
            .ok_or_else(|| ApiError::NotFound {
                resource: format!("branch '{branch}' in repository '{}'", repo.repo),
            })?;

        let update = RefUpdate::new(format!("{REFS_HEADS_PREFIX}{branch}"), BASE_OBJECT_ID, latest_sha);
        self.post_ref_updates(repo, vec![update]).await
    }

    async fn post_ref_updates(
        &self,
        repo: &RepoCoordinates,
        updates: Vec<RefUpdate>,
    ) -> AzdoResult<()> {
        let body = serde_json::to_value(&updates).map_err(|e| ApiError::ParseError {
            message: e.to_string(),
        })?;
        self.execute_api_request(
            ApiRequest::post(&repo.account, Some(repo.project.as_str()), repo_path(repo, "refs"))
                .with_body(body),
        )
        .await?;
        Ok(())
    }

    /// Whether `branch` (with or without `refs/heads/`) exists.
    pub async fn does_branch_exist(&self, repo_uri: &str, branch: &str) -> AzdoResult<bool> {
        let branch = normalize_branch_name(branch);
        let repo = parse_repo_uri(repo_uri)?;

        let content = self
            .execute_api_request(
                ApiRequest::get(
                    &repo.account,
                    Some(repo.project.as_str()),
                    repo_path(&repo, &format!("refs?filter={}", encode(&format!("heads/{branch}")))),
                )
                .version("7.0")
                .quiet(),
            )
            .await?;

        let expected = format!("{REFS_HEADS_PREFIX}{branch}");
        let refs: Vec<GitRef> = value_list(content)?;
        Ok(refs.iter().any(|r| r.name == expected))
    }

    /// Sha of the latest commit on `branch`, `None` when the branch is
    /// unknown or has no commits.
    pub async fn get_last_commit_sha(
        &self,
        repo_uri: &str,
        branch: &str,
    ) -> AzdoResult<Option<String>> {
        let repo = parse_repo_uri(repo_uri)?;
        self.last_commit_sha_in(&repo, branch).await
    }

    pub(crate) async fn last_commit_sha_in(
        &self,
        repo: &RepoCoordinates,
        branch: &str,
    ) -> AzdoResult<Option<String>> {
        let result = self
            .execute_api_request(ApiRequest::get(
                &repo.account,
                Some(repo.project.as_str()),
                repo_path(repo, &format!("commits?branch={}", encode(branch))),
            ))
            .await;

        match result {
            Ok(content) => Ok(content
                .get("value")
                .and_then(Value::as_array)
                .and_then(|values| values.first())
                .and_then(|commit| commit.get("commitId"))
                .and_then(Value::as_str)
                .map(str::to_string)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// A commit by sha, `None` when it does not exist.
    pub async fn get_commit(&self, repo_uri: &str, sha: &str) -> AzdoResult<Option<Commit>> {
        let repo = parse_repo_uri(repo_uri)?;

        let result = self
            .execute_api_request(
                ApiRequest::get(
                    &repo.account,
                    Some(repo.project.as_str()),
                    repo_path(&repo, &format!("commits/{sha}")),
                )
                .version("6.0"),
            )
            .await;

        match result {
            Ok(content) => {
                let author = content
                    .pointer("/author/name")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let comment = content
                    .get("comment")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                Ok(Some(Commit::new(author, sha, comment)))
            }
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Ahead/behind counts of `target_commit` relative to `base_commit`.
    pub async fn git_diff(
        &self,
        repo_uri: &str,
        base_commit: &str,
        target_commit: &str,
    ) -> AzdoResult<GitDiff> {
        info!("Diffing '{base_commit}'->'{target_commit}' in {repo_uri}");
        let repo = parse_repo_uri(repo_uri)?;

        let result = self
            .execute_api_request(ApiRequest::get(
                &repo.account,
                Some(repo.project.as_str()),
                repo_path(
                    &repo,
                    &format!(
                        "diffs/commits?baseVersion={base_commit}&baseVersionType=commit&targetVersion={target_commit}&targetVersionType=commit"
                    ),
                ),
            ))
            .await;

        match result {
            Ok(content) => Ok(GitDiff {
                base_version: base_commit.to_string(),
                target_version: target_commit.to_string(),
                ahead: required_i64(&content, "aheadCount")? as i32,
                behind: required_i64(&content, "behindCount")? as i32,
                valid: true,
            }),
            Err(err) if err.is_not_found() => Ok(GitDiff::unknown()),
            Err(err) => Err(err),
        }
    }

    /// All files under `path` at `commit`, with contents.
    pub async fn get_files_at_commit(
        &self,
        repo_uri: &str,
        commit: &str,
        path: &str,
    ) -> AzdoResult<Vec<GitFile>> {
        info!("Getting the contents of '{path}' in repo '{repo_uri}' at '{commit}'");
        let repo = parse_repo_uri(repo_uri)?;

        let content = self
            .execute_api_request(ApiRequest::get(
                &repo.account,
                Some(repo.project.as_str()),
                repo_path(
                    &repo,
                    &format!(
                        "items?scopePath={}&version={commit}&includeContent=true&versionType=commit&recursionLevel=full",
                        encode(path)
                    ),
                ),
            ))
            .await?;
        let items: Vec<Item> = value_list(content)?;

        let mut files = Vec::new();
        for item in items.iter().filter(|item| !item.is_folder) {
            let content = self.file_contents_in(&repo, &item.path, commit).await?;
            files.push(GitFile::new(item.path.trim_start_matches('/'), content));
        }

        info!("Getting the contents of '{path}' in repo '{repo_uri}' at '{commit}' succeeded!");
        Ok(files)
    }

    /// Whether the repository exists and is readable with the current token.
    pub async fn repo_exists(&self, repo_uri: &str) -> AzdoResult<bool> {
        let repo = parse_repo_uri(repo_uri)?;

        let result = self
            .execute_api_request(
                ApiRequest::get(
                    &repo.account,
                    Some(repo.project.as_str()),
                    format!("_apis/git/repositories/{}", repo.repo),
                )
                .quiet(),
            )
            .await;

        Ok(result.is_ok())
    }

    /// Id of a project, looked up by name.
    pub async fn get_project_id(&self, account: &str, project: &str) -> AzdoResult<String> {
        let content = self
            .execute_api_request(
                ApiRequest::get(account, None, format!("_apis/projects/{project}")).version("5.0"),
            )
            .await?;
        Ok(required_str(&content, "id")?.to_string())
    }

    /// Entries of the tree at `path` for a branch, tag or commit.
    ///
    /// Sub-tree shas seen in a listing are remembered so that listing one of
    /// them later skips resolving the reference again.
    pub async fn ls_tree(
        &self,
        repo_uri: &str,
        reference: &str,
        path: Option<&str>,
    ) -> AzdoResult<Vec<GitTreeItem>> {
        info!(
            "Getting tree contents from repo '{repo_uri}', ref '{reference}', path '{}'",
            path.unwrap_or_default()
        );
        let repo = parse_repo_uri(repo_uri)?;
        let path = path.filter(|p| !p.is_empty());

        let key = (
            repo_uri.to_string(),
            reference.to_string(),
            path.unwrap_or_default().to_string(),
        );
        let tree_sha = match self.cached_tree_sha(&key) {
            Some(sha) => sha,
            None => {
                let commit_sha = self.resolve_commit_sha(&repo, reference).await?;
                let commit = self
                    .execute_api_request(ApiRequest::get(
                        &repo.account,
                        Some(repo.project.as_str()),
                        repo_path(&repo, &format!("commits/{commit_sha}")),
                    ))
                    .await?;
                let root = required_str(&commit, "treeId")?.to_string();
                match path {
                    Some(path) => self.tree_sha_for_path(&repo, root, path).await?,
                    None => root,
                }
            }
        };

        let tree = self.get_tree(&repo, &tree_sha).await?;
        let mut items = Vec::with_capacity(tree.tree_entries.len());
        for entry in tree.tree_entries {
            let item_type = entry.git_object_type.to_lowercase();
            let item_path = match path {
                Some(path) => format!("{path}/{}", entry.relative_path),
                None => entry.relative_path,
            };
            if item_type == "tree" {
                self.cache_tree_sha(
                    (repo_uri.to_string(), reference.to_string(), item_path.clone()),
                    entry.object_id.clone(),
                );
            }
            items.push(GitTreeItem {
                sha: entry.object_id,
                path: item_path,
                item_type,
            });
        }

        Ok(items)
    }

    async fn get_tree(&self, repo: &RepoCoordinates, tree_sha: &str) -> AzdoResult<Tree> {
        self.execute_api_request_as(ApiRequest::get(
            &repo.account,
            Some(repo.project.as_str()),
            repo_path(repo, &format!("trees/{tree_sha}?recursive=false")),
        ))
        .await
    }

    async fn tree_sha_for_path(
        &self,
        repo: &RepoCoordinates,
        root: String,
        path: &str,
    ) -> AzdoResult<String> {
        let mut current = root;
        for segment in path.split(['/', '\\']).filter(|s| !s.is_empty()) {
            let tree = self.get_tree(repo, &current).await?;
            current = tree
                .tree_entries
                .into_iter()
                .find(|e| e.relative_path == segment && e.git_object_type.eq_ignore_ascii_case("tree"))
                .map(|e| e.object_id)
                .ok_or_else(|| ApiError::NotFound {
                    resource: format!("path segment '{segment}' in tree"),
                })?;
        }
        Ok(current)
    }

    /// Resolves a reference as a branch, then a tag, then a commit.
    async fn resolve_commit_sha(&self, repo: &RepoCoordinates, reference: &str) -> AzdoResult<String> {
        for prefix in ["heads", "tags"] {
            match self.ref_object_id(repo, &format!("{prefix}/{reference}")).await {
                Ok(Some(sha)) => return Ok(sha),
                Ok(None) => {}
                Err(err) => debug!("Resolving '{prefix}/{reference}' failed: {err}"),
            }
        }

        let direct = self
            .execute_api_request(
                ApiRequest::get(
                    &repo.account,
                    Some(repo.project.as_str()),
                    repo_path(repo, &format!("commits/{reference}")),
                )
                .quiet(),
            )
            .await
            .and_then(|commit| Ok(required_str(&commit, "commitId")?.to_string()));

        direct.map_err(|err| {
            debug!("Resolving '{reference}' as a commit failed: {err}");
            ApiError::InvalidArgument(format!(
                "Could not resolve '{reference}' as a branch, tag, or commit in repository '{}'",
                repo.repo
            ))
            .into()
        })
    }

    async fn ref_object_id(&self, repo: &RepoCoordinates, filter: &str) -> AzdoResult<Option<String>> {
        let content = self
            .execute_api_request(
                ApiRequest::get(
                    &repo.account,
                    Some(repo.project.as_str()),
                    repo_path(repo, &format!("refs?filter={}", encode(filter))),
                )
                .quiet(),
            )
            .await?;
        // The filter is a prefix match, `heads/release` also lists `heads/release/8.0`.
        let expected = format!("refs/{filter}");
        let refs: Vec<GitRef> = value_list(content)?;
        Ok(refs.into_iter().find(|r| r.name == expected).map(|r| r.object_id))
    }
}
