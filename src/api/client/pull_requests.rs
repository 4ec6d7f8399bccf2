//! Pull request operations: search, create, update, merge, checks, reviews
//! and comments.

use super::{AzureDevOpsClient, BOT_DISPLAY_NAME, SERVICE_ACCOUNT_AUTHOR};
use crate::api::dispatch::{ApiRequest, required_str, value_list};
use crate::api::models::{
    AzdoPullRequest, Check, CheckState, Commit, CommentThread, MergePolicyEvaluation,
    MergePolicyEvaluationStatus, MergePullRequestParameters, PrStatus, PullRequest,
    REFS_HEADS_PREFIX, Review, ReviewState, ThreadComment,
};
use crate::error::{ApiError, AzdoError, AzdoResult};
use crate::uri::{PullRequestCoordinates, parse_pull_request_uri, parse_repo_uri};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

/// Appended to every comment this client posts, so it can find them again.
pub const COMMENT_MARKER: &str =
    "\n\n[//]: # (This identifies this comment as a Maestro++ comment)\n";

/// Azure DevOps rejects longer pull request descriptions.
pub const MAX_PULL_REQUEST_DESCRIPTION_LENGTH: usize = 4000;

/// Truncates a description to [`MAX_PULL_REQUEST_DESCRIPTION_LENGTH`] characters.
pub fn truncate_description(description: &str) -> String {
    match description.char_indices().nth(MAX_PULL_REQUEST_DESCRIPTION_LENGTH) {
        Some((end, _)) => description[..end].to_string(),
        None => description.to_string(),
    }
}

/// Server messages meaning the pull request is blocked rather than broken.
fn is_not_mergeable_message(message: &str) -> bool {
    message.starts_with("The pull request needs a minimum number of approvals")
        || message == "Proof of presence is required"
        || message == "Failure while attempting to queue Build."
        || message.contains("Please re-approve the most recent pull request iteration")
}

fn pr_path(pr: &PullRequestCoordinates, rest: &str) -> String {
    let base = format!("_apis/git/repositories/{}/pullRequests/{}", pr.repo, pr.id);
    if rest.is_empty() {
        base
    } else {
        format!("{base}/{rest}")
    }
}

fn text_comment(content: String) -> Value {
    json!({
        "commentType": "text",
        "content": content,
    })
}

/// One line of the auto-merge status comment.
fn display_policy(result: &MergePolicyEvaluation) -> String {
    let title = result.title.as_deref().unwrap_or_default();
    let message = result.message.as_deref().unwrap_or_default();

    if result.status == MergePolicyEvaluationStatus::Pending {
        return format!("- ❓ **{title}** - {message}");
    }

    if result.status.is_success() {
        let suffix = result
            .title
            .as_deref()
            .map(|t| format!(" - {t}"))
            .unwrap_or_default();
        return format!("- ✔️ **{}** Succeeded{suffix}", result.merge_policy_display_name);
    }

    format!("- ❌ **{}** {title} - {message}", result.merge_policy_display_name)
}

/// Markdown body of the auto-merge status comment, policies sorted by name.
pub fn merge_status_markdown(evaluations: &[MergePolicyEvaluation]) -> String {
    let mut sorted: Vec<&MergePolicyEvaluation> = evaluations.iter().collect();
    sorted.sort_by(|a, b| a.merge_policy_name.cmp(&b.merge_policy_name));
    let lines: Vec<String> = sorted.into_iter().map(display_policy).collect();

    format!(
        "## Auto-Merge Status\n\nThis pull request has not been merged because Maestro++ is waiting on the following merge policies.\n{}",
        lines.join("\n")
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyEvaluationRecord {
    #[serde(default)]
    status: String,
    configuration: PolicyConfiguration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyConfiguration {
    #[serde(default)]
    is_enabled: bool,
    #[serde(default)]
    url: String,
    #[serde(rename = "type")]
    policy_type: Option<PolicyType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyType {
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct Reviewer {
    #[serde(default)]
    vote: i32,
}

impl AzureDevOpsClient {
    /// Ids of the pull requests from `source_branch` in the given state.
    ///
    /// Azure DevOps cannot search by keyword; a keyword is ignored.
    pub async fn search_pull_requests(
        &self,
        repo_uri: &str,
        source_branch: &str,
        status: PrStatus,
        keyword: Option<&str>,
        author: Option<&str>,
    ) -> AzdoResult<Vec<i32>> {
        let repo = parse_repo_uri(repo_uri)?;

        let mut query = format!(
            "searchCriteria.sourceRefName={REFS_HEADS_PREFIX}{source_branch}&searchCriteria.status={}",
            status.as_search_status()
        );
        if keyword.is_some_and(|k| !k.is_empty()) {
            info!(
                "A keyword was provided but Azure DevOps doesn't support searching for PRs based on keywords and it won't be used..."
            );
        }
        if let Some(author) = author.filter(|a| !a.is_empty()) {
            query.push_str(&format!("&searchCriteria.creatorId={author}"));
        }

        let content = self
            .execute_api_request(ApiRequest::get(
                &repo.account,
                Some(repo.project.as_str()),
                format!("_apis/git/repositories/{}/pullrequests?{query}", repo.repo),
            ))
            .await?;

        let prs: Vec<AzdoPullRequest> = value_list(content)?;
        Ok(prs.into_iter().map(|pr| pr.pull_request_id).collect())
    }

    async fn fetch_pull_request(
        &self,
        pr: &PullRequestCoordinates,
        include_commits: bool,
    ) -> AzdoResult<AzdoPullRequest> {
        let path = if include_commits {
            pr_path(pr, "") + "?includeCommits=true"
        } else {
            pr_path(pr, "")
        };
        self.execute_api_request_as(ApiRequest::get(&pr.account, Some(pr.project.as_str()), path))
            .await
    }

    /// Retrieve a pull request. Branch names are returned without `refs/heads/`.
    pub async fn get_pull_request(&self, pull_request_url: &str) -> AzdoResult<PullRequest> {
        let coordinates = parse_pull_request_uri(pull_request_url)?;
        let pr = self.fetch_pull_request(&coordinates, false).await?;

        let (Some(base_branch), Some(head_branch)) = (
            pr.target_ref_name.strip_prefix(REFS_HEADS_PREFIX),
            pr.source_ref_name.strip_prefix(REFS_HEADS_PREFIX),
        ) else {
            return Err(ApiError::UnexpectedResponse {
                message: "Expected that source and target ref names returned from pull request API include refs/heads".to_string(),
            }
            .into());
        };

        Ok(PullRequest {
            title: pr.title,
            description: pr.description.unwrap_or_default(),
            base_branch: base_branch.to_string(),
            head_branch: head_branch.to_string(),
            status: PrStatus::from_azdo(&pr.status),
            updated_at: Utc::now(),
            target_branch_commit_sha: pr.last_merge_target_commit.map(|c| c.commit_id),
            url: pr.url,
        })
    }

    /// State of a pull request. Statuses other than active, completed and
    /// abandoned are errors.
    pub async fn get_pull_request_status(&self, pull_request_url: &str) -> AzdoResult<PrStatus> {
        let coordinates = parse_pull_request_uri(pull_request_url)?;
        let pr = self.fetch_pull_request(&coordinates, false).await?;

        match PrStatus::from_azdo(&pr.status) {
            PrStatus::None => Err(ApiError::UnexpectedResponse {
                message: format!("Unknown pull request status '{}'", pr.status),
            }
            .into()),
            status => Ok(status),
        }
    }

    /// Create a pull request and return its API URL.
    pub async fn create_pull_request(
        &self,
        repo_uri: &str,
        pull_request: &PullRequest,
    ) -> AzdoResult<String> {
        let repo = parse_repo_uri(repo_uri)?;

        let body = json!({
            "title": pull_request.title,
            "description": truncate_description(&pull_request.description),
            "sourceRefName": format!("{REFS_HEADS_PREFIX}{}", pull_request.head_branch),
            "targetRefName": format!("{REFS_HEADS_PREFIX}{}", pull_request.base_branch),
        });

        let content = self
            .execute_api_request(
                ApiRequest::post(
                    &repo.account,
                    Some(repo.project.as_str()),
                    format!("_apis/git/repositories/{}/pullrequests", repo.repo),
                )
                .with_body(body),
            )
            .await?;

        Ok(required_str(&content, "url")?.to_string())
    }

    /// Update the title and description of a pull request.
    pub async fn update_pull_request(
        &self,
        pull_request_url: &str,
        pull_request: &PullRequest,
    ) -> AzdoResult<()> {
        let pr = parse_pull_request_uri(pull_request_url)?;

        let body = json!({
            "title": pull_request.title,
            "description": truncate_description(&pull_request.description),
        });

        self.execute_api_request(
            ApiRequest::patch(&pr.account, Some(pr.project.as_str()), pr_path(&pr, "")).with_body(body),
        )
        .await?;
        Ok(())
    }

    /// Complete a pull request, bypassing policies.
    ///
    /// Rejections the service explains as missing approvals or a failed build
    /// queue become [`ApiError::PullRequestNotMergeable`].
    pub async fn merge_dependency_pull_request(
        &self,
        pull_request_url: &str,
        parameters: MergePullRequestParameters,
        merge_commit_message: &str,
    ) -> AzdoResult<()> {
        let coordinates = parse_pull_request_uri(pull_request_url)?;
        let pr = self.fetch_pull_request(&coordinates, true).await?;
        let last_merge_source = pr.last_merge_source_commit.ok_or_else(|| {
            ApiError::UnexpectedResponse {
                message: "pull request has no last merge source commit".to_string(),
            }
        })?;

        let body = json!({
            "status": "completed",
            "completionOptions": {
                "mergeCommitMessage": merge_commit_message,
                "bypassPolicy": true,
                "bypassReason": "All required checks were successful",
                "squashMerge": parameters.squash_merge,
                "deleteSourceBranch": parameters.delete_source_branch,
            },
            "lastMergeSourceCommit": {
                "commitId": last_merge_source.commit_id,
                "comment": merge_commit_message,
            },
        });

        let result = self
            .execute_api_request(
                ApiRequest::patch(
                    &coordinates.account,
                    Some(coordinates.project.as_str()),
                    pr_path(&coordinates, ""),
                )
                .with_body(body),
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(AzdoError::Api(ApiError::RequestFailed { message, .. }))
                if is_not_mergeable_message(&message) =>
            {
                Err(ApiError::PullRequestNotMergeable { message }.into())
            }
            Err(err) => Err(err),
        }
    }

    /// Commits of a pull request.
    pub async fn get_pull_request_commits(&self, pull_request_url: &str) -> AzdoResult<Vec<Commit>> {
        let coordinates = parse_pull_request_uri(pull_request_url)?;
        let pr = self.fetch_pull_request(&coordinates, true).await?;

        Ok(pr
            .commits
            .into_iter()
            .map(|commit| {
                let author = commit.author.map(|a| a.name).unwrap_or_default();
                let author = if author == SERVICE_ACCOUNT_AUTHOR {
                    BOT_DISPLAY_NAME.to_string()
                } else {
                    author
                };
                Commit::new(author, commit.commit_id, commit.comment.unwrap_or_default())
            })
            .collect())
    }

    /// Enabled policy evaluations of a pull request, as status checks.
    pub async fn get_pull_request_checks(&self, pull_request_url: &str) -> AzdoResult<Vec<Check>> {
        let pr = parse_pull_request_uri(pull_request_url)?;
        let project_id = self.get_project_id(&pr.account, &pr.project).await?;
        let artifact_id = format!("vstfs:///CodeReview/CodeReviewId/{project_id}/{}", pr.id);

        let content = self
            .execute_api_request(
                ApiRequest::get(
                    &pr.account,
                    Some(pr.project.as_str()),
                    format!("_apis/policy/evaluations?artifactId={artifact_id}"),
                )
                .version("5.1-preview.1"),
            )
            .await?;
        let records: Vec<PolicyEvaluationRecord> = value_list(content)?;

        let mut checks = Vec::new();
        for record in records {
            if !record.configuration.is_enabled {
                continue;
            }
            let Some(state) = CheckState::from_policy_status(&record.status) else {
                debug!("Skipping policy evaluation with unknown status '{}'", record.status);
                continue;
            };
            checks.push(Check {
                status: state,
                name: record
                    .configuration
                    .policy_type
                    .map(|t| t.display_name)
                    .unwrap_or_default(),
                url: record.configuration.url,
            });
        }

        Ok(checks)
    }

    /// Current reviewer votes of a pull request.
    pub async fn get_latest_pull_request_reviews(
        &self,
        pull_request_url: &str,
    ) -> AzdoResult<Vec<Review>> {
        let pr = parse_pull_request_uri(pull_request_url)?;

        let content = self
            .execute_api_request(ApiRequest::get(
                &pr.account,
                Some(pr.project.as_str()),
                pr_path(&pr, "reviewers"),
            ))
            .await?;
        let reviewers: Vec<Reviewer> = value_list(content)?;

        reviewers
            .into_iter()
            .map(|reviewer| {
                let status = ReviewState::from_vote(reviewer.vote).ok_or_else(|| {
                    ApiError::UnexpectedResponse {
                        message: format!("Unknown review vote {}", reviewer.vote),
                    }
                })?;
                Ok(Review {
                    status,
                    url: pull_request_url.to_string(),
                })
            })
            .collect()
    }

    /// Post a comment in a new thread.
    pub async fn comment_pull_request(&self, pull_request_url: &str, comment: &str) -> AzdoResult<()> {
        let pr = parse_pull_request_uri(pull_request_url)?;
        self.create_thread(&pr, comment).await
    }

    async fn create_thread(&self, pr: &PullRequestCoordinates, comment: &str) -> AzdoResult<()> {
        let body = json!({
            "comments": [text_comment(format!("{comment}{COMMENT_MARKER}"))],
            "status": "active",
        });
        self.execute_api_request(
            ApiRequest::post(&pr.account, Some(pr.project.as_str()), pr_path(pr, "threads"))
                .with_body(body),
        )
        .await?;
        Ok(())
    }

    async fn get_threads(&self, pr: &PullRequestCoordinates) -> AzdoResult<Vec<CommentThread>> {
        let content = self
            .execute_api_request(ApiRequest::get(
                &pr.account,
                Some(pr.project.as_str()),
                pr_path(pr, "threads"),
            ))
            .await?;
        value_list(content)
    }

    /// Update the last comment this client posted, or post a new one.
    ///
    /// In active (or unknown) threads, the first thread holding a marked
    /// comment wins: its last comment is updated when it is marked, otherwise
    /// a comment is appended to the thread. Without such a thread a new one
    /// is created.
    pub async fn create_or_update_pull_request_comment(
        &self,
        pull_request_url: &str,
        message: &str,
    ) -> AzdoResult<()> {
        let pr = parse_pull_request_uri(pull_request_url)?;
        let content = format!("{message}{COMMENT_MARKER}");

        for thread in self.get_threads(&pr).await? {
            if !thread.is_active_or_unknown() {
                continue;
            }
            let comments: Vec<_> = thread.comments.iter().filter(|c| !c.is_deleted).collect();
            let is_marked = |c: &&ThreadComment| {
                c.is_text()
                    && c.content
                        .as_deref()
                        .is_some_and(|text| text.ends_with(COMMENT_MARKER))
            };
            if !comments.iter().any(is_marked) {
                continue;
            }

            match comments.last() {
                Some(last) if is_marked(last) => {
                    debug!("Updating comment {} in thread {}", last.id, thread.id);
                    self.execute_api_request(
                        ApiRequest::patch(
                            &pr.account,
                            Some(pr.project.as_str()),
                            pr_path(&pr, &format!("threads/{}/comments/{}", thread.id, last.id)),
                        )
                        .with_body(json!({ "content": content })),
                    )
                    .await?;
                }
                _ => {
                    debug!("Appending a comment to thread {}", thread.id);
                    self.execute_api_request(
                        ApiRequest::post(
                            &pr.account,
                            Some(pr.project.as_str()),
                            pr_path(&pr, &format!("threads/{}/comments", thread.id)),
                        )
                        .with_body(text_comment(content)),
                    )
                    .await?;
                }
            }
            return Ok(());
        }

        self.create_thread(&pr, message).await
    }

    /// Post or refresh the auto-merge status comment.
    pub async fn create_or_update_pull_request_merge_status_info(
        &self,
        pull_request_url: &str,
        evaluations: &[MergePolicyEvaluation],
    ) -> AzdoResult<()> {
        self.create_or_update_pull_request_comment(pull_request_url, &merge_status_markdown(evaluations))
            .await
    }

    /// Text of the comments in active (or unknown) threads.
    pub async fn get_pull_request_comments(&self, pull_request_url: &str) -> AzdoResult<Vec<String>> {
        let pr = parse_pull_request_uri(pull_request_url)?;
        info!("Retrieving comments for pull request {pull_request_url}");

        Ok(self
            .get_threads(&pr)
            .await?
            .into_iter()
            .filter(CommentThread::is_active_or_unknown)
            .flat_map(|thread| thread.comments)
            .filter(|comment| comment.is_text() && !comment.is_deleted)
            .filter_map(|comment| comment.content.filter(|text| !text.is_empty()))
            .collect())
    }

    /// Delete the source branch of a pull request.
    pub async fn delete_pull_request_branch(&self, pull_request_url: &str) -> AzdoResult<()> {
        let pr = self.get_pull_request(pull_request_url).await?;
        let coordinates = parse_pull_request_uri(pull_request_url)?;
        self.delete_branch_in(&coordinates.repository(), &pr.head_branch)
            .await
    }
}
