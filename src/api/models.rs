//! Data transfer objects for the Azure DevOps REST API.
//!
//! Two kinds of types live here: wire types mirroring Azure DevOps JSON
//! (camelCase on the wire) and the domain types the client hands back to
//! callers, which hide Azure DevOps specifics such as `refs/heads/` prefixes
//! and numeric review votes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Object id Azure DevOps uses as the old id when creating a branch and as
/// the new id when deleting one.
pub const BASE_OBJECT_ID: &str = "0000000000000000000000000000000000000000";

pub const REFS_HEADS_PREFIX: &str = "refs/heads/";

/// Ref update posted to `_apis/git/repositories/{repo}/refs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefUpdate {
    pub name: String,
    pub new_object_id: String,
    pub old_object_id: String,
}

impl RefUpdate {
    pub fn new(name: impl Into<String>, new_object_id: impl Into<String>, old_object_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            new_object_id: new_object_id.into(),
            old_object_id: old_object_id.into(),
        }
    }
}

/// Entry of a ref listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRef {
    pub name: String,
    #[serde(default)]
    pub object_id: String,
}

/// Pull request state as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrStatus {
    #[default]
    None,
    Open,
    Closed,
    Merged,
}

impl PrStatus {
    /// Value of `searchCriteria.status` for this state.
    pub fn as_search_status(self) -> &'static str {
        match self {
            PrStatus::Open => "active",
            PrStatus::Closed => "abandoned",
            PrStatus::Merged => "completed",
            PrStatus::None => "none",
        }
    }

    /// Maps an Azure DevOps pull request status.
    pub fn from_azdo(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "active" => PrStatus::Open,
            "completed" => PrStatus::Merged,
            "abandoned" => PrStatus::Closed,
            _ => PrStatus::None,
        }
    }
}

/// A pull request, with bare branch names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub base_branch: String,
    pub head_branch: String,
    #[serde(default)]
    pub status: PrStatus,
    pub updated_at: DateTime<Utc>,
    pub target_branch_commit_sha: Option<String>,
    pub url: Option<String>,
}

impl PullRequest {
    /// A new pull request to be created from `head_branch` into `base_branch`.
    pub fn new(title: &str, description: &str, base_branch: &str, head_branch: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            base_branch: base_branch.to_string(),
            head_branch: head_branch.to_string(),
            status: PrStatus::None,
            updated_at: Utc::now(),
            target_branch_commit_sha: None,
            url: None,
        }
    }
}

/// `GitPullRequest` as returned by `_apis/git/repositories/{repo}/pullRequests/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzdoPullRequest {
    #[serde(default)]
    pub pull_request_id: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub source_ref_name: String,
    #[serde(default)]
    pub target_ref_name: String,
    pub last_merge_source_commit: Option<CommitRef>,
    pub last_merge_target_commit: Option<CommitRef>,
    #[serde(default)]
    pub commits: Vec<CommitRef>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRef {
    pub commit_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing)]
    pub author: Option<GitUserDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitUserDate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Options for completing a pull request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePullRequestParameters {
    pub squash_merge: bool,
    pub delete_source_branch: bool,
}

/// A commit as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub author: String,
    pub sha: String,
    pub message: String,
}

impl Commit {
    pub fn new(author: impl Into<String>, sha: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            sha: sha.into(),
            message: message.into(),
        }
    }
}

/// Ahead/behind information between two commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitDiff {
    pub base_version: String,
    pub target_version: String,
    pub ahead: i32,
    pub behind: i32,
    pub valid: bool,
}

impl GitDiff {
    /// Diff returned when the service cannot compare the commits.
    pub fn unknown() -> Self {
        Self {
            base_version: String::new(),
            target_version: String::new(),
            ahead: 0,
            behind: 0,
            valid: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckState {
    None,
    Pending,
    Error,
    Failure,
    Success,
}

impl CheckState {
    /// Maps a policy evaluation status, case-insensitively.
    ///
    /// Returns `None` for statuses Azure DevOps may add later.
    pub fn from_policy_status(status: &str) -> Option<Self> {
        let state = match status.to_ascii_lowercase().as_str() {
            "broken" => CheckState::Error,
            "rejected" => CheckState::Failure,
            "queued" | "running" => CheckState::Pending,
            "approved" => CheckState::Success,
            "notapplicable" => CheckState::None,
            _ => return None,
        };
        Some(state)
    }
}

/// A status check (policy evaluation) on a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    pub status: CheckState,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewState {
    Approved,
    Commented,
    ChangesRequested,
    Pending,
    Rejected,
}

impl ReviewState {
    /// Maps an Azure DevOps reviewer vote.
    pub fn from_vote(vote: i32) -> Option<Self> {
        match vote {
            10 => Some(ReviewState::Approved),
            5 => Some(ReviewState::Commented),
            0 => Some(ReviewState::Pending),
            -5 => Some(ReviewState::ChangesRequested),
            -10 => Some(ReviewState::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub status: ReviewState,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GitFileOperation {
    #[default]
    Add,
    Delete,
}

/// How [`GitFile::content`] is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentEncoding {
    #[default]
    Utf8,
    /// Binary content, Base64 encoded.
    Base64,
}

/// A file to commit, or a file read from a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitFile {
    pub file_path: String,
    pub content: String,
    #[serde(default)]
    pub content_encoding: ContentEncoding,
    #[serde(default)]
    pub operation: GitFileOperation,
}

impl GitFile {
    pub fn new(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            content: content.into(),
            content_encoding: ContentEncoding::Utf8,
            operation: GitFileOperation::Add,
        }
    }

    /// A binary file, stored Base64 encoded.
    pub fn binary(file_path: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            file_path: file_path.into(),
            content: STANDARD.encode(bytes),
            content_encoding: ContentEncoding::Base64,
            operation: GitFileOperation::Add,
        }
    }

    /// Raw bytes of the content, decoding Base64 content.
    pub fn content_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match self.content_encoding {
            ContentEncoding::Utf8 => Ok(self.content.as_bytes().to_vec()),
            ContentEncoding::Base64 => STANDARD.decode(self.content.trim()),
        }
    }

    /// A file to remove from the repository.
    pub fn deleted(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            content: String::new(),
            content_encoding: ContentEncoding::Utf8,
            operation: GitFileOperation::Delete,
        }
    }
}

/// Entry of a tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitTreeItem {
    pub sha: String,
    pub path: String,
    #[serde(rename = "type")]
    pub item_type: String,
}

impl GitTreeItem {
    pub fn is_tree(&self) -> bool {
        self.item_type == "tree"
    }

    pub fn is_blob(&self) -> bool {
        self.item_type == "blob"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergePolicyEvaluationStatus {
    Pending,
    DecisiveSuccess,
    TransientSuccess,
    DecisiveFailure,
    TransientFailure,
}

impl MergePolicyEvaluationStatus {
    pub fn is_success(self) -> bool {
        matches!(
            self,
            MergePolicyEvaluationStatus::DecisiveSuccess
                | MergePolicyEvaluationStatus::TransientSuccess
        )
    }
}

/// Outcome of a merge policy, rendered into the auto-merge status comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePolicyEvaluation {
    pub merge_policy_name: String,
    pub merge_policy_display_name: String,
    pub status: MergePolicyEvaluationStatus,
    pub title: Option<String>,
    pub message: Option<String>,
}

/// Pair used throughout build and release payloads.
///
/// Ids are strings on the wire for some services and numbers for others, so
/// the id is kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdNamePair {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: String,
}

impl IdNamePair {
    pub fn new(id: impl Into<Value>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// The id rendered as text, without JSON quoting.
    pub fn id_string(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub id: i64,
    #[serde(default)]
    pub build_number: String,
    #[serde(default)]
    pub definition: IdNamePair,
    #[serde(default)]
    pub project: IdNamePair,
    pub status: Option<String>,
    pub result: Option<String>,
    pub source_branch: Option<String>,
    pub source_version: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    #[serde(rename = "_links", default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildArtifact {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub resource: Option<BuildArtifactResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildArtifactResource {
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub data: Option<String>,
    pub download_url: Option<String>,
    pub url: Option<String>,
}

/// Request for `start_new_build`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBuildRequest {
    pub source_branch: String,
    pub source_version: String,
    pub variables: BTreeMap<String, String>,
    pub template_parameters: BTreeMap<String, String>,
    /// Pipeline resource name to build number.
    pub pipeline_resources: BTreeMap<String, String>,
}

impl NewBuildRequest {
    pub fn new(source_branch: &str, source_version: &str) -> Self {
        Self {
            source_branch: source_branch.to_string(),
            source_version: source_version.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// An Azure Artifacts feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    /// Account the feed was listed from; not part of the payload.
    #[serde(default, skip_deserializing)]
    pub account: String,
    pub id: String,
    pub name: String,
    pub project: Option<Project>,
    #[serde(default)]
    pub packages: Vec<Package>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub name: String,
    #[serde(default)]
    pub protocol_type: String,
    #[serde(default)]
    pub versions: Vec<PackageVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageVersion {
    pub version: String,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub status: Option<String>,
    pub release_definition: Option<IdNamePair>,
    #[serde(default)]
    pub environments: Vec<ReleaseEnvironment>,
    #[serde(rename = "_links", default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseEnvironment {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub status: Option<String>,
}

/// A release definition. Fields this crate does not model are kept in
/// `extra` so the definition can be PUT back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDefinition {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<Artifact>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub alias: String,
    #[serde(rename = "type", default)]
    pub artifact_type: String,
    #[serde(default)]
    pub definition_reference: ArtifactSourceReference,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSourceReference {
    #[serde(default)]
    pub definition: IdNamePair,
    #[serde(default)]
    pub default_version_type: IdNamePair,
    #[serde(default)]
    pub default_version_specific: IdNamePair,
    #[serde(default)]
    pub project: IdNamePair,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Comment thread on a pull request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    pub id: i64,
    /// Missing for threads the service reports without a status.
    pub status: Option<String>,
    #[serde(default)]
    pub comments: Vec<ThreadComment>,
}

impl CommentThread {
    /// Active threads may be reported with an unknown status.
    pub fn is_active_or_unknown(&self) -> bool {
        match self.status.as_deref() {
            None => true,
            Some(status) => matches!(status.to_ascii_lowercase().as_str(), "active" | "unknown"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadComment {
    pub id: i64,
    pub content: Option<String>,
    pub comment_type: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl ThreadComment {
    pub fn is_text(&self) -> bool {
        self.comment_type
            .as_deref()
            .is_none_or(|t| t.eq_ignore_ascii_case("text"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// # PR Status Mapping
    ///
    /// ## Expected Outcome
    /// - Search statuses use the Azure DevOps names
    /// - Unknown Azure DevOps statuses map to None
    #[test]
    fn test_pr_status_mapping() {
        assert_eq!(PrStatus::Open.as_search_status(), "active");
        assert_eq!(PrStatus::Closed.as_search_status(), "abandoned");
        assert_eq!(PrStatus::Merged.as_search_status(), "completed");
        assert_eq!(PrStatus::None.as_search_status(), "none");

        assert_eq!(PrStatus::from_azdo("active"), PrStatus::Open);
        assert_eq!(PrStatus::from_azdo("Completed"), PrStatus::Merged);
        assert_eq!(PrStatus::from_azdo("abandoned"), PrStatus::Closed);
        assert_eq!(PrStatus::from_azdo("notSet"), PrStatus::None);
    }

    /// # Check State Mapping
    #[test]
    fn test_check_state_mapping() {
        assert_eq!(CheckState::from_policy_status("broken"), Some(CheckState::Error));
        assert_eq!(CheckState::from_policy_status("Rejected"), Some(CheckState::Failure));
        assert_eq!(CheckState::from_policy_status("queued"), Some(CheckState::Pending));
        assert_eq!(CheckState::from_policy_status("running"), Some(CheckState::Pending));
        assert_eq!(CheckState::from_policy_status("approved"), Some(CheckState::Success));
        assert_eq!(CheckState::from_policy_status("notApplicable"), Some(CheckState::None));
        assert_eq!(CheckState::from_policy_status("somethingNew"), None);
    }

    /// # Review Vote Mapping
    #[test]
    fn test_review_vote_mapping() {
        assert_eq!(ReviewState::from_vote(10), Some(ReviewState::Approved));
        assert_eq!(ReviewState::from_vote(5), Some(ReviewState::Commented));
        assert_eq!(ReviewState::from_vote(0), Some(ReviewState::Pending));
        assert_eq!(ReviewState::from_vote(-5), Some(ReviewState::ChangesRequested));
        assert_eq!(ReviewState::from_vote(-10), Some(ReviewState::Rejected));
        assert_eq!(ReviewState::from_vote(7), None);
    }

    /// # Ref Update Serialization
    ///
    /// ## Expected Outcome
    /// - Field names are camelCase on the wire
    #[test]
    fn test_ref_update_serialization() {
        let update = RefUpdate::new("refs/heads/main", "abc", BASE_OBJECT_ID);
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "refs/heads/main",
                "newObjectId": "abc",
                "oldObjectId": BASE_OBJECT_ID
            })
        );
    }

    /// # Release Definition Round-Trip
    ///
    /// Tests that fields without a dedicated struct member survive
    /// deserialization and serialization.
    ///
    /// ## Expected Outcome
    /// - `revision`, `environments` and nested artifact fields are preserved
    #[test]
    fn test_release_definition_keeps_unknown_fields() {
        let payload = json!({
            "id": 42,
            "name": "Publish",
            "revision": 7,
            "environments": [{"id": 1, "name": "Stage"}],
            "artifacts": [{
                "alias": "PrimaryArtifact",
                "type": "Build",
                "isPrimary": true,
                "definitionReference": {
                    "definition": {"id": "12", "name": "arcade-ci"},
                    "defaultVersionType": {"id": "specificVersionType", "name": "Specific version"},
                    "defaultVersionSpecific": {"id": "100", "name": "20240101.1"},
                    "project": {"id": "guid", "name": "internal"},
                    "artifactSourceDefinitionUrl": {"id": "https://x", "name": ""}
                }
            }]
        });

        let definition: ReleaseDefinition = serde_json::from_value(payload.clone()).unwrap();
        assert_eq!(definition.id, 42);
        assert_eq!(definition.extra["revision"], json!(7));
        let artifacts = definition.artifacts.as_ref().unwrap();
        assert_eq!(artifacts[0].extra["isPrimary"], json!(true));
        assert_eq!(artifacts[0].definition_reference.definition.id_string(), "12");

        let back = serde_json::to_value(&definition).unwrap();
        assert_eq!(back, payload);
    }

    /// # Feed Deserialization
    ///
    /// ## Expected Outcome
    /// - Account is not read from the payload
    /// - Missing project and packages are tolerated
    #[test]
    fn test_feed_deserialization() {
        let feed: Feed = serde_json::from_value(json!({
            "id": "1",
            "name": "darc-int-arcade-1234",
            "account": "ignored"
        }))
        .unwrap();
        assert_eq!(feed.account, "");
        assert!(feed.project.is_none());
        assert!(feed.packages.is_empty());
    }

    /// # Comment Thread Status
    #[test]
    fn test_comment_thread_status() {
        let active: CommentThread =
            serde_json::from_value(json!({"id": 1, "status": "active"})).unwrap();
        let unknown: CommentThread =
            serde_json::from_value(json!({"id": 2, "status": "unknown"})).unwrap();
        let missing: CommentThread = serde_json::from_value(json!({"id": 3})).unwrap();
        let closed: CommentThread =
            serde_json::from_value(json!({"id": 4, "status": "closed"})).unwrap();

        assert!(active.is_active_or_unknown());
        assert!(unknown.is_active_or_unknown());
        assert!(missing.is_active_or_unknown());
        assert!(!closed.is_active_or_unknown());
    }

    /// # IdNamePair Rendering
    #[test]
    fn test_id_name_pair_id_string() {
        assert_eq!(IdNamePair::new("abc", "n").id_string(), "abc");
        assert_eq!(IdNamePair::new(12, "n").id_string(), "12");
        assert_eq!(IdNamePair::default().id_string(), "");
    }

    /// # File Content Encoding
    ///
    /// ## Expected Outcome
    /// - The encoding defaults to UTF-8 when absent from JSON
    /// - Base64 content decodes to the original bytes
    #[test]
    fn test_git_file_content_encoding() {
        let file: GitFile = serde_json::from_value(json!({
            "filePath": "global.json",
            "content": "{}"
        }))
        .unwrap();
        assert_eq!(file.content_encoding, ContentEncoding::Utf8);
        assert_eq!(file.content_bytes().unwrap(), b"{}");

        let bytes = [0u8, 159, 146, 150, 255];
        let binary = GitFile::binary("eng/icon.png", &bytes);
        assert_eq!(binary.content_encoding, ContentEncoding::Base64);
        assert_eq!(binary.content_bytes().unwrap(), bytes);

        let broken = GitFile {
            content: "not base64!".to_string(),
            ..binary
        };
        assert!(broken.content_bytes().is_err());
    }
}
