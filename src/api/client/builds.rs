//! Build and pipeline run operations.

use super::AzureDevOpsClient;
use crate::api::dispatch::{ApiRequest, required_i64, value_list};
use crate::api::models::{Build, BuildArtifact, NewBuildRequest, REFS_HEADS_PREFIX};
use crate::error::AzdoResult;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::info;

/// Body of `_apis/pipelines/{id}/runs`.
pub(crate) fn run_pipeline_body(request: &NewBuildRequest) -> Value {
    let ref_name = if request.source_branch.starts_with(REFS_HEADS_PREFIX) {
        request.source_branch.clone()
    } else {
        format!("{REFS_HEADS_PREFIX}{}", request.source_branch)
    };

    let pipelines: Map<String, Value> = request
        .pipeline_resources
        .iter()
        .map(|(name, version)| (name.clone(), json!({ "version": version })))
        .collect();

    let variables: Map<String, Value> = request
        .variables
        .iter()
        .map(|(name, value)| (name.clone(), json!({ "value": value })))
        .collect();

    let template_parameters: &BTreeMap<String, String> = &request.template_parameters;

    json!({
        "resources": {
            "repositories": {
                "self": {
                    "refName": ref_name,
                    "version": request.source_version,
                }
            },
            "pipelines": pipelines,
        },
        "templateParameters": template_parameters,
        "variables": variables,
    })
}

impl AzureDevOpsClient {
    /// Queue a run of a YAML pipeline and return the run id.
    pub async fn start_new_build(
        &self,
        account: &str,
        project: &str,
        definition_id: i64,
        request: &NewBuildRequest,
    ) -> AzdoResult<i64> {
        info!(
            "Starting pipeline {definition_id} in {account}/{project} on '{}' at '{}'",
            request.source_branch, request.source_version
        );

        let content = self
            .execute_api_request(
                ApiRequest::post(account, Some(project), format!("_apis/pipelines/{definition_id}/runs"))
                    .with_body(run_pipeline_body(request))
                    .version("6.0-preview.1"),
            )
            .await?;

        required_i64(&content, "id")
    }

    pub async fn get_build(&self, account: &str, project: &str, build_id: i64) -> AzdoResult<Build> {
        self.execute_api_request_as(
            ApiRequest::get(account, Some(project), format!("_apis/build/builds/{build_id}"))
                .version("5.0"),
        )
        .await
    }

    /// Latest builds of a definition on a branch, as returned by the service.
    pub async fn get_builds(
        &self,
        account: &str,
        project: &str,
        definition_id: i64,
        branch: &str,
        count: u32,
        status: &str,
    ) -> AzdoResult<Value> {
        self.execute_api_request(
            ApiRequest::get(
                account,
                Some(project),
                format!(
                    "_apis/build/builds?definitions={definition_id}&branchName={}&statusFilter={}&$top={count}",
                    super::repos::encode(branch),
                    super::repos::encode(status)
                ),
            )
            .version("5.0"),
        )
        .await
    }

    pub async fn get_build_artifacts(
        &self,
        account: &str,
        project: &str,
        build_id: i64,
        max_retries: u32,
    ) -> AzdoResult<Vec<BuildArtifact>> {
        let content = self
            .execute_api_request(
                ApiRequest::get(account, Some(project), format!("_apis/build/builds/{build_id}/artifacts"))
                    .version("5.0")
                    .retries(max_retries),
            )
            .await?;
        value_list(content)
    }
}
