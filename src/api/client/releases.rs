//! Release pipeline operations. These live on the `vsrm` subdomain.

use super::AzureDevOpsClient;
use crate::api::dispatch::{ApiRequest, from_value, required_i64};
use crate::api::models::{
    Artifact, ArtifactSourceReference, Build, IdNamePair, Release, ReleaseDefinition,
};
use crate::error::{ApiError, AzdoResult};
use serde_json::{Map, json};
use tracing::info;

const RELEASE_SUBDOMAIN: &str = "vsrm";
const PRIMARY_ARTIFACT_ALIAS: &str = "PrimaryArtifact";
const BUILD_ARTIFACT_TYPE: &str = "Build";

fn specific_version_type() -> IdNamePair {
    IdNamePair::new("specificVersionType", "Specific version")
}

fn specific_version(build: &Build) -> IdNamePair {
    IdNamePair::new(build.id.to_string(), build.build_number.clone())
}

/// Point the definition's artifact source at `build`.
///
/// A definition without artifacts gets a `PrimaryArtifact` build source. A
/// single existing source is retargeted. More than one source is an error.
pub fn adjust_artifact_sources(definition: &mut ReleaseDefinition, build: &Build) -> AzdoResult<()> {
    let artifacts = definition.artifacts.get_or_insert_with(Vec::new);

    match artifacts.len() {
        0 => {
            artifacts.push(Artifact {
                alias: PRIMARY_ARTIFACT_ALIAS.to_string(),
                artifact_type: BUILD_ARTIFACT_TYPE.to_string(),
                definition_reference: ArtifactSourceReference {
                    definition: build.definition.clone(),
                    default_version_type: specific_version_type(),
                    default_version_specific: specific_version(build),
                    project: build.project.clone(),
                    extra: Map::new(),
                },
                extra: Map::new(),
            });
            Ok(())
        }
        1 => {
            let artifact = &mut artifacts[0];
            let reference = &mut artifact.definition_reference;

            reference.definition = build.definition.clone();
            reference.default_version_specific = specific_version(build);
            reference.project = build.project.clone();

            let expected = specific_version_type();
            let version_type = &mut reference.default_version_type;
            if version_type.id != expected.id {
                info!(
                    "Artifact source of pipeline {} had version type id '{}'. Patching it to '{}'.",
                    definition.id,
                    version_type.id_string(),
                    expected.id_string()
                );
                version_type.id = expected.id;
            }
            if version_type.name != expected.name {
                info!(
                    "Artifact source of pipeline {} had version type name '{}'. Patching it to '{}'.",
                    definition.id, version_type.name, expected.name
                );
                version_type.name = expected.name;
            }

            if artifact.artifact_type != BUILD_ARTIFACT_TYPE {
                info!(
                    "Artifact type of pipeline {} was '{}'. Patching it to '{BUILD_ARTIFACT_TYPE}'.",
                    definition.id, artifact.artifact_type
                );
                artifact.artifact_type = BUILD_ARTIFACT_TYPE.to_string();
            }

            if artifact.alias != PRIMARY_ARTIFACT_ALIAS {
                info!(
                    "Artifact alias of pipeline {} was '{}'. Patching it to '{PRIMARY_ARTIFACT_ALIAS}'.",
                    definition.id, artifact.alias
                );
                artifact.alias = PRIMARY_ARTIFACT_ALIAS.to_string();
            }
            Ok(())
        }
        n => Err(ApiError::InvalidArgument(format!(
            "{n} artifact sources are defined in pipeline {}. Only one artifact source was expected.",
            definition.id
        ))
        .into()),
    }
}

impl AzureDevOpsClient {
    pub async fn get_release(&self, account: &str, project: &str, release_id: i64) -> AzdoResult<Release> {
        self.execute_api_request_as(
            ApiRequest::get(account, Some(project), format!("_apis/release/releases/{release_id}"))
                .version("5.1-preview.1")
                .subdomain(RELEASE_SUBDOMAIN),
        )
        .await
    }

    pub async fn get_release_definition(
        &self,
        account: &str,
        project: &str,
        definition_id: i64,
    ) -> AzdoResult<ReleaseDefinition> {
        self.execute_api_request_as(
            ApiRequest::get(account, Some(project), format!("_apis/release/definitions/{definition_id}"))
                .version("5.0")
                .subdomain(RELEASE_SUBDOMAIN),
        )
        .await
    }

    async fn update_release_definition(
        &self,
        account: &str,
        project: &str,
        definition: &ReleaseDefinition,
    ) -> AzdoResult<ReleaseDefinition> {
        let body = serde_json::to_value(definition).map_err(|e| ApiError::ParseError {
            message: e.to_string(),
        })?;
        let content = self
            .execute_api_request(
                ApiRequest::put(account, Some(project), "_apis/release/definitions/")
                    .with_body(body)
                    .version("5.0")
                    .subdomain(RELEASE_SUBDOMAIN),
            )
            .await?;
        from_value(content)
    }

    /// Make the release definition consume `build` as its only artifact
    /// source and save it.
    pub async fn adjust_release_pipeline_artifact_source(
        &self,
        account: &str,
        project: &str,
        mut definition: ReleaseDefinition,
        build: &Build,
    ) -> AzdoResult<ReleaseDefinition> {
        adjust_artifact_sources(&mut definition, build)?;
        self.update_release_definition(account, project, &definition).await
    }

    pub async fn remove_all_artifact_sources(
        &self,
        account: &str,
        project: &str,
        mut definition: ReleaseDefinition,
    ) -> AzdoResult<ReleaseDefinition> {
        definition.artifacts = Some(Vec::new());
        self.update_release_definition(account, project, &definition).await
    }

    /// Create a release of the definition, passing the BAR build id as a
    /// variable. Returns the release id.
    pub async fn start_new_release(
        &self,
        account: &str,
        project: &str,
        definition: &ReleaseDefinition,
        bar_build_id: i64,
    ) -> AzdoResult<i64> {
        info!("Starting release of pipeline {} for BAR build {bar_build_id}", definition.id);

        let body = json!({
            "definitionId": definition.id,
            "variables": {
                "BARBuildId": { "value": bar_build_id.to_string() }
            }
        });

        let content = self
            .execute_api_request(
                ApiRequest::post(account, Some(project), "_apis/release/releases/")
                    .with_body(body)
                    .version("5.0")
                    .subdomain(RELEASE_SUBDOMAIN),
            )
            .await?;

        required_i64(&content, "id")
    }
}
