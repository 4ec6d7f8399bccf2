//! Azure Artifacts feed and package operations.

use super::AzureDevOpsClient;
use crate::api::dispatch::{ApiRequest, from_value, value_list};
use crate::api::models::{Feed, Package};
use crate::error::AzdoResult;
use futures::future::try_join_all;
use tracing::info;

const FEEDS_SUBDOMAIN: &str = "feeds";
const PACKAGES_SUBDOMAIN: &str = "pkgs";
const FEEDS_API_VERSION: &str = "5.1-preview.1";

fn feed_request(account: &str, project: Option<&str>, path: String) -> ApiRequest {
    ApiRequest::get(account, project, path)
        .version(FEEDS_API_VERSION)
        .subdomain(FEEDS_SUBDOMAIN)
}

impl AzureDevOpsClient {
    /// All feeds of an account, organization and project scoped.
    pub async fn get_feeds(&self, account: &str) -> AzdoResult<Vec<Feed>> {
        let content = self
            .execute_api_request(feed_request(account, None, "_apis/packaging/feeds".to_string()))
            .await?;

        let mut feeds: Vec<Feed> = value_list(content)?;
        for feed in &mut feeds {
            feed.account = account.to_string();
        }
        Ok(feeds)
    }

    /// A feed by name or id. Project scoped feeds need their `project`.
    pub async fn get_feed(
        &self,
        account: &str,
        project: Option<&str>,
        feed_identifier: &str,
    ) -> AzdoResult<Feed> {
        let content = self
            .execute_api_request(feed_request(
                account,
                project,
                format!("_apis/packaging/feeds/{feed_identifier}"),
            ))
            .await?;

        let mut feed: Feed = from_value(content)?;
        feed.account = account.to_string();
        Ok(feed)
    }

    /// Packages of a feed with all their versions.
    pub async fn get_packages_for_feed(
        &self,
        account: &str,
        project: Option<&str>,
        feed_identifier: &str,
        include_deleted: bool,
    ) -> AzdoResult<Vec<Package>> {
        let mut path = format!("_apis/packaging/feeds/{feed_identifier}/packages?includeAllVersions=true");
        if include_deleted {
            path.push_str("&includeDeleted=true");
        }

        let content = self.execute_api_request(feed_request(account, project, path)).await?;
        value_list(content)
    }

    /// A feed with its packages, deleted versions included.
    pub async fn get_feed_and_packages(
        &self,
        account: &str,
        project: Option<&str>,
        feed_identifier: &str,
    ) -> AzdoResult<Feed> {
        let mut feed = self.get_feed(account, project, feed_identifier).await?;
        feed.packages = self
            .get_packages_for_feed(account, project, feed_identifier, true)
            .await?;
        Ok(feed)
    }

    /// All feeds of an account with their packages, deleted versions
    /// included. Package listings run concurrently, each under its feed's
    /// project, and all complete before this returns.
    pub async fn get_feeds_and_packages(&self, account: &str) -> AzdoResult<Vec<Feed>> {
        let mut feeds = self.get_feeds(account).await?;

        let packages = try_join_all(feeds.iter().map(|feed| {
            self.get_packages_for_feed(
                account,
                feed.project.as_ref().map(|p| p.name.as_str()),
                &feed.id,
                true,
            )
        }))
        .await?;

        for (feed, packages) in feeds.iter_mut().zip(packages) {
            feed.packages = packages;
        }
        Ok(feeds)
    }

    pub async fn delete_feed(
        &self,
        account: &str,
        project: Option<&str>,
        feed_identifier: &str,
    ) -> AzdoResult<()> {
        info!("Deleting feed '{feed_identifier}' in account '{account}'");
        self.execute_api_request(
            ApiRequest::delete(account, project, format!("_apis/packaging/feeds/{feed_identifier}"))
                .version(FEEDS_API_VERSION)
                .subdomain(FEEDS_SUBDOMAIN),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_nuget_package_version_from_feed(
        &self,
        account: &str,
        project: Option<&str>,
        feed_identifier: &str,
        package_name: &str,
        version: &str,
    ) -> AzdoResult<()> {
        info!("Deleting {package_name} {version} from feed '{feed_identifier}' in account '{account}'");
        self.execute_api_request(
            ApiRequest::delete(
                account,
                project,
                format!("_apis/packaging/feeds/{feed_identifier}/nuget/packages/{package_name}/versions/{version}"),
            )
            .version(FEEDS_API_VERSION)
            .subdomain(PACKAGES_SUBDOMAIN),
        )
        .await?;
        Ok(())
    }
}
