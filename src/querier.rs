//! Service layer that turns one team's submitted hyperlinks into a metrics
//! response.
//!
//! For each request this runs the full pipeline: classify the links, fetch
//! pull-request or repository data from GitHub, fold it into the accumulators,
//! resolve check-run statuses for each PR's head commit, and sort the commit
//! histogram for rendering. Accumulators live for exactly one request; nothing
//! is cached across requests.

use crate::config::AppConfig;
use crate::github::GitHubClient;
use crate::links::{self, ClassifiedLinks};
use crate::metrics::{commit_date_key, AggregateStats, CommitAuthorIndex, SortedCommitIndex};
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Everything the view layer needs to render a team's GitHub activity.
#[derive(Debug, Serialize)]
pub struct TeamMetricsResponse {
    #[serde(flatten)]
    pub stats: AggregateStats,
    pub check_statuses: HashMap<u64, Value>,
    #[serde(flatten)]
    pub commits: SortedCommitIndex,
}

pub struct MetricsQuerier {
    config: AppConfig,
}

impl MetricsQuerier {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Collects and aggregates GitHub data for one team's hyperlinks.
    ///
    /// Links, pagination pages and status lookups are fetched sequentially;
    /// the first remote failure aborts the request and propagates as-is.
    pub async fn collect(&self, token: &str, hyperlinks: &[String]) -> Result<TeamMetricsResponse> {
        let client = GitHubClient::new(token, &self.config.github_api_base_url)?;
        let classified = links::classify_links(hyperlinks);

        let mut stats = AggregateStats::default();
        let mut index = CommitAuthorIndex::default();
        let mut head_refs: HashMap<u64, String> = HashMap::new();

        self.collect_pull_requests(&client, &classified, &mut stats, &mut index, &mut head_refs)
            .await?;
        let check_statuses = self
            .collect_check_statuses(&client, &classified, &head_refs)
            .await?;
        self.collect_repositories(&client, &classified, &mut index)
            .await?;

        Ok(TeamMetricsResponse {
            stats,
            check_statuses,
            commits: index.into_sorted(),
        })
    }

    async fn collect_pull_requests(
        &self,
        client: &GitHubClient,
        classified: &ClassifiedLinks,
        stats: &mut AggregateStats,
        index: &mut CommitAuthorIndex,
        head_refs: &mut HashMap<u64, String>,
    ) -> Result<()> {
        for link in &classified.pull_requests {
            tracing::debug!(
                owner = %link.owner,
                repo = %link.repo,
                number = link.number,
                "fetching pull request"
            );
            let pull_request = client
                .fetch_pull_request(&link.owner, &link.repo, link.number)
                .await?;

            head_refs.insert(pull_request.number, pull_request.head_ref_oid.clone());

            for edge in &pull_request.commits.edges {
                let commit = &edge.node.commit;
                let Some(name) = commit.author.as_ref().and_then(|a| a.name.as_deref()) else {
                    continue;
                };
                let date = commit.committed_date.as_deref().unwrap_or_default();
                index.record(name, &commit_date_key(date));
            }

            stats.apply_pull_request(&pull_request);
        }
        Ok(())
    }

    /// Looks up the check-run status of each pull request's head commit.
    async fn collect_check_statuses(
        &self,
        client: &GitHubClient,
        classified: &ClassifiedLinks,
        head_refs: &HashMap<u64, String>,
    ) -> Result<HashMap<u64, Value>> {
        let mut check_statuses = HashMap::new();
        for link in &classified.pull_requests {
            let Some(sha) = head_refs.get(&link.number) else {
                continue;
            };
            tracing::debug!(
                owner = %link.owner,
                repo = %link.repo,
                sha = %sha,
                "fetching check-run statuses"
            );
            let status = client.fetch_check_runs(&link.owner, &link.repo, sha).await?;
            check_statuses.insert(link.number, status);
        }
        Ok(check_statuses)
    }

    async fn collect_repositories(
        &self,
        client: &GitHubClient,
        classified: &ClassifiedLinks,
        index: &mut CommitAuthorIndex,
    ) -> Result<()> {
        for link in &classified.repositories {
            tracing::debug!(owner = %link.owner, repo = %link.repo, "fetching repository commits");
            let commits = client.fetch_repository(&link.owner, &link.repo).await?;

            for author in commits {
                let Some(name) = author.name.as_deref() else {
                    continue;
                };
                let date = author.date.as_deref().unwrap_or_default();
                index.record(name, &commit_date_key(date));
            }
        }
        Ok(())
    }
}
