//! GitHub API client for the metrics pipeline.
//!
//! Commit and pull-request data comes from the GraphQL (v4) API; check-run
//! statuses come from the REST (v3) API. The client is built per request with
//! the caller's bearer token, and remote API errors propagate unmodified —
//! there is no retry or backoff.

use anyhow::{bail, Context, Result};
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    /// Builds a client authenticated with the caller-supplied token.
    ///
    /// `base_uri` is normally `https://api.github.com`; tests point it at a
    /// mock server.
    pub fn new(token: &str, base_uri: &str) -> Result<Self> {
        let octocrab = Octocrab::builder()
            .personal_token(token.to_string())
            .base_uri(base_uri)?
            .build()?;
        Ok(Self { octocrab })
    }

    /// Fetches up to 100 most recent commits on `master` for a repository.
    pub async fn fetch_repository(&self, owner: &str, repo: &str) -> Result<Vec<CommitAuthor>> {
        let query = repository_history_query(owner, repo);
        let envelope: GraphQlEnvelope<RepositoryQueryData> =
            self.octocrab.graphql(&json!({ "query": query })).await?;

        let history = envelope
            .into_data()?
            .repository
            .and_then(|repository| repository.master_ref)
            .and_then(|master_ref| master_ref.target)
            .and_then(|target| target.history)
            .context("malformed GraphQL response: missing repository commit history")?;

        Ok(history
            .edges
            .into_iter()
            .map(|edge| edge.node.author)
            .collect())
    }

    /// Fetches one pull request, following commit pagination to the end.
    ///
    /// Each page's commit edges are appended to the first page's, so the
    /// returned payload carries the complete commit list as if it had been a
    /// single page.
    pub async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestData> {
        let mut pull_request = self.fetch_pull_request_page(owner, repo, number, "").await?;
        let mut edges = std::mem::take(&mut pull_request.commits.edges);
        let mut page_info = pull_request.commits.page_info.clone();

        while page_info.has_next_page {
            let cursor = page_info
                .end_cursor
                .context("malformed GraphQL response: hasNextPage without endCursor")?;
            tracing::debug!(owner, repo, number, cursor = %cursor, "fetching next commit page");

            let mut page = self
                .fetch_pull_request_page(owner, repo, number, &cursor)
                .await?;
            edges.append(&mut page.commits.edges);
            page_info = page.commits.page_info;
        }

        pull_request.commits.edges = edges;
        pull_request.commits.page_info = page_info;
        Ok(pull_request)
    }

    async fn fetch_pull_request_page(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        cursor: &str,
    ) -> Result<PullRequestData> {
        let query = pull_request_query(owner, repo, number, cursor);
        let envelope: GraphQlEnvelope<PullRequestQueryData> =
            self.octocrab.graphql(&json!({ "query": query })).await?;

        envelope
            .into_data()?
            .repository
            .and_then(|repository| repository.pull_request)
            .context("malformed GraphQL response: missing repository.pullRequest")
    }

    /// Fetches the check-run statuses for a head commit, returned verbatim.
    pub async fn fetch_check_runs(&self, owner: &str, repo: &str, sha: &str) -> Result<Value> {
        let route = format!("/repos/{owner}/{repo}/commits/{sha}/check-runs");
        let statuses = self.octocrab.get(route, None::<&()>).await?;
        Ok(statuses)
    }
}

/// Query for the 100 most recent commits on a repository's master branch.
/// Owner and repo are interpolated literally, as submitted.
fn repository_history_query(owner: &str, repo: &str) -> String {
    format!(
        r#"query {{
  repository(owner: "{owner}", name: "{repo}") {{
    ref(qualifiedName: "master") {{
      target {{
        ... on Commit {{
          id
          history(first: 100) {{
            edges {{
              node {{
                id
                author {{ name email date }}
              }}
            }}
          }}
        }}
      }}
    }}
  }}
}}"#
    )
}

/// Query for one pull request's metadata plus a page of up to 100 commits.
/// An empty cursor requests the first page.
fn pull_request_query(owner: &str, repo: &str, number: u64, cursor: &str) -> String {
    let after = if cursor.is_empty() {
        String::new()
    } else {
        format!(", after: \"{cursor}\"")
    };

    format!(
        r#"query {{
  repository(owner: "{owner}", name: "{repo}") {{
    pullRequest(number: {number}) {{
      number additions deletions changedFiles mergeable merged headRefOid
      commits(first: 100{after}) {{
        totalCount
        pageInfo {{ hasNextPage endCursor }}
        edges {{
          node {{
            commit {{
              author {{ name }}
              additions deletions changedFiles committedDate
            }}
          }}
        }}
      }}
    }}
  }}
}}"#
    )
}

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Value>,
}

impl<T> GraphQlEnvelope<T> {
    fn into_data(self) -> Result<T> {
        if let Some(errors) = self.errors {
            bail!("GitHub GraphQL error: {errors}");
        }
        self.data
            .context("malformed GraphQL response: missing data")
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryQueryData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
struct RepositoryNode {
    #[serde(rename = "ref")]
    master_ref: Option<RefNode>,
}

#[derive(Debug, Deserialize)]
struct RefNode {
    target: Option<TargetNode>,
}

#[derive(Debug, Deserialize)]
struct TargetNode {
    history: Option<HistoryConnection>,
}

#[derive(Debug, Deserialize)]
struct HistoryConnection {
    #[serde(default)]
    edges: Vec<HistoryEdge>,
}

#[derive(Debug, Deserialize)]
struct HistoryEdge {
    node: HistoryCommit,
}

#[derive(Debug, Deserialize)]
struct HistoryCommit {
    author: CommitAuthor,
}

/// Author fields as the GraphQL API returns them; any of them may be absent.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CommitAuthor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullRequestQueryData {
    repository: Option<PullRequestRepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestRepositoryNode {
    pull_request: Option<PullRequestData>,
}

/// A pull request payload from the GraphQL API. `mergeable` is passed through
/// untyped: the API has returned both booleans and state strings here.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestData {
    pub number: u64,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    #[serde(default)]
    pub mergeable: Value,
    pub merged: bool,
    pub head_ref_oid: String,
    pub commits: CommitConnection,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitConnection {
    pub total_count: u64,
    #[serde(default)]
    pub page_info: PageInfo,
    #[serde(default)]
    pub edges: Vec<PullRequestCommitEdge>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PullRequestCommitEdge {
    pub node: PullRequestCommitNode,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PullRequestCommitNode {
    pub commit: PullRequestCommit,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestCommit {
    #[serde(default)]
    pub author: Option<CommitAuthor>,
    #[serde(default)]
    pub committed_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_history_query_interpolates_literally() {
        let query = repository_history_query("Shantanu", "website");
        assert!(query.contains(r#"repository(owner: "Shantanu", name: "website")"#));
        assert!(query.contains(r#"ref(qualifiedName: "master")"#));
        assert!(query.contains("history(first: 100)"));
    }

    #[test]
    fn test_pull_request_query_first_page_has_no_cursor() {
        let query = pull_request_query("expertiza", "expertiza", 1228, "");
        assert!(query.contains("pullRequest(number: 1228)"));
        assert!(query.contains("commits(first: 100)"));
        assert!(
            query.contains("number additions deletions changedFiles mergeable merged headRefOid")
        );
    }

    #[test]
    fn test_pull_request_query_later_pages_carry_cursor() {
        let query = pull_request_query("expertiza", "expertiza", 1228, "Y3Vyc29y");
        assert!(query.contains(r#"commits(first: 100, after: "Y3Vyc29y")"#));
    }

    #[test]
    fn test_envelope_surfaces_graphql_errors() {
        let envelope: GraphQlEnvelope<PullRequestQueryData> = serde_json::from_value(json!({
            "data": null,
            "errors": [{"message": "Field 'pullRequst' doesn't exist"}]
        }))
        .unwrap();

        let err = envelope.into_data().unwrap_err();
        assert!(err.to_string().contains("pullRequst"));
    }

    #[test]
    fn test_pull_request_payload_deserializes() {
        let payload = json!({
            "number": 8,
            "additions": 2,
            "deletions": 1,
            "changedFiles": 3,
            "mergeable": "UNKNOWN",
            "merged": true,
            "headRefOid": "123abc",
            "commits": {
                "totalCount": 16,
                "pageInfo": { "hasNextPage": false, "endCursor": "qwerty" },
                "edges": [
                    { "node": { "commit": {
                        "author": { "name": "Shantanu" },
                        "committedDate": "2018-12-1013:45"
                    } } }
                ]
            }
        });

        let pr: PullRequestData = serde_json::from_value(payload).unwrap();
        assert_eq!(pr.number, 8);
        assert_eq!(pr.changed_files, 3);
        assert_eq!(pr.mergeable, json!("UNKNOWN"));
        assert_eq!(pr.commits.total_count, 16);
        assert_eq!(pr.commits.edges.len(), 1);
        assert!(!pr.commits.page_info.has_next_page);
    }
}
