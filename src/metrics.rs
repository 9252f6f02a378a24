//! Aggregation of fetched GitHub data into team-level statistics and a
//! per-author commit histogram.

use crate::github::PullRequestData;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Merge state of one pull request.
///
/// The original data is type-inconsistent: a merged PR renders as the string
/// `"MERGED"`, while an unmerged one renders as whatever the API put in
/// `mergeable` — sometimes a boolean, sometimes a state string. The variants
/// keep that distinction explicit while serializing to the exact same output.
#[derive(Clone, Debug, PartialEq)]
pub enum MergeStatus {
    Merged,
    Mergeable(bool),
    MergeableState(String),
}

impl MergeStatus {
    pub fn from_payload(merged: bool, mergeable: &Value) -> Self {
        if merged {
            return Self::Merged;
        }
        match mergeable {
            Value::Bool(flag) => Self::Mergeable(*flag),
            Value::String(state) => Self::MergeableState(state.clone()),
            other => Self::MergeableState(other.to_string()),
        }
    }
}

impl Serialize for MergeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Merged => serializer.serialize_str("MERGED"),
            Self::Mergeable(flag) => serializer.serialize_bool(*flag),
            Self::MergeableState(state) => serializer.serialize_str(state),
        }
    }
}

/// Running totals across every link processed for one request.
#[derive(Debug, Default, Serialize)]
pub struct AggregateStats {
    pub total_additions: u64,
    pub total_deletions: u64,
    pub total_files_changed: u64,
    pub total_commits: u64,
    pub merge_status: HashMap<u64, MergeStatus>,
}

impl AggregateStats {
    /// Folds one pull request payload into the totals.
    ///
    /// The commit count comes from the connection's `totalCount`, not from
    /// the number of fetched edges.
    pub fn apply_pull_request(&mut self, pull_request: &PullRequestData) {
        self.total_additions += pull_request.additions;
        self.total_deletions += pull_request.deletions;
        self.total_files_changed += pull_request.changed_files;
        self.total_commits += pull_request.commits.total_count;
        self.merge_status.insert(
            pull_request.number,
            MergeStatus::from_payload(pull_request.merged, &pull_request.mergeable),
        );
    }
}

/// Truncates a commit timestamp to its calendar date: the first 10 characters
/// of a fixed-width ISO timestamp are `YYYY-MM-DD`.
pub fn commit_date_key(timestamp: &str) -> String {
    timestamp.chars().take(10).collect()
}

/// Per-author and per-date commit counters, shared by every link processed
/// for one request.
#[derive(Debug, Default)]
pub struct CommitAuthorIndex {
    pub authors: HashMap<String, u64>,
    pub dates: HashMap<String, u64>,
    pub parsed_data: HashMap<String, HashMap<String, u64>>,
}

impl CommitAuthorIndex {
    /// Counts one commit against its author and date.
    pub fn record(&mut self, author: &str, date: &str) {
        *self.authors.entry(author.to_string()).or_insert(0) += 1;
        *self.dates.entry(date.to_string()).or_insert(0) += 1;
        *self
            .parsed_data
            .entry(author.to_string())
            .or_default()
            .entry(date.to_string())
            .or_insert(0) += 1;
    }

    /// Reorders each author's date histogram chronologically for rendering.
    /// Dates are fixed-width ISO, so lexicographic order is chronological.
    pub fn into_sorted(self) -> SortedCommitIndex {
        SortedCommitIndex {
            authors: self.authors,
            dates: self.dates.into_iter().collect(),
            parsed_data: self
                .parsed_data
                .into_iter()
                .map(|(author, dates)| (author, dates.into_iter().collect()))
                .collect(),
        }
    }
}

/// The presenter's output: date keys in ascending order, ready to render.
#[derive(Debug, Serialize)]
pub struct SortedCommitIndex {
    pub authors: HashMap<String, u64>,
    pub dates: BTreeMap<String, u64>,
    pub parsed_data: BTreeMap<String, BTreeMap<String, u64>>,
}
