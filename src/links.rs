//! Classifies a team's submitted hyperlinks into pull-request and repository
//! links ahead of fetching.

use serde::Serialize;

/// A parsed GitHub hyperlink submitted by a team.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Hyperlink {
    PullRequest(PullRequestLink),
    Repository(RepositoryLink),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PullRequestLink {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepositoryLink {
    pub owner: String,
    pub repo: String,
}

/// The outcome of classifying one team's links. At most one of the two lists
/// is populated: pull-request links take total precedence over plain
/// repository links.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassifiedLinks {
    pub pull_requests: Vec<PullRequestLink>,
    pub repositories: Vec<RepositoryLink>,
}

/// Parses a single hyperlink into its owner/repo (and PR number) parts.
///
/// Returns `None` for anything that is not shaped like a GitHub repository or
/// pull-request URL; malformed submissions are skipped rather than rejected.
pub fn parse_hyperlink(link: &str) -> Option<Hyperlink> {
    let trimmed = link.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);

    let segments: Vec<&str> = rest.split('/').collect();
    match segments.as_slice() {
        [_host, owner, repo, "pull", number, ..] => {
            let number = number.parse().ok()?;
            Some(Hyperlink::PullRequest(PullRequestLink {
                owner: (*owner).to_string(),
                repo: (*repo).to_string(),
                number,
            }))
        }
        [_host, owner, repo] => Some(Hyperlink::Repository(RepositoryLink {
            owner: (*owner).to_string(),
            repo: (*repo).to_string(),
        })),
        _ => None,
    }
}

/// Repositories belonging to the host application or its course
/// infrastructure are not team work and are skipped when fetching.
fn is_infrastructure_repo(link: &RepositoryLink) -> bool {
    link.owner == "expertiza" || link.repo == "expertiza" || link.owner == "servo"
}

/// Partitions a team's hyperlinks for fetching.
///
/// If at least one pull-request link was submitted, only the pull-request
/// links are kept and every other link is discarded. Otherwise all links are
/// treated as repository links, minus the infrastructure exemptions.
pub fn classify_links(hyperlinks: &[String]) -> ClassifiedLinks {
    let parsed: Vec<Hyperlink> = hyperlinks
        .iter()
        .filter_map(|link| parse_hyperlink(link))
        .collect();

    let pull_requests: Vec<PullRequestLink> = parsed
        .iter()
        .filter_map(|link| match link {
            Hyperlink::PullRequest(pr) => Some(pr.clone()),
            Hyperlink::Repository(_) => None,
        })
        .collect();

    if !pull_requests.is_empty() {
        return ClassifiedLinks {
            pull_requests,
            repositories: Vec::new(),
        };
    }

    let repositories = parsed
        .into_iter()
        .filter_map(|link| match link {
            Hyperlink::Repository(repo) if !is_infrastructure_repo(&repo) => Some(repo),
            _ => None,
        })
        .collect();

    ClassifiedLinks {
        pull_requests: Vec::new(),
        repositories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_parse_pull_request_link() {
        let parsed = parse_hyperlink("https://github.com/Shantanu/mamaMiya/pull/1293");
        assert_eq!(
            parsed,
            Some(Hyperlink::PullRequest(PullRequestLink {
                owner: "Shantanu".to_string(),
                repo: "mamaMiya".to_string(),
                number: 1293,
            }))
        );
    }

    #[test]
    fn test_parse_repository_link_with_trailing_slash() {
        let parsed = parse_hyperlink("https://github.com/Shantanu/website/");
        assert_eq!(
            parsed,
            Some(Hyperlink::Repository(RepositoryLink {
                owner: "Shantanu".to_string(),
                repo: "website".to_string(),
            }))
        );
    }

    #[test]
    fn test_parse_malformed_link() {
        assert_eq!(parse_hyperlink("https://github.com/Shantanu"), None);
        assert_eq!(parse_hyperlink("not a url"), None);
        assert_eq!(
            parse_hyperlink("https://github.com/Shantanu/website/pull/abc"),
            None
        );
    }

    #[test]
    fn test_pull_request_links_take_precedence() {
        let classified = classify_links(&links(&[
            "https://github.com/Shantanu/website",
            "https://github.com/Shantanu/website/pull/1123",
        ]));

        assert_eq!(classified.pull_requests.len(), 1);
        assert_eq!(classified.pull_requests[0].number, 1123);
        assert!(classified.repositories.is_empty());
    }

    #[test]
    fn test_repository_links_when_no_pull_requests() {
        let classified = classify_links(&links(&[
            "https://github.com/Shantanu/website",
            "https://github.com/Edward/OODD",
        ]));

        assert!(classified.pull_requests.is_empty());
        assert_eq!(classified.repositories.len(), 2);
        assert_eq!(classified.repositories[0].repo, "website");
        assert_eq!(classified.repositories[1].owner, "Edward");
    }

    #[test]
    fn test_infrastructure_repositories_excluded() {
        let classified = classify_links(&links(&[
            "https://github.com/Shantanu/website",
            "https://github.com/expertiza/expertiza",
            "https://github.com/Shantanu/expertiza",
            "https://github.com/servo/servo",
        ]));

        assert_eq!(classified.repositories.len(), 1);
        assert_eq!(classified.repositories[0].repo, "website");
    }

    #[test]
    fn test_exclusion_is_case_sensitive() {
        let classified = classify_links(&links(&["https://github.com/Expertiza/website"]));
        assert_eq!(classified.repositories.len(), 1);
    }
}
