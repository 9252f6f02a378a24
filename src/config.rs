//! Application configuration and environment variable parsing.
//!
//! Configuration is loaded from the environment (e.g., a .env file). It covers
//! the GitHub API endpoint, the OAuth client id used when a caller has no
//! token yet, and the table of team hyperlink submissions.

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// OAuth client id for the GitHub authorize redirect.
    pub github_client_id: String,

    /// Base URI for the GitHub API. Tests point this at a mock server.
    #[serde(default = "default_github_api_base_url")]
    pub github_api_base_url: String,

    /// Hyperlinks submitted by each team.
    /// Expected format: semicolon-separated `team_id=url url` entries.
    /// Example: "1=https://github.com/a/b https://github.com/c/d;2=https://github.com/e/f"
    #[serde(default, deserialize_with = "deserialize_team_links")]
    pub team_links: HashMap<String, Vec<String>>,
}

fn default_github_api_base_url() -> String {
    "https://api.github.com".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Where to send callers that have not authorized with GitHub yet.
    pub fn oauth_authorize_url(&self) -> String {
        format!(
            "https://github.com/login/oauth/authorize?client_id={}",
            self.github_client_id
        )
    }
}

fn deserialize_team_links<'de, D>(deserializer: D) -> Result<HashMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(parse_team_links(&s))
}

fn parse_team_links(s: &str) -> HashMap<String, Vec<String>> {
    s.split(';')
        .filter_map(|entry| {
            let (team, rest) = entry.trim().split_once('=')?;
            let team = team.trim();
            if team.is_empty() {
                return None;
            }
            let links: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
            Some((team.to_string(), links))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_config_from_env() {
        env::set_var("GITHUB_CLIENT_ID", "qwerty12345");
        env::set_var("GITHUB_API_BASE_URL", "http://localhost:9999");
        env::set_var(
            "TEAM_LINKS",
            "1=https://github.com/Shantanu/website https://github.com/Edward/OODD;2=https://github.com/Shantanu/mamaMiya/pull/1293",
        );

        let config = AppConfig::from_env().expect("Failed to load config");

        assert_eq!(config.github_client_id, "qwerty12345");
        assert_eq!(config.github_api_base_url, "http://localhost:9999");
        assert_eq!(config.team_links.len(), 2);
        assert_eq!(config.team_links["1"].len(), 2);
        assert_eq!(
            config.team_links["2"],
            vec!["https://github.com/Shantanu/mamaMiya/pull/1293".to_string()]
        );
        assert_eq!(
            config.oauth_authorize_url(),
            "https://github.com/login/oauth/authorize?client_id=qwerty12345"
        );

        env::remove_var("GITHUB_CLIENT_ID");
        env::remove_var("GITHUB_API_BASE_URL");
        env::remove_var("TEAM_LINKS");
    }

    #[test]
    #[serial]
    fn test_config_defaults_api_base_url() {
        env::set_var("GITHUB_CLIENT_ID", "qwerty12345");
        env::remove_var("GITHUB_API_BASE_URL");
        env::remove_var("TEAM_LINKS");

        let config = AppConfig::from_env().expect("Failed to load config");
        assert_eq!(config.github_api_base_url, "https://api.github.com");
        assert!(config.team_links.is_empty());

        env::remove_var("GITHUB_CLIENT_ID");
    }

    #[test]
    #[serial]
    fn test_config_missing_client_id() {
        env::remove_var("GITHUB_CLIENT_ID");
        let result = AppConfig::from_env();
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_team_links_skips_malformed_entries() {
        let parsed = parse_team_links("1=https://github.com/a/b;;nonsense;=x");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["1"], vec!["https://github.com/a/b".to_string()]);
    }
}
