//! Configuration loading and validation.

use crate::error::{ConfigError, Result};
use crate::query::{Page, VcsType};
use crate::selection::RunOrder;

/// Query API endpoint used when no override is set.
pub const DEFAULT_QUERY_ENDPOINT: &str = "https://circleci.com/query-api";

/// supersede configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Organization or user that owns the project (`CIRCLE_PROJECT_USERNAME`).
    pub organization: String,

    /// Repository name (`CIRCLE_PROJECT_REPONAME`).
    pub project: String,

    /// Branch of the build that is running right now (`CIRCLE_BRANCH`).
    pub branch: String,

    /// Query API URL.
    pub query_endpoint: String,

    pub vcs_type: VcsType,

    /// History window; only this one page is inspected.
    pub page: Page,

    /// How the branch's runs are ordered before picking the current build.
    pub ordering: RunOrder,
}

impl Config {
    /// Defaults for a known project, bypassing the environment.
    pub fn for_project(
        organization: impl Into<String>,
        project: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            project: project.into(),
            branch: branch.into(),
            query_endpoint: DEFAULT_QUERY_ENDPOINT.into(),
            vcs_type: VcsType::default(),
            page: Page::default(),
            ordering: RunOrder::default(),
        }
    }

    /// Load configuration from the CI environment.
    ///
    /// Values are parsed but not range-checked; call [`Config::validate`] once
    /// any command-line overrides have been applied.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
        };

        let mut config = Self::for_project(
            required("CIRCLE_PROJECT_USERNAME")?,
            required("CIRCLE_PROJECT_REPONAME")?,
            required("CIRCLE_BRANCH")?,
        );

        if let Some(endpoint) = lookup("SUPERSEDE_QUERY_ENDPOINT") {
            config.query_endpoint = endpoint;
        }

        if let Some(vcs_type) = lookup("SUPERSEDE_VCS_TYPE") {
            config.vcs_type = vcs_type.parse().map_err(ConfigError::Invalid)?;
        }

        if let Some(limit) = lookup("SUPERSEDE_PAGE_LIMIT") {
            config.page.limit = limit.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("SUPERSEDE_PAGE_LIMIT must be an integer, got {limit:?}"))
            })?;
        }

        if let Some(flag) = lookup("SUPERSEDE_SORT_BY_CREATED") {
            config.ordering = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => RunOrder::NewestCreatedFirst,
                "0" | "false" | "no" | "" => RunOrder::AsReturned,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "SUPERSEDE_SORT_BY_CREATED must be true or false, got {other:?}"
                    ))
                    .into());
                }
            };
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page.limit <= 0 {
            return Err(ConfigError::Invalid(format!(
                "page limit must be positive, got {}",
                self.page.limit
            ))
            .into());
        }
        if self.page.offset < 0 {
            return Err(ConfigError::Invalid(format!(
                "page offset must not be negative, got {}",
                self.page.offset
            ))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const CI_VARS: [(&str, &str); 3] = [
        ("CIRCLE_PROJECT_USERNAME", "acme"),
        ("CIRCLE_PROJECT_REPONAME", "widgets"),
        ("CIRCLE_BRANCH", "feature/login"),
    ];

    #[test]
    fn test_load_from_ci_variables() {
        let config = Config::from_lookup(lookup(&CI_VARS)).unwrap();

        assert_eq!(config.organization, "acme");
        assert_eq!(config.project, "widgets");
        assert_eq!(config.branch, "feature/login");
        assert_eq!(config.query_endpoint, DEFAULT_QUERY_ENDPOINT);
        assert_eq!(config.vcs_type, VcsType::Github);
        assert_eq!(config.page, Page::default());
        assert_eq!(config.ordering, RunOrder::AsReturned);
    }

    #[test]
    fn test_missing_branch_is_reported() {
        let result = Config::from_lookup(lookup(&CI_VARS[..2]));
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::MissingKey(key))) if key == "CIRCLE_BRANCH"
        ));
    }

    #[test]
    fn test_overrides() {
        let mut vars = CI_VARS.to_vec();
        vars.extend([
            ("SUPERSEDE_QUERY_ENDPOINT", "http://localhost:9000/query-api"),
            ("SUPERSEDE_VCS_TYPE", "bitbucket"),
            ("SUPERSEDE_PAGE_LIMIT", "50"),
            ("SUPERSEDE_SORT_BY_CREATED", "true"),
        ]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.query_endpoint, "http://localhost:9000/query-api");
        assert_eq!(config.vcs_type, VcsType::Bitbucket);
        assert_eq!(config.page.limit, 50);
        assert_eq!(config.ordering, RunOrder::NewestCreatedFirst);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for (key, value) in [
            ("SUPERSEDE_PAGE_LIMIT", "lots"),
            ("SUPERSEDE_VCS_TYPE", "gitlab"),
            ("SUPERSEDE_SORT_BY_CREATED", "maybe"),
        ] {
            let mut vars = CI_VARS.to_vec();
            vars.push((key, value));
            let result = Config::from_lookup(lookup(&vars));
            assert!(
                matches!(result, Err(Error::Config(ConfigError::Invalid(_)))),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_out_of_range_limit_fails_validation() {
        let mut vars = CI_VARS.to_vec();
        vars.push(("SUPERSEDE_PAGE_LIMIT", "0"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_override_applies_before_validation() {
        let mut vars = CI_VARS.to_vec();
        vars.push(("SUPERSEDE_PAGE_LIMIT", "0"));
        let mut config = Config::from_lookup(lookup(&vars)).unwrap();

        config.page.limit = 10;

        config.validate().unwrap();
        assert_eq!(config.page.limit, 10);
    }
}
