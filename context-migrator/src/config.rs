use std::{ops::Deref, path::PathBuf, str::FromStr, time::Duration};

use envconfig::Envconfig;
use reqwest::Url;
use tracing::info;

use crate::{
    error::ConfigError,
    migration::{guardrails::GuardrailFailurePolicy, maintainer::BackupMaintainer},
    schema::AttributeMapping,
};

pub const DEFAULT_PROJECT: &str = "default";
pub const DEFAULT_ENVIRONMENT: &str = "production";
pub const DEFAULT_HOST: &str = "https://app.launchdarkly.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlexBool(pub bool);

impl FromStr for FlexBool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(FlexBool(true)),
            "false" | "0" | "no" | "off" | "" => Ok(FlexBool(false)),
            _ => Err(format!("Invalid boolean value: {}", s)),
        }
    }
}

impl From<FlexBool> for bool {
    fn from(flex: FlexBool) -> Self {
        flex.0
    }
}

impl Deref for FlexBool {
    type Target = bool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Comma separated repository names whose code references are considered vetted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryAllowList(pub Vec<String>);

impl FromStr for RepositoryAllowList {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RepositoryAllowList(
            s.split(',')
                .map(str::trim)
                .filter(|repo| !repo.is_empty())
                .map(String::from)
                .collect(),
        ))
    }
}

impl RepositoryAllowList {
    pub fn contains(&self, repo: &str) -> bool {
        self.0.iter().any(|allowed| allowed == repo)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl std::fmt::Display for ParseEnvMsDurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "expected a duration in milliseconds")
    }
}

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.trim().parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(Duration::from_millis(ms)))
    }
}

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "LD_API_KEY")]
    pub api_key: String,

    #[envconfig(from = "PROJECT_KEY")]
    pub project_key: Option<String>,

    #[envconfig(from = "ENVIRONMENT_KEY")]
    pub env_key: Option<String>,

    #[envconfig(from = "LD_HOST")]
    pub host: Option<String>,

    #[envconfig(from = "REPOSITORIES")]
    pub repositories: Option<RepositoryAllowList>,

    #[envconfig(from = "SCHEMA_FILE")]
    pub schema_file: Option<String>,

    #[envconfig(from = "MIGRATE", default = "false")]
    pub migrate: FlexBool,

    #[envconfig(from = "BACKUP_MAINTAINER_MEMBER")]
    pub backup_maintainer_member: Option<String>,

    #[envconfig(from = "BACKUP_MAINTAINER_TEAM")]
    pub backup_maintainer_team: Option<String>,

    #[envconfig(from = "GUARDRAIL_LOOKUP_FAILURE", default = "open")]
    pub guardrail_lookup_failure: GuardrailFailurePolicy,

    #[envconfig(from = "LD_REQUEST_TIMEOUT_MS", default = "30000")]
    pub request_timeout: EnvMsDuration,
}

/// Everything a run needs, validated once before the first service call and
/// never mutated afterwards.
#[derive(Clone)]
pub struct MigrationSettings {
    pub api_key: String,
    pub project_key: String,
    pub env_key: String,
    pub host: Url,
    pub repositories: RepositoryAllowList,
    pub schema: Option<AttributeMapping>,
    pub migrate: bool,
    pub backup_maintainer: BackupMaintainer,
    pub guardrail_failure_policy: GuardrailFailurePolicy,
    pub request_timeout: Duration,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn or_default(name: &str, value: Option<String>, default: &str) -> String {
    match non_empty(value) {
        Some(value) => {
            info!("{name} is provided: {value}");
            value
        }
        None => {
            info!("{name} is unspecified: using default value of {default}");
            default.to_string()
        }
    }
}

impl Config {
    pub fn into_settings(self) -> Result<MigrationSettings, ConfigError> {
        let api_key = non_empty(Some(self.api_key)).ok_or(ConfigError::MissingApiKey)?;

        let project_key = or_default("PROJECT_KEY", self.project_key, DEFAULT_PROJECT);
        let env_key = or_default("ENVIRONMENT_KEY", self.env_key, DEFAULT_ENVIRONMENT);
        let host = or_default("LD_HOST", self.host, DEFAULT_HOST);
        let host = parse_host(&host)?;

        let repositories = self.repositories.unwrap_or_default();
        if repositories.is_empty() {
            info!("REPOSITORIES is unspecified: the dependency and code reference guardrails are skipped");
        } else {
            info!("REPOSITORIES is provided: {}", repositories.0.join(","));
        }

        let schema_file = non_empty(self.schema_file);
        let migrate = *self.migrate;
        if migrate && schema_file.is_none() {
            return Err(ConfigError::MigrateWithoutSchema);
        }

        let schema = match schema_file {
            Some(path) => {
                info!("SCHEMA_FILE is provided: {path}");
                Some(AttributeMapping::load(&PathBuf::from(path))?)
            }
            None => {
                info!("SCHEMA_FILE is unspecified: flags will be reported but not migrated");
                None
            }
        };

        if migrate {
            info!("MIGRATE is provided: approval requests will be submitted!");
        } else {
            info!("MIGRATE is unspecified: running a dry-run");
        }

        let backup_maintainer = BackupMaintainer {
            member: non_empty(self.backup_maintainer_member),
            team: non_empty(self.backup_maintainer_team),
        };
        match (&backup_maintainer.member, &backup_maintainer.team) {
            (None, None) => info!("No backup maintainer is configured"),
            (member, team) => info!(
                "Backup maintainer member: {}, team: {}",
                member.as_deref().unwrap_or("n/a"),
                team.as_deref().unwrap_or("n/a")
            ),
        }

        info!(
            "Guardrail lookup failures are treated as {}",
            self.guardrail_lookup_failure
        );

        Ok(MigrationSettings {
            api_key,
            project_key,
            env_key,
            host,
            repositories,
            schema,
            migrate,
            backup_maintainer,
            guardrail_failure_policy: self.guardrail_lookup_failure,
            request_timeout: self.request_timeout.0,
        })
    }
}

// Url::join drops the last path segment unless it ends with a slash
fn parse_host(host: &str) -> Result<Url, ConfigError> {
    let normalized = if host.ends_with('/') {
        host.to_string()
    } else {
        format!("{host}/")
    };
    Url::parse(&normalized).map_err(|source| ConfigError::InvalidHost {
        host: host.to_string(),
        source,
    })
}

impl MigrationSettings {
    /// The mapping schema, if one was supplied and it maps at least one attribute.
    pub fn mapping(&self) -> Option<&AttributeMapping> {
        self.schema.as_ref().filter(|schema| !schema.is_empty())
    }

    pub fn is_dry_run(&self) -> bool {
        !self.migrate
    }

    pub fn log_schema(&self) {
        let Some(schema) = self.mapping() else {
            return;
        };
        info!("Using the following schema mappings:");
        for (user_attribute, target) in schema.iter() {
            info!("  {user_attribute}: {target}");
        }
    }
}
