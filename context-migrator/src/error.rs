use std::path::PathBuf;

use thiserror::Error;

/// Problems with the process configuration. All of these are fatal and are raised
/// before the first call to the flag service.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration from the environment: {0}")]
    Env(#[from] envconfig::Error),
    #[error("Must supply LD_API_KEY")]
    MissingApiKey,
    #[error("MIGRATE is provided but SCHEMA_FILE is not. SCHEMA_FILE must also be provided to run the migration")]
    MigrateWithoutSchema,
    #[error("invalid LD_HOST '{host}': {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to read schema file {path}")]
    SchemaRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse schema file {path}")]
    SchemaParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid mapping for user attribute '{attribute}': {reason}")]
    InvalidMapping { attribute: String, reason: String },
}

/// Per-flag failures caused by payloads that are not internally consistent.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MigrationError {
    #[error("flag '{flag_key}' references variation index {index} but only has {count} variation(s)")]
    UnknownVariation {
        flag_key: String,
        index: usize,
        count: usize,
    },
    #[error("flag '{flag_key}' has a variation at index {index} without an id")]
    MissingVariationId { flag_key: String, index: usize },
    #[error("flag '{flag_key}' has a rule without an id")]
    MissingRuleId { flag_key: String },
    #[error("flag '{flag_key}' has a clause on attribute '{attribute}' without an id")]
    MissingClauseId { flag_key: String, attribute: String },
}
