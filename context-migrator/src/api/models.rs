use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::MigrationError, migration::instructions::Instruction};

/// The legacy context kind. Payloads written before context kinds existed omit the
/// field entirely, which means the same thing.
pub const USER_KIND: &str = "user";

fn user_kind() -> String {
    USER_KIND.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlag {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub variations: Vec<Variation>,
    #[serde(default)]
    pub environments: HashMap<String, FlagConfig>,
    #[serde(default)]
    pub maintainer_id: Option<String>,
    #[serde(default, rename = "_maintainer")]
    pub maintainer: Option<MemberSummary>,
    #[serde(default)]
    pub maintainer_team_key: Option<String>,
}

impl FeatureFlag {
    pub fn environment(&self, env_key: &str) -> Option<&FlagConfig> {
        self.environments.get(env_key)
    }

    /// Resolves a positional variation index to the variation's stable id. Instructions
    /// always reference variations by id, so this is the only place indexes are trusted.
    pub fn variation_id(&self, index: usize) -> Result<&str, MigrationError> {
        let variation = self
            .variations
            .get(index)
            .ok_or_else(|| MigrationError::UnknownVariation {
                flag_key: self.key.clone(),
                index,
                count: self.variations.len(),
            })?;

        variation
            .id
            .as_deref()
            .ok_or_else(|| MigrationError::MissingVariationId {
                flag_key: self.key.clone(),
                index,
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Variation {
    #[serde(default, rename = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemberSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub email: String,
}

/// A flag's targeting state within a single environment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FlagConfig {
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub fallthrough: Option<VariationOrRollout>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(default)]
    pub values: Vec<String>,
    pub variation: usize,
    #[serde(default = "user_kind")]
    pub context_kind: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Rule {
    #[serde(default, rename = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub clauses: Vec<Clause>,
    #[serde(default)]
    pub variation: Option<usize>,
    #[serde(default)]
    pub rollout: Option<Rollout>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Clause {
    #[serde(default, rename = "_id")]
    pub id: Option<String>,
    pub attribute: String,
    pub op: String,
    #[serde(default)]
    pub values: Vec<Value>,
    #[serde(default = "user_kind")]
    pub context_kind: String,
    #[serde(default)]
    pub negate: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VariationOrRollout {
    #[serde(default)]
    pub variation: Option<usize>,
    #[serde(default)]
    pub rollout: Option<Rollout>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rollout {
    #[serde(default)]
    pub variations: Vec<WeightedVariation>,
    #[serde(default)]
    pub bucket_by: Option<String>,
    #[serde(default = "user_kind")]
    pub context_kind: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeightedVariation {
    pub variation: usize,
    pub weight: u32,
    #[serde(default, rename = "_untracked")]
    pub untracked: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlagPage {
    #[serde(default)]
    pub items: Vec<FeatureFlag>,
    #[serde(default)]
    pub total_count: Option<usize>,
    #[serde(default, rename = "_links")]
    pub links: HashMap<String, Link>,
}

impl FeatureFlagPage {
    pub fn has_next(&self) -> bool {
        self.links.contains_key("next")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DependentFlag {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DependentFlagList {
    #[serde(default)]
    pub items: Vec<DependentFlag>,
}

/// Code reference counts for one repository.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStatistic {
    pub name: String,
    #[serde(default)]
    pub hunk_count: u64,
    #[serde(default)]
    pub file_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeReferenceStatistics {
    #[serde(default)]
    pub flags: HashMap<String, Vec<RepositoryStatistic>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Experiment {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentList {
    #[serde(default)]
    pub items: Vec<Experiment>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

impl ExperimentList {
    pub fn running_count(&self) -> u64 {
        self.total_count.unwrap_or(self.items.len() as u64)
    }
}

/// Body of a flag configuration approval request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub description: String,
    pub instructions: Vec<Instruction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notify_member_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notify_team_keys: Vec<String>,
}
