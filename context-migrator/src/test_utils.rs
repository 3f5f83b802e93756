use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};

use reqwest::Url;
use serde_json::Value;

use crate::{
    api::{
        client::ClientError,
        models::{ApprovalRequest, FeatureFlag, RepositoryStatistic},
        service::FlagService,
    },
    config::{MigrationSettings, RepositoryAllowList},
    migration::{guardrails::GuardrailFailurePolicy, maintainer::BackupMaintainer},
    schema::{AttributeMapping, AttributeTarget},
};

pub fn flag_from_json(value: Value) -> FeatureFlag {
    serde_json::from_value(value).expect("test flag is valid")
}

pub fn mapping(entries: &[(&str, &str, &str)]) -> AttributeMapping {
    entries
        .iter()
        .map(|(user_attribute, kind, attribute)| {
            (
                *user_attribute,
                AttributeTarget {
                    kind: kind.to_string(),
                    attribute: attribute.to_string(),
                },
            )
        })
        .collect()
}

pub fn test_settings() -> MigrationSettings {
    MigrationSettings {
        api_key: "api-key".to_string(),
        project_key: "default".to_string(),
        env_key: "production".to_string(),
        host: Url::parse("http://localhost/").unwrap(),
        repositories: RepositoryAllowList::default(),
        schema: None,
        migrate: false,
        backup_maintainer: BackupMaintainer::default(),
        guardrail_failure_policy: GuardrailFailurePolicy::Open,
        request_timeout: std::time::Duration::from_secs(1),
    }
}

fn lookup_error() -> ClientError {
    ClientError::InvalidUrl("lookup failed".to_string())
}

/// In-memory flag service. Lookups for unknown flags return empty results.
#[derive(Default)]
pub struct FakeFlagService {
    flags: Vec<FeatureFlag>,
    dependents: HashMap<String, Vec<String>>,
    code_references: HashMap<String, Vec<RepositoryStatistic>>,
    experiments: HashMap<String, u64>,
    fail_guardrail_lookups: bool,
    fail_submissions_for: Vec<String>,

    dependent_flag_calls: Cell<usize>,
    code_reference_calls: Cell<usize>,
    experiment_calls: Cell<usize>,
    submitted: RefCell<Vec<(String, ApprovalRequest)>>,
}

impl FakeFlagService {
    pub fn with_flag(mut self, flag: Value) -> Self {
        self.flags.push(flag_from_json(flag));
        self
    }

    pub fn with_dependents(mut self, flag_key: &str, dependents: &[&str]) -> Self {
        self.dependents.insert(
            flag_key.to_string(),
            dependents.iter().map(|d| d.to_string()).collect(),
        );
        self
    }

    pub fn with_code_references(mut self, flag_key: &str, repos: &[&str]) -> Self {
        self.code_references.insert(
            flag_key.to_string(),
            repos
                .iter()
                .map(|name| RepositoryStatistic {
                    name: name.to_string(),
                    hunk_count: 1,
                    file_count: 1,
                })
                .collect(),
        );
        self
    }

    pub fn with_running_experiments(mut self, flag_key: &str, count: u64) -> Self {
        self.experiments.insert(flag_key.to_string(), count);
        self
    }

    pub fn failing_guardrail_lookups(mut self) -> Self {
        self.fail_guardrail_lookups = true;
        self
    }

    pub fn failing_submission_for(mut self, flag_key: &str) -> Self {
        self.fail_submissions_for.push(flag_key.to_string());
        self
    }

    pub fn dependent_flag_calls(&self) -> usize {
        self.dependent_flag_calls.get()
    }

    pub fn code_reference_calls(&self) -> usize {
        self.code_reference_calls.get()
    }

    pub fn experiment_calls(&self) -> usize {
        self.experiment_calls.get()
    }

    pub fn submitted(&self) -> Vec<(String, ApprovalRequest)> {
        self.submitted.borrow().clone()
    }
}

impl FlagService for FakeFlagService {
    fn list_flags(&self) -> Result<Vec<FeatureFlag>, ClientError> {
        Ok(self.flags.clone())
    }

    fn dependent_flags(&self, flag_key: &str) -> Result<Vec<String>, ClientError> {
        self.dependent_flag_calls.set(self.dependent_flag_calls.get() + 1);
        if self.fail_guardrail_lookups {
            return Err(lookup_error());
        }
        Ok(self.dependents.get(flag_key).cloned().unwrap_or_default())
    }

    fn code_reference_statistics(
        &self,
        flag_key: &str,
    ) -> Result<Vec<RepositoryStatistic>, ClientError> {
        self.code_reference_calls.set(self.code_reference_calls.get() + 1);
        if self.fail_guardrail_lookups {
            return Err(lookup_error());
        }
        Ok(self
            .code_references
            .get(flag_key)
            .cloned()
            .unwrap_or_default())
    }

    fn running_experiments(&self, flag_key: &str) -> Result<u64, ClientError> {
        self.experiment_calls.set(self.experiment_calls.get() + 1);
        if self.fail_guardrail_lookups {
            return Err(lookup_error());
        }
        Ok(self.experiments.get(flag_key).copied().unwrap_or_default())
    }

    fn submit_approval_request(
        &self,
        flag_key: &str,
        request: &ApprovalRequest,
    ) -> Result<(), ClientError> {
        if self.fail_submissions_for.iter().any(|key| key == flag_key) {
            return Err(lookup_error());
        }
        self.submitted
            .borrow_mut()
            .push((flag_key.to_string(), request.clone()));
        Ok(())
    }
}
