use std::{fmt::Display, str::FromStr};

use tracing::{error, warn};

use crate::{api::service::FlagService, config::RepositoryAllowList};

/// What a guardrail reports when the lookup behind it fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GuardrailFailurePolicy {
    /// The check is reported as passing. Keeps the tool usable when an optional
    /// feature such as code references is unavailable on the account.
    #[default]
    Open,
    /// The check is reported as violated and the flag is blocked.
    Closed,
}

impl FromStr for GuardrailFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" | "fail-open" => Ok(GuardrailFailurePolicy::Open),
            "closed" | "fail-closed" => Ok(GuardrailFailurePolicy::Closed),
            _ => Err(format!("Invalid guardrail failure policy: {}", s)),
        }
    }
}

impl Display for GuardrailFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardrailFailurePolicy::Open => write!(f, "passing (fail-open)"),
            GuardrailFailurePolicy::Closed => write!(f, "violated (fail-closed)"),
        }
    }
}

/// Which guardrails a flag trips. Any single one makes the flag unsafe to migrate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardrailReport {
    /// Another flag in the environment uses this flag as a prerequisite.
    pub dependent_flags: bool,
    /// Code references exist outside the allow-listed repositories, or none exist at all.
    pub unvetted_code_references: bool,
    /// The flag is part of a running experiment.
    pub running_experiment: bool,
}

impl GuardrailReport {
    pub fn is_violated(&self) -> bool {
        self.dependent_flags || self.unvetted_code_references || self.running_experiment
    }

    pub fn violations(&self) -> Vec<&'static str> {
        let mut violations = Vec::new();
        if self.dependent_flags {
            violations.push("dependent flags");
        }
        if self.unvetted_code_references {
            violations.push("code references");
        }
        if self.running_experiment {
            violations.push("running experiment");
        }
        violations
    }
}

pub struct GuardrailEvaluator<'a, S: FlagService + ?Sized> {
    service: &'a S,
    repositories: &'a RepositoryAllowList,
    policy: GuardrailFailurePolicy,
}

impl<'a, S: FlagService + ?Sized> GuardrailEvaluator<'a, S> {
    pub fn new(
        service: &'a S,
        repositories: &'a RepositoryAllowList,
        policy: GuardrailFailurePolicy,
    ) -> Self {
        Self {
            service,
            repositories,
            policy,
        }
    }

    pub fn evaluate(&self, flag_key: &str) -> GuardrailReport {
        GuardrailReport {
            dependent_flags: self.has_dependent_flags(flag_key),
            unvetted_code_references: self.is_referenced_in_unvetted_repository(flag_key),
            running_experiment: self.is_in_running_experiment(flag_key),
        }
    }

    fn has_dependent_flags(&self, flag_key: &str) -> bool {
        // Without an allow-list every flag in the environment is deemed safe
        if self.repositories.is_empty() {
            return false;
        }

        match self.service.dependent_flags(flag_key) {
            Ok(dependents) => {
                if !dependents.is_empty() {
                    warn!(
                        "Flag '{flag_key}' is a prerequisite of: {}",
                        dependents.join(", ")
                    );
                }
                !dependents.is_empty()
            }
            Err(err) => {
                error!("Failed to fetch dependent flags for '{flag_key}': {err}");
                self.on_lookup_failure()
            }
        }
    }

    fn is_referenced_in_unvetted_repository(&self, flag_key: &str) -> bool {
        if self.repositories.is_empty() {
            return false;
        }

        let stats = match self.service.code_reference_statistics(flag_key) {
            Ok(stats) => stats,
            Err(err) => {
                error!("Failed to fetch code reference statistics for '{flag_key}': {err}");
                warn!("Code references is an Enterprise feature. Your account must be on an Enterprise plan to use this guardrail.");
                return self.on_lookup_failure();
            }
        };

        // No references anywhere tells us nothing about whether the flag is safe
        if stats.is_empty() {
            warn!("Flag '{flag_key}' has no code references in any repository");
            return true;
        }

        let unvetted: Vec<&str> = stats
            .iter()
            .filter(|stat| !self.repositories.contains(&stat.name))
            .map(|stat| stat.name.as_str())
            .collect();
        if !unvetted.is_empty() {
            warn!(
                "Flag '{flag_key}' is referenced in repositories outside the allow-list: {}",
                unvetted.join(", ")
            );
        }
        !unvetted.is_empty()
    }

    fn is_in_running_experiment(&self, flag_key: &str) -> bool {
        match self.service.running_experiments(flag_key) {
            Ok(count) => {
                if count > 0 {
                    warn!("Flag '{flag_key}' is used in {count} running experiment(s)");
                }
                count > 0
            }
            Err(err) => {
                error!("Failed to fetch running experiments for '{flag_key}': {err}");
                warn!("Experimentation is an opt-in feature. Your account must have Experimentation enabled to use this guardrail.");
                self.on_lookup_failure()
            }
        }
    }

    fn on_lookup_failure(&self) -> bool {
        self.policy == GuardrailFailurePolicy::Closed
    }
}
