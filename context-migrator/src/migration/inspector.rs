use tracing::debug;

use crate::{
    api::models::{Clause, FeatureFlag, Rollout, Target, USER_KIND},
    error::MigrationError,
    migration::{guardrails::GuardrailReport, maintainer::Maintainer},
};

/// An individual targets list for the user context kind.
#[derive(Debug, Clone)]
pub struct TargetRef<'a> {
    pub target: &'a Target,
    pub variation_id: &'a str,
}

/// The user kind clauses of one rule, and its rollout if it has one.
#[derive(Debug, Clone)]
pub struct RuleRef<'a> {
    pub rule_id: &'a str,
    pub clauses: Vec<&'a Clause>,
    pub rollout: Option<&'a Rollout>,
}

/// Everything about one flag that matters to the migration. Built fresh for every
/// flag and dropped once the flag has been processed.
#[derive(Debug, Clone)]
pub struct FlagDetails<'a> {
    pub flag: &'a FeatureFlag,
    pub targets: Vec<TargetRef<'a>>,
    pub rules: Vec<RuleRef<'a>>,
    pub fallthrough_rollout: Option<&'a Rollout>,
    pub guardrails: GuardrailReport,
    pub maintainer: Maintainer,
}

impl FlagDetails<'_> {
    /// True if the flag references the user context kind anywhere in its targeting.
    pub fn targets_users(&self) -> bool {
        !self.targets.is_empty() || !self.rules.is_empty() || self.fallthrough_rollout.is_some()
    }

    pub fn guardrails_violated(&self) -> bool {
        self.guardrails.is_violated()
    }
}

/// Collects every user kind reference in the flag's targeting for `env_key`.
pub fn inspect_flag<'a>(
    flag: &'a FeatureFlag,
    env_key: &str,
) -> Result<FlagDetails<'a>, MigrationError> {
    let mut details = FlagDetails {
        flag,
        targets: Vec::new(),
        rules: Vec::new(),
        fallthrough_rollout: None,
        guardrails: GuardrailReport::default(),
        maintainer: Maintainer::Undefined,
    };

    let Some(config) = flag.environment(env_key) else {
        debug!(
            "flag '{}' has no configuration for environment '{env_key}'",
            flag.key
        );
        return Ok(details);
    };

    for target in &config.targets {
        if target.context_kind == USER_KIND {
            details.targets.push(TargetRef {
                target,
                variation_id: flag.variation_id(target.variation)?,
            });
        }
    }

    for rule in &config.rules {
        let clauses: Vec<&Clause> = rule
            .clauses
            .iter()
            .filter(|clause| clause.context_kind == USER_KIND)
            .collect();

        // Rollouts bucket on their own attribute, so they count whatever kind the clauses use
        if clauses.is_empty() && rule.rollout.is_none() {
            continue;
        }

        let rule_id = rule
            .id
            .as_deref()
            .ok_or_else(|| MigrationError::MissingRuleId {
                flag_key: flag.key.clone(),
            })?;

        details.rules.push(RuleRef {
            rule_id,
            clauses,
            rollout: rule.rollout.as_ref(),
        });
    }

    details.fallthrough_rollout = config
        .fallthrough
        .as_ref()
        .and_then(|fallthrough| fallthrough.rollout.as_ref())
        .filter(|rollout| rollout.context_kind == USER_KIND);

    Ok(details)
}
