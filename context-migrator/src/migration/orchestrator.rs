use tracing::{debug, error, info};

use crate::{
    api::{
        client::ClientError,
        models::{ApprovalRequest, FeatureFlag},
        service::FlagService,
    },
    config::MigrationSettings,
    error::MigrationError,
    migration::{
        guardrails::GuardrailEvaluator,
        inspector::{inspect_flag, FlagDetails},
        instructions::Instruction,
        maintainer::resolve_maintainer,
        report::{FlagOutcome, MigrationSummary, Submission},
        synthesizer::synthesize,
    },
};

/// Walks every flag in the configured project and environment, one at a time.
pub struct Migrator<'a, S: FlagService + ?Sized> {
    settings: &'a MigrationSettings,
    service: &'a S,
    guardrails: GuardrailEvaluator<'a, S>,
}

impl<'a, S: FlagService + ?Sized> Migrator<'a, S> {
    pub fn new(settings: &'a MigrationSettings, service: &'a S) -> Self {
        let guardrails = GuardrailEvaluator::new(
            service,
            &settings.repositories,
            settings.guardrail_failure_policy,
        );
        Self {
            settings,
            service,
            guardrails,
        }
    }

    /// Fails only if the flags themselves can't be fetched. Everything after that is
    /// logged and counted per flag.
    pub fn run(&self) -> Result<MigrationSummary, ClientError> {
        let flags = self.service.list_flags()?;
        info!(
            "Inspecting {} flag(s) for project '{}' and environment '{}'.",
            flags.len(),
            self.settings.project_key,
            self.settings.env_key
        );

        let mut summary = MigrationSummary::new(
            flags.len(),
            self.settings.mapping().is_some(),
            self.settings.migrate,
        );

        for flag in &flags {
            match self.process_flag(flag) {
                Ok(outcome) => summary.record(outcome),
                Err(err) => {
                    error!("Skipping flag '{}': {err}", flag.key);
                    summary.record_failure();
                }
            }
        }

        Ok(summary)
    }

    pub fn process_flag(&self, flag: &FeatureFlag) -> Result<FlagOutcome, MigrationError> {
        let mut details = inspect_flag(flag, &self.settings.env_key)?;
        if !details.targets_users() {
            debug!("Flag '{}' does not target users.", flag.key);
            return Ok(FlagOutcome::NotNeeded);
        }

        details.maintainer = resolve_maintainer(flag, &self.settings.backup_maintainer);
        details.guardrails = self.guardrails.evaluate(&flag.key);

        if details.guardrails_violated() {
            info!(
                "Flag '{}' is not safe to be migrated because of the specified guardrails ({}). It is owned by the {}.",
                flag.key,
                details.guardrails.violations().join(", "),
                details.maintainer
            );
            return Ok(FlagOutcome::Blocked);
        }

        info!(
            "Flag '{}' is safe to be migrated by the {}.",
            flag.key, details.maintainer
        );

        let Some(mapping) = self.settings.mapping() else {
            return Ok(FlagOutcome::Ready {
                instructions: 0,
                submission: Submission::Skipped,
            });
        };

        let instructions = synthesize(&details, mapping)?;
        let count = instructions.len();
        let submission = self.submit(&details, instructions);

        Ok(FlagOutcome::Ready {
            instructions: count,
            submission,
        })
    }

    fn submit(&self, details: &FlagDetails<'_>, instructions: Vec<Instruction>) -> Submission {
        let flag_key = &details.flag.key;

        if instructions.is_empty() {
            info!("  Skipping the approval for flag '{flag_key}' because no mappings were provided.");
            return Submission::Skipped;
        }

        if let Ok(json) = serde_json::to_string(&instructions) {
            debug!("Instructions for flag '{flag_key}': {json}");
        }

        if !self.settings.migrate {
            info!(
                "  Dry run: {} instruction(s) would be submitted for flag '{flag_key}'.",
                instructions.len()
            );
            return Submission::DryRun;
        }

        let request = ApprovalRequest {
            description: format!("Migrating {flag_key} to use custom contexts."),
            instructions,
            notify_member_ids: details.maintainer.notify_member_ids(),
            notify_team_keys: details.maintainer.notify_team_keys(),
        };

        match self.service.submit_approval_request(flag_key, &request) {
            Ok(()) => {
                info!(
                    "  An approval request has been submitted to the {} for flag '{flag_key}'!",
                    details.maintainer
                );
                Submission::Submitted
            }
            Err(err) => {
                error!("Failed to submit an approval request for flag '{flag_key}': {err}");
                Submission::Failed
            }
        }
    }
}
