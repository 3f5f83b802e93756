use std::fmt::Display;

/// What happened to a flag that was ready to migrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// No schema was supplied, or nothing in the flag could be mapped.
    Skipped,
    DryRun,
    Submitted,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOutcome {
    NotNeeded,
    Blocked,
    Ready {
        instructions: usize,
        submission: Submission,
    },
}

/// Totals for a run, printed once every flag has been processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    pub total_flags: usize,
    pub ready: usize,
    pub blocked: usize,
    pub not_needed: usize,
    pub failed: usize,
    pub instructions: usize,
    pub submitted: usize,
    pub submission_failures: usize,
    pub schema_supplied: bool,
    pub migrate: bool,
}

impl MigrationSummary {
    pub fn new(total_flags: usize, schema_supplied: bool, migrate: bool) -> Self {
        Self {
            total_flags,
            schema_supplied,
            migrate,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: FlagOutcome) {
        match outcome {
            FlagOutcome::NotNeeded => self.not_needed += 1,
            FlagOutcome::Blocked => self.blocked += 1,
            FlagOutcome::Ready {
                instructions,
                submission,
            } => {
                self.ready += 1;
                self.instructions += instructions;
                match submission {
                    Submission::Submitted => self.submitted += 1,
                    Submission::Failed => self.submission_failures += 1,
                    Submission::Skipped | Submission::DryRun => {}
                }
            }
        }
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }
}

impl Display for MigrationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let submitted_note = if self.migrate && self.submitted > 0 {
            " Approval(s) have been submitted to the flag maintainers for review."
        } else {
            ""
        };

        writeln!(f, "{} flag(s) found.", self.total_flags)?;
        writeln!(
            f,
            " - {} flag(s) contain user targeting and are safe to migrate.{submitted_note}",
            self.ready
        )?;
        writeln!(
            f,
            " - {} flag(s) aren't safe to migrate per the specified guardrails.",
            self.blocked
        )?;
        writeln!(f, " - {} flag(s) do not need to be migrated.", self.not_needed)?;
        if self.failed > 0 {
            writeln!(
                f,
                " - {} flag(s) could not be inspected, see the errors above.",
                self.failed
            )?;
        }

        if self.schema_supplied {
            writeln!(f)?;
            if self.migrate {
                writeln!(
                    f,
                    "This migration automated {} change(s) across {} flag(s).",
                    self.instructions, self.ready
                )?;
                writeln!(
                    f,
                    "{} approval request(s) submitted, {} failed.",
                    self.submitted, self.submission_failures
                )?;
            } else {
                writeln!(
                    f,
                    "This migration would have automated {} change(s) across {} flag(s).",
                    self.instructions, self.ready
                )?;
            }
        }
        Ok(())
    }
}
