pub mod guardrails;
pub mod inspector;
pub mod instructions;
pub mod maintainer;
pub mod orchestrator;
pub mod report;
pub mod synthesizer;

pub use orchestrator::Migrator;
pub use report::MigrationSummary;
