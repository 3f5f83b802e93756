use std::fmt::Display;

use crate::api::models::FeatureFlag;

/// Who to notify when a flag has no maintainer of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupMaintainer {
    pub member: Option<String>,
    pub team: Option<String>,
}

/// The person or team accountable for approving a flag's migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Maintainer {
    Member { email: String, id: String },
    Team(String),
    BackupMember(String),
    BackupTeam(String),
    Undefined,
}

impl Maintainer {
    pub fn kind(&self) -> &'static str {
        match self {
            Maintainer::Member { .. } => "member",
            Maintainer::Team(_) => "team",
            Maintainer::BackupMember(_) => "backup member",
            Maintainer::BackupTeam(_) => "backup team",
            Maintainer::Undefined => "undefined",
        }
    }

    /// The human readable name used in the report.
    pub fn identifier(&self) -> &str {
        match self {
            Maintainer::Member { email, .. } => email,
            Maintainer::Team(key) | Maintainer::BackupTeam(key) => key,
            Maintainer::BackupMember(id) => id,
            Maintainer::Undefined => "n/a",
        }
    }

    pub fn notify_member_ids(&self) -> Vec<String> {
        match self {
            Maintainer::Member { id, .. } | Maintainer::BackupMember(id) => vec![id.clone()],
            _ => Vec::new(),
        }
    }

    pub fn notify_team_keys(&self) -> Vec<String> {
        match self {
            Maintainer::Team(key) | Maintainer::BackupTeam(key) => vec![key.clone()],
            _ => Vec::new(),
        }
    }
}

impl Display for Maintainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} maintainer ({})", self.kind(), self.identifier())
    }
}

/// Picks the flag's member maintainer, then its team, then the configured backups.
/// Members win over teams at every tier.
pub fn resolve_maintainer(flag: &FeatureFlag, backup: &BackupMaintainer) -> Maintainer {
    if let Some(id) = flag.maintainer_id.as_ref().filter(|id| !id.is_empty()) {
        let email = flag
            .maintainer
            .as_ref()
            .map(|member| member.email.clone())
            .filter(|email| !email.is_empty())
            .unwrap_or_else(|| id.clone());
        return Maintainer::Member {
            email,
            id: id.clone(),
        };
    }

    if let Some(team) = flag
        .maintainer_team_key
        .as_ref()
        .filter(|key| !key.is_empty())
    {
        return Maintainer::Team(team.clone());
    }

    if let Some(member) = &backup.member {
        return Maintainer::BackupMember(member.clone());
    }

    if let Some(team) = &backup.team {
        return Maintainer::BackupTeam(team.clone());
    }

    Maintainer::Undefined
}
