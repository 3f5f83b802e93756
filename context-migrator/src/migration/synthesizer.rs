use tracing::{info, warn};

use crate::{
    api::models::{Clause, FeatureFlag, Rollout, USER_KIND},
    error::MigrationError,
    migration::{
        inspector::{FlagDetails, RuleRef, TargetRef},
        instructions::{Instruction, NewClause, RolloutWeights},
    },
    schema::{AttributeMapping, AttributeTarget},
};

/// The attribute individual targets and unbucketed rollouts are keyed on.
pub const KEY_ATTRIBUTE: &str = "key";

/// Clause attributes that are never migrated. Segment matches are handled with segments,
/// and `kind` only exists on contexts.
pub const IGNORED_ATTRIBUTES: [&str; 3] = ["segmentMatch", "not-segmentMatch", "kind"];

#[derive(Debug, Clone, Copy)]
enum RolloutScope<'a> {
    Rule(&'a str),
    Fallthrough,
}

impl RolloutScope<'_> {
    fn describe(&self) -> &'static str {
        match self {
            RolloutScope::Rule(_) => "a rule",
            RolloutScope::Fallthrough => "the fallthrough",
        }
    }
}

/// Builds the instructions that move a flag's user targeting onto the mapped context
/// kinds. Targets come first, then each rule in order (clauses, then rollout), then the
/// fallthrough rollout. Every add is paired with the remove of what it replaces.
pub fn synthesize(
    details: &FlagDetails<'_>,
    mapping: &AttributeMapping,
) -> Result<Vec<Instruction>, MigrationError> {
    let flag = details.flag;
    let mut instructions = Vec::new();

    for target in &details.targets {
        instructions.extend(target_instructions(target, mapping));
    }

    for rule in &details.rules {
        instructions.extend(clause_instructions(flag, rule, mapping)?);

        if let Some(rollout) = rule.rollout {
            let scope = RolloutScope::Rule(rule.rule_id);
            instructions.extend(rollout_instruction(flag, rollout, scope, mapping)?);
        }
    }

    if let Some(rollout) = details.fallthrough_rollout {
        instructions.extend(rollout_instruction(
            flag,
            rollout,
            RolloutScope::Fallthrough,
            mapping,
        )?);
    }

    Ok(instructions)
}

fn target_instructions(target: &TargetRef<'_>, mapping: &AttributeMapping) -> Vec<Instruction> {
    let Some(mapped) = mapping.get(KEY_ATTRIBUTE) else {
        warn!("  Skipping individual user targets because no '{KEY_ATTRIBUTE}' mapping was provided.");
        return Vec::new();
    };

    info!(
        "  Adding instructions to replace individual user targets with individual '{}' targets.",
        mapped.kind
    );
    vec![
        Instruction::AddTargets {
            context_kind: mapped.kind.clone(),
            values: target.target.values.clone(),
            variation_id: target.variation_id.to_string(),
        },
        Instruction::RemoveTargets {
            context_kind: USER_KIND.to_string(),
            values: target.target.values.clone(),
            variation_id: target.variation_id.to_string(),
        },
    ]
}

fn clause_instructions(
    flag: &FeatureFlag,
    rule: &RuleRef<'_>,
    mapping: &AttributeMapping,
) -> Result<Vec<Instruction>, MigrationError> {
    let mut to_add = Vec::new();
    let mut to_remove = Vec::new();
    let mut unmapped = Vec::new();

    for clause in rule
        .clauses
        .iter()
        .filter(|clause| !IGNORED_ATTRIBUTES.contains(&clause.attribute.as_str()))
    {
        let Some(mapped) = mapping.get(&clause.attribute) else {
            unmapped.push(clause.attribute.as_str());
            continue;
        };

        let clause_id = clause
            .id
            .clone()
            .ok_or_else(|| MigrationError::MissingClauseId {
                flag_key: flag.key.clone(),
                attribute: clause.attribute.clone(),
            })?;
        to_add.push(translate_clause(clause, mapped));
        to_remove.push(clause_id);
    }

    // Half a rule migrated would match a different audience than either version
    if !unmapped.is_empty() {
        warn!(
            "  Skipping the clauses of rule '{}' because no mapping was provided for user attribute(s): {}.",
            rule.rule_id,
            unmapped.join(", ")
        );
        return Ok(Vec::new());
    }

    if to_add.is_empty() || to_remove.is_empty() {
        return Ok(Vec::new());
    }

    for clause in &to_add {
        info!(
            "  Adding instructions to replace a rule clause for a user attribute with a rule clause for '{}' attribute '{}'.",
            clause.context_kind, clause.attribute
        );
    }

    Ok(vec![
        Instruction::AddClauses {
            rule_id: rule.rule_id.to_string(),
            clauses: to_add,
        },
        Instruction::RemoveClauses {
            rule_id: rule.rule_id.to_string(),
            clause_ids: to_remove,
        },
    ])
}

fn translate_clause(clause: &Clause, mapped: &AttributeTarget) -> NewClause {
    NewClause {
        attribute: mapped.attribute.clone(),
        context_kind: mapped.kind.clone(),
        negate: clause.negate,
        op: clause.op.clone(),
        values: clause.values.clone(),
    }
}

fn rollout_instruction(
    flag: &FeatureFlag,
    rollout: &Rollout,
    scope: RolloutScope<'_>,
    mapping: &AttributeMapping,
) -> Result<Option<Instruction>, MigrationError> {
    let rollout_type = scope.describe();

    if rollout.context_kind != USER_KIND {
        info!(
            "  Skipping {rollout_type} rollout because it already buckets by the '{}' context kind.",
            rollout.context_kind
        );
        return Ok(None);
    }

    let attribute = rollout.bucket_by.as_deref().unwrap_or(KEY_ATTRIBUTE);
    let Some(mapped) = mapping.get(attribute) else {
        warn!("  Skipping {rollout_type} rollout for user attribute '{attribute}' because no mapping was provided.");
        return Ok(None);
    };

    info!(
        "  Adding an instruction to replace {rollout_type} rollout for user attribute '{attribute}' with {rollout_type} rollout for '{}' attribute '{}'.",
        mapped.kind, mapped.attribute
    );

    let rollout_weights = rollout_weights(flag, rollout)?;
    let instruction = match scope {
        RolloutScope::Rule(rule_id) => Instruction::UpdateRuleVariationOrRollout {
            rule_id: rule_id.to_string(),
            rollout_context_kind: mapped.kind.clone(),
            rollout_bucket_by: mapped.attribute.clone(),
            rollout_weights,
        },
        RolloutScope::Fallthrough => Instruction::UpdateFallthroughVariationOrRollout {
            rollout_context_kind: mapped.kind.clone(),
            rollout_bucket_by: mapped.attribute.clone(),
            rollout_weights,
        },
    };
    Ok(Some(instruction))
}

fn rollout_weights(flag: &FeatureFlag, rollout: &Rollout) -> Result<RolloutWeights, MigrationError> {
    let mut weights = RolloutWeights::new();
    for weighted in &rollout.variations {
        let id = flag.variation_id(weighted.variation)?;
        *weights.entry(id.to_string()).or_default() += weighted.weight;
    }
    Ok(weights)
}
