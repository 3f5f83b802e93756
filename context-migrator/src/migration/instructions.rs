use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Weights keyed by variation id. Ordered so repeated runs serialize identically.
pub type RolloutWeights = BTreeMap<String, u32>;

/// One semantic patch instruction of a flag approval request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Instruction {
    #[serde(rename_all = "camelCase")]
    AddTargets {
        context_kind: String,
        values: Vec<String>,
        variation_id: String,
    },
    #[serde(rename_all = "camelCase")]
    RemoveTargets {
        context_kind: String,
        values: Vec<String>,
        variation_id: String,
    },
    #[serde(rename_all = "camelCase")]
    AddClauses {
        rule_id: String,
        clauses: Vec<NewClause>,
    },
    #[serde(rename_all = "camelCase")]
    RemoveClauses {
        rule_id: String,
        clause_ids: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateRuleVariationOrRollout {
        rule_id: String,
        rollout_context_kind: String,
        rollout_bucket_by: String,
        rollout_weights: RolloutWeights,
    },
    #[serde(rename_all = "camelCase")]
    UpdateFallthroughVariationOrRollout {
        rollout_context_kind: String,
        rollout_bucket_by: String,
        rollout_weights: RolloutWeights,
    },
}

impl Instruction {
    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::AddTargets { .. } => "addTargets",
            Instruction::RemoveTargets { .. } => "removeTargets",
            Instruction::AddClauses { .. } => "addClauses",
            Instruction::RemoveClauses { .. } => "removeClauses",
            Instruction::UpdateRuleVariationOrRollout { .. } => "updateRuleVariationOrRollout",
            Instruction::UpdateFallthroughVariationOrRollout { .. } => {
                "updateFallthroughVariationOrRollout"
            }
        }
    }
}

/// A clause to be added to an existing rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClause {
    pub attribute: String,
    pub context_kind: String,
    pub negate: bool,
    pub op: String,
    pub values: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_serializes_to_wire_format() {
        let instructions = vec![
            Instruction::AddTargets {
                context_kind: "account".to_string(),
                values: vec!["u1".to_string()],
                variation_id: "var-on".to_string(),
            },
            Instruction::AddClauses {
                rule_id: "rule-1".to_string(),
                clauses: vec![NewClause {
                    attribute: "email".to_string(),
                    context_kind: "account".to_string(),
                    negate: false,
                    op: "endsWith".to_string(),
                    values: vec![json!("@example.com")],
                }],
            },
            Instruction::RemoveClauses {
                rule_id: "rule-1".to_string(),
                clause_ids: vec!["clause-1".to_string()],
            },
            Instruction::UpdateRuleVariationOrRollout {
                rule_id: "rule-1".to_string(),
                rollout_context_kind: "account".to_string(),
                rollout_bucket_by: "id".to_string(),
                rollout_weights: BTreeMap::from([
                    ("var-on".to_string(), 25000),
                    ("var-off".to_string(), 75000),
                ]),
            },
        ];

        assert_eq!(
            serde_json::to_value(&instructions).unwrap(),
            json!([
                {
                    "kind": "addTargets",
                    "contextKind": "account",
                    "values": ["u1"],
                    "variationId": "var-on"
                },
                {
                    "kind": "addClauses",
                    "ruleId": "rule-1",
                    "clauses": [{
                        "attribute": "email",
                        "contextKind": "account",
                        "negate": false,
                        "op": "endsWith",
                        "values": ["@example.com"]
                    }]
                },
                {
                    "kind": "removeClauses",
                    "ruleId": "rule-1",
                    "clauseIds": ["clause-1"]
                },
                {
                    "kind": "updateRuleVariationOrRollout",
                    "ruleId": "rule-1",
                    "rolloutContextKind": "account",
                    "rolloutBucketBy": "id",
                    "rolloutWeights": {"var-off": 75000, "var-on": 25000}
                }
            ])
        );
    }

    #[test]
    fn test_kind_matches_serialized_tag() {
        let instruction = Instruction::UpdateFallthroughVariationOrRollout {
            rollout_context_kind: "account".to_string(),
            rollout_bucket_by: "email".to_string(),
            rollout_weights: RolloutWeights::new(),
        };
        let value = serde_json::to_value(&instruction).unwrap();
        assert_eq!(value["kind"], json!(instruction.kind()));
    }
}
