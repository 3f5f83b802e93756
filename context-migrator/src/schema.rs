use std::{collections::BTreeMap, fmt::Display, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Where a user attribute lives once it has been moved onto a custom context kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttributeTarget {
    pub kind: String,
    pub attribute: String,
}

impl Display for AttributeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.kind, self.attribute)
    }
}

/// Maps user attribute names to their new context kind and attribute. A user attribute
/// without an entry is never migrated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AttributeMapping(BTreeMap<String, AttributeTarget>);

impl AttributeMapping {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::SchemaRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|err| match err {
            SchemaError::Yaml(source) => ConfigError::SchemaParse {
                path: path.to_path_buf(),
                source,
            },
            SchemaError::Invalid(err) => err,
        })
    }

    fn parse(contents: &str) -> Result<Self, SchemaError> {
        // serde_yaml reads an empty document as null rather than an empty map
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let mapping: Self = serde_yaml::from_str(contents).map_err(SchemaError::Yaml)?;
        mapping.validate().map_err(SchemaError::Invalid)?;
        Ok(mapping)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (attribute, target) in &self.0 {
            let reason = if target.kind.trim().is_empty() {
                "kind must not be empty"
            } else if target.attribute.trim().is_empty() {
                "attribute must not be empty"
            } else {
                continue;
            };
            return Err(ConfigError::InvalidMapping {
                attribute: attribute.clone(),
                reason: reason.to_string(),
            });
        }
        Ok(())
    }

    pub fn get(&self, user_attribute: &str) -> Option<&AttributeTarget> {
        self.0.get(user_attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeTarget)> {
        self.0.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, AttributeTarget)> for AttributeMapping {
    fn from_iter<I: IntoIterator<Item = (K, AttributeTarget)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug)]
enum SchemaError {
    Yaml(serde_yaml::Error),
    Invalid(ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schema() {
        let mapping = AttributeMapping::parse(
            r#"
key:
  kind: account
  attribute: id
email:
  kind: account
  attribute: email
"#,
        )
        .unwrap();

        assert_eq!(mapping.len(), 2);
        assert_eq!(
            mapping.get("key"),
            Some(&AttributeTarget {
                kind: "account".to_string(),
                attribute: "id".to_string()
            })
        );
        assert!(mapping.get("country").is_none());
        // Sorted by user attribute
        let keys: Vec<_> = mapping.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["email", "key"]);
    }

    #[test]
    fn test_empty_schema_is_empty_mapping() {
        assert!(AttributeMapping::parse("").unwrap().is_empty());
        assert!(AttributeMapping::parse("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_schema_is_rejected() {
        assert!(matches!(
            AttributeMapping::parse("key: account"),
            Err(SchemaError::Yaml(_))
        ));
        assert!(matches!(
            AttributeMapping::parse("key:\n  kind: account\n"),
            Err(SchemaError::Yaml(_))
        ));
    }

    #[test]
    fn test_blank_target_is_rejected() {
        let result = AttributeMapping::parse("key:\n  kind: ''\n  attribute: id\n");
        match result {
            Err(SchemaError::Invalid(ConfigError::InvalidMapping { attribute, reason })) => {
                assert_eq!(attribute, "key");
                assert_eq!(reason, "kind must not be empty");
            }
            _ => panic!("expected an invalid mapping error"),
        }
    }

    #[test]
    fn test_display_target() {
        let target = AttributeTarget {
            kind: "account".to_string(),
            attribute: "email".to_string(),
        };
        assert_eq!(target.to_string(), "account.email");
    }
}
