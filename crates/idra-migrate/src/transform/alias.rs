//! Field mapping and default-value tables, and the alias resolution between
//! source and target field names.
//!
//! Defaults may be keyed by either name of a mapped field. [`AliasResolver`]
//! turns any such key into the pair of names the transformer needs: the record
//! column it fills and the source column it reads.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::schema::{TableSchema, STRIPPED_FIELDS};
use crate::error::{MigrateError, Result};

/// Source field name -> target field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping(BTreeMap<String, String>);

impl FieldMapping {
    /// Load a mapping from a JSON object file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            MigrateError::Config(format!("invalid field mapping {}: {}", path.display(), e))
        })
    }

    /// Iterate `(source, target)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(s, t)| (s.as_str(), t.as_str()))
    }

    /// Target name of a source field.
    pub fn target_of(&self, source: &str) -> Option<&str> {
        self.0.get(source).map(String::as_str)
    }

    /// Source name of a target field.
    pub fn source_of(&self, target: &str) -> Option<&str> {
        self.iter().find(|(_, t)| *t == target).map(|(s, _)| s)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every target must be a column of `schema` or a stripped duplicate, and
    /// no two sources may share a target (reverse lookups would be ambiguous).
    pub fn validate(&self, schema: &TableSchema) -> Result<()> {
        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        for (source, target) in self.iter() {
            if !schema.has_column(target) && !STRIPPED_FIELDS.contains(&target) {
                return Err(MigrateError::Config(format!(
                    "field mapping {} -> {}: {} is not a column of {}",
                    source, target, target, schema.table
                )));
            }
            if let Some(other) = seen.insert(target, source) {
                return Err(MigrateError::Config(format!(
                    "field mapping target {} is mapped from both {} and {}",
                    target, other, source
                )));
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Field name (source or target) -> default value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefaultValues(BTreeMap<String, String>);

impl DefaultValues {
    /// Load defaults from a JSON object file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            MigrateError::Config(format!("invalid default values {}: {}", path.display(), e))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DefaultValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Both names of a field after alias resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedField<'a> {
    /// Record column the value lands in.
    pub target: &'a str,
    /// Source row column the value is read from.
    pub source: &'a str,
}

/// Resolves a field name against a [`FieldMapping`] in both directions.
#[derive(Debug, Clone, Copy)]
pub struct AliasResolver<'a> {
    mapping: &'a FieldMapping,
}

impl<'a> AliasResolver<'a> {
    pub fn new(mapping: &'a FieldMapping) -> Self {
        Self { mapping }
    }

    /// Resolve `key`, checking target names first:
    ///
    /// - a mapped target name reads from its source name,
    /// - a mapped source name lands in its target name,
    /// - an unmapped name is both its own source and target.
    pub fn resolve(&self, key: &'a str) -> ResolvedField<'a> {
        if let Some(source) = self.mapping.source_of(key) {
            ResolvedField {
                target: key,
                source,
            }
        } else if let Some(target) = self.mapping.target_of(key) {
            ResolvedField {
                target,
                source: key,
            }
        } else {
            ResolvedField {
                target: key,
                source: key,
            }
        }
    }
}
