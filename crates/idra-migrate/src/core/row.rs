//! Source rows as exported from the offline store.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// One exported row: column name to textual value.
///
/// Snapshots are text-typed, so numbers and NULLs found in a snapshot file are
/// read back as their decimal text and the empty string respectively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SourceRow(BTreeMap<String, String>);

impl SourceRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value of a column, including empty strings.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// Value of a column, treating the empty string as missing.
    pub fn get_non_empty(&self, column: &str) -> Option<&str> {
        self.get(column).filter(|v| !v.is_empty())
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SourceRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for SourceRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(k, v)| {
                let text = match v {
                    serde_json::Value::Null => String::new(),
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, text)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_coerces_to_text() {
        let row: SourceRow =
            serde_json::from_str(r#"{"ID": 7, "unit": "alpha", "comment": null, "ok": true}"#)
                .unwrap();
        assert_eq!(row.get("ID"), Some("7"));
        assert_eq!(row.get("unit"), Some("alpha"));
        assert_eq!(row.get("comment"), Some(""));
        assert_eq!(row.get_non_empty("comment"), None);
        assert_eq!(row.get("ok"), Some("true"));
    }

    #[test]
    fn test_from_iter() {
        let row: SourceRow = [("a", "1"), ("b", "")].into_iter().collect();
        assert_eq!(row.len(), 2);
        assert!(row.contains("b"));
        assert_eq!(row.get_non_empty("a"), Some("1"));
    }
}
