use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Stand-in login for contributors GitHub only knows by email
pub const ANONYMOUS_USERNAME: &str = "anonymous";
/// Stand-in account type when the API leaves it out
pub const ANONYMOUS_ACCOUNT_TYPE: &str = "Anonymous";

/// One repository from a search, optionally enriched with its contributors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// GitHub's numeric id, stable across renames. Dedup key.
    pub id: u64,
    #[serde(rename = "name")]
    pub full_name: String,
    pub stars: u32,
    pub forks: u32,
    pub last_updated: String,
    /// Never null; missing descriptions become ""
    pub description: String,
    pub topics: Vec<String>,
    pub url: String,
    /// Outer `None` drops the key (blockchain search). `Some(None)` is a
    /// language-scoped hit GitHub has no language for and writes `null`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_field"
    )]
    pub language: Option<Option<String>>,
    /// `None` unless contributor enrichment was requested
    #[serde(default)]
    pub contributors: Option<Vec<ContributorRecord>>,
    /// True only when every contributor page came back without error
    #[serde(default, rename = "all_contributors_fetched")]
    pub contributors_complete: bool,
}

impl RepositoryRecord {
    /// Up to `n` contributors ranked by contribution count, ties in source order
    pub fn top_contributors(&self, n: usize) -> Vec<&ContributorRecord> {
        let mut ranked: Vec<&ContributorRecord> =
            self.contributors.iter().flatten().collect();
        ranked.sort_by(|a, b| b.contributions.cmp(&a.contributions));
        ranked.truncate(n);
        ranked
    }
}

/// A key that is present deserializes to `Some`, even when its value is `null`
fn present_field<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorRecord {
    pub username: String,
    pub contributions: u64,
    #[serde(rename = "profile")]
    pub profile_url: String,
    #[serde(rename = "type")]
    pub account_type: String,
    /// Set when contributors from many repos get flattened into one export
    #[serde(default, rename = "repo", skip_serializing_if = "Option::is_none")]
    pub source_repo: Option<String>,
}

/// A scalar cell in a protocol row.
///
/// Nested arrays and objects are kept as their compact JSON text so every
/// value fits in a single CSV cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => FieldValue::Number(n),
            Value::String(s) => FieldValue::Text(s),
            nested @ (Value::Array(_) | Value::Object(_)) => FieldValue::Text(nested.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// One DeFi protocol with whatever fields the aggregator sent for it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolRecord {
    pub fields: BTreeMap<String, FieldValue>,
}

impl ProtocolRecord {
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Cell text for `key`; absent and null both render empty
    pub fn cell(&self, key: &str) -> String {
        self.get(key).map(|v| v.to_string()).unwrap_or_default()
    }
}

impl FromIterator<(String, Value)> for ProtocolRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }
}
