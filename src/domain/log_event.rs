use super::facility::Facility;
use super::severity::{Priority, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Structured-data section of a syslog record.
///
/// `Elements` maps an SD-ID to its parameters; a `BTreeMap` keeps rendering
/// deterministic since insertion order carries no meaning. `Raw` is emitted
/// verbatim and exists so callers can pass a pre-rendered section (or `-`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StructuredData {
    Raw(String),
    Elements(BTreeMap<String, BTreeMap<String, String>>),
}

impl StructuredData {
    pub const NIL: &'static str = "-";

    pub fn nil() -> Self {
        StructuredData::Raw(Self::NIL.to_string())
    }

    /// Adds (or replaces) one parameter of the element `id`.
    ///
    /// A `Raw` value is discarded in favour of an element map.
    #[must_use]
    pub fn with_param(self, id: &str, name: &str, value: impl Into<String>) -> Self {
        let mut elements = match self {
            StructuredData::Elements(elements) => elements,
            StructuredData::Raw(_) => BTreeMap::new(),
        };
        elements
            .entry(id.to_string())
            .or_default()
            .insert(name.to_string(), value.into());
        StructuredData::Elements(elements)
    }

    pub fn is_nil(&self) -> bool {
        match self {
            StructuredData::Raw(raw) => raw.is_empty() || raw == Self::NIL,
            StructuredData::Elements(elements) => elements.is_empty(),
        }
    }
}

/// Input shape accepted from TOML and JSON before parameter values are
/// flattened to strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum StructuredDataInput {
    Raw(String),
    Groups(BTreeMap<String, serde_json::Value>),
}

impl StructuredData {
    /// Top-level entries that are not objects are skipped; scalar parameter
    /// values are stringified (`{"a": {"n": 3}}` yields `n="3"`).
    fn from_groups(groups: BTreeMap<String, serde_json::Value>) -> Self {
        let elements = groups
            .into_iter()
            .filter_map(|(id, value)| match value {
                serde_json::Value::Object(params) => Some((
                    id,
                    params
                        .into_iter()
                        .map(|(name, value)| match value {
                            serde_json::Value::String(text) => (name, text),
                            other => (name, other.to_string()),
                        })
                        .collect(),
                )),
                _ => None,
            })
            .collect();
        StructuredData::Elements(elements)
    }
}

impl<'de> Deserialize<'de> for StructuredData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match StructuredDataInput::deserialize(deserializer)? {
            StructuredDataInput::Raw(raw) => StructuredData::Raw(raw),
            StructuredDataInput::Groups(groups) => StructuredData::from_groups(groups),
        })
    }
}

impl Default for StructuredData {
    fn default() -> Self {
        Self::nil()
    }
}

/// Parses either a JSON object of objects or a pre-rendered section.
impl FromStr for StructuredData {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if !trimmed.starts_with('{') {
            return Ok(StructuredData::Raw(trimmed.to_string()));
        }

        let groups: BTreeMap<String, serde_json::Value> = serde_json::from_str(trimmed)?;
        Ok(StructuredData::from_groups(groups))
    }
}

/// One log call with every field resolved, ready for the encoder.
///
/// Built once per facade call from the per-call parameters merged with the
/// appender defaults; never retained after encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub message: String,
    pub facility: Facility,
    pub severity: Severity,
    pub app_name: String,
    pub proc_id: String,
    pub msg_id: String,
    pub structured_data: StructuredData,
    pub timestamp: DateTime<Utc>,
    pub eol: String,
    pub hostname: String,
}

impl LogEvent {
    pub fn priority(&self) -> Priority {
        Priority::new(self.facility, self.severity)
    }
}
