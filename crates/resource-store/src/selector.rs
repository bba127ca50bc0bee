//! Label selectors
//!
//! A small typed model of the Kubernetes label-selector syntax. Selectors are
//! rendered to strings for `ListParams::labels` and can also be evaluated
//! directly against a label map.

use std::collections::BTreeMap;
use std::fmt;

/// A single label requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// `key=value`
    Equals(String, String),
    /// `key!=value`; matches objects without the label as well
    NotEquals(String, String),
    /// `key`; the label must be present
    Exists(String),
}

impl Requirement {
    /// Whether the given labels satisfy this requirement
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Requirement::Equals(key, value) => labels.get(key) == Some(value),
            Requirement::NotEquals(key, value) => labels.get(key) != Some(value),
            Requirement::Exists(key) => labels.contains_key(key),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Equals(key, value) => write!(f, "{key}={value}"),
            Requirement::NotEquals(key, value) => write!(f, "{key}!={value}"),
            Requirement::Exists(key) => write!(f, "{key}"),
        }
    }
}

/// A conjunction of label requirements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    /// An empty selector (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// A selector requiring every given label to be present with the given value
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Self {
        labels
            .iter()
            .fold(Self::new(), |selector, (key, value)| selector.equals(key, value))
    }

    /// Add a `key=value` requirement
    pub fn equals(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements
            .push(Requirement::Equals(key.into(), value.into()));
        self
    }

    /// Add a `key!=value` requirement
    pub fn not_equals(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements
            .push(Requirement::NotEquals(key.into(), value.into()));
        self
    }

    /// Add a `key` (exists) requirement
    pub fn exists(mut self, key: impl Into<String>) -> Self {
        self.requirements.push(Requirement::Exists(key.into()));
        self
    }

    /// The requirements of this selector, in insertion order
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Whether this selector has no requirements
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Whether the given labels satisfy every requirement
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, requirement) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{requirement}")?;
        }
        Ok(())
    }
}
