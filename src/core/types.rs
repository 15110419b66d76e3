use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// SNOMED CT canonical system URI
pub const SNOMED_SYSTEM: &str = "http://snomed.info/sct";

/// Resource type of the collection container every submitted document must be.
pub const BUNDLE_RESOURCE_TYPE: &str = "Bundle";

/// Resource types that must appear at least once among a Bundle's entries
pub const DEFAULT_REQUIRED_TYPES: &[&str] = &["Patient", "Encounter", "Condition", "Organization"];

/// Ordered, duplicate-free set of resource type tags a Bundle must contain.
///
/// Declaration order is preserved so that reports listing missing types are
/// deterministic regardless of entry order in the submitted Bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct RequiredTypeSet {
    types: Vec<String>,
}

impl RequiredTypeSet {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let types = types
            .into_iter()
            .map(Into::into)
            .filter(|t| seen.insert(t.clone()))
            .collect();
        Self { types }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.types.iter().any(|t| t == resource_type)
    }

    /// Required types absent from `present`, in declaration order.
    pub fn missing_from(&self, present: &HashSet<&str>) -> Vec<&str> {
        self.iter().filter(|t| !present.contains(t)).collect()
    }

    /// Human readable enumeration, e.g. `Patient, Encounter, Condition and Organization`.
    pub fn describe(&self) -> String {
        join_with_and(&self.iter().collect::<Vec<_>>())
    }
}

impl Default for RequiredTypeSet {
    fn default() -> Self {
        Self::new(DEFAULT_REQUIRED_TYPES.iter().copied())
    }
}

impl From<Vec<String>> for RequiredTypeSet {
    fn from(types: Vec<String>) -> Self {
        Self::new(types)
    }
}

impl From<RequiredTypeSet> for Vec<String> {
    fn from(set: RequiredTypeSet) -> Self {
        set.types
    }
}

impl fmt::Display for RequiredTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.types.join(", "))
    }
}

pub(crate) fn join_with_and(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_string(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}
