use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Property holding the solution configuration document
pub const SOLUTION_CONFIGURATION_PROPERTY: &str = "CurrentSolutionConfigurationContents";

/// Build-wide name/value configuration ambient to one build invocation
///
/// Names keep their original casing but compare case-insensitively, the same
/// way the build engine treats them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalProperties(BTreeMap<String, String>);

impl GlobalProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set a property, replacing any existing entry that differs only in case
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.0.retain(|key, _| !key.eq_ignore_ascii_case(&name));
        self.0.insert(name, value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let key = self.0.keys().find(|key| key.eq_ignore_ascii_case(name))?.clone();
        self.0.remove(&key)
    }

    /// Drop host-private properties, denoted by a leading underscore
    pub fn without_internal(self) -> Self {
        Self(
            self.0
                .into_iter()
                .filter(|(key, _)| !key.starts_with('_'))
                .collect(),
        )
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

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for GlobalProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = GlobalProperties::new();
        for (k, v) in iter {
            props.set(k, v);
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut props = GlobalProperties::new();
        props.set("Configuration", "Release");
        assert_eq!(props.get("configuration"), Some("Release"));

        props.set("CONFIGURATION", "Debug");
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("Configuration"), Some("Debug"));
    }

    #[test]
    fn test_without_internal_filters_underscore() {
        let props: GlobalProperties = [
            ("Configuration", "Debug"),
            ("_ResolveReferenceDependencies", "true"),
            ("Platform", "AnyCPU"),
        ]
        .into_iter()
        .collect();

        let filtered = props.without_internal();
        assert_eq!(filtered.len(), 2);
        assert!(!filtered.contains("_ResolveReferenceDependencies"));
    }
}
