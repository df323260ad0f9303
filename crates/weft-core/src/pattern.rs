use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Named reusable system-prompt template. Immutable once loaded and
/// re-read from its store on every resolution; staleness is acceptable,
/// freshness is guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Pattern {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            description: None,
        }
    }

    /// The empty contribution used when a request names no pattern.
    pub fn empty() -> Self {
        Self::new("", "")
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Read-only source of pattern text. The engine never writes here.
pub trait PatternStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn list(&self) -> Vec<String>;
}

pub type PatternStoreRef = Arc<dyn PatternStore>;

/// Name-to-text resolution with a custom store shadowing the default.
pub struct PatternResolver {
    custom: Option<PatternStoreRef>,
    default: PatternStoreRef,
}

impl PatternResolver {
    pub fn new(default: PatternStoreRef) -> Self {
        Self {
            custom: None,
            default,
        }
    }

    pub fn with_custom(mut self, custom: PatternStoreRef) -> Self {
        self.custom = Some(custom);
        self
    }

    pub fn resolve(&self, name: &str) -> Result<Pattern, EngineError> {
        if let Some(custom) = &self.custom {
            if let Some(text) = custom.get(name) {
                return Ok(Pattern::new(name, text));
            }
        }
        match self.default.get(name) {
            Some(text) => Ok(Pattern::new(name, text)),
            None => Err(EngineError::PatternNotFound(name.to_string())),
        }
    }

    /// `None` is a valid request: it yields the empty contribution.
    pub fn resolve_request(&self, name: Option<&str>) -> Result<Pattern, EngineError> {
        match name {
            Some(name) => self.resolve(name),
            None => Ok(Pattern::empty()),
        }
    }

    /// All resolvable names; custom entries shadow default ones.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .custom
            .as_ref()
            .map(|store| store.list())
            .unwrap_or_default();
        for name in self.default.list() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapStore(HashMap<String, String>);

    impl MapStore {
        fn of(entries: &[(&str, &str)]) -> PatternStoreRef {
            Arc::new(Self(
                entries
                    .iter()
                    .map(|(name, text)| (name.to_string(), text.to_string()))
                    .collect(),
            ))
        }
    }

    impl PatternStore for MapStore {
        fn get(&self, name: &str) -> Option<String> {
            self.0.get(name).cloned()
        }

        fn list(&self) -> Vec<String> {
            self.0.keys().cloned().collect()
        }
    }

    #[test]
    fn custom_store_shadows_default() {
        let resolver = PatternResolver::new(MapStore::of(&[("summarize", "default text")]))
            .with_custom(MapStore::of(&[("summarize", "custom text")]));
        assert_eq!(resolver.resolve("summarize").unwrap().text, "custom text");
    }

    #[test]
    fn falls_back_to_default_store() {
        let resolver = PatternResolver::new(MapStore::of(&[("summarize", "default text")]))
            .with_custom(MapStore::of(&[]));
        assert_eq!(resolver.resolve("summarize").unwrap().text, "default text");
    }

    #[test]
    fn missing_pattern_is_an_error() {
        let resolver = PatternResolver::new(MapStore::of(&[]));
        assert!(matches!(
            resolver.resolve("ghost"),
            Err(EngineError::PatternNotFound(name)) if name == "ghost"
        ));
    }

    #[test]
    fn no_pattern_name_yields_empty_contribution() {
        let resolver = PatternResolver::new(MapStore::of(&[]));
        let pattern = resolver.resolve_request(None).unwrap();
        assert!(pattern.is_empty());
    }
}
