//! # Component registry: explicit factory mapping.
//!
//! Components (topology providers, interceptors) are registered as
//! [`ComponentDescriptor`]s with plain factory closures and looked up through
//! [`Qualifier`] filtering. Registration order is the iteration order, so
//! lookups are deterministic.

use crate::components::{ComponentDescriptor, Qualifier};
use crate::error::EnvError;

/// Ordered collection of component descriptors of type `T`.
pub struct ComponentRegistry<T> {
    descriptors: Vec<ComponentDescriptor<T>>,
}

impl<T: 'static> ComponentRegistry<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Registers a descriptor. Duplicate names are allowed; use a version
    /// qualifier to disambiguate.
    pub fn register(&mut self, descriptor: ComponentDescriptor<T>) {
        self.descriptors.push(descriptor);
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Returns all descriptors matching the qualifier, in registration order.
    pub fn find(&self, qualifier: &dyn Qualifier<T>) -> Vec<ComponentDescriptor<T>> {
        qualifier
            .filter(Box::new(self.descriptors.iter().cloned()))
            .collect()
    }

    /// Builds the single component matching the qualifier.
    ///
    /// Fails with [`EnvError::NoSuchComponent`] when nothing matches and with
    /// [`EnvError::NoUniqueComponent`] when the match is ambiguous.
    pub fn make_one(&self, qualifier: &dyn Qualifier<T>) -> Result<T, EnvError> {
        let mut matches = self.find(qualifier);
        match matches.len() {
            0 => Err(EnvError::NoSuchComponent {
                selector: qualifier.to_string(),
            }),
            1 => matches.remove(0).make(),
            count => Err(EnvError::NoUniqueComponent {
                selector: qualifier.to_string(),
                count,
            }),
        }
    }

    /// Builds the single component registered under the given name.
    pub fn make_by_name(&self, name: &str) -> Result<T, EnvError> {
        self.make_one(&crate::components::by_name(name))
    }
}

impl<T: 'static> Default for ComponentRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{by_name, by_version, CompositeQualifier};

    fn registry() -> ComponentRegistry<&'static str> {
        let mut r = ComponentRegistry::new();
        r.register(ComponentDescriptor::new("word-count", || "wc-v1").with_version("1.0"));
        r.register(ComponentDescriptor::new("word-count", || "wc-v2").with_version("2.0"));
        r.register(ComponentDescriptor::new("top-k", || "topk"));
        r
    }

    #[test]
    fn test_make_by_name_unique_match() {
        let r = registry();
        assert_eq!(r.make_by_name("top-k").unwrap(), "topk");
    }

    #[test]
    fn test_ambiguous_name_requires_version() {
        let r = registry();
        let err = r.make_by_name("word-count").unwrap_err();
        assert_eq!(err.as_label(), "component_not_unique");

        let q = CompositeQualifier::new()
            .and(by_name("word-count"))
            .and(by_version("2.0"));
        assert_eq!(r.make_one(&q).unwrap(), "wc-v2");
    }

    #[test]
    fn test_missing_component_reports_selector() {
        let r = registry();
        let err = r.make_by_name("nope").unwrap_err();
        assert_eq!(err.as_label(), "component_not_found");
        assert!(err.to_string().contains("@Named(nope)"));
    }
}
