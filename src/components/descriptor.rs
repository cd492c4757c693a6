//! # Component descriptors.
//!
//! A [`ComponentDescriptor`] pairs metadata (name, version) with a factory
//! closure producing fresh instances of the component. Descriptors are cheap to
//! clone; the factory itself is shared behind an [`Arc`].

use std::fmt;
use std::sync::Arc;

use crate::error::EnvError;

/// Factory closure stored inside a descriptor.
///
/// Returns `Err(reason)` when the component cannot be constructed.
pub type ComponentFactory<T> = Arc<dyn Fn() -> Result<T, String> + Send + Sync>;

/// Describes one registered component of type `T` and how to build it.
pub struct ComponentDescriptor<T> {
    name: String,
    version: Option<String>,
    factory: ComponentFactory<T>,
}

impl<T> ComponentDescriptor<T> {
    /// Creates a descriptor from a name and an infallible factory closure.
    pub fn new(name: impl Into<String>, factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            version: None,
            factory: Arc::new(move || Ok(factory())),
        }
    }

    /// Creates a descriptor whose factory may fail.
    pub fn try_new(
        name: impl Into<String>,
        factory: impl Fn() -> Result<T, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            version: None,
            factory: Arc::new(factory),
        }
    }

    /// Sets the component version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Component version, if declared.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Builds a fresh instance of the component.
    pub fn make(&self) -> Result<T, EnvError> {
        (self.factory)().map_err(|reason| EnvError::Instantiation {
            component: self.name.clone(),
            reason,
        })
    }
}

impl<T> Clone for ComponentDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            version: self.version.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T> fmt::Debug for ComponentDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
