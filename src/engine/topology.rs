//! # Topology registration.
//!
//! A [`TopologyProvider`] is the external description of one processing topology.
//! The environment never interprets it; an [`EngineFactory`](crate::engine::EngineFactory)
//! downcasts the provider (via [`TopologyProvider::as_any`]) to whatever concrete
//! representation its engine consumes.
//!
//! [`TopologySpec`] is the registration bundle handed to
//! [`ExecutionEnvironment::add_topology`](crate::ExecutionEnvironment::add_topology):
//! a zero-argument provider factory plus optional per-application overrides. One
//! fresh provider instance is produced per engine build, since providers may be
//! stateful.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::config::Conf;
use crate::engine::id::APPLICATION_NAME_CONFIG;

/// External description of a processing topology.
pub trait TopologyProvider: Send + Sync + 'static {
    /// Logical topology name.
    fn name(&self) -> &str;

    /// Topology version, surfaced in diagnostics.
    fn version(&self) -> &str {
        "unversioned"
    }

    /// Engine-specific escape hatch: factories downcast through this to the
    /// concrete topology representation they expect.
    fn as_any(&self) -> &dyn Any;
}

/// Zero-argument producer of topology providers.
pub type TopologyProviderFactory = Arc<dyn Fn() -> Box<dyn TopologyProvider> + Send + Sync>;

/// Per-application registration bundle.
///
/// Bundles the provider factory with the options a single application may
/// override: its logical name, a free-form description, and configuration that
/// takes precedence over the environment configuration.
#[derive(Clone)]
pub struct TopologySpec {
    provider: TopologyProviderFactory,
    name: Option<String>,
    description: Option<String>,
    conf: Conf,
}

impl TopologySpec {
    /// Creates a spec from a provider factory.
    pub fn new(provider: impl Fn() -> Box<dyn TopologyProvider> + Send + Sync + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
            name: None,
            description: None,
            conf: Conf::new(),
        }
    }

    /// Overrides the application's logical name (feeds the identity builder).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches a free-form description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets per-application configuration overrides.
    pub fn with_conf(mut self, conf: Conf) -> Self {
        self.conf = conf;
        self
    }

    /// The overridden name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Per-application configuration overrides.
    pub fn conf(&self) -> &Conf {
        &self.conf
    }

    /// Produces a fresh provider instance.
    pub(crate) fn make_provider(&self) -> Box<dyn TopologyProvider> {
        (self.provider)()
    }

    /// Configuration used for identity building: the per-application overrides
    /// with the spec name, when set, taking precedence over any configured one.
    pub(crate) fn identity_conf(&self, env_conf: &Conf) -> Conf {
        let mut conf = self.conf.with_fallback(env_conf);
        if let Some(name) = &self.name {
            conf.set(APPLICATION_NAME_CONFIG, name.clone());
        }
        conf
    }
}

impl fmt::Debug for TopologySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopologySpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("conf", &self.conf)
            .finish_non_exhaustive()
    }
}
