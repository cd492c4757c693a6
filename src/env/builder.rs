//! # Environment construction.
//!
//! [`EnvironmentBuilder`] assembles an [`ExecutionEnvironment`] with explicit
//! collaborators; every piece has a working default, so
//! `ExecutionEnvironment::builder("dev").build()` yields an environment driving
//! no-op engines — enough for tests and demos.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::config::{Conf, StorageConfig};
use crate::engine::{
    ApplicationIdBuilder, DefaultApplicationIdBuilder, EngineFactory, NoopEngineFactory,
};
use crate::env::environment::{ExecutionEnvironment, Settings};
use crate::events::Bus;
use crate::lifecycle::{InterceptorFactory, LifecycleInterceptor};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Default event bus capacity.
const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Builder for [`ExecutionEnvironment`].
pub struct EnvironmentBuilder {
    name: String,
    conf: Conf,
    storage: Option<StorageConfig>,
    fallback: Conf,
    engine_factory: Arc<dyn EngineFactory>,
    id_builder: Arc<dyn ApplicationIdBuilder>,
    interceptors: Vec<InterceptorFactory>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    bus_capacity: usize,
}

impl EnvironmentBuilder {
    /// Creates a builder with default collaborators: no-op engines, the
    /// default identity scheme, no interceptors, no subscribers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conf: Conf::new(),
            storage: None,
            fallback: Conf::new(),
            engine_factory: Arc::new(NoopEngineFactory::new()),
            id_builder: Arc::new(DefaultApplicationIdBuilder),
            interceptors: Vec::new(),
            subscribers: Vec::new(),
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }

    /// Sets the environment configuration.
    pub fn conf(mut self, conf: Conf) -> Self {
        self.conf = conf;
        self
    }

    /// Sets storage defaults applied beneath the environment configuration.
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the bottom configuration layer, consulted when no other layer
    /// defines a key.
    pub fn fallback(mut self, conf: Conf) -> Self {
        self.fallback = conf;
        self
    }

    /// Sets the engine factory.
    pub fn engine_factory(mut self, factory: impl EngineFactory) -> Self {
        self.engine_factory = Arc::new(factory);
        self
    }

    /// Sets the application identity builder.
    pub fn id_builder(mut self, builder: impl ApplicationIdBuilder) -> Self {
        self.id_builder = Arc::new(builder);
        self
    }

    /// Registers an interceptor factory.
    pub fn interceptor(
        mut self,
        factory: impl Fn() -> Box<dyn LifecycleInterceptor> + Send + Sync + 'static,
    ) -> Self {
        self.interceptors.push(Arc::new(factory));
        self
    }

    /// Registers an event subscriber.
    pub fn subscriber(mut self, subscriber: impl Subscribe + 'static) -> Self {
        self.subscribers.push(Arc::new(subscriber));
        self
    }

    /// Sets the event bus capacity (clamped to at least 1).
    pub fn bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Builds the environment.
    ///
    /// With subscribers registered this spawns the fan-out worker and must be
    /// called from within a tokio runtime.
    pub fn build(self) -> ExecutionEnvironment {
        let bus = Bus::new(self.bus_capacity);
        let listener = if self.subscribers.is_empty() {
            None
        } else {
            Some(spawn_listener(&bus, self.subscribers))
        };

        let settings = Settings {
            conf: self.conf,
            storage: self.storage,
            fallback: self.fallback,
            engine_factory: self.engine_factory,
            id_builder: self.id_builder,
            interceptors: self.interceptors,
        };
        ExecutionEnvironment::from_parts(self.name, settings, bus, listener)
    }
}

/// Bridges the event bus to a [`SubscriberSet`]; exits once the bus closes.
fn spawn_listener(bus: &Bus, subscribers: Vec<Arc<dyn Subscribe>>) -> JoinHandle<()> {
    let set = SubscriberSet::new(subscribers);
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event listener lagged, events skipped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        set.shutdown().await;
    })
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::engine::{TopologyProvider, TopologySpec};
    use crate::events::Event;

    struct TestTopology;

    impl TopologyProvider for TestTopology {
        fn name(&self) -> &str {
            "test-topology"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Counting {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Subscribe for Counting {
        async fn on_event(&self, _event: &Event) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_subscribers_observe_lifecycle_events() {
        let seen = Arc::new(AtomicUsize::new(0));
        let env = EnvironmentBuilder::new("dev")
            .subscriber(Counting {
                seen: Arc::clone(&seen),
            })
            .build();

        env.add_topology(TopologySpec::new(|| Box::new(TestTopology)))
            .await
            .unwrap();
        env.start().await.unwrap();

        // Registered, Starting, Started, EnvironmentStarted, delivered
        // asynchronously through the fan-out worker.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 4);
    }
}
