//! # The execution environment.
//!
//! [`ExecutionEnvironment`] owns the named set of managed applications, the
//! layered runtime configuration, and the registered interceptor factories, and
//! exposes the public lifecycle surface: `add_topology`, `start`, `stop`,
//! `stop_application`, and `remove`.
//!
//! Every start/stop transition runs through a fresh
//! [`LifecycleChain`](crate::lifecycle::LifecycleChain): one new interceptor
//! instance per registered factory, a callback invoking the phase hook, and a
//! terminal action performing the actual engine build/start or shutdown.
//! Interceptor failures are isolated by the chain; engine failures during bulk
//! operations are logged per application and never abort the bulk call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{error, info, warn};

use crate::config::{Conf, StorageConfig};
use crate::engine::{
    ApplicationId, ApplicationIdBuilder, Engine, EngineFactory, EngineState, TopologySpec,
};
use crate::env::application::{AppState, ApplicationInfo, ManagedApplication};
use crate::env::registry::AppRegistry;
use crate::error::EnvError;
use crate::events::{Bus, Event, EventKind};
use crate::lifecycle::{chain_callback, LifecycleChain, LifecycleContext, Phase, TerminalAction};
use crate::lifecycle::{InterceptorFactory, LifecycleInterceptor};

/// Lifecycle state of the environment itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvState {
    /// Accepting registrations and configuration changes; nothing running.
    Created,
    /// `start()` has been called; registrations start immediately.
    Started,
}

impl std::fmt::Display for EnvState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EnvState::Created => "created",
            EnvState::Started => "started",
        })
    }
}

/// Mutable configuration shared by all transitions.
pub(crate) struct Settings {
    pub(crate) conf: Conf,
    pub(crate) storage: Option<StorageConfig>,
    pub(crate) fallback: Conf,
    pub(crate) engine_factory: Arc<dyn EngineFactory>,
    pub(crate) id_builder: Arc<dyn ApplicationIdBuilder>,
    pub(crate) interceptors: Vec<InterceptorFactory>,
}

impl Settings {
    /// Effective configuration for one application:
    /// app overrides > environment conf > storage defaults > fallback.
    fn effective_conf(&self, spec: &TopologySpec) -> Conf {
        let mut layered = self.conf.clone();
        if let Some(storage) = &self.storage {
            layered = layered.with_fallback(&storage.as_conf());
        }
        layered = layered.with_fallback(&self.fallback);
        spec.conf().with_fallback(&layered)
    }
}

/// Named, single-process control plane for a set of stream-processing
/// applications.
///
/// Construct through [`ExecutionEnvironment::builder`]. All methods take
/// `&self`; wrap the environment in an [`Arc`] to share it across tasks.
pub struct ExecutionEnvironment {
    name: String,
    started: AtomicBool,
    settings: RwLock<Settings>,
    registry: AppRegistry,
    bus: Bus,
    // Keeps the subscriber fan-out worker referenced for the environment's
    // lifetime; it exits on its own once the bus closes.
    _listener: Option<JoinHandle<()>>,
}

impl ExecutionEnvironment {
    pub(crate) fn from_parts(
        name: String,
        settings: Settings,
        bus: Bus,
        listener: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            name,
            started: AtomicBool::new(false),
            settings: RwLock::new(settings),
            registry: AppRegistry::new(),
            bus,
            _listener: listener,
        }
    }

    /// Starts building an environment with the given name.
    pub fn builder(name: impl Into<String>) -> crate::env::EnvironmentBuilder {
        crate::env::EnvironmentBuilder::new(name)
    }

    /// Environment name, part of every default application id.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current environment state.
    pub fn state(&self) -> EnvState {
        if self.started.load(Ordering::SeqCst) {
            EnvState::Started
        } else {
            EnvState::Created
        }
    }

    /// Subscribes to the environment's event stream.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    // === Configuration (rejected once started) ===

    /// Merges additional configuration into the environment configuration.
    /// Existing keys are overridden.
    pub async fn add_conf(&self, conf: Conf) -> Result<(), EnvError> {
        let mut settings = self.settings.write().await;
        self.check_not_started("add_conf")?;
        settings.conf = conf.with_fallback(&settings.conf);
        Ok(())
    }

    /// Merges configuration into the bottom fallback layer, consulted only
    /// when no other layer defines a key.
    pub async fn add_fallback_conf(&self, conf: Conf) -> Result<(), EnvError> {
        let mut settings = self.settings.write().await;
        self.check_not_started("add_fallback_conf")?;
        settings.fallback = conf.with_fallback(&settings.fallback);
        Ok(())
    }

    /// Sets storage defaults applied beneath the environment configuration.
    pub async fn set_storage_config(&self, storage: StorageConfig) -> Result<(), EnvError> {
        let mut settings = self.settings.write().await;
        self.check_not_started("set_storage_config")?;
        settings.storage = Some(storage);
        Ok(())
    }

    /// Replaces the engine factory.
    pub async fn set_engine_factory(
        &self,
        factory: impl EngineFactory,
    ) -> Result<(), EnvError> {
        let mut settings = self.settings.write().await;
        self.check_not_started("set_engine_factory")?;
        settings.engine_factory = Arc::new(factory);
        Ok(())
    }

    /// Replaces the application identity builder.
    pub async fn set_id_builder(
        &self,
        builder: impl ApplicationIdBuilder,
    ) -> Result<(), EnvError> {
        let mut settings = self.settings.write().await;
        self.check_not_started("set_id_builder")?;
        settings.id_builder = Arc::new(builder);
        Ok(())
    }

    /// Registers an interceptor factory. One fresh interceptor is produced per
    /// factory for every start/stop chain, in registration order.
    pub async fn add_interceptor(
        &self,
        factory: impl Fn() -> Box<dyn LifecycleInterceptor> + Send + Sync + 'static,
    ) -> Result<(), EnvError> {
        let mut settings = self.settings.write().await;
        self.check_not_started("add_interceptor")?;
        settings.interceptors.push(Arc::new(factory));
        Ok(())
    }

    /// Must be called with the `settings` write lock held: the chains snapshot
    /// settings under the read lock, so checking the started flag under the
    /// same lock serializes each structural mutation against a concurrent
    /// first `start()` — it either lands before any chain snapshot or is
    /// rejected.
    fn check_not_started(&self, operation: &'static str) -> Result<(), EnvError> {
        match self.state() {
            EnvState::Created => Ok(()),
            state => Err(EnvError::IllegalState { operation, state }),
        }
    }

    // === Registration ===

    /// Registers a topology and allocates a fresh [`ApplicationId`].
    ///
    /// The id is always allocated immediately, whatever the environment state.
    /// If the environment is already started, the application is started right
    /// away following the same chain sequence as a bulk start; a failure to
    /// build or start its engine is reported through events and leaves the
    /// application in [`AppState::Created`], the id stays valid either way.
    pub async fn add_topology(&self, spec: TopologySpec) -> Result<ApplicationId, EnvError> {
        let id = {
            let settings = self.settings.read().await;
            let identity = spec.identity_conf(&settings.conf);
            settings.id_builder.build(&self.name, &identity)?
        };
        let app = Arc::new(ManagedApplication::new(id.clone(), spec));
        self.registry.insert(Arc::clone(&app)).await?;
        info!(application = %id, environment = %self.name, "registered topology");
        self.bus
            .publish(Event::new(EventKind::ApplicationRegistered).with_application(id.as_str().to_owned()));

        if self.state() == EnvState::Started {
            self.start_application(app).await;
        }
        Ok(id)
    }

    // === Lifecycle ===

    /// Starts the environment and every registered application, in
    /// registration order.
    ///
    /// Legal exactly once; repeated calls fail with
    /// [`EnvError::AlreadyStarted`] and change nothing. Interceptor and engine
    /// failures are isolated per application and never abort the bulk start.
    pub async fn start(&self) -> Result<(), EnvError> {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EnvError::AlreadyStarted {
                name: self.name.clone(),
            });
        }

        info!(environment = %self.name, "starting environment");
        for app in self.registry.snapshot().await {
            if app.state().await == AppState::Created {
                self.start_application(app).await;
            }
        }
        self.bus.publish(Event::new(EventKind::EnvironmentStarted));
        Ok(())
    }

    /// Stops every currently started application, in registration order.
    ///
    /// A failure stopping one application is logged and does not block
    /// stopping the rest. The environment stays started; only `remove` retires
    /// applications.
    pub async fn stop(&self, clean_up: bool) -> Result<(), EnvError> {
        if self.state() != EnvState::Started {
            return Err(EnvError::IllegalState {
                operation: "stop",
                state: self.state(),
            });
        }
        for app in self.registry.snapshot().await {
            if app.state().await == AppState::Started {
                self.run_stop_chain(app, clean_up, None).await;
            }
        }
        Ok(())
    }

    /// Stops one application, bounding the engine shutdown wait by `timeout`.
    ///
    /// With `timeout = None` the wait is unbounded. When the engine does not
    /// quiesce within the timeout the call still returns: a
    /// [`EventKind::StopTimeoutExceeded`] event is published and the
    /// application's state reflects whatever the engine reports; callers may
    /// re-check.
    pub async fn stop_application(
        &self,
        id: &ApplicationId,
        clean_up: bool,
        timeout: Option<Duration>,
    ) -> Result<(), EnvError> {
        if self.state() != EnvState::Started {
            return Err(EnvError::IllegalState {
                operation: "stop_application",
                state: self.state(),
            });
        }
        let app = self.registry.get(id).await?;
        self.run_stop_chain(app, clean_up, timeout).await;
        Ok(())
    }

    /// Stops the application if it is still running (without state cleanup),
    /// then removes it from the registry. The id is retired: any further
    /// operation on it fails with [`EnvError::UnknownApplication`].
    pub async fn remove(
        &self,
        id: &ApplicationId,
        timeout: Option<Duration>,
    ) -> Result<(), EnvError> {
        let app = self.registry.get(id).await?;
        if app.state().await == AppState::Started {
            self.run_stop_chain(Arc::clone(&app), false, timeout).await;
        }
        self.registry.remove(id).await?;
        info!(application = %id, "removed application");
        self.bus
            .publish(Event::new(EventKind::ApplicationRemoved).with_application(id.as_str().to_owned()));
        Ok(())
    }

    // === Status queries ===

    /// Ids of all registered applications, in registration order.
    pub async fn applications(&self) -> Vec<ApplicationId> {
        self.registry.ids().await
    }

    /// Lifecycle state of one application.
    pub async fn application_state(&self, id: &ApplicationId) -> Result<AppState, EnvError> {
        Ok(self.registry.get(id).await?.state().await)
    }

    /// Point-in-time snapshot of one application.
    pub async fn describe(&self, id: &ApplicationId) -> Result<ApplicationInfo, EnvError> {
        Ok(self.registry.get(id).await?.info().await)
    }

    // === Transitions ===

    /// Runs the start chain for one application.
    ///
    /// Holds the application's transition lock for the whole run; a concurrent
    /// start or stop for the same id waits. Applications not in
    /// [`AppState::Created`] are left alone.
    async fn start_application(&self, app: Arc<ManagedApplication>) {
        let _transition = app.begin_transition().await;
        if app.state().await != AppState::Created {
            return;
        }

        let (interceptors, engine_factory, conf) = {
            let settings = self.settings.read().await;
            let interceptors: Vec<Box<dyn LifecycleInterceptor>> =
                settings.interceptors.iter().map(|f| f()).collect();
            (
                interceptors,
                Arc::clone(&settings.engine_factory),
                settings.effective_conf(app.spec()),
            )
        };

        let id: Arc<str> = Arc::from(app.id().as_str());
        self.bus.publish(
            Event::new(EventKind::ApplicationStarting).with_application(Arc::clone(&id)),
        );

        let ctx = Arc::new(LifecycleContext::new(
            app.id().clone(),
            self.name.clone(),
            conf.clone(),
            Phase::Start,
            EngineState::Created,
        ));
        let callback = chain_callback(move |i, chain| i.on_start(Arc::clone(&ctx), chain));

        let bus = self.bus.clone();
        let terminal_app = Arc::clone(&app);
        let terminal_id = Arc::clone(&id);
        let terminal: TerminalAction = Box::new(move || {
            Box::pin(async move {
                start_engine(terminal_app, engine_factory, conf, bus, terminal_id).await;
            })
        });

        let mut chain = LifecycleChain::new(interceptors, callback, terminal)
            .with_bus(self.bus.clone(), Arc::clone(&id));
        chain.execute().await;
    }

    /// Runs the stop chain for one application.
    async fn run_stop_chain(
        &self,
        app: Arc<ManagedApplication>,
        clean_up: bool,
        timeout: Option<Duration>,
    ) {
        let _transition = app.begin_transition().await;
        if app.state().await != AppState::Started {
            return;
        }

        let (interceptors, conf) = {
            let settings = self.settings.read().await;
            let interceptors: Vec<Box<dyn LifecycleInterceptor>> =
                settings.interceptors.iter().map(|f| f()).collect();
            (interceptors, settings.effective_conf(app.spec()))
        };

        let id: Arc<str> = Arc::from(app.id().as_str());
        self.bus.publish(
            Event::new(EventKind::ApplicationStopping).with_application(Arc::clone(&id)),
        );

        let engine_state = app.engine_state().await.unwrap_or(EngineState::Created);
        let ctx = Arc::new(LifecycleContext::new(
            app.id().clone(),
            self.name.clone(),
            conf,
            Phase::Stop,
            engine_state,
        ));
        let callback = chain_callback(move |i, chain| i.on_stop(Arc::clone(&ctx), chain));

        let bus = self.bus.clone();
        let terminal_app = Arc::clone(&app);
        let terminal_id = Arc::clone(&id);
        let terminal: TerminalAction = Box::new(move || {
            Box::pin(async move {
                stop_engine(terminal_app, clean_up, timeout, bus, terminal_id).await;
            })
        });

        let mut chain = LifecycleChain::new(interceptors, callback, terminal)
            .with_bus(self.bus.clone(), Arc::clone(&id));
        chain.execute().await;
    }
}

/// Chain terminal action for starts: build the engine, start it, record the
/// handle, and begin forwarding its state changes.
async fn start_engine(
    app: Arc<ManagedApplication>,
    factory: Arc<dyn EngineFactory>,
    conf: Conf,
    bus: Bus,
    id: Arc<str>,
) {
    let provider = app.spec().make_provider();
    let engine = match factory.make(&conf, provider.as_ref()) {
        Ok(engine) => engine,
        Err(err) => {
            error!(application = %id, error = %err, "engine build failed");
            bus.publish(
                Event::new(EventKind::ApplicationStartFailed)
                    .with_application(Arc::clone(&id))
                    .with_reason(err.to_string()),
            );
            return;
        }
    };

    if let Err(err) = engine.start().await {
        error!(application = %id, error = %err, "engine start failed");
        bus.publish(
            Event::new(EventKind::ApplicationStartFailed)
                .with_application(Arc::clone(&id))
                .with_reason(err.to_string()),
        );
        return;
    }

    let forwarder = spawn_state_forwarder(&engine, bus.clone(), Arc::clone(&id));
    {
        let mut runtime = app.runtime().write().await;
        runtime.state = AppState::Started;
        runtime.engine = Some(engine);
        runtime.forwarder = Some(forwarder);
    }
    info!(application = %id, "application started");
    bus.publish(Event::new(EventKind::ApplicationStarted).with_application(id));
}

/// Chain terminal action for stops: shut the engine down, bounded by `timeout`.
async fn stop_engine(
    app: Arc<ManagedApplication>,
    clean_up: bool,
    timeout: Option<Duration>,
    bus: Bus,
    id: Arc<str>,
) {
    let engine = app.engine().await;
    let Some(engine) = engine else {
        return;
    };

    let outcome = match timeout {
        Some(limit) => match time::timeout(limit, engine.stop(clean_up)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(application = %id, timeout = ?limit, "engine did not quiesce within timeout");
                bus.publish(
                    Event::new(EventKind::StopTimeoutExceeded)
                        .with_application(Arc::clone(&id))
                        .with_timeout(limit),
                );
                settle_from_engine(&app, &engine).await;
                return;
            }
        },
        None => engine.stop(clean_up).await,
    };

    match outcome {
        Ok(true) => {
            {
                let mut runtime = app.runtime().write().await;
                runtime.state = AppState::Stopped;
                runtime.engine = None;
                if let Some(forwarder) = runtime.forwarder.take() {
                    forwarder.abort();
                }
            }
            info!(application = %id, "application stopped");
            bus.publish(Event::new(EventKind::ApplicationStopped).with_application(id));
        }
        Ok(false) => {
            // Shutdown initiated but the engine did not quiesce. Recording a
            // clean stop here would strand the caller without a handle to
            // re-check, so the record mirrors the engine's reported state.
            warn!(application = %id, "engine reported shutdown incomplete");
            settle_from_engine(&app, &engine).await;
        }
        Err(err) => {
            error!(application = %id, error = %err, "engine stop failed");
            bus.publish(
                Event::new(EventKind::ApplicationStopFailed)
                    .with_application(Arc::clone(&id))
                    .with_reason(err.to_string()),
            );
            settle_from_engine(&app, &engine).await;
        }
    }
}

/// After a timed-out or failed stop, the record mirrors whatever the engine
/// reports rather than assuming an outcome.
async fn settle_from_engine(app: &ManagedApplication, engine: &Arc<dyn Engine>) {
    if engine.state() == EngineState::Stopped {
        let mut runtime = app.runtime().write().await;
        runtime.state = AppState::Stopped;
        runtime.engine = None;
        if let Some(forwarder) = runtime.forwarder.take() {
            forwarder.abort();
        }
    }
}

/// Forwards engine state transitions onto the event bus until the engine's
/// watch channel closes.
fn spawn_state_forwarder(engine: &Arc<dyn Engine>, bus: Bus, id: Arc<str>) -> JoinHandle<()> {
    let mut rx = engine.watch_state();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = *rx.borrow_and_update();
            bus.publish(
                Event::new(EventKind::EngineStateChanged)
                    .with_application(Arc::clone(&id))
                    .with_engine_state(state),
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::engine::{NoopEngineFactory, TopologyProvider};
    use crate::error::InterceptorError;

    struct TestTopology;

    impl TopologyProvider for TestTopology {
        fn name(&self) -> &str {
            "test-topology"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn spec() -> TopologySpec {
        TopologySpec::new(|| Box::new(TestTopology))
    }

    fn env(name: &str) -> ExecutionEnvironment {
        ExecutionEnvironment::builder(name).build()
    }

    #[tokio::test]
    async fn test_add_topology_allocates_unique_ids() {
        let env = env("dev");
        let a = env.add_topology(spec().with_name("alpha")).await.unwrap();
        let b = env.add_topology(spec().with_name("alpha")).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(env.applications().await, vec![a.clone(), b.clone()]);
        assert_eq!(env.application_state(&a).await.unwrap(), AppState::Created);
        assert_eq!(env.state(), EnvState::Created);
    }

    #[tokio::test]
    async fn test_start_starts_applications_in_registration_order() {
        let env = env("dev");
        let mut events = env.events();
        let a = env.add_topology(spec().with_name("first")).await.unwrap();
        let b = env.add_topology(spec().with_name("second")).await.unwrap();

        env.start().await.unwrap();
        assert_eq!(env.state(), EnvState::Started);
        assert_eq!(env.application_state(&a).await.unwrap(), AppState::Started);
        assert_eq!(env.application_state(&b).await.unwrap(), AppState::Started);

        let mut started = Vec::new();
        while started.len() < 2 {
            let ev = events.recv().await.unwrap();
            if ev.kind == EventKind::ApplicationStarted {
                started.push(ev.application.unwrap().to_string());
            }
        }
        assert_eq!(started, vec![a.to_string(), b.to_string()]);
    }

    #[tokio::test]
    async fn test_start_twice_fails_and_state_stays_started() {
        let env = env("dev");
        env.add_topology(spec()).await.unwrap();
        env.start().await.unwrap();

        let err = env.start().await.unwrap_err();
        assert_eq!(err.as_label(), "env_already_started");
        assert_eq!(env.state(), EnvState::Started);
    }

    #[tokio::test]
    async fn test_add_topology_after_start_starts_immediately() {
        let env = env("dev");
        env.start().await.unwrap();

        let id = env.add_topology(spec().with_name("late")).await.unwrap();
        assert_eq!(env.application_state(&id).await.unwrap(), AppState::Started);

        let info = env.describe(&id).await.unwrap();
        assert_eq!(info.engine_state, Some(EngineState::Running));
    }

    #[tokio::test]
    async fn test_stop_before_start_is_illegal() {
        let env = env("dev");
        let err = env.stop(false).await.unwrap_err();
        assert_eq!(err.as_label(), "env_illegal_state");
    }

    #[tokio::test]
    async fn test_stop_unknown_id_fails_and_registry_unchanged() {
        let env = env("dev");
        let id = env.add_topology(spec()).await.unwrap();
        env.start().await.unwrap();

        let unknown = ApplicationId::from("dev-ghost-00000000");
        let err = env
            .stop_application(&unknown, false, None)
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "env_unknown_application");
        assert_eq!(env.applications().await, vec![id]);
    }

    #[tokio::test]
    async fn test_stop_then_remove_retires_the_id() {
        let env = env("dev");
        let id = env.add_topology(spec()).await.unwrap();
        env.start().await.unwrap();

        env.stop_application(&id, false, None).await.unwrap();
        assert_eq!(env.application_state(&id).await.unwrap(), AppState::Stopped);

        env.remove(&id, None).await.unwrap();
        assert!(env.applications().await.is_empty());

        let stop_err = env.stop_application(&id, false, None).await.unwrap_err();
        assert_eq!(stop_err.as_label(), "env_unknown_application");
        let remove_err = env.remove(&id, None).await.unwrap_err();
        assert_eq!(remove_err.as_label(), "env_unknown_application");
    }

    #[tokio::test]
    async fn test_remove_stops_a_running_application_first() {
        let env = env("dev");
        let id = env.add_topology(spec()).await.unwrap();
        env.start().await.unwrap();

        let mut events = env.events();
        env.remove(&id, None).await.unwrap();

        let mut kinds = Vec::new();
        for _ in 0..3 {
            kinds.push(events.recv().await.unwrap().kind);
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::ApplicationStopping,
                EventKind::ApplicationStopped,
                EventKind::ApplicationRemoved,
            ]
        );
    }

    struct Failing;

    #[async_trait]
    impl LifecycleInterceptor for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn on_start(
            &self,
            _ctx: Arc<LifecycleContext>,
            _chain: &mut LifecycleChain,
        ) -> Result<(), InterceptorError> {
            Err(InterceptorError::new("misbehaving plugin"))
        }
    }

    #[tokio::test]
    async fn test_interceptor_failure_never_blocks_engine_start() {
        let env = env("dev");
        env.add_interceptor(|| Box::new(Failing)).await.unwrap();
        let id = env.add_topology(spec()).await.unwrap();

        env.start().await.unwrap();
        assert_eq!(env.application_state(&id).await.unwrap(), AppState::Started);
    }

    struct Ordered {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl LifecycleInterceptor for Ordered {
        fn name(&self) -> &str {
            self.label
        }

        async fn on_start(
            &self,
            _ctx: Arc<LifecycleContext>,
            chain: &mut LifecycleChain,
        ) -> Result<(), InterceptorError> {
            self.log.lock().unwrap().push(self.label);
            chain.execute().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_interceptors_run_in_registration_order() {
        let env = env("dev");
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&log);
        env.add_interceptor(move || {
            Box::new(Ordered {
                label: "first",
                log: Arc::clone(&first),
            })
        })
        .await
        .unwrap();
        let second = Arc::clone(&log);
        env.add_interceptor(move || {
            Box::new(Ordered {
                label: "second",
                log: Arc::clone(&second),
            })
        })
        .await
        .unwrap();

        env.add_topology(spec()).await.unwrap();
        env.start().await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_setters_rejected_after_start() {
        let env = env("dev");
        env.start().await.unwrap();

        let err = env.add_conf(Conf::new()).await.unwrap_err();
        assert_eq!(err.as_label(), "env_illegal_state");
        let err = env.add_interceptor(|| Box::new(Failing)).await.unwrap_err();
        assert_eq!(err.as_label(), "env_illegal_state");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_timeout_returns_and_reports() {
        let env = ExecutionEnvironment::builder("dev")
            .engine_factory(NoopEngineFactory::with_stop_delay(Duration::from_secs(30)))
            .build();
        let id = env.add_topology(spec()).await.unwrap();
        env.start().await.unwrap();

        let mut events = env.events();
        env.stop_application(&id, false, Some(Duration::from_millis(100)))
            .await
            .unwrap();

        // The engine never quiesced, so the application still reports started.
        assert_eq!(env.application_state(&id).await.unwrap(), AppState::Started);

        let mut saw_timeout = false;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::StopTimeoutExceeded {
                assert_eq!(ev.timeout_ms, Some(100));
                saw_timeout = true;
            }
        }
        assert!(saw_timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_stops_do_not_block_each_other() {
        let env = ExecutionEnvironment::builder("dev")
            .engine_factory(NoopEngineFactory::with_stop_delay(Duration::from_secs(5)))
            .build();
        let a = env.add_topology(spec().with_name("a")).await.unwrap();
        let b = env.add_topology(spec().with_name("b")).await.unwrap();
        env.start().await.unwrap();

        let begun = time::Instant::now();
        let (ra, rb) = tokio::join!(
            env.stop_application(&a, false, None),
            env.stop_application(&b, false, None),
        );
        ra.unwrap();
        rb.unwrap();

        // Both 5s shutdowns overlap; serialized they would take 10s.
        assert!(begun.elapsed() < Duration::from_secs(10));
        assert_eq!(env.application_state(&a).await.unwrap(), AppState::Stopped);
        assert_eq!(env.application_state(&b).await.unwrap(), AppState::Stopped);
    }

    /// Engine whose shutdown only ever initiates: `stop` returns `Ok(false)`
    /// and the engine keeps reporting itself running.
    struct StallingEngine {
        state: tokio::sync::watch::Sender<EngineState>,
    }

    #[async_trait]
    impl Engine for StallingEngine {
        async fn start(&self) -> Result<(), crate::error::EngineError> {
            self.state.send_replace(EngineState::Running);
            Ok(())
        }

        async fn stop(&self, _clean_up: bool) -> Result<bool, crate::error::EngineError> {
            Ok(false)
        }

        fn state(&self) -> EngineState {
            *self.state.borrow()
        }

        fn watch_state(&self) -> tokio::sync::watch::Receiver<EngineState> {
            self.state.subscribe()
        }
    }

    struct StallingEngineFactory;

    impl EngineFactory for StallingEngineFactory {
        fn make(
            &self,
            _conf: &Conf,
            _provider: &dyn crate::engine::TopologyProvider,
        ) -> Result<Arc<dyn Engine>, crate::error::EngineError> {
            let (state, _) = tokio::sync::watch::channel(EngineState::Created);
            Ok(Arc::new(StallingEngine { state }))
        }
    }

    #[tokio::test]
    async fn test_unquiesced_stop_mirrors_engine_state() {
        let env = ExecutionEnvironment::builder("dev")
            .engine_factory(StallingEngineFactory)
            .build();
        let id = env.add_topology(spec()).await.unwrap();
        env.start().await.unwrap();

        env.stop_application(&id, false, None).await.unwrap();

        // The engine only initiated shutdown; the record must not claim a
        // clean stop, and the handle stays available for re-checking.
        assert_eq!(env.application_state(&id).await.unwrap(), AppState::Started);
        let info = env.describe(&id).await.unwrap();
        assert_eq!(info.engine_state, Some(EngineState::Running));
    }

    #[tokio::test]
    async fn test_setter_racing_first_start_is_serialized() {
        let env = env("dev");
        env.add_topology(spec()).await.unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&log);
        let (added, started) = tokio::join!(
            env.add_interceptor(move || {
                Box::new(Ordered {
                    label: "raced",
                    log: Arc::clone(&seen),
                })
            }),
            env.start(),
        );
        started.unwrap();

        // The mutation either lands before any chain snapshot (every started
        // application observes it) or is rejected outright; it can never be
        // applied mid-bulk-start.
        match added {
            Ok(()) => assert_eq!(*log.lock().unwrap(), vec!["raced"]),
            Err(err) => {
                assert_eq!(err.as_label(), "env_illegal_state");
                assert!(log.lock().unwrap().is_empty());
            }
        }
    }

    #[tokio::test]
    async fn test_registration_events_are_published() {
        let env = env("dev");
        let mut events = env.events();

        let id = env.add_topology(spec()).await.unwrap();
        env.start().await.unwrap();

        let mut kinds = Vec::new();
        for _ in 0..4 {
            kinds.push(events.recv().await.unwrap().kind);
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::ApplicationRegistered,
                EventKind::ApplicationStarting,
                EventKind::ApplicationStarted,
                EventKind::EnvironmentStarted,
            ]
        );
        assert!(env.describe(&id).await.is_ok());
    }
}
