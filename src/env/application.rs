//! # Per-application record.
//!
//! A [`ManagedApplication`] is the environment's internal state for one
//! registered application: its immutable [`ApplicationId`], the registration
//! [`TopologySpec`], the current [`AppState`], and (once started) a handle to
//! the running engine plus the task forwarding engine state changes onto the
//! event bus.
//!
//! Two locks with distinct roles:
//! - `transition` serializes start/stop for this one application. It is held
//!   across the whole chain run, so a start and a stop for the same id can
//!   never interleave — while transitions for different applications proceed
//!   concurrently.
//! - `runtime` guards the mutable runtime fields and is held only for short
//!   reads/writes, keeping status queries cheap during a long transition.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;

use crate::engine::{ApplicationId, Engine, EngineState, TopologySpec};

/// Lifecycle state of one managed application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppState {
    /// Registered, engine not yet built.
    Created,
    /// Engine built and started.
    Started,
    /// Engine shut down; the record remains until removed.
    Stopped,
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AppState::Created => "created",
            AppState::Started => "started",
            AppState::Stopped => "stopped",
        })
    }
}

/// Mutable runtime half of a [`ManagedApplication`].
pub(crate) struct AppRuntime {
    pub(crate) state: AppState,
    pub(crate) engine: Option<Arc<dyn Engine>>,
    pub(crate) forwarder: Option<JoinHandle<()>>,
}

/// The environment's record for one registered application.
pub struct ManagedApplication {
    id: ApplicationId,
    spec: TopologySpec,
    transition: Mutex<()>,
    runtime: RwLock<AppRuntime>,
}

impl ManagedApplication {
    /// Creates a record in [`AppState::Created`].
    pub(crate) fn new(id: ApplicationId, spec: TopologySpec) -> Self {
        Self {
            id,
            spec,
            transition: Mutex::new(()),
            runtime: RwLock::new(AppRuntime {
                state: AppState::Created,
                engine: None,
                forwarder: None,
            }),
        }
    }

    /// The application's immutable identity.
    pub fn id(&self) -> &ApplicationId {
        &self.id
    }

    /// The registration bundle.
    pub fn spec(&self) -> &TopologySpec {
        &self.spec
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> AppState {
        self.runtime.read().await.state
    }

    /// Handle to the running engine, if any.
    pub async fn engine(&self) -> Option<Arc<dyn Engine>> {
        self.runtime.read().await.engine.clone()
    }

    /// State reported by the engine, if one has been built.
    pub async fn engine_state(&self) -> Option<EngineState> {
        self.runtime.read().await.engine.as_ref().map(|e| e.state())
    }

    /// Acquires the per-application transition lock.
    pub(crate) async fn begin_transition(&self) -> MutexGuard<'_, ()> {
        self.transition.lock().await
    }

    pub(crate) fn runtime(&self) -> &RwLock<AppRuntime> {
        &self.runtime
    }
}

impl Drop for ManagedApplication {
    fn drop(&mut self) {
        // The forwarder borrows nothing from the record, but keeping it alive
        // past removal would leak a task watching a dead engine.
        if let Some(forwarder) = self.runtime.get_mut().forwarder.take() {
            forwarder.abort();
        }
    }
}

impl fmt::Debug for ManagedApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedApplication")
            .field("id", &self.id)
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Point-in-time snapshot of one application, for status queries.
#[derive(Clone, Debug)]
pub struct ApplicationInfo {
    /// The application's id.
    pub id: ApplicationId,
    /// Overridden logical name from the registration, if any.
    pub name: Option<String>,
    /// Free-form description from the registration, if any.
    pub description: Option<String>,
    /// Lifecycle state at snapshot time.
    pub state: AppState,
    /// Engine-reported state, once an engine exists.
    pub engine_state: Option<EngineState>,
}

impl ManagedApplication {
    /// Snapshots the application for a status query.
    pub async fn info(&self) -> ApplicationInfo {
        let runtime = self.runtime.read().await;
        ApplicationInfo {
            id: self.id.clone(),
            name: self.spec.name().map(str::to_owned),
            description: self.spec.description().map(str::to_owned),
            state: runtime.state,
            engine_state: runtime.engine.as_ref().map(|e| e.state()),
        }
    }
}
