//! # Engine handle and factory contracts.
//!
//! An [`Engine`] wraps one running instance of the underlying stream-processing
//! runtime. The environment only depends on its lifecycle contract: start, stop
//! with optional state cleanup, and state-change notifications via a
//! [`tokio::sync::watch`] channel.
//!
//! The environment calls [`EngineFactory::make`] exclusively from the terminal
//! action of an interceptor chain, with the application's effective configuration
//! already merged.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::config::Conf;
use crate::engine::TopologyProvider;
use crate::error::EngineError;

/// Coarse lifecycle state reported by an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Built but not started.
    Created,
    /// Processing threads are running.
    Running,
    /// Fully quiesced.
    Stopped,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Created => "created",
            EngineState::Running => "running",
            EngineState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Handle to one startable/stoppable engine instance.
///
/// Implementations may run arbitrary worker threads internally; the environment
/// never inspects execution semantics, only this lifecycle surface.
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    /// Starts the engine.
    async fn start(&self) -> Result<(), EngineError>;

    /// Stops the engine, optionally cleaning up local state.
    ///
    /// Returns `true` if the engine fully quiesced before returning. The
    /// environment additionally bounds this call with the caller-supplied
    /// timeout, so implementations need not enforce one themselves.
    async fn stop(&self, clean_up: bool) -> Result<bool, EngineError>;

    /// Current engine state.
    fn state(&self) -> EngineState;

    /// Subscribes to state transitions.
    ///
    /// The environment forwards transitions onto its event bus for as long as
    /// the engine is alive.
    fn watch_state(&self) -> watch::Receiver<EngineState>;
}

/// Assembles engines from a merged configuration and a topology definition.
///
/// Real factories typically downcast the provider (via
/// [`TopologyProvider::as_any`]) to their own topology representation.
pub trait EngineFactory: Send + Sync + 'static {
    /// Builds a new engine for `provider` under `conf`.
    fn make(
        &self,
        conf: &Conf,
        provider: &dyn TopologyProvider,
    ) -> Result<Arc<dyn Engine>, EngineError>;
}
