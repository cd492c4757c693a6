//! # Interceptor contract and per-chain context.
//!
//! A [`LifecycleInterceptor`] hooks into application start/stop transitions.
//! Hooks receive the invocation [`LifecycleContext`] and a mutable handle to the
//! running [`LifecycleChain`]; calling `chain.execute().await` continues the
//! chain, not calling it halts everything after this interceptor, including the
//! terminal action.
//!
//! Both default hook implementations simply delegate, so an interceptor only
//! interested in one phase implements the other for free.
//!
//! Interceptors may be stateful per lifecycle run: the environment produces one
//! fresh instance per registered [`InterceptorFactory`] for every chain it builds.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Conf;
use crate::engine::{ApplicationId, EngineState};
use crate::error::InterceptorError;
use crate::lifecycle::chain::LifecycleChain;

/// Which transition a chain is wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// The chain terminates in engine construction and startup.
    Start,
    /// The chain terminates in engine shutdown.
    Stop,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Start => "start",
            Phase::Stop => "stop",
        })
    }
}

/// Immutable view of one chain invocation, shared with every interceptor.
#[derive(Clone, Debug)]
pub struct LifecycleContext {
    application: ApplicationId,
    environment: String,
    conf: Conf,
    phase: Phase,
    engine_state: EngineState,
}

impl LifecycleContext {
    /// Creates a context snapshot for one chain run.
    pub fn new(
        application: ApplicationId,
        environment: impl Into<String>,
        conf: Conf,
        phase: Phase,
        engine_state: EngineState,
    ) -> Self {
        Self {
            application,
            environment: environment.into(),
            conf,
            phase,
            engine_state,
        }
    }

    /// Id of the application being transitioned.
    pub fn application(&self) -> &ApplicationId {
        &self.application
    }

    /// Name of the owning environment.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// The application's effective (merged) configuration.
    pub fn conf(&self) -> &Conf {
        &self.conf
    }

    /// Which transition this chain wraps.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Engine state observed when the chain was built.
    pub fn engine_state(&self) -> EngineState {
        self.engine_state
    }
}

/// Hook wrapping application start/stop transitions.
///
/// Implementations are supplied by third parties and are assumed fast; a failure
/// (error or panic) is logged and treated as pass-through, never aborting the
/// transition.
#[async_trait]
pub trait LifecycleInterceptor: Send + Sync + 'static {
    /// Name used in diagnostics when this interceptor fails.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Invoked before an application starts. Default: delegate.
    async fn on_start(
        &self,
        ctx: Arc<LifecycleContext>,
        chain: &mut LifecycleChain,
    ) -> Result<(), InterceptorError> {
        let _ = ctx;
        chain.execute().await;
        Ok(())
    }

    /// Invoked before an application stops. Default: delegate.
    async fn on_stop(
        &self,
        ctx: Arc<LifecycleContext>,
        chain: &mut LifecycleChain,
    ) -> Result<(), InterceptorError> {
        let _ = ctx;
        chain.execute().await;
        Ok(())
    }
}

/// Produces one fresh interceptor instance per chain run.
pub type InterceptorFactory = Arc<dyn Fn() -> Box<dyn LifecycleInterceptor> + Send + Sync>;
