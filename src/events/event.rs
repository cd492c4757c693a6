//! # Lifecycle events emitted by the execution environment.
//!
//! [`EventKind`] classifies what happened; [`Event`] carries the metadata:
//! a monotonic global sequence number for ordering, a wall-clock timestamp, and
//! optional fields set per kind (application id, interceptor name, reason,
//! timeout, engine state).

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::engine::EngineState;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of environment events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Environment ===
    /// The environment transitioned to started.
    EnvironmentStarted,

    // === Application lifecycle ===
    /// A topology was registered and an id allocated.
    ///
    /// Sets: `application`.
    ApplicationRegistered,

    /// The start chain for an application began.
    ///
    /// Sets: `application`.
    ApplicationStarting,

    /// The engine for an application was built and started.
    ///
    /// Sets: `application`.
    ApplicationStarted,

    /// Engine construction or startup failed; the application stays registered.
    ///
    /// Sets: `application`, `reason`.
    ApplicationStartFailed,

    /// The stop chain for an application began.
    ///
    /// Sets: `application`.
    ApplicationStopping,

    /// The engine reported itself stopped.
    ///
    /// Sets: `application`.
    ApplicationStopped,

    /// The engine failed while shutting down.
    ///
    /// Sets: `application`, `reason`.
    ApplicationStopFailed,

    /// The engine did not quiesce within the caller-supplied timeout.
    ///
    /// Sets: `application`, `timeout_ms`.
    StopTimeoutExceeded,

    /// The application was removed from the registry; its id is retired.
    ///
    /// Sets: `application`.
    ApplicationRemoved,

    // === Interceptors ===
    /// An interceptor failed during a start/stop chain and was skipped.
    ///
    /// Sets: `application`, `interceptor`, `reason`.
    InterceptorFailed,

    // === Engine notifications ===
    /// A running engine reported a state transition.
    ///
    /// Sets: `application`, `engine_state`.
    EngineStateChanged,
}

/// Environment event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Application id, if applicable.
    pub application: Option<Arc<str>>,
    /// Interceptor name, if applicable.
    pub interceptor: Option<Arc<str>>,
    /// Human-readable reason (errors, timeout details).
    pub reason: Option<Arc<str>>,
    /// Shutdown timeout in milliseconds (compact).
    pub timeout_ms: Option<u64>,
    /// Engine state carried by [`EventKind::EngineStateChanged`].
    pub engine_state: Option<EngineState>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            application: None,
            interceptor: None,
            reason: None,
            timeout_ms: None,
            engine_state: None,
        }
    }

    /// Attaches an application id.
    #[inline]
    pub fn with_application(mut self, application: impl Into<Arc<str>>) -> Self {
        self.application = Some(application.into());
        self
    }

    /// Attaches an interceptor name.
    #[inline]
    pub fn with_interceptor(mut self, interceptor: impl Into<Arc<str>>) -> Self {
        self.interceptor = Some(interceptor.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches an engine state.
    #[inline]
    pub fn with_engine_state(mut self, state: EngineState) -> Self {
        self.engine_state = Some(state);
        self
    }
}
