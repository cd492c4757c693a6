//! Error types used by the execution environment and its collaborators.
//!
//! This module defines three error enums:
//!
//! - [`EnvError`] — usage errors raised by the environment itself (illegal state,
//!   unknown application id, identity or component resolution failures). These are
//!   always surfaced synchronously to the caller.
//! - [`EngineError`] — failures reported by an engine collaborator (build, start,
//!   stop). During bulk operations these are logged per application and never fail
//!   the bulk call.
//! - [`InterceptorError`] — failures raised by a lifecycle interceptor hook. These
//!   are contained at the chain boundary and never escape to the original caller.
//!
//! [`EnvError`] and [`EngineError`] provide `as_label` helpers for logs/metrics.

use thiserror::Error;

use crate::engine::ApplicationId;
use crate::env::EnvState;

/// # Usage errors raised by the execution environment.
///
/// Every variant represents a caller mistake or a resolution failure that must
/// stop the offending operation. None of these are retried by the environment.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EnvError {
    /// A structural mutation or lifecycle call was made in the wrong environment state.
    #[error("operation '{operation}' is illegal while the environment is {state}")]
    IllegalState {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Environment state at the time of the call.
        state: EnvState,
    },

    /// `start()` was called on an environment that is already started.
    #[error("environment '{name}' is already started")]
    AlreadyStarted {
        /// Environment name.
        name: String,
    },

    /// The given id does not map to any registered application.
    #[error("no application registered for id '{id}'")]
    UnknownApplication {
        /// The offending id.
        id: ApplicationId,
    },

    /// The identity builder could not produce an application id.
    #[error("failed to build application id: {reason}")]
    IdBuild {
        /// Why the id could not be built.
        reason: String,
    },

    /// The identity builder produced an id that is already registered.
    #[error("application id '{id}' is already registered")]
    IdCollision {
        /// The colliding id.
        id: ApplicationId,
    },

    /// No component descriptor matched the given qualifier.
    #[error("no component found for selector '{selector}'")]
    NoSuchComponent {
        /// Textual form of the qualifier that matched nothing.
        selector: String,
    },

    /// More than one component descriptor matched a single-component lookup.
    #[error("expected a single component for selector '{selector}', found {count}")]
    NoUniqueComponent {
        /// Textual form of the ambiguous qualifier.
        selector: String,
        /// Number of matching candidates.
        count: usize,
    },

    /// A registered component factory failed to produce an instance.
    #[error("could not instantiate component '{component}': {reason}")]
    Instantiation {
        /// Name of the offending component.
        component: String,
        /// Failure reported by the factory.
        reason: String,
    },
}

impl EnvError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EnvError::IllegalState { .. } => "env_illegal_state",
            EnvError::AlreadyStarted { .. } => "env_already_started",
            EnvError::UnknownApplication { .. } => "env_unknown_application",
            EnvError::IdBuild { .. } => "env_id_build_failed",
            EnvError::IdCollision { .. } => "env_id_collision",
            EnvError::NoSuchComponent { .. } => "component_not_found",
            EnvError::NoUniqueComponent { .. } => "component_not_unique",
            EnvError::Instantiation { .. } => "component_instantiation_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// # Failures reported by an engine collaborator.
///
/// Produced by [`EngineFactory`](crate::engine::EngineFactory) and
/// [`Engine`](crate::engine::Engine) implementations. The environment logs these
/// per application; a failing engine never aborts a bulk start/stop sequence.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    /// The factory could not assemble an engine for the given topology.
    #[error("failed to build engine: {reason}")]
    Build {
        /// Failure reported by the factory.
        reason: String,
    },

    /// The engine failed to start.
    #[error("engine failed to start: {reason}")]
    Start {
        /// Failure reported by the engine.
        reason: String,
    },

    /// The engine failed to shut down cleanly.
    #[error("engine failed to stop: {reason}")]
    Stop {
        /// Failure reported by the engine.
        reason: String,
    },
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::Build { .. } => "engine_build_failed",
            EngineError::Start { .. } => "engine_start_failed",
            EngineError::Stop { .. } => "engine_stop_failed",
        }
    }
}

/// # Failure raised by a lifecycle interceptor hook.
///
/// Returned from `on_start` / `on_stop`. The chain executor logs the failure with
/// the interceptor's name and proceeds as if the interceptor had delegated.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum InterceptorError {
    /// The hook failed; the chain continues past it.
    #[error("{reason}")]
    Failed {
        /// Failure reported by the hook.
        reason: String,
    },
}

impl InterceptorError {
    /// Creates a hook failure from any displayable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        InterceptorError::Failed {
            reason: reason.into(),
        }
    }
}
