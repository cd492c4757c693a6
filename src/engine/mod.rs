//! # Engine collaborator contracts.
//!
//! The environment manages lifecycles; the processing engine itself is an external
//! collaborator. This module defines the contracts the environment depends on:
//!
//! - [`Engine`] / [`EngineFactory`] — a startable/stoppable engine handle and the
//!   factory that assembles one from a merged configuration and a topology provider;
//! - [`TopologyProvider`] / [`TopologySpec`] — per-application topology registration;
//! - [`ApplicationId`] / [`ApplicationIdBuilder`] — the identity scheme;
//! - [`NoopEngine`] — a state-tracking reference engine for demos and tests.

mod handle;
mod id;
mod noop;
mod topology;

pub use handle::{Engine, EngineFactory, EngineState};
pub use id::{
    ApplicationId, ApplicationIdBuilder, DefaultApplicationIdBuilder, APPLICATION_NAME_CONFIG,
};
pub use noop::{NoopEngine, NoopEngineFactory};
pub use topology::{TopologyProvider, TopologyProviderFactory, TopologySpec};
