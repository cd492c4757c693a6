//! # Execution environment: registry, lifecycle surface, construction.
//!
//! ```text
//!                         ┌────────────────────────────┐
//!  add_topology ────────► │     ExecutionEnvironment   │
//!  start / stop ────────► │  settings ── interceptors  │
//!  remove ──────────────► │  registry ── applications  │
//!                         └──────┬──────────────┬──────┘
//!                                │ chain        │ events
//!                                ▼              ▼
//!                       LifecycleChain         Bus ──► subscribers
//!                           │ terminal
//!                           ▼
//!                    EngineFactory ──► Engine (start/stop/watch)
//! ```
//!
//! - [`ExecutionEnvironment`] — the public lifecycle surface.
//! - [`EnvironmentBuilder`] — construction with per-collaborator defaults.
//! - [`ManagedApplication`] — per-application record (id, spec, state, engine).

mod application;
mod builder;
mod environment;
mod registry;

pub use application::{AppState, ApplicationInfo, ManagedApplication};
pub use builder::EnvironmentBuilder;
pub use environment::{EnvState, ExecutionEnvironment};
