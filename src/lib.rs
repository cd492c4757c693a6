//! # streamvisor
//!
//! **Streamvisor** is an in-process lifecycle control plane for embedded
//! stream-processing applications.
//!
//! It provides primitives to register, start, stop, and tear down application
//! instances safely under concurrent, partially-failing hook execution. The
//! crate manages *lifecycles only*: the processing engine itself is an external
//! collaborator behind the [`Engine`] / [`EngineFactory`] contracts.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ TopologySpec │   │ TopologySpec │   │ TopologySpec │
//!   │ (user app 1) │   │ (user app 2) │   │ (user app N) │
//!   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!          ▼ add_topology     ▼                  ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ExecutionEnvironment (named control plane)                 │
//! │  - registry (ApplicationId → ManagedApplication, ordered)   │
//! │  - layered Conf (app > env > storage > fallback)            │
//! │  - interceptor factories (fresh instance per chain run)     │
//! │  - Bus (broadcast events) + SubscriberSet fan-out           │
//! └───────┬──────────────────────┬──────────────────────────────┘
//!         ▼ start / stop         ▼ events
//! ┌──────────────────────┐   ┌──────────────────────────────────┐
//! │  LifecycleChain      │   │  Bus ──► listener ──► per-sub    │
//! │  interceptor 1       │   │  queues ──► workers ──► on_event │
//! │    └─► interceptor N │   └──────────────────────────────────┘
//! │          └─► terminal action
//! │                 │
//! │                 ▼
//! │      EngineFactory::make ──► Engine::start / Engine::stop
//! └──────────────────────┘
//! ```
//!
//! ### Chain protocol
//! ```text
//! chain.execute()
//!   ├─ no interceptor left ──► run terminal action (exactly once), done
//!   └─ next interceptor ──► callback(interceptor, chain)
//!        ├─ delegates:  calls chain.execute() itself, then returns Ok
//!        ├─ halts:      returns Ok without delegating ─► rest of chain
//!        │              and terminal action are skipped (intentional)
//!        └─ fails/panics: logged with the interceptor's name, then the
//!                         executor re-invokes chain.execute() itself —
//!                         failure behaves like "pass through"
//! ```
//!
//! ## Features
//! | Area             | Description                                                   | Key types / traits                           |
//! |------------------|---------------------------------------------------------------|----------------------------------------------|
//! | **Environment**  | Register, start, stop, and remove applications by id.         | [`ExecutionEnvironment`], [`TopologySpec`]   |
//! | **Interceptors** | Hook start/stop transitions with failure isolation.           | [`LifecycleInterceptor`], [`LifecycleChain`] |
//! | **Engines**      | Plug in the actual processing runtime.                        | [`Engine`], [`EngineFactory`]                |
//! | **Identity**     | Pluggable application id schemes.                             | [`ApplicationId`], [`ApplicationIdBuilder`]  |
//! | **Components**   | Qualifier-filtered factory registry for pluggable parts.      | [`ComponentRegistry`], [`Qualifier`]         |
//! | **Subscribers**  | Observe lifecycle events (logging, metrics, custom).          | [`Subscribe`], [`Event`]                     |
//! | **Errors**       | Typed errors for environment, engine, and interceptor faults. | [`EnvError`], [`EngineError`]                |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in `LogWriter` subscriber _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::any::Any;
//! use streamvisor::{ExecutionEnvironment, TopologyProvider, TopologySpec};
//!
//! struct WordCount;
//!
//! impl TopologyProvider for WordCount {
//!     fn name(&self) -> &str {
//!         "word-count"
//!     }
//!
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Default collaborators: no-op engines, random id suffixes.
//!     let env = ExecutionEnvironment::builder("dev").build();
//!
//!     let id = env
//!         .add_topology(TopologySpec::new(|| Box::new(WordCount)).with_name("word-count"))
//!         .await?;
//!
//!     env.start().await?;
//!     println!("{id} is {}", env.application_state(&id).await?);
//!
//!     env.stop(false).await?;
//!     env.remove(&id, None).await?;
//!     Ok(())
//! }
//! ```

mod components;
mod config;
mod engine;
mod env;
mod error;
mod events;
mod lifecycle;
mod subscribers;

// ---- Public re-exports ----

pub use components::{
    by_name, by_version, Candidates, ComponentDescriptor, ComponentFactory, ComponentRegistry,
    CompositeQualifier, NamedQualifier, Qualifier, VersionQualifier,
};
pub use config::{Conf, StorageConfig};
pub use engine::{
    ApplicationId, ApplicationIdBuilder, DefaultApplicationIdBuilder, Engine, EngineFactory,
    EngineState, NoopEngine, NoopEngineFactory, TopologyProvider, TopologyProviderFactory,
    TopologySpec, APPLICATION_NAME_CONFIG,
};
pub use env::{
    AppState, ApplicationInfo, EnvState, EnvironmentBuilder, ExecutionEnvironment,
    ManagedApplication,
};
pub use error::{EngineError, EnvError, InterceptorError};
pub use events::{Bus, Event, EventKind};
pub use lifecycle::{
    chain_callback, ChainCallback, InterceptorFactory, LifecycleChain, LifecycleContext,
    LifecycleInterceptor, Phase, TerminalAction,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
