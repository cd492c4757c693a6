//! # Lifecycle interceptor protocol.
//!
//! Every start/stop transition of a managed application is wrapped in a chain of
//! pluggable interceptors:
//!
//! ```text
//! environment ──► LifecycleChain::execute()
//!                    │
//!                    ├─► interceptor 1 ── on_start(ctx, chain) ──► chain.execute()
//!                    ├─► interceptor 2 ── on_start(ctx, chain) ──► chain.execute()
//!                    │        (failure → logged, treated as pass-through)
//!                    └─► terminal action (engine build + start / engine stop)
//! ```
//!
//! Interceptors get programmatic control over the chain: one that never calls
//! `chain.execute()` halts the remaining interceptors and the terminal action.
//! One that fails behaves as if it had delegated. The terminal action runs at
//! most once regardless of how interceptors behave.

mod chain;
mod interceptor;

pub use chain::{chain_callback, ChainCallback, LifecycleChain, TerminalAction};
pub use interceptor::{
    InterceptorFactory, LifecycleContext, LifecycleInterceptor, Phase,
};
