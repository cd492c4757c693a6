//! # Re-entrant chain executor.
//!
//! [`LifecycleChain`] drives an ordered, possibly-empty sequence of interceptors
//! and guarantees the terminal action runs exactly once after the last
//! interceptor (or immediately when the sequence is empty).
//!
//! ## Contract
//! - The chain feeds interceptors one at a time to a caller-supplied
//!   [`ChainCallback`]; the callback decides which hook to invoke.
//! - Each interceptor receives the chain handle and chooses when (or whether) to
//!   call [`LifecycleChain::execute`] again. Not delegating halts the rest of the
//!   chain and the terminal action.
//! - A failing interceptor (error return or panic) is logged with its name and
//!   behaves as if it had delegated: the executor immediately proceeds to the
//!   next interceptor or the terminal action.
//! - No result is returned; completion is observable only through the terminal
//!   action's side effects.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::error;

use crate::error::InterceptorError;
use crate::events::{Bus, Event, EventKind};
use crate::lifecycle::interceptor::LifecycleInterceptor;

/// Invokes one interceptor hook, handing it the re-entrant chain handle.
pub type ChainCallback = Arc<
    dyn for<'a> Fn(
            &'a dyn LifecycleInterceptor,
            &'a mut LifecycleChain,
        ) -> BoxFuture<'a, Result<(), InterceptorError>>
        + Send
        + Sync,
>;

/// Action executed once the interceptor sequence is exhausted.
pub type TerminalAction = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Coerces a closure into a [`ChainCallback`].
pub fn chain_callback<F>(f: F) -> ChainCallback
where
    F: for<'a> Fn(
            &'a dyn LifecycleInterceptor,
            &'a mut LifecycleChain,
        ) -> BoxFuture<'a, Result<(), InterceptorError>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Forward-only cursor over an interceptor sequence plus the callback and
/// terminal action for one start/stop transition.
///
/// A fresh chain is constructed for every transition; it is never reused.
pub struct LifecycleChain {
    interceptors: std::vec::IntoIter<Box<dyn LifecycleInterceptor>>,
    callback: ChainCallback,
    terminal: Option<TerminalAction>,
    bus: Option<Bus>,
    application: Option<Arc<str>>,
}

impl LifecycleChain {
    /// Creates a chain over `interceptors`, in order.
    pub fn new(
        interceptors: Vec<Box<dyn LifecycleInterceptor>>,
        callback: ChainCallback,
        terminal: TerminalAction,
    ) -> Self {
        Self {
            interceptors: interceptors.into_iter(),
            callback,
            terminal: Some(terminal),
            bus: None,
            application: None,
        }
    }

    /// Publishes an [`EventKind::InterceptorFailed`] event for every skipped
    /// interceptor, attributed to `application`.
    pub fn with_bus(mut self, bus: Bus, application: impl Into<Arc<str>>) -> Self {
        self.bus = Some(bus);
        self.application = Some(application.into());
        self
    }

    /// Advances the chain by one interceptor, or runs the terminal action when
    /// no interceptor remains.
    ///
    /// Re-entrant: interceptors call this through the handle they are given.
    /// The terminal action is consumed on first use, so it runs at most once no
    /// matter how interceptors combine delegation and failure.
    pub fn execute(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let Some(interceptor) = self.interceptors.next() else {
                if let Some(terminal) = self.terminal.take() {
                    terminal().await;
                }
                return;
            };

            let callback = Arc::clone(&self.callback);
            let outcome = AssertUnwindSafe(callback(interceptor.as_ref(), &mut *self))
                .catch_unwind()
                .await;

            match outcome {
                // The interceptor ran to completion; whether the rest of the
                // chain executed was its own decision.
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    self.skip(interceptor.name(), err.to_string()).await;
                }
                Err(panic) => {
                    self.skip(interceptor.name(), panic_message(panic)).await;
                }
            }
        })
    }

    /// Logs a failed interceptor and proceeds as if it had delegated.
    async fn skip(&mut self, name: &str, reason: String) {
        error!(interceptor = name, %reason, "lifecycle interceptor failed, continuing chain");
        if let (Some(bus), Some(application)) = (&self.bus, &self.application) {
            bus.publish(
                Event::new(EventKind::InterceptorFailed)
                    .with_application(Arc::clone(application))
                    .with_interceptor(name.to_owned())
                    .with_reason(reason),
            );
        }
        self.execute().await;
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::config::Conf;
    use crate::engine::{ApplicationId, EngineState};
    use crate::lifecycle::{LifecycleContext, Phase};

    enum Behavior {
        Delegate,
        Fail,
        DelegateThenFail,
        Halt,
        Panic,
    }

    struct Recording {
        label: &'static str,
        behavior: Behavior,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl LifecycleInterceptor for Recording {
        fn name(&self) -> &str {
            self.label
        }

        async fn on_start(
            &self,
            _ctx: Arc<LifecycleContext>,
            chain: &mut LifecycleChain,
        ) -> Result<(), InterceptorError> {
            self.log.lock().unwrap().push(self.label);
            match self.behavior {
                Behavior::Delegate => {
                    chain.execute().await;
                    Ok(())
                }
                Behavior::Fail => Err(InterceptorError::new("boom")),
                Behavior::DelegateThenFail => {
                    chain.execute().await;
                    Err(InterceptorError::new("late boom"))
                }
                Behavior::Halt => Ok(()),
                Behavior::Panic => panic!("interceptor panicked"),
            }
        }
    }

    fn recording(
        label: &'static str,
        behavior: Behavior,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Box<dyn LifecycleInterceptor> {
        Box::new(Recording {
            label,
            behavior,
            log: Arc::clone(log),
        })
    }

    fn start_chain(
        interceptors: Vec<Box<dyn LifecycleInterceptor>>,
        terminal_runs: &Arc<AtomicUsize>,
    ) -> LifecycleChain {
        let ctx = Arc::new(LifecycleContext::new(
            ApplicationId::from("test-app"),
            "test-env",
            Conf::new(),
            Phase::Start,
            EngineState::Created,
        ));
        let callback = chain_callback(move |i, chain| i.on_start(Arc::clone(&ctx), chain));
        let runs = Arc::clone(terminal_runs);
        let terminal: TerminalAction = Box::new(move || {
            Box::pin(async move {
                runs.fetch_add(1, Ordering::SeqCst);
            })
        });
        LifecycleChain::new(interceptors, callback, terminal)
    }

    #[tokio::test]
    async fn test_empty_chain_runs_terminal_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut chain = start_chain(Vec::new(), &runs);
        chain.execute().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_delegating_visit_in_order() {
        let runs = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = start_chain(
            vec![
                recording("a", Behavior::Delegate, &log),
                recording("b", Behavior::Delegate, &log),
                recording("c", Behavior::Delegate, &log),
            ],
            &runs,
        );
        chain.execute().await;

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_interceptor_is_skipped() {
        let runs = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = start_chain(
            vec![
                recording("a", Behavior::Delegate, &log),
                recording("b", Behavior::Fail, &log),
                recording("c", Behavior::Delegate, &log),
            ],
            &runs,
        );
        chain.execute().await;

        // Interceptors after the failing one are still visited, in order.
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_interceptor_is_skipped() {
        let runs = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = start_chain(
            vec![
                recording("a", Behavior::Panic, &log),
                recording("b", Behavior::Delegate, &log),
            ],
            &runs,
        );
        chain.execute().await;

        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_failing_still_run_terminal_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = start_chain(
            vec![
                recording("a", Behavior::Fail, &log),
                recording("b", Behavior::Panic, &log),
                recording("c", Behavior::Fail, &log),
            ],
            &runs,
        );
        chain.execute().await;

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_delegating_interceptor_halts_chain() {
        let runs = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = start_chain(
            vec![
                recording("a", Behavior::Delegate, &log),
                recording("b", Behavior::Halt, &log),
                recording("c", Behavior::Delegate, &log),
            ],
            &runs,
        );
        chain.execute().await;

        // Nothing after the halting interceptor runs, terminal included.
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_delegate_then_fail_runs_terminal_exactly_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = start_chain(
            vec![
                recording("a", Behavior::DelegateThenFail, &log),
                recording("b", Behavior::Delegate, &log),
            ],
            &runs,
        );
        chain.execute().await;

        // "a" delegated (running "b" and the terminal), then failed; the
        // failure path re-enters an exhausted chain and must not re-run the
        // terminal action.
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_interceptor_publishes_event() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let runs = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut chain = start_chain(vec![recording("bad", Behavior::Fail, &log)], &runs)
            .with_bus(bus, "app-1");
        chain.execute().await;

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::InterceptorFailed);
        assert_eq!(ev.interceptor.as_deref(), Some("bad"));
        assert_eq!(ev.application.as_deref(), Some("app-1"));
    }
}
