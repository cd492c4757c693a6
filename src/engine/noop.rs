//! # State-tracking reference engine.
//!
//! [`NoopEngine`] processes nothing: it only maintains and publishes its
//! lifecycle state, making it useful as the builder default, in demos, and in
//! tests that exercise environment semantics without a real runtime.
//!
//! An optional stop delay simulates slow shutdowns, which is how the
//! stop-timeout path can be observed without a real engine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time;

use crate::config::Conf;
use crate::engine::{Engine, EngineFactory, EngineState, TopologyProvider};
use crate::error::EngineError;

/// Engine that tracks state and does nothing else.
pub struct NoopEngine {
    state: watch::Sender<EngineState>,
    stop_delay: Option<Duration>,
}

impl NoopEngine {
    /// Creates an engine in [`EngineState::Created`].
    pub fn new() -> Self {
        let (state, _) = watch::channel(EngineState::Created);
        Self {
            state,
            stop_delay: None,
        }
    }

    /// Simulates a slow shutdown: `stop` sleeps for `delay` before quiescing.
    pub fn with_stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = Some(delay);
        self
    }
}

impl Default for NoopEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Engine for NoopEngine {
    async fn start(&self) -> Result<(), EngineError> {
        let _ = self.state.send(EngineState::Running);
        Ok(())
    }

    async fn stop(&self, _clean_up: bool) -> Result<bool, EngineError> {
        if let Some(delay) = self.stop_delay {
            time::sleep(delay).await;
        }
        let _ = self.state.send(EngineState::Stopped);
        Ok(true)
    }

    fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    fn watch_state(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }
}

/// Factory producing [`NoopEngine`]s; the builder default.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEngineFactory {
    stop_delay: Option<Duration>,
}

impl NoopEngineFactory {
    /// Creates a factory for instantly-stopping engines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every produced engine simulates a shutdown taking `delay`.
    pub fn with_stop_delay(delay: Duration) -> Self {
        Self {
            stop_delay: Some(delay),
        }
    }
}

impl EngineFactory for NoopEngineFactory {
    fn make(
        &self,
        _conf: &Conf,
        _provider: &dyn TopologyProvider,
    ) -> Result<Arc<dyn Engine>, EngineError> {
        let mut engine = NoopEngine::new();
        if let Some(delay) = self.stop_delay {
            engine = engine.with_stop_delay(delay);
        }
        Ok(Arc::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_engine_tracks_state() {
        let engine = NoopEngine::new();
        assert_eq!(engine.state(), EngineState::Created);

        engine.start().await.unwrap();
        assert_eq!(engine.state(), EngineState::Running);

        let quiesced = engine.stop(false).await.unwrap();
        assert!(quiesced);
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[tokio::test]
    async fn test_watch_state_observes_transitions() {
        let engine = NoopEngine::new();
        let mut rx = engine.watch_state();

        engine.start().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), EngineState::Running);
    }
}
