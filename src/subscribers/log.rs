//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format:
//!
//! ```text
//! [registered] app=dev-word-count-1a2b3c4d
//! [starting] app=dev-word-count-1a2b3c4d
//! [started] app=dev-word-count-1a2b3c4d
//! [interceptor-failed] app=dev-word-count-1a2b3c4d interceptor=monitoring reason="boom"
//! [stop-timeout] app=dev-word-count-1a2b3c4d timeout_ms=5000
//! ```
//!
//! Not intended for production use; implement a custom
//! [`Subscribe`](crate::subscribers::Subscribe) for structured logging or metrics.

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Stdout logging subscriber.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let app = e.application.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::EnvironmentStarted => println!("[environment-started]"),
            EventKind::ApplicationRegistered => println!("[registered] app={app}"),
            EventKind::ApplicationStarting => println!("[starting] app={app}"),
            EventKind::ApplicationStarted => println!("[started] app={app}"),
            EventKind::ApplicationStartFailed => {
                println!("[start-failed] app={app} reason={:?}", e.reason)
            }
            EventKind::ApplicationStopping => println!("[stopping] app={app}"),
            EventKind::ApplicationStopped => println!("[stopped] app={app}"),
            EventKind::ApplicationStopFailed => {
                println!("[stop-failed] app={app} reason={:?}", e.reason)
            }
            EventKind::StopTimeoutExceeded => {
                println!("[stop-timeout] app={app} timeout_ms={:?}", e.timeout_ms)
            }
            EventKind::ApplicationRemoved => println!("[removed] app={app}"),
            EventKind::InterceptorFailed => println!(
                "[interceptor-failed] app={app} interceptor={:?} reason={:?}",
                e.interceptor, e.reason
            ),
            EventKind::EngineStateChanged => {
                println!("[engine-state] app={app} state={:?}", e.engine_state)
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
