//! Focus revalidation
//!
//! A process-wide listener bound once at startup. Each focus-gain event
//! refreshes every active read that opted into `refetch_on_focus`; disabled
//! reads never refetch. The event source is a trait so tests and headless
//! front ends can emit synthetic focus events.

use crate::query::QueryController;
use log::debug;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Source of window/tab focus-gain events
pub trait FocusSource: Send + Sync {
    /// Subscribe to focus-gain events
    fn subscribe(&self) -> broadcast::Receiver<()>;
}

/// Broadcast-backed focus source
///
/// Front ends call [`emit`](FocusSignal::emit) whenever the application
/// regains focus; tests use it to simulate the event.
pub struct FocusSignal {
    sender: broadcast::Sender<()>,
}

impl FocusSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Signal one focus-gain event
    pub fn emit(&self) {
        // No receivers is fine; nothing is listening yet.
        let _ = self.sender.send(());
    }
}

impl Default for FocusSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusSource for FocusSignal {
    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }
}

/// Listener task binding a focus source to the query controller
///
/// Dropping the trigger unsubscribes by aborting the task.
pub struct RevalidationTrigger {
    handle: JoinHandle<()>,
}

impl RevalidationTrigger {
    /// Bind the listener; call once at startup
    pub fn bind(source: &dyn FocusSource, controller: Arc<QueryController>) -> Self {
        let mut receiver = source.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(()) => {
                        debug!("focus gained, revalidating active reads");
                        controller.revalidate_active().await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Coalesce a burst of focus events into one refresh.
                        debug!("focus events lagged ({skipped} skipped)");
                        controller.revalidate_active().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Self { handle }
    }
}

impl Drop for RevalidationTrigger {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
