//! Long-lived listeners and their shutdown signal.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::definition::EventNode;
use crate::handler::MessageHandler;
use crate::provider::MessageProvider;

/// Receiving half of a shutdown trigger, handed to each listener.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Returns true once shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes when shutdown is requested.
    ///
    /// If the trigger is dropped without firing, this never completes.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Sending half of a shutdown trigger.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Creates a new trigger.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Returns a signal bound to this trigger.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Fires the trigger.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// A set of listener tasks, one per event node, sharing one shutdown trigger.
pub struct ListenerSet {
    shutdown: Shutdown,
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl ListenerSet {
    /// Creates an empty listener set.
    pub fn new() -> Self {
        Self {
            shutdown: Shutdown::new(),
            tasks: Vec::new(),
        }
    }

    /// Spawns a dedicated task running `listen_and_serve` for `source`.
    pub fn spawn(
        &mut self,
        provider: Arc<dyn MessageProvider>,
        source: EventNode,
        handler: Arc<dyn MessageHandler>,
    ) {
        let signal = self.shutdown.signal();
        let name = source.name.clone();
        tracing::info!(source = %name, handler = handler.id(), "starting listener");
        let task = tokio::spawn(async move {
            provider.listen_and_serve(&source, handler, signal).await;
            tracing::info!(source = %source.name, "listener stopped");
        });
        self.tasks.push((name, task));
    }

    /// Returns the number of spawned listeners.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if no listener was spawned.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Signals every listener to stop and waits for all of them.
    pub async fn shutdown(self) {
        self.shutdown.trigger();
        for (name, task) in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(source = %name, "listener task failed: {}", e);
            }
        }
    }
}

impl Default for ListenerSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_fires() {
        let shutdown = Shutdown::new();
        let mut signal = shutdown.signal();
        assert!(!signal.is_shutdown());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .expect("signal should complete after trigger");
        assert!(signal.is_shutdown());
    }

    #[tokio::test]
    async fn test_signal_created_after_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let mut signal = shutdown.signal();
        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .expect("late signal should observe trigger");
    }

    #[tokio::test]
    async fn test_never_does_not_fire() {
        let mut signal = ShutdownSignal::never();
        let result = tokio::time::timeout(Duration::from_millis(50), signal.cancelled()).await;
        assert!(result.is_err());
    }
}
