//! In-process loopback provider.
//!
//! Messages published to a topic with no live subscriber are kept in a
//! per-topic backlog and handed to the next subscription on that topic, so a
//! `send` followed by `subscribe` + `receive` round-trips the payload. The
//! backlog is bounded; once full, the oldest message is dropped.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::definition::{EventNode, ProviderDefinition};
use crate::error::{EventError, EventResult};
use crate::handler::MessageHandler;
use crate::listener::ShutdownSignal;
use crate::provider::{MessageHeaders, MessageProvider};

/// Messages kept per topic while no subscriber is attached.
pub const DEFAULT_BACKLOG_LIMIT: usize = 1024;

type Receiver = Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>;

#[derive(Default)]
struct Topics {
    subscribers: HashMap<String, Vec<mpsc::UnboundedSender<Vec<u8>>>>,
    backlog: HashMap<String, VecDeque<Vec<u8>>>,
}

/// Loopback message provider for tests and single-process deployments.
pub struct MemoryProvider {
    definition: ProviderDefinition,
    backlog_limit: usize,
    topics: RwLock<Topics>,
    subscriptions: RwLock<HashMap<String, Receiver>>,
}

impl MemoryProvider {
    /// Creates a new loopback provider.
    pub fn new(definition: ProviderDefinition) -> Self {
        Self {
            definition,
            backlog_limit: DEFAULT_BACKLOG_LIMIT,
            topics: RwLock::new(Topics::default()),
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    /// Sets how many undelivered messages are kept per topic.
    pub fn with_backlog_limit(mut self, limit: usize) -> Self {
        self.backlog_limit = limit;
        self
    }

    /// Creates a shared loopback provider.
    pub fn shared(definition: ProviderDefinition) -> Arc<Self> {
        Arc::new(Self::new(definition))
    }

    /// Closes every subscription on `topic`.
    ///
    /// Listeners on the topic finish once they have consumed what was already
    /// delivered to them.
    pub async fn close_topic(&self, topic: &str) {
        let mut topics = self.topics.write().await;
        topics.subscribers.remove(topic);
    }

    /// Returns the number of messages waiting for a subscriber on `topic`.
    pub async fn backlog_len(&self, topic: &str) -> usize {
        let topics = self.topics.read().await;
        topics.backlog.get(topic).map(|q| q.len()).unwrap_or(0)
    }

    async fn open_channel(&self, topic: &str) -> mpsc::UnboundedReceiver<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut topics = self.topics.write().await;
        if let Some(pending) = topics.backlog.remove(topic) {
            for payload in pending {
                // rx is alive, send cannot fail
                let _ = tx.send(payload);
            }
        }
        topics.subscribers.entry(topic.to_string()).or_default().push(tx);
        rx
    }
}

#[async_trait]
impl MessageProvider for MemoryProvider {
    fn definition(&self) -> &ProviderDefinition {
        &self.definition
    }

    async fn send(
        &self,
        destination: &EventNode,
        payload: &[u8],
        headers: Option<&MessageHeaders>,
    ) -> EventResult<()> {
        tracing::debug!(
            topic = %destination.topic,
            bytes = payload.len(),
            headers = headers.map(|h| h.len()).unwrap_or(0),
            "memoryProvider: sending"
        );
        let mut topics = self.topics.write().await;
        let delivered = match topics.subscribers.get_mut(&destination.topic) {
            Some(senders) => {
                senders.retain(|tx| tx.send(payload.to_vec()).is_ok());
                !senders.is_empty()
            }
            None => false,
        };
        if !delivered {
            if self.backlog_limit == 0 {
                tracing::warn!(topic = %destination.topic, "memoryProvider: no subscriber, message dropped");
                return Ok(());
            }
            let backlog = topics.backlog.entry(destination.topic.clone()).or_default();
            if backlog.len() >= self.backlog_limit {
                backlog.pop_front();
                tracing::warn!(
                    topic = %destination.topic,
                    limit = self.backlog_limit,
                    "memoryProvider: backlog full, dropped oldest message"
                );
            }
            backlog.push_back(payload.to_vec());
        }
        Ok(())
    }

    async fn subscribe(&self, source: &EventNode) -> EventResult<()> {
        let rx = self.open_channel(&source.topic).await;
        let mut subscriptions = self.subscriptions.write().await;
        subscriptions.insert(source.name.clone(), Arc::new(Mutex::new(rx)));
        Ok(())
    }

    async fn receive(&self, source: &EventNode) -> EventResult<Vec<u8>> {
        let subscription = {
            let subscriptions = self.subscriptions.read().await;
            subscriptions.get(&source.name).cloned()
        };
        let Some(subscription) = subscription else {
            tracing::error!(
                "no subscription for eventSource '{}'. It should be defined and subscribed to.",
                source.name
            );
            return Err(EventError::NotSubscribed(source.name.clone()));
        };

        let timeout = self.definition.timeout;
        let mut rx = subscription.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(payload)) => Ok(payload),
            Ok(None) => Err(EventError::transport(format!(
                "subscription for '{}' is closed",
                source.name
            ))),
            Err(_) => Err(EventError::Timeout(timeout)),
        }
    }

    async fn listen_and_serve(
        &self,
        source: &EventNode,
        handler: Arc<dyn MessageHandler>,
        mut shutdown: ShutdownSignal,
    ) {
        let mut rx = self.open_channel(&source.topic).await;
        tracing::debug!(topic = %source.topic, "memoryProvider: listening");

        loop {
            tokio::select! {
                biased;
                message = rx.recv() => match message {
                    Some(payload) => {
                        if let Err(e) = handler.handle(&payload).await {
                            tracing::warn!(
                                source = %source.name,
                                handler = handler.id(),
                                "handler error: {}",
                                e
                            );
                        }
                    }
                    None => break,
                },
                _ = shutdown.cancelled() => break,
            }
        }

        rx.close();
        while let Ok(payload) = rx.try_recv() {
            if let Err(e) = handler.handle(&payload).await {
                tracing::warn!(source = %source.name, "handler error while draining: {}", e);
            }
        }
    }
}
