//! NATS message provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_nats::{Client, HeaderMap, Subscriber};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::{Mutex, RwLock};

use crate::definition::{EventNode, ProviderDefinition};
use crate::error::{EventError, EventResult};
use crate::handler::MessageHandler;
use crate::listener::ShutdownSignal;
use crate::provider::{MessageHeaders, MessageProvider};

/// Message provider backed by a NATS connection.
///
/// The client multiplexes all publishers over one connection and handles its
/// own locking; each synchronous subscription sits behind its own mutex.
pub struct NatsProvider {
    definition: ProviderDefinition,
    client: Client,
    subscriptions: RwLock<HashMap<String, Arc<Mutex<Subscriber>>>>,
}

impl NatsProvider {
    /// Connects to the broker named by `definition.url`.
    pub async fn connect(definition: ProviderDefinition) -> EventResult<Self> {
        let client = async_nats::connect(definition.url.as_str())
            .await
            .map_err(|e| {
                EventError::transport(format!("unable to connect to {}: {}", definition.url, e))
            })?;
        tracing::info!(provider = %definition.name, url = %definition.url, "connected to NATS");
        Ok(Self::with_client(definition, client))
    }

    /// Wraps an existing client.
    pub fn with_client(definition: ProviderDefinition, client: Client) -> Self {
        Self {
            definition,
            client,
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    fn url_and_topic(&self, node: &EventNode) -> String {
        format!("{}:{}", self.definition.url, node.topic)
    }
}

fn to_header_map(headers: &MessageHeaders) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, values) in headers {
        for value in values {
            map.append(name.as_str(), value.as_str());
        }
    }
    map
}

#[async_trait]
impl MessageProvider for NatsProvider {
    fn definition(&self) -> &ProviderDefinition {
        &self.definition
    }

    async fn send(
        &self,
        destination: &EventNode,
        payload: &[u8],
        headers: Option<&MessageHeaders>,
    ) -> EventResult<()> {
        tracing::info!(
            topic = %destination.topic,
            "natsProvider: sending {}",
            String::from_utf8_lossy(payload)
        );
        let subject = destination.topic.clone();
        let payload = Bytes::copy_from_slice(payload);
        let published = match headers {
            Some(headers) if !headers.is_empty() => {
                self.client
                    .publish_with_headers(subject, to_header_map(headers), payload)
                    .await
            }
            _ => self.client.publish(subject, payload).await,
        };
        published.map_err(|e| {
            EventError::transport(format!("publish to '{}' failed: {}", destination.topic, e))
        })?;

        // Round trip to the server so the publish is known to have landed.
        self.client.flush().await.map_err(|e| {
            EventError::transport(format!("flush after publish to '{}' failed: {}", destination.topic, e))
        })?;
        Ok(())
    }

    async fn subscribe(&self, source: &EventNode) -> EventResult<()> {
        tracing::debug!("Subscribing to NATS provider on {}", self.url_and_topic(source));
        let subscriber = self
            .client
            .subscribe(source.topic.clone())
            .await
            .map_err(|e| {
                EventError::transport(format!("subscribe to '{}' failed: {}", source.topic, e))
            })?;

        let mut subscriptions = self.subscriptions.write().await;
        subscriptions.insert(source.name.clone(), Arc::new(Mutex::new(subscriber)));
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
        tracing::debug!(
            source = %source.name,
            provider = %source.provider_ref,
            ?timeout,
            "natsProvider: waiting for data"
        );
        let mut subscriber = subscription.lock().await;
        match tokio::time::timeout(timeout, subscriber.next()).await {
            Ok(Some(message)) => Ok(message.payload.to_vec()),
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
        let url_and_topic = self.url_and_topic(source);
        tracing::debug!("natsProvider: starting to listen for events from {}", url_and_topic);

        let mut subscriber = match self.client.subscribe(source.topic.clone()).await {
            Ok(subscriber) => subscriber,
            Err(e) => {
                tracing::error!("unable to set up listener for NATS events from {}: {}", url_and_topic, e);
                return;
            }
        };

        loop {
            tokio::select! {
                biased;
                message = subscriber.next() => match message {
                    Some(message) => {
                        tracing::trace!(
                            "Received message on {}: {}",
                            url_and_topic,
                            String::from_utf8_lossy(&message.payload)
                        );
                        if let Err(e) = handler.handle(&message.payload).await {
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

        if let Err(e) = subscriber.unsubscribe().await {
            tracing::debug!("unsubscribe from {} failed: {}", url_and_topic, e);
        }
        while let Some(message) = subscriber.next().await {
            if let Err(e) = handler.handle(&message.payload).await {
                tracing::warn!(source = %source.name, "handler error while draining: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn values(map: &HeaderMap, name: &str) -> Vec<String> {
        map.get_all(name).map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_header_map_keeps_every_value() {
        let mut headers = MessageHeaders::new();
        headers.insert(
            "X-Github-Event".to_string(),
            vec!["push".to_string()],
        );
        headers.insert(
            "Accept".to_string(),
            vec!["application/json".to_string(), "text/plain".to_string()],
        );

        let map = to_header_map(&headers);
        assert_eq!(values(&map, "X-Github-Event"), vec!["push"]);
        assert_eq!(values(&map, "Accept"), vec!["application/json", "text/plain"]);
        assert!(values(&map, "Missing").is_empty());
    }

    #[tokio::test]
    async fn test_receive_without_subscribe() {
        // the client keeps retrying in the background, so no broker is needed
        let client = async_nats::ConnectOptions::new()
            .retry_on_initial_connect()
            .connect("nats://127.0.0.1:1")
            .await
            .unwrap();
        let definition = ProviderDefinition::new("nats-provider", "nats", "nats://127.0.0.1:1")
            .with_timeout(Duration::from_millis(50));
        let provider = NatsProvider::with_client(definition, client);
        let source = EventNode::new("github-source", "github", "nats-provider");

        let err = provider.receive(&source).await.unwrap_err();
        assert!(matches!(err, EventError::NotSubscribed(name) if name == "github-source"));
        assert_eq!(provider.url_and_topic(&source), "nats://127.0.0.1:1:github");
    }
}
