use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::Result;
use crate::classify::JsonClassifier;
use crate::config::Config;
use crate::connection::ConnectionManager;
use crate::endpoint::Endpoint;
use crate::envelope::{ConnectionState, Envelope};
use crate::registry::{SubscriberRegistry, SubscriptionHandle};

/// Realtime hub client.
///
/// One client owns one connection manager; the link is kept alive with
/// heartbeats and re-established with capped exponential backoff whenever it
/// drops. Callers never observe a broken pipe as anything other than status
/// envelopes passing through their listeners.
///
/// # Example
///
/// ```rust, no_run
/// use realtime_hub_client::{Client, Envelope};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = Client::connect("https://hub.example.com")?;
///
///     let subscription = client.subscribe(|envelope: &Envelope| match envelope {
///         Envelope::Status(state) => println!("link is {state}"),
///         Envelope::Message(value) => println!("event: {value}"),
///         Envelope::Raw(text) => println!("unstructured: {text}"),
///         _ => {}
///     });
///
///     // ... later
///     subscription.unsubscribe();
///     client.close();
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    /// Configuration the client was built with
    config: Config,
    /// Resolved hub endpoint
    endpoint: Endpoint,
    /// Connection manager for the transport
    connection: ConnectionManager<JsonClassifier>,
    /// Fan-out registry shared with the connection manager
    registry: SubscriberRegistry,
}

impl Client {
    /// Connect to the hub at the given origin with the default configuration.
    ///
    /// Returns immediately with a live client whose state evolves
    /// asynchronously; subscribe to observe it. Only origin validation can
    /// fail here — transport failures surface as status envelopes, never as
    /// errors.
    pub fn connect(origin: &str) -> Result<Self> {
        Self::connect_with(origin, Config::default())
    }

    /// Connect with explicit configuration.
    pub fn connect_with(origin: &str, config: Config) -> Result<Self> {
        let endpoint = Endpoint::from_origin(origin, config.path.clone())?;
        let registry = SubscriberRegistry::new();
        let connection = ConnectionManager::new(
            endpoint.clone(),
            config.clone(),
            JsonClassifier,
            registry.clone(),
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                endpoint,
                connection,
                registry,
            }),
        })
    }

    /// Register a listener for every envelope this client delivers: status
    /// notices and classified inbound messages alike, unfiltered.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        self.inner.registry.subscribe(listener)
    }

    /// Send a free-form message to the hub.
    ///
    /// Fire-and-forget: the payload is serialized and relayed as opaque
    /// frame text, with no acknowledgement protocol.
    pub fn send<R: Serialize>(&self, message: &R) -> Result<()> {
        self.inner.connection.send(message)
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    /// Subscribe to connection state changes on a watch channel.
    ///
    /// Useful for code that polls rather than listens, e.g. a status
    /// indicator re-rendered on change.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.state_receiver()
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The endpoint this client targets.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    /// Tear down timers, the transport and all subscriptions.
    ///
    /// Emits one final `closed` status envelope before subscriptions are
    /// dropped. Idempotent; no reconnection is scheduled afterwards.
    pub fn close(&self) {
        self.inner.connection.close();
    }
}
