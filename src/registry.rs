//! Fan-out of envelopes to independently registered listeners.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::envelope::Envelope;

type Listener = Arc<dyn Fn(&Envelope) + Send + Sync + 'static>;

struct RegistryInner {
    /// Insertion-ordered listener set. Fan-out follows this order, but
    /// callers must not rely on it.
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

/// Registry of subscriber callbacks.
///
/// Delivery is synchronous and isolated: each listener is invoked
/// independently, and one listener panicking does not prevent delivery to the
/// others. Listeners may subscribe or unsubscribe (including themselves) from
/// within a callback; a `notify` pass iterates the snapshot taken at entry.
#[derive(Clone)]
pub struct SubscriberRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register a listener. O(1); returns a handle that removes it again.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));

        SubscriptionHandle {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver one envelope to every currently registered listener.
    ///
    /// The listener set is snapshotted before the first invocation, so
    /// mutation during iteration is tolerated. Each invocation is guarded on
    /// its own; a panic is contained and delivery continues.
    pub fn notify(&self, envelope: &Envelope) {
        let snapshot: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener(envelope)));
            if outcome.is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!("Subscriber panicked while handling an envelope");
            }
        }
    }

    /// Deliver one final envelope and drop all subscriptions in a single
    /// step.
    ///
    /// The listener set is removed from the registry before the first
    /// invocation. A `notify` racing this call snapshots an empty set, so
    /// listeners never receive anything after the final envelope.
    pub fn finalize(&self, envelope: &Envelope) {
        let drained = {
            let mut listeners = self
                .inner
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *listeners)
        };

        for (_, listener) in drained {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener(envelope)));
            if outcome.is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!("Subscriber panicked while handling an envelope");
            }
        }
    }

    /// Drop all subscriptions without a final notification.
    pub fn clear(&self) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of currently registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by [`SubscriberRegistry::subscribe`].
///
/// Dropping the handle does not unsubscribe; call
/// [`unsubscribe`](Self::unsubscribe) explicitly. The handle stays valid
/// after the client is closed, at which point it is a no-op.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    id: u64,
    registry: Weak<RegistryInner>,
}

impl SubscriptionHandle {
    /// Remove the listener. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.registry.upgrade() {
            inner
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}
