// Instance-owned subscriber registry with RAII unsubscribe.
//
// Purpose
// - Let each component own its listeners, so independent instances (tests
//   included) never leak callbacks across each other.
//
// Responsibilities
// - Invoke callbacks outside the registry lock, so a listener may subscribe
//   or unsubscribe re-entrantly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct SubscriberRegistry<T> {
    inner: Arc<Mutex<HashMap<u64, Callback<T>>>>,
    next_id: AtomicU64,
}

impl<T: 'static> SubscriberRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a callback and returns its disposer. Dropping the
    /// `Subscription` removes the callback; callbacks registered after an
    /// event has fired never see that event.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.lock().unwrap().insert(id, Arc::new(callback));

        let slot: Weak<Mutex<HashMap<u64, Callback<T>>>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = slot.upgrade() {
                    inner.lock().unwrap().remove(&id);
                }
            })),
        }
    }

    /// Invokes every registered callback once with `value`. Invocation order
    /// is unspecified.
    pub fn notify(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = self.inner.lock().unwrap().values().cloned().collect();
        for callback in callbacks {
            callback(value);
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

impl<T: 'static> Default for SubscriberRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Disposer for a registered listener. Dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Keeps the listener registered for the lifetime of the registry.
    pub fn forget(mut self) {
        self.cancel.take();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
