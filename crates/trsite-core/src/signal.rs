//! Current-value publisher.
//!
//! `CurrentValue<T>` remembers the last published value and keeps a list
//! of observers. A new observer is called with the held value as soon as
//! it subscribes, then once per `publish`.
//!
//! Updates and deliveries are serialized: observers see values in the
//! order they were published, and a subscriber's replay never overlaps a
//! publish. Observers run while that ordering lock is held, so they may
//! call `get` but must not `publish` or `subscribe` on the same value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    value: RwLock<T>,
    /// Held across "set value, notify" and "register, replay"
    delivery: Mutex<()>,
    observers: Mutex<Vec<(u64, Observer<T>)>>,
    next_id: AtomicU64,
}

/// A value plus the observers watching it.
pub struct CurrentValue<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Clone + Send + Sync + 'static> CurrentValue<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                value: RwLock::new(initial),
                delivery: Mutex::new(()),
                observers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// The value last published
    pub fn get(&self) -> T {
        match self.inner.value.read() {
            Ok(value) => value.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the held value and notify every observer.
    ///
    /// Observers run on the calling thread after the value is updated.
    pub fn publish(&self, value: T) {
        let _delivery = self.inner.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        match self.inner.value.write() {
            Ok(mut held) => *held = value.clone(),
            Err(poisoned) => *poisoned.into_inner() = value.clone(),
        }
        for observer in self.snapshot() {
            observer(&value);
        }
    }

    /// Register `observer`. It is called immediately with the held value.
    ///
    /// The observer stays registered until the returned `Subscription` is
    /// dropped or `unsubscribe`d.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let observer: Observer<T> = Arc::new(observer);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let _delivery = self.inner.delivery.lock().unwrap_or_else(PoisonError::into_inner);
            if let Ok(mut observers) = self.inner.observers.lock() {
                observers.push((id, observer.clone()));
            }
            observer(&self.get());
        }

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    if let Ok(mut observers) = inner.observers.lock() {
                        observers.retain(|(other, _)| *other != id);
                    }
                }
            })),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().map(|o| o.len()).unwrap_or(0)
    }

    fn snapshot(&self) -> Vec<Observer<T>> {
        match self.inner.observers.lock() {
            Ok(observers) => observers.iter().map(|(_, o)| o.clone()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for CurrentValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Handle to a registered observer; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the observer"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    /// Keep the observer registered for as long as the publisher lives
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
