//! Observable value cells.
//!
//! A [`Writable`] holds a single value and an explicit list of subscriber
//! callbacks. Every write notifies all current subscribers synchronously,
//! in subscription order. Handles are cheap to clone and share the same
//! underlying cell.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Shared<T> {
    value: T,
    subscribers: Vec<(u64, Callback<T>)>,
    next_id: u64,
}

impl<T> Shared<T> {
    fn callbacks(&self) -> Vec<Callback<T>> {
        self.subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }
}

/// A shared, observable value.
pub struct Writable<T> {
    shared: Arc<RwLock<Shared<T>>>,
}

impl<T> Clone for Writable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for Writable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Writable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = read(&self.shared);
        f.debug_struct("Writable")
            .field("value", &shared.value)
            .field("subscribers", &shared.subscribers.len())
            .finish()
    }
}

// A panicking subscriber must not take the cell down with it.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl<T: Clone + Send + Sync + 'static> Writable<T> {
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(RwLock::new(Shared {
                value,
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        read(&self.shared).value.clone()
    }

    /// Replace the value and notify every subscriber.
    ///
    /// Callbacks run after the lock is released, so they may freely read
    /// or write this cell.
    pub fn set(&self, value: T) {
        let (snapshot, callbacks) = {
            let mut shared = write(&self.shared);
            shared.value = value;
            (shared.value.clone(), shared.callbacks())
        };
        for callback in callbacks {
            callback(&snapshot);
        }
    }

    /// Replace the value with one derived from the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let current = self.get();
        self.set(f(&current));
    }

    /// Register a callback.
    ///
    /// The callback is invoked immediately with the current value, then
    /// again on every write until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    pub fn subscribe<F>(&self, f: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback: Callback<T> = Arc::new(f);
        let (id, current) = {
            let mut shared = write(&self.shared);
            let id = shared.next_id;
            shared.next_id += 1;
            shared.subscribers.push((id, Arc::clone(&callback)));
            (id, shared.value.clone())
        };
        callback(&current);

        let weak: Weak<RwLock<Shared<T>>> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                write(&shared).subscribers.retain(|(sid, _)| *sid != id);
            }
        })
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        read(&self.shared).subscribers.len()
    }
}

/// Handle to a registered callback.
///
/// Dropping the handle unsubscribes; call [`Subscription::unsubscribe`] to
/// make that explicit at the call site.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Remove the callback from its cell.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
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
