// Copyright 2025 the Keystone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed property keys.
//!
//! This module provides [`Property<T>`], the descriptor callers use to read and
//! write values in any [`PropertyHolder`](crate::PropertyHolder), and the
//! [`PropertyValue`] bound every stored type satisfies.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::dispatch::{self, DispatchReport, ListenerTable, Scope};
use crate::error::PropertyError;
use crate::event::PropertyEvent;
use crate::listener::Subscriber;

/// Types that can be stored under a [`Property`] key.
///
/// Blanket-implemented for every `Clone + Debug + Send + Sync + 'static` type.
/// `Debug` is required so events and listener failures can be logged.
pub trait PropertyValue: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> PropertyValue for T where T: Clone + fmt::Debug + Send + Sync + 'static {}

/// A typed, globally unique property key.
///
/// Keys are created by [`PropertyRegistry::register`](crate::PropertyRegistry::register)
/// and are cheap to clone: every clone is a handle to the same descriptor.
///
/// A key carries its identifier, its value type and an optional default value.
/// Equality and hashing use the identifier only.
///
/// The key also owns its *global* subscriptions: listeners notified of changes
/// to this key on any holder.
///
/// # Example
///
/// ```rust
/// use keystone_property::PropertyRegistry;
///
/// let mut registry = PropertyRegistry::new();
/// let number = registry.register("NUMBER", 3943_i32).unwrap();
///
/// assert_eq!(number.name(), "NUMBER");
/// assert_eq!(number.default_value(), Some(&3943));
/// assert_eq!(number.type_name(), "i32");
/// ```
pub struct Property<T: PropertyValue> {
    inner: Arc<PropertyInner<T>>,
}

struct PropertyInner<T: PropertyValue> {
    name: Arc<str>,
    default_value: Option<T>,
    global: Mutex<ListenerTable<T>>,
}

impl<T: PropertyValue> Property<T> {
    pub(crate) fn new(name: Arc<str>, default_value: Option<T>) -> Self {
        Self {
            inner: Arc::new(PropertyInner {
                name,
                default_value,
                global: Mutex::new(ListenerTable::new()),
            }),
        }
    }

    /// Returns the key's identifier.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn name_arc(&self) -> &Arc<str> {
        &self.inner.name
    }

    /// Returns the default value, or `None` if the key was declared without one.
    #[must_use]
    #[inline]
    pub fn default_value(&self) -> Option<&T> {
        self.inner.default_value.as_ref()
    }

    /// Returns the [`TypeId`] of the key's value type.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    /// Returns the name of the key's value type.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    /// Subscribes `subscriber` to changes of this key on every holder.
    ///
    /// The subscriber's handler for this key is resolved now. Subscribing the
    /// same subscriber again replaces its earlier binding.
    ///
    /// The key keeps the resolved handler alive until it is unsubscribed. A
    /// handler that captures a clone of this key therefore forms a reference
    /// cycle, and the key is never freed unless the handler is unsubscribed
    /// with [`unsubscribe_global`](Self::unsubscribe_global).
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::NoMatchingHandler`] if the subscriber declares
    /// no handler for this key's identifier and type.
    pub fn subscribe_global(&self, subscriber: &Subscriber) -> Result<(), PropertyError> {
        let binding = subscriber.resolve(self)?;
        let replaced = self.inner.global.lock().insert(binding);
        tracing::debug!(
            key = %self.name(),
            subscriber = %subscriber.label(),
            replaced,
            "global listener subscribed"
        );
        Ok(())
    }

    /// Removes the global subscription of `subscriber`.
    ///
    /// Returns `true` if a binding was removed.
    pub fn unsubscribe_global(&self, subscriber: &Subscriber) -> bool {
        let removed = self.inner.global.lock().remove(subscriber.id());
        if removed {
            tracing::debug!(
                key = %self.name(),
                subscriber = %subscriber.label(),
                "global listener unsubscribed"
            );
        }
        removed
    }

    /// Returns the number of global subscribers.
    #[must_use]
    pub fn global_listener_count(&self) -> usize {
        self.inner.global.lock().len()
    }

    /// Delivers `event` to this key's listeners.
    ///
    /// Global listeners run first, then the listeners scoped to the event's
    /// holder, if it has one. Failing listeners are recorded in the returned
    /// report and do not stop the fan-out.
    ///
    /// [`PropertyHolder::set`](crate::PropertyHolder::set) calls this; it is
    /// public so that events without a holder can be published too.
    pub fn notify(&self, event: &PropertyEvent<'_, T>) -> DispatchReport {
        let mut report = DispatchReport::default();

        let global = self.inner.global.lock().snapshot();
        dispatch::fan_out(&global, Scope::Global, event, &mut report);

        if let Some(holder) = event.holder() {
            let scoped = holder.scoped_snapshot(self);
            dispatch::fan_out(&scoped, Scope::Holder(holder.id()), event, &mut report);
        }

        tracing::trace!(
            key = %self.name(),
            delivered = report.delivered(),
            failed = report.failures().len(),
            "property change dispatched"
        );
        report
    }
}

impl<T: PropertyValue> Clone for Property<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: PropertyValue> PartialEq for Property<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.inner.name == other.inner.name
    }
}

impl<T: PropertyValue> Eq for Property<T> {}

impl<T: PropertyValue> Hash for Property<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.name.hash(state);
    }
}

impl<T: PropertyValue> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.inner.name)
            .field("type", &self.type_name())
            .field("default_value", &self.inner.default_value)
            .finish_non_exhaustive()
    }
}

impl<T: PropertyValue> fmt::Display for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Property {{ key: {}, type: {}, default: {:?} }}",
            self.inner.name,
            self.type_name(),
            self.inner.default_value
        )
    }
}
