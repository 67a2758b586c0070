// Copyright 2025 the Keystone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Subscribers and handler resolution.
//!
//! A [`Subscriber`] is a table of handlers, each tagged with the identifier of
//! the key it handles. One subscriber can handle many keys, each through its
//! own handler. Subscribing to a key resolves the matching handler once, at
//! subscribe time; dispatch never searches.
//!
//! ```rust
//! use keystone_property::{PropertyHolder, PropertyRegistry, Subscriber};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//!
//! let mut registry = PropertyRegistry::new();
//! let number = registry.register("NUMBER", 3943_i32).unwrap();
//!
//! let last = Arc::new(AtomicI32::new(0));
//! let seen = Arc::clone(&last);
//! let listener = Subscriber::builder("example")
//!     .on(&number, move |event| {
//!         seen.store(*event.new_value().unwrap(), Ordering::SeqCst);
//!         Ok(())
//!     })
//!     .build();
//!
//! number.subscribe_global(&listener).unwrap();
//!
//! let mut holder = PropertyHolder::new();
//! holder.set(&number, 24);
//! assert_eq!(last.load(Ordering::SeqCst), 24);
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ListenerError, PropertyError};
use crate::event::PropertyEvent;
use crate::key::{Property, PropertyValue};

/// Identity of a [`Subscriber`].
///
/// Allocated when the subscriber is built and shared by its clones.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SubscriberId").field(&self.0).finish()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscriber({})", self.0)
    }
}

/// A typed handler callback.
pub(crate) type Handler<T> =
    Arc<dyn Fn(&PropertyEvent<'_, T>) -> Result<(), ListenerError> + Send + Sync>;

/// A handler bound to one key, ready for dispatch.
pub(crate) struct Binding<T: PropertyValue> {
    pub(crate) subscriber: SubscriberId,
    pub(crate) label: Arc<str>,
    pub(crate) handler: Handler<T>,
}

impl<T: PropertyValue> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            subscriber: self.subscriber,
            label: Arc::clone(&self.label),
            handler: Arc::clone(&self.handler),
        }
    }
}

struct HandlerEntry {
    key: Arc<str>,
    type_id: TypeId,
    type_name: &'static str,
    /// A `Handler<T>` for the `T` named by `type_id`.
    handler: Arc<dyn Any + Send + Sync>,
}

/// An object that reacts to property changes.
///
/// Built with [`Subscriber::builder`]. Subscribe it with
/// [`Property::subscribe_global`] or
/// [`PropertyHolder::subscribe`](crate::PropertyHolder::subscribe).
#[derive(Clone)]
pub struct Subscriber {
    id: SubscriberId,
    label: Arc<str>,
    handlers: Arc<[HandlerEntry]>,
}

impl Subscriber {
    /// Starts building a subscriber. The label appears in logs and errors.
    #[must_use]
    pub fn builder(label: impl Into<Arc<str>>) -> SubscriberBuilder {
        SubscriberBuilder {
            label: label.into(),
            handlers: Vec::new(),
        }
    }

    /// Returns this subscriber's identity.
    #[must_use]
    #[inline]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Returns this subscriber's label.
    #[must_use]
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns `true` if some handler is tagged with `key`, whatever its type.
    #[must_use]
    pub fn handles(&self, key: &str) -> bool {
        self.handlers.iter().any(|entry| &*entry.key == key)
    }

    /// Resolves the handler for `property`: the first one tagged with its
    /// identifier and declared for its value type.
    pub(crate) fn resolve<T: PropertyValue>(
        &self,
        property: &Property<T>,
    ) -> Result<Binding<T>, PropertyError> {
        let handler = self
            .handlers
            .iter()
            .filter(|entry| &*entry.key == property.name() && entry.type_id == TypeId::of::<T>())
            .find_map(|entry| entry.handler.downcast_ref::<Handler<T>>())
            .ok_or_else(|| PropertyError::NoMatchingHandler {
                subscriber: self.id,
                label: Arc::clone(&self.label),
                key: Arc::clone(property.name_arc()),
                type_name: property.type_name(),
            })?;
        Ok(Binding {
            subscriber: self.id,
            label: Arc::clone(&self.label),
            handler: Arc::clone(handler),
        })
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("label", &self.label)
            .field(
                "handlers",
                &self
                    .handlers
                    .iter()
                    .map(|entry| (&*entry.key, entry.type_name))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`Subscriber`].
///
/// # Example
///
/// ```rust
/// use keystone_property::{PropertyRegistry, Subscriber};
///
/// let mut registry = PropertyRegistry::new();
/// let number = registry.register("NUMBER", 3943_i32).unwrap();
///
/// let listener = Subscriber::builder("example")
///     .on(&number, |_| Ok(()))
///     // Declared by identifier: the key does not have to exist yet.
///     .on_name::<String, _>("STRING", |_| Ok(()))
///     .build();
///
/// assert!(listener.handles("NUMBER"));
/// assert!(listener.handles("STRING"));
/// assert!(!listener.handles("OTHER"));
/// ```
pub struct SubscriberBuilder {
    label: Arc<str>,
    handlers: Vec<HandlerEntry>,
}

impl SubscriberBuilder {
    /// Adds a handler for `property`.
    #[must_use]
    pub fn on<T, F>(self, property: &Property<T>, handler: F) -> Self
    where
        T: PropertyValue,
        F: Fn(&PropertyEvent<'_, T>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.on_name(property.name(), handler)
    }

    /// Adds a handler for the key identified by `key`, with value type `T`.
    ///
    /// If several handlers are tagged with the same identifier and type, the
    /// first one added wins.
    #[must_use]
    pub fn on_name<T, F>(mut self, key: impl Into<Arc<str>>, handler: F) -> Self
    where
        T: PropertyValue,
        F: Fn(&PropertyEvent<'_, T>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let handler: Handler<T> = Arc::new(handler);
        self.handlers.push(HandlerEntry {
            key: key.into(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            handler: Arc::new(handler),
        });
        self
    }

    /// Builds the subscriber, allocating its identity.
    #[must_use]
    pub fn build(self) -> Subscriber {
        Subscriber {
            id: SubscriberId::next(),
            label: self.label,
            handlers: self.handlers.into(),
        }
    }
}

impl fmt::Debug for SubscriberBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberBuilder")
            .field("label", &self.label)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
