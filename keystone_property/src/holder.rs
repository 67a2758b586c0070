// Copyright 2025 the Keystone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-owner property storage.
//!
//! This module provides [`PropertyHolder`], which stores values for any number
//! of keys and notifies listeners when they change.
//!
//! # Implementation
//!
//! Values live in a vector sorted by key identifier and are found by binary
//! search. Holders typically carry few properties, so this beats a hash map on
//! memory and locality, and the first entries are stored inline via `SmallVec`.
//!
//! Holder-scoped subscriptions are stored on the holder itself, keyed by
//! identifier and value type, so they go away with it. Two keys that share an
//! identifier but not a type never see each other's scoped listeners.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use crate::dispatch::{DispatchReport, ListenerTable, Snapshot};
use crate::error::PropertyError;
use crate::event::PropertyEvent;
use crate::key::{Property, PropertyValue};
use crate::listener::Subscriber;
use crate::value::ErasedValue;

/// Default inline capacity for stored values.
const INLINE_CAPACITY: usize = 8;

/// One key's scoped subscription table on a holder.
struct ScopedEntry {
    name: Arc<str>,
    type_id: TypeId,
    table: Box<dyn Any + Send + Sync>,
}

/// Identity of a [`PropertyHolder`], unique within the process.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HolderId(u64);

impl HolderId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw identifier.
    #[must_use]
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HolderId").field(&self.0).finish()
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Holder({})", self.0)
    }
}

/// A container of property values.
///
/// Holders are independent of each other and of the registry: they operate on
/// the [`Property`] handles they are given, never re-resolving identifiers.
///
/// Reads are lenient. A stored value whose type differs from the key's type
/// (two keys sharing an identifier across registries) is treated as absent.
///
/// Every `set` and every effective `clear` synchronously notifies the key's
/// global listeners and then this holder's scoped listeners before returning.
///
/// # Example
///
/// ```rust
/// use keystone_property::{PropertyHolder, PropertyRegistry};
///
/// let mut registry = PropertyRegistry::new();
/// let number = registry.register("NUMBER", 3943_i32).unwrap();
///
/// let mut holder = PropertyHolder::new();
///
/// // Nothing stored: key default, or the call-site fallback.
/// assert_eq!(holder.get(&number), Some(3943));
/// assert_eq!(holder.get_or(&number, 9342327), Some(9342327));
///
/// // `set` returns what was stored before.
/// assert_eq!(holder.set(&number, 84588), None);
/// assert_eq!(holder.set(&number, 24), Some(84588));
/// assert_eq!(holder.get(&number), Some(24));
/// ```
pub struct PropertyHolder {
    id: HolderId,
    /// Stored values, sorted by identifier for binary search lookup.
    values: SmallVec<[(Arc<str>, ErasedValue); INLINE_CAPACITY]>,
    /// Scoped subscriptions, sorted by identifier then value type. Each table
    /// is a `ListenerTable<T>` for the `T` it is keyed by.
    listeners: Vec<ScopedEntry>,
}

impl PropertyHolder {
    /// Creates an empty holder with a fresh [`HolderId`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: HolderId::next(),
            values: SmallVec::new(),
            listeners: Vec::new(),
        }
    }

    /// Returns this holder's identity.
    #[must_use]
    #[inline]
    pub fn id(&self) -> HolderId {
        self.id
    }

    /// Returns `true` if no values are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns the identifiers that have values stored, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.iter().map(|(name, _)| &**name)
    }

    #[inline]
    fn find_value(&self, name: &str) -> Result<usize, usize> {
        self.values
            .binary_search_by(|(stored, _)| (**stored).cmp(name))
    }

    #[inline]
    fn find_listeners(&self, name: &str, type_id: TypeId) -> Result<usize, usize> {
        self.listeners.binary_search_by(|entry| {
            (*entry.name)
                .cmp(name)
                .then_with(|| entry.type_id.cmp(&type_id))
        })
    }

    #[inline]
    fn stored<T: PropertyValue>(&self, property: &Property<T>) -> Option<&T> {
        self.find_value(property.name())
            .ok()
            .and_then(|idx| self.values[idx].1.downcast_ref())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets the value for `property`.
    ///
    /// Returns the stored value if there is one of the key's type, otherwise
    /// the key's default.
    #[must_use]
    pub fn get<T: PropertyValue>(&self, property: &Property<T>) -> Option<T> {
        self.get_ref(property).cloned()
    }

    /// Gets the value for `property`, with a call-site fallback.
    ///
    /// Returns the stored value if there is one of the key's type, otherwise
    /// `fallback`. The key's default is not consulted, and `None` is a valid
    /// fallback.
    #[must_use]
    pub fn get_or<T: PropertyValue>(
        &self,
        property: &Property<T>,
        fallback: impl Into<Option<T>>,
    ) -> Option<T> {
        match self.stored(property) {
            Some(value) => Some(value.clone()),
            None => fallback.into(),
        }
    }

    /// Gets the value for `property` by reference.
    ///
    /// Borrows either from this holder or from the key's default.
    #[must_use]
    pub fn get_ref<'a, T: PropertyValue>(&'a self, property: &'a Property<T>) -> Option<&'a T> {
        self.stored(property).or_else(|| property.default_value())
    }

    /// Returns `true` if a value of the key's type is stored.
    #[must_use]
    pub fn contains<T: PropertyValue>(&self, property: &Property<T>) -> bool {
        self.stored(property).is_some()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Stores `value` for `property` and notifies listeners.
    ///
    /// Returns the previously stored value, or `None` if nothing of the key's
    /// type was stored. Listener failures are logged and do not reach the
    /// caller; use [`set_with_report`](Self::set_with_report) to inspect them.
    pub fn set<T: PropertyValue>(&mut self, property: &Property<T>, value: T) -> Option<T> {
        self.set_with_report(property, value).0
    }

    /// Like [`set`](Self::set), also returning the dispatch outcome.
    pub fn set_with_report<T: PropertyValue>(
        &mut self,
        property: &Property<T>,
        value: T,
    ) -> (Option<T>, DispatchReport) {
        let erased = ErasedValue::new(value);
        let (idx, old) = match self.find_value(property.name()) {
            Ok(idx) => {
                let old = std::mem::replace(&mut self.values[idx].1, erased);
                (idx, old.downcast::<T>().ok())
            }
            Err(idx) => {
                self.values
                    .insert(idx, (Arc::clone(property.name_arc()), erased));
                (idx, None)
            }
        };

        let this: &Self = self;
        let new = this.values[idx].1.downcast_ref::<T>();
        let event = PropertyEvent::new(property, Some(this), old.as_ref(), new);
        let report = property.notify(&event);
        (old, report)
    }

    /// Removes the stored value for `property` and notifies listeners.
    ///
    /// Returns the removed value. A value stored under the same identifier
    /// with another type is left in place, and nothing is dispatched, exactly
    /// as if nothing were stored. Listener failures are logged; use
    /// [`clear_with_report`](Self::clear_with_report) to inspect them.
    pub fn clear<T: PropertyValue>(&mut self, property: &Property<T>) -> Option<T> {
        self.clear_with_report(property).0
    }

    /// Like [`clear`](Self::clear), also returning the dispatch outcome.
    ///
    /// The report is empty when nothing of the key's type was stored.
    pub fn clear_with_report<T: PropertyValue>(
        &mut self,
        property: &Property<T>,
    ) -> (Option<T>, DispatchReport) {
        let idx = match self.find_value(property.name()) {
            Ok(idx) if self.values[idx].1.is::<T>() => idx,
            _ => return (None, DispatchReport::default()),
        };
        let (_, erased) = self.values.remove(idx);
        let old = erased.downcast::<T>().ok();

        let event = PropertyEvent::new(property, Some(&*self), old.as_ref(), None);
        let report = property.notify(&event);
        (old, report)
    }

    // =========================================================================
    // Scoped subscriptions
    // =========================================================================

    /// Subscribes `subscriber` to changes of `property` on this holder only.
    ///
    /// Subscribing the same subscriber again replaces its earlier binding.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::NoMatchingHandler`] if the subscriber declares
    /// no handler for the key's identifier and type.
    pub fn subscribe<T: PropertyValue>(
        &mut self,
        property: &Property<T>,
        subscriber: &Subscriber,
    ) -> Result<(), PropertyError> {
        let binding = subscriber.resolve(property)?;
        let idx = match self.find_listeners(property.name(), property.type_id()) {
            Ok(idx) => idx,
            Err(idx) => {
                self.listeners.insert(
                    idx,
                    ScopedEntry {
                        name: Arc::clone(property.name_arc()),
                        type_id: property.type_id(),
                        table: Box::new(ListenerTable::<T>::new()),
                    },
                );
                idx
            }
        };
        let replaced = self.listeners[idx]
            .table
            .downcast_mut::<ListenerTable<T>>()
            .is_some_and(|table| table.insert(binding));
        tracing::debug!(
            key = %property.name(),
            holder = %self.id,
            subscriber = %subscriber.label(),
            replaced,
            "scoped listener subscribed"
        );
        Ok(())
    }

    /// Removes the scoped subscription of `subscriber` for `property`.
    ///
    /// Returns `true` if a binding was removed.
    pub fn unsubscribe<T: PropertyValue>(
        &mut self,
        property: &Property<T>,
        subscriber: &Subscriber,
    ) -> bool {
        let Ok(idx) = self.find_listeners(property.name(), property.type_id()) else {
            return false;
        };
        let Some(table) = self.listeners[idx].table.downcast_mut::<ListenerTable<T>>() else {
            return false;
        };
        let removed = table.remove(subscriber.id());
        if table.is_empty() {
            self.listeners.remove(idx);
        }
        if removed {
            tracing::debug!(
                key = %property.name(),
                holder = %self.id,
                subscriber = %subscriber.label(),
                "scoped listener unsubscribed"
            );
        }
        removed
    }

    /// Returns the number of subscribers scoped to this holder for `property`.
    #[must_use]
    pub fn listener_count<T: PropertyValue>(&self, property: &Property<T>) -> usize {
        self.scoped_table(property).map_or(0, ListenerTable::len)
    }

    fn scoped_table<T: PropertyValue>(&self, property: &Property<T>) -> Option<&ListenerTable<T>> {
        self.find_listeners(property.name(), property.type_id())
            .ok()
            .and_then(|idx| self.listeners[idx].table.downcast_ref::<ListenerTable<T>>())
    }

    pub(crate) fn scoped_snapshot<T: PropertyValue>(&self, property: &Property<T>) -> Snapshot<T> {
        self.scoped_table(property)
            .map(ListenerTable::snapshot)
            .unwrap_or_default()
    }
}

impl Default for PropertyHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PropertyHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyHolder")
            .field("id", &self.id)
            .field("values", &self.values)
            .field(
                "scoped_listeners",
                &self
                    .listeners
                    .iter()
                    .map(|entry| &*entry.name)
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
