// Copyright 2025 the Keystone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Subscription tables and change fan-out.
//!
//! Each key owns one table of global bindings, and each holder owns one table
//! per key it has scoped bindings for. A table maps a [`SubscriberId`] to the
//! handler resolved for it, so re-subscribing replaces instead of appending.
//!
//! Dispatch rules:
//!
//! - Global bindings run before the holder's scoped bindings.
//! - Within a table, bindings run in ascending [`SubscriberId`] order.
//! - Bindings are snapshotted before any handler runs, so handlers may
//!   subscribe or unsubscribe freely.
//! - A handler that returns an error or panics is recorded as a
//!   [`ListenerFailure`], logged, and the remaining handlers still run.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::event::PropertyEvent;
use crate::holder::HolderId;
use crate::key::PropertyValue;
use crate::listener::{Binding, SubscriberId};

/// Bindings copied out of a table for one dispatch.
///
/// Most keys have only a handful of listeners, so these stay inline.
pub(crate) type Snapshot<T> = SmallVec<[Binding<T>; 4]>;

/// Bindings for one key in one scope, sorted by [`SubscriberId`].
pub(crate) struct ListenerTable<T: PropertyValue> {
    entries: Vec<Binding<T>>,
}

impl<T: PropertyValue> ListenerTable<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[inline]
    fn find(&self, id: SubscriberId) -> Result<usize, usize> {
        self.entries
            .binary_search_by_key(&id, |binding| binding.subscriber)
    }

    /// Inserts or replaces the binding for its subscriber.
    ///
    /// Returns `true` if an earlier binding was replaced.
    pub(crate) fn insert(&mut self, binding: Binding<T>) -> bool {
        match self.find(binding.subscriber) {
            Ok(idx) => {
                self.entries[idx] = binding;
                true
            }
            Err(idx) => {
                self.entries.insert(idx, binding);
                false
            }
        }
    }

    /// Removes the binding for `id`. Returns `true` if one was removed.
    pub(crate) fn remove(&mut self, id: SubscriberId) -> bool {
        if let Ok(idx) = self.find(id) {
            self.entries.remove(idx);
            true
        } else {
            false
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        self.entries.iter().cloned().collect()
    }
}

/// Which subscription table a listener was bound in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Subscribed on the key, for every holder.
    Global,
    /// Subscribed on one holder.
    Holder(HolderId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Holder(id) => write!(f, "{id}"),
        }
    }
}

/// A listener that failed while handling an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerFailure {
    /// The failing subscriber.
    pub subscriber: SubscriberId,
    /// The failing subscriber's label.
    pub label: Arc<str>,
    /// Identifier of the key being dispatched.
    pub key: Arc<str>,
    /// The table the subscriber was bound in.
    pub scope: Scope,
    /// What went wrong: the handler's error message, or the panic payload.
    pub message: String,
    /// `true` if the handler panicked rather than returning an error.
    pub panicked: bool,
}

impl fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.panicked { "panicked" } else { "failed" };
        write!(
            f,
            "listener {:?} ({}) {verb} on {} [{}]: {}",
            self.label, self.subscriber, self.key, self.scope, self.message
        )
    }
}

/// Outcome of one fan-out.
///
/// Returned by [`PropertyHolder::set_with_report`](crate::PropertyHolder::set_with_report)
/// and [`Property::notify`](crate::Property::notify). Every failure it lists
/// has already been logged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    delivered: usize,
    failures: Vec<ListenerFailure>,
}

impl DispatchReport {
    /// Number of handlers that ran, including the ones that failed.
    #[must_use]
    #[inline]
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Handlers that returned an error or panicked, in invocation order.
    #[must_use]
    #[inline]
    pub fn failures(&self) -> &[ListenerFailure] {
        &self.failures
    }

    /// Returns `true` if no handler failed.
    #[must_use]
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs every binding in `bindings` against `event`, recording failures in
/// `report`.
pub(crate) fn fan_out<T: PropertyValue>(
    bindings: &[Binding<T>],
    scope: Scope,
    event: &PropertyEvent<'_, T>,
    report: &mut DispatchReport,
) {
    for binding in bindings {
        report.delivered += 1;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (binding.handler)(event)));
        let (message, panicked) = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => (err.to_string(), false),
            Err(payload) => (panic_message(&*payload), true),
        };
        let failure = ListenerFailure {
            subscriber: binding.subscriber,
            label: Arc::clone(&binding.label),
            key: Arc::clone(event.property().name_arc()),
            scope,
            message,
            panicked,
        };
        tracing::warn!(
            key = %failure.key,
            subscriber = %failure.label,
            scope = %failure.scope,
            panicked = failure.panicked,
            error = %failure.message,
            "property listener failed"
        );
        report.failures.push(failure);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Property;
    use crate::listener::Subscriber;
    use std::sync::Mutex;

    fn binding(sub: &Subscriber, key: &Property<i32>) -> Binding<i32> {
        sub.resolve(key).unwrap()
    }

    #[test]
    fn table_insert_replaces_same_subscriber() {
        let key = Property::<i32>::new("NUMBER".into(), None);
        let sub = Subscriber::builder("s").on(&key, |_| Ok(())).build();
        let mut table = ListenerTable::new();

        assert!(!table.insert(binding(&sub, &key)));
        assert!(table.insert(binding(&sub, &key)));
        assert_eq!(table.len(), 1);

        assert!(table.remove(sub.id()));
        assert!(!table.remove(sub.id()));
        assert!(table.is_empty());
    }

    #[test]
    fn table_orders_by_subscriber_id() {
        let key = Property::<i32>::new("NUMBER".into(), None);
        let first = Subscriber::builder("first").on(&key, |_| Ok(())).build();
        let second = Subscriber::builder("second").on(&key, |_| Ok(())).build();
        let mut table = ListenerTable::new();

        table.insert(binding(&second, &key));
        table.insert(binding(&first, &key));

        let order: Vec<_> = table.snapshot().iter().map(|b| b.subscriber).collect();
        assert_eq!(order, vec![first.id(), second.id()]);
    }

    #[test]
    fn fan_out_isolates_failures() {
        let key = Property::<i32>::new("NUMBER".into(), None);
        let ran = Arc::new(Mutex::new(Vec::new()));

        let ran_err = Arc::clone(&ran);
        let erroring = Subscriber::builder("erroring")
            .on(&key, move |_| {
                ran_err.lock().unwrap().push("erroring");
                Err("boom".into())
            })
            .build();
        let panicking = Subscriber::builder("panicking")
            .on(&key, |_| panic!("listener exploded"))
            .build();
        let ran_ok = Arc::clone(&ran);
        let healthy = Subscriber::builder("healthy")
            .on(&key, move |_| {
                ran_ok.lock().unwrap().push("healthy");
                Ok(())
            })
            .build();

        let bindings = [
            binding(&erroring, &key),
            binding(&panicking, &key),
            binding(&healthy, &key),
        ];
        let event = PropertyEvent::new(&key, None, None, Some(&1));
        let mut report = DispatchReport::default();
        fan_out(&bindings, Scope::Global, &event, &mut report);

        assert_eq!(*ran.lock().unwrap(), vec!["erroring", "healthy"]);
        assert_eq!(report.delivered(), 3);
        assert_eq!(report.failures().len(), 2);

        let first = &report.failures()[0];
        assert_eq!(first.subscriber, erroring.id());
        assert_eq!(first.message, "boom");
        assert!(!first.panicked);

        let second = &report.failures()[1];
        assert_eq!(second.subscriber, panicking.id());
        assert_eq!(second.message, "listener exploded");
        assert!(second.panicked);
        assert_eq!(second.scope, Scope::Global);
    }

    #[test]
    fn failure_display() {
        let failure = ListenerFailure {
            subscriber: SubscriberId::from_raw(3),
            label: "audit".into(),
            key: "NUMBER".into(),
            scope: Scope::Global,
            message: "boom".into(),
            panicked: false,
        };
        assert_eq!(
            failure.to_string(),
            "listener \"audit\" (Subscriber(3)) failed on NUMBER [global]: boom"
        );
    }

    #[test]
    fn panic_message_formats() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "non-string panic payload");
    }
}
