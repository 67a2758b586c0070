// Copyright 2025 the Keystone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property owner traits.
//!
//! Types that keep a [`PropertyHolder`] can implement [`PropertyOwner`] to get
//! the holder's API directly on themselves through [`PropertyOwnerExt`].

use crate::dispatch::DispatchReport;
use crate::error::PropertyError;
use crate::holder::PropertyHolder;
use crate::key::{Property, PropertyValue};
use crate::listener::Subscriber;

/// A type that owns a [`PropertyHolder`].
///
/// # Example
///
/// ```rust
/// use keystone_property::{PropertyHolder, PropertyOwner, PropertyOwnerExt, PropertyRegistry};
///
/// struct Session {
///     user: String,
///     properties: PropertyHolder,
/// }
///
/// impl PropertyOwner for Session {
///     fn properties(&self) -> &PropertyHolder {
///         &self.properties
///     }
///
///     fn properties_mut(&mut self) -> &mut PropertyHolder {
///         &mut self.properties
///     }
/// }
///
/// let mut registry = PropertyRegistry::new();
/// let theme = registry.register("THEME", String::from("light")).unwrap();
///
/// let mut session = Session { user: "ada".into(), properties: PropertyHolder::new() };
/// assert_eq!(session.get(&theme).as_deref(), Some("light"));
/// session.set(&theme, String::from("dark"));
/// assert_eq!(session.get(&theme).as_deref(), Some("dark"));
/// ```
pub trait PropertyOwner {
    /// Returns the owned holder.
    fn properties(&self) -> &PropertyHolder;

    /// Returns the owned holder mutably.
    fn properties_mut(&mut self) -> &mut PropertyHolder;
}

/// Holder operations for every [`PropertyOwner`].
pub trait PropertyOwnerExt: PropertyOwner {
    /// See [`PropertyHolder::get`].
    fn get<T: PropertyValue>(&self, property: &Property<T>) -> Option<T> {
        self.properties().get(property)
    }

    /// See [`PropertyHolder::get_or`].
    fn get_or<T: PropertyValue>(
        &self,
        property: &Property<T>,
        fallback: impl Into<Option<T>>,
    ) -> Option<T> {
        self.properties().get_or(property, fallback)
    }

    /// See [`PropertyHolder::get_ref`].
    fn get_ref<'a, T: PropertyValue>(&'a self, property: &'a Property<T>) -> Option<&'a T> {
        self.properties().get_ref(property)
    }

    /// See [`PropertyHolder::set`].
    fn set<T: PropertyValue>(&mut self, property: &Property<T>, value: T) -> Option<T> {
        self.properties_mut().set(property, value)
    }

    /// See [`PropertyHolder::set_with_report`].
    fn set_with_report<T: PropertyValue>(
        &mut self,
        property: &Property<T>,
        value: T,
    ) -> (Option<T>, DispatchReport) {
        self.properties_mut().set_with_report(property, value)
    }

    /// See [`PropertyHolder::clear`].
    fn clear<T: PropertyValue>(&mut self, property: &Property<T>) -> Option<T> {
        self.properties_mut().clear(property)
    }

    /// See [`PropertyHolder::clear_with_report`].
    fn clear_with_report<T: PropertyValue>(
        &mut self,
        property: &Property<T>,
    ) -> (Option<T>, DispatchReport) {
        self.properties_mut().clear_with_report(property)
    }

    /// See [`PropertyHolder::subscribe`].
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::NoMatchingHandler`] if the subscriber declares
    /// no handler for the key.
    fn subscribe<T: PropertyValue>(
        &mut self,
        property: &Property<T>,
        subscriber: &Subscriber,
    ) -> Result<(), PropertyError> {
        self.properties_mut().subscribe(property, subscriber)
    }

    /// See [`PropertyHolder::unsubscribe`].
    fn unsubscribe<T: PropertyValue>(
        &mut self,
        property: &Property<T>,
        subscriber: &Subscriber,
    ) -> bool {
        self.properties_mut().unsubscribe(property, subscriber)
    }
}

impl<O: PropertyOwner + ?Sized> PropertyOwnerExt for O {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PropertyRegistry;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Entity {
        properties: PropertyHolder,
    }

    impl PropertyOwner for Entity {
        fn properties(&self) -> &PropertyHolder {
            &self.properties
        }

        fn properties_mut(&mut self) -> &mut PropertyHolder {
            &mut self.properties
        }
    }

    #[test]
    fn owner_delegates_to_holder() {
        let mut registry = PropertyRegistry::new();
        let width = registry.register("Width", 0.0_f64).unwrap();
        let mut entity = Entity {
            properties: PropertyHolder::new(),
        };

        assert_eq!(entity.get(&width), Some(0.0));
        assert_eq!(entity.get_or(&width, 5.0), Some(5.0));
        assert_eq!(entity.set(&width, 100.0), None);
        assert_eq!(entity.get_ref(&width), Some(&100.0));
        assert_eq!(entity.clear(&width), Some(100.0));
        assert_eq!(entity.get(&width), Some(0.0));
        entity.set(&width, 50.0);
        let (old, report) = entity.clear_with_report(&width);
        assert_eq!(old, Some(50.0));
        assert!(report.is_clean());
    }

    #[test]
    fn owner_scoped_listeners() {
        let mut registry = PropertyRegistry::new();
        let width = registry.register("Width", 0.0_f64).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = Subscriber::builder("layout")
            .on(&width, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build();

        let mut entity = Entity {
            properties: PropertyHolder::new(),
        };
        entity.subscribe(&width, &sub).unwrap();
        let (_, report) = entity.set_with_report(&width, 1.0);
        assert_eq!(report.delivered(), 1);
        assert!(entity.unsubscribe(&width, &sub));
        entity.set(&width, 2.0);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
