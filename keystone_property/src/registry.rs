// Copyright 2025 the Keystone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property key registry.
//!
//! This module provides [`PropertyRegistry`], which hands out [`Property`] keys
//! and guarantees their identifiers are unique.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::error::PropertyError;
use crate::key::{Property, PropertyValue};

/// A registration entry for a key.
///
/// This records the key's identifier and type, and keeps the key itself so it
/// can be looked up again.
pub struct PropertyRegistration {
    name: Arc<str>,
    type_id: TypeId,
    type_name: &'static str,
    key: Box<dyn ErasedKey>,
}

impl PropertyRegistration {
    /// Returns the key's identifier.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the [`TypeId`] of the key's value type.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the name of the key's value type.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the number of global subscribers of the key.
    #[must_use]
    pub fn global_listener_count(&self) -> usize {
        self.key.global_listener_count()
    }
}

impl fmt::Debug for PropertyRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRegistration")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("type_id", &self.type_id)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for PropertyRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.key.fmt_display(f)
    }
}

/// A registry of property keys.
///
/// Keys are declared once, typically at startup, and live as long as the
/// registry. There is no way to unregister a key. Independent registries do not
/// see each other's identifiers, so tests can each build their own.
///
/// Registration takes `&mut self`; to declare keys from several threads, put
/// the registry behind a lock so the uniqueness check and the insert happen
/// together.
///
/// # Example
///
/// ```rust
/// use keystone_property::{PropertyError, PropertyRegistry};
///
/// let mut registry = PropertyRegistry::new();
///
/// let number = registry.register("NUMBER", 3943_i32).unwrap();
/// let string = registry
///     .register("STRING", String::from("This requires no cast"))
///     .unwrap();
///
/// assert!(matches!(
///     registry.register("NUMBER", 0_i32),
///     Err(PropertyError::DuplicateKey { .. })
/// ));
///
/// assert_eq!(registry.len(), 2);
/// assert_eq!(registry.get::<i32>("NUMBER"), Some(number));
/// assert_eq!(registry.get::<String>("STRING"), Some(string));
/// assert_eq!(registry.get::<u8>("NUMBER"), None);
/// ```
#[derive(Default)]
pub struct PropertyRegistry {
    properties: Vec<PropertyRegistration>,
    by_name: HashMap<Arc<str>, usize>,
}

impl PropertyRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a new key with the given identifier and default value.
    ///
    /// Pass `None` as the default for keys whose absent value is "nothing".
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::DuplicateKey`] if the identifier is already
    /// registered. The existing key is unaffected.
    pub fn register<T: PropertyValue>(
        &mut self,
        name: impl Into<Arc<str>>,
        default_value: impl Into<Option<T>>,
    ) -> Result<Property<T>, PropertyError> {
        let name = name.into();
        if let Some(&idx) = self.by_name.get(&*name) {
            let existing = self.properties[idx].to_string();
            tracing::debug!(key = %name, %existing, "duplicate property key rejected");
            return Err(PropertyError::DuplicateKey { name, existing });
        }

        let property = Property::new(Arc::clone(&name), default_value.into());
        tracing::debug!(key = %name, value_type = property.type_name(), "property key registered");

        self.by_name.insert(Arc::clone(&name), self.properties.len());
        self.properties.push(PropertyRegistration {
            name,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            key: Box::new(property.clone()),
        });
        Ok(property)
    }

    /// Returns the number of registered keys.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if no keys are registered.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Looks up a key by identifier.
    ///
    /// Returns `None` if the identifier is unknown or registered with a value
    /// type other than `T`.
    #[must_use]
    pub fn get<T: PropertyValue>(&self, name: &str) -> Option<Property<T>> {
        self.registration(name)
            .and_then(|r| r.key.as_any().downcast_ref::<Property<T>>())
            .cloned()
    }

    /// Returns the registration for an identifier.
    #[must_use]
    pub fn registration(&self, name: &str) -> Option<&PropertyRegistration> {
        self.by_name.get(name).map(|&idx| &self.properties[idx])
    }

    /// Returns an iterator over all registrations, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PropertyRegistration> {
        self.properties.iter()
    }
}

impl fmt::Debug for PropertyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRegistry")
            .field("count", &self.properties.len())
            .field(
                "properties",
                &self.properties.iter().map(|r| &*r.name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Type-erased key for heterogeneous storage.
trait ErasedKey: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn fmt_display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    fn global_listener_count(&self) -> usize;
}

impl<T: PropertyValue> ErasedKey for Property<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn fmt_display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }

    fn global_listener_count(&self) -> usize {
        Self::global_listener_count(self)
    }
}
