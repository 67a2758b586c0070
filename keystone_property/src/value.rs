// Copyright 2025 the Keystone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-erased stored values.
//!
//! A [`PropertyHolder`](crate::PropertyHolder) keeps values for many keys in a
//! single collection. Each value is stored as an [`ErasedValue`] that remembers
//! its concrete type, so reads can check it against the key's declared type
//! before handing it back.

use std::any::{Any, TypeId};
use std::fmt;

use crate::key::PropertyValue;

/// A type-erased property value.
///
/// # Example
///
/// ```rust
/// use keystone_property::ErasedValue;
///
/// let value = ErasedValue::new(42_i32);
/// assert!(value.is::<i32>());
/// assert_eq!(value.downcast_ref::<i32>(), Some(&42));
/// assert_eq!(value.downcast_ref::<u8>(), None);
/// assert_eq!(value.downcast::<i32>().ok(), Some(42));
/// ```
pub struct ErasedValue {
    inner: Box<dyn ErasedValueTrait>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ErasedValue {
    /// Creates a new erased value from a concrete value.
    #[must_use]
    pub fn new<T: PropertyValue>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            inner: Box::new(value),
        }
    }

    /// Returns the [`TypeId`] of the contained value.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name of the contained value, for diagnostics.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the contained value is of type `T`.
    #[must_use]
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Attempts to downcast to a reference of type `T`.
    ///
    /// Returns `None` if the contained value is not of type `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        if self.is::<T>() {
            self.inner.as_any().downcast_ref()
        } else {
            None
        }
    }

    /// Unwraps the contained value as `T`.
    ///
    /// Gives the erased value back unchanged if it holds a different type.
    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        if !self.is::<T>() {
            return Err(self);
        }
        let Self {
            inner,
            type_id,
            type_name,
        } = self;
        match inner.into_any().downcast::<T>() {
            Ok(value) => Ok(*value),
            // Unreachable while `type_id` is kept in sync with `inner`.
            Err(_) => Err(Self::mismatched(type_id, type_name)),
        }
    }

    fn mismatched(type_id: TypeId, type_name: &'static str) -> Self {
        Self {
            inner: Box::new(()),
            type_id,
            type_name,
        }
    }
}

impl Clone for ErasedValue {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_boxed(),
            type_id: self.type_id,
            type_name: self.type_name,
        }
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedValue")
            .field("type", &self.type_name)
            .field("value", &self.inner.debug())
            .finish_non_exhaustive()
    }
}

/// Trait object for type-erased values that can be cloned and printed.
trait ErasedValueTrait: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn clone_boxed(&self) -> Box<dyn ErasedValueTrait>;
    fn debug(&self) -> &dyn fmt::Debug;
}

impl<T: PropertyValue> ErasedValueTrait for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_boxed(&self) -> Box<dyn ErasedValueTrait> {
        Box::new(self.clone())
    }

    fn debug(&self) -> &dyn fmt::Debug {
        self
    }
}
