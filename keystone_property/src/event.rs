// Copyright 2025 the Keystone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change events delivered to listeners.

use std::fmt;

use crate::holder::PropertyHolder;
use crate::key::{Property, PropertyValue};

/// A change to one property on one holder.
///
/// Events borrow everything they describe and are only valid for the duration
/// of a dispatch. `None` for a value means "absent": no value was stored before
/// the change, or the value was cleared.
pub struct PropertyEvent<'a, T: PropertyValue> {
    property: &'a Property<T>,
    holder: Option<&'a PropertyHolder>,
    old_value: Option<&'a T>,
    new_value: Option<&'a T>,
}

impl<'a, T: PropertyValue> PropertyEvent<'a, T> {
    /// Creates an event.
    ///
    /// Pass `None` as `holder` for changes that do not belong to a holder;
    /// only global listeners see those.
    #[must_use]
    pub fn new(
        property: &'a Property<T>,
        holder: Option<&'a PropertyHolder>,
        old_value: Option<&'a T>,
        new_value: Option<&'a T>,
    ) -> Self {
        Self {
            property,
            holder,
            old_value,
            new_value,
        }
    }

    /// The key that changed.
    #[must_use]
    #[inline]
    pub fn property(&self) -> &'a Property<T> {
        self.property
    }

    /// The holder the change happened on.
    #[must_use]
    #[inline]
    pub fn holder(&self) -> Option<&'a PropertyHolder> {
        self.holder
    }

    /// The value before the change.
    #[must_use]
    #[inline]
    pub fn old_value(&self) -> Option<&'a T> {
        self.old_value
    }

    /// The value after the change.
    #[must_use]
    #[inline]
    pub fn new_value(&self) -> Option<&'a T> {
        self.new_value
    }
}

impl<T: PropertyValue> fmt::Debug for PropertyEvent<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyEvent")
            .field("property", &self.property.name())
            .field("holder", &self.holder.map(PropertyHolder::id))
            .field("old_value", &self.old_value)
            .field("new_value", &self.new_value)
            .finish()
    }
}

impl<T: PropertyValue> fmt::Display for PropertyEvent<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyEvent {{ property: {}", self.property.name())?;
        match self.holder {
            Some(holder) => write!(f, ", holder: {}", holder.id())?,
            None => f.write_str(", holder: none")?,
        }
        write!(
            f,
            ", old: {:?}, new: {:?} }}",
            self.old_value, self.new_value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let key = Property::<i32>::new("NUMBER".into(), Some(3943));
        let holder = PropertyHolder::new();
        let event = PropertyEvent::new(&key, Some(&holder), Some(&1), Some(&2));

        assert_eq!(event.property(), &key);
        assert_eq!(event.holder().map(PropertyHolder::id), Some(holder.id()));
        assert_eq!(event.old_value(), Some(&1));
        assert_eq!(event.new_value(), Some(&2));
    }

    #[test]
    fn display_without_holder() {
        let key = Property::<String>::new("STRING".into(), None);
        let new = String::from("test1");
        let event = PropertyEvent::new(&key, None, None, Some(&new));
        assert_eq!(
            event.to_string(),
            "PropertyEvent { property: STRING, holder: none, old: None, new: Some(\"test1\") }"
        );
    }

    #[test]
    fn display_with_holder() {
        let key = Property::<i32>::new("NUMBER".into(), None);
        let holder = PropertyHolder::new();
        let event = PropertyEvent::new(&key, Some(&holder), Some(&84588), Some(&24));
        let shown = event.to_string();
        assert!(shown.contains(&holder.id().to_string()));
        assert!(shown.contains("old: Some(84588)"));
        assert!(shown.contains("new: Some(24)"));
    }
}
