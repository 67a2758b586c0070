// Copyright 2025 the Keystone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use std::sync::Arc;

use crate::listener::SubscriberId;

/// Error returned by a listener handler.
///
/// Handler errors never reach the caller of
/// [`PropertyHolder::set`](crate::PropertyHolder::set); they are recorded in a
/// [`DispatchReport`](crate::DispatchReport) and logged.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while declaring keys or subscribing listeners.
///
/// Both variants are programming errors that surface during setup and are not
/// expected in steady-state operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// A key with the same identifier is already registered.
    #[error("property key {name:?} is already registered to {existing}")]
    DuplicateKey {
        /// The identifier that was requested.
        name: Arc<str>,
        /// Rendering of the key that already owns the identifier.
        existing: String,
    },
    /// The subscriber declares no handler for the key's identifier and type.
    #[error("subscriber {label:?} ({subscriber}) has no handler for property {key:?} of type {type_name}")]
    NoMatchingHandler {
        /// Identity of the subscriber.
        subscriber: SubscriberId,
        /// Human-readable subscriber label.
        label: Arc<str>,
        /// The key identifier that could not be matched.
        key: Arc<str>,
        /// The key's value type.
        type_name: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_message() {
        let err = PropertyError::DuplicateKey {
            name: "NUMBER".into(),
            existing: "Property { key: NUMBER, type: i32, default: Some(3943) }".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"NUMBER\""));
        assert!(msg.contains("already registered"));
        assert!(msg.contains("Some(3943)"));
    }

    #[test]
    fn no_matching_handler_message() {
        let err = PropertyError::NoMatchingHandler {
            subscriber: SubscriberId::from_raw(7),
            label: "audit".into(),
            key: "STRING".into(),
            type_name: "alloc::string::String",
        };
        let msg = err.to_string();
        assert!(msg.contains("\"audit\""));
        assert!(msg.contains("Subscriber(7)"));
        assert!(msg.contains("\"STRING\""));
    }
}
