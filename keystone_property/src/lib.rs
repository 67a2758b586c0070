// Copyright 2025 the Keystone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keystone Property: typed property keys, per-holder storage and change listeners.
//!
//! Declare strongly-typed keys once, store values for them in any number of
//! independent holders, and subscribe listeners to changes either on every
//! holder or on a single one.
//!
//! ## Core Concepts
//!
//! ### Keys
//!
//! A [`Property<T>`] is declared through a [`PropertyRegistry`], which rejects
//! duplicate identifiers. A key carries its identifier, its value type and an
//! optional default. Keys compare by identifier.
//!
//! ### Holders
//!
//! A [`PropertyHolder`] stores values keyed by identifier:
//!
//! - `get(key)` - stored value, else the key's default
//! - `get_or(key, fallback)` - stored value, else `fallback`
//! - `set(key, value)` - store, notify listeners, return the previous value
//! - `clear(key)` - remove, notify listeners, return the removed value
//!
//! `set_with_report` and `clear_with_report` also return the [`DispatchReport`].
//!
//! A stored value whose type does not match the key is never returned; reads
//! fall back exactly as if nothing were stored.
//!
//! ### Listeners
//!
//! A [`Subscriber`] declares one handler per key identifier it cares about.
//! [`Property::subscribe_global`] binds it for every holder;
//! [`PropertyHolder::subscribe`] binds it for one holder. The handler is
//! resolved at subscribe time. On change, global listeners run first, then the
//! holder's scoped listeners; a failing listener is logged and reported in a
//! [`DispatchReport`] without affecting the others.
//!
//! ## Quick Start
//!
//! ```rust
//! use keystone_property::{PropertyHolder, PropertyRegistry, Subscriber};
//!
//! let mut registry = PropertyRegistry::new();
//! let number = registry.register("NUMBER", 3943_i32).unwrap();
//! let string = registry
//!     .register("STRING", String::from("This requires no cast"))
//!     .unwrap();
//!
//! let listener = Subscriber::builder("example")
//!     .on(&number, |event| {
//!         println!("global: {event}");
//!         Ok(())
//!     })
//!     .on(&string, |event| {
//!         println!("holder: {event}");
//!         Ok(())
//!     })
//!     .build();
//!
//! let mut holder = PropertyHolder::new();
//! assert_eq!(holder.get(&number), Some(3943));
//! assert_eq!(holder.get_or(&string, None), None);
//!
//! number.subscribe_global(&listener).unwrap();
//! assert_eq!(holder.set(&number, 84588), None);
//! assert_eq!(holder.set(&number, 24), Some(84588));
//!
//! assert_eq!(holder.set(&string, "test1".into()), None);
//! holder.subscribe(&string, &listener).unwrap();
//! assert_eq!(holder.set(&string, "test2".into()).as_deref(), Some("test1"));
//! assert_eq!(holder.get(&string).as_deref(), Some("test2"));
//! ```
//!
//! ## Threading
//!
//! Keys, holders and subscribers are `Send + Sync`. A key's global table is
//! guarded by its own lock; a holder is mutated through `&mut`, so a `set` and
//! its notifications run as one unit per holder. Handlers run synchronously on
//! the calling thread.
//!
//! ## Logging
//!
//! Registration and subscription changes are logged at `debug`, dispatch at
//! `trace`, and listener failures at `warn`, through `tracing`.

mod dispatch;
mod error;
mod event;
mod holder;
mod key;
mod listener;
mod owner;
mod registry;
mod value;

pub use dispatch::{DispatchReport, ListenerFailure, Scope};
pub use error::{ListenerError, PropertyError};
pub use event::PropertyEvent;
pub use holder::{HolderId, PropertyHolder};
pub use key::{Property, PropertyValue};
pub use listener::{Subscriber, SubscriberBuilder, SubscriberId};
pub use owner::{PropertyOwner, PropertyOwnerExt};
pub use registry::{PropertyRegistration, PropertyRegistry};
pub use value::ErasedValue;
