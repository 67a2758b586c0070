// Copyright 2025 the Keystone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Walkthrough of keys, holders and listeners.
//!
//! Raise the max level below to `DEBUG` to also see registrations and
//! subscriptions.

use keystone_property::{
    Property, PropertyError, PropertyHolder, PropertyOwner, PropertyOwnerExt, PropertyRegistry,
    Subscriber,
};
use tracing::Level;

/// An object that embeds its properties instead of exposing a holder.
struct Example {
    holder: PropertyHolder,
}

impl PropertyOwner for Example {
    fn properties(&self) -> &PropertyHolder {
        &self.holder
    }

    fn properties_mut(&mut self) -> &mut PropertyHolder {
        &mut self.holder
    }
}

fn main() -> Result<(), PropertyError> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let mut registry = PropertyRegistry::new();
    let number: Property<i32> = registry.register("NUMBER", 3943)?;
    let string: Property<String> =
        registry.register("STRING", String::from("This requires no cast"))?;

    if let Err(err) = registry.register("NUMBER", 0_i32) {
        tracing::info!(%err, "second NUMBER declaration refused");
    }

    let listener = Subscriber::builder("example")
        .on(&number, |event| {
            tracing::info!("global listener: {event}");
            Ok(())
        })
        .on(&string, |event| {
            tracing::info!("holder listener: {event}");
            Ok(())
        })
        .build();

    let mut example = Example {
        holder: PropertyHolder::new(),
    };

    println!("{:?}", example.get(&number));
    println!("{:?}", example.get_or(&number, 9342327));
    println!("{:?}", example.get(&string));
    println!("{:?}", example.get_or(&string, None));

    number.subscribe_global(&listener)?;

    println!("{:?}", example.set(&number, 84588));
    println!("{:?}", example.set(&number, 24));
    println!("{:?}", example.get(&number));

    println!("{:?}", example.set(&string, "test1".to_owned()));

    example.subscribe(&string, &listener)?;

    println!("{:?}", example.set(&string, "test2".to_owned()));
    println!("{:?}", example.get(&string));

    Ok(())
}
