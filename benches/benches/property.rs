// Copyright 2025 the Keystone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `keystone_property`.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Once;

use keystone_property::{Property, PropertyHolder, PropertyRegistry, Subscriber};

fn bench_property(c: &mut Criterion) {
    static PRINT_SIZES: Once = Once::new();
    PRINT_SIZES.call_once(|| {
        eprintln!(
            "sizes: PropertyHolder={} ErasedValue={}",
            core::mem::size_of::<PropertyHolder>(),
            core::mem::size_of::<keystone_property::ErasedValue>(),
        );
    });

    let mut registry = PropertyRegistry::new();
    let width: Property<f64> = registry.register("Width", 0.0_f64).unwrap();
    let text: Property<String> = registry.register("Text", String::new()).unwrap();

    let mut group = c.benchmark_group("property/get");

    group.bench_function("stored", |b| {
        let mut holder = PropertyHolder::new();
        holder.set(&width, 100.0);
        b.iter(|| black_box(holder.get(&width)))
    });

    group.bench_function("default", |b| {
        let holder = PropertyHolder::new();
        b.iter(|| black_box(holder.get(&width)))
    });

    group.bench_function("string_clone", |b| {
        let mut holder = PropertyHolder::new();
        holder.set(&text, "hello world hello world hello world".to_string());
        b.iter(|| black_box(holder.get(&text)))
    });

    group.bench_function("string_ref", |b| {
        let mut holder = PropertyHolder::new();
        holder.set(&text, "hello world hello world hello world".to_string());
        b.iter(|| black_box(holder.get_ref(&text).map(String::len)))
    });

    // Lookup cost as a holder fills up past its inline capacity.
    for count in [4_usize, 16, 64] {
        let keys: Vec<Property<usize>> = (0..count)
            .map(|i| registry.register(format!("Fill{count}_{i}"), 0_usize).unwrap())
            .collect();
        let mut holder = PropertyHolder::new();
        for (i, key) in keys.iter().enumerate() {
            holder.set(key, i);
        }
        let lookup = keys[count / 2].clone();
        group.bench_function(BenchmarkId::new("filled", count), |b| {
            b.iter(|| black_box(holder.get(&lookup)))
        });
    }

    group.finish();

    let mut group = c.benchmark_group("property/set");

    group.bench_function("f64/no_listener", |b| {
        b.iter_batched(
            PropertyHolder::new,
            |mut holder| {
                black_box(holder.set(&width, 123.0_f64));
                black_box(holder);
            },
            BatchSize::SmallInput,
        )
    });

    let mut registry_with_listeners = PropertyRegistry::new();
    let watched: Property<f64> = registry_with_listeners.register("Width", 0.0_f64).unwrap();
    for listeners in [1_usize, 8] {
        let subscribers: Vec<Subscriber> = (0..listeners)
            .map(|i| {
                Subscriber::builder(format!("bench-{i}"))
                    .on(&watched, |event| {
                        black_box(event.new_value());
                        Ok(())
                    })
                    .build()
            })
            .collect();
        for sub in &subscribers {
            watched.subscribe_global(sub).unwrap();
        }
        group.bench_function(BenchmarkId::new("f64/global_listeners", listeners), |b| {
            b.iter_batched(
                PropertyHolder::new,
                |mut holder| {
                    black_box(holder.set(&watched, 123.0_f64));
                    black_box(holder);
                },
                BatchSize::SmallInput,
            )
        });
        for sub in &subscribers {
            watched.unsubscribe_global(sub);
        }
    }

    group.bench_function("string", |b| {
        b.iter_batched(
            PropertyHolder::new,
            |mut holder| {
                black_box(holder.set(&text, "hello world".to_string()));
                black_box(holder);
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_property);
criterion_main!(benches);
