#![allow(unused)]
extern crate evalscope;

#[path = "../tests/common/mod.rs"]
mod common;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use evalscope::{
    evaluation::{calculate_reuse_span, ILSpan},
    metadata::{references::ReferenceKind, snapshot::MetadataSnapshot},
};
use std::hint::black_box;

/// Rebuilding the snapshot of a scope with 200 loaded modules, with and without a previous
/// snapshot to reuse blocks from.
fn bench_snapshot_rebuild(c: &mut Criterion) {
    let modules: Vec<Vec<u8>> = (0..200u16)
        .map(|i| {
            let name = format!("Module{i}");
            common::image(&format!("{name}.dll"), common::mvid((i % 250) as u8), Some((&name, 1)))
        })
        .collect();
    let intrinsics = common::intrinsics();
    let ranges = || modules.iter().map(|m| Ok(m.as_slice())).collect::<Vec<_>>();

    let previous = MetadataSnapshot::build(ranges(), &intrinsics, None).unwrap();

    let mut group = c.benchmark_group("snapshot");
    group.throughput(Throughput::Elements(modules.len() as u64));
    group.bench_function("cold", |b| {
        b.iter(|| black_box(MetadataSnapshot::build(ranges(), &intrinsics, None).unwrap()));
    });
    group.bench_function("warm", |b| {
        b.iter(|| {
            black_box(MetadataSnapshot::build(ranges(), &intrinsics, Some(&previous)).unwrap())
        });
    });
    group.finish();

    let mut group = c.benchmark_group("references");
    group.bench_function("all_assemblies", |b| {
        b.iter(|| {
            black_box(previous.make_assembly_references(common::mvid(7), ReferenceKind::AllAssemblies))
        });
    });
    group.finish();
}

/// Reuse span computation over a method with many nested scopes
fn bench_reuse_span(c: &mut Criterion) {
    let scopes: Vec<ILSpan> = (0..500u32)
        .map(|i| ILSpan::new(i * 8, i * 8 + 6).unwrap())
        .collect();

    c.bench_function("calculate_reuse_span", |b| {
        b.iter(|| black_box(calculate_reuse_span(black_box(2001), ILSpan::MAX, &scopes)));
    });
}

criterion_group!(benches, bench_snapshot_rebuild, bench_reuse_span);
criterion_main!(benches);
