//! # Stats Dispatcher Benchmarks
//!
//! | Path | Work per iteration |
//! |------|--------------------|
//! | Availability | Resolve the full catalog against an announcement |
//! | Message build | One request for a wide wildcard source |
//! | Announcement | Resolve, rebuild every listened source, restart |
//! | Tick | Round-robin step plus emission |

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stats_dispatcher::{
    AvailabilityResolver, Cadence, MessageBuilder, RequestSink, SourceRegistry,
    StatsDispatcherApi, StatsDispatcherService,
};
use stats_types::{FeedAnnouncement, OwnerId, StatsRequest};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Sink that drops everything.
struct NullSink;

#[async_trait]
impl RequestSink for NullSink {
    async fn emit(&self, request: StatsRequest) {
        black_box(request);
    }

    async fn request_sources(&self) {}
}

const CPU_TYPES: [&str; 8] = [
    "cpu-user",
    "cpu-system",
    "cpu-idle",
    "cpu-nice",
    "cpu-interrupt",
    "cpu-wait",
    "cpu-steal",
    "cpu-softirq",
];

/// A host with `cpus` cores, `disks` disks and the fixed feeds.
fn announcement(cpus: usize, disks: usize) -> FeedAnnouncement {
    let mut feeds = FeedAnnouncement::new()
        .with_feed("memory", ["memory-free", "memory-active", "memory-wired"])
        .with_feed("load", ["shortterm", "midterm", "longterm"])
        .with_feed("processes", ["ps_state-running", "ps_state-sleeping", "ps_state-idle"])
        .with_feed("interface-em0", ["if_octets", "if_packets"]);
    for cpu in 0..cpus {
        feeds = feeds.with_feed(&format!("cpu-{cpu}"), CPU_TYPES);
    }
    for disk in 0..disks {
        feeds = feeds.with_feed(&format!("disk-ada{disk}"), ["disk_octets", "disk_ops"]);
    }
    feeds
}

// ============================================================================
// AVAILABILITY
// ============================================================================

fn bench_resolve_catalog(c: &mut Criterion) {
    let mut group = c.benchmark_group("availability-resolve");
    let resolver = AvailabilityResolver;

    for cpus in [4usize, 32, 128] {
        let feeds = announcement(cpus, cpus / 2);
        group.throughput(Throughput::Elements(feeds.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(cpus), &feeds, |b, feeds| {
            let mut registry = SourceRegistry::with_default_catalog();
            b.iter(|| {
                resolver.resolve_all(registry.iter_mut(), black_box(feeds));
            });
        });
    }

    group.finish();
}

// ============================================================================
// MESSAGE BUILD
// ============================================================================

fn bench_message_build(c: &mut Criterion) {
    let resolver = AvailabilityResolver;
    let builder = MessageBuilder::default();
    let mut registry = SourceRegistry::with_default_catalog();
    resolver.resolve_all(registry.iter_mut(), &announcement(64, 0));
    let Some(cpu) = registry.get("Cpu") else {
        return;
    };

    c.bench_function("message-build-cpu", |b| {
        b.iter(|| builder.build(black_box("cpu-17"), cpu));
    });
}

// ============================================================================
// SERVICE
// ============================================================================

fn listening_service(rt: &Runtime) -> StatsDispatcherService<NullSink> {
    let mut service = StatsDispatcherService::new(Arc::new(NullSink));
    rt.block_on(async {
        for source in ["Cpu", "Disks", "Memory", "Load", "Processes", "NIC"] {
            let _ = service.add_listener(source, OwnerId::new(), None).await;
        }
    });
    service
}

fn bench_announce(c: &mut Criterion) {
    let Ok(rt) = Runtime::new() else {
        return;
    };
    let mut group = c.benchmark_group("announce");

    for cpus in [4usize, 32, 128] {
        let feeds = announcement(cpus, cpus / 2);
        let mut service = listening_service(&rt);
        group.bench_with_input(BenchmarkId::from_parameter(cpus), &feeds, |b, feeds| {
            b.iter(|| rt.block_on(service.announce(feeds.clone())));
        });
    }

    group.finish();
}

fn bench_tick(c: &mut Criterion) {
    let Ok(rt) = Runtime::new() else {
        return;
    };
    let mut service = listening_service(&rt);
    rt.block_on(service.announce(announcement(32, 16)));

    c.bench_function("tick-realtime", |b| {
        b.iter(|| rt.block_on(service.tick(black_box(Cadence::Realtime))));
    });
}

criterion_group!(
    benches,
    bench_resolve_catalog,
    bench_message_build,
    bench_announce,
    bench_tick
);
criterion_main!(benches);
