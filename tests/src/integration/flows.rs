//! # Integration Test Flows
//!
//! Tests that UI components, the stats dispatcher and the backend work
//! together over one `InMemoryEventBus`.
//!
//! ## Flow Tested:
//!
//! 1. **UI → Dispatcher**: `AddListener` / `RemoveListener` on the listeners topic
//! 2. **Dispatcher → Backend**: `SourcesRequest` and periodic `StatsRequest`s
//! 3. **Backend → Dispatcher**: `SourcesAnnounced` whenever the feed listing changes
//! 4. **Backend → UI**: `StatsData` addressed by response event
//!
//! Time is paused, so cadences are driven with `tokio::time::advance`.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use stats_bus::{
        EventFilter, EventPublisher, InMemoryEventBus, StatsEvent, Subscription,
    };
    use stats_dispatcher::{
        BusRequestSink, Cadence, DispatcherConfig, DispatcherHandle, SchedulerState,
        StatsBusAdapter, StatsDispatcherApi,
    };
    use stats_telemetry::TelemetryConfig;
    use stats_types::{FeedAnnouncement, OwnerId};

    use crate::integration::backend::MockBackend;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn feeds() -> FeedAnnouncement {
        FeedAnnouncement::new()
            .with_feed("cpu-0", ["cpu-user", "cpu-idle", "cpu-system"])
            .with_feed("memory", ["memory-free", "memory-active"])
            .with_feed("load", ["shortterm", "midterm", "longterm"])
    }

    fn feeds_with_second_cpu() -> FeedAnnouncement {
        feeds().with_feed("cpu-1", ["cpu-user", "cpu-idle", "cpu-system"])
    }

    fn config() -> DispatcherConfig {
        DispatcherConfig {
            standard_interval: Duration::from_secs(60),
            realtime_interval: Duration::from_secs(5),
            ..DispatcherConfig::default()
        }
    }

    /// Backend first, so the dispatcher's opening `SourcesRequest` is answered.
    async fn start(
        feeds: FeedAnnouncement,
    ) -> (Arc<InMemoryEventBus>, MockBackend, DispatcherHandle<BusRequestSink>) {
        let bus = Arc::new(InMemoryEventBus::new());
        let backend = MockBackend::spawn(bus.clone(), feeds);
        let dispatcher = StatsBusAdapter::for_bus(bus.clone(), config()).spawn();
        settle().await;
        (bus, backend, dispatcher)
    }

    /// Let every task run until all of them block again.
    async fn settle() {
        for _ in 0..25 {
            tokio::task::yield_now().await;
        }
    }

    /// Step the clock in realtime periods so every firing is observed.
    async fn advance(total: Duration) {
        let step = Duration::from_secs(5);
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            tokio::time::advance(step).await;
            settle().await;
            elapsed += step;
        }
    }

    async fn subscribe_ui(
        bus: &InMemoryEventBus,
        owner: OwnerId,
        source: &str,
        key: Option<&str>,
    ) {
        bus.publish(StatsEvent::AddListener {
            source_name: source.to_string(),
            owner,
            key: key.map(str::to_string),
        })
        .await;
    }

    fn samples(sub: &mut Subscription) -> Vec<serde_json::Value> {
        sub.drain()
            .into_iter()
            .filter_map(|event| match event {
                StatsEvent::StatsData { payload, .. } => Some(payload),
                _ => None,
            })
            .collect()
    }

    // =============================================================================
    // SUBSCRIPTION → SAMPLES
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_ui_receives_samples_for_subscribed_source() {
        let (bus, backend, dispatcher) = start(feeds()).await;
        let mut ui = bus.subscribe(EventFilter::responses_for("Cpu0"));

        subscribe_ui(&bus, OwnerId::new(), "Cpu", None).await;
        settle().await;

        let received = samples(&mut ui);
        assert!(!received.is_empty(), "dispatch on subscribe");

        let payload = &received[0];
        let items = payload["items"].as_array().expect("items array");
        let types: Vec<&str> = items.iter().filter_map(|i| i["type"].as_str()).collect();
        assert_eq!(types, vec!["cpu-user", "cpu-system"]);
        assert!(items.iter().all(|i| i["source"] == "cpu-0"));
        assert_eq!(payload["step"], "10");
        assert_eq!(payload["start"], "now-10m");

        dispatcher.shutdown().await.expect("service");
        backend.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_listener_triggers_fresh_announcement() {
        let (bus, backend, dispatcher) = start(feeds()).await;
        assert_eq!(backend.stats().source_requests, 1);

        subscribe_ui(&bus, OwnerId::new(), "Memory", None).await;
        settle().await;
        assert_eq!(backend.stats().source_requests, 2);

        // Later listeners do not ask again
        subscribe_ui(&bus, OwnerId::new(), "Load", None).await;
        settle().await;
        assert_eq!(backend.stats().source_requests, 2);

        dispatcher.shutdown().await.expect("service");
        backend.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_loop_keeps_samples_flowing() {
        let (bus, backend, dispatcher) = start(feeds()).await;
        let mut ui = bus.subscribe(EventFilter::responses_for("Cpu0"));

        subscribe_ui(&bus, OwnerId::new(), "Cpu", Some("0")).await;
        settle().await;
        ui.drain();

        advance(Duration::from_secs(15)).await;
        assert_eq!(samples(&mut ui).len(), 3);

        dispatcher.shutdown().await.expect("service");
        backend.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cadences_run_independently() {
        let (bus, backend, dispatcher) = start(feeds()).await;
        let mut cpu = bus.subscribe(EventFilter::responses_for("Cpu0"));
        let mut memory = bus.subscribe(EventFilter::responses_for("Memory"));

        subscribe_ui(&bus, OwnerId::new(), "Cpu", None).await;
        subscribe_ui(&bus, OwnerId::new(), "Memory", None).await;
        settle().await;
        cpu.drain();
        memory.drain();

        advance(Duration::from_secs(60)).await;
        assert_eq!(samples(&mut cpu).len(), 12);
        assert_eq!(samples(&mut memory).len(), 1);

        dispatcher.shutdown().await.expect("service");
        backend.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_consumer_wakes_on_sample() {
        let (bus, backend, dispatcher) = start(feeds()).await;
        let mut load = bus.subscribe(EventFilter::responses_for("Load"));

        subscribe_ui(&bus, OwnerId::new(), "Load", None).await;

        let event = tokio::time::timeout(Duration::from_secs(1), load.recv())
            .await
            .expect("sample before timeout")
            .expect("bus open");
        match event {
            StatsEvent::StatsData { payload, .. } => {
                let datasets: Vec<&str> = payload["items"]
                    .as_array()
                    .expect("items")
                    .iter()
                    .filter_map(|i| i["dataset"].as_str())
                    .collect();
                assert_eq!(datasets, vec!["shortterm", "midterm", "longterm"]);
            }
            other => panic!("unexpected event {other:?}"),
        }

        dispatcher.shutdown().await.expect("service");
        backend.stop();
    }

    // =============================================================================
    // LISTENER CHURN
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_last_component_leaving_silences_backend() {
        let (bus, backend, dispatcher) = start(feeds()).await;
        let owner = OwnerId::new();

        subscribe_ui(&bus, owner, "Cpu", None).await;
        settle().await;

        bus.publish(StatsEvent::RemoveListener { owner }).await;
        settle().await;
        let before = backend.stats().stats_requests;

        advance(Duration::from_secs(120)).await;
        assert_eq!(backend.stats().stats_requests, before);

        let service = dispatcher.shutdown().await.expect("service");
        assert_eq!(service.state(), SchedulerState::NotStarted);
        assert_eq!(service.snapshot().listeners, 0);
        backend.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_source_survives_one_owner_leaving() {
        let (bus, backend, dispatcher) = start(feeds()).await;
        let mut memory = bus.subscribe(EventFilter::responses_for("Memory"));
        let (chart, table) = (OwnerId::new(), OwnerId::new());

        subscribe_ui(&bus, chart, "Memory", None).await;
        subscribe_ui(&bus, table, "Memory", None).await;
        settle().await;

        bus.publish(StatsEvent::RemoveListener { owner: chart }).await;
        settle().await;
        memory.drain();

        advance(Duration::from_secs(60)).await;
        assert_eq!(samples(&mut memory).len(), 1);

        let service = dispatcher.shutdown().await.expect("service");
        assert_eq!(service.snapshot().listeners, 1);
        backend.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_source_does_not_disturb_others() {
        let (bus, backend, dispatcher) = start(feeds()).await;
        let mut memory = bus.subscribe(EventFilter::responses_for("Memory"));

        subscribe_ui(&bus, OwnerId::new(), "Gpu", None).await;
        subscribe_ui(&bus, OwnerId::new(), "Memory", None).await;
        settle().await;

        assert!(!samples(&mut memory).is_empty());

        let service = dispatcher.shutdown().await.expect("service");
        assert_eq!(service.snapshot().listeners, 1);
        assert!(service.source("Gpu").is_none());
        backend.stop();
    }

    // =============================================================================
    // AVAILABILITY CHANGES
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_new_device_joins_rotation_after_announcement() {
        let (bus, backend, dispatcher) = start(feeds()).await;
        let mut cpu1 = bus.subscribe(EventFilter::responses_for("Cpu1"));

        subscribe_ui(&bus, OwnerId::new(), "Cpu", None).await;
        settle().await;
        assert!(samples(&mut cpu1).is_empty());

        backend.change_feeds(feeds_with_second_cpu()).await;
        settle().await;
        assert_eq!(samples(&mut cpu1).len(), 1, "immediate dispatch on restart");

        // Both devices ride the same job on every tick
        advance(Duration::from_secs(20)).await;
        assert_eq!(samples(&mut cpu1).len(), 4);

        let service = dispatcher.shutdown().await.expect("service");
        let realtime = service.snapshot().realtime_jobs;
        assert_eq!(realtime.len(), 1);
        assert_eq!(realtime[0].response_events, vec!["Cpu0", "Cpu1"]);
        backend.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_listener_waits_for_device() {
        let (bus, backend, dispatcher) = start(feeds()).await;
        let mut cpu1 = bus.subscribe(EventFilter::responses_for("Cpu1"));

        subscribe_ui(&bus, OwnerId::new(), "Cpu", Some("1")).await;
        settle().await;
        advance(Duration::from_secs(10)).await;
        assert!(samples(&mut cpu1).is_empty());

        backend.change_feeds(feeds_with_second_cpu()).await;
        settle().await;
        assert_eq!(samples(&mut cpu1).len(), 1);

        advance(Duration::from_secs(5)).await;
        assert_eq!(samples(&mut cpu1).len(), 1);

        dispatcher.shutdown().await.expect("service");
        backend.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_disappearing_drops_its_job() {
        let (bus, backend, dispatcher) = start(feeds_with_second_cpu()).await;
        let mut cpu1 = bus.subscribe(EventFilter::responses_for("Cpu1"));

        subscribe_ui(&bus, OwnerId::new(), "Cpu", None).await;
        settle().await;

        backend.change_feeds(feeds()).await;
        settle().await;
        cpu1.drain();

        advance(Duration::from_secs(20)).await;
        assert!(samples(&mut cpu1).is_empty());

        let service = dispatcher.shutdown().await.expect("service");
        assert_eq!(service.state(), SchedulerState::Running);
        assert_eq!(service.snapshot().jobs(Cadence::Realtime).len(), 1);
        backend.stop();
    }

    // =============================================================================
    // BUS WIRING AND TELEMETRY
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_dispatcher_only_consumes_its_topics() {
        let (bus, backend, dispatcher) = start(feeds()).await;

        // Backend and dispatcher
        assert_eq!(bus.subscriber_count(), 2);

        // A stray response must not be mistaken for input
        bus.publish(StatsEvent::StatsData {
            response_event: "Memory".into(),
            payload: serde_json::json!({}),
        })
        .await;
        settle().await;

        let service = dispatcher.shutdown().await.expect("service");
        assert_eq!(service.state(), SchedulerState::NotStarted);
        backend.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_exported_after_dispatch() {
        // Only test in this binary that installs a global subscriber
        let config = TelemetryConfig {
            console_output: false,
            ..TelemetryConfig::default()
        };
        let _telemetry = stats_telemetry::init_telemetry(config).expect("telemetry");

        let (bus, backend, dispatcher) = start(feeds()).await;
        subscribe_ui(&bus, OwnerId::new(), "Memory", None).await;
        settle().await;
        dispatcher.shutdown().await.expect("service");
        backend.stop();

        let text = stats_telemetry::encode_metrics().expect("encode");
        assert!(text.contains("stats_dispatcher_requests_emitted_total"));
        assert!(text.contains("stats_dispatcher_announcements_total"));
        assert!(text.contains("stats_dispatcher_listeners_active"));
    }
}
