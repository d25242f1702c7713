//! Event Bus Adapter for the stats dispatcher
//!
//! Subscribes to availability and listener events on the stats bus, feeds
//! them to the service, and drives both cadence timers. Everything runs in a
//! single task, so availability updates, listener changes and timer ticks
//! never interleave and the service needs no locks.

use async_trait::async_trait;
use stats_bus::{EventFilter, EventPublisher, EventTopic, InMemoryEventBus, StatsEvent};
use stats_telemetry::metrics::TIMERS_ARMED;
use stats_types::StatsRequest;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::{Cadence, DispatcherConfig};
use crate::ports::{RequestSink, StatsDispatcherApi};
use crate::service::StatsDispatcherService;

/// Publishes dispatcher output on the stats bus.
pub struct BusRequestSink {
    bus: Arc<InMemoryEventBus>,
}

impl BusRequestSink {
    pub fn new(bus: Arc<InMemoryEventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl RequestSink for BusRequestSink {
    async fn emit(&self, request: StatsRequest) {
        self.bus.publish(StatsEvent::StatsRequest(request)).await;
    }

    async fn request_sources(&self) {
        self.bus.publish(StatsEvent::SourcesRequest).await;
    }
}

/// An armed interval and the lane epoch it was created for.
struct ArmedTimer {
    epoch: u64,
    interval: Interval,
}

/// Wait for the next firing, or forever when disarmed.
async fn next_tick(timer: &mut Option<ArmedTimer>) {
    match timer {
        Some(armed) => {
            armed.interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Wait for shutdown, or forever without a signal.
async fn shutdown_requested(signal: &mut Option<oneshot::Receiver<()>>) {
    match signal {
        Some(rx) => {
            // A dropped sender also means shut down
            let _ = rx.await;
        }
        None => std::future::pending().await,
    }
}

/// Bus adapter for the stats dispatcher
pub struct StatsBusAdapter<S: RequestSink + 'static> {
    bus: Arc<InMemoryEventBus>,
    service: StatsDispatcherService<S>,
    shutdown: Option<oneshot::Receiver<()>>,
}

impl StatsBusAdapter<BusRequestSink> {
    /// Adapter whose service publishes back onto `bus`.
    pub fn for_bus(bus: Arc<InMemoryEventBus>, config: DispatcherConfig) -> Self {
        let sink = Arc::new(BusRequestSink::new(bus.clone()));
        Self::new(bus, StatsDispatcherService::with_config(sink, config))
    }
}

impl<S: RequestSink + 'static> StatsBusAdapter<S> {
    pub fn new(bus: Arc<InMemoryEventBus>, service: StatsDispatcherService<S>) -> Self {
        Self {
            bus,
            service,
            shutdown: None,
        }
    }

    /// Stop the loop when `signal` fires or its sender is dropped.
    #[must_use]
    pub fn with_shutdown(mut self, signal: oneshot::Receiver<()>) -> Self {
        self.shutdown = Some(signal);
        self
    }

    /// Run until shutdown or until the bus closes, then hand the service back.
    ///
    /// This should be spawned as a background task.
    pub async fn run(self) -> StatsDispatcherService<S> {
        let Self {
            bus,
            mut service,
            mut shutdown,
        } = self;

        // Subscribe before asking, so the announcement cannot be missed
        let filter = EventFilter::topics(vec![EventTopic::Availability, EventTopic::Listeners]);
        let mut subscription = bus.subscribe(filter);
        drop(bus);

        info!("[StatsBusAdapter] Started listening for events");
        service.request_sources().await;

        let mut standard: Option<ArmedTimer> = None;
        let mut realtime: Option<ArmedTimer> = None;

        loop {
            sync_timer(&service, Cadence::Standard, &mut standard);
            sync_timer(&service, Cadence::Realtime, &mut realtime);

            tokio::select! {
                event = subscription.recv() => match event {
                    Some(event) => handle_event(&mut service, event).await,
                    None => {
                        warn!("[StatsBusAdapter] Event bus closed, shutting down");
                        break;
                    }
                },
                _ = next_tick(&mut standard) => {
                    service.tick(Cadence::Standard).await;
                }
                _ = next_tick(&mut realtime) => {
                    service.tick(Cadence::Realtime).await;
                }
                _ = shutdown_requested(&mut shutdown) => {
                    info!("[StatsBusAdapter] Shutdown requested");
                    break;
                }
            }
        }

        service
    }

    /// Spawn the loop with a shutdown handle.
    pub fn spawn(self) -> DispatcherHandle<S> {
        let (tx, rx) = oneshot::channel();
        let adapter = self.with_shutdown(rx);
        DispatcherHandle {
            shutdown: Some(tx),
            task: tokio::spawn(adapter.run()),
        }
    }
}

/// Re-create, keep or drop a lane's interval to match the service.
fn sync_timer<S: RequestSink>(
    service: &StatsDispatcherService<S>,
    cadence: Cadence,
    slot: &mut Option<ArmedTimer>,
) {
    match service.timer(cadence) {
        None => {
            if slot.take().is_some() {
                debug!(cadence = %cadence, "Interval dropped");
            }
        }
        Some(plan) if slot.as_ref().map(|t| t.epoch) != Some(plan.epoch) => {
            // First firing one period from now; start() already dispatched
            let mut interval = interval_at(Instant::now() + plan.period, plan.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            *slot = Some(ArmedTimer {
                epoch: plan.epoch,
                interval,
            });
            TIMERS_ARMED.with_label_values(&[cadence.label()]).inc();
            debug!(cadence = %cadence, epoch = plan.epoch, period = ?plan.period, "Interval armed");
        }
        Some(_) => {}
    }
}

async fn handle_event<S: RequestSink + 'static>(
    service: &mut StatsDispatcherService<S>,
    event: StatsEvent,
) {
    match event {
        StatsEvent::SourcesAnnounced(feeds) => {
            service.announce(feeds).await;
        }
        StatsEvent::AddListener {
            source_name,
            owner,
            key,
        } => {
            if let Err(e) = service.add_listener(&source_name, owner, key).await {
                debug!(error = %e, "Add listener rejected");
            }
        }
        StatsEvent::RemoveListener { owner } => {
            service.remove_listener(owner).await;
        }
        _ => {
            // Filtered out by the subscription
        }
    }
}

/// Handle to a spawned dispatcher task.
pub struct DispatcherHandle<S: RequestSink + 'static> {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<StatsDispatcherService<S>>,
}

impl<S: RequestSink + 'static> DispatcherHandle<S> {
    /// Signal shutdown and wait for the service to be handed back.
    ///
    /// Returns `None` if the task panicked or was cancelled.
    pub async fn shutdown(mut self) -> Option<StatsDispatcherService<S>> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(service) => Some(service),
            Err(e) => {
                warn!(error = %e, "Dispatcher task did not finish cleanly");
                None
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
