//! ## trafik-engine::runtime
//! **Run orchestration over the stepper**
//!
//! ### Modes:
//! - Live: the stepper runs on a paced task, a consumer task pulls
//!   snapshots off the bus for analytics and persistence
//! - Deterministic: a fixed number of ticks runs inline and folds every
//!   snapshot and congestion point into a replayable digest
//!
//! ### Expectations (Production):
//! - Stopping completes the in-flight tick, closes the bus and drains
//!   the consumer before returning
//! - Sink failures degrade to warnings; the tick loop never stalls on
//!   persistence

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use opentelemetry::KeyValue;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, MissedTickBehavior};
use tracing::{error, info, info_span, instrument, warn, Instrument};

use trafik_analytics::{CongestionAnalyzer, CongestionPoint};
use trafik_config::TrafikConfig;
use trafik_core::routes::RouteTable;
use trafik_core::snapshot::{SnapshotBus, VehicleSnapshot, VehicleState};
use trafik_core::vehicle::{VehicleId, VehicleMix};
use trafik_storage::{MemoryStore, Sink};
use trafik_telemetry::{EventLogger, MetricsRecorder};

use crate::diagnostics::DiagnosticsCollector;
use crate::error::EngineError;
use crate::state::{build_routes, mix_profiles};
use crate::stepper::Stepper;

/// Last known engine state, published once per tick.
#[derive(Clone, Debug, Default)]
pub struct EngineStatus {
    pub running: bool,
    pub tick: u64,
    pub live_vehicles: usize,
    /// Live counts indexed by `VehicleKind::index()`.
    pub by_kind: [usize; 4],
}

/// Owns the analytics pipeline and the sink; drives runs in either mode.
pub struct SimulationRuntime {
    config: Arc<TrafikConfig>,
    pub metrics: Arc<MetricsRecorder>,
    store: Arc<MemoryStore>,
    analyzer: Arc<CongestionAnalyzer>,
    diagnostics: Arc<Mutex<DiagnosticsCollector>>,
}

impl SimulationRuntime {
    pub fn new(config: TrafikConfig) -> Self {
        info!("Initializing simulation runtime");
        let store = Arc::new(MemoryStore::new(&config.storage));
        let analyzer = Arc::new(CongestionAnalyzer::new(&config.analytics));
        Self {
            config: Arc::new(config),
            metrics: Arc::new(MetricsRecorder::new()),
            store,
            analyzer,
            diagnostics: Arc::new(Mutex::new(DiagnosticsCollector::new())),
        }
    }

    pub fn config(&self) -> &TrafikConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }

    /// Starts a live run: a paced stepper task and a snapshot consumer.
    /// The returned handle observes status, awaits readiness and stops
    /// the run.
    pub fn run_live(&self) -> Result<EngineHandle, EngineError> {
        let mut stepper = Stepper::new(&self.config)?;
        let routes = stepper.routes();
        let bus = SnapshotBus::with_capacity(self.config.engine.snapshot_buffer)?;
        let consumer_bus = bus.share();

        let stop = Arc::new(AtomicBool::new(false));
        let (status_tx, status_rx) = watch::channel(EngineStatus::default());
        let (ready_tx, ready_rx) = watch::channel(false);

        info!(
            routes = routes.len(),
            tick_ms = self.config.engine.tick_duration_ms,
            "Starting live simulation"
        );

        let consumer = {
            let pipeline = SnapshotPipeline {
                analyzer: Arc::clone(&self.analyzer),
                store: Arc::clone(&self.store),
                metrics: Arc::clone(&self.metrics),
                routes: Arc::clone(&routes),
            };
            tokio::spawn(
                async move { pipeline.consume(consumer_bus).await }
                    .instrument(info_span!("snapshot_consumer")),
            )
        };

        let producer = {
            let stop = Arc::clone(&stop);
            let metrics = Arc::clone(&self.metrics);
            let tick_duration = Duration::from_millis(self.config.engine.tick_duration_ms);
            tokio::spawn(
                async move {
                    let mut interval = tokio::time::interval(tick_duration);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    let mut published_drops = 0;
                    loop {
                        interval.tick().await;
                        if stop.load(Ordering::Acquire) {
                            break;
                        }

                        let outcome = stepper.step();
                        metrics.inc_tick();
                        metrics
                            .vehicles_live
                            .set(outcome.snapshot.vehicles.len() as f64);
                        if outcome.capacity_rejections > 0 {
                            metrics
                                .capacity_rejections_total
                                .inc_by(outcome.capacity_rejections as f64);
                        }

                        let _ = status_tx.send(EngineStatus {
                            running: true,
                            tick: outcome.snapshot.tick,
                            live_vehicles: outcome.snapshot.vehicles.len(),
                            by_kind: outcome.by_kind,
                        });
                        bus.publish(outcome.snapshot);

                        let dropped = bus.dropped();
                        if dropped > published_drops {
                            metrics
                                .snapshots_dropped_total
                                .inc_by((dropped - published_drops) as f64);
                            published_drops = dropped;
                        }
                        let _ = ready_tx.send(true);
                    }
                    bus.close();
                    status_tx.send_modify(|status| status.running = false);
                    info!("Stepper stopped, snapshot bus closed");
                }
                .instrument(info_span!("stepper_task")),
            )
        };

        Ok(EngineHandle {
            stop,
            status: status_rx,
            ready: ready_rx,
            producer,
            consumer,
            routes,
        })
    }

    /// Runs `ticks` ticks inline and returns the run digest as hex.
    ///
    /// Analytics and persistence happen synchronously per tick, so two
    /// runs from the same seeded config produce identical digests.
    #[instrument(skip(self))]
    pub async fn run_ticks(&self, ticks: u64) -> Result<String, EngineError> {
        let mut stepper = Stepper::new(&self.config)?;
        let routes = stepper.routes();
        let mut hasher = blake3::Hasher::new();

        info!(seed = ?self.config.engine.seed, "Starting deterministic run");

        for _ in 0..ticks {
            let outcome = stepper.step();
            self.metrics.inc_tick();
            self.metrics
                .vehicles_live
                .set(outcome.snapshot.vehicles.len() as f64);
            if outcome.capacity_rejections > 0 {
                self.metrics
                    .capacity_rejections_total
                    .inc_by(outcome.capacity_rejections as f64);
            }

            let started = Instant::now();
            let points = self.analyzer.analyze(&routes, &outcome.snapshot);
            self.metrics
                .analysis_latency
                .observe(started.elapsed().as_nanos() as f64);
            if !points.is_empty() {
                self.metrics
                    .congestion_points_total
                    .inc_by(points.len() as f64);
            }

            fold_snapshot(&mut hasher, &outcome.snapshot);
            fold_congestion(&mut hasher, &points);

            if let Err(e) = self.store.write_vehicles(&outcome.snapshot).await {
                warn!("Failed to persist snapshot: {e}");
            }
            if !points.is_empty() {
                if let Err(e) = self.store.write_congestion(&points).await {
                    warn!("Failed to persist congestion points: {e}");
                }
            }
            self.store.prune_before(outcome.snapshot.timestamp_ns);
        }

        let digest = hex::encode(hasher.finalize().as_bytes());
        EventLogger::log_event(
            "simulation_complete",
            vec![
                KeyValue::new("ticks", ticks.to_string()),
                KeyValue::new("final_hash", digest.clone()),
            ],
        )
        .await;
        Ok(digest)
    }

    /// Compares a replay digest against the expected one. A mismatch is
    /// recorded as a bug report before the error returns.
    pub fn validate_state_hash(&self, expected: &str, actual: &str) -> Result<(), EngineError> {
        if expected == actual {
            info!("Replay validation successful");
            return Ok(());
        }

        error!(expected, actual, "Replay hash mismatch");
        let report =
            format!("Replay validation failed!\nExpected: {expected}\nActual: {actual}\n");
        match self.diagnostics.lock().record_bug_report(&report) {
            Ok(filename) => error!("Bug report saved to: {filename}"),
            Err(e) => error!("Failed to write bug report: {e}"),
        }
        Err(EngineError::Validation(format!(
            "replay hash mismatch (expected {expected}, actual {actual})"
        )))
    }

    /// Synthesizes minute-resolution history ending now and writes it
    /// through the sink in timestamp order.
    #[instrument(skip(self))]
    pub async fn backfill(&self, vehicles: usize, minutes: u64) -> Result<(), EngineError> {
        if vehicles == 0 || minutes == 0 {
            return Ok(());
        }

        let routes = build_routes(&self.config)?;
        let mix = VehicleMix::new(mix_profiles(&self.config.vehicles))?;
        let mut rng = match self.config.engine.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };

        let now_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_nanos() as u64;
        let start_ns = now_ns.saturating_sub(minutes * 60 * 1_000_000_000);

        info!("Backfilling synthesized history");

        let mut fleet = Vec::with_capacity(vehicles);
        for i in 0..vehicles {
            let route_idx = rng.random_range(0..routes.len());
            let (kind, base_speed) = mix.draw(&mut rng, routes.all()[route_idx].speed_limit);
            fleet.push((VehicleId(i as u64 + 1), route_idx, kind, base_speed));
        }

        for minute in 0..minutes {
            let timestamp_ns = start_ns + minute * 60 * 1_000_000_000;
            let mut states = Vec::with_capacity(fleet.len());
            for (id, route_idx, kind, base_speed) in &fleet {
                let route = &routes.all()[*route_idx];
                // journeys loop their route over the backfilled span
                let progress = (*base_speed * minute as f64 * 60.0) % route.length();
                let position = route.position_at(progress);
                states.push(VehicleState {
                    id: *id,
                    kind: *kind,
                    route_id: route.id.clone(),
                    progress,
                    x: position.x,
                    y: position.y,
                    speed: rng.random_range(0.4..1.0) * *base_speed,
                });
            }
            let snapshot = VehicleSnapshot {
                tick: minute,
                timestamp_ns,
                vehicles: states,
            };

            let points = self.analyzer.analyze(&routes, &snapshot);
            if let Err(e) = self.store.write_vehicles(&snapshot).await {
                warn!("Failed to persist backfill snapshot: {e}");
            }
            if !points.is_empty() {
                if let Err(e) = self.store.write_congestion(&points).await {
                    warn!("Failed to persist backfill congestion: {e}");
                }
            }
        }

        info!(records = self.store.vehicle_count(), "Backfill complete");
        Ok(())
    }
}

/// Handle to a live run.
pub struct EngineHandle {
    stop: Arc<AtomicBool>,
    status: watch::Receiver<EngineStatus>,
    ready: watch::Receiver<bool>,
    producer: JoinHandle<()>,
    consumer: JoinHandle<()>,
    routes: Arc<RouteTable>,
}

impl EngineHandle {
    /// Resolves once the first snapshot has been published.
    pub async fn ready(&mut self) {
        let _ = self.ready.wait_for(|published| *published).await;
    }

    /// Route table the run drives over.
    pub fn routes(&self) -> Arc<RouteTable> {
        Arc::clone(&self.routes)
    }

    /// Last published engine status.
    pub fn status(&self) -> EngineStatus {
        self.status.borrow().clone()
    }

    /// Requests a stop and waits for both tasks. The in-flight tick
    /// completes, the bus closes and the consumer drains before this
    /// returns.
    pub async fn stop(self) -> Result<(), EngineError> {
        self.stop.store(true, Ordering::Release);
        self.producer.await?;
        self.consumer.await?;
        Ok(())
    }
}

/// Consumer half of the live pipeline: analytics, then persistence.
struct SnapshotPipeline {
    analyzer: Arc<CongestionAnalyzer>,
    store: Arc<MemoryStore>,
    metrics: Arc<MetricsRecorder>,
    routes: Arc<RouteTable>,
}

impl SnapshotPipeline {
    #[instrument(skip_all)]
    async fn consume(&self, bus: SnapshotBus) {
        info!("Snapshot consumer started");
        loop {
            match bus.try_recv() {
                Some(snapshot) => self.process(&snapshot).await,
                None if bus.is_closed() => break,
                None => sleep(Duration::from_millis(10)).await,
            }
        }
        info!("Snapshot consumer drained and stopped");
    }

    async fn process(&self, snapshot: &VehicleSnapshot) {
        let started = Instant::now();
        let points = self.analyzer.analyze(&self.routes, snapshot);
        self.metrics
            .analysis_latency
            .observe(started.elapsed().as_nanos() as f64);

        if !points.is_empty() {
            self.metrics
                .congestion_points_total
                .inc_by(points.len() as f64);
            EventLogger::log_event(
                "congestion_detected",
                vec![
                    KeyValue::new("tick", snapshot.tick.to_string()),
                    KeyValue::new("points", points.len().to_string()),
                ],
            )
            .await;
            if let Err(e) = self.store.write_congestion(&points).await {
                warn!("Failed to persist congestion points: {e}");
            }
        }

        if let Err(e) = self.store.write_vehicles(snapshot).await {
            warn!("Failed to persist snapshot: {e}");
        }
        self.store.prune_before(snapshot.timestamp_ns);
    }
}

fn fold_snapshot(hasher: &mut blake3::Hasher, snapshot: &VehicleSnapshot) {
    hasher.update(&snapshot.tick.to_le_bytes());
    hasher.update(&snapshot.timestamp_ns.to_le_bytes());
    for vehicle in &snapshot.vehicles {
        hasher.update(&vehicle.id.0.to_le_bytes());
        hasher.update(vehicle.kind.as_str().as_bytes());
        hasher.update(vehicle.route_id.as_bytes());
        hasher.update(&vehicle.progress.to_le_bytes());
        hasher.update(&vehicle.speed.to_le_bytes());
    }
}

fn fold_congestion(hasher: &mut blake3::Hasher, points: &[CongestionPoint]) {
    for point in points {
        hasher.update(point.route_id.as_bytes());
        hasher.update(&point.window_start.to_le_bytes());
        hasher.update(&(point.vehicle_count as u64).to_le_bytes());
        hasher.update(&point.mean_speed.to_le_bytes());
        hasher.update(&[point.severity as u8]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_replays_produce_identical_digests() {
        let mut config = TrafikConfig::default();
        config.engine.seed = Some(42);

        let a = SimulationRuntime::new(config.clone())
            .run_ticks(50)
            .await
            .unwrap();
        let b = SimulationRuntime::new(config).run_ticks(50).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn different_seeds_diverge() {
        let mut config = TrafikConfig::default();
        config.engine.seed = Some(1);
        let a = SimulationRuntime::new(config.clone())
            .run_ticks(30)
            .await
            .unwrap();

        config.engine.seed = Some(2);
        let b = SimulationRuntime::new(config).run_ticks(30).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn deterministic_runs_persist_history() {
        let mut config = TrafikConfig::default();
        config.engine.seed = Some(7);
        config.engine.spawn_probability = 1.0;

        let runtime = SimulationRuntime::new(config);
        runtime.run_ticks(10).await.unwrap();

        assert!(runtime.store().vehicle_count() > 0);
        let recent = runtime.store().recent_vehicles(5);
        assert!(!recent.is_empty());
        assert!(recent.len() <= 5);
    }

    #[tokio::test]
    async fn live_runs_publish_and_stop_cleanly() {
        let mut config = TrafikConfig::default();
        config.engine.seed = Some(3);
        config.engine.tick_duration_ms = 10;
        config.engine.spawn_probability = 1.0;

        let runtime = SimulationRuntime::new(config);
        let mut handle = runtime.run_live().unwrap();
        handle.ready().await;

        let status = handle.status();
        assert!(status.running);
        assert!(status.tick >= 1);

        handle.stop().await.unwrap();
        assert!(runtime.store().vehicle_count() > 0);
    }

    #[tokio::test]
    async fn hash_validation_accepts_a_matching_digest() {
        let mut config = TrafikConfig::default();
        config.engine.seed = Some(11);
        let runtime = SimulationRuntime::new(config);
        let digest = runtime.run_ticks(5).await.unwrap();
        assert!(runtime.validate_state_hash(&digest, &digest).is_ok());
    }

    #[tokio::test]
    async fn backfill_writes_chronological_history() {
        let mut config = TrafikConfig::default();
        config.engine.seed = Some(9);
        let runtime = SimulationRuntime::new(config);

        runtime.backfill(0, 10).await.unwrap();
        assert_eq!(runtime.store().vehicle_count(), 0);

        runtime.backfill(5, 10).await.unwrap();
        assert_eq!(runtime.store().vehicle_count(), 50);

        let recent = runtime.store().recent_vehicles(100);
        for pair in recent.windows(2) {
            assert!(pair[0].timestamp_ns >= pair[1].timestamp_ns);
        }
    }
}
