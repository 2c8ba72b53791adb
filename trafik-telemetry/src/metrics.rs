//! ## trafik-telemetry::metrics
//! **Prometheus exporter with histograms**
//!
//! ### Expectations:
//! - One registry per process, shared by clone
//! - Gauges track the live world, counters its history
//!
//! ### Components:
//! - `metrics/`: Prometheus exporter with histograms
//! - `logging/`: span-scoped lifecycle events
//!
//! ### Future:
//! - Per-route labelled congestion counters

use prometheus::{Counter, Gauge, Histogram, HistogramOpts, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: prometheus::Registry,
    pub ticks_total: prometheus::Counter,
    pub vehicles_live: prometheus::Gauge,
    pub snapshots_dropped_total: prometheus::Counter,
    pub capacity_rejections_total: prometheus::Counter,
    pub congestion_points_total: prometheus::Counter,
    pub analysis_latency: prometheus::Histogram,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        let registry = Registry::new();
        let ticks_total = Counter::new("trafik_ticks_total", "Total executed ticks").unwrap();
        let vehicles_live =
            Gauge::new("trafik_vehicles_live", "Currently live vehicles").unwrap();
        let snapshots_dropped_total = Counter::new(
            "trafik_snapshots_dropped_total",
            "Snapshots displaced from the bus by a lagging consumer",
        )
        .unwrap();
        let capacity_rejections_total = Counter::new(
            "trafik_capacity_rejections_total",
            "Spawns refused at the vehicle cap",
        )
        .unwrap();
        let congestion_points_total = Counter::new(
            "trafik_congestion_points_total",
            "Congestion points emitted by the analyzer",
        )
        .unwrap();

        let analysis_latency = Histogram::with_opts(
            HistogramOpts::new(
                "trafik_analysis_latency_ns",
                "Congestion analysis time per snapshot",
            )
            .buckets(vec![1_000.0, 10_000.0, 100_000.0, 1_000_000.0, 10_000_000.0]),
        )
        .unwrap();

        registry.register(Box::new(ticks_total.clone())).unwrap();
        registry.register(Box::new(vehicles_live.clone())).unwrap();
        registry
            .register(Box::new(snapshots_dropped_total.clone()))
            .unwrap();
        registry
            .register(Box::new(capacity_rejections_total.clone()))
            .unwrap();
        registry
            .register(Box::new(congestion_points_total.clone()))
            .unwrap();
        registry
            .register(Box::new(analysis_latency.clone()))
            .unwrap();

        Self {
            registry,
            ticks_total,
            vehicles_live,
            snapshots_dropped_total,
            capacity_rejections_total,
            congestion_points_total,
            analysis_latency,
        }
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap())
    }

    pub fn inc_tick(&self) {
        self.ticks_total.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gathers_registered_metrics() {
        let metrics = MetricsRecorder::new();
        metrics.inc_tick();
        metrics.vehicles_live.set(12.0);

        let rendered = metrics.gather_metrics().unwrap();
        assert!(rendered.contains("trafik_ticks_total 1"));
        assert!(rendered.contains("trafik_vehicles_live 12"));
    }
}
