//! ## trafik-telemetry::logging
//! **Structured logging with tracing and OpenTelemetry**
//!
//! ### Expectations:
//! - Negligible overhead at one snapshot per tick
//! - Structured fields for every lifecycle event
//!
//! ### Components:
//! - `metrics/`: Prometheus exporter with histograms
//! - `logging/`: span-scoped lifecycle events
//!
//! ### Future:
//! - OTLP export for hosted collectors

use opentelemetry::KeyValue;
use tracing::{info_span, Instrument};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global fmt subscriber. `RUST_LOG` overrides the
    /// `info` default.
    pub fn init() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .with_span_events(FmtSpan::ENTER)
            .init()
    }

    /// Emits one lifecycle event inside a `simulation_event` span.
    #[inline]
    pub async fn log_event(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!("simulation_event", event_type, otel.kind = "INTERNAL");
        async move {
            tracing::info!(metadata = ?metadata, "Simulation event occurred");
        }
        .instrument(span)
        .await
    }
}
