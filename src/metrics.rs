//! Observability hooks
//!
//! `METRICS` (feature `metrics`) counts migration outcomes and lock waits through
//! OpenTelemetry with a Prometheus registry behind it. `tracing_helpers` (feature `tracing`)
//! builds the spans used around sessions, transactions and migration actions.

#[cfg(feature = "metrics")]
pub use self::otel::{SlipwayMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram},
        KeyValue,
    };
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use std::time::Duration;

    pub static METRICS: Lazy<SlipwayMetrics> = Lazy::new(SlipwayMetrics::init);

    pub struct SlipwayMetrics {
        /// Registry the Prometheus exporter writes into; scrape with `registry.gather()`.
        pub registry: prometheus::Registry,
        pub migrations_total: Counter<u64>,
        pub migration_failures_total: Counter<u64>,
        pub migration_duration: Histogram<f64>,
        pub lock_wait_duration: Histogram<f64>,
    }

    impl SlipwayMetrics {
        pub fn init() -> Self {
            let registry = prometheus::Registry::new();
            match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => {
                    let provider = SdkMeterProvider::builder().with_reader(exporter).build();
                    global::set_meter_provider(provider);
                }
                Err(e) => log::warn!("Prometheus exporter unavailable, metrics are dropped: {e}"),
            }

            let meter = global::meter("slipway");

            let migrations_total = meter
                .u64_counter("slipway_migrations_total")
                .with_description("Migrations applied or reverted")
                .build();

            let migration_failures_total = meter
                .u64_counter("slipway_migration_failures_total")
                .with_description("Migrations whose action or ledger write failed")
                .build();

            let migration_duration = meter
                .f64_histogram("slipway_migration_duration_seconds")
                .with_description("Duration of single migration actions")
                .build();

            let lock_wait_duration = meter
                .f64_histogram("slipway_lock_wait_seconds")
                .with_description("Time spent waiting for the migration advisory lock")
                .build();

            Self {
                registry,
                migrations_total,
                migration_failures_total,
                migration_duration,
                lock_wait_duration,
            }
        }

        pub fn record_migration(&self, direction: &'static str, elapsed: Duration) {
            let attrs = [KeyValue::new("direction", direction)];
            self.migrations_total.add(1, &attrs);
            self.migration_duration.record(elapsed.as_secs_f64(), &attrs);
        }

        pub fn record_failure(&self, direction: &'static str) {
            self.migration_failures_total
                .add(1, &[KeyValue::new("direction", direction)]);
        }

        pub fn observe_lock_wait(&self, waited: Duration) {
            self.lock_wait_duration.record(waited.as_secs_f64(), &[]);
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    pub fn acquire_connection_span() -> Span {
        info_span!("slipway.connect")
    }

    pub fn execute_query_span(query: &str) -> Span {
        // Migration scripts can be large; keep the span field readable.
        let preview: String = query.chars().take(120).collect();
        info_span!("slipway.query", sql = %preview)
    }

    pub fn begin_transaction_span() -> Span {
        info_span!("slipway.transaction.begin")
    }

    pub fn commit_transaction_span() -> Span {
        info_span!("slipway.transaction.commit")
    }

    pub fn rollback_transaction_span() -> Span {
        info_span!("slipway.transaction.rollback")
    }

    pub fn session_span(lock_id: i64) -> Span {
        info_span!("slipway.session", lock_id)
    }

    pub fn batch_span(direction: &'static str) -> Span {
        info_span!("slipway.batch", direction)
    }

    pub fn migration_span(name: &str, direction: &'static str) -> Span {
        info_span!("slipway.migration", name = %name, direction)
    }
}
