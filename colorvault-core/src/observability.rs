/*!
Observability infrastructure for ColorVault.

This module provides:
- Structured logging setup (JSON or human-readable)
- Prometheus metrics for extraction and store faults (`metrics` feature)
*/

#[cfg(feature = "metrics")]
use prometheus::{Encoder, Histogram, IntCounter, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
#[cfg(feature = "metrics")]
use std::time::Instant;
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{Result, VaultError};

/// Default log directive when `RUST_LOG` is not set
pub const DEFAULT_LOG_DIRECTIVE: &str = "colorvault=info";

/// Global metrics instance
#[cfg(feature = "metrics")]
static METRICS: OnceLock<VaultMetrics> = OnceLock::new();

/// Metrics collection for ColorVault operations
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct VaultMetrics {
    pub extractions_total: IntCounter,
    pub extraction_errors_total: IntCounter,
    pub images_discovered_total: IntCounter,
    pub scratch_dirs_removed_total: IntCounter,
    pub store_faults_total: IntCounter,
    pub extraction_latency_seconds: Histogram,

    registry: Registry,
}

#[cfg(feature = "metrics")]
fn register_counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter> {
    let counter = IntCounter::new(name, help)
        .map_err(|e| VaultError::storage(format!("Failed to create {name} metric: {e}")))?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(|e| VaultError::storage(format!("Failed to register {name}: {e}")))?;
    Ok(counter)
}

#[cfg(feature = "metrics")]
impl VaultMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let extractions_total = register_counter(
            &registry,
            "colorvault_extractions_total",
            "Total archive extractions attempted",
        )?;
        let extraction_errors_total = register_counter(
            &registry,
            "colorvault_extraction_errors_total",
            "Total archive extractions that failed",
        )?;
        let images_discovered_total = register_counter(
            &registry,
            "colorvault_images_discovered_total",
            "Total image files found inside extracted archives",
        )?;
        let scratch_dirs_removed_total = register_counter(
            &registry,
            "colorvault_scratch_dirs_removed_total",
            "Total scratch directories deleted by cleanup",
        )?;
        let store_faults_total = register_counter(
            &registry,
            "colorvault_store_faults_total",
            "Total history store faults absorbed by fail-soft defaults",
        )?;

        let extraction_latency_seconds = Histogram::with_opts(prometheus::HistogramOpts::new(
            "colorvault_extraction_latency_seconds",
            "Duration of archive extractions in seconds",
        ))
        .map_err(|e| {
            VaultError::storage(format!(
                "Failed to create extraction_latency_seconds metric: {e}"
            ))
        })?;
        registry
            .register(Box::new(extraction_latency_seconds.clone()))
            .map_err(|e| {
                VaultError::storage(format!(
                    "Failed to register extraction_latency_seconds: {e}"
                ))
            })?;

        Ok(Self {
            extractions_total,
            extraction_errors_total,
            images_discovered_total,
            scratch_dirs_removed_total,
            store_faults_total,
            extraction_latency_seconds,
            registry,
        })
    }

    /// Get or initialize global metrics instance
    pub fn global() -> &'static VaultMetrics {
        METRICS.get_or_init(|| Self::new().expect("Failed to initialize ColorVault metrics"))
    }

    pub fn record_scratch_removed(&self, count: usize) {
        self.scratch_dirs_removed_total.inc_by(count as u64);
    }

    pub fn record_store_fault(&self) {
        self.store_faults_total.inc();
    }

    /// Gather metrics in Prometheus format
    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| VaultError::storage(format!("Failed to encode metrics: {e}")))?;

        String::from_utf8(buffer)
            .map_err(|e| VaultError::storage(format!("Failed to convert metrics to string: {e}")))
    }
}

/// Times one extraction and records its outcome
#[cfg(feature = "metrics")]
pub struct ExtractionTimer {
    start: Instant,
}

#[cfg(feature = "metrics")]
impl ExtractionTimer {
    pub fn start() -> Self {
        VaultMetrics::global().extractions_total.inc();
        Self {
            start: Instant::now(),
        }
    }

    /// Record a successful extraction that yielded `images` images
    pub fn finish(self, images: usize) {
        let metrics = VaultMetrics::global();
        metrics
            .extraction_latency_seconds
            .observe(self.start.elapsed().as_secs_f64());
        metrics.images_discovered_total.inc_by(images as u64);
    }

    pub fn finish_with_error(self) {
        let metrics = VaultMetrics::global();
        metrics
            .extraction_latency_seconds
            .observe(self.start.elapsed().as_secs_f64());
        metrics.extraction_errors_total.inc();
    }
}

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` is honoured when set; otherwise [`DEFAULT_LOG_DIRECTIVE`]
/// applies. Events are written to stderr.
///
/// # Arguments
/// * `json` - Emit one JSON object per event instead of human-readable lines
///
/// # Returns
/// An error if a global subscriber is already installed
pub fn init_observability(json: bool) -> Result<()> {
    init_observability_with_directive(DEFAULT_LOG_DIRECTIVE, json)
}

/// Initialize the global tracing subscriber with a custom fallback filter
///
/// `default_directive` is used only when `RUST_LOG` is unset or invalid,
/// e.g. `"colorvault=debug"` for verbose command-line runs.
pub fn init_observability_with_directive(default_directive: &str, json: bool) -> Result<()> {
    #[cfg(feature = "metrics")]
    VaultMetrics::global();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let result = if json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(false)
            .with_writer(std::io::stderr);
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer))
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer))
    };

    result.map_err(|e| {
        VaultError::validation(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::debug!("ColorVault observability initialized");
    Ok(())
}

/// Initialize observability with JSON logs
pub fn init_default_observability() -> Result<()> {
    init_observability(true)
}
