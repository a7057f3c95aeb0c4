use lazy_static::lazy_static;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::time::Instant;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Upload endpoint metrics
    pub static ref UPLOADS_ACCEPTED: IntCounter = IntCounter::new(
        "uploads_accepted_total",
        "Total number of uploads accepted and written to the store"
    ).unwrap();

    pub static ref UPLOADS_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("uploads_rejected_total", "Total number of uploads rejected before any store interaction"),
        &["reason"]
    ).unwrap();

    // Worker metrics
    pub static ref WORKER_OUTCOMES: IntCounterVec = IntCounterVec::new(
        Opts::new("worker_outcomes_total", "Pipeline worker invocation outcomes by class"),
        &["outcome"]
    ).unwrap();

    pub static ref ARTICLES_WRITTEN: IntCounter = IntCounter::new(
        "articles_written_total",
        "Total number of article objects written to the store"
    ).unwrap();

    pub static ref WORKER_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "worker_duration_seconds",
            "Pipeline worker invocation duration in seconds"
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0])
    ).unwrap();

    // Poll loop metrics
    pub static ref POLL_RESULTS: IntCounterVec = IntCounterVec::new(
        Opts::new("poll_results_total", "Poll loop terminal results by kind"),
        &["result"]
    ).unwrap();

    pub static ref WAIT_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "wait_duration_seconds",
            "Time spent waiting for an article object in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0])
    ).unwrap();
}

/// Initialize metrics registry
pub fn init_metrics() {
    REGISTRY.register(Box::new(UPLOADS_ACCEPTED.clone())).unwrap();
    REGISTRY.register(Box::new(UPLOADS_REJECTED.clone())).unwrap();

    REGISTRY.register(Box::new(WORKER_OUTCOMES.clone())).unwrap();
    REGISTRY.register(Box::new(ARTICLES_WRITTEN.clone())).unwrap();
    REGISTRY.register(Box::new(WORKER_DURATION.clone())).unwrap();

    REGISTRY.register(Box::new(POLL_RESULTS.clone())).unwrap();
    REGISTRY.register(Box::new(WAIT_DURATION.clone())).unwrap();

    tracing::info!(
        "Metrics registry initialized with {} collectors",
        REGISTRY.gather().len()
    );
}

/// Helper struct for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration_seconds(&self, histogram: &Histogram) {
        let duration = self.start.elapsed();
        histogram.observe(duration.as_secs_f64());
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Export metrics in Prometheus format
pub fn export_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
