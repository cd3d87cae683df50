//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    RENDERS_TOTAL, RENDER_DURATION_SECONDS, STORE_ERRORS_TOTAL, TEMPLATES_ACTIVE,
    TEMPLATES_CREATED_TOTAL, TEMPLATES_STORED, VERSIONS_ADDED_TOTAL, VERSIONS_STORED,
};
use crate::template::StoreStats;

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording template lifecycle metrics
pub struct TemplateMetrics;

impl TemplateMetrics {
    /// Record a template created with its first version
    pub fn record_created() {
        TEMPLATES_CREATED_TOTAL.inc();
    }

    /// Record a version appended to an existing template
    pub fn record_version_added() {
        VERSIONS_ADDED_TOTAL.inc();
    }

    /// Refresh inventory gauges from store statistics
    pub fn set_inventory(stats: &StoreStats) {
        TEMPLATES_STORED.set(stats.templates as i64);
        TEMPLATES_ACTIVE.set(stats.active_templates as i64);
        VERSIONS_STORED.set(stats.versions as i64);
    }
}

/// Helper struct for recording render metrics
pub struct RenderMetrics;

impl RenderMetrics {
    /// Record a render request outcome and its duration
    pub fn record(outcome: &str, elapsed: Duration) {
        RENDERS_TOTAL.with_label_values(&[outcome]).inc();
        RENDER_DURATION_SECONDS.observe(elapsed.as_secs_f64());
    }
}

/// Helper struct for recording store metrics
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record a store failure
    pub fn record_error(operation: &str) {
        STORE_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_metrics() {
        let before = RENDERS_TOTAL.with_label_values(&["success"]).get();
        RenderMetrics::record("success", Duration::from_micros(250));
        assert!(RENDERS_TOTAL.with_label_values(&["success"]).get() > before);
    }

    #[test]
    fn test_store_metrics() {
        let before = STORE_ERRORS_TOTAL.with_label_values(&["add_version"]).get();
        StoreMetrics::record_error("add_version");
        assert!(STORE_ERRORS_TOTAL.with_label_values(&["add_version"]).get() > before);
    }

    #[test]
    fn test_inventory_gauges() {
        TemplateMetrics::set_inventory(&StoreStats {
            backend_type: "memory".to_string(),
            templates: 3,
            active_templates: 2,
            versions: 7,
        });
        assert_eq!(TEMPLATES_STORED.get(), 3);
        assert_eq!(TEMPLATES_ACTIVE.get(), 2);
        assert_eq!(VERSIONS_STORED.get(), 7);
    }

    #[test]
    fn test_encode_metrics() {
        TemplateMetrics::record_created();
        let output = encode_metrics().unwrap();
        assert!(output.contains("template_registry_templates_created_total"));
    }
}
