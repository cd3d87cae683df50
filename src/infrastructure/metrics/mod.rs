//! Prometheus metrics for the template registry.
//!
//! This module provides metrics for monitoring the registry:
//! - Template lifecycle metrics (created, versions added)
//! - Render metrics (outcomes, duration)
//! - Store metrics (backend errors, inventory gauges)

mod helpers;

pub use helpers::{encode_metrics, RenderMetrics, StoreMetrics, TemplateMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "template_registry";

lazy_static! {
    // ============================================================================
    // Template Metrics
    // ============================================================================

    /// Total templates created
    pub static ref TEMPLATES_CREATED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_templates_created_total", METRIC_PREFIX),
        "Total number of templates created"
    ).unwrap();

    /// Total versions appended to existing templates
    pub static ref VERSIONS_ADDED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_versions_added_total", METRIC_PREFIX),
        "Total number of template versions added after creation"
    ).unwrap();

    /// Templates currently stored (refreshed on scrape)
    pub static ref TEMPLATES_STORED: IntGauge = register_int_gauge!(
        format!("{}_templates_stored", METRIC_PREFIX),
        "Number of templates currently stored"
    ).unwrap();

    /// Active templates currently stored (refreshed on scrape)
    pub static ref TEMPLATES_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_templates_active", METRIC_PREFIX),
        "Number of active templates"
    ).unwrap();

    /// Versions currently stored (refreshed on scrape)
    pub static ref VERSIONS_STORED: IntGauge = register_int_gauge!(
        format!("{}_versions_stored", METRIC_PREFIX),
        "Number of template versions currently stored"
    ).unwrap();

    // ============================================================================
    // Render Metrics
    // ============================================================================

    /// Render requests by outcome
    pub static ref RENDERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_renders_total", METRIC_PREFIX),
        "Total render requests by outcome",
        &["outcome"]
    ).unwrap();

    /// Render latency in seconds
    pub static ref RENDER_DURATION_SECONDS: Histogram = register_histogram!(
        format!("{}_render_duration_seconds", METRIC_PREFIX),
        "Render request latency in seconds",
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]
    ).unwrap();

    // ============================================================================
    // Store Metrics
    // ============================================================================

    /// Store failures by operation
    pub static ref STORE_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_store_errors_total", METRIC_PREFIX),
        "Total template store failures by operation",
        &["operation"]
    ).unwrap();
}
