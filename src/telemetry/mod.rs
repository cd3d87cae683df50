//! Logging and distributed tracing for the registry.
//!
//! Log lines always go to stdout through `tracing-subscriber`, filtered by
//! `RUST_LOG` (default `info`). When `otel.enabled` is set, spans are also
//! exported over OTLP/gRPC so a render request can be followed from the HTTP
//! handler through the service into the store.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `OTEL__ENABLED` | Export spans over OTLP | `false` |
//! | `OTEL__ENDPOINT` | OTLP gRPC endpoint | `http://localhost:4317` |
//! | `OTEL__SERVICE_NAME` | `service.name` resource attribute | `template-registry` |
//! | `OTEL__SAMPLING_RATIO` | Root span sampling ratio (0.0-1.0) | `1.0` |

use opentelemetry::trace::TracerProvider;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider as SdkTracerProvider},
    Resource,
};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::OtelConfig;

/// Filter used when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "info";

/// Instrumentation scope for spans created by this crate
const TRACER_NAME: &str = "template-registry";

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Telemetry-specific error type
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to build OTLP exporter: {0}")]
    ExporterBuild(String),
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Keeps the tracer provider alive; buffered spans are flushed when it drops.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Whether spans are being exported
    pub fn exporting(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self.provider.is_some() {
            tracing::info!("Flushing OpenTelemetry spans");
        }
    }
}

/// Install the global subscriber: env filter, fmt output and, when enabled,
/// the OTLP span layer.
///
/// Keep the returned guard alive for the lifetime of the process.
pub fn init_telemetry(config: &OtelConfig) -> TelemetryResult<TelemetryGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let provider = if config.enabled {
        Some(build_provider(config)?)
    } else {
        None
    };
    let otel_layer = provider
        .as_ref()
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer(TRACER_NAME)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    if config.enabled {
        tracing::info!(
            endpoint = %config.endpoint,
            service_name = %config.service_name,
            sampling_ratio = %config.sampling_ratio,
            "OpenTelemetry span export enabled"
        );
    } else {
        tracing::info!("Tracing initialized (OpenTelemetry disabled)");
    }

    Ok(TelemetryGuard { provider })
}

/// Root spans are sampled by ratio; child spans follow their parent.
fn sampler_for(ratio: f64) -> Sampler {
    let root = if ratio >= 1.0 {
        Sampler::AlwaysOn
    } else if ratio <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(ratio)
    };
    Sampler::ParentBased(Box::new(root))
}

fn build_provider(config: &OtelConfig) -> TelemetryResult<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.endpoint)
        .build()
        .map_err(|e| TelemetryError::ExporterBuild(e.to_string()))?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_sampler(sampler_for(config.sampling_ratio))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(Resource::new(vec![
            KeyValue::new(SERVICE_NAME, config.service_name.clone()),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ]))
        .build())
}

/// Span attributes recorded by the render endpoint.
pub mod attributes {
    use opentelemetry::KeyValue;

    pub fn template_code(code: &str) -> KeyValue {
        KeyValue::new("template.code", code.to_string())
    }

    pub fn version_number(number: i32) -> KeyValue {
        KeyValue::new("template.version_number", number as i64)
    }

    /// `success` or `error`
    pub fn render_outcome(outcome: &str) -> KeyValue {
        KeyValue::new("template.render_outcome", outcome.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OtelConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.endpoint, "http://localhost:4317");
        assert_eq!(config.service_name, "template-registry");
        assert_eq!(config.sampling_ratio, 1.0);
    }

    #[test]
    fn test_sampler_is_parent_based() {
        assert!(matches!(sampler_for(1.0), Sampler::ParentBased(_)));
        assert!(matches!(sampler_for(0.25), Sampler::ParentBased(_)));
        assert!(matches!(sampler_for(-1.0), Sampler::ParentBased(_)));
    }

    #[test]
    fn test_attributes() {
        let code = attributes::template_code("welcome_email");
        assert_eq!(code.key.as_str(), "template.code");

        let version = attributes::version_number(3);
        assert_eq!(version.key.as_str(), "template.version_number");

        let outcome = attributes::render_outcome("success");
        assert_eq!(outcome.key.as_str(), "template.render_outcome");
    }

    #[test]
    fn test_disabled_guard_does_not_export() {
        let guard = TelemetryGuard { provider: None };
        assert!(!guard.exporting());
    }
}
