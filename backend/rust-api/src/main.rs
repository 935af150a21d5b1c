use anyhow::Context;
use opentelemetry_sdk::trace::SdkTracerProvider;
use quiz_api::{config::Config, create_router, services::AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // OTLP export only when an endpoint is configured
    let tracer_provider = init_telemetry()?;
    init_tracing(tracer_provider.as_ref());

    tracing::info!("Starting quiz API");

    let config = Config::load().context("Failed to load configuration")?;
    tracing::info!(
        "Configuration loaded for environment: {:?}",
        std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string())
    );

    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .context("Failed to create MongoDB client")?;
    tracing::info!(database = %config.mongo_database, "MongoDB client ready");

    let bind_addr = config.bind_addr.clone();
    let app_state = Arc::new(AppState::new(config, mongo_client));

    if let Err(e) = app_state.ensure_indexes().await {
        tracing::warn!("Could not ensure MongoDB indexes: {:#}", e);
    }

    let app = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(provider) = tracer_provider {
        tracing::info!("Shutting down OpenTelemetry");
        if let Err(e) = provider.shutdown() {
            eprintln!("OpenTelemetry shutdown failed: {}", e);
        }
    }

    Ok(())
}

/// Plain text logs by default, JSON lines with `LOG_FORMAT=json`
fn init_tracing(tracer_provider: Option<&SdkTracerProvider>) {
    use opentelemetry::trace::TracerProvider as _;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quiz_api=debug,tower_http=debug".into());

    let fmt_layer = match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => tracing_subscriber::fmt::layer().json().boxed(),
        _ => tracing_subscriber::fmt::layer().boxed(),
    };

    let otel_layer = tracer_provider
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer("quiz-api")));

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .with(otel_layer)
        .init();
}

fn init_telemetry() -> anyhow::Result<Option<SdkTracerProvider>> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::Resource;

    let Ok(otlp_endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return Ok(None);
    };

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(otlp_endpoint)
        .build()
        .context("Failed to create OTLP exporter")?;

    let resource = Resource::builder_empty()
        .with_service_name("quiz-api")
        .with_attributes(vec![KeyValue::new(
            "service.version",
            env!("CARGO_PKG_VERSION"),
        )])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    opentelemetry::global::set_tracer_provider(provider.clone());

    Ok(Some(provider))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
