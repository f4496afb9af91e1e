use medisign::api::{self, app_state::AppState};
use medisign::classifier::ClientSideClassifier;
use medisign::config::loader::ConfigLoader;
use medisign::generation::{GenerationOptions, GeneratorInit, connect_text_generator};
use medisign::observability::{
    AppMetrics, HealthCheckResult, ObservabilityState, create_observability_router, init_tracing,
};
use medisign::services::composer::RandomSelector;
use medisign::services::session::SessionRegistry;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load()?;
    init_tracing(&config.app_name, &config.logging);
    ConfigLoader::validate(&config)?;
    info!(
        "Configuration loaded successfully (environment: {})",
        config.environment
    );

    let started = Instant::now();
    let init = connect_text_generator(&config.generator).await;
    let latency_ms = started.elapsed().as_millis() as u64;
    let generator_ready = init.is_ready();
    let generator_status = init.describe();
    if !matches!(init, GeneratorInit::Ready(_)) {
        warn!(
            "Sentences will use the template fallback only: {}",
            generator_status
        );
    }
    let generator = init.into_generator();

    let metrics = Arc::new(AppMetrics::default());
    let observability_state = Arc::new(ObservabilityState::with_metrics(
        env!("CARGO_PKG_VERSION").to_string(),
        metrics.clone(),
    ));
    observability_state
        .add_health_check(HealthCheckResult {
            name: "text_generator".to_string(),
            healthy: generator_ready,
            message: generator_status,
            latency_ms,
        })
        .await;

    let registry = SessionRegistry::new(
        config.pipeline.clone(),
        Arc::new(ClientSideClassifier),
        generator.clone(),
        Arc::new(RandomSelector),
        metrics.clone(),
    )
    .with_generation_options(GenerationOptions {
        max_length: config.generator.max_length,
        deterministic: true,
    });
    info!(
        "Session registry initialized (generator ready: {})",
        registry.has_generator()
    );

    let app_state = AppState::new(registry, generator, metrics);
    let api_router = api::create_router(app_state, &config.cors);
    let router = create_observability_router(observability_state).merge(api_router);
    info!("API router created with observability endpoints");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
