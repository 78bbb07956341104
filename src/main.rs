use anyhow::Context;
use chess_predictor::{
    config::{self, ServiceConfig},
    model::ModelBundle,
    server::{self, AppState},
    Predictor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(config::log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let cfg = ServiceConfig::from_env()?;

    let predictor = match ModelBundle::load(&cfg.scaler_path, &cfg.model_path) {
        Ok(models) => {
            tracing::info!(
                "outcome model and scaler loaded (model={}, scaler={})",
                cfg.model_path.display(),
                cfg.scaler_path.display()
            );
            Predictor::new(models)
        }
        Err(e) if cfg.require_model => {
            return Err(e).context("REQUIRE_MODEL is set and the outcome model could not be loaded");
        }
        Err(e) => {
            tracing::warn!("running without outcome model: {:#}", e);
            Predictor::unavailable()
        }
    };
    let predictor = predictor.with_feature_logging(cfg.log_predictions);

    let app = server::router(AppState::new(predictor));

    tracing::info!("listening on {}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
