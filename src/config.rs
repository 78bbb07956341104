use anyhow::{Context, Result};
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset or unparseable.
pub const DEFAULT_LOG_FILTER: &str = "chess_predictor=info";

/// Build the log filter from a `RUST_LOG` value, which wins outright when set.
pub fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Service settings, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    pub bind_addr: SocketAddr,
    /// Refuse to start without a working model instead of serving 500s.
    pub require_model: bool,
    /// Log a feature summary for every prediction.
    pub log_predictions: bool,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let model_dir = PathBuf::from(get("MODEL_DIR").unwrap_or_else(|| "models".to_string()));
        let model_path = get("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| model_dir.join("best_chess_model.pt"));
        let scaler_path = get("SCALER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| model_dir.join("scaler.json"));

        let host: IpAddr = match get("BIND_ADDR") {
            Some(s) => s
                .parse()
                .with_context(|| format!("BIND_ADDR is not an IP address: {s:?}"))?,
            None => IpAddr::from([0, 0, 0, 0]),
        };
        let port: u16 = match get("PORT") {
            Some(s) => s
                .parse()
                .with_context(|| format!("PORT is not a valid port: {s:?}"))?,
            None => 5000,
        };

        Ok(Self {
            model_path,
            scaler_path,
            bind_addr: SocketAddr::new(host, port),
            require_model: flag(get("REQUIRE_MODEL")),
            log_predictions: flag(get("LOG_PRED")),
        })
    }
}

fn flag(v: Option<String>) -> bool {
    matches!(
        v.as_deref().map(str::trim),
        Some("1") | Some("true") | Some("TRUE") | Some("yes")
    )
}
