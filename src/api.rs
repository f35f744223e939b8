use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use alloy::primitives::Address;
use serde_json::json;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::classifier::Classifier;
use crate::config::Config;
use crate::error::ExplorerError;
use crate::explorer::ExplorerApi;
use crate::price::TokenPriceSource;
use crate::report::{NativeView, SummaryView, TokenCounterpartyView, TokenView, WalletAnalyzer};

/// Request-level failures, rendered as `{ "error": ... }`
#[derive(Debug)]
pub enum ApiError {
    InvalidAddress(String),
    Explorer(ExplorerError),
}

impl From<ExplorerError> for ApiError {
    fn from(e: ExplorerError) -> Self {
        ApiError::Explorer(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidAddress(addr) => {
                (StatusCode::BAD_REQUEST, format!("invalid address: {addr}"))
            }
            ApiError::Explorer(e) => {
                let status = match e {
                    ExplorerError::MissingCredential(_) => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::BAD_GATEWAY,
                };
                error!("Request failed: {}", e);
                (status, e.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Validate a 20-byte hex address and return its lower-cased form
pub fn normalize_address(raw: &str) -> Result<String, ApiError> {
    Address::from_str(raw.trim())
        .map(|addr| addr.to_string().to_lowercase())
        .map_err(|_| ApiError::InvalidAddress(raw.to_string()))
}

pub fn router<E, P, C>(analyzer: Arc<WalletAnalyzer<E, P, C>>) -> Router
where
    E: ExplorerApi + 'static,
    P: TokenPriceSource + 'static,
    C: Classifier + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "Wallet Explorer API running" }))
        .route("/wallet/:address/eth", get(native::<E, P, C>))
        .route("/wallet/:address/tokens", get(tokens::<E, P, C>))
        .route(
            "/wallet/:address/tokens/:symbol/counterparties",
            get(token_counterparties::<E, P, C>),
        )
        .route("/wallet/:address/summary", get(summary::<E, P, C>))
        .layer(cors)
        .with_state(analyzer)
}

pub async fn serve<E, P, C>(cfg: &Config, analyzer: Arc<WalletAnalyzer<E, P, C>>) -> eyre::Result<()>
where
    E: ExplorerApi + 'static,
    P: TokenPriceSource + 'static,
    C: Classifier + 'static,
{
    let app = router(analyzer);

    let addr = SocketAddr::from(([127, 0, 0, 1], cfg.port));
    info!("API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

// ---------- handlers ----------

async fn native<E, P, C>(
    State(analyzer): State<Arc<WalletAnalyzer<E, P, C>>>,
    Path(address): Path<String>,
) -> Result<Json<NativeView>, ApiError>
where
    E: ExplorerApi,
    P: TokenPriceSource,
    C: Classifier,
{
    let address = normalize_address(&address)?;
    Ok(Json(analyzer.native_view(&address).await?))
}

async fn tokens<E, P, C>(
    State(analyzer): State<Arc<WalletAnalyzer<E, P, C>>>,
    Path(address): Path<String>,
) -> Result<Json<TokenView>, ApiError>
where
    E: ExplorerApi,
    P: TokenPriceSource,
    C: Classifier,
{
    let address = normalize_address(&address)?;
    Ok(Json(analyzer.token_view(&address).await?))
}

async fn token_counterparties<E, P, C>(
    State(analyzer): State<Arc<WalletAnalyzer<E, P, C>>>,
    Path((address, symbol)): Path<(String, String)>,
) -> Result<Json<TokenCounterpartyView>, ApiError>
where
    E: ExplorerApi,
    P: TokenPriceSource,
    C: Classifier,
{
    let address = normalize_address(&address)?;
    Ok(Json(analyzer.token_counterparties(&address, &symbol).await?))
}

async fn summary<E, P, C>(
    State(analyzer): State<Arc<WalletAnalyzer<E, P, C>>>,
    Path(address): Path<String>,
) -> Result<Json<SummaryView>, ApiError>
where
    E: ExplorerApi,
    P: TokenPriceSource,
    C: Classifier,
{
    let address = normalize_address(&address)?;
    Ok(Json(analyzer.summary(&address).await?))
}
