use axum::{
    extract::Query,
    http::{HeaderValue, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::aggregator::{DateRange, VolumeAggregator};
use crate::explorer::TransferSource;
use crate::models::{CounterpartySummary, VolumeReport};
use crate::wallet::WalletClassifier;
use alloy::primitives::Address;

#[derive(Deserialize)]
pub struct VolumeQuery {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

#[derive(Deserialize)]
pub struct WalletQuery {
    pub address: String,
}

/// Everything the handlers need, shared across requests
pub struct AppState {
    pub source: Arc<dyn TransferSource>,
    pub aggregator: VolumeAggregator,
    pub classifier: WalletClassifier,
}

type ApiError = (StatusCode, Json<Value>);

fn bad_request(msg: impl ToString) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": msg.to_string() })))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(allowed))
    }
}

pub fn router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(|| async { Json(json!({ "status": "backend up" })) }))
        .route("/load-volume", get({
            let state = Arc::clone(&state);
            move |q: Query<VolumeQuery>| {
                let state = Arc::clone(&state);
                async move { load_volume(&state, q.0).await.map(Json) }
            }
        }))
        .route("/wallet-analysis", get({
            let state = Arc::clone(&state);
            move |q: Query<WalletQuery>| {
                let state = Arc::clone(&state);
                async move { wallet_analysis(&state, &q.address).await.map(Json) }
            }
        }))
        .layer(cors_layer(cors_origins))
}

pub async fn serve(state: Arc<AppState>, port: u16, cors_origins: &[String]) -> eyre::Result<()> {
    let app = router(state, cors_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

async fn load_volume(state: &AppState, q: VolumeQuery) -> Result<VolumeReport, ApiError> {
    let range = DateRange::parse(q.from_date.as_deref(), q.to_date.as_deref()).map_err(bad_request)?;
    info!(
        "Load volume for {} ({:?} → {:?})",
        state.aggregator.target_wallet(),
        range.from,
        range.to
    );
    Ok(state.aggregator.aggregate_wallet(state.source.as_ref(), range).await)
}

async fn wallet_analysis(state: &AppState, address: &str) -> Result<Vec<CounterpartySummary>, ApiError> {
    let wallet = address
        .trim()
        .parse::<Address>()
        .map_err(|_| bad_request(format!("invalid address {:?}", address)))?;
    Ok(state.classifier.analyze(wallet).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{PricingSettings, TwapPriceResolver};
    use crate::retry::RetryPolicy;
    use crate::testutil::{addr, native_row, token_row, MockChain, StaticSource};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::time::Duration;

    fn state() -> AppState {
        let wallet = addr(0x10);
        let day = Utc.with_ymd_and_hms(2024, 5, 14, 9, 0, 0).unwrap().timestamp();
        let source: Arc<dyn TransferSource> = Arc::new(StaticSource {
            token_rows: vec![token_row(wallet, addr(0xaa), "2000000", 6, 1, day)],
            native_rows: vec![native_row(wallet, addr(0x20), "1", 2, day)],
        });
        let chain = Arc::new(MockChain::default());
        let settings = PricingSettings {
            simulate: true,
            quote_token: addr(0x01),
            native_token: addr(0x42),
            factory: addr(0xf0),
            fee_tiers: vec![500],
            twap_window_secs: 3600,
            retry: RetryPolicy::new(1, Duration::from_millis(1)),
            simulated_prices: HashMap::from([(addr(0xaa), Decimal::new(5, 1))]),
        };
        let resolver = TwapPriceResolver::new(chain.clone(), settings.clone());
        AppState {
            source: source.clone(),
            aggregator: VolumeAggregator::new(resolver, wallet, 2),
            classifier: WalletClassifier::new(source, chain, settings.retry, 2),
        }
    }

    #[tokio::test]
    async fn load_volume_reports_usd_numbers() {
        let report = load_volume(
            &state(),
            VolumeQuery {
                from_date: Some("2024-05-01".into()),
                to_date: None,
            },
        )
        .await
        .unwrap();

        let body = serde_json::to_value(&report).unwrap();
        assert_eq!(body["daily"][0]["key"], "2024-05-14");
        assert_eq!(body["daily"][0]["usd"], 1.0);
        assert_eq!(body["monthly"][0]["key"], "2024-05");
        assert_eq!(body["stats"]["contributed"], 1);
    }

    #[tokio::test]
    async fn bad_dates_are_rejected() {
        let err = load_volume(
            &state(),
            VolumeQuery {
                from_date: Some("yesterday".into()),
                to_date: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wallet_analysis_validates_address() {
        let err = wallet_analysis(&state(), "0x123").await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let top = wallet_analysis(&state(), &addr(0x10).to_string()).await.unwrap();
        let body = serde_json::to_value(&top).unwrap();
        assert_eq!(body[0]["type"], "wallet");
        assert_eq!(body[0]["tx_count"], 1);
    }
}
