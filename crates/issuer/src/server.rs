use axum::{
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use coupon_sdk::{Address, CouponClass, CouponResponse, IssuanceSet};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::batch::read_issuance;
use crate::config::IssuerConfig;
use crate::error::{IssuerError, Result};

/// One class's issuance as loaded from disk
pub struct ServedSet {
    pub set: IssuanceSet,
    pub pin: String,
    bytes: Bytes,
}

pub struct IssuerState {
    pub issuer: Address,
    pub sets: HashMap<CouponClass, ServedSet>,
}

impl IssuerState {
    pub fn new(issuer: Address) -> Self {
        Self {
            issuer,
            sets: HashMap::new(),
        }
    }

    /// Load every class found in `dir`. A file that fails its pin or carries
    /// coupons from another key is refused outright.
    pub fn load(issuer: Address, dir: &std::path::Path) -> Result<Self> {
        let mut state = Self::new(issuer);

        for class in CouponClass::ALL {
            let Some((set, bytes, pin)) = read_issuance(dir, class)? else {
                continue;
            };

            let foreign = set.unverifiable(class, &issuer);
            if !foreign.is_empty() {
                return Err(IssuerError::Integrity(format!(
                    "{} {} coupons do not verify against issuer {}",
                    foreign.len(),
                    class,
                    issuer.to_checksum()
                )));
            }

            info!("Serving {} {} coupons (sha256 {})", set.len(), class, pin);
            state.serve(class, set, bytes, pin);
        }

        if state.sets.is_empty() {
            warn!("No coupon files found in {}", dir.display());
        }

        Ok(state)
    }

    fn serve(&mut self, class: CouponClass, set: IssuanceSet, bytes: Vec<u8>, pin: String) {
        self.sets.insert(
            class,
            ServedSet {
                set,
                pin,
                bytes: Bytes::from(bytes),
            },
        );
    }

    fn served(&self, class: CouponClass) -> Result<&ServedSet> {
        self.sets
            .get(&class)
            .ok_or_else(|| IssuerError::NotFound(format!("no {} coupons issued", class)))
    }
}

/// Routes without rate limiting; `run` adds the outer layers
pub fn routes(state: Arc<IssuerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/info", get(get_info))
        .route("/coupons/:class", get(get_coupon_file))
        .route("/coupons/:class/:address", get(get_coupon))
        .with_state(state)
}

pub async fn run(state: Arc<IssuerState>, config: &IssuerConfig) -> anyhow::Result<()> {
    // 10 requests per second per IP, proxied requests included
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(10)
        .burst_size(20)
        .key_extractor(tower_governor::key_extractor::SmartIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration"))?;

    let app = routes(state)
        .layer(GovernorLayer {
            config: Arc::new(governor_conf),
        })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Issuer listening on {} (rate limited: 10 req/s per IP)", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ClassInfo {
    class: CouponClass,
    entries: usize,
    sha256: String,
}

#[derive(Serialize)]
struct InfoResponse {
    /// Checksummed issuer address, the key the ledger must trust
    issuer: String,
    classes: Vec<ClassInfo>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn get_info(State(state): State<Arc<IssuerState>>) -> Json<InfoResponse> {
    let classes = CouponClass::ALL
        .iter()
        .filter_map(|class| {
            state.sets.get(class).map(|served| ClassInfo {
                class: *class,
                entries: served.set.len(),
                sha256: served.pin.clone(),
            })
        })
        .collect();

    Json(InfoResponse {
        issuer: state.issuer.to_checksum(),
        classes,
    })
}

fn parse_class(raw: &str) -> Result<CouponClass> {
    raw.parse::<CouponClass>()
        .map_err(|_| IssuerError::MalformedInput(format!("unknown coupon class {}", raw)))
}

/// The exact bytes written by `generate`, so clients can check the pin
async fn get_coupon_file(
    State(state): State<Arc<IssuerState>>,
    Path(class): Path<String>,
) -> Result<impl IntoResponse> {
    let class = parse_class(&class)?;
    let served = state.served(class)?;
    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        served.bytes.clone(),
    ))
}

async fn get_coupon(
    State(state): State<Arc<IssuerState>>,
    Path((class, address)): Path<(String, String)>,
) -> Result<Json<CouponResponse>> {
    let class = parse_class(&class)?;
    let account: Address = address
        .parse()
        .map_err(|_| IssuerError::MalformedInput(format!("invalid address {}", address)))?;

    let entry = state
        .served(class)?
        .set
        .lookup(&account)
        .copied()
        .ok_or_else(|| IssuerError::NotFound(format!("no {} coupon for {}", class, account)))?;

    Ok(Json(CouponResponse {
        address: account,
        class,
        entry,
    }))
}
