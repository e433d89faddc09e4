use std::net::SocketAddr;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{MatchedPath, Request};
use axum::middleware::{Next, from_fn};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::{HeaderValue, StatusCode};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::api::handler::*;
use crate::db::prelude::*;
use crate::ingest::queue::IngestJob;
use crate::trending::compute::{TrendingComputer, TrendingErr};
use crate::util::env::Var;
use crate::var;

pub type JsonResult<T> = core::result::Result<Json<T>, RouteError>;

/// Shared pipeline handle for the route handlers. The computer here is the
/// same instance the scheduler drives.
pub struct AppState {
    pub db_pool: &'static PgPool,
    pub tx_ingest: UnboundedSender<IngestJob>,
    pub computer: Arc<TrendingComputer<RedisCounterStore, PgTrendingRepository>>,
}

#[instrument(skip(tx, tx_ingest, computer))]
pub async fn router(
    tx: UnboundedSender<SocketAddr>,
    tx_ingest: UnboundedSender<IngestJob>,
    computer: Arc<TrendingComputer<RedisCounterStore, PgTrendingRepository>>,
) {
    let state = Arc::new(AppState {
        db_pool: db_pool().await.unwrap(),
        tx_ingest,
        computer,
    });

    let app = Router::new()
        .route("/", get(|| async { Response::new(Body::empty()) }))
        //
        // trending pipeline surface
        .route("/trending", get(latest_trending))
        .route("/trending/history", get(trending_history))
        .route("/trending/run", post(run_trending_cycle))
        //
        // ingestion dispatch
        .route("/ingest", post(ingest_content_body))
        .layer(cors_layer().await)
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method();
                let uri = req.uri();

                let matched_path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|matched| matched.as_str());

                tracing::debug_span!("api_request", ?method, ?uri, ?matched_path)
            }),
        )
        .layer(from_fn(log_route_errors))
        .with_state(state);

    let port = var!(Var::ServerApiPort)
        .await
        .unwrap()
        .parse::<u16>()
        .unwrap();

    let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), port);
    let listener = tokio::net::TcpListener::bind(socket_addr).await.unwrap();

    tx.send(socket_addr).unwrap();
    axum::serve(listener, app).await.unwrap()
}

async fn cors_layer() -> CorsLayer {
    let origins = var!(Var::CorsAllowOrigins).await.unwrap();

    if origins == "*" {
        CorsLayer::new().allow_origin(Any).allow_methods(Any)
    } else {
        let list: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|origin| origin.trim().parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(list))
            .allow_methods(Any)
    }
}

/// Custom error trace handler for `RouteError`-type responses
#[instrument(skip(request, next), fields(uri = request.uri().to_string()))]
async fn log_route_errors(request: Request, next: Next) -> Response {
    let res = next.run(request).await;
    if let Some(err) = res.extensions().get::<Arc<RouteError>>() {
        tracing::error!(error = ?err, "error occurred inside route handler");
    }

    res
}

#[instrument(skip(tx, tx_ingest, computer))]
pub async fn start_server(
    tx: UnboundedSender<SocketAddr>,
    tx_ingest: UnboundedSender<IngestJob>,
    computer: Arc<TrendingComputer<RedisCounterStore, PgTrendingRepository>>,
    mut rx: UnboundedReceiver<SocketAddr>,
) -> Result<Vec<JoinHandle<()>>, RouteError> {
    tracing::info!("starting server");
    let server_handle = tokio::task::spawn(async move {
        router(tx, tx_ingest, computer).await;
    });

    let logging_handle = tokio::task::spawn(async move {
        while !rx.is_closed() {
            if let Some(msg) = rx.recv().await {
                tracing::info!(
                    server_url = &format!("http://127.0.0.1:{}", msg.port()),
                    "server ready"
                );
                break;
            }
        }
    });

    let handles = vec![server_handle, logging_handle];
    Ok(handles)
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    SnapshotError(#[from] SnapshotErr),

    #[error(transparent)]
    TrendingError(#[from] TrendingErr),

    #[error("no snapshot available yet")]
    NoSnapshot,

    #[error(transparent)]
    IngestSendError(#[from] SendError<IngestJob>),
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: String,
        }

        let (status, message, err) = match &self {
            RouteError::NoSnapshot => (StatusCode::NOT_FOUND, self.to_string(), None),

            RouteError::SnapshotError(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error.to_string(),
                Some(self),
            ),

            RouteError::TrendingError(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error.to_string(),
                Some(self),
            ),

            RouteError::IngestSendError(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error.to_string(),
                Some(self),
            ),
        };

        let mut response = (status, Json(ErrorResponse { message })).into_response();
        if let Some(err) = err {
            response.extensions_mut().insert(Arc::new(err));
        }

        response
    }
}
