use chrono_tz::Tz;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::Filter;

use crate::config::CONFIG;
use crate::error::ServiceError;
use crate::observation::ObservationNormalizer;
use crate::query::QueryEngine;
use crate::units::UnitLabelCache;

mod data_routes;

/// Everything the route handlers need, constructed once in `main`.
pub struct AppContext {
    pub db: PgPool,
    pub units: Arc<UnitLabelCache>,
    pub normalizer: ObservationNormalizer,
    pub engine: QueryEngine,
}

impl AppContext {
    pub fn new(db: PgPool, units: Arc<UnitLabelCache>, tz: Tz) -> Self {
        let normalizer = ObservationNormalizer::new(db.clone(), units.clone());
        let engine = QueryEngine::new(db.clone(), tz);
        AppContext {
            db,
            units,
            normalizer,
            engine,
        }
    }
}

pub(crate) fn build_response<T: serde::Serialize>(
    resp: Result<T, ServiceError>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, warp::Rejection> {
    match resp {
        Ok(data) => Ok(warp::reply::with_status(
            warp::reply::json(&data),
            StatusCode::OK,
        )),
        Err(err) => {
            let status = match &err {
                ServiceError::Validation(_) | ServiceError::Ingestion(_) => StatusCode::BAD_REQUEST,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                error!("{}", err);
            } else {
                warn!("{}", err);
            }
            Ok(warp::reply::with_status(
                warp::reply::json(&dto::ErrorResponseDto {
                    error: format!("{}", err),
                }),
                status,
            ))
        }
    }
}

pub async fn dispatch_server(context: Arc<AppContext>) {
    let routes = data_routes::routes(&context).with(warp::log("loam::rest"));

    let bind_addr: std::net::SocketAddr = CONFIG
        .bind_addr()
        .parse()
        .expect("BIND_ADDR must be a valid socket address");

    info!("Starting webserver at: {}", bind_addr);
    warp::serve(routes).run(bind_addr).await;
}

pub(crate) mod dto {
    use serde::Serialize;

    #[derive(Debug, Serialize)]
    pub struct ErrorResponseDto {
        pub error: String,
    }
}
