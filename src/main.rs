mod config;
mod error;
mod models;
mod observation;
mod query;
mod rest;
mod units;

use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::CONFIG;
use crate::units::UnitLabelCache;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_conn = models::establish_db_connection()
        .await
        .expect("Failed connecting database");
    sqlx::migrate!()
        .run(&db_conn)
        .await
        .expect("Failed running migrations");

    let units = Arc::new(UnitLabelCache::new());
    match units.reload(&db_conn).await {
        Ok(count) => info!("Loaded {} unit mappings from database", count),
        Err(e) => error!("Failed loading unit mappings: {}", e),
    }

    let context = Arc::new(rest::AppContext::new(
        db_conn,
        units,
        CONFIG.reference_tz(),
    ));
    rest::dispatch_server(context).await;
}
