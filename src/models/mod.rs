use crate::config::CONFIG;
use crate::error::DBError;

pub async fn establish_db_connection() -> Option<sqlx::PgPool> {
    let database_url = CONFIG.database_url();
    sqlx::postgres::PgPoolOptions::new()
        .connect(database_url)
        .await
        .ok()
}

pub async fn check_schema(conn: &sqlx::PgPool) -> Result<(), DBError> {
    sqlx::query("SELECT count(*) FROM sensors")
        .fetch_one(conn)
        .await?;
    Ok(())
}

pub mod measurement_type;
pub mod sensor;
pub mod sensor_context;
pub mod sensor_data;
pub mod sensor_measurement_type;
pub mod unit_mapping;
