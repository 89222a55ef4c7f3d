use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use crate::error::DBError;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct SensorDao {
    pub(crate) sensor_id: String,
    pub(crate) sensor_name: String,
    pub(crate) location: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl SensorDao {
    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn sensor_name(&self) -> &str {
        &self.sensor_name
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

pub async fn get(
    conn: impl PgExecutor<'_>,
    sensor_id: &str,
) -> Result<Option<SensorDao>, DBError> {
    Ok(
        sqlx::query_as::<_, SensorDao>("SELECT * FROM sensors WHERE sensor_id = $1")
            .bind(sensor_id)
            .fetch_optional(conn)
            .await?,
    )
}

/// Creates the sensor on first sight, otherwise overwrites the mutable
/// fields and reactivates it. Sensors are never deleted here.
pub async fn upsert(
    conn: impl PgExecutor<'_>,
    sensor_id: &str,
    sensor_name: &str,
    location: Option<&str>,
) -> Result<SensorDao, DBError> {
    Ok(sqlx::query_as::<_, SensorDao>(
        r#"INSERT INTO sensors (sensor_id, sensor_name, location, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, TRUE, NOW(), NOW())
            ON CONFLICT (sensor_id) DO UPDATE
            SET sensor_name = EXCLUDED.sensor_name,
                location = EXCLUDED.location,
                is_active = TRUE,
                updated_at = NOW()
            RETURNING *"#,
    )
    .bind(sensor_id)
    .bind(sensor_name)
    .bind(location)
    .fetch_one(conn)
    .await?)
}
