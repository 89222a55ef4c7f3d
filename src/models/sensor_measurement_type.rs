use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use crate::error::DBError;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct SensorMeasurementTypeDao {
    pub(crate) sensor_id: String,
    pub(crate) measurement_type: String,
    pub(crate) is_active: bool,
    pub(crate) last_observed: Option<DateTime<Utc>>,
}

impl SensorMeasurementTypeDao {
    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn measurement_type(&self) -> &str {
        &self.measurement_type
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn last_observed(&self) -> Option<DateTime<Utc>> {
        self.last_observed
    }
}

pub async fn get(
    conn: impl PgExecutor<'_>,
    sensor_id: &str,
    measurement_type: &str,
) -> Result<Option<SensorMeasurementTypeDao>, DBError> {
    Ok(sqlx::query_as::<_, SensorMeasurementTypeDao>(
        "SELECT * FROM sensor_measurement_types WHERE sensor_id = $1 AND measurement_type = $2",
    )
    .bind(sensor_id)
    .bind(measurement_type)
    .fetch_optional(conn)
    .await?)
}

/// Last-writer-wins on `last_observed`; row-level conflict handling keeps
/// concurrent observations for the same pair from losing updates.
pub async fn upsert(
    conn: impl PgExecutor<'_>,
    sensor_id: &str,
    measurement_type: &str,
    last_observed: DateTime<Utc>,
) -> Result<(), DBError> {
    sqlx::query(
        r#"INSERT INTO sensor_measurement_types (sensor_id, measurement_type, is_active, last_observed)
            VALUES ($1, $2, TRUE, $3)
            ON CONFLICT (sensor_id, measurement_type) DO UPDATE
            SET last_observed = EXCLUDED.last_observed, is_active = TRUE"#,
    )
    .bind(sensor_id)
    .bind(measurement_type)
    .bind(last_observed)
    .execute(conn)
    .await?;
    Ok(())
}
