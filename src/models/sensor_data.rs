use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use crate::error::DBError;

/// One immutable time-series sample. `timestamp` is the phenomenon instant
/// reported by the device; `received_at` is stamped on ingestion. `location`
/// and `raw_data` are denormalized audit copies, opaque to queries.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct SensorDataDao {
    pub(crate) data_id: i64,
    pub(crate) sensor_id: String,
    pub(crate) measurement_type: String,
    pub(crate) value: f64,
    pub(crate) unit: Option<String>,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) received_at: DateTime<Utc>,
    pub(crate) location: Option<String>,
    pub(crate) raw_data: Option<String>,
}

impl SensorDataDao {
    pub fn data_id(&self) -> i64 {
        self.data_id
    }

    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn measurement_type(&self) -> &str {
        &self.measurement_type
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn raw_data(&self) -> Option<&str> {
        self.raw_data.as_deref()
    }
}

/// Append-only: samples are never updated or deleted.
#[allow(clippy::too_many_arguments)]
pub async fn append(
    conn: impl PgExecutor<'_>,
    sensor_id: &str,
    measurement_type: &str,
    value: f64,
    unit: Option<&str>,
    timestamp: DateTime<Utc>,
    location: Option<&str>,
    raw_data: &str,
) -> Result<(), DBError> {
    sqlx::query(
        r#"INSERT INTO sensor_data
            (sensor_id, measurement_type, value, unit, timestamp, received_at, location, raw_data)
            VALUES ($1, $2, $3, $4, $5, NOW(), $6, $7)"#,
    )
    .bind(sensor_id)
    .bind(measurement_type)
    .bind(value)
    .bind(unit)
    .bind(timestamp)
    .bind(location)
    .bind(raw_data)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn get_all_desc(
    conn: impl PgExecutor<'_>,
    sensor_id: &str,
) -> Result<Vec<SensorDataDao>, DBError> {
    Ok(sqlx::query_as::<_, SensorDataDao>(
        r#"SELECT * FROM sensor_data
            WHERE sensor_id = $1
            ORDER BY timestamp DESC"#,
    )
    .bind(sensor_id)
    .fetch_all(conn)
    .await?)
}

pub async fn get_range_desc(
    conn: impl PgExecutor<'_>,
    sensor_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<SensorDataDao>, DBError> {
    Ok(sqlx::query_as::<_, SensorDataDao>(
        r#"SELECT * FROM sensor_data
            WHERE sensor_id = $1
            AND timestamp BETWEEN $2 AND $3
            ORDER BY timestamp DESC"#,
    )
    .bind(sensor_id)
    .bind(from)
    .bind(to)
    .fetch_all(conn)
    .await?)
}

pub async fn get_for_type_since(
    conn: impl PgExecutor<'_>,
    sensor_id: &str,
    measurement_type: &str,
    since: DateTime<Utc>,
) -> Result<Vec<SensorDataDao>, DBError> {
    Ok(sqlx::query_as::<_, SensorDataDao>(
        r#"SELECT * FROM sensor_data
            WHERE sensor_id = $1
            AND measurement_type = $2
            AND timestamp >= $3
            ORDER BY timestamp DESC"#,
    )
    .bind(sensor_id)
    .bind(measurement_type)
    .bind(since)
    .fetch_all(conn)
    .await?)
}

/// The newest sample per measurement type. Duplicate phenomenon instants
/// (re-ingested documents) can yield more than one row per type; callers
/// keep the first of each group.
pub async fn get_latest_per_type(
    conn: impl PgExecutor<'_>,
    sensor_id: &str,
) -> Result<Vec<SensorDataDao>, DBError> {
    Ok(sqlx::query_as::<_, SensorDataDao>(
        r#"SELECT sd.* FROM sensor_data sd
            INNER JOIN (
                SELECT measurement_type, MAX(timestamp) AS max_timestamp
                FROM sensor_data
                WHERE sensor_id = $1
                GROUP BY measurement_type
            ) latest ON sd.measurement_type = latest.measurement_type
                AND sd.timestamp = latest.max_timestamp
            WHERE sd.sensor_id = $1
            ORDER BY sd.measurement_type, sd.data_id"#,
    )
    .bind(sensor_id)
    .fetch_all(conn)
    .await?)
}

pub async fn get_top_n_for_type(
    conn: impl PgExecutor<'_>,
    sensor_id: &str,
    measurement_type: &str,
    n: i64,
) -> Result<Vec<SensorDataDao>, DBError> {
    Ok(sqlx::query_as::<_, SensorDataDao>(
        r#"SELECT * FROM sensor_data
            WHERE sensor_id = $1
            AND measurement_type = $2
            ORDER BY timestamp DESC
            LIMIT $3"#,
    )
    .bind(sensor_id)
    .bind(measurement_type)
    .bind(n)
    .fetch_all(conn)
    .await?)
}

pub async fn distinct_types(
    conn: impl PgExecutor<'_>,
    sensor_id: &str,
) -> Result<Vec<String>, DBError> {
    Ok(sqlx::query_scalar::<_, String>(
        r#"SELECT DISTINCT measurement_type FROM sensor_data
            WHERE sensor_id = $1
            ORDER BY measurement_type"#,
    )
    .bind(sensor_id)
    .fetch_all(conn)
    .await?)
}

pub async fn get_latest(
    conn: impl PgExecutor<'_>,
    sensor_id: &str,
) -> Result<Option<SensorDataDao>, DBError> {
    Ok(sqlx::query_as::<_, SensorDataDao>(
        r#"SELECT * FROM sensor_data
            WHERE sensor_id = $1
            ORDER BY timestamp DESC
            LIMIT 1"#,
    )
    .bind(sensor_id)
    .fetch_optional(conn)
    .await?)
}
