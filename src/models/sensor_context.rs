use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use crate::error::DBError;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct SensorContextDao {
    pub(crate) context_id: i64,
    pub(crate) sensor_id: String,
    pub(crate) context_name: String,
    pub(crate) context_uri: String,
    pub(crate) created_at: DateTime<Utc>,
}

impl SensorContextDao {
    pub fn context_id(&self) -> i64 {
        self.context_id
    }

    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn context_name(&self) -> &str {
        &self.context_name
    }

    pub fn context_uri(&self) -> &str {
        &self.context_uri
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

pub async fn list_for_sensor(
    conn: impl PgExecutor<'_>,
    sensor_id: &str,
) -> Result<Vec<SensorContextDao>, DBError> {
    Ok(sqlx::query_as::<_, SensorContextDao>(
        "SELECT * FROM sensor_contexts WHERE sensor_id = $1 ORDER BY context_id",
    )
    .bind(sensor_id)
    .fetch_all(conn)
    .await?)
}

pub async fn insert(
    conn: impl PgExecutor<'_>,
    sensor_id: &str,
    context_name: &str,
    context_uri: &str,
) -> Result<(), DBError> {
    sqlx::query(
        r#"INSERT INTO sensor_contexts (sensor_id, context_name, context_uri, created_at)
            VALUES ($1, $2, $3, NOW())"#,
    )
    .bind(sensor_id)
    .bind(context_name)
    .bind(context_uri)
    .execute(conn)
    .await?;
    Ok(())
}
