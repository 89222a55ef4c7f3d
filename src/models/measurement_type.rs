use sqlx::{PgConnection, PgExecutor};

use crate::error::DBError;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct MeasurementTypeDao {
    pub(crate) type_id: String,
    pub(crate) display_name: String,
    pub(crate) unit: Option<String>,
    pub(crate) unit_label: Option<String>,
    pub(crate) order_number: Option<i32>,
    pub(crate) data_type: String,
}

impl MeasurementTypeDao {
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn unit_label(&self) -> Option<&str> {
        self.unit_label.as_deref()
    }

    pub fn order_number(&self) -> Option<i32> {
        self.order_number
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }
}

pub async fn get(
    conn: impl PgExecutor<'_>,
    type_id: &str,
) -> Result<Option<MeasurementTypeDao>, DBError> {
    Ok(sqlx::query_as::<_, MeasurementTypeDao>(
        "SELECT * FROM measurement_types WHERE type_id = $1",
    )
    .bind(type_id)
    .fetch_optional(conn)
    .await?)
}

pub async fn list(conn: impl PgExecutor<'_>) -> Result<Vec<MeasurementTypeDao>, DBError> {
    Ok(
        sqlx::query_as::<_, MeasurementTypeDao>("SELECT * FROM measurement_types")
            .fetch_all(conn)
            .await?,
    )
}

/// Creates the type on first use. An existing row keeps its unit and label
/// unless the incoming observation carries a unit code; `order_number` is
/// managed out-of-band and never touched here.
pub async fn upsert(
    conn: &mut PgConnection,
    type_id: &str,
    display_name: &str,
    unit: Option<&str>,
    unit_label: &str,
) -> Result<MeasurementTypeDao, DBError> {
    if let Some(existing) = get(&mut *conn, type_id).await? {
        if unit.is_none() {
            return Ok(existing);
        }
        Ok(sqlx::query_as::<_, MeasurementTypeDao>(
            r#"UPDATE measurement_types
                SET unit = $2, unit_label = $3
                WHERE type_id = $1
                RETURNING *"#,
        )
        .bind(type_id)
        .bind(unit)
        .bind(unit_label)
        .fetch_one(conn)
        .await?)
    } else {
        Ok(sqlx::query_as::<_, MeasurementTypeDao>(
            r#"INSERT INTO measurement_types (type_id, display_name, unit, unit_label, data_type)
                VALUES ($1, $2, $3, $4, 'NUMERIC')
                ON CONFLICT (type_id) DO UPDATE
                SET unit = EXCLUDED.unit, unit_label = EXCLUDED.unit_label
                RETURNING *"#,
        )
        .bind(type_id)
        .bind(display_name)
        .bind(unit)
        .bind(unit_label)
        .fetch_one(conn)
        .await?)
    }
}

pub async fn update_unit_label(
    conn: impl PgExecutor<'_>,
    type_id: &str,
    unit_label: &str,
) -> Result<(), DBError> {
    sqlx::query("UPDATE measurement_types SET unit_label = $2 WHERE type_id = $1")
        .bind(type_id)
        .bind(unit_label)
        .execute(conn)
        .await?;
    Ok(())
}
