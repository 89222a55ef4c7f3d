use sqlx::PgExecutor;

use crate::error::DBError;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UnitMappingDao {
    pub(crate) unit_code: String,
    pub(crate) unit_label: String,
}

impl UnitMappingDao {
    pub fn unit_code(&self) -> &str {
        &self.unit_code
    }

    pub fn unit_label(&self) -> &str {
        &self.unit_label
    }
}

pub async fn list(conn: impl PgExecutor<'_>) -> Result<Vec<UnitMappingDao>, DBError> {
    Ok(
        sqlx::query_as::<_, UnitMappingDao>("SELECT * FROM unit_mappings")
            .fetch_all(conn)
            .await?,
    )
}
