use parking_lot::RwLock;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::DBError;
use crate::models::{measurement_type, unit_mapping};

/// Process-wide unit-code → display-label mapping.
///
/// Readers clone the current snapshot `Arc` under a short read lock; `reload`
/// builds a fresh map off-lock and swaps the pointer, so a reader never sees
/// a partially-updated mapping.
pub struct UnitLabelCache {
    snapshot: RwLock<Arc<HashMap<String, String>>>,
}

impl Default for UnitLabelCache {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitLabelCache {
    pub fn new() -> Self {
        UnitLabelCache {
            snapshot: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    pub fn get(&self, unit_code: &str) -> Option<String> {
        let map = self.snapshot.read().clone();
        map.get(unit_code).cloned()
    }

    /// Resolution policy for ingestion: an unmapped (or absent) unit code is
    /// not an error, it resolves to an empty label.
    pub fn label_or_empty(&self, unit_code: Option<&str>) -> String {
        unit_code
            .and_then(|code| self.get(code))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.read().is_empty()
    }

    /// Replaces the snapshot with the full mapping from the reference store
    /// and returns the new entry count.
    pub async fn reload(&self, conn: &PgPool) -> Result<usize, DBError> {
        let mappings = unit_mapping::list(conn).await?;
        let map: HashMap<String, String> = mappings
            .into_iter()
            .map(|m| (m.unit_code, m.unit_label))
            .collect();
        Ok(self.swap(map))
    }

    /// Propagates the current snapshot into the measurement-type registry:
    /// every type whose unit code is mapped to a different label than stored
    /// gets its label rewritten. Returns the exact count of changed rows.
    /// Types with no unit code, or with a code absent from the snapshot, are
    /// left untouched.
    pub async fn sync_labels(&self, conn: &PgPool) -> Result<u64, DBError> {
        let snapshot = self.snapshot.read().clone();
        let types = measurement_type::list(conn).await?;

        let mut updated = 0;
        for dao in types {
            let unit = match dao.unit() {
                Some(unit) => unit,
                None => continue,
            };
            let new_label = match snapshot.get(unit) {
                Some(label) => label,
                None => continue,
            };
            if dao.unit_label() != Some(new_label.as_str()) {
                measurement_type::update_unit_label(conn, dao.type_id(), new_label).await?;
                debug!(
                    type_id = dao.type_id(),
                    "Updated unit label to '{}'", new_label
                );
                updated += 1;
            }
        }
        Ok(updated)
    }

    fn swap(&self, map: HashMap<String, String>) -> usize {
        let count = map.len();
        *self.snapshot.write() = Arc::new(map);
        count
    }
}
