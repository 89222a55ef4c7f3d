use chrono::{DateTime, Days, Duration, Utc};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{ServiceError, ValidationError};
use crate::models::measurement_type::{self, MeasurementTypeDao};
use crate::models::sensor;
use crate::models::sensor_data::{self, SensorDataDao};

pub const MAX_WINDOW_DAYS: i64 = 3650;
pub const MAX_COUNT: i64 = 1000;
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Mutually exclusive query modes; construction goes through
/// `validate_filter`, the engine assumes a well-formed selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// One point per measurement type, the most recent by timestamp.
    Latest,
    /// All points strictly after now − days, anchored in the reference zone.
    Window { days: i64 },
    /// The latest n points per measurement type.
    Count { n: i64 },
    /// All points with `from <= timestamp <= to`.
    Range {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

/// The single validation path shared by every caller. Precedence matches the
/// original API: an explicit count wins over a date range, a date range wins
/// over a day window, and nothing at all means the default 7-day window.
pub fn validate_filter(
    days: Option<i64>,
    count: Option<i64>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Selector, ValidationError> {
    if days.is_some() && count.is_some() {
        return Err(ValidationError::AmbiguousFilter);
    }

    if let Some(n) = count {
        if !(1..=MAX_COUNT).contains(&n) {
            return Err(ValidationError::CountOutOfRange(MAX_COUNT));
        }
        return Ok(Selector::Count { n });
    }

    match (from, to) {
        (Some(from), Some(to)) => {
            let from = parse_query_instant(from)?;
            let to = parse_query_instant(to)?;
            if from > to {
                return Err(ValidationError::InvertedRange);
            }
            return Ok(Selector::Range { from, to });
        }
        (None, None) => {}
        _ => return Err(ValidationError::HalfOpenRange),
    }

    let days = days.unwrap_or(DEFAULT_WINDOW_DAYS);
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(ValidationError::DaysOutOfRange(MAX_WINDOW_DAYS));
    }
    Ok(Selector::Window { days })
}

fn parse_query_instant(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ValidationError::MalformedInstant(raw.to_owned()))
}

///
/// Response shape
///

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorDataResponse {
    pub sensor_id: String,
    pub sensor_name: String,
    pub location: String,
    pub data: Vec<MeasurementGroup>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementGroup {
    pub property: String,
    pub unit: String,
    // registry sort key, not part of the wire format
    #[serde(skip_serializing)]
    order_number: Option<i32>,
    pub values: Vec<MeasurementValue>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementValue {
    #[serde(serialize_with = "serialize_instant")]
    pub time: DateTime<Utc>,
    pub value: f64,
}

fn serialize_instant<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&time.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

///
/// Pure response assembly, shared across all modes
///

/// Groups candidate rows by measurement type, preserving the order in which
/// types are first encountered.
fn group_by_type(candidates: &[SensorDataDao]) -> Vec<(String, Vec<SensorDataDao>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut grouped: Vec<(String, Vec<SensorDataDao>)> = Vec::new();
    for dao in candidates {
        match index.get(dao.measurement_type()) {
            Some(&at) => grouped[at].1.push(dao.clone()),
            None => {
                index.insert(dao.measurement_type().to_owned(), grouped.len());
                grouped.push((dao.measurement_type().to_owned(), vec![dao.clone()]));
            }
        }
    }
    grouped
}

/// A group without a registry row is dropped silently: data for a type the
/// registry has not seen yet is treated as not-yet-synchronized, not as an
/// error.
fn build_group(
    registry: Option<&MeasurementTypeDao>,
    mut rows: Vec<SensorDataDao>,
    limit: Option<usize>,
) -> Option<MeasurementGroup> {
    let registry = registry?;
    if rows.is_empty() {
        return None;
    }

    rows.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    if let Some(limit) = limit {
        rows.truncate(limit);
    }

    let values = rows
        .iter()
        .map(|dao| MeasurementValue {
            time: dao.timestamp(),
            value: dao.value(),
        })
        .collect();

    Some(MeasurementGroup {
        property: registry.display_name().to_owned(),
        unit: registry.unit_label().unwrap_or_default().to_owned(),
        order_number: registry.order_number(),
        values,
    })
}

/// Registry display order ascending, unset order last; the stable sort keeps
/// encounter order for ties.
fn sort_groups(groups: &mut [MeasurementGroup]) {
    groups.sort_by_key(|group| group.order_number.unwrap_or(i32::MAX));
}

///
/// Engine
///

pub struct QueryEngine {
    db: PgPool,
    tz: Tz,
}

impl QueryEngine {
    pub fn new(db: PgPool, tz: Tz) -> Self {
        QueryEngine { db, tz }
    }

    pub async fn query(
        &self,
        sensor_id: &str,
        selector: &Selector,
    ) -> Result<SensorDataResponse, ServiceError> {
        match selector {
            Selector::Latest => self.query_latest(sensor_id).await,
            Selector::Window { days } => self.query_window(sensor_id, *days).await,
            Selector::Count { n } => self.query_count(sensor_id, *n).await,
            Selector::Range { from, to } => self.query_range(sensor_id, *from, *to).await,
        }
    }

    /// One group per measurement type with exactly one value. A sensor with
    /// no data at all is NotFound here, unlike the window modes.
    async fn query_latest(&self, sensor_id: &str) -> Result<SensorDataResponse, ServiceError> {
        let candidates = sensor_data::get_latest_per_type(&self.db, sensor_id).await?;
        if candidates.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "No data found for sensor: {}",
                sensor_id
            )));
        }

        let location = candidates
            .first()
            .and_then(|dao| dao.location().map(str::to_owned));
        let groups = self.build_groups(candidates, Some(1)).await?;
        self.build_response(sensor_id, groups, location).await
    }

    /// All points strictly after the cutoff; an empty match is a valid
    /// zero-group response, never NotFound.
    async fn query_window(
        &self,
        sensor_id: &str,
        days: i64,
    ) -> Result<SensorDataResponse, ServiceError> {
        let cutoff = self.window_cutoff(days);
        let all = sensor_data::get_all_desc(&self.db, sensor_id).await?;
        let candidates: Vec<SensorDataDao> = all
            .into_iter()
            .filter(|dao| dao.timestamp() > cutoff)
            .collect();
        debug!(
            sensor_id = sensor_id,
            days = days,
            candidates = candidates.len(),
            "Resolved day window"
        );

        let location = candidates
            .first()
            .and_then(|dao| dao.location().map(str::to_owned));
        let groups = self.build_groups(candidates, None).await?;
        self.build_response(sensor_id, groups, location).await
    }

    /// The latest n points per type the sensor has ever reported; a type
    /// with zero points is omitted entirely. A sensor with no types at all
    /// is NotFound.
    async fn query_count(&self, sensor_id: &str, n: i64) -> Result<SensorDataResponse, ServiceError> {
        let type_ids = sensor_data::distinct_types(&self.db, sensor_id).await?;
        if type_ids.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "No measurement types found for sensor: {}",
                sensor_id
            )));
        }

        let mut groups = Vec::new();
        for type_id in &type_ids {
            let rows = sensor_data::get_top_n_for_type(&self.db, sensor_id, type_id, n).await?;
            let registry = measurement_type::get(&self.db, type_id).await?;
            if let Some(group) = build_group(registry.as_ref(), rows, None) {
                groups.push(group);
            }
        }

        // location comes from the newest point across all types,
        // independent of the per-type limit
        let location = sensor_data::get_latest(&self.db, sensor_id)
            .await?
            .and_then(|dao| dao.location().map(str::to_owned));
        self.build_response(sensor_id, groups, location).await
    }

    async fn query_range(
        &self,
        sensor_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<SensorDataResponse, ServiceError> {
        let candidates = sensor_data::get_range_desc(&self.db, sensor_id, from, to).await?;

        let location = candidates
            .first()
            .and_then(|dao| dao.location().map(str::to_owned));
        let groups = self.build_groups(candidates, None).await?;
        self.build_response(sensor_id, groups, location).await
    }

    /// Calendar-day subtraction in the reference zone, converted back to an
    /// absolute instant for comparison against stored timestamps.
    fn window_cutoff(&self, days: i64) -> DateTime<Utc> {
        let now = Utc::now().with_timezone(&self.tz);
        match now.checked_sub_days(Days::new(days as u64)) {
            Some(cutoff) => cutoff.with_timezone(&Utc),
            None => (now - Duration::days(days)).with_timezone(&Utc),
        }
    }

    async fn build_groups(
        &self,
        candidates: Vec<SensorDataDao>,
        limit: Option<usize>,
    ) -> Result<Vec<MeasurementGroup>, ServiceError> {
        let mut groups = Vec::new();
        for (type_id, rows) in group_by_type(&candidates) {
            let registry = measurement_type::get(&self.db, &type_id).await?;
            if registry.is_none() {
                debug!(
                    measurement_type = type_id.as_str(),
                    "No registry entry for measurement type, dropping group"
                );
            }
            if let Some(group) = build_group(registry.as_ref(), rows, limit) {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    async fn build_response(
        &self,
        sensor_id: &str,
        mut groups: Vec<MeasurementGroup>,
        location: Option<String>,
    ) -> Result<SensorDataResponse, ServiceError> {
        sort_groups(&mut groups);

        let sensor = sensor::get(&self.db, sensor_id).await?;
        let sensor_name = sensor
            .as_ref()
            .map(|dao| dao.sensor_name().to_owned())
            .unwrap_or_else(|| "Unknown Sensor".to_owned());
        let location = location
            .or_else(|| sensor.and_then(|dao| dao.location().map(str::to_owned)))
            .unwrap_or_else(|| "Unknown Location".to_owned());

        Ok(SensorDataResponse {
            sensor_id: sensor_id.to_owned(),
            sensor_name,
            location,
            data: groups,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dao(measurement_type: &str, timestamp: &str, value: f64) -> SensorDataDao {
        SensorDataDao {
            data_id: 0,
            sensor_id: "sensor-7in1-001".to_owned(),
            measurement_type: measurement_type.to_owned(),
            value,
            unit: Some("unit:PERCENT".to_owned()),
            timestamp: DateTime::parse_from_rfc3339(timestamp)
                .unwrap()
                .with_timezone(&Utc),
            received_at: Utc::now(),
            location: Some("Greenhouse north bed".to_owned()),
            raw_data: None,
        }
    }

    fn registry(type_id: &str, label: Option<&str>, order: Option<i32>) -> MeasurementTypeDao {
        MeasurementTypeDao {
            type_id: type_id.to_owned(),
            display_name: crate::observation::derive_display_name(type_id),
            unit: Some("unit:PERCENT".to_owned()),
            unit_label: label.map(str::to_owned),
            order_number: order,
            data_type: "NUMERIC".to_owned(),
        }
    }

    #[test]
    fn test_validate_defaults_to_seven_day_window() {
        let selector = validate_filter(None, None, None, None).unwrap();
        assert_eq!(Selector::Window { days: 7 }, selector);
    }

    #[test]
    fn test_validate_rejects_days_and_count() {
        let err = validate_filter(Some(7), Some(10), None, None).unwrap_err();
        assert!(matches!(err, ValidationError::AmbiguousFilter));
    }

    #[test]
    fn test_validate_bounds() {
        assert!(matches!(
            validate_filter(Some(0), None, None, None),
            Err(ValidationError::DaysOutOfRange(3650))
        ));
        assert!(matches!(
            validate_filter(Some(3651), None, None, None),
            Err(ValidationError::DaysOutOfRange(3650))
        ));
        assert!(matches!(
            validate_filter(None, Some(0), None, None),
            Err(ValidationError::CountOutOfRange(1000))
        ));
        assert!(matches!(
            validate_filter(None, Some(1001), None, None),
            Err(ValidationError::CountOutOfRange(1000))
        ));
        assert_eq!(
            Selector::Window { days: 3650 },
            validate_filter(Some(3650), None, None, None).unwrap()
        );
        assert_eq!(
            Selector::Count { n: 1000 },
            validate_filter(None, Some(1000), None, None).unwrap()
        );
    }

    #[test]
    fn test_validate_range() {
        let selector = validate_filter(
            None,
            None,
            Some("2025-06-01T00:00:00Z"),
            Some("2025-06-01T23:59:59Z"),
        )
        .unwrap();
        assert!(matches!(selector, Selector::Range { .. }));

        assert!(matches!(
            validate_filter(None, None, Some("2025-06-01T00:00:00Z"), None),
            Err(ValidationError::HalfOpenRange)
        ));
        assert!(matches!(
            validate_filter(None, None, None, Some("2025-06-01T00:00:00Z")),
            Err(ValidationError::HalfOpenRange)
        ));
        assert!(matches!(
            validate_filter(None, None, Some("yesterday"), Some("2025-06-01T00:00:00Z")),
            Err(ValidationError::MalformedInstant(_))
        ));
        assert!(matches!(
            validate_filter(
                None,
                None,
                Some("2025-06-02T00:00:00Z"),
                Some("2025-06-01T00:00:00Z")
            ),
            Err(ValidationError::InvertedRange)
        ));
    }

    #[test]
    fn test_validate_count_wins_over_range() {
        let selector = validate_filter(
            None,
            Some(5),
            Some("2025-06-01T00:00:00Z"),
            Some("2025-06-02T00:00:00Z"),
        )
        .unwrap();
        assert_eq!(Selector::Count { n: 5 }, selector);
    }

    #[test]
    fn test_group_by_type_keeps_encounter_order() {
        let candidates = vec![
            dao("ll:SoilMoisture", "2025-06-01T12:00:00Z", 23.5),
            dao("ll:SoilTemperature", "2025-06-01T11:00:00Z", 18.2),
            dao("ll:SoilMoisture", "2025-06-01T10:00:00Z", 22.9),
        ];

        let grouped = group_by_type(&candidates);
        assert_eq!(2, grouped.len());
        assert_eq!("ll:SoilMoisture", grouped[0].0);
        assert_eq!(2, grouped[0].1.len());
        assert_eq!("ll:SoilTemperature", grouped[1].0);
        assert_eq!(1, grouped[1].1.len());
    }

    #[test]
    fn test_build_group_orders_values_newest_first() {
        let rows = vec![
            dao("ll:SoilMoisture", "2025-06-01T10:00:00Z", 22.9),
            dao("ll:SoilMoisture", "2025-06-01T12:00:00Z", 23.5),
            dao("ll:SoilMoisture", "2025-06-01T11:00:00Z", 23.1),
        ];
        let registry = registry("ll:SoilMoisture", Some("%"), Some(1));

        let group = build_group(Some(&registry), rows, None).unwrap();
        assert_eq!("Soil Moisture", group.property);
        assert_eq!("%", group.unit);
        let values: Vec<f64> = group.values.iter().map(|v| v.value).collect();
        assert_eq!(vec![23.5, 23.1, 22.9], values);
    }

    #[test]
    fn test_build_group_limit_keeps_most_recent() {
        let rows = vec![
            dao("ll:SoilMoisture", "2025-06-01T10:00:00Z", 22.9),
            dao("ll:SoilMoisture", "2025-06-01T12:00:00Z", 23.5),
        ];
        let registry = registry("ll:SoilMoisture", Some("%"), None);

        let group = build_group(Some(&registry), rows, Some(1)).unwrap();
        assert_eq!(1, group.values.len());
        assert_eq!(23.5, group.values[0].value);
    }

    #[test]
    fn test_build_group_without_registry_is_dropped() {
        let rows = vec![dao("ll:SoilMoisture", "2025-06-01T10:00:00Z", 22.9)];
        assert!(build_group(None, rows, None).is_none());
    }

    #[test]
    fn test_build_group_empty_unit_label() {
        let rows = vec![dao("ll:SoilMoisture", "2025-06-01T10:00:00Z", 22.9)];
        let registry = registry("ll:SoilMoisture", None, None);

        let group = build_group(Some(&registry), rows, None).unwrap();
        assert_eq!("", group.unit);
    }

    #[test]
    fn test_sort_groups_by_display_order_unset_last() {
        let mk = |property: &str, order: Option<i32>| MeasurementGroup {
            property: property.to_owned(),
            unit: String::new(),
            order_number: order,
            values: Vec::new(),
        };
        let mut groups = vec![
            mk("Unordered A", None),
            mk("Third", Some(3)),
            mk("First", Some(1)),
            mk("Unordered B", None),
        ];

        sort_groups(&mut groups);

        let order: Vec<&str> = groups.iter().map(|g| g.property.as_str()).collect();
        // ties (both unset) keep encounter order
        assert_eq!(vec!["First", "Third", "Unordered A", "Unordered B"], order);
    }

    #[test]
    fn test_response_wire_format() {
        let response = SensorDataResponse {
            sensor_id: "sensor-7in1-001".to_owned(),
            sensor_name: "Soil Probe 001".to_owned(),
            location: "Greenhouse north bed".to_owned(),
            data: vec![MeasurementGroup {
                property: "Soil Moisture".to_owned(),
                unit: "%".to_owned(),
                order_number: Some(1),
                values: vec![MeasurementValue {
                    time: DateTime::parse_from_rfc3339("2025-06-01T10:00:00+02:00")
                        .unwrap()
                        .with_timezone(&Utc),
                    value: 23.5,
                }],
            }],
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!("sensor-7in1-001", json["sensorId"]);
        assert_eq!("Soil Probe 001", json["sensorName"]);
        assert_eq!("Soil Moisture", json["data"][0]["property"]);
        assert_eq!("%", json["data"][0]["unit"]);
        // instants render in UTC with a Z marker
        assert_eq!("2025-06-01T08:00:00Z", json["data"][0]["values"][0]["time"]);
        assert_eq!(23.5, json["data"][0]["values"][0]["value"]);
        // the sort key is internal
        assert!(json["data"][0].get("orderNumber").is_none());
    }

    ///
    /// End-to-end queries against a provisioned database, fed through the
    /// ingestion path
    ///

    use crate::models::establish_db_connection;
    use crate::observation::{ObservationDocument, ObservationNormalizer};
    use crate::units::UnitLabelCache;
    use std::sync::Arc;

    async fn setup(sensor_id: &str) -> PgPool {
        let conn = establish_db_connection().await.unwrap();
        sqlx::migrate!().run(&conn).await.unwrap();
        for stmt in [
            "DELETE FROM sensor_data WHERE sensor_id = $1",
            "DELETE FROM sensor_measurement_types WHERE sensor_id = $1",
            "DELETE FROM sensor_contexts WHERE sensor_id = $1",
            "DELETE FROM sensors WHERE sensor_id = $1",
        ] {
            sqlx::query(stmt)
                .bind(sensor_id)
                .execute(&conn)
                .await
                .unwrap();
        }
        conn
    }

    async fn ingest(conn: &PgPool, sensor_id: &str, samples: &[(&str, &str, f64)]) {
        let members: Vec<serde_json::Value> = samples
            .iter()
            .map(|(type_id, time, value)| {
                serde_json::json!({
                    "@type": "sosa:Observation",
                    "sosa:observedProperty": { "@id": type_id },
                    "sosa:phenomenonTime": time,
                    "sosa:hasResult": { "qudt:numericValue": value, "qudt:unit": "unit:PERCENT" }
                })
            })
            .collect();
        let doc: ObservationDocument = serde_json::from_value(serde_json::json!({
            "sosa:madeBySensor": {
                "@id": format!("ll:{}", sensor_id),
                "rdfs:label": "Integration Probe"
            },
            "sosa:hasFeatureOfInterest": { "ll:location": "Plot X" },
            "sosa:hasMember": members
        }))
        .unwrap();

        let units = Arc::new(UnitLabelCache::new());
        units.reload(conn).await.unwrap();
        ObservationNormalizer::new(conn.clone(), units)
            .process(&doc)
            .await
            .unwrap();
    }

    fn engine(conn: &PgPool) -> QueryEngine {
        QueryEngine::new(conn.clone(), chrono_tz::UTC)
    }

    #[tokio::test]
    #[ignore = "requires a provisioned database"]
    async fn latest_returns_one_value_per_type() {
        let sensor_id = "query-test-latest";
        let conn = setup(sensor_id).await;
        ingest(
            &conn,
            sensor_id,
            &[
                ("ll:SoilMoisture", "2025-06-01T08:00:00Z", 21.0),
                ("ll:SoilMoisture", "2025-06-01T10:00:00Z", 23.5),
                ("ll:SoilMoisture", "2025-06-01T09:00:00Z", 22.0),
                ("ll:SoilTemperature", "2025-06-01T09:30:00Z", 18.2),
            ],
        )
        .await;

        let response = engine(&conn)
            .query(sensor_id, &Selector::Latest)
            .await
            .unwrap();

        assert_eq!("Integration Probe", response.sensor_name);
        assert_eq!("Plot X", response.location);
        assert_eq!(2, response.data.len());
        for group in &response.data {
            assert_eq!(1, group.values.len());
        }
        let moisture = response
            .data
            .iter()
            .find(|g| g.property == "Soil Moisture")
            .unwrap();
        assert_eq!(23.5, moisture.values[0].value);
    }

    #[tokio::test]
    #[ignore = "requires a provisioned database"]
    async fn count_tolerates_short_history() {
        let sensor_id = "query-test-count";
        let conn = setup(sensor_id).await;
        ingest(
            &conn,
            sensor_id,
            &[
                ("ll:SoilMoisture", "2025-06-01T08:00:00Z", 21.0),
                ("ll:SoilMoisture", "2025-06-01T09:00:00Z", 22.0),
                ("ll:SoilMoisture", "2025-06-01T10:00:00Z", 23.5),
                ("ll:SoilTemperature", "2025-06-01T09:30:00Z", 18.2),
            ],
        )
        .await;

        let response = engine(&conn)
            .query(sensor_id, &Selector::Count { n: 2 })
            .await
            .unwrap();

        let moisture = response
            .data
            .iter()
            .find(|g| g.property == "Soil Moisture")
            .unwrap();
        assert_eq!(2, moisture.values.len());
        assert_eq!(vec![23.5, 22.0], moisture.values.iter().map(|v| v.value).collect::<Vec<_>>());

        // a type with only one historical point yields one value, not an error
        let temperature = response
            .data
            .iter()
            .find(|g| g.property == "Soil Temperature")
            .unwrap();
        assert_eq!(1, temperature.values.len());
    }

    #[tokio::test]
    #[ignore = "requires a provisioned database"]
    async fn window_and_range_misses_are_empty_not_not_found() {
        let sensor_id = "query-test-empty";
        let conn = setup(sensor_id).await;
        // history far outside any 7-day window
        ingest(
            &conn,
            sensor_id,
            &[("ll:SoilMoisture", "2020-01-01T00:00:00Z", 20.0)],
        )
        .await;
        let engine = engine(&conn);

        let window = engine
            .query(sensor_id, &Selector::Window { days: 7 })
            .await
            .unwrap();
        assert!(window.data.is_empty());
        // no candidate points: location falls back to the registry row
        assert_eq!("Plot X", window.location);

        let range = engine
            .query(
                sensor_id,
                &Selector::Range {
                    from: DateTime::parse_from_rfc3339("2021-01-01T00:00:00Z")
                        .unwrap()
                        .with_timezone(&Utc),
                    to: DateTime::parse_from_rfc3339("2021-01-02T00:00:00Z")
                        .unwrap()
                        .with_timezone(&Utc),
                },
            )
            .await
            .unwrap();
        assert!(range.data.is_empty());

        // Latest and Count keep the NotFound asymmetry for unknown sensors
        assert!(matches!(
            engine.query("no-such-sensor", &Selector::Latest).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            engine
                .query("no-such-sensor", &Selector::Count { n: 5 })
                .await,
            Err(ServiceError::NotFound(_))
        ));
        let unknown = engine
            .query("no-such-sensor", &Selector::Window { days: 7 })
            .await
            .unwrap();
        assert_eq!("Unknown Sensor", unknown.sensor_name);
        assert_eq!("Unknown Location", unknown.location);
        assert!(unknown.data.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires a provisioned database"]
    async fn range_round_trips_value_and_unit_label() {
        let sensor_id = "query-test-roundtrip";
        let conn = setup(sensor_id).await;
        ingest(
            &conn,
            sensor_id,
            &[("ll:SoilMoisture", "2025-06-01T10:00:00Z", 23.5)],
        )
        .await;

        let response = engine(&conn)
            .query(
                sensor_id,
                &Selector::Range {
                    from: DateTime::parse_from_rfc3339("2025-06-01T00:00:00Z")
                        .unwrap()
                        .with_timezone(&Utc),
                    to: DateTime::parse_from_rfc3339("2025-06-01T23:59:59Z")
                        .unwrap()
                        .with_timezone(&Utc),
                },
            )
            .await
            .unwrap();

        assert_eq!(1, response.data.len());
        let group = &response.data[0];
        assert_eq!("Soil Moisture", group.property);
        assert_eq!("%", group.unit);
        assert_eq!(23.5, group.values[0].value);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            "2025-06-01T10:00:00Z",
            json["data"][0]["values"][0]["time"]
        );
    }
}
