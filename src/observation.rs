use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{DBError, IngestionError, ServiceError};
use crate::models::{
    measurement_type, sensor, sensor_context, sensor_data, sensor_measurement_type,
};
use crate::units::UnitLabelCache;

///
/// Wire format: SOSA/SSN-flavored JSON-LD as sent by field devices.
/// Unknown fields are ignored, required fields are checked by
/// `validate_document` so the error names the missing piece instead of
/// failing generically at deserialization.
///

#[derive(Debug, Serialize, Deserialize)]
pub struct ObservationDocument {
    #[serde(rename = "@context", default)]
    pub context: Option<ContextBlock>,
    #[serde(rename = "sosa:madeBySensor", default)]
    pub made_by_sensor: Option<SensorDescriptor>,
    #[serde(rename = "sosa:hasFeatureOfInterest", default)]
    pub feature_of_interest: Option<FeatureOfInterest>,
    #[serde(rename = "sosa:hasMember", default)]
    pub members: Vec<ObservationMember>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ContextBlock {
    pub sosa: Option<String>,
    pub ssn: Option<String>,
    pub qudt: Option<String>,
    pub unit: Option<String>,
    pub xsd: Option<String>,
    pub rdfs: Option<String>,
    pub ll: Option<String>,
}

impl ContextBlock {
    /// Present namespaces in declaration order.
    fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("sosa", &self.sosa),
            ("ssn", &self.ssn),
            ("qudt", &self.qudt),
            ("unit", &self.unit),
            ("xsd", &self.xsd),
            ("rdfs", &self.rdfs),
            ("ll", &self.ll),
        ]
        .into_iter()
        .filter_map(|(name, uri)| uri.as_deref().map(|uri| (name, uri)))
        .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SensorDescriptor {
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "@type", default)]
    pub kind: Option<String>,
    #[serde(rename = "rdfs:label", default)]
    pub label: Option<String>,
    #[serde(rename = "sosa:observes", default)]
    pub observes: Vec<PropertyRef>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PropertyRef {
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureOfInterest {
    #[serde(rename = "@type", default)]
    pub kind: Option<String>,
    #[serde(rename = "rdfs:label", default)]
    pub label: Option<String>,
    #[serde(rename = "ll:location", default)]
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ObservationMember {
    #[serde(rename = "@type", default)]
    pub kind: Option<String>,
    #[serde(rename = "sosa:observedProperty", default)]
    pub observed_property: Option<PropertyRef>,
    #[serde(rename = "sosa:phenomenonTime", default)]
    pub phenomenon_time: Option<String>,
    #[serde(rename = "sosa:hasResult", default)]
    pub result: Option<ObservationResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ObservationResult {
    #[serde(rename = "qudt:numericValue", default)]
    pub numeric_value: Option<f64>,
    #[serde(rename = "qudt:unit", default)]
    pub unit: Option<String>,
}

/// Document contents after required-field and timestamp validation.
#[derive(Debug)]
pub(crate) struct ValidatedDocument<'a> {
    pub(crate) sensor_id: &'a str,
    pub(crate) sensor_name: &'a str,
    pub(crate) location: Option<&'a str>,
    pub(crate) context: Option<&'a ContextBlock>,
    pub(crate) observations: Vec<ValidatedObservation<'a>>,
}

#[derive(Debug)]
pub(crate) struct ValidatedObservation<'a> {
    pub(crate) type_id: &'a str,
    pub(crate) value: f64,
    pub(crate) unit: Option<&'a str>,
    pub(crate) observed_at: DateTime<Utc>,
    pub(crate) raw: String,
}

/// Strips the namespace prefix up to and including the first `:`.
pub(crate) fn extract_sensor_id(full_id: &str) -> &str {
    match full_id.find(':') {
        Some(idx) => &full_id[idx + 1..],
        None => full_id,
    }
}

/// `ll:SoilMoisture` → `Soil Moisture`: local part of the type id with a
/// space inserted at each lower→upper letter boundary.
pub(crate) fn derive_display_name(type_id: &str) -> String {
    let mut parts = type_id.split(':');
    let local = match (parts.next(), parts.next()) {
        (_, Some(local)) if !local.is_empty() => local,
        _ => type_id,
    };

    let mut name = String::with_capacity(local.len() + 4);
    let mut prev_lower = false;
    for ch in local.chars() {
        if prev_lower && ch.is_ascii_uppercase() {
            name.push(' ');
        }
        name.push(ch);
        prev_lower = ch.is_ascii_lowercase();
    }
    name
}

/// Phenomenon timestamps must carry an explicit offset; naive local times
/// are rejected to keep every persisted instant unambiguous.
pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, IngestionError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| IngestionError::MalformedTimestamp(raw.to_owned()))
}

/// Checks every required field and parses every timestamp up front, so a
/// malformed element fails the document before anything is committed.
pub(crate) fn validate_document(
    doc: &ObservationDocument,
) -> Result<ValidatedDocument<'_>, IngestionError> {
    let descriptor = doc
        .made_by_sensor
        .as_ref()
        .ok_or(IngestionError::MissingField("sosa:madeBySensor"))?;
    let full_id = descriptor
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(IngestionError::MissingField("sosa:madeBySensor.@id"))?;
    if doc.members.is_empty() {
        return Err(IngestionError::MissingField("sosa:hasMember"));
    }

    let sensor_id = extract_sensor_id(full_id);
    let sensor_name = descriptor.label.as_deref().unwrap_or(sensor_id);
    let location = doc
        .feature_of_interest
        .as_ref()
        .and_then(|f| f.location.as_deref());

    let mut observations = Vec::with_capacity(doc.members.len());
    for member in &doc.members {
        let type_id = member
            .observed_property
            .as_ref()
            .and_then(|p| p.id.as_deref())
            .filter(|id| !id.is_empty())
            .ok_or(IngestionError::MissingField("sosa:observedProperty.@id"))?;
        let result = member
            .result
            .as_ref()
            .ok_or(IngestionError::MissingField("sosa:hasResult"))?;
        let value = result
            .numeric_value
            .ok_or(IngestionError::MissingField("qudt:numericValue"))?;
        let raw_time = member
            .phenomenon_time
            .as_deref()
            .ok_or(IngestionError::MissingField("sosa:phenomenonTime"))?;

        observations.push(ValidatedObservation {
            type_id,
            value,
            unit: result.unit.as_deref(),
            observed_at: parse_instant(raw_time)?,
            raw: serde_json::to_string(member)?,
        });
    }

    Ok(ValidatedDocument {
        sensor_id,
        sensor_name,
        location,
        context: doc.context.as_ref(),
        observations,
    })
}

/// Turns one observation document into registry upserts plus appended
/// time-series rows. The whole document runs in a single transaction, so a
/// failing observation never commits a partial member list; re-ingesting an
/// identical document rewrites identical registry content and appends fresh
/// samples.
pub struct ObservationNormalizer {
    db: PgPool,
    units: Arc<UnitLabelCache>,
}

impl ObservationNormalizer {
    pub fn new(db: PgPool, units: Arc<UnitLabelCache>) -> Self {
        ObservationNormalizer { db, units }
    }

    pub async fn process(&self, doc: &ObservationDocument) -> Result<(), ServiceError> {
        let validated = validate_document(doc)?;
        let observation_count = validated.observations.len();
        let sensor_id = validated.sensor_id;

        let mut tx = self.db.begin().await.map_err(DBError::from)?;

        sensor::upsert(
            &mut *tx,
            sensor_id,
            validated.sensor_name,
            validated.location,
        )
        .await?;
        self.save_context(&mut tx, sensor_id, validated.context)
            .await?;

        for observation in &validated.observations {
            self.process_observation(&mut tx, sensor_id, validated.location, observation)
                .await?;
        }

        tx.commit().await.map_err(DBError::from)?;
        info!(
            sensor_id = sensor_id,
            observations = observation_count,
            "Stored observation document"
        );
        Ok(())
    }

    async fn process_observation(
        &self,
        conn: &mut PgConnection,
        sensor_id: &str,
        location: Option<&str>,
        observation: &ValidatedObservation<'_>,
    ) -> Result<(), DBError> {
        let display_name = derive_display_name(observation.type_id);
        let unit_label = self.units.label_or_empty(observation.unit);

        measurement_type::upsert(
            &mut *conn,
            observation.type_id,
            &display_name,
            observation.unit,
            &unit_label,
        )
        .await?;
        sensor_measurement_type::upsert(
            &mut *conn,
            sensor_id,
            observation.type_id,
            observation.observed_at,
        )
        .await?;
        sensor_data::append(
            &mut *conn,
            sensor_id,
            observation.type_id,
            observation.value,
            observation.unit,
            observation.observed_at,
            location,
            &observation.raw,
        )
        .await?;
        Ok(())
    }

    /// Context namespaces are first-write-wins per sensor; later documents
    /// never overwrite them. A document without a context block is fine.
    async fn save_context(
        &self,
        conn: &mut PgConnection,
        sensor_id: &str,
        context: Option<&ContextBlock>,
    ) -> Result<(), DBError> {
        let context = match context {
            Some(context) => context,
            None => return Ok(()),
        };

        if !sensor_context::list_for_sensor(&mut *conn, sensor_id)
            .await?
            .is_empty()
        {
            debug!(sensor_id = sensor_id, "Context already stored, skipping");
            return Ok(());
        }

        for (name, uri) in context.entries() {
            sensor_context::insert(&mut *conn, sensor_id, name, uri).await?;
        }
        Ok(())
    }
}
