//! Shape of the JSON analytics report consumed on stdin.
//!
//! Every struct decodes leniently: unknown keys are ignored, and missing keys
//! or `null` values fall back to zero or empty values. Keys match regardless
//! of case (`Visitors`, `visitors`, `VISITORS`); encoding writes the
//! capitalized spelling.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::io::Read;
use std::time::Instant;
use tracing::info;

use crate::error::{ReportError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountMaxMin {
    #[serde(rename(serialize = "Count", deserialize = "count"), deserialize_with = "null_default")]
    pub count: i64,
    #[serde(rename(serialize = "Max", deserialize = "max"), deserialize_with = "null_default")]
    pub max: i64,
    #[serde(rename(serialize = "Min", deserialize = "min"), deserialize_with = "null_default")]
    pub min: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountPercent {
    #[serde(rename(serialize = "Count", deserialize = "count"), deserialize_with = "null_default")]
    pub count: f64,
    #[serde(rename(serialize = "Percent", deserialize = "percent"), deserialize_with = "null_default")]
    pub percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniqueCount {
    #[serde(rename(serialize = "Unique", deserialize = "unique"), deserialize_with = "null_default")]
    pub unique: i64,
}

/// Summary statistics of a section. Descriptive only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(rename(serialize = "Visitors", deserialize = "visitors"), deserialize_with = "null_default")]
    pub visitors: CountMaxMin,
    #[serde(rename(serialize = "Hits", deserialize = "hits"), deserialize_with = "null_default")]
    pub hits: CountMaxMin,
    #[serde(rename(serialize = "Data", deserialize = "data"), deserialize_with = "null_default")]
    pub data: UniqueCount,
}

/// One observation of a section.
///
/// `data` is kept as an opaque label: a `YYYYMMDD` date for visitors, a URL
/// path for requests. Consumers interpret it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesPoint {
    #[serde(rename(serialize = "Hits", deserialize = "hits"), deserialize_with = "null_default")]
    pub hits: CountPercent,
    #[serde(rename(serialize = "Visitors", deserialize = "visitors"), deserialize_with = "null_default")]
    pub visitors: CountPercent,
    #[serde(rename(serialize = "Data", deserialize = "data"), deserialize_with = "null_default")]
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostEntry {
    #[serde(rename(serialize = "Hits", deserialize = "hits"), deserialize_with = "null_default")]
    pub hits: CountPercent,
    #[serde(rename(serialize = "Visitors", deserialize = "visitors"), deserialize_with = "null_default")]
    pub visitors: CountPercent,
    #[serde(rename(serialize = "Data", deserialize = "data"), deserialize_with = "null_default")]
    pub data: String,
    #[serde(rename(serialize = "Country", deserialize = "country"), deserialize_with = "null_default")]
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsEntry {
    #[serde(rename(serialize = "Hits", deserialize = "hits"), deserialize_with = "null_default")]
    pub hits: CountPercent,
    #[serde(rename(serialize = "Visitors", deserialize = "visitors"), deserialize_with = "null_default")]
    pub visitors: CountPercent,
    #[serde(rename(serialize = "Data", deserialize = "data"), deserialize_with = "null_default")]
    pub data: String,
    #[serde(rename(serialize = "Items", deserialize = "items"), deserialize_with = "null_default_items")]
    pub items: Vec<SeriesPoint>,
}

/// A report section: its summary plus the ordered entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Panel<T> {
    #[serde(rename(serialize = "Metadata", deserialize = "metadata"), deserialize_with = "null_default")]
    pub metadata: Metadata,
    #[serde(rename(serialize = "Data", deserialize = "data"), deserialize_with = "null_default_items")]
    pub data: Vec<T>,
}

/// Daily visitors; entry labels are `YYYYMMDD` dates.
pub type Visitors = Panel<SeriesPoint>;
/// Requested paths; entry labels are URL paths.
pub type Requests = Panel<SeriesPoint>;
pub type Hosts = Panel<HostEntry>;
pub type OperatingSystems = Panel<OsEntry>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct General {
    #[serde(deserialize_with = "null_default")]
    pub start_date: String,
    #[serde(deserialize_with = "null_default")]
    pub end_date: String,
    #[serde(deserialize_with = "null_default")]
    pub date_time: String,
    #[serde(deserialize_with = "null_default")]
    pub total_requests: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    #[serde(rename(serialize = "General", deserialize = "general"), deserialize_with = "null_default")]
    pub general: General,
    #[serde(rename(serialize = "Visitors", deserialize = "visitors"), deserialize_with = "null_default")]
    pub visitors: Visitors,
    #[serde(rename(serialize = "Requests", deserialize = "requests"), deserialize_with = "null_default")]
    pub requests: Requests,
    #[serde(rename(serialize = "Hosts", deserialize = "hosts"), deserialize_with = "null_default")]
    pub hosts: Hosts,
    #[serde(rename(serialize = "OS", deserialize = "os"), deserialize_with = "null_default")]
    pub os: OperatingSystems,
}

fn null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_default_items<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items.into_iter().map(Option::unwrap_or_default).collect())
}

/// Lowercase every object key so field matching ignores case.
///
/// Keys that collide after folding keep the value that sorts last by its
/// original spelling.
fn fold_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key.to_lowercase(), fold_keys(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(fold_keys).collect()),
        other => other,
    }
}

/// Decode a complete report document. A `null` document is an empty report.
pub fn decode(raw: &[u8]) -> Result<Report> {
    let start_time = Instant::now();
    let document: Value = serde_json::from_slice(raw)?;
    let report = serde_json::from_value::<Option<Report>>(fold_keys(document))?
        .unwrap_or_default();

    info!(
        action = "decode",
        component = "report",
        bytes = raw.len(),
        visitor_points = report.visitors.data.len(),
        request_points = report.requests.data.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Decoded report"
    );
    Ok(report)
}

/// Read `reader` to the end, then decode it.
pub fn decode_reader<R: Read>(mut reader: R) -> Result<Report> {
    let mut raw = Vec::new();
    reader
        .read_to_end(&mut raw)
        .map_err(ReportError::InputRead)?;
    decode(&raw)
}
