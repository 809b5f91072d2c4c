//! Typed view of the WaterML-JSON documents returned by the `dv` and `iv`
//! services.
//!
//! Only the fields needed to build tables are required. A document missing one
//! of them fails to decode, which the fetcher treats like any other corrupt
//! response instead of failing later with an index error.

use serde::{Deserialize, Serialize};

/// Top-level WaterML-JSON response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterMlResponse {
    /// Document type tag, e.g. `ns1:timeSeriesResponseType`.
    #[serde(default)]
    pub name: Option<String>,
    pub value: TimeSeriesCollection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesCollection {
    pub time_series: Vec<TimeSeries>,
}

/// One parameter at one site, e.g. discharge at USGS 09163500.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub source_info: SourceInfo,
    pub variable: Variable,
    pub values: Vec<ValueSet>,
    /// `agency:site:parameter:statistic`, e.g. `USGS:09163500:00060:00003`.
    #[serde(default)]
    pub name: Option<String>,
}

impl TimeSeries {
    /// The first site code listed for the series, if any.
    pub fn site_code(&self) -> Option<&str> {
        self.source_info.site_code.first().map(|c| c.value.as_str())
    }

    /// The first parameter code listed for the series, if any.
    pub fn variable_code(&self) -> Option<&str> {
        self.variable.variable_code.first().map(|c| c.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub site_name: String,
    pub site_code: Vec<SiteCode>,
    #[serde(default)]
    pub geo_location: Option<GeoLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteCode {
    pub value: String,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub agency_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub geog_location: GeogLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeogLocation {
    #[serde(default)]
    pub srs: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub variable_code: Vec<VariableCode>,
    pub variable_name: String,
    #[serde(default)]
    pub variable_description: Option<String>,
    pub unit: Unit,
    /// Sentinel the service uses in place of a missing reading (usually `-999999`).
    #[serde(default)]
    pub no_data_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableCode {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub unit_code: String,
}

/// Readings for one method/sensor of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSet {
    pub value: Vec<Observation>,
    #[serde(default)]
    pub qualifier: Vec<Qualifier>,
}

/// A single reading. The service encodes the number as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub value: String,
    #[serde(default)]
    pub qualifiers: Vec<String>,
    pub date_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Qualifier {
    pub qualifier_code: String,
    #[serde(default)]
    pub qualifier_description: Option<String>,
}
