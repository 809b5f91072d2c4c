//! Request types for the USGS water services API: which service to query,
//! which format to ask for, and how the query string is assembled.

use bon::Builder;
use chrono::NaiveDate;
use std::fmt;

/// Base URL of the legacy USGS water services (NWIS) API.
pub const DEFAULT_BASE_URL: &str = "https://waterservices.usgs.gov/nwis";

pub const DEFAULT_PERIOD: &str = "P365D";

/// The time-series granularity exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Service {
    /// One aggregate value per day (`dv`).
    #[default]
    DailyValues,
    /// Sub-hourly readings as reported by the gauge (`iv`).
    InstantaneousValues,
}

impl Service {
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            Service::DailyValues => "dv",
            Service::InstantaneousValues => "iv",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

/// Response body format. Decides both the `format=` query parameter and the
/// cache file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataFormat {
    /// Nested WaterML-JSON document.
    #[default]
    Json,
    /// USGS RDB: tab-separated text with `#` comment lines and a two-row header.
    Rdb,
}

impl DataFormat {
    pub(crate) fn query_value(&self) -> &'static str {
        match self {
            DataFormat::Json => "json",
            DataFormat::Rdb => "rdb",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.query_value()
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query_value())
    }
}

/// Filters sites by whether they are still reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SiteStatus {
    Active,
    Inactive,
    #[default]
    All,
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SiteStatus::Active => "active",
            SiteStatus::Inactive => "inactive",
            SiteStatus::All => "all",
        };
        write!(f, "{}", s)
    }
}

/// A fully resolved request: the URL to GET and the format it returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    pub url: String,
    pub format: DataFormat,
}

/// A time-series values query (`dv` or `iv`).
///
/// # Examples
///
/// ```
/// use waterdata::{DataFormat, DataRequest, Service, DEFAULT_BASE_URL};
///
/// let request = DataRequest::builder()
///     .sites("09163500")
///     .service(Service::InstantaneousValues)
///     .format(DataFormat::Rdb)
///     .build();
///
/// assert_eq!(
///     request.url(DEFAULT_BASE_URL),
///     "https://waterservices.usgs.gov/nwis/iv/?format=rdb&sites=09163500&period=P365D&siteStatus=all"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct DataRequest {
    /// One site number, or several separated by commas.
    #[builder(into)]
    sites: String,
    #[builder(default)]
    service: Service,
    #[builder(default)]
    format: DataFormat,
    /// ISO 8601 duration, e.g. `P7D` or `P1Y`. Ignored when either date is set.
    #[builder(into, default = String::from(DEFAULT_PERIOD))]
    period: String,
    #[builder(default)]
    site_status: SiteStatus,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl DataRequest {
    pub fn format(&self) -> DataFormat {
        self.format
    }

    pub fn url(&self, base_url: &str) -> String {
        let time_filter = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => format!(
                "startDT={}&endDT={}",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            ),
            (Some(start), None) => format!("startDT={}", start.format("%Y-%m-%d")),
            // the service decides whether an open start is acceptable
            (None, Some(end)) => format!("endDT={}", end.format("%Y-%m-%d")),
            (None, None) => format!("period={}", self.period),
        };
        format!(
            "{}/{}/?format={}&sites={}&{}&siteStatus={}",
            base_url.trim_end_matches('/'),
            self.service,
            self.format,
            self.sites,
            time_filter,
            self.site_status
        )
    }

    pub fn to_fetch_request(&self, base_url: &str) -> FetchRequest {
        FetchRequest {
            url: self.url(base_url),
            format: self.format,
        }
    }
}

/// Lists every monitoring site in a state. Only available as RDB.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct SiteRequest {
    /// Two-digit FIPS state code, e.g. `08` for Colorado.
    #[builder(into)]
    state_code: String,
    #[builder(default)]
    site_status: SiteStatus,
}

impl SiteRequest {
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/site/?format=rdb&stateCd={}&siteStatus={}",
            base_url.trim_end_matches('/'),
            self.state_code,
            self.site_status
        )
    }

    pub fn to_fetch_request(&self, base_url: &str) -> FetchRequest {
        FetchRequest {
            url: self.url(base_url),
            format: DataFormat::Rdb,
        }
    }
}
