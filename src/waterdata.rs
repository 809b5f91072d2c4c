//! This module provides the main entry point for retrieving USGS water data.
//! It builds request URLs, maps them to cache files and hands out decoded
//! payloads or ready-to-plot frames.

use crate::cache::key::CacheLocation;
use crate::error::WaterDataError;
use crate::tables::rdb::prepare_rdb_frame;
use crate::tables::time_series::time_series_frame;
use crate::types::request::{
    DataFormat, DataRequest, FetchRequest, Service, SiteRequest, SiteStatus, DEFAULT_BASE_URL,
};
use crate::types::water_ml::WaterMlResponse;
use crate::utils::get_cache_dir;
use crate::water_data::cached_fetcher::CachedFetcher;
use crate::water_data::format::{JsonFormat, RdbFormat};
use crate::water_data::transport::{HttpTransport, ReqwestTransport};
use bon::bon;
use chrono::NaiveDate;
use polars::frame::DataFrame;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A decoded response of either format.
#[derive(Debug, Clone)]
pub enum Payload {
    TimeSeries(WaterMlResponse),
    Table(DataFrame),
}

/// The main client struct for accessing USGS water data.
///
/// Every response goes through an on-disk cache: a request whose URL was seen
/// before is answered from its cache file without touching the network.
/// Cache entries never expire; delete the files to force a refresh.
///
/// Create an instance using [`WaterData::new()`] for the default cache
/// directory, [`WaterData::with_cache_folder()`] for a custom one, or
/// [`WaterData::with_transport()`] to supply the HTTP layer.
///
/// # Examples
///
/// ```no_run
/// # use waterdata::{WaterData, WaterDataError};
/// # async fn run() -> Result<(), WaterDataError> {
/// let client = WaterData::new()?;
/// let discharge = client
///     .time_series_frame()
///     .sites("09163500")
///     .period("P7D")
///     .call()
///     .await?;
/// println!("{}", discharge.head(Some(5)));
/// # Ok(())
/// # }
/// ```
pub struct WaterData<T = ReqwestTransport> {
    cache_dir: PathBuf,
    base_url: String,
    time_series: CachedFetcher<JsonFormat<WaterMlResponse>, T>,
    tables: CachedFetcher<RdbFormat, T>,
}

impl WaterData<ReqwestTransport> {
    /// Creates a client caching into `<system cache dir>/waterdata_rs_cache`
    /// (e.g. `~/.cache/waterdata_rs_cache` on Linux).
    ///
    /// # Errors
    ///
    /// Returns [`WaterDataError::CacheDirResolution`] if the platform has no
    /// cache directory.
    pub fn new() -> Result<Self, WaterDataError> {
        let cache_folder = get_cache_dir().ok_or(WaterDataError::CacheDirResolution)?;
        Ok(Self::with_cache_folder(cache_folder))
    }

    /// Creates a client caching into `cache_folder`. The folder is created on
    /// the first write, not here.
    pub fn with_cache_folder(cache_folder: PathBuf) -> Self {
        Self::with_transport(cache_folder, ReqwestTransport::new())
    }
}

#[bon]
impl<T: HttpTransport> WaterData<T> {
    pub fn with_transport(cache_folder: PathBuf, transport: T) -> Self {
        let transport = Arc::new(transport);
        Self {
            cache_dir: cache_folder,
            base_url: DEFAULT_BASE_URL.to_string(),
            time_series: CachedFetcher::new(transport.clone()),
            tables: CachedFetcher::new(transport),
        }
    }

    /// Points the client at another deployment of the service (a mirror, or a
    /// local stub in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The file a request is cached in under `location`.
    pub fn cache_path(&self, request: &FetchRequest, location: &CacheLocation) -> PathBuf {
        location.resolve(&self.cache_dir, &request.url, request.format)
    }

    /// Fetches any prepared request, decoding it according to its format.
    ///
    /// Returns `None` when the data could not be retrieved; the reason is
    /// logged.
    pub async fn fetch(&self, request: &FetchRequest, location: &CacheLocation) -> Option<Payload> {
        let cache_path = self.cache_path(request, location);
        match request.format {
            DataFormat::Json => self
                .time_series
                .fetch(&request.url, &cache_path)
                .await
                .map(Payload::TimeSeries),
            DataFormat::Rdb => self
                .tables
                .fetch(&request.url, &cache_path)
                .await
                .map(Payload::Table),
        }
    }

    /// Fetches a WaterML-JSON document from `url`, cached under a name derived
    /// from the URL.
    pub async fn fetch_time_series(&self, url: &str) -> Option<WaterMlResponse> {
        let cache_path = CacheLocation::Derived.resolve(&self.cache_dir, url, DataFormat::Json);
        self.time_series.fetch(url, &cache_path).await
    }

    /// Fetches an RDB table from `url`, cached under a name derived from the URL.
    pub async fn fetch_table(&self, url: &str) -> Option<DataFrame> {
        let cache_path = CacheLocation::Derived.resolve(&self.cache_dir, url, DataFormat::Rdb);
        self.tables.fetch(url, &cache_path).await
    }

    /// Fetches the WaterML-JSON time series for one or more sites.
    ///
    /// # Arguments
    ///
    /// * `.sites(&str)`: **Required.** Site number, or several separated by commas.
    /// * `.service(Service)`: Optional. Daily or instantaneous values. Defaults to daily.
    /// * `.period(&str)`: Optional. ISO 8601 duration. Defaults to `P365D`.
    /// * `.start_date(NaiveDate)` / `.end_date(NaiveDate)`: Optional. Replace the period.
    /// * `.site_status(SiteStatus)`: Optional. Defaults to [`SiteStatus::All`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use waterdata::{Service, WaterData, WaterDataError};
    /// # async fn run() -> Result<(), WaterDataError> {
    /// let client = WaterData::new()?;
    /// if let Some(response) = client
    ///     .time_series()
    ///     .sites("09163500")
    ///     .service(Service::InstantaneousValues)
    ///     .call()
    ///     .await
    /// {
    ///     println!("{} series", response.value.time_series.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn time_series(
        &self,
        sites: &str,
        service: Option<Service>,
        period: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        site_status: Option<SiteStatus>,
    ) -> Option<WaterMlResponse> {
        let request = values_request(
            sites,
            DataFormat::Json,
            service,
            period,
            start_date,
            end_date,
            site_status,
        );
        self.fetch_time_series(&request.url(&self.base_url)).await
    }

    /// Fetches the RDB values table for one or more sites, as strings.
    ///
    /// Takes the same arguments as [`Self::time_series`]. Use
    /// [`Self::values_frame`] for typed columns.
    #[builder]
    pub async fn values_table(
        &self,
        sites: &str,
        service: Option<Service>,
        period: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        site_status: Option<SiteStatus>,
    ) -> Option<DataFrame> {
        let request = values_request(
            sites,
            DataFormat::Rdb,
            service,
            period,
            start_date,
            end_date,
            site_status,
        );
        self.fetch_table(&request.url(&self.base_url)).await
    }

    /// Lists the monitoring sites of a state.
    ///
    /// By default the listing is cached under a name derived from its URL.
    /// Passing `.cache_file(path)` pins it to that file instead, which every
    /// state and status then shares.
    #[builder]
    pub async fn site_listing(
        &self,
        state_code: &str,
        site_status: Option<SiteStatus>,
        cache_file: Option<PathBuf>,
    ) -> Option<DataFrame> {
        let request = SiteRequest::builder()
            .state_code(state_code)
            .maybe_site_status(site_status)
            .build()
            .to_fetch_request(&self.base_url);
        let location = cache_file.map_or(CacheLocation::Derived, CacheLocation::Fixed);
        let cache_path = self.cache_path(&request, &location);
        self.tables.fetch(&request.url, &cache_path).await
    }

    /// Fetches one time series and flattens it into a frame with columns
    /// `timestamp`, `value`, `units`, `qualifiers`, `site_name`, `site_code`
    /// and `variable_code`.
    ///
    /// Takes the arguments of [`Self::time_series`] plus `.series_index(usize)`
    /// (default `0`) to pick a series when the response has several, and
    /// `.method_index(usize)` (default `0`) to pick one of its value sets.
    ///
    /// # Errors
    ///
    /// * [`WaterDataError::NoData`] if the response could not be retrieved.
    /// * [`WaterDataError::Table`] if the response holds no usable series.
    #[builder]
    pub async fn time_series_frame(
        &self,
        sites: &str,
        service: Option<Service>,
        period: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        site_status: Option<SiteStatus>,
        series_index: Option<usize>,
        method_index: Option<usize>,
    ) -> Result<DataFrame, WaterDataError> {
        let url = values_request(
            sites,
            DataFormat::Json,
            service,
            period,
            start_date,
            end_date,
            site_status,
        )
        .url(&self.base_url);
        let response = self
            .fetch_time_series(&url)
            .await
            .ok_or(WaterDataError::NoData { url })?;
        Ok(time_series_frame(
            &response,
            series_index.unwrap_or(0),
            method_index.unwrap_or(0),
        )?)
    }

    /// Fetches the RDB values table and types it: `datetime` as a datetime
    /// column, every parameter column as `Float64`.
    ///
    /// # Errors
    ///
    /// * [`WaterDataError::NoData`] if the table could not be retrieved.
    /// * [`WaterDataError::Table`] if the table has no parseable `datetime` column.
    #[builder]
    pub async fn values_frame(
        &self,
        sites: &str,
        service: Option<Service>,
        period: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        site_status: Option<SiteStatus>,
    ) -> Result<DataFrame, WaterDataError> {
        let url = values_request(
            sites,
            DataFormat::Rdb,
            service,
            period,
            start_date,
            end_date,
            site_status,
        )
        .url(&self.base_url);
        let table = self
            .fetch_table(&url)
            .await
            .ok_or(WaterDataError::NoData { url })?;
        Ok(prepare_rdb_frame(table)?)
    }
}

fn values_request(
    sites: &str,
    format: DataFormat,
    service: Option<Service>,
    period: Option<&str>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    site_status: Option<SiteStatus>,
) -> DataRequest {
    DataRequest::builder()
        .sites(sites)
        .format(format)
        .maybe_service(service)
        .maybe_period(period)
        .maybe_start_date(start_date)
        .maybe_end_date(end_date)
        .maybe_site_status(site_status)
        .build()
}
