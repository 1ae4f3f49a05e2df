use crate::{
    dates::api_date,
    error::FetchError,
    model::{City, RecordType},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt::{self, Debug};

pub mod weatherapi;

pub use weatherapi::WeatherApiClient;

/// How far ahead `forecast.json` reaches; later dates go to `future.json`.
pub const FORECAST_HORIZON_DAYS: i64 = 14;

/// One call against the weather API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    History { city: City, date: NaiveDate },
    Current { city: City },
    Forecast { city: City, days: u32 },
    /// Forecast for a single day within the forecast horizon.
    ForecastOn { city: City, date: NaiveDate },
    /// Long-range forecast for a day beyond the forecast horizon.
    Future { city: City, date: NaiveDate },
    Alerts { city: City },
}

impl ApiRequest {
    /// Path segment under the API base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ApiRequest::History { .. } => "history.json",
            ApiRequest::Current { .. } => "current.json",
            ApiRequest::Forecast { .. } | ApiRequest::ForecastOn { .. } => "forecast.json",
            ApiRequest::Future { .. } => "future.json",
            ApiRequest::Alerts { .. } => "alerts.json",
        }
    }

    /// Kind of record the response decodes into. Alerts carry none.
    pub fn record_type(&self) -> Option<RecordType> {
        match self {
            ApiRequest::History { .. } => Some(RecordType::History),
            ApiRequest::Current { .. } => Some(RecordType::Current),
            ApiRequest::Forecast { .. }
            | ApiRequest::ForecastOn { .. }
            | ApiRequest::Future { .. } => Some(RecordType::Forecast),
            ApiRequest::Alerts { .. } => None,
        }
    }

    pub fn city(&self) -> &City {
        match self {
            ApiRequest::History { city, .. }
            | ApiRequest::Current { city }
            | ApiRequest::Forecast { city, .. }
            | ApiRequest::ForecastOn { city, .. }
            | ApiRequest::Future { city, .. }
            | ApiRequest::Alerts { city } => city,
        }
    }

    /// Query parameters, `key` first.
    pub fn query(&self, api_key: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![("key", api_key.to_string()), ("q", self.city().to_string())];
        match self {
            ApiRequest::History { date, .. }
            | ApiRequest::ForecastOn { date, .. }
            | ApiRequest::Future { date, .. } => params.push(("dt", api_date(*date))),
            ApiRequest::Current { .. } | ApiRequest::Alerts { .. } => {}
            ApiRequest::Forecast { days, .. } => params.push(("days", days.to_string())),
        }
        params
    }
}

/// Short description for logs. Never includes the API key.
impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiRequest::History { city, date } => write!(f, "history of {city} on {date}"),
            ApiRequest::Current { city } => write!(f, "current weather in {city}"),
            ApiRequest::Forecast { city, days } => write!(f, "{days}-day forecast for {city}"),
            ApiRequest::ForecastOn { city, date } => write!(f, "forecast for {city} on {date}"),
            ApiRequest::Future { city, date } => {
                write!(f, "long-range forecast for {city} on {date}")
            }
            ApiRequest::Alerts { city } => write!(f, "weather alerts for {city}"),
        }
    }
}

/// Which endpoint answers for a given day, relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRequest {
    Current,
    Past(NaiveDate),
    Forecast(NaiveDate),
    Future(NaiveDate),
}

impl DateRequest {
    pub fn record_type(&self) -> RecordType {
        match self {
            DateRequest::Current => RecordType::Current,
            DateRequest::Past(_) => RecordType::History,
            DateRequest::Forecast(_) | DateRequest::Future(_) => RecordType::Forecast,
        }
    }

    pub fn request(&self, city: City) -> ApiRequest {
        match *self {
            DateRequest::Current => ApiRequest::Current { city },
            DateRequest::Past(date) => ApiRequest::History { city, date },
            DateRequest::Forecast(date) => ApiRequest::ForecastOn { city, date },
            DateRequest::Future(date) => ApiRequest::Future { city, date },
        }
    }
}

/// No date, or today, means current conditions.
pub fn classify_date(today: NaiveDate, when: Option<NaiveDate>) -> DateRequest {
    let Some(date) = when else {
        return DateRequest::Current;
    };

    match date.signed_duration_since(today).num_days() {
        0 => DateRequest::Current,
        ahead if ahead < 0 => DateRequest::Past(date),
        ahead if ahead <= FORECAST_HORIZON_DAYS => DateRequest::Forecast(date),
        _ => DateRequest::Future(date),
    }
}

/// Source of raw response bodies.
#[async_trait]
pub trait Fetcher: Send + Sync + Debug {
    async fn fetch(&self, request: &ApiRequest) -> Result<String, FetchError>;
}
