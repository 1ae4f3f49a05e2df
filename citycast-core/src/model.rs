use std::{convert::TryFrom, fmt};

/// Header row of the aggregated CSV file.
pub const CSV_HEADER: &str = "City,Type,Date,Temp(C),Humidity(%),Wind(kph),Condition,Precip(mm),FeelsLike(°C),Visibility(km),UV,Pressure(mb)";

/// The API omits pressure on daily entries, so history and forecast rows carry this value.
pub const DEFAULT_FORECAST_PRESSURE_MB: f64 = 1013.0;

/// A city name as typed by the operator. Not validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct City(String);

impl City {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for City {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for City {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordType {
    History,
    Current,
    Forecast,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::History => "History",
            RecordType::Current => "Current",
            RecordType::Forecast => "Forecast",
        }
    }

    pub const fn all() -> &'static [RecordType] {
        &[RecordType::History, RecordType::Current, RecordType::Forecast]
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RecordType {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "history" => Ok(RecordType::History),
            "current" => Ok(RecordType::Current),
            "forecast" => Ok(RecordType::Forecast),
            _ => Err(anyhow::anyhow!(
                "Unknown record type '{value}'. Supported types: history, current, forecast."
            )),
        }
    }
}

/// One observation, i.e. one row of the output file.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    pub city: String,
    pub record_type: RecordType,
    /// `YYYY-MM-DD` for daily rows, `YYYY-MM-DD HH:MM` for current conditions.
    pub date: String,
    pub temperature_c: f64,
    pub humidity_pct: i64,
    pub wind_kph: f64,
    pub condition: String,
    pub precip_mm: f64,
    pub feels_like_c: f64,
    pub visibility_km: f64,
    pub uv: f64,
    pub pressure_mb: f64,
}

impl WeatherRecord {
    /// Render as a CSV line without the trailing newline.
    ///
    /// Fields are not quoted, so a condition containing a comma spills into
    /// extra columns. `summary::read_csv` knows how to put it back together.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{:.1},{},{:.1},{},{:.1},{:.1},{:.1},{:.1},{:.1}",
            self.city,
            self.record_type,
            self.date,
            self.temperature_c,
            self.humidity_pct,
            self.wind_kph,
            self.condition,
            self.precip_mm,
            self.feels_like_c,
            self.visibility_km,
            self.uv,
            self.pressure_mb,
        )
    }
}
