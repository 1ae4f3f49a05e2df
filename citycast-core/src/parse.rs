//! Typed decoding of WeatherAPI.com response bodies into [`WeatherRecord`]s.
//!
//! A body is decoded one field group at a time (`location`, `current`,
//! `forecast`, each `forecastday` entry) so a failure names the group and,
//! through serde, the missing field. A broken day entry is skipped on its
//! own; anything wrong at the top level rejects the whole response.

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    error::ParseError,
    model::{DEFAULT_FORECAST_PRESSURE_MB, RecordType, WeatherRecord},
};

/// Records decoded from one response, plus the day entries that were dropped.
#[derive(Debug, Default)]
pub struct Parsed {
    pub records: Vec<WeatherRecord>,
    pub skipped: Vec<ParseError>,
}

/// A weather alert from `alerts.json`. Fields the API leaves out come back empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Alert {
    pub headline: String,
    pub event: String,
    pub severity: String,
    pub areas: String,
    pub effective: String,
    pub expires: String,
    pub desc: String,
}

pub fn parse(body: &str, record_type: RecordType, city: &str) -> Result<Parsed, ParseError> {
    let root = parse_root(body)?;

    match record_type {
        RecordType::Current => {
            let record = parse_current(&root, city)?;
            Ok(Parsed { records: vec![record], skipped: Vec::new() })
        }
        RecordType::History | RecordType::Forecast => parse_days(&root, record_type, city),
    }
}

/// Decode an `alerts.json` body. A response without an `alerts` object means no alerts.
pub fn parse_alerts(body: &str) -> Result<Vec<Alert>, ParseError> {
    let root = parse_root(body)?;
    match root.get("alerts") {
        Some(alerts) => Ok(decode::<WaAlerts>(alerts, "alerts")?.alert),
        None => Ok(Vec::new()),
    }
}

fn parse_root(body: &str) -> Result<Value, ParseError> {
    let root: Value = serde_json::from_str(body).map_err(ParseError::InvalidJson)?;

    if let Some(api_error) = root.get("error") {
        let api_error: WaError = decode(api_error, "error")?;
        return Err(ParseError::Api { code: api_error.code, message: api_error.message });
    }
    Ok(root)
}

fn parse_current(root: &Value, city: &str) -> Result<WeatherRecord, ParseError> {
    let location: WaLocation = group(root, "location")?;
    let current: WaCurrent = group(root, "current")?;

    Ok(WeatherRecord {
        city: city.to_string(),
        record_type: RecordType::Current,
        date: location.localtime,
        temperature_c: current.temp_c,
        humidity_pct: current.humidity as i64,
        wind_kph: current.wind_kph,
        condition: current.condition.text,
        precip_mm: current.precip_mm,
        feels_like_c: current.feelslike_c,
        visibility_km: current.vis_km,
        uv: current.uv,
        pressure_mb: current.pressure_mb,
    })
}

fn parse_days(root: &Value, record_type: RecordType, city: &str) -> Result<Parsed, ParseError> {
    let forecast: WaForecast = group(root, "forecast")?;
    let mut parsed = Parsed::default();

    for (i, entry) in forecast.forecastday.iter().enumerate() {
        let day: WaForecastDay = match decode(entry, format!("forecast.forecastday[{i}]")) {
            Ok(day) => day,
            Err(err) => {
                parsed.skipped.push(err);
                continue;
            }
        };

        // Daily aggregates have no feels-like or pressure; average temperature
        // and standard pressure stand in.
        parsed.records.push(WeatherRecord {
            city: city.to_string(),
            record_type,
            date: day.date,
            temperature_c: day.day.avgtemp_c,
            humidity_pct: day.day.avghumidity as i64,
            wind_kph: day.day.maxwind_kph,
            condition: day.day.condition.text,
            precip_mm: day.day.totalprecip_mm,
            feels_like_c: day.day.avgtemp_c,
            visibility_km: day.day.avgvis_km,
            uv: day.day.uv,
            pressure_mb: DEFAULT_FORECAST_PRESSURE_MB,
        });
    }

    Ok(parsed)
}

fn group<T: DeserializeOwned>(root: &Value, name: &'static str) -> Result<T, ParseError> {
    let value = root.get(name).ok_or(ParseError::MissingGroup(name))?;
    decode(value, name)
}

fn decode<T: DeserializeOwned>(value: &Value, group: impl Into<String>) -> Result<T, ParseError> {
    T::deserialize(value).map_err(|source| ParseError::InvalidGroup { group: group.into(), source })
}

#[derive(Debug, Deserialize)]
struct WaError {
    code: Option<i64>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    localtime: String,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    humidity: f64,
    wind_kph: f64,
    condition: WaCondition,
    precip_mm: f64,
    feelslike_c: f64,
    vis_km: f64,
    uv: f64,
    pressure_mb: f64,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    avgtemp_c: f64,
    avghumidity: f64,
    maxwind_kph: f64,
    condition: WaCondition,
    totalprecip_mm: f64,
    avgvis_km: f64,
    uv: f64,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    date: String,
    day: WaDay,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct WaAlerts {
    #[serde(default)]
    alert: Vec<Alert>,
}
