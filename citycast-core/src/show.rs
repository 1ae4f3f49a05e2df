//! Weather for one city on one day, plus any active alerts.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::warn;
use std::fmt::Write;

use crate::{
    model::{City, RecordType, WeatherRecord},
    parse::{Alert, parse, parse_alerts},
    provider::{ApiRequest, DateRequest, Fetcher, classify_date},
};

#[derive(Debug, Clone)]
pub struct ShowReport {
    pub city: City,
    pub date_request: DateRequest,
    pub records: Vec<WeatherRecord>,
    /// `None` when alerts were not asked for or could not be fetched.
    pub alerts: Option<Vec<Alert>>,
}

impl ShowReport {
    pub fn record_type(&self) -> RecordType {
        self.date_request.record_type()
    }

    /// Heading in the style of "Weather on 2025-11-01".
    pub fn title(&self) -> String {
        match self.date_request {
            DateRequest::Current => "Current Weather".to_string(),
            DateRequest::Past(date) => format!("Weather on {date}"),
            DateRequest::Forecast(date) | DateRequest::Future(date) => {
                format!("Forecast for {date}")
            }
        }
    }
}

/// Fetch the weather for `city` on `when` (today when `None`).
///
/// A failed weather lookup is an error. A failed alerts lookup is only
/// logged, since the weather itself is still worth showing.
pub async fn lookup(
    fetcher: &dyn Fetcher,
    city: &City,
    today: NaiveDate,
    when: Option<NaiveDate>,
    with_alerts: bool,
) -> Result<ShowReport> {
    let date_request = classify_date(today, when);
    let request = date_request.request(city.clone());

    let body = fetcher.fetch(&request).await?;
    let parsed = parse(&body, date_request.record_type(), city.as_str())
        .with_context(|| format!("Could not read {request}"))?;
    for skipped in &parsed.skipped {
        warn!("skipping entry in {request}: {skipped}");
    }

    let alerts = if with_alerts { fetch_alerts(fetcher, city).await } else { None };

    Ok(ShowReport { city: city.clone(), date_request, records: parsed.records, alerts })
}

async fn fetch_alerts(fetcher: &dyn Fetcher, city: &City) -> Option<Vec<Alert>> {
    let request = ApiRequest::Alerts { city: city.clone() };
    let result = match fetcher.fetch(&request).await {
        Ok(body) => parse_alerts(&body).map_err(anyhow::Error::new),
        Err(err) => Err(anyhow::Error::new(err)),
    };

    result.inspect_err(|err| warn!("⚠️ {request} unavailable: {err:#}")).ok()
}

pub fn render_alerts(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return "\n✅ No active weather alerts.\n".to_string();
    }

    let mut out = format!("\n⚠️ {} active weather alert(s):\n", alerts.len());
    for alert in alerts {
        let severity = if alert.severity.is_empty() { "Unknown" } else { &alert.severity };
        let _ = writeln!(out, "- {} [{severity}]: {}", alert.event, alert.headline);
        if !alert.effective.is_empty() || !alert.expires.is_empty() {
            let _ = writeln!(out, "  From {} until {}", alert.effective, alert.expires);
        }
    }
    out
}
