//! Reading an output file back and condensing it per city.

use anyhow::{Context, Result, anyhow};
use log::warn;
use std::{collections::BTreeMap, fmt::Write, fs, path::Path};

use crate::model::{CSV_HEADER, RecordType, WeatherRecord};

const COLUMN_COUNT: usize = 12;

/// Load every well-formed row of a file written by [`crate::sink::CsvSink`].
///
/// Condition text is written unquoted, so a row with more than twelve fields
/// is read with the surplus folded back into the condition column.
pub fn read_csv(path: impl AsRef<Path>) -> Result<Vec<WeatherRecord>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read weather file: {}", path.display()))?;

    let mut lines = contents.lines();
    let header = lines.next().map(|h| h.trim_start_matches('\u{feff}'));
    if header != Some(CSV_HEADER) {
        return Err(anyhow!(
            "{} does not look like a weather export (unexpected header).",
            path.display()
        ));
    }

    let mut records = Vec::new();
    for (n, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(line) {
            Ok(record) => records.push(record),
            // +2: one for the header, one for 1-based line numbers.
            Err(err) => warn!("{}:{}: skipping row: {err:#}", path.display(), n + 2),
        }
    }
    Ok(records)
}

fn parse_row(line: &str) -> Result<WeatherRecord> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < COLUMN_COUNT {
        return Err(anyhow!("expected {COLUMN_COUNT} columns, found {}", fields.len()));
    }

    let tail = fields.len() - 5;
    let num = |i: usize| -> Result<f64> {
        fields[i].trim().parse::<f64>().with_context(|| format!("bad number '{}'", fields[i]))
    };

    Ok(WeatherRecord {
        city: fields[0].to_string(),
        record_type: RecordType::try_from(fields[1])?,
        date: fields[2].to_string(),
        temperature_c: num(3)?,
        humidity_pct: fields[4]
            .trim()
            .parse()
            .with_context(|| format!("bad humidity '{}'", fields[4]))?,
        wind_kph: num(5)?,
        condition: fields[6..tail].join(","),
        precip_mm: num(tail)?,
        feels_like_c: num(tail + 1)?,
        visibility_km: num(tail + 2)?,
        uv: num(tail + 3)?,
        pressure_mb: num(tail + 4)?,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct CitySummary {
    pub city: String,
    pub counts: BTreeMap<RecordType, usize>,
    /// Rows per condition text, e.g. `"Light rain" -> 3`.
    pub conditions: BTreeMap<String, usize>,
    pub mean_temperature_c: f64,
    /// Record with the greatest date among the selected ones.
    pub latest: Option<WeatherRecord>,
}

/// Group `records` by city (case-insensitive), optionally narrowed to one
/// city and/or one record type. Cities come back in alphabetical order.
pub fn summarize(
    records: &[WeatherRecord],
    city: Option<&str>,
    record_type: Option<RecordType>,
) -> Vec<CitySummary> {
    let wanted_city = city.map(|c| c.trim().to_lowercase());
    let mut groups: BTreeMap<String, Vec<&WeatherRecord>> = BTreeMap::new();

    for record in records {
        let key = record.city.to_lowercase();
        if wanted_city.as_ref().is_some_and(|w| *w != key) {
            continue;
        }
        if record_type.is_some_and(|t| t != record.record_type) {
            continue;
        }
        groups.entry(key).or_default().push(record);
    }

    groups
        .into_values()
        .map(|group| {
            let mut counts = BTreeMap::new();
            let mut conditions = BTreeMap::new();
            for r in &group {
                *counts.entry(r.record_type).or_insert(0) += 1;
                *conditions.entry(r.condition.trim().to_string()).or_insert(0) += 1;
            }
            let total: f64 = group.iter().map(|r| r.temperature_c).sum();
            let latest = group.iter().max_by(|a, b| a.date.cmp(&b.date)).map(|r| (*r).clone());

            CitySummary {
                city: group[0].city.clone(),
                counts,
                conditions,
                mean_temperature_c: total / group.len() as f64,
                latest,
            }
        })
        .collect()
}

pub fn render_summary(summaries: &[CitySummary]) -> String {
    let mut out = String::new();
    for s in summaries {
        let _ = writeln!(out, "\n=== {} ===", s.city);
        let counts: Vec<String> = s.counts.iter().map(|(t, n)| format!("{t}: {n}")).collect();
        let _ = writeln!(out, "Records      : {}", counts.join(", "));
        let _ = writeln!(out, "Mean temp    : {:.1} °C", s.mean_temperature_c);
        let _ = writeln!(out, "Conditions   : {}", condition_breakdown(&s.conditions));
        if let Some(r) = &s.latest {
            let _ = writeln!(out, "Latest       : {} ({})", r.date, r.record_type);
            let _ = writeln!(
                out,
                "  Temp {:.1} °C | Humidity {}% | Wind {:.1} kph | UV {:.1} | Precip {:.1} mm | {}",
                r.temperature_c,
                r.humidity_pct,
                r.wind_kph,
                r.uv,
                r.precip_mm,
                r.condition
            );
        }
    }
    out
}

/// Most frequent condition first, ties alphabetical, with its share of rows.
fn condition_breakdown(conditions: &BTreeMap<String, usize>) -> String {
    let total: usize = conditions.values().sum();
    let mut ranked: Vec<(&String, &usize)> = conditions.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .map(|(name, n)| format!("{name} {n} ({:.0}%)", *n as f64 * 100.0 / total as f64))
        .collect::<Vec<_>>()
        .join(", ")
}
