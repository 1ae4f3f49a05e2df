use std::fmt::Write;

use crate::model::{RecordType, WeatherRecord};

const COLUMNS: &str = "Date         | Temp(C) | Hum(%) | Wind(kph) | Condition        | Precip(mm) | Feels(°C) | Vis(km) | UV | Pressure(mb)";
const RULE_WIDTH: usize = 111;

/// Human-readable table for one city and record type, as printed to stdout.
pub fn render_table(city: &str, record_type: RecordType, records: &[WeatherRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== {record_type} Weather for {city} ===");
    let _ = writeln!(out, "{COLUMNS}");
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));

    // Current conditions carry a time of day, daily rows only a date.
    let date_width = if record_type == RecordType::Current { 13 } else { 10 };
    for r in records {
        let _ = writeln!(
            out,
            "{:<date_width$} | {:<7.1} | {:<6} | {:<9.1} | {:<15} | {:<10.1} | {:<8.1} | {:<7.1} | {:<2.1} | {:<5.1}",
            r.date,
            r.temperature_c,
            r.humidity_pct,
            r.wind_kph,
            r.condition,
            r.precip_mm,
            r.feels_like_c,
            r.visibility_km,
            r.uv,
            r.pressure_mb,
        );
    }
    out
}
