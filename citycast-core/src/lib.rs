//! Core library for the `citycast` CLI.
//!
//! This crate defines:
//! - The weather record model and its CSV rendering
//! - The WeatherAPI.com client behind the `Fetcher` seam
//! - Typed decoding of API responses
//! - The worker pool that fetches cities in parallel and the single CSV writer
//! - Single-city lookups for any date, with weather alerts
//! - Configuration & credentials handling
//!
//! It is used by `citycast-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod dates;
pub mod error;
pub mod input;
pub mod model;
pub mod parse;
pub mod partition;
pub mod pipeline;
pub mod provider;
pub mod show;
pub mod sink;
pub mod summary;
pub mod table;

pub use config::{Config, Overrides, Settings};
pub use error::{FetchError, ParseError, SinkError};
pub use model::{CSV_HEADER, City, RecordType, WeatherRecord};
pub use pipeline::{Pipeline, RunOptions, RunSummary};
pub use provider::{ApiRequest, DateRequest, Fetcher, WeatherApiClient, classify_date};
pub use show::ShowReport;
pub use sink::CsvSink;
