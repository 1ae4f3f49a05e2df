use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{
    error::SinkError,
    model::{CSV_HEADER, WeatherRecord},
};

pub const DEFAULT_OUTPUT_FILE: &str = "all_cities_weather.csv";

/// Sole owner of the output file for the duration of a run.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CsvSink {
    /// Create or truncate `path` and write the header row.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| SinkError::Create(path.clone(), e))?;

        let mut writer = BufWriter::new(file);
        writeln!(writer, "{CSV_HEADER}")
            .and_then(|_| writer.flush())
            .map_err(|e| SinkError::Create(path.clone(), e))?;

        Ok(Self { path, writer })
    }

    /// Write `records` and flush. Returns the number of rows written.
    pub fn append(&mut self, records: &[WeatherRecord]) -> Result<usize, SinkError> {
        for record in records {
            writeln!(self.writer, "{}", record.to_csv_row())
                .map_err(|e| SinkError::Write(self.path.clone(), e))?;
        }
        self.writer.flush().map_err(|e| SinkError::Write(self.path.clone(), e))?;
        Ok(records.len())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
