use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::Result;

/// Each event consists of a set of key-value-pairs with the measured data of one simulation step.
/// This enum specifies all allowed key values and thus the column in the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatParameter {
    /// Name of the evaluated strategy.
    Strategy,

    /// Index of the simulation step.
    Step,

    /// Capacity budget of the step.
    Capacity,

    // Arrivals
    /// Units drawn by the arrival generator.
    Generated,

    /// Units that left the buffer over the link.
    Transmitted,

    /// Units removed because their lifetime ran out.
    Expired,

    /// Arrivals rejected by the buffer limits.
    Dropped,

    // Buffer
    /// Units resident at the end of the step.
    BufferUnits,

    /// Aggregate size of the resident units at the end of the step.
    BufferLoad,
}

impl StatParameter {
    /// Columns of the CSV output in their defined order.
    pub const ALL: [StatParameter; 9] = [
        StatParameter::Strategy,
        StatParameter::Step,
        StatParameter::Capacity,
        StatParameter::Generated,
        StatParameter::Transmitted,
        StatParameter::Expired,
        StatParameter::Dropped,
        StatParameter::BufferUnits,
        StatParameter::BufferLoad,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            StatParameter::Strategy => "Strategy",
            StatParameter::Step => "Step",
            StatParameter::Capacity => "Capacity",
            StatParameter::Generated => "Generated",
            StatParameter::Transmitted => "Transmitted",
            StatParameter::Expired => "Expired",
            StatParameter::Dropped => "Dropped",
            StatParameter::BufferUnits => "BufferUnits",
            StatParameter::BufferLoad => "BufferLoad",
        }
    }

    /// Returns the defined order of columns for the CSV header
    pub fn headers() -> Vec<&'static str> {
        Self::ALL.iter().map(StatParameter::header).collect()
    }
}

/// store values in their native format, only format them when writing to the CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl StatValue {
    fn to_field(&self) -> String {
        match self {
            StatValue::Integer(i) => i.to_string(),
            StatValue::Float(f) => f.to_string(),
            StatValue::Text(t) => t.clone(),
        }
    }
}

// Automatic conversion helpers
impl From<u64> for StatValue {
    fn from(v: u64) -> Self {
        StatValue::Integer(v as i64)
    }
}

impl From<usize> for StatValue {
    fn from(v: usize) -> Self {
        StatValue::Integer(v as i64)
    }
}

impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        StatValue::Integer(v)
    }
}

impl From<f64> for StatValue {
    fn from(v: f64) -> Self {
        StatValue::Float(v)
    }
}

impl From<String> for StatValue {
    fn from(v: String) -> Self {
        StatValue::Text(v)
    }
}

impl From<&str> for StatValue {
    fn from(v: &str) -> Self {
        StatValue::Text(v.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatisticEvent {
    data: HashMap<StatParameter, StatValue>,
}

impl StatisticEvent {
    pub fn new() -> Self {
        Self { data: HashMap::new() }
    }

    pub fn set<V: Into<StatValue>>(&mut self, param: StatParameter, value: V) -> &mut Self {
        self.data.insert(param, value.into());
        self
    }

    pub fn get(&self, param: StatParameter) -> Option<&StatValue> {
        self.data.get(&param)
    }

    /// Fields in header order, `NA` for parameters that were not set.
    fn to_row(&self) -> Vec<String> {
        StatParameter::ALL.iter().map(|param| self.get(*param).map_or_else(|| "NA".to_string(), StatValue::to_field)).collect()
    }
}

/// Semicolon separated per-step statistics output.
pub struct StatsWriter {
    writer: csv::Writer<Box<dyn Write>>,
    rows: u64,
}

impl StatsWriter {
    /// Creates the file at `path`, including missing parent directories, and writes the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        log::info!("Writing step statistics to '{}'.", path.display());
        Self::from_writer(Box::new(file))
    }

    pub fn from_writer(writer: Box<dyn Write>) -> Result<Self> {
        let mut csv_wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);
        csv_wtr.write_record(StatParameter::headers())?;

        Ok(StatsWriter { writer: csv_wtr, rows: 0 })
    }

    pub fn add_event(&mut self, event: &StatisticEvent) -> Result<()> {
        if let Err(e) = self.writer.write_record(event.to_row()) {
            log::error!("Stats Error: Failed to write record: {}", e);
            return Err(e.into());
        }
        self.rows += 1;
        Ok(())
    }

    /// Number of records written so far, header excluded.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for StatsWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsWriter").field("rows", &self.rows).finish()
    }
}

impl Drop for StatsWriter {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            log::error!("Stats Error: Failed to flush statistics: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_are_written_as_na() {
        let mut event = StatisticEvent::new();
        event.set(StatParameter::Strategy, "fifo").set(StatParameter::Step, 3u64).set(StatParameter::Capacity, 12u64);

        let row = event.to_row();

        assert_eq!(row.len(), StatParameter::headers().len());
        assert_eq!(&row[..4], &["fifo", "3", "12", "NA"]);
    }

    #[test]
    fn file_starts_with_header() {
        let path = std::env::temp_dir().join(format!("relay_stats_{}.csv", std::process::id()));
        {
            let mut writer = StatsWriter::create(&path).unwrap();
            let mut event = StatisticEvent::new();
            event.set(StatParameter::Strategy, "dqn");
            writer.add_event(&event).unwrap();
            assert_eq!(writer.rows(), 1);
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        let mut lines = content.lines();

        assert_eq!(lines.next(), Some("Strategy;Step;Capacity;Generated;Transmitted;Expired;Dropped;BufferUnits;BufferLoad"));
        assert_eq!(lines.next(), Some("dqn;NA;NA;NA;NA;NA;NA;NA;NA"));
    }
}
