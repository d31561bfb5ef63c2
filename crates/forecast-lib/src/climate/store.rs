//! Seasonal climate tables
//!
//! Loads the yearly temperature-by-season table and the yearly
//! rainfall-by-month table. Only the columns the synthesizer consumes are
//! read; everything else in the files is ignored.

use crate::error::InitializationError;
use crate::models::SeasonalRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Number of trailing rows averaged when a year is missing
pub const RECENT_WINDOW: usize = 5;

/// Values used when a table has no usable rows at all
pub const DEFAULT_WINTER_TEMP: f64 = 20.0;
pub const DEFAULT_PRE_MONSOON_TEMP: f64 = 25.0;
pub const DEFAULT_MONSOON_TEMP: f64 = 28.0;
pub const DEFAULT_POST_MONSOON_TEMP: f64 = 22.0;
pub const DEFAULT_ANNUAL_TEMP: f64 = 25.0;
pub const DEFAULT_MONTHLY_RAIN: f64 = 300.0;

const TEMPERATURE_COLUMNS: [&str; 5] = ["JAN-FEB", "MAR-MAY", "JUN-SEP", "OCT-DEC", "ANNUAL"];
const RAINFALL_COLUMNS: [&str; 4] = ["JUN", "JUL", "AUG", "SEP"];

/// One parsed table row: year plus the requested columns in order
#[derive(Debug, Clone)]
struct TableRow<const N: usize> {
    year: i32,
    values: [f64; N],
}

/// In-memory copy of both climate tables, rows kept in file order
#[derive(Debug, Clone, Default)]
pub struct SeasonalRecordStore {
    temperatures: Vec<TableRow<5>>,
    rainfall: Vec<TableRow<4>>,
}

impl SeasonalRecordStore {
    /// Load both tables from disk
    pub fn load(rainfall_csv: &Path, temperature_csv: &Path) -> Result<Self, InitializationError> {
        let rain_file = File::open(rainfall_csv)
            .map_err(|e| InitializationError::FileOpen(rainfall_csv.to_path_buf(), e))?;
        let temp_file = File::open(temperature_csv)
            .map_err(|e| InitializationError::FileOpen(temperature_csv.to_path_buf(), e))?;

        let store = Self {
            temperatures: parse_table(temp_file, temperature_csv, TEMPERATURE_COLUMNS)?,
            rainfall: parse_table(rain_file, rainfall_csv, RAINFALL_COLUMNS)?,
        };
        debug!(
            temperature_rows = store.temperatures.len(),
            rainfall_rows = store.rainfall.len(),
            "Climate tables loaded"
        );
        Ok(store)
    }

    /// Build a store from already-assembled records
    pub fn from_records(records: &[SeasonalRecord]) -> Self {
        Self {
            temperatures: records
                .iter()
                .map(|r| TableRow {
                    year: r.year,
                    values: [
                        r.winter_temp,
                        r.pre_monsoon_temp,
                        r.monsoon_temp,
                        r.post_monsoon_temp,
                        r.annual_temp,
                    ],
                })
                .collect(),
            rainfall: records
                .iter()
                .map(|r| TableRow {
                    year: r.year,
                    values: [r.jun_rain, r.jul_rain, r.aug_rain, r.sep_rain],
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty() && self.rainfall.is_empty()
    }

    /// The record for `year`, present only when both tables cover that year
    pub fn record_for(&self, year: i32) -> Option<SeasonalRecord> {
        let temp = self.temperatures.iter().find(|r| r.year == year)?;
        let rain = self.rainfall.iter().find(|r| r.year == year)?;
        Some(assemble(year, temp.values, rain.values))
    }

    /// Stand-in record built from the last [`RECENT_WINDOW`] rows of each
    /// table, falling back to fixed constants for an empty table
    pub fn recent_average(&self, year: i32) -> SeasonalRecord {
        let temp = tail_mean(&self.temperatures, RECENT_WINDOW).unwrap_or([
            DEFAULT_WINTER_TEMP,
            DEFAULT_PRE_MONSOON_TEMP,
            DEFAULT_MONSOON_TEMP,
            DEFAULT_POST_MONSOON_TEMP,
            DEFAULT_ANNUAL_TEMP,
        ]);
        let rain = tail_mean(&self.rainfall, RECENT_WINDOW).unwrap_or([DEFAULT_MONTHLY_RAIN; 4]);
        assemble(year, temp, rain)
    }
}

fn assemble(year: i32, temp: [f64; 5], rain: [f64; 4]) -> SeasonalRecord {
    SeasonalRecord {
        year,
        winter_temp: temp[0],
        pre_monsoon_temp: temp[1],
        monsoon_temp: temp[2],
        post_monsoon_temp: temp[3],
        annual_temp: temp[4],
        jun_rain: rain[0],
        jul_rain: rain[1],
        aug_rain: rain[2],
        sep_rain: rain[3],
    }
}

fn tail_mean<const N: usize>(rows: &[TableRow<N>], window: usize) -> Option<[f64; N]> {
    if rows.is_empty() {
        return None;
    }
    let tail = &rows[rows.len().saturating_sub(window)..];
    let mut sums = [0.0; N];
    for row in tail {
        for (sum, value) in sums.iter_mut().zip(row.values.iter()) {
            *sum += value;
        }
    }
    Some(sums.map(|s| s / tail.len() as f64))
}

fn parse_table<R: Read, const N: usize>(
    reader: R,
    source: &Path,
    columns: [&str; N],
) -> Result<Vec<TableRow<N>>, InitializationError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| InitializationError::Csv(source.to_path_buf(), e))?
        .clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| InitializationError::MissingColumn {
                path: source.to_path_buf(),
                column: name.to_string(),
            })
    };

    let year_idx = position("YEAR")?;
    let mut value_idx = [0usize; N];
    for (slot, name) in value_idx.iter_mut().zip(columns.iter()) {
        *slot = position(name)?;
    }

    let mut rows = Vec::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|e| InitializationError::Csv(source.to_path_buf(), e))?;
        let year = record.get(year_idx).and_then(parse_year);
        let values = value_idx.map(|idx| record.get(idx).and_then(parse_value));

        match (year, values.iter().all(Option::is_some)) {
            (Some(year), true) => rows.push(TableRow {
                year,
                values: values.map(|v| v.unwrap_or_default()),
            }),
            _ => warn!(
                path = %source.display(),
                line = line + 2,
                "Skipping climate row with missing or malformed values"
            ),
        }
    }
    Ok(rows)
}

fn parse_year(cell: &str) -> Option<i32> {
    cell.parse::<i32>()
        .ok()
        .or_else(|| cell.parse::<f64>().ok().filter(|y| y.fract() == 0.0).map(|y| y as i32))
}

fn parse_value(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}
