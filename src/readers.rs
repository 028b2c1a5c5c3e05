/// Reader registry for the DISDRODB processing chain.
///
/// A reader describes the raw text format of one campaign: which files to
/// pick up, how to split them into columns, and how to standardize the
/// resulting dataframe (time parsing, column pruning, corrupt-row
/// filtering). Station metadata points at a reader through the
/// `<DATA_SOURCE>/<READER_NAME>` reference, and this registry is the
/// single source of truth for which references are valid.

use chrono::{Duration, NaiveDateTime};
use polars::prelude::*;

use crate::model::{DisdrodbError, Result};

// ---------------------------------------------------------------------------
// Reader specification
// ---------------------------------------------------------------------------

/// Raw-format description of a single campaign.
#[derive(Debug)]
pub struct ReaderSpec {
    /// Data source directory the reader belongs to (UPPER CASE).
    pub data_source: &'static str,
    /// Reader name, unique within the data source.
    pub name: &'static str,
    /// Wildcard pattern selecting raw files under `data/<station_name>/`.
    pub glob_pattern: &'static str,
    /// Field delimiter of the raw files.
    pub delimiter: u8,
    /// Header rows to skip before data starts.
    pub skip_rows: usize,
    /// Column names, in raw file order.
    pub column_names: &'static [&'static str],
    /// Strings treated as missing values on top of empty fields.
    pub na_values: &'static [&'static str],
    /// Standardizes a freshly read raw dataframe: must leave a
    /// millisecond-datetime `time` column and only L0A-standard columns.
    pub sanitizer: fn(DataFrame) -> Result<DataFrame>,
}

impl ReaderSpec {
    /// The `<DATA_SOURCE>/<READER_NAME>` reference of this reader.
    pub fn reference(&self) -> String {
        format!("{}/{}", self.data_source, self.name)
    }
}

// ---------------------------------------------------------------------------
// Shared dataframe helpers
// ---------------------------------------------------------------------------

/// Builds a millisecond-datetime series from per-row epoch values.
pub(crate) fn datetime_series_from_ms(name: &str, ms: Vec<Option<i64>>) -> Result<Series> {
    let series = Series::new(name, ms);
    Ok(series.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?)
}

/// Replaces the string `time` column with a datetime column parsed with a
/// campaign-specific chrono format. Unparseable values become null and are
/// dropped later by the L0A standardization step.
fn parse_time_column(mut df: DataFrame, format: &str) -> Result<DataFrame> {
    let ms: Vec<Option<i64>> = df
        .column("time")?
        .str()?
        .into_iter()
        .map(|value| {
            value
                .and_then(|s| NaiveDateTime::parse_from_str(s.trim(), format).ok())
                .map(|dt| dt.and_utc().timestamp_millis())
        })
        .collect();
    df.with_column(datetime_series_from_ms("time", ms)?)?;
    Ok(df)
}

fn drop_columns(mut df: DataFrame, columns: &[&str]) -> Result<DataFrame> {
    for column in columns {
        df = df.drop(column)?;
    }
    Ok(df)
}

// ---------------------------------------------------------------------------
// Campaign sanitizers
// ---------------------------------------------------------------------------

/// EPFL ROOF 2008: comma CSV with 4 header rows. Datalogger housekeeping
/// columns are not part of the L0A standards, and the packed spectrum
/// carries a stray trailing quote.
fn sanitize_epfl_roof_2008(df: DataFrame) -> Result<DataFrame> {
    let mut df = parse_time_column(df, "%Y-%m-%d %H:%M:%S")?;

    df = drop_columns(
        df,
        &[
            "id",
            "datalogger_voltage",
            "datalogger_temperature",
            "datalogger_debug",
            "datalogger_error",
        ],
    )?;

    let trimmed: Vec<Option<String>> = df
        .column("raw_drop_number")?
        .str()?
        .into_iter()
        .map(|value| value.map(|s| s.trim_end_matches('"').to_string()))
        .collect();
    df.with_column(Series::new("raw_drop_number", trimmed))?;
    Ok(df)
}

/// EPFL DAVOS 2009: semicolon CSV. One field packs the datalogger status
/// together with the rain rate; rows whose spectrum is not the full 4096
/// characters were truncated by the logger and are discarded.
fn sanitize_epfl_davos_2009(df: DataFrame) -> Result<DataFrame> {
    let mut df = df;

    // Split "<status>,<rainfall_rate_32bit>" on the first comma.
    let rate: Vec<Option<String>> = df
        .column("TO_BE_SPLITTED")?
        .str()?
        .into_iter()
        .map(|value| value.and_then(|s| s.split_once(',').map(|(_, rate)| rate.to_string())))
        .collect();
    df.with_column(Series::new("rainfall_rate_32bit", rate))?;

    df = drop_columns(
        df,
        &["id", "latitude", "longitude", "temp", "temp1", "temp2", "TO_BE_SPLITTED"],
    )?;

    df = df.drop_nulls(Some(&[
        "raw_drop_concentration".to_string(),
        "raw_drop_average_velocity".to_string(),
        "raw_drop_number".to_string(),
    ]))?;

    let full_spectrum: BooleanChunked = df
        .column("raw_drop_number")?
        .str()?
        .into_iter()
        .map(|value| value.map(|s| s.len() == 4096).unwrap_or(false))
        .collect();
    df = df.filter(&full_spectrum)?;

    parse_time_column(df, "%d-%m-%Y %H:%M:%S")
}

/// GPM GCPEX: semicolon CSV with compact timestamps and a sensor id field
/// that is not part of the L0A standards.
fn sanitize_gpm_gcpex(df: DataFrame) -> Result<DataFrame> {
    let df = parse_time_column(df, "%Y%m%d%H%M%S")?;
    drop_columns(df, &["sensor_id"])
}

/// NCAR UAH MIPS: comma CSV with the timestamp split over five columns
/// (day, month, year, HHMM, second) and a trailing field with no L0A
/// counterpart. The METAR weather code carries padding whitespace.
fn sanitize_ncar_uah_mips(mut df: DataFrame) -> Result<DataFrame> {
    let ms: Vec<Option<i64>> = {
        let day = df.column("day")?.str()?;
        let month = df.column("month")?.str()?;
        let year = df.column("year")?.str()?;
        let hour_minute = df.column("hour_minute")?.str()?;
        let second = df.column("second")?.str()?;
        (0..df.height())
            .map(|i| {
                let parts = (day.get(i), month.get(i), year.get(i), hour_minute.get(i), second.get(i));
                let (d, mo, y, hm, s) = match parts {
                    (Some(d), Some(mo), Some(y), Some(hm), Some(s)) => (d, mo, y, hm, s),
                    _ => return None,
                };
                let text = format!(
                    "{}-{}-{} {}:{}",
                    d.trim(),
                    mo.trim(),
                    y.trim(),
                    hm.trim(),
                    s.trim()
                );
                NaiveDateTime::parse_from_str(&text, "%d-%m-%Y %H%M:%S")
                    .ok()
                    .map(|dt| dt.and_utc().timestamp_millis())
            })
            .collect()
    };
    df.with_column(datetime_series_from_ms("time", ms)?)?;

    let trimmed: Vec<Option<String>> = df
        .column("weather_code_metar_4678")?
        .str()?
        .into_iter()
        .map(|value| value.map(|s| s.trim().to_string()))
        .collect();
    df.with_column(Series::new("weather_code_metar_4678", trimmed))?;

    drop_columns(
        df,
        &["unknown_field_to_drop", "day", "month", "year", "hour_minute", "second"],
    )
}

/// NCAR CCOPE 2015: line-oriented files. The first line holds the file
/// start time; every following line is a whitespace-packed record whose
/// first field is a MMSSmmm offset from that start time.
fn sanitize_ncar_ccope_2015(df: DataFrame) -> Result<DataFrame> {
    const RECORD_FIELDS: usize = 10;

    let lines = df.column("TO_PARSE")?.str()?;

    let start_line = lines
        .get(0)
        .ok_or_else(|| DisdrodbError::Parse("CCOPE file is empty".to_string()))?;
    let start_str: String = start_line.chars().take(16).collect();
    let start_time = NaiveDateTime::parse_from_str(start_str.trim(), "%m/%d/%Y %H:%M")
        .map_err(|e| DisdrodbError::Parse(format!("bad CCOPE start time '{}': {}", start_str, e)))?;

    let mut time_ms: Vec<Option<i64>> = Vec::new();
    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); RECORD_FIELDS - 1];

    for line in lines.into_iter().skip(1).flatten() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != RECORD_FIELDS {
            continue; // malformed record
        }

        // MMSSmmm offset relative to the file start time.
        let offset = fields[0];
        if offset.len() < 4 {
            continue;
        }
        let minutes: i64 = match offset[0..2].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let seconds: i64 = match offset[2..4].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let timestamp = start_time + Duration::minutes(minutes) + Duration::seconds(seconds);
        time_ms.push(Some(timestamp.and_utc().timestamp_millis()));

        for (slot, field) in columns.iter_mut().zip(&fields[1..]) {
            slot.push(Some(field.to_string()));
        }
    }

    let column_names = [
        "rainfall_rate_32bit",
        "rainfall_accumulated_32bit",
        "reflectivity_32bit",
        "number_particles",
        "sensor_status",
        "error_code",
        "raw_drop_concentration",
        "raw_drop_average_velocity",
        "raw_drop_number",
    ];

    let mut series = vec![datetime_series_from_ms("time", time_ms)?];
    for (name, values) in column_names.iter().zip(columns) {
        series.push(Series::new(name, values));
    }
    Ok(DataFrame::new(series)?)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// All campaign readers known to this release.
pub static READER_REGISTRY: &[ReaderSpec] = &[
    ReaderSpec {
        data_source: "EPFL",
        name: "EPFL_ROOF_2008",
        glob_pattern: "*.dat",
        delimiter: b',',
        skip_rows: 4,
        column_names: &[
            "time",
            "id",
            "datalogger_temperature",
            "datalogger_voltage",
            "rainfall_rate_32bit",
            "rainfall_accumulated_32bit",
            "weather_code_synop_4680",
            "weather_code_synop_4677",
            "reflectivity_32bit",
            "mor_visibility",
            "laser_amplitude",
            "number_particles",
            "sensor_temperature",
            "sensor_heating_current",
            "sensor_battery_voltage",
            "sensor_status",
            "rainfall_amount_absolute_32bit",
            "datalogger_debug",
            "raw_drop_concentration",
            "raw_drop_average_velocity",
            "raw_drop_number",
            "datalogger_error",
        ],
        na_values: &["na", "error"],
        sanitizer: sanitize_epfl_roof_2008,
    },
    ReaderSpec {
        data_source: "EPFL",
        name: "DAVOS_2009",
        glob_pattern: "*.dat",
        delimiter: b';',
        skip_rows: 0,
        column_names: &[
            "id",
            "latitude",
            "longitude",
            "time",
            "temp",
            "TO_BE_SPLITTED",
            "rainfall_accumulated_32bit",
            "weather_code_synop_4680",
            "weather_code_synop_4677",
            "reflectivity_32bit",
            "mor_visibility",
            "sample_interval",
            "laser_amplitude",
            "number_particles",
            "sensor_heating_current",
            "sensor_battery_voltage",
            "sensor_status",
            "rainfall_amount_absolute_32bit",
            "temp1",
            "raw_drop_concentration",
            "raw_drop_average_velocity",
            "raw_drop_number",
            "temp2",
        ],
        na_values: &["na", "error", "NA"],
        sanitizer: sanitize_epfl_davos_2009,
    },
    ReaderSpec {
        data_source: "GPM",
        name: "GCPEX",
        glob_pattern: "*.txt",
        delimiter: b';',
        skip_rows: 0,
        column_names: &[
            "time",
            "sensor_id",
            "sensor_status",
            "sensor_temperature",
            "number_particles",
            "rainfall_rate_32bit",
            "reflectivity_32bit",
            "mor_visibility",
            "weather_code_synop_4680",
            "weather_code_synop_4677",
            "raw_drop_number",
        ],
        na_values: &["na", "error", "NA", "-.-"],
        sanitizer: sanitize_gpm_gcpex,
    },
    ReaderSpec {
        data_source: "NCAR",
        name: "CCOPE_2015",
        glob_pattern: "*.txt",
        // Raw lines are consumed whole; 0x01 never occurs in the data.
        delimiter: 0x01,
        skip_rows: 0,
        column_names: &["TO_PARSE"],
        na_values: &[],
        sanitizer: sanitize_ncar_ccope_2015,
    },
    ReaderSpec {
        data_source: "NCAR",
        name: "UAH_MIPS",
        glob_pattern: "*.dat",
        delimiter: b',',
        skip_rows: 0,
        column_names: &[
            "day",
            "month",
            "year",
            "hour_minute",
            "second",
            "rainfall_rate_32bit",
            "rainfall_accumulated_32bit",
            "weather_code_metar_4678",
            "reflectivity_16bit",
            "mor_visibility",
            "raw_drop_concentration",
            "raw_drop_average_velocity",
            "raw_drop_number",
            "unknown_field_to_drop",
        ],
        na_values: &["na", "error"],
        sanitizer: sanitize_ncar_uah_mips,
    },
];

/// Lists reader references, optionally restricted to one data source.
pub fn available_readers(data_source: Option<&str>) -> Vec<String> {
    READER_REGISTRY
        .iter()
        .filter(|r| data_source.map(|ds| r.data_source == ds).unwrap_or(true))
        .map(|r| r.reference())
        .collect()
}

/// Resolves a `<DATA_SOURCE>/<READER_NAME>` reference against the registry.
pub fn check_reader_reference(reference: &str) -> Result<&'static ReaderSpec> {
    let (data_source, name) = reference.split_once('/').ok_or_else(|| {
        DisdrodbError::ReaderNotFound(format!(
            "'{}' is not a valid reader reference, expected '<DATA_SOURCE>/<READER_NAME>'",
            reference
        ))
    })?;
    if name.contains('/') || data_source.is_empty() || name.is_empty() {
        return Err(DisdrodbError::ReaderNotFound(format!(
            "'{}' is not a valid reader reference, expected '<DATA_SOURCE>/<READER_NAME>'",
            reference
        )));
    }

    READER_REGISTRY
        .iter()
        .find(|r| r.data_source == data_source && r.name == name)
        .ok_or_else(|| {
            DisdrodbError::ReaderNotFound(format!(
                "'{}'; available readers: {:?}",
                reference,
                available_readers(None)
            ))
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
