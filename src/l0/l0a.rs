/// L0A processing: raw campaign text files to a standardized Parquet table.
///
/// Each raw file is read as an all-string, headerless CSV according to the
/// station's reader spec, standardized by the reader sanitizer, cast to
/// the L0A column standards, and the per-file frames are concatenated into
/// a single time-sorted Parquet product.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;

use crate::archive::{self, StationKey};
use crate::logging::{self, Stage};
use crate::metadata::StationMetadata;
use crate::model::{
    DisdrodbError, ProcessingOptions, ProductLevel, Result, DEBUGGING_MODE_FILE_LIMIT,
};
use crate::readers::{self, ReaderSpec};

// ---------------------------------------------------------------------------
// L0A column standards
// ---------------------------------------------------------------------------

/// Target dtype of a standard L0A column.
///
/// Packed spectrum fields stay strings until L0B unpacks them; unknown
/// columns are left as read.
pub fn l0a_dtype(column: &str) -> Option<DataType> {
    match column {
        "rainfall_rate_32bit"
        | "rainfall_accumulated_32bit"
        | "rainfall_amount_absolute_32bit"
        | "reflectivity_32bit"
        | "reflectivity_16bit"
        | "sensor_temperature"
        | "sensor_heating_current"
        | "sensor_battery_voltage"
        | "sample_interval" => Some(DataType::Float64),
        "weather_code_synop_4680"
        | "weather_code_synop_4677"
        | "mor_visibility"
        | "laser_amplitude"
        | "number_particles"
        | "sensor_status"
        | "error_code" => Some(DataType::Int64),
        "raw_drop_number" | "raw_drop_concentration" | "raw_drop_average_velocity" => None,
        _ => None,
    }
}

/// Columns holding packed spectra, excluded from numeric L0B variables.
pub const SPECTRUM_COLUMNS: [&str; 3] = [
    "raw_drop_number",
    "raw_drop_concentration",
    "raw_drop_average_velocity",
];

// ---------------------------------------------------------------------------
// Raw file reading
// ---------------------------------------------------------------------------

/// Reads one raw file into a sanitized, dtype-standardized dataframe.
pub fn read_raw_file(path: &Path, spec: &ReaderSpec) -> Result<DataFrame> {
    let null_values: Vec<String> = spec.na_values.iter().map(|s| s.to_string()).collect();

    let mut df = CsvReadOptions::default()
        .with_has_header(false)
        .with_skip_rows(spec.skip_rows)
        .with_ignore_errors(true)
        .with_infer_schema_length(Some(0)) // keep everything as strings
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(spec.delimiter)
                .with_truncate_ragged_lines(true)
                .with_null_values(Some(NullValues::AllColumns(null_values))),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    if df.width() != spec.column_names.len() {
        return Err(DisdrodbError::Parse(format!(
            "{}: expected {} columns for reader {}, found {}",
            path.display(),
            spec.column_names.len(),
            spec.reference(),
            df.width()
        )));
    }
    df.set_column_names(spec.column_names)?;

    let df = (spec.sanitizer)(df)?;
    standardize_l0a(df)
}

/// Applies the L0A standards to a sanitized frame: dtype casts, null-time
/// removal, duplicate-timestep removal (keep first), time sorting.
pub fn standardize_l0a(mut df: DataFrame) -> Result<DataFrame> {
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for name in &names {
        if let Some(dtype) = l0a_dtype(name) {
            let casted = df.column(name)?.cast(&dtype)?;
            df.with_column(casted)?;
        }
    }

    let subset = ["time".to_string()];
    let df = df
        .drop_nulls(Some(&subset))?
        .sort(["time"], SortMultipleOptions::default().with_maintain_order(true))?;

    // Duplicate timesteps: keep the first occurrence.
    let time = df.column("time")?.datetime()?;
    let mut keep = Vec::with_capacity(df.height());
    let mut previous: Option<i64> = None;
    for value in time.into_iter() {
        keep.push(value != previous);
        previous = value;
    }
    let mask = BooleanChunked::from_slice("keep", &keep);
    Ok(df.filter(&mask)?)
}

// ---------------------------------------------------------------------------
// Time range
// ---------------------------------------------------------------------------

/// Minimum and maximum observation times of a standardized frame.
pub fn time_range(df: &DataFrame) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let time = df.column("time")?.datetime()?;
    let (start_ms, end_ms) = match (time.min(), time.max()) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(DisdrodbError::NoDataFound(
                "no valid timesteps after standardization".to_string(),
            ))
        }
    };
    let to_naive = |ms: i64| -> Result<NaiveDateTime> {
        DateTime::from_timestamp_millis(ms)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| DisdrodbError::Parse(format!("timestamp {} out of range", ms)))
    };
    Ok((to_naive(start_ms)?, to_naive(end_ms)?))
}

// ---------------------------------------------------------------------------
// Station processing
// ---------------------------------------------------------------------------

/// Produces the L0A product of one station. Returns the written filepath.
pub fn process_station(
    base_dir: &Path,
    station: &StationKey,
    metadata: &StationMetadata,
    options: &ProcessingOptions,
) -> Result<PathBuf> {
    let spec = readers::check_reader_reference(&metadata.reader)?;

    let mut files = archive::list_raw_files(base_dir, station, spec.glob_pattern)?;
    if options.debugging_mode {
        files.truncate(DEBUGGING_MODE_FILE_LIMIT);
    }
    logging::info(
        Stage::L0A,
        Some(&station.station_name),
        &format!("processing {} raw file(s) with reader {}", files.len(), spec.reference()),
    );

    let destination = archive::product_station_dir(base_dir, station, ProductLevel::L0A);
    archive::prepare_product_directory(&destination, options.force)?;

    let results = read_raw_files(&files, spec, options.parallel);

    let mut combined: Option<DataFrame> = None;
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(df) => {
                logging::debug(
                    Stage::L0A,
                    Some(&station.station_name),
                    &format!("{}: {} rows", path.display(), df.height()),
                );
                match combined.as_mut() {
                    Some(acc) => {
                        acc.vstack_mut(&df)?;
                    }
                    None => combined = Some(df),
                }
            }
            Err(e) => {
                // A corrupt raw file must not sink the whole station.
                logging::warn(
                    Stage::L0A,
                    Some(&station.station_name),
                    &format!("skipping {}: {}", path.display(), e),
                );
            }
        }
    }

    let df = combined.ok_or_else(|| {
        DisdrodbError::NoDataFound(format!("no raw file of station {} could be parsed", station))
    })?;
    // Re-run the frame-level standards across file boundaries.
    let mut df = standardize_l0a(df)?;

    let (start_time, end_time) = time_range(&df)?;
    let filename = archive::build_product_filename(ProductLevel::L0A, station, start_time, end_time);
    let filepath = destination.join(filename);

    let file = std::fs::File::create(&filepath)?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Snappy)
        .finish(&mut df)?;

    logging::info(
        Stage::L0A,
        Some(&station.station_name),
        &format!("wrote {} ({} timesteps)", filepath.display(), df.height()),
    );
    Ok(filepath)
}

/// Parses raw files, concurrently when requested. Result order matches the
/// input order. Worker count is capped at the available CPU parallelism;
/// each worker takes a contiguous chunk of the file list.
fn read_raw_files(files: &[PathBuf], spec: &ReaderSpec, parallel: bool) -> Vec<Result<DataFrame>> {
    if !parallel || files.len() < 2 {
        return files.iter().map(|path| read_raw_file(path, spec)).collect();
    }

    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(files.len());
    let chunk_size = files.len().div_ceil(workers);

    std::thread::scope(|scope| {
        let handles: Vec<_> = files
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || -> Vec<Result<DataFrame>> {
                    chunk.iter().map(|path| read_raw_file(path, spec)).collect()
                })
            })
            .collect();
        files
            .chunks(chunk_size)
            .zip(handles)
            .flat_map(|(chunk, handle)| {
                handle.join().unwrap_or_else(|_| {
                    chunk
                        .iter()
                        .map(|_| Err(DisdrodbError::Parse("raw file parser panicked".to_string())))
                        .collect()
                })
            })
            .collect()
    })
}

/// Reads a station's L0A product files and concatenates them into a single
/// standardized frame. Used by L0B processing.
pub fn read_l0a_station(base_dir: &Path, station: &StationKey) -> Result<DataFrame> {
    let files = archive::list_product_files(base_dir, station, ProductLevel::L0A)?;

    let mut combined: Option<DataFrame> = None;
    for path in &files {
        let file = std::fs::File::open(path)?;
        let df = ParquetReader::new(file).finish()?;
        match combined.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&df)?;
            }
            None => combined = Some(df),
        }
    }

    let df = combined.ok_or_else(|| {
        DisdrodbError::NoDataFound(format!("no L0A data for station {}", station))
    })?;
    standardize_l0a(df)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
