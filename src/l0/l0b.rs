/// L0B processing: L0A Parquet tables to netCDF.
///
/// The packed spectrum strings are unpacked against the station sensor
/// geometry into a `time x diameter_bin x velocity_bin` drop count array,
/// numeric columns become per-timestep variables, and the sensor bin
/// coordinates plus the station metadata are written into the file.

use std::path::{Path, PathBuf};

use chrono::Utc;
use polars::prelude::*;

use crate::archive::{self, StationKey, PRODUCT_VERSION};
use crate::l0::l0a::{self, SPECTRUM_COLUMNS};
use crate::logging::{self, Stage};
use crate::metadata::StationMetadata;
use crate::model::{DisdrodbError, ProcessingOptions, ProductLevel, Result};
use crate::sensors::{self, SensorSpec};

/// CF-style epoch encoding used for the time variable.
pub const TIME_UNITS: &str = "seconds since 1970-01-01 00:00:00";

// ---------------------------------------------------------------------------
// In-memory L0B representation
// ---------------------------------------------------------------------------

/// Unpacked station data, as stored in one L0B file.
///
/// Array layouts are row-major: `drop_number[t * nd * nv + d * nv + v]`,
/// `drop_concentration[t * nd + d]`, `drop_average_velocity[t * nv + v]`.
#[derive(Debug, Clone, PartialEq)]
pub struct L0bData {
    /// Observation times, seconds since the Unix epoch, ascending.
    pub time_seconds: Vec<i64>,
    /// Drop counts per (time, diameter class, velocity class).
    pub drop_number: Vec<u32>,
    /// Drop concentration per (time, diameter class), when reported.
    pub drop_concentration: Option<Vec<f64>>,
    /// Average fall velocity per (time, velocity class), when reported.
    pub drop_average_velocity: Option<Vec<f64>>,
    /// Scalar per-timestep variables, missing values as NaN.
    pub scalars: Vec<(String, Vec<f64>)>,
}

impl L0bData {
    pub fn n_timesteps(&self) -> usize {
        self.time_seconds.len()
    }
}

// ---------------------------------------------------------------------------
// Spectrum unpacking
// ---------------------------------------------------------------------------

/// Splits a packed spectrum string into value tokens.
///
/// A trailing delimiter (common in Parsivel telegrams) is tolerated; the
/// empty token after it is dropped.
fn spectrum_tokens(packed: &str, delimiter: char) -> Vec<&str> {
    let mut tokens: Vec<&str> = packed.trim().split(delimiter).collect();
    if tokens.last() == Some(&"") {
        tokens.pop();
    }
    tokens
}

/// Unpacks one `raw_drop_number` string into counts.
///
/// A null or empty field means the sensor saw no drops; empty tokens
/// between delimiters are zero counts.
fn unpack_counts(
    packed: Option<&str>,
    sensor: &SensorSpec,
    row: usize,
) -> Result<Vec<u32>> {
    let expected = sensor.spectrum_size();
    let packed = match packed {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Ok(vec![0; expected]),
    };

    let tokens = spectrum_tokens(packed, sensor.spectrum_delimiter);
    if tokens.len() != expected {
        return Err(DisdrodbError::Parse(format!(
            "row {}: raw_drop_number has {} values, sensor {} expects {}",
            row,
            tokens.len(),
            sensor.name,
            expected
        )));
    }

    tokens
        .iter()
        .map(|t| {
            let t = t.trim();
            if t.is_empty() {
                Ok(0)
            } else {
                t.parse::<u32>().map_err(|_| {
                    DisdrodbError::Parse(format!(
                        "row {}: invalid drop count '{}' in raw_drop_number",
                        row, t
                    ))
                })
            }
        })
        .collect()
}

/// Unpacks one packed float field (concentration or average velocity).
fn unpack_floats(
    packed: Option<&str>,
    delimiter: char,
    expected: usize,
    column: &str,
    row: usize,
) -> Result<Vec<f64>> {
    let packed = match packed {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Ok(vec![f64::NAN; expected]),
    };

    let tokens = spectrum_tokens(packed, delimiter);
    if tokens.len() != expected {
        return Err(DisdrodbError::Parse(format!(
            "row {}: {} has {} values, expected {}",
            row,
            column,
            tokens.len(),
            expected
        )));
    }

    Ok(tokens
        .iter()
        .map(|t| {
            let t = t.trim();
            if t.is_empty() {
                f64::NAN
            } else {
                t.parse::<f64>().unwrap_or(f64::NAN)
            }
        })
        .collect())
}

/// Unpacks a standardized L0A frame into L0B arrays.
pub fn unpack_l0a(df: &DataFrame, sensor: &SensorSpec) -> Result<L0bData> {
    let time = df.column("time")?.datetime()?;
    let n = df.height();
    let nd = sensor.n_diameter_bins();
    let nv = sensor.n_velocity_bins();

    let mut time_seconds = Vec::with_capacity(n);
    for i in 0..n {
        let ms = time.get(i).ok_or_else(|| {
            DisdrodbError::Parse(format!("row {}: null timestep reached L0B", i))
        })?;
        time_seconds.push(ms / 1000);
    }

    let counts = df.column("raw_drop_number")?.str()?;
    let mut drop_number = Vec::with_capacity(n * nd * nv);
    for i in 0..n {
        drop_number.extend(unpack_counts(counts.get(i), sensor, i)?);
    }

    let unpack_float_column =
        |column: &str, expected: usize| -> Result<Option<Vec<f64>>> {
            if df.column(column).is_err() {
                return Ok(None);
            }
            let packed = df.column(column)?.str()?;
            let mut values = Vec::with_capacity(n * expected);
            for i in 0..n {
                values.extend(unpack_floats(
                    packed.get(i),
                    sensor.spectrum_delimiter,
                    expected,
                    column,
                    i,
                )?);
            }
            Ok(Some(values))
        };

    let drop_concentration = unpack_float_column("raw_drop_concentration", nd)?;
    let drop_average_velocity = unpack_float_column("raw_drop_average_velocity", nv)?;

    // Every remaining numeric column becomes a per-timestep variable.
    let mut scalars = Vec::new();
    for series in df.get_columns() {
        let name = series.name();
        if name == "time" || SPECTRUM_COLUMNS.contains(&name) {
            continue;
        }
        if !series.dtype().is_numeric() {
            continue;
        }
        let values = series.cast(&DataType::Float64)?;
        let values: Vec<f64> = values
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        scalars.push((name.to_string(), values));
    }

    Ok(L0bData {
        time_seconds,
        drop_number,
        drop_concentration,
        drop_average_velocity,
        scalars,
    })
}

// ---------------------------------------------------------------------------
// netCDF writing
// ---------------------------------------------------------------------------

/// Writes an L0B dataset to a netCDF file.
pub fn write_l0b(
    path: &Path,
    metadata: &StationMetadata,
    sensor: &SensorSpec,
    data: &L0bData,
) -> Result<()> {
    let n = data.n_timesteps();
    let nd = sensor.n_diameter_bins();
    let nv = sensor.n_velocity_bins();

    let mut file = netcdf::create(path)?;

    file.add_dimension("time", n)?;
    file.add_dimension("diameter_bin_center", nd)?;
    file.add_dimension("velocity_bin_center", nv)?;

    let mut time = file.add_variable::<i64>("time", &["time"])?;
    time.put_values(&data.time_seconds, ..)?;
    time.put_attribute("units", TIME_UNITS)?;
    time.put_attribute("standard_name", "time")?;

    let mut var = file.add_variable::<f64>("diameter_bin_center", &["diameter_bin_center"])?;
    var.put_values(sensor.diameter_bin_center, ..)?;
    var.put_attribute("units", "mm")?;

    let mut var = file.add_variable::<f64>("diameter_bin_width", &["diameter_bin_center"])?;
    var.put_values(sensor.diameter_bin_width, ..)?;
    var.put_attribute("units", "mm")?;

    let mut var = file.add_variable::<f64>("velocity_bin_center", &["velocity_bin_center"])?;
    var.put_values(sensor.velocity_bin_center, ..)?;
    var.put_attribute("units", "m/s")?;

    let mut var = file.add_variable::<f64>("velocity_bin_width", &["velocity_bin_center"])?;
    var.put_values(sensor.velocity_bin_width, ..)?;
    var.put_attribute("units", "m/s")?;

    let mut var = file.add_variable::<u32>(
        "raw_drop_number",
        &["time", "diameter_bin_center", "velocity_bin_center"],
    )?;
    var.put_values(&data.drop_number, ..)?;
    var.put_attribute("long_name", "Drop counts per diameter and velocity class")?;

    if let Some(ref values) = data.drop_concentration {
        let mut var = file
            .add_variable::<f64>("raw_drop_concentration", &["time", "diameter_bin_center"])?;
        var.put_values(values, ..)?;
        var.put_attribute("units", "1/(m3*mm)")?;
    }

    if let Some(ref values) = data.drop_average_velocity {
        let mut var = file
            .add_variable::<f64>("raw_drop_average_velocity", &["time", "velocity_bin_center"])?;
        var.put_values(values, ..)?;
        var.put_attribute("units", "m/s")?;
    }

    for (name, values) in &data.scalars {
        let mut var = file.add_variable::<f64>(name, &["time"])?;
        var.put_values(values, ..)?;
    }

    file.add_attribute("data_source", metadata.data_source.as_str())?;
    file.add_attribute("campaign_name", metadata.campaign_name.as_str())?;
    file.add_attribute("station_name", metadata.station_name.as_str())?;
    file.add_attribute("sensor_name", metadata.sensor_name.as_str())?;
    file.add_attribute("latitude", metadata.latitude)?;
    file.add_attribute("longitude", metadata.longitude)?;
    file.add_attribute("altitude", metadata.altitude)?;
    if let Some(ref title) = metadata.title {
        file.add_attribute("title", title.as_str())?;
    }
    if let Some(ref description) = metadata.description {
        file.add_attribute("description", description.as_str())?;
    }
    if let Some(interval) = metadata.measurement_interval {
        file.add_attribute("measurement_interval", interval as i64)?;
    }
    file.add_attribute("disdrodb_product_level", "L0B")?;
    file.add_attribute("disdrodb_product_version", PRODUCT_VERSION)?;
    file.add_attribute(
        "disdrodb_processing_date",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string().as_str(),
    )?;

    Ok(())
}

// ---------------------------------------------------------------------------
// netCDF reading
// ---------------------------------------------------------------------------

fn get_f64_values(file: &netcdf::File, name: &str) -> Result<Option<Vec<f64>>> {
    match file.variable(name) {
        Some(var) => Ok(Some(var.get_values::<f64, _>(..)?)),
        None => Ok(None),
    }
}

/// Reads an L0B file back into memory. The file's bin dimensions must
/// match the sensor geometry.
pub fn read_l0b(path: &Path, sensor: &SensorSpec) -> Result<L0bData> {
    let file = netcdf::open(path)?;

    let missing = |name: &str| {
        DisdrodbError::Parse(format!("{}: missing variable '{}'", path.display(), name))
    };

    let time = file.variable("time").ok_or_else(|| missing("time"))?;
    let time_seconds: Vec<i64> = time.get_values(..)?;

    let counts = file
        .variable("raw_drop_number")
        .ok_or_else(|| missing("raw_drop_number"))?;
    let dims = counts.dimensions();
    let (nd, nv) = (sensor.n_diameter_bins(), sensor.n_velocity_bins());
    if dims.len() != 3 || dims[1].len() != nd || dims[2].len() != nv {
        return Err(DisdrodbError::Parse(format!(
            "{}: raw_drop_number shape does not match sensor {} ({}x{} classes)",
            path.display(),
            sensor.name,
            nd,
            nv
        )));
    }
    let drop_number: Vec<u32> = counts.get_values(..)?;

    let drop_concentration = get_f64_values(&file, "raw_drop_concentration")?;
    let drop_average_velocity = get_f64_values(&file, "raw_drop_average_velocity")?;

    // Any other variable on the time dimension alone is a scalar series.
    let coordinate_names = [
        "time",
        "diameter_bin_center",
        "diameter_bin_width",
        "velocity_bin_center",
        "velocity_bin_width",
        "raw_drop_number",
        "raw_drop_concentration",
        "raw_drop_average_velocity",
    ];
    let mut scalars = Vec::new();
    for var in file.variables() {
        let name = var.name();
        if coordinate_names.contains(&name.as_str()) {
            continue;
        }
        let dims = var.dimensions();
        if dims.len() == 1 && dims[0].name() == "time" {
            scalars.push((name, var.get_values::<f64, _>(..)?));
        }
    }
    scalars.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(L0bData {
        time_seconds,
        drop_number,
        drop_concentration,
        drop_average_velocity,
        scalars,
    })
}

/// Reads the sensor name recorded in an L0B file's global attributes.
pub fn read_l0b_sensor_name(path: &Path) -> Result<String> {
    let file = netcdf::open(path)?;
    let attr = file.attribute("sensor_name").ok_or_else(|| {
        DisdrodbError::Parse(format!(
            "{}: missing global attribute 'sensor_name'",
            path.display()
        ))
    })?;
    match attr.value()? {
        netcdf::AttributeValue::Str(name) => Ok(name),
        _ => Err(DisdrodbError::Parse(format!(
            "{}: 'sensor_name' attribute is not a string",
            path.display()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Station processing
// ---------------------------------------------------------------------------

/// Produces the L0B product of one station from its L0A product.
/// Returns the written filepath.
pub fn process_station(
    base_dir: &Path,
    station: &StationKey,
    metadata: &StationMetadata,
    options: &ProcessingOptions,
) -> Result<PathBuf> {
    let sensor = sensors::find_sensor(&metadata.sensor_name).ok_or_else(|| {
        DisdrodbError::SensorNotFound(metadata.sensor_name.clone())
    })?;

    let df = l0a::read_l0a_station(base_dir, station)?;
    logging::info(
        Stage::L0B,
        Some(&station.station_name),
        &format!("unpacking {} timesteps against sensor {}", df.height(), sensor.name),
    );

    let destination = archive::product_station_dir(base_dir, station, ProductLevel::L0B);
    archive::prepare_product_directory(&destination, options.force)?;

    let data = unpack_l0a(&df, sensor)?;
    let (start_time, end_time) = l0a::time_range(&df)?;
    let filename = archive::build_product_filename(ProductLevel::L0B, station, start_time, end_time);
    let filepath = destination.join(filename);

    write_l0b(&filepath, metadata, sensor, &data)?;

    logging::info(
        Stage::L0B,
        Some(&station.station_name),
        &format!("wrote {} ({} timesteps)", filepath.display(), data.n_timesteps()),
    );
    Ok(filepath)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
