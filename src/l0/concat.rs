/// L0B concatenation: merges a station's L0B files into a single netCDF
/// spanning the whole record.
///
/// Files are merged along the time dimension, sorted and de-duplicated
/// (first occurrence wins). The merged file replaces nothing by default;
/// `remove_l0b` deletes the source files afterwards.

use std::path::{Path, PathBuf};

use chrono::DateTime;

use crate::archive::{self, StationKey};
use crate::l0::l0b::{self, L0bData};
use crate::logging::{self, Stage};
use crate::metadata::StationMetadata;
use crate::model::{DisdrodbError, ProductLevel, Result};
use crate::sensors::{self, SensorSpec};

// ---------------------------------------------------------------------------
// Dataset merging
// ---------------------------------------------------------------------------

fn check_same_variables(first: &L0bData, other: &L0bData, path: &Path) -> Result<()> {
    let names = |d: &L0bData| -> Vec<String> { d.scalars.iter().map(|(n, _)| n.clone()).collect() };
    if first.drop_concentration.is_some() != other.drop_concentration.is_some()
        || first.drop_average_velocity.is_some() != other.drop_average_velocity.is_some()
        || names(first) != names(other)
    {
        return Err(DisdrodbError::Parse(format!(
            "{}: variables differ from the other L0B files of this station",
            path.display()
        )));
    }
    Ok(())
}

/// Merges datasets along time: appended, stably sorted, duplicate
/// timesteps dropped keeping the first occurrence.
pub fn merge_datasets(datasets: Vec<L0bData>, sensor: &SensorSpec) -> Result<L0bData> {
    let mut iter = datasets.into_iter();
    let mut merged = iter.next().ok_or_else(|| {
        DisdrodbError::NoDataFound("no datasets to merge".to_string())
    })?;
    for data in iter {
        merged.time_seconds.extend(data.time_seconds);
        merged.drop_number.extend(data.drop_number);
        if let (Some(acc), Some(more)) = (merged.drop_concentration.as_mut(), data.drop_concentration) {
            acc.extend(more);
        }
        if let (Some(acc), Some(more)) =
            (merged.drop_average_velocity.as_mut(), data.drop_average_velocity)
        {
            acc.extend(more);
        }
        for ((_, acc), (_, more)) in merged.scalars.iter_mut().zip(data.scalars) {
            acc.extend(more);
        }
    }

    // Stable sort by time, then keep the first row of each timestep.
    let n = merged.time_seconds.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| merged.time_seconds[i]);
    let mut keep: Vec<usize> = Vec::with_capacity(n);
    for &i in &order {
        if keep.last().map(|&j| merged.time_seconds[j]) != Some(merged.time_seconds[i]) {
            keep.push(i);
        }
    }

    let gather_rows = |values: &[f64], row_len: usize| -> Vec<f64> {
        keep.iter()
            .flat_map(|&i| values[i * row_len..(i + 1) * row_len].iter().copied())
            .collect()
    };

    let nd = sensor.n_diameter_bins();
    let nv = sensor.n_velocity_bins();
    let spectrum = sensor.spectrum_size();

    Ok(L0bData {
        time_seconds: keep.iter().map(|&i| merged.time_seconds[i]).collect(),
        drop_number: keep
            .iter()
            .flat_map(|&i| merged.drop_number[i * spectrum..(i + 1) * spectrum].iter().copied())
            .collect(),
        drop_concentration: merged.drop_concentration.as_deref().map(|v| gather_rows(v, nd)),
        drop_average_velocity: merged.drop_average_velocity.as_deref().map(|v| gather_rows(v, nv)),
        scalars: merged
            .scalars
            .iter()
            .map(|(name, values)| (name.clone(), gather_rows(values, 1)))
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Station concatenation
// ---------------------------------------------------------------------------

/// Concatenates all L0B files of a station into a single file spanning
/// the full record. Returns the written filepath.
///
/// A single input file is still rewritten as a concatenated product, so
/// downstream consumers can always expect one file per station.
pub fn concat_station(
    base_dir: &Path,
    station: &StationKey,
    metadata: &StationMetadata,
    remove_l0b: bool,
) -> Result<PathBuf> {
    let sensor = sensors::find_sensor(&metadata.sensor_name).ok_or_else(|| {
        DisdrodbError::SensorNotFound(metadata.sensor_name.clone())
    })?;

    let files = archive::list_product_files(base_dir, station, ProductLevel::L0B)?;
    logging::info(
        Stage::Concat,
        Some(&station.station_name),
        &format!("concatenating {} L0B file(s)", files.len()),
    );

    let mut datasets = Vec::with_capacity(files.len());
    for path in &files {
        let recorded = l0b::read_l0b_sensor_name(path)?;
        if recorded != sensor.name {
            return Err(DisdrodbError::Parse(format!(
                "{}: recorded sensor '{}' differs from station sensor '{}'",
                path.display(),
                recorded,
                sensor.name
            )));
        }
        let data = l0b::read_l0b(path, sensor)?;
        if let Some(first) = datasets.first() {
            check_same_variables(first, &data, path)?;
        }
        datasets.push(data);
    }

    let merged = merge_datasets(datasets, sensor)?;

    let to_naive = |secs: i64| {
        DateTime::from_timestamp(secs, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| DisdrodbError::Parse(format!("timestamp {} out of range", secs)))
    };
    let (first, last) = match (merged.time_seconds.first(), merged.time_seconds.last()) {
        (Some(&first), Some(&last)) => (to_naive(first)?, to_naive(last)?),
        _ => {
            return Err(DisdrodbError::NoDataFound(format!(
                "no timesteps found in the L0B files of station {}",
                station
            )))
        }
    };

    let filename = archive::build_product_filename(ProductLevel::L0B, station, first, last);
    let destination = archive::product_station_dir(base_dir, station, ProductLevel::L0B);
    let filepath = destination.join(&filename);

    // Writing into a temporary name first keeps a source file with the
    // same time span from being truncated while still unread.
    let tmp_path = destination.join(format!("{}.tmp", filename));
    l0b::write_l0b(&tmp_path, metadata, sensor, &merged)?;

    std::fs::rename(&tmp_path, &filepath)?;

    // Sources go only after the merged product is in place under its
    // final name.
    if remove_l0b {
        for path in &files {
            if path != &filepath {
                std::fs::remove_file(path)?;
            }
        }
    }

    logging::info(
        Stage::Concat,
        Some(&station.station_name),
        &format!("wrote {} ({} timesteps)", filepath.display(), merged.n_timesteps()),
    );
    Ok(filepath)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parsivel() -> &'static SensorSpec {
        sensors::find_sensor("OTT_Parsivel").unwrap()
    }

    fn dataset(times: &[i64], fill: u32) -> L0bData {
        let sensor = parsivel();
        let n = times.len();
        L0bData {
            time_seconds: times.to_vec(),
            drop_number: vec![fill; n * sensor.spectrum_size()],
            drop_concentration: None,
            drop_average_velocity: None,
            scalars: vec![(
                "rainfall_rate_32bit".to_string(),
                times.iter().map(|&t| t as f64).collect(),
            )],
        }
    }

    #[test]
    fn test_merge_sorts_across_files() {
        let sensor = parsivel();
        let merged = merge_datasets(vec![dataset(&[300, 400], 2), dataset(&[100, 200], 1)], sensor)
            .unwrap();
        assert_eq!(merged.time_seconds, vec![100, 200, 300, 400]);
        // Rows carried their file's fill value through the reordering.
        assert_eq!(merged.drop_number[0], 1);
        assert_eq!(merged.drop_number[2 * sensor.spectrum_size()], 2);
        assert_eq!(merged.scalars[0].1, vec![100.0, 200.0, 300.0, 400.0]);
    }

    #[test]
    fn test_merge_drops_duplicate_timesteps_keeping_first() {
        let sensor = parsivel();
        let merged = merge_datasets(vec![dataset(&[100, 200], 1), dataset(&[200, 300], 2)], sensor)
            .unwrap();
        assert_eq!(merged.time_seconds, vec![100, 200, 300]);
        // The duplicated timestep 200 keeps the first file's spectrum.
        assert_eq!(merged.drop_number[sensor.spectrum_size()], 1);
    }

    #[test]
    fn test_merge_single_dataset_is_identity() {
        let sensor = parsivel();
        let data = dataset(&[100, 200], 1);
        let merged = merge_datasets(vec![data.clone()], sensor).unwrap();
        assert_eq!(merged, data);
    }

    #[test]
    fn test_merge_empty_input_is_an_error() {
        assert!(merge_datasets(vec![], parsivel()).is_err());
    }

    fn test_metadata() -> StationMetadata {
        StationMetadata {
            data_source: "GPM".to_string(),
            campaign_name: "GCPEX".to_string(),
            station_name: "APU01".to_string(),
            sensor_name: "OTT_Parsivel".to_string(),
            reader: "GPM/GCPEX".to_string(),
            latitude: 44.23,
            longitude: -79.78,
            altitude: 251.0,
            title: None,
            description: None,
            sensor_serial_number: None,
            measurement_interval: Some(60),
            disdrodb_data_url: None,
        }
    }

    #[test]
    fn test_concat_station_merges_and_removes_sources() {
        let dir = tempfile::tempdir().unwrap();
        let station = StationKey::new("GPM", "GCPEX", "APU01");
        let metadata = test_metadata();
        let sensor = parsivel();

        let l0b_dir = archive::product_station_dir(dir.path(), &station, ProductLevel::L0B);
        std::fs::create_dir_all(&l0b_dir).unwrap();
        for (name, times) in [
            ("L0B.GCPEX.APU01.s19700101001640.e19700101001740.V0.nc", [1000_i64, 1060]),
            ("L0B.GCPEX.APU01.s19700101001840.e19700101001940.V0.nc", [1120, 1180]),
        ] {
            l0b::write_l0b(&l0b_dir.join(name), &metadata, sensor, &dataset(&times, 1)).unwrap();
        }

        let filepath = concat_station(dir.path(), &station, &metadata, true).unwrap();
        assert!(filepath.exists());

        // Sources were removed; only the merged file remains, already under
        // its final name (no leftover temporary file).
        let remaining: Vec<_> = std::fs::read_dir(&l0b_dir).unwrap().flatten().collect();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].path(), filepath);

        let merged = l0b::read_l0b(&filepath, sensor).unwrap();
        assert_eq!(merged.time_seconds, vec![1000, 1060, 1120, 1180]);
    }

    #[test]
    fn test_concat_station_errors_without_l0b_files() {
        let dir = tempfile::tempdir().unwrap();
        let station = StationKey::new("GPM", "GCPEX", "APU01");
        let err = concat_station(dir.path(), &station, &test_metadata(), false).unwrap_err();
        assert!(matches!(err, DisdrodbError::NoDataFound(_)));
    }
}
