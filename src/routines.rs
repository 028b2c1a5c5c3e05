/// Processing routines wired to the `run_disdrodb_*` binaries.
///
/// Station routines process a single station and log into its station
/// log file. Archive routines discover stations through the metadata
/// files in the Raw tree, apply the data source / campaign / station
/// filters, and run the station routine on each match; one failing
/// station never aborts the others.

use std::path::Path;

use crate::archive::{self, StationKey};
use crate::l0::{concat, l0a, l0b};
use crate::logging::{self, Stage};
use crate::metadata::{self, StationMetadata};
use crate::model::{DisdrodbError, ProcessingOptions, ProductLevel, Result};

// ---------------------------------------------------------------------------
// Archive filters and run summary
// ---------------------------------------------------------------------------

/// Restricts an archive-wide run. Empty lists match everything.
#[derive(Debug, Clone, Default)]
pub struct ArchiveFilters {
    pub data_sources: Vec<String>,
    pub campaign_names: Vec<String>,
    pub station_names: Vec<String>,
}

/// Outcome of an archive-wide run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Station routines
// ---------------------------------------------------------------------------

fn open_station(base_dir: &Path, station: &StationKey) -> Result<StationMetadata> {
    archive::check_archive_names(station)?;
    metadata::read_station_metadata(base_dir, station)
}

/// Runs a station routine with its log file attached.
fn with_station_log<T>(
    base_dir: &Path,
    station: &StationKey,
    routine: impl FnOnce() -> Result<T>,
) -> Result<T> {
    logging::set_station_log_file(Some(archive::station_log_filepath(base_dir, station)));
    let result = routine();
    logging::set_station_log_file(None);
    result
}

/// Produces the L0A product of one station.
pub fn run_l0a_station(
    base_dir: &Path,
    station: &StationKey,
    options: &ProcessingOptions,
) -> Result<()> {
    let metadata = open_station(base_dir, station)?;
    with_station_log(base_dir, station, || {
        l0a::process_station(base_dir, station, &metadata, options)
    })?;
    Ok(())
}

/// Produces the L0B product of one station from its L0A product.
///
/// `remove_l0a` deletes the station's L0A files once the L0B file has
/// been written.
pub fn run_l0b_station(
    base_dir: &Path,
    station: &StationKey,
    options: &ProcessingOptions,
    remove_l0a: bool,
) -> Result<()> {
    let metadata = open_station(base_dir, station)?;
    with_station_log(base_dir, station, || {
        l0b::process_station(base_dir, station, &metadata, options)?;
        if remove_l0a {
            remove_station_product(base_dir, station, ProductLevel::L0A)?;
        }
        Ok(())
    })
}

/// Runs the full L0 chain (L0A then L0B) for one station.
pub fn run_l0_station(
    base_dir: &Path,
    station: &StationKey,
    options: &ProcessingOptions,
    remove_l0a: bool,
) -> Result<()> {
    let metadata = open_station(base_dir, station)?;
    with_station_log(base_dir, station, || {
        l0a::process_station(base_dir, station, &metadata, options)?;
        l0b::process_station(base_dir, station, &metadata, options)?;
        if remove_l0a {
            remove_station_product(base_dir, station, ProductLevel::L0A)?;
        }
        Ok(())
    })
}

/// Concatenates the L0B files of one station into a single netCDF.
pub fn run_l0b_concat_station(
    base_dir: &Path,
    station: &StationKey,
    remove_l0b: bool,
) -> Result<()> {
    let metadata = open_station(base_dir, station)?;
    with_station_log(base_dir, station, || {
        concat::concat_station(base_dir, station, &metadata, remove_l0b)
    })?;
    Ok(())
}

fn remove_station_product(
    base_dir: &Path,
    station: &StationKey,
    level: ProductLevel,
) -> Result<()> {
    let dir = archive::product_station_dir(base_dir, station, level);
    if dir.is_dir() {
        std::fs::remove_dir_all(&dir)?;
        logging::info(
            Stage::Archive,
            Some(&station.station_name),
            &format!("removed {} products in {}", level, dir.display()),
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Archive-wide routines
// ---------------------------------------------------------------------------

fn run_archive(
    base_dir: &Path,
    filters: &ArchiveFilters,
    stage: Stage,
    routine: impl Fn(&StationKey) -> Result<()>,
) -> Result<RunSummary> {
    let stations = archive::available_stations(
        base_dir,
        &filters.data_sources,
        &filters.campaign_names,
        &filters.station_names,
    )?;
    if stations.is_empty() {
        return Err(DisdrodbError::NoDataFound(
            "no stations match the requested filters".to_string(),
        ));
    }

    let mut successful = 0;
    let mut failed = 0;
    for station in &stations {
        logging::info(stage, Some(&station.station_name), &format!("processing {}", station));
        match routine(station) {
            Ok(()) => successful += 1,
            Err(e) => {
                failed += 1;
                logging::error(stage, Some(&station.station_name), &e.to_string());
            }
        }
    }

    logging::log_run_summary(stage, stations.len(), successful, failed);
    Ok(RunSummary { total: stations.len(), successful, failed })
}

/// Produces the L0A product of every station matching the filters.
pub fn run_l0a(
    base_dir: &Path,
    filters: &ArchiveFilters,
    options: &ProcessingOptions,
) -> Result<RunSummary> {
    run_archive(base_dir, filters, Stage::L0A, |station| {
        run_l0a_station(base_dir, station, options)
    })
}

/// Produces the L0B product of every station matching the filters.
pub fn run_l0b(
    base_dir: &Path,
    filters: &ArchiveFilters,
    options: &ProcessingOptions,
    remove_l0a: bool,
) -> Result<RunSummary> {
    run_archive(base_dir, filters, Stage::L0B, |station| {
        run_l0b_station(base_dir, station, options, remove_l0a)
    })
}

/// Runs the full L0 chain for every station matching the filters.
pub fn run_l0(
    base_dir: &Path,
    filters: &ArchiveFilters,
    options: &ProcessingOptions,
    remove_l0a: bool,
) -> Result<RunSummary> {
    run_archive(base_dir, filters, Stage::L0, |station| {
        run_l0_station(base_dir, station, options, remove_l0a)
    })
}

/// Concatenates the L0B files of every station matching the filters.
pub fn run_l0b_concat(
    base_dir: &Path,
    filters: &ArchiveFilters,
    remove_l0b: bool,
) -> Result<RunSummary> {
    run_archive(base_dir, filters, Stage::Concat, |station| {
        run_l0b_concat_station(base_dir, station, remove_l0b)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
