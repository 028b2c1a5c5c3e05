/// Integration tests for the full L0 processing chain.
///
/// These tests build a complete archive in a temporary directory and
/// verify:
/// 1. Raw text files → L0A Parquet with standardized dtypes
/// 2. L0A → L0B netCDF with the spectrum unpacked over the sensor bins
/// 3. Per-station L0B concatenation into a single file
/// 4. Archive-wide runs with data source / campaign / station filters
///
/// No network access or pre-existing archive is required; everything is
/// seeded from the GPM/GCPEX reader format.

use std::path::Path;

use disdrodb::l0::{l0a, l0b};
use disdrodb::{archive, metadata, routines, sensors};
use disdrodb::{ArchiveFilters, ProcessingOptions, ProductLevel, StationKey};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// One GCPEX record: Parsivel telegram with a full 32x32 spectrum whose
/// cells all hold `count`.
fn gcpex_row(time: &str, count: u32) -> String {
    let spectrum = vec![format!("{:03}", count); 1024].join(",");
    format!("{};[01];0;12.5;45;0.254;21.3;9999;61;60;{}", time, spectrum)
}

fn seed_station(base_dir: &Path, station: &StationKey, files: &[(&str, Vec<String>)]) {
    let data_dir = archive::raw_station_data_dir(base_dir, station);
    std::fs::create_dir_all(&data_dir).unwrap();
    for (name, rows) in files {
        std::fs::write(data_dir.join(name), rows.join("\n")).unwrap();
    }

    let meta = archive::metadata_filepath(base_dir, station);
    std::fs::create_dir_all(meta.parent().unwrap()).unwrap();
    std::fs::write(
        &meta,
        format!(
            r#"
                data_source = "{}"
                campaign_name = "{}"
                station_name = "{}"
                sensor_name = "OTT_Parsivel"
                reader = "GPM/GCPEX"
                latitude = 44.23
                longitude = -79.78
                altitude = 251.0
                measurement_interval = 60
            "#,
            station.data_source, station.campaign_name, station.station_name
        ),
    )
    .unwrap();
}

fn default_station() -> StationKey {
    StationKey::new("GPM", "GCPEX", "APU01")
}

// ---------------------------------------------------------------------------
// Full chain
// ---------------------------------------------------------------------------

#[test]
fn raw_to_l0a_to_l0b_to_concat() {
    let dir = tempfile::tempdir().unwrap();
    let station = default_station();
    seed_station(
        dir.path(),
        &station,
        &[
            ("day1.txt", vec![gcpex_row("20120312060000", 1), gcpex_row("20120312060100", 2)]),
            ("day2.txt", vec![gcpex_row("20120313060000", 3)]),
        ],
    );

    let options = ProcessingOptions::default();

    // L0A: one Parquet file spanning both raw files, sorted by time.
    routines::run_l0a_station(dir.path(), &station, &options).unwrap();
    let l0a_files = archive::list_product_files(dir.path(), &station, ProductLevel::L0A).unwrap();
    assert_eq!(l0a_files.len(), 1);
    let parsed =
        archive::parse_product_filename(&l0a_files[0].file_name().unwrap().to_string_lossy())
            .unwrap();
    assert_eq!(parsed.level, ProductLevel::L0A);
    assert_eq!(parsed.start_time.format("%Y%m%d%H%M%S").to_string(), "20120312060000");
    assert_eq!(parsed.end_time.format("%Y%m%d%H%M%S").to_string(), "20120313060000");

    let df = l0a::read_l0a_station(dir.path(), &station).unwrap();
    assert_eq!(df.height(), 3);

    // L0B: spectrum unpacked against the Parsivel 32x32 grid.
    routines::run_l0b_station(dir.path(), &station, &options, false).unwrap();
    let l0b_files = archive::list_product_files(dir.path(), &station, ProductLevel::L0B).unwrap();
    assert_eq!(l0b_files.len(), 1);

    let sensor = sensors::find_sensor("OTT_Parsivel").unwrap();
    let data = l0b::read_l0b(&l0b_files[0], sensor).unwrap();
    assert_eq!(data.n_timesteps(), 3);
    assert_eq!(data.drop_number.len(), 3 * 1024);
    assert!(data.drop_number[..1024].iter().all(|&c| c == 1));
    assert!(data.drop_number[2 * 1024..].iter().all(|&c| c == 3));
    assert_eq!(l0b::read_l0b_sensor_name(&l0b_files[0]).unwrap(), "OTT_Parsivel");

    // Concat: single-file station still gets rewritten as one product.
    routines::run_l0b_concat_station(dir.path(), &station, true).unwrap();
    let concatenated =
        archive::list_product_files(dir.path(), &station, ProductLevel::L0B).unwrap();
    assert_eq!(concatenated.len(), 1);
    let merged = l0b::read_l0b(&concatenated[0], sensor).unwrap();
    assert_eq!(merged.time_seconds, data.time_seconds);
}

#[test]
fn l0_chain_with_remove_l0a_drops_intermediate() {
    let dir = tempfile::tempdir().unwrap();
    let station = default_station();
    seed_station(
        dir.path(),
        &station,
        &[("day1.txt", vec![gcpex_row("20120312060000", 1)])],
    );

    routines::run_l0_station(dir.path(), &station, &ProcessingOptions::default(), true).unwrap();

    assert!(archive::list_product_files(dir.path(), &station, ProductLevel::L0B).is_ok());
    assert!(!archive::product_station_dir(dir.path(), &station, ProductLevel::L0A).exists());
}

#[test]
fn duplicate_timesteps_across_raw_files_keep_first() {
    let dir = tempfile::tempdir().unwrap();
    let station = default_station();
    // day1 and day2 share the 06:01 timestep with different spectra.
    seed_station(
        dir.path(),
        &station,
        &[
            ("day1.txt", vec![gcpex_row("20120312060000", 1), gcpex_row("20120312060100", 2)]),
            ("day2.txt", vec![gcpex_row("20120312060100", 9), gcpex_row("20120312060200", 3)]),
        ],
    );

    routines::run_l0a_station(dir.path(), &station, &ProcessingOptions::default()).unwrap();
    let df = l0a::read_l0a_station(dir.path(), &station).unwrap();
    assert_eq!(df.height(), 3);

    let metadata = metadata::read_station_metadata(dir.path(), &station).unwrap();
    let sensor = sensors::find_sensor(&metadata.sensor_name).unwrap();
    let data = l0b::unpack_l0a(&df, sensor).unwrap();
    // Files sort by name, so day1's spectrum wins for 06:01.
    assert_eq!(data.drop_number[1024], 2);
}

#[test]
fn force_is_required_to_reprocess() {
    let dir = tempfile::tempdir().unwrap();
    let station = default_station();
    seed_station(
        dir.path(),
        &station,
        &[("day1.txt", vec![gcpex_row("20120312060000", 1)])],
    );

    let options = ProcessingOptions::default();
    routines::run_l0a_station(dir.path(), &station, &options).unwrap();
    assert!(routines::run_l0a_station(dir.path(), &station, &options).is_err());

    let forced = ProcessingOptions { force: true, ..ProcessingOptions::default() };
    routines::run_l0a_station(dir.path(), &station, &forced).unwrap();
}

#[test]
fn debugging_mode_limits_raw_files() {
    let dir = tempfile::tempdir().unwrap();
    let station = default_station();
    // 5 raw files with one timestep each; debugging mode reads only 3.
    let files: Vec<(String, Vec<String>)> = (0..5)
        .map(|i| {
            (
                format!("day{}.txt", i),
                vec![gcpex_row(&format!("2012031206000{}", i), 1)],
            )
        })
        .collect();
    let files: Vec<(&str, Vec<String>)> =
        files.iter().map(|(n, r)| (n.as_str(), r.clone())).collect();
    seed_station(dir.path(), &station, &files);

    let options = ProcessingOptions { debugging_mode: true, ..ProcessingOptions::default() };
    routines::run_l0a_station(dir.path(), &station, &options).unwrap();

    let df = l0a::read_l0a_station(dir.path(), &station).unwrap();
    assert_eq!(df.height(), 3);
}

#[test]
fn parallel_run_matches_sequential_output() {
    let dir = tempfile::tempdir().unwrap();
    let sequential = StationKey::new("GPM", "GCPEX", "APU01");
    let parallel = StationKey::new("GPM", "GCPEX", "APU02");
    for station in [&sequential, &parallel] {
        seed_station(
            dir.path(),
            station,
            &[
                ("day1.txt", vec![gcpex_row("20120312060000", 1)]),
                ("day2.txt", vec![gcpex_row("20120312060100", 2)]),
            ],
        );
    }

    routines::run_l0a_station(dir.path(), &sequential, &ProcessingOptions::default()).unwrap();
    let options = ProcessingOptions { parallel: true, ..ProcessingOptions::default() };
    routines::run_l0a_station(dir.path(), &parallel, &options).unwrap();

    let df_seq = l0a::read_l0a_station(dir.path(), &sequential).unwrap();
    let df_par = l0a::read_l0a_station(dir.path(), &parallel).unwrap();
    assert_eq!(df_seq.height(), df_par.height());
    assert_eq!(df_seq.get_column_names(), df_par.get_column_names());
}

// ---------------------------------------------------------------------------
// Archive-wide runs
// ---------------------------------------------------------------------------

#[test]
fn archive_run_processes_all_matching_stations() {
    let dir = tempfile::tempdir().unwrap();
    let stations = [
        StationKey::new("GPM", "GCPEX", "APU01"),
        StationKey::new("GPM", "GCPEX", "APU02"),
        StationKey::new("NASA", "IFLOODS", "APU03"),
    ];
    for station in &stations {
        seed_station(
            dir.path(),
            station,
            &[("day1.txt", vec![gcpex_row("20120312060000", 1)])],
        );
    }

    // Campaign filter selects only the two GCPEX stations.
    let filters = ArchiveFilters {
        campaign_names: vec!["GCPEX".to_string()],
        ..ArchiveFilters::default()
    };
    let summary = routines::run_l0(
        dir.path(),
        &filters,
        &ProcessingOptions::default(),
        false,
    )
    .unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.successful, 2);

    assert!(archive::list_product_files(dir.path(), &stations[0], ProductLevel::L0B).is_ok());
    assert!(archive::list_product_files(dir.path(), &stations[2], ProductLevel::L0B).is_err());

    // Concat across the archive touches the processed stations only.
    let summary = routines::run_l0b_concat(dir.path(), &filters, false).unwrap();
    assert_eq!(summary.successful, 2);
}

#[test]
fn archive_run_reports_partial_failure() {
    let dir = tempfile::tempdir().unwrap();
    let good = StationKey::new("GPM", "GCPEX", "APU01");
    seed_station(
        dir.path(),
        &good,
        &[("day1.txt", vec![gcpex_row("20120312060000", 1)])],
    );

    // A metadata file with no raw data directory behind it.
    let broken = StationKey::new("GPM", "GCPEX", "APU99");
    let meta = archive::metadata_filepath(dir.path(), &broken);
    std::fs::write(
        &meta,
        r#"
            data_source = "GPM"
            campaign_name = "GCPEX"
            station_name = "APU99"
            sensor_name = "OTT_Parsivel"
            reader = "GPM/GCPEX"
            latitude = 44.0
            longitude = -79.0
            altitude = 200.0
        "#,
    )
    .unwrap();

    let summary = routines::run_l0a(
        dir.path(),
        &ArchiveFilters::default(),
        &ProcessingOptions::default(),
    )
    .unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 1);

    // The good station's product exists despite the neighbour failing.
    assert!(archive::list_product_files(dir.path(), &good, ProductLevel::L0A).is_ok());
}
