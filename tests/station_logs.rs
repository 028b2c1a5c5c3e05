/// Station log file integration test.
///
/// Kept in its own test binary: the logger and its station log file are
/// process-global, so this test must not share a process with tests that
/// also attach and detach station log files.

use disdrodb::{archive, logging, routines, ProcessingOptions, StationKey};

fn gcpex_row(time: &str, count: u32) -> String {
    let spectrum = vec![format!("{:03}", count); 1024].join(",");
    format!("{};[01];0;12.5;45;0.254;21.3;9999;61;60;{}", time, spectrum)
}

#[test]
fn station_run_writes_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let station = StationKey::new("GPM", "GCPEX", "APU01");

    let data_dir = archive::raw_station_data_dir(dir.path(), &station);
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("day1.txt"), gcpex_row("20120312060000", 1)).unwrap();

    let meta = archive::metadata_filepath(dir.path(), &station);
    std::fs::create_dir_all(meta.parent().unwrap()).unwrap();
    std::fs::write(
        &meta,
        r#"
            data_source = "GPM"
            campaign_name = "GCPEX"
            station_name = "APU01"
            sensor_name = "OTT_Parsivel"
            reader = "GPM/GCPEX"
            latitude = 44.23
            longitude = -79.78
            altitude = 251.0
        "#,
    )
    .unwrap();

    logging::init_logger(false, None);
    routines::run_l0a_station(dir.path(), &station, &ProcessingOptions::default()).unwrap();

    let log_path = archive::station_log_filepath(dir.path(), &station);
    assert!(log_path.is_file());
    let content = std::fs::read_to_string(&log_path).unwrap();
    assert!(content.contains("L0A"));
    assert!(content.contains("APU01"));
}
