/// Produces the L0A product (Parquet) of a single station.

use disdrodb::{cli, routines};

const USAGE: &str = "\
Usage: run_disdrodb_l0a_station <data_source> <campaign_name> <station_name>
           [--force] [--verbose] [--parallel] [--debugging-mode]
           [--base-dir <path>]";

fn main() {
    let (options, base_dir) = cli::init(USAGE);
    let station = match options.station_key() {
        Ok(station) => station,
        Err(message) => cli::exit_with_usage(&message, USAGE),
    };

    if let Err(e) = routines::run_l0a_station(&base_dir, &station, &options.processing_options()) {
        cli::exit_with_error(&e);
    }
}
