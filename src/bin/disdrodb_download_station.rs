/// Downloads the raw data of a single station from the remote location
/// declared in its metadata.

use disdrodb::{cli, transfer};

const USAGE: &str = "\
Usage: disdrodb_download_station <data_source> <campaign_name> <station_name>
           [--force] [--verbose] [--base-dir <path>]";

fn main() {
    let (options, base_dir) = cli::init(USAGE);
    let station = match options.station_key() {
        Ok(station) => station,
        Err(message) => cli::exit_with_usage(&message, USAGE),
    };

    let client = reqwest::blocking::Client::new();
    if let Err(e) = transfer::download_station_data(&client, &base_dir, &station, options.force) {
        cli::exit_with_error(&e);
    }
}
