/// Concatenates the L0B files of a single station into one netCDF
/// spanning the whole record.

use disdrodb::{cli, routines};

const USAGE: &str = "\
Usage: run_disdrodb_l0b_concat_station <data_source> <campaign_name> <station_name>
           [--verbose] [--remove-l0b] [--base-dir <path>]";

fn main() {
    let (options, base_dir) = cli::init(USAGE);
    let station = match options.station_key() {
        Ok(station) => station,
        Err(message) => cli::exit_with_usage(&message, USAGE),
    };

    if let Err(e) = routines::run_l0b_concat_station(&base_dir, &station, options.remove_l0b) {
        cli::exit_with_error(&e);
    }
}
