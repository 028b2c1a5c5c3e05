/// Concatenates the L0B files of every station in the archive matching
/// the filters.

use disdrodb::{cli, routines};

const USAGE: &str = "\
Usage: run_disdrodb_l0b_concat [--data-sources <name>...] [--campaign-names <name>...]
           [--station-names <name>...]
           [--verbose] [--remove-l0b] [--base-dir <path>]";

fn main() {
    let (options, base_dir) = cli::init(USAGE);
    if let Err(message) = options.expect_no_positional() {
        cli::exit_with_usage(&message, USAGE);
    }

    match routines::run_l0b_concat(&base_dir, &options.archive_filters(), options.remove_l0b) {
        Ok(summary) if summary.failed > 0 => std::process::exit(1),
        Ok(_) => {}
        Err(e) => cli::exit_with_error(&e),
    }
}
