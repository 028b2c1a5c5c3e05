/// Produces the L0B product of every station in the archive matching
/// the filters.

use disdrodb::{cli, routines};

const USAGE: &str = "\
Usage: run_disdrodb_l0b [--data-sources <name>...] [--campaign-names <name>...]
           [--station-names <name>...]
           [--force] [--verbose] [--parallel] [--debugging-mode] [--remove-l0a]
           [--base-dir <path>]";

fn main() {
    let (options, base_dir) = cli::init(USAGE);
    if let Err(message) = options.expect_no_positional() {
        cli::exit_with_usage(&message, USAGE);
    }

    match routines::run_l0b(
        &base_dir,
        &options.archive_filters(),
        &options.processing_options(),
        options.remove_l0a,
    ) {
        Ok(summary) if summary.failed > 0 => std::process::exit(1),
        Ok(_) => {}
        Err(e) => cli::exit_with_error(&e),
    }
}
