/// Shared command line handling for the `run_disdrodb_*` binaries.
///
/// All binaries accept the same flag set; station binaries additionally
/// take the `<data_source> <campaign_name> <station_name>` positionals.
/// Flag parsing is hand-rolled over `std::env::args()` so the binaries
/// stay dependency-free shells around the library routines.

use std::path::PathBuf;

use crate::config;
use crate::archive::StationKey;
use crate::logging;
use crate::model::ProcessingOptions;
use crate::routines::ArchiveFilters;

// ---------------------------------------------------------------------------
// Parsed options
// ---------------------------------------------------------------------------

/// Options accepted by every binary. Flags irrelevant to a given binary
/// (e.g. `--remove-l0b` for an L0A run) are parsed but ignored by it.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    /// Positional arguments, in order.
    pub positional: Vec<String>,
    /// `--base-dir <path>`, overriding the environment and config file.
    pub base_dir: Option<String>,
    pub force: bool,
    pub verbose: bool,
    pub parallel: bool,
    pub debugging_mode: bool,
    pub remove_l0a: bool,
    pub remove_l0b: bool,
    /// `--data-sources A B ...`
    pub data_sources: Vec<String>,
    /// `--campaign-names A B ...`
    pub campaign_names: Vec<String>,
    /// `--station-names A B ...`
    pub station_names: Vec<String>,
}

impl CliOptions {
    pub fn processing_options(&self) -> ProcessingOptions {
        ProcessingOptions {
            force: self.force,
            verbose: self.verbose,
            parallel: self.parallel,
            debugging_mode: self.debugging_mode,
        }
    }

    pub fn archive_filters(&self) -> ArchiveFilters {
        ArchiveFilters {
            data_sources: self.data_sources.clone(),
            campaign_names: self.campaign_names.clone(),
            station_names: self.station_names.clone(),
        }
    }

    /// Interprets the positionals as a station selector.
    pub fn station_key(&self) -> Result<StationKey, String> {
        match self.positional.as_slice() {
            [data_source, campaign_name, station_name] => {
                Ok(StationKey::new(data_source, campaign_name, station_name))
            }
            other => Err(format!(
                "expected <data_source> <campaign_name> <station_name>, got {} positional argument(s)",
                other.len()
            )),
        }
    }

    /// Rejects stray positionals on archive-wide binaries.
    pub fn expect_no_positional(&self) -> Result<(), String> {
        if self.positional.is_empty() {
            Ok(())
        } else {
            Err(format!("unexpected positional argument '{}'", self.positional[0]))
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parses command line arguments (without the program name).
pub fn parse_options(args: impl Iterator<Item = String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut args = args.peekable();

    // Consumes values following a list flag, up to the next flag.
    fn take_list(
        args: &mut std::iter::Peekable<impl Iterator<Item = String>>,
        flag: &str,
    ) -> Result<Vec<String>, String> {
        let mut values = Vec::new();
        while let Some(next) = args.peek() {
            if next.starts_with("--") {
                break;
            }
            values.push(args.next().unwrap_or_default());
        }
        if values.is_empty() {
            return Err(format!("{} requires at least one value", flag));
        }
        Ok(values)
    }

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--force" => options.force = true,
            "--verbose" => options.verbose = true,
            "--parallel" => options.parallel = true,
            "--debugging-mode" => options.debugging_mode = true,
            "--remove-l0a" => options.remove_l0a = true,
            "--remove-l0b" => options.remove_l0b = true,
            "--base-dir" => {
                options.base_dir =
                    Some(args.next().ok_or("--base-dir requires a path".to_string())?);
            }
            "--data-sources" => options.data_sources = take_list(&mut args, "--data-sources")?,
            "--campaign-names" => {
                options.campaign_names = take_list(&mut args, "--campaign-names")?
            }
            "--station-names" => options.station_names = take_list(&mut args, "--station-names")?,
            other if other.starts_with("--") => {
                return Err(format!("unknown option '{}'", other));
            }
            _ => options.positional.push(arg),
        }
    }

    Ok(options)
}

// ---------------------------------------------------------------------------
// Binary entry helpers
// ---------------------------------------------------------------------------

/// Parses `std::env::args()`, resolves the archive base directory and
/// initializes the global logger. On a usage error, prints the usage
/// string and exits.
pub fn init(usage: &str) -> (CliOptions, PathBuf) {
    let options = match parse_options(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => exit_with_usage(&message, usage),
    };

    let base_dir = match config::resolve_base_dir(options.base_dir.as_deref()) {
        Ok(base_dir) => base_dir,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    logging::init_logger(options.verbose, None);
    (options, base_dir)
}

/// Prints a usage error and terminates.
pub fn exit_with_usage(message: &str, usage: &str) -> ! {
    eprintln!("Error: {}", message);
    eprintln!("{}", usage);
    std::process::exit(1);
}

/// Reports a routine failure and terminates.
pub fn exit_with_error(e: &crate::model::DisdrodbError) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions, String> {
        parse_options(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_station_invocation() {
        let options = parse(&["EPFL", "EPFL_ROOF_2008", "10", "--force", "--verbose"]).unwrap();
        let key = options.station_key().unwrap();
        assert_eq!(key, StationKey::new("EPFL", "EPFL_ROOF_2008", "10"));
        assert!(options.force);
        assert!(options.verbose);
        assert!(!options.parallel);
    }

    #[test]
    fn test_parse_archive_filters() {
        let options = parse(&[
            "--data-sources", "EPFL", "GPM",
            "--campaign-names", "GCPEX",
            "--parallel",
        ])
        .unwrap();
        options.expect_no_positional().unwrap();
        let filters = options.archive_filters();
        assert_eq!(filters.data_sources, vec!["EPFL", "GPM"]);
        assert_eq!(filters.campaign_names, vec!["GCPEX"]);
        assert!(filters.station_names.is_empty());
        assert!(options.parallel);
    }

    #[test]
    fn test_list_flag_requires_values() {
        assert!(parse(&["--data-sources", "--force"]).is_err());
        assert!(parse(&["--data-sources"]).is_err());
    }

    #[test]
    fn test_base_dir_option() {
        let options = parse(&["--base-dir", "/data/DISDRODB"]).unwrap();
        assert_eq!(options.base_dir.as_deref(), Some("/data/DISDRODB"));
        assert!(parse(&["--base-dir"]).is_err());
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let err = parse(&["--frobnicate"]).unwrap_err();
        assert!(err.contains("--frobnicate"));
    }

    #[test]
    fn test_station_key_requires_three_positionals() {
        assert!(parse(&["EPFL"]).unwrap().station_key().is_err());
        assert!(parse(&["EPFL", "A", "B", "C"]).unwrap().station_key().is_err());
    }

    #[test]
    fn test_remove_flags() {
        let options = parse(&["--remove-l0a", "--remove-l0b", "--debugging-mode"]).unwrap();
        assert!(options.remove_l0a);
        assert!(options.remove_l0b);
        assert!(options.debugging_mode);
    }
}
