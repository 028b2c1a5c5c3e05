/// DISDRODB archive layout.
///
/// All path construction for the Raw and Processed trees lives here —
/// other modules should build paths through these helpers rather than
/// joining strings. The expected structure is:
///
/// ```text
/// <base_dir>/Raw/<DATA_SOURCE>/<CAMPAIGN_NAME>/
///     data/<station_name>/<raw files>
///     metadata/<station_name>.toml
/// <base_dir>/Processed/<DATA_SOURCE>/<CAMPAIGN_NAME>/
///     L0A/<station_name>/*.parquet
///     L0B/<station_name>/*.nc
///     logs/<station_name>.log
/// ```
///
/// `DATA_SOURCE` and `CAMPAIGN_NAME` are UPPER CASE by convention.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::model::{DisdrodbError, ProductLevel, Result};

/// Name of the raw side of the archive.
pub const RAW_DIR: &str = "Raw";

/// Name of the processed side of the archive.
pub const PROCESSED_DIR: &str = "Processed";

/// Product version tag embedded in product filenames.
pub const PRODUCT_VERSION: &str = "V0";

/// Timestamp format used in product filenames (s/e fields).
pub const FNAME_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

// ---------------------------------------------------------------------------
// Station identity
// ---------------------------------------------------------------------------

/// Identifies one station within the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationKey {
    pub data_source: String,
    pub campaign_name: String,
    pub station_name: String,
}

impl StationKey {
    pub fn new(data_source: &str, campaign_name: &str, station_name: &str) -> Self {
        StationKey {
            data_source: data_source.to_string(),
            campaign_name: campaign_name.to_string(),
            station_name: station_name.to_string(),
        }
    }
}

impl fmt::Display for StationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.data_source, self.campaign_name, self.station_name)
    }
}

// ---------------------------------------------------------------------------
// Path construction
// ---------------------------------------------------------------------------

/// `<base_dir>/Raw/<DATA_SOURCE>/<CAMPAIGN_NAME>`
pub fn raw_campaign_dir(base_dir: &Path, station: &StationKey) -> PathBuf {
    base_dir
        .join(RAW_DIR)
        .join(&station.data_source)
        .join(&station.campaign_name)
}

/// `<raw campaign>/data/<station_name>`
pub fn raw_station_data_dir(base_dir: &Path, station: &StationKey) -> PathBuf {
    raw_campaign_dir(base_dir, station)
        .join("data")
        .join(&station.station_name)
}

/// `<raw campaign>/metadata/<station_name>.toml`
pub fn metadata_filepath(base_dir: &Path, station: &StationKey) -> PathBuf {
    raw_campaign_dir(base_dir, station)
        .join("metadata")
        .join(format!("{}.toml", station.station_name))
}

/// `<base_dir>/Processed/<DATA_SOURCE>/<CAMPAIGN_NAME>`
pub fn processed_campaign_dir(base_dir: &Path, station: &StationKey) -> PathBuf {
    base_dir
        .join(PROCESSED_DIR)
        .join(&station.data_source)
        .join(&station.campaign_name)
}

/// `<processed campaign>/<L0A|L0B>/<station_name>`
pub fn product_station_dir(base_dir: &Path, station: &StationKey, level: ProductLevel) -> PathBuf {
    processed_campaign_dir(base_dir, station)
        .join(level.dir_name())
        .join(&station.station_name)
}

/// `<processed campaign>/logs/<station_name>.log`
pub fn station_log_filepath(base_dir: &Path, station: &StationKey) -> PathBuf {
    processed_campaign_dir(base_dir, station)
        .join("logs")
        .join(format!("{}.log", station.station_name))
}

// ---------------------------------------------------------------------------
// Product filenames
// ---------------------------------------------------------------------------

/// Parsed components of a product filename.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFilename {
    pub level: ProductLevel,
    pub campaign_name: String,
    pub station_name: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub version: String,
}

/// Builds a product filename:
/// `<LEVEL>.<CAMPAIGN>.<station>.s<YYYYmmddHHMMSS>.e<YYYYmmddHHMMSS>.V0.<ext>`
pub fn build_product_filename(
    level: ProductLevel,
    station: &StationKey,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
) -> String {
    format!(
        "{}.{}.{}.s{}.e{}.{}.{}",
        level.dir_name(),
        station.campaign_name,
        station.station_name,
        start_time.format(FNAME_TIME_FORMAT),
        end_time.format(FNAME_TIME_FORMAT),
        PRODUCT_VERSION,
        level.extension(),
    )
}

/// Parses a product filename produced by `build_product_filename`.
pub fn parse_product_filename(filename: &str) -> Result<ProductFilename> {
    let parts: Vec<&str> = filename.split('.').collect();
    if parts.len() != 7 {
        return Err(DisdrodbError::Parse(format!(
            "product filename '{}' does not have 7 dot-separated fields",
            filename
        )));
    }

    let level = match parts[0] {
        "L0A" => ProductLevel::L0A,
        "L0B" => ProductLevel::L0B,
        other => {
            return Err(DisdrodbError::Parse(format!(
                "unknown product level '{}' in filename '{}'",
                other, filename
            )))
        }
    };

    let parse_time = |field: &str, prefix: char| -> Result<NaiveDateTime> {
        let stripped = field.strip_prefix(prefix).ok_or_else(|| {
            DisdrodbError::Parse(format!(
                "expected '{}'-prefixed time field in filename '{}'",
                prefix, filename
            ))
        })?;
        NaiveDateTime::parse_from_str(stripped, FNAME_TIME_FORMAT)
            .map_err(|e| DisdrodbError::Parse(format!("bad time in '{}': {}", filename, e)))
    };

    Ok(ProductFilename {
        level,
        campaign_name: parts[1].to_string(),
        station_name: parts[2].to_string(),
        start_time: parse_time(parts[3], 's')?,
        end_time: parse_time(parts[4], 'e')?,
        version: parts[5].to_string(),
    })
}

// ---------------------------------------------------------------------------
// Raw file listing
// ---------------------------------------------------------------------------

/// Matches a filename against a shell-style `*` wildcard pattern.
///
/// Only `*` is supported — the patterns declared by the reader registry
/// never use `?` or character classes.
pub fn matches_glob(name: &str, pattern: &str) -> bool {
    fn matches(name: &[u8], pattern: &[u8]) -> bool {
        match pattern.first() {
            None => name.is_empty(),
            Some(b'*') => {
                // Try every possible consumption of the star.
                (0..=name.len()).any(|i| matches(&name[i..], &pattern[1..]))
            }
            Some(c) => name.first() == Some(c) && matches(&name[1..], &pattern[1..]),
        }
    }
    matches(name.as_bytes(), pattern.as_bytes())
}

/// Lists raw data files of a station matching the reader glob pattern,
/// sorted by filename.
pub fn list_raw_files(base_dir: &Path, station: &StationKey, pattern: &str) -> Result<Vec<PathBuf>> {
    let data_dir = raw_station_data_dir(base_dir, station);
    if !data_dir.is_dir() {
        return Err(DisdrodbError::InvalidArchive(format!(
            "raw data directory {} does not exist",
            data_dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(&data_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if matches_glob(&name, pattern) {
            files.push(entry.path());
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(DisdrodbError::NoDataFound(format!(
            "no raw files matching '{}' in {}",
            pattern,
            data_dir.display()
        )));
    }
    Ok(files)
}

/// Lists product files of a station, sorted by filename (which sorts by
/// start time given the fixed-width timestamp encoding).
pub fn list_product_files(
    base_dir: &Path,
    station: &StationKey,
    level: ProductLevel,
) -> Result<Vec<PathBuf>> {
    let dir = product_station_dir(base_dir, station, level);
    if !dir.is_dir() {
        return Err(DisdrodbError::NoDataFound(format!(
            "{} directory {} does not exist",
            level,
            dir.display()
        )));
    }

    let suffix = format!(".{}", level.extension());
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| p.to_string_lossy().ends_with(&suffix))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(DisdrodbError::NoDataFound(format!(
            "no {} files in {}",
            level,
            dir.display()
        )));
    }
    Ok(files)
}

// ---------------------------------------------------------------------------
// Station discovery
// ---------------------------------------------------------------------------

fn list_subdirectories(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}

/// A station is "available" iff its metadata file exists in the Raw tree.
///
/// `data_sources`, `campaign_names` and `station_names` restrict the scan;
/// an empty filter matches everything.
pub fn available_stations(
    base_dir: &Path,
    data_sources: &[String],
    campaign_names: &[String],
    station_names: &[String],
) -> Result<Vec<StationKey>> {
    let raw_root = base_dir.join(RAW_DIR);
    if !raw_root.is_dir() {
        return Err(DisdrodbError::InvalidArchive(format!(
            "{} does not contain a {} directory",
            base_dir.display(),
            RAW_DIR
        )));
    }

    let keep = |value: &str, filter: &[String]| filter.is_empty() || filter.iter().any(|f| f == value);

    let mut stations = Vec::new();
    for data_source in list_subdirectories(&raw_root)? {
        if !keep(&data_source, data_sources) {
            continue;
        }
        for campaign_name in list_subdirectories(&raw_root.join(&data_source))? {
            if !keep(&campaign_name, campaign_names) {
                continue;
            }
            let metadata_dir = raw_root.join(&data_source).join(&campaign_name).join("metadata");
            if !metadata_dir.is_dir() {
                continue;
            }
            let mut names: Vec<String> = std::fs::read_dir(&metadata_dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && p.extension().map(|e| e == "toml").unwrap_or(false))
                .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .collect();
            names.sort();
            for station_name in names {
                if keep(&station_name, station_names) {
                    stations.push(StationKey::new(&data_source, &campaign_name, &station_name));
                }
            }
        }
    }
    Ok(stations)
}

// ---------------------------------------------------------------------------
// Directory preparation
// ---------------------------------------------------------------------------

/// Checks that data source and campaign names follow the UPPER CASE
/// archive convention.
pub fn check_archive_names(station: &StationKey) -> Result<()> {
    for (label, value) in [
        ("data_source", &station.data_source),
        ("campaign_name", &station.campaign_name),
    ] {
        if value != &value.to_uppercase() {
            return Err(DisdrodbError::InvalidArchive(format!(
                "{} '{}' must be UPPER CASE",
                label, value
            )));
        }
    }
    Ok(())
}

/// Prepares a product destination directory.
///
/// A non-empty destination is an error unless `force` is set, in which
/// case its content is removed first.
pub fn prepare_product_directory(dir: &Path, force: bool) -> Result<()> {
    if dir.is_dir() {
        let is_empty = std::fs::read_dir(dir)?.next().is_none();
        if !is_empty {
            if !force {
                return Err(DisdrodbError::AlreadyProcessed(dir.display().to_string()));
            }
            std::fs::remove_dir_all(dir)?;
        }
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn station() -> StationKey {
        StationKey::new("EPFL", "EPFL_ROOF_2008", "10")
    }

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn test_path_layout() {
        let base = Path::new("/data/DISDRODB");
        let key = station();
        assert_eq!(
            raw_station_data_dir(base, &key),
            Path::new("/data/DISDRODB/Raw/EPFL/EPFL_ROOF_2008/data/10")
        );
        assert_eq!(
            metadata_filepath(base, &key),
            Path::new("/data/DISDRODB/Raw/EPFL/EPFL_ROOF_2008/metadata/10.toml")
        );
        assert_eq!(
            product_station_dir(base, &key, ProductLevel::L0B),
            Path::new("/data/DISDRODB/Processed/EPFL/EPFL_ROOF_2008/L0B/10")
        );
        assert_eq!(
            station_log_filepath(base, &key),
            Path::new("/data/DISDRODB/Processed/EPFL/EPFL_ROOF_2008/logs/10.log")
        );
    }

    #[test]
    fn test_product_filename_roundtrip() {
        let key = station();
        let start = dt(2008, 7, 1, 0, 0, 30);
        let end = dt(2008, 7, 2, 23, 59, 30);
        let filename = build_product_filename(ProductLevel::L0A, &key, start, end);
        assert_eq!(
            filename,
            "L0A.EPFL_ROOF_2008.10.s20080701000030.e20080702235930.V0.parquet"
        );

        let parsed = parse_product_filename(&filename).unwrap();
        assert_eq!(parsed.level, ProductLevel::L0A);
        assert_eq!(parsed.campaign_name, "EPFL_ROOF_2008");
        assert_eq!(parsed.station_name, "10");
        assert_eq!(parsed.start_time, start);
        assert_eq!(parsed.end_time, end);
        assert_eq!(parsed.version, "V0");
    }

    #[test]
    fn test_parse_rejects_malformed_filenames() {
        assert!(parse_product_filename("L0A.parquet").is_err());
        assert!(parse_product_filename("L9.CAMP.st.s20080701000030.e20080702235930.V0.parquet").is_err());
        assert!(parse_product_filename("L0A.CAMP.st.x20080701000030.e20080702235930.V0.parquet").is_err());
    }

    #[test]
    fn test_glob_matching() {
        assert!(matches_glob("file_001.dat", "*.dat"));
        assert!(matches_glob("file_001.dat", "file_*"));
        assert!(matches_glob("file_001.dat", "file_*.dat"));
        assert!(matches_glob("a.txt", "*"));
        assert!(!matches_glob("file_001.csv", "*.dat"));
        assert!(!matches_glob("file.datx", "*.dat"));
    }

    #[test]
    fn test_list_raw_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let key = station();
        let data_dir = raw_station_data_dir(dir.path(), &key);
        std::fs::create_dir_all(&data_dir).unwrap();
        for name in ["b.dat", "a.dat", "ignore.csv"] {
            std::fs::write(data_dir.join(name), "x").unwrap();
        }

        let files = list_raw_files(dir.path(), &key, "*.dat").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.dat", "b.dat"]);
    }

    #[test]
    fn test_list_raw_files_errors_when_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let key = station();
        let data_dir = raw_station_data_dir(dir.path(), &key);
        std::fs::create_dir_all(&data_dir).unwrap();
        assert!(list_raw_files(dir.path(), &key, "*.dat").is_err());
    }

    #[test]
    fn test_available_stations_discovery_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        for (ds, camp, st) in [
            ("EPFL", "EPFL_ROOF_2008", "10"),
            ("EPFL", "DAVOS_2009", "20"),
            ("GPM", "GCPEX", "APU01"),
        ] {
            let meta = metadata_filepath(dir.path(), &StationKey::new(ds, camp, st));
            std::fs::create_dir_all(meta.parent().unwrap()).unwrap();
            std::fs::write(&meta, "").unwrap();
        }

        let all = available_stations(dir.path(), &[], &[], &[]).unwrap();
        assert_eq!(all.len(), 3);

        let epfl = available_stations(dir.path(), &["EPFL".to_string()], &[], &[]).unwrap();
        assert_eq!(epfl.len(), 2);

        let one = available_stations(
            dir.path(),
            &[],
            &["GCPEX".to_string()],
            &["APU01".to_string()],
        )
        .unwrap();
        assert_eq!(one, vec![StationKey::new("GPM", "GCPEX", "APU01")]);
    }

    #[test]
    fn test_check_archive_names_requires_upper_case() {
        assert!(check_archive_names(&StationKey::new("EPFL", "EPFL_ROOF_2008", "10")).is_ok());
        assert!(check_archive_names(&StationKey::new("epfl", "EPFL_ROOF_2008", "10")).is_err());
        assert!(check_archive_names(&StationKey::new("EPFL", "roof_2008", "10")).is_err());
    }

    #[test]
    fn test_prepare_product_directory_force_semantics() {
        let dir = tempfile::tempdir().unwrap();
        let product_dir = dir.path().join("L0A").join("10");
        std::fs::create_dir_all(&product_dir).unwrap();
        std::fs::write(product_dir.join("old.parquet"), "x").unwrap();

        // Existing data without force is refused.
        assert!(matches!(
            prepare_product_directory(&product_dir, false),
            Err(DisdrodbError::AlreadyProcessed(_))
        ));

        // With force the directory is emptied.
        prepare_product_directory(&product_dir, true).unwrap();
        assert!(std::fs::read_dir(&product_dir).unwrap().next().is_none());
    }
}
