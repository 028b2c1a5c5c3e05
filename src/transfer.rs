/// Station data download.
///
/// Fetches the raw data archive of a station from the remote location
/// declared in its metadata (`disdrodb_data_url`) and stores it in the
/// station's raw data directory, where the L0A readers pick it up.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::archive::{self, StationKey};
use crate::logging::{self, Stage};
use crate::metadata::{self, StationMetadata};
use crate::model::{DisdrodbError, Result};

// ---------------------------------------------------------------------------
// URL handling
// ---------------------------------------------------------------------------

/// Filename under which a downloaded archive is stored: the last path
/// segment of the URL, ignoring any query string.
fn filename_from_url(url: &str) -> Result<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    if name.is_empty() || name.contains(':') {
        return Err(DisdrodbError::Parse(format!(
            "cannot derive a filename from data url '{}'",
            url
        )));
    }
    Ok(name.to_string())
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

/// Downloads the raw data of one station into its raw data directory.
/// Returns the path of the stored file.
///
/// An already populated data directory is an error unless `force` is
/// set, in which case its content is replaced.
pub fn download_station_data(
    client: &reqwest::blocking::Client,
    base_dir: &Path,
    station: &StationKey,
    force: bool,
) -> Result<PathBuf> {
    let result = metadata::read_station_metadata(base_dir, station)
        .and_then(|metadata| download_from_metadata(client, base_dir, station, &metadata, force));
    if let Err(ref e) = result {
        logging::log_download_failure(&station.station_name, "raw data download", e);
    }
    result
}

fn download_from_metadata(
    client: &reqwest::blocking::Client,
    base_dir: &Path,
    station: &StationKey,
    metadata: &StationMetadata,
    force: bool,
) -> Result<PathBuf> {
    let url = metadata.disdrodb_data_url.as_deref().ok_or_else(|| {
        DisdrodbError::Metadata(format!(
            "station {} has no disdrodb_data_url in its metadata",
            station
        ))
    })?;

    let data_dir = archive::raw_station_data_dir(base_dir, station);
    archive::prepare_product_directory(&data_dir, force)?;

    logging::info(
        Stage::Download,
        Some(&station.station_name),
        &format!("downloading {}", url),
    );

    let response = client.get(url).send()?;
    if !response.status().is_success() {
        return Err(DisdrodbError::HttpError(response.status().as_u16()));
    }
    let body = response.bytes()?;

    let filepath = data_dir.join(filename_from_url(url)?);
    let mut file = std::fs::File::create(&filepath)?;
    file.write_all(&body)?;

    logging::info(
        Stage::Download,
        Some(&station.station_name),
        &format!("stored {} ({} bytes)", filepath.display(), body.len()),
    );
    Ok(filepath)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
