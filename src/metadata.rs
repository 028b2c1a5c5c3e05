/// Station metadata handling.
///
/// Every station in the Raw archive carries a TOML metadata file at
/// `Raw/<DATA_SOURCE>/<CAMPAIGN_NAME>/metadata/<station_name>.toml`.
/// The metadata names the sensor, the reader able to parse the raw files,
/// and the station geolocation written into the L0B attributes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::archive::{metadata_filepath, StationKey};
use crate::model::{DisdrodbError, Result};
use crate::readers;
use crate::sensors;

// ---------------------------------------------------------------------------
// Metadata model
// ---------------------------------------------------------------------------

/// Station metadata as declared in the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationMetadata {
    pub data_source: String,
    pub campaign_name: String,
    pub station_name: String,
    /// Must name a sensor registered in `sensors::SENSOR_REGISTRY`.
    pub sensor_name: String,
    /// Reader reference, `<DATA_SOURCE>/<READER_NAME>`.
    pub reader: String,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Altitude above sea level, in meters.
    pub altitude: f64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sensor_serial_number: Option<String>,
    /// Nominal sampling interval of the sensor, in seconds.
    #[serde(default)]
    pub measurement_interval: Option<u32>,
    /// Remote location of the station raw data archive, used by
    /// `disdrodb_download_station`.
    #[serde(default)]
    pub disdrodb_data_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Reading and validation
// ---------------------------------------------------------------------------

/// Reads and validates the metadata of a station.
pub fn read_station_metadata(base_dir: &Path, station: &StationKey) -> Result<StationMetadata> {
    let path = metadata_filepath(base_dir, station);
    if !path.is_file() {
        return Err(DisdrodbError::Metadata(format!(
            "metadata file {} does not exist",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(&path)?;
    let metadata: StationMetadata = toml::from_str(&content)
        .map_err(|e| DisdrodbError::Metadata(format!("invalid {}: {}", path.display(), e)))?;
    check_metadata(&metadata, station)?;
    Ok(metadata)
}

/// Checks metadata compliance against the archive location, the sensor
/// registry and the reader registry.
pub fn check_metadata(metadata: &StationMetadata, station: &StationKey) -> Result<()> {
    // The identity keys must match where the file sits in the archive,
    // otherwise L0B attributes would contradict the product paths.
    let pairs = [
        ("data_source", &metadata.data_source, &station.data_source),
        ("campaign_name", &metadata.campaign_name, &station.campaign_name),
        ("station_name", &metadata.station_name, &station.station_name),
    ];
    for (label, declared, expected) in pairs {
        if declared != expected {
            return Err(DisdrodbError::Metadata(format!(
                "{}: metadata declares {}='{}' but the archive path says '{}'",
                station, label, declared, expected
            )));
        }
    }

    if sensors::find_sensor(&metadata.sensor_name).is_none() {
        return Err(DisdrodbError::SensorNotFound(format!(
            "{} (station {}); available sensors: {:?}",
            metadata.sensor_name,
            station,
            sensors::available_sensors()
        )));
    }

    readers::check_reader_reference(&metadata.reader)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::StationKey;

    fn valid_metadata_toml() -> String {
        r#"
            data_source = "EPFL"
            campaign_name = "EPFL_ROOF_2008"
            station_name = "10"
            sensor_name = "OTT_Parsivel"
            reader = "EPFL/EPFL_ROOF_2008"
            latitude = 46.52
            longitude = 6.57
            altitude = 400.0
            measurement_interval = 30
        "#
        .to_string()
    }

    fn write_metadata(base_dir: &Path, station: &StationKey, content: &str) {
        let path = metadata_filepath(base_dir, station);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_read_valid_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let station = StationKey::new("EPFL", "EPFL_ROOF_2008", "10");
        write_metadata(dir.path(), &station, &valid_metadata_toml());

        let metadata = read_station_metadata(dir.path(), &station).unwrap();
        assert_eq!(metadata.sensor_name, "OTT_Parsivel");
        assert_eq!(metadata.reader, "EPFL/EPFL_ROOF_2008");
        assert_eq!(metadata.measurement_interval, Some(30));
        assert!(metadata.disdrodb_data_url.is_none());
    }

    #[test]
    fn test_missing_metadata_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let station = StationKey::new("EPFL", "EPFL_ROOF_2008", "10");
        let err = read_station_metadata(dir.path(), &station).unwrap_err();
        assert!(matches!(err, DisdrodbError::Metadata(_)));
    }

    #[test]
    fn test_campaign_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        // Metadata declares EPFL_ROOF_2008 but sits in the DAVOS_2009 campaign.
        let station = StationKey::new("EPFL", "DAVOS_2009", "10");
        write_metadata(dir.path(), &station, &valid_metadata_toml());
        let err = read_station_metadata(dir.path(), &station).unwrap_err();
        assert!(err.to_string().contains("campaign_name"));
    }

    #[test]
    fn test_unknown_sensor_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let station = StationKey::new("EPFL", "EPFL_ROOF_2008", "10");
        let content = valid_metadata_toml().replace("OTT_Parsivel", "JW_RD69");
        write_metadata(dir.path(), &station, &content);
        let err = read_station_metadata(dir.path(), &station).unwrap_err();
        assert!(matches!(err, DisdrodbError::SensorNotFound(_)));
    }

    #[test]
    fn test_unknown_reader_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let station = StationKey::new("EPFL", "EPFL_ROOF_2008", "10");
        let content = valid_metadata_toml().replace("EPFL/EPFL_ROOF_2008", "EPFL/UNKNOWN_CAMPAIGN");
        write_metadata(dir.path(), &station, &content);
        let err = read_station_metadata(dir.path(), &station).unwrap_err();
        assert!(matches!(err, DisdrodbError::ReaderNotFound(_)));
    }

    #[test]
    fn test_missing_required_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let station = StationKey::new("EPFL", "EPFL_ROOF_2008", "10");
        let content = valid_metadata_toml().replace("sensor_name = \"OTT_Parsivel\"", "");
        write_metadata(dir.path(), &station, &content);
        assert!(read_station_metadata(dir.path(), &station).is_err());
    }
}
