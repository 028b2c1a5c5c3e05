/// Sensor registry for the DISDRODB processing chain.
///
/// Defines the canonical list of disdrometer models this crate can
/// standardize, along with their diameter and velocity class geometry.
/// This is the single source of truth for bin coordinates — L0B processing
/// and the metadata checks reference sensors from here rather than
/// hardcoding bin counts.

// ---------------------------------------------------------------------------
// Sensor specification
// ---------------------------------------------------------------------------

/// Geometry and raw-format conventions of a single disdrometer model.
pub struct SensorSpec {
    /// Sensor name as reported in station metadata (e.g. "OTT_Parsivel").
    pub name: &'static str,
    /// Diameter class centers, in mm, ascending.
    pub diameter_bin_center: &'static [f64],
    /// Diameter class widths, in mm.
    pub diameter_bin_width: &'static [f64],
    /// Fall velocity class centers, in m/s, ascending.
    pub velocity_bin_center: &'static [f64],
    /// Fall velocity class widths, in m/s.
    pub velocity_bin_width: &'static [f64],
    /// Delimiter between values inside the packed spectrum strings
    /// (raw_drop_number, raw_drop_concentration, raw_drop_average_velocity).
    pub spectrum_delimiter: char,
}

impl SensorSpec {
    /// Number of diameter classes.
    pub fn n_diameter_bins(&self) -> usize {
        self.diameter_bin_center.len()
    }

    /// Number of velocity classes.
    pub fn n_velocity_bins(&self) -> usize {
        self.velocity_bin_center.len()
    }

    /// Expected value count of a packed `raw_drop_number` string.
    pub fn spectrum_size(&self) -> usize {
        self.n_diameter_bins() * self.n_velocity_bins()
    }
}

// ---------------------------------------------------------------------------
// OTT Parsivel class geometry
// ---------------------------------------------------------------------------
// The Parsivel and Parsivel2 share the same 32x32 class layout.
// Sources: OTT Parsivel2 operating instructions, tables 4.5 and 4.6.

static PARSIVEL_DIAMETER_CENTER: [f64; 32] = [
    0.062, 0.187, 0.312, 0.437, 0.562, 0.687, 0.812, 0.937, 1.062, 1.187, // 0.125 mm classes
    1.375, 1.625, 1.875, 2.125, 2.375, // 0.25 mm classes
    2.75, 3.25, 3.75, 4.25, 4.75, // 0.5 mm classes
    5.5, 6.5, 7.5, 8.5, 9.5, // 1 mm classes
    11.0, 13.0, 15.0, 17.0, 19.0, // 2 mm classes
    21.5, 24.5, // 3 mm classes
];

static PARSIVEL_DIAMETER_WIDTH: [f64; 32] = [
    0.125, 0.125, 0.125, 0.125, 0.125, 0.125, 0.125, 0.125, 0.125, 0.125, //
    0.25, 0.25, 0.25, 0.25, 0.25, //
    0.5, 0.5, 0.5, 0.5, 0.5, //
    1.0, 1.0, 1.0, 1.0, 1.0, //
    2.0, 2.0, 2.0, 2.0, 2.0, //
    3.0, 3.0,
];

static PARSIVEL_VELOCITY_CENTER: [f64; 32] = [
    0.05, 0.15, 0.25, 0.35, 0.45, 0.55, 0.65, 0.75, 0.85, 0.95, // 0.1 m/s classes
    1.1, 1.3, 1.5, 1.7, 1.9, // 0.2 m/s classes
    2.2, 2.6, 3.0, 3.4, 3.8, // 0.4 m/s classes
    4.4, 5.2, 6.0, 6.8, 7.6, // 0.8 m/s classes
    8.8, 10.4, 12.0, 13.6, 15.2, // 1.6 m/s classes
    17.6, 20.8, // 3.2 m/s classes
];

static PARSIVEL_VELOCITY_WIDTH: [f64; 32] = [
    0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, //
    0.2, 0.2, 0.2, 0.2, 0.2, //
    0.4, 0.4, 0.4, 0.4, 0.4, //
    0.8, 0.8, 0.8, 0.8, 0.8, //
    1.6, 1.6, 1.6, 1.6, 1.6, //
    3.2, 3.2,
];

// ---------------------------------------------------------------------------
// Thies LPM class geometry
// ---------------------------------------------------------------------------
// 22 diameter x 20 velocity classes. The last diameter class is open-ended
// (> 8 mm) and is assigned a nominal 1 mm width.

static THIES_DIAMETER_CENTER: [f64; 22] = [
    0.1875, 0.3125, 0.4375, //
    0.625, 0.875, 1.125, 1.375, 1.625, 1.875, //
    2.25, 2.75, 3.25, 3.75, 4.25, 4.75, 5.25, 5.75, 6.25, 6.75, 7.25, 7.75, //
    8.5,
];

static THIES_DIAMETER_WIDTH: [f64; 22] = [
    0.125, 0.125, 0.125, //
    0.25, 0.25, 0.25, 0.25, 0.25, 0.25, //
    0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, //
    1.0,
];

static THIES_VELOCITY_CENTER: [f64; 20] = [
    0.1, 0.3, 0.5, 0.7, 0.9, //
    1.2, 1.6, 2.0, 2.4, 2.8, 3.2, //
    3.8, 4.6, 5.4, 6.2, 7.0, 7.8, 8.6, //
    9.5, 15.0,
];

static THIES_VELOCITY_WIDTH: [f64; 20] = [
    0.2, 0.2, 0.2, 0.2, 0.2, //
    0.4, 0.4, 0.4, 0.4, 0.4, 0.4, //
    0.8, 0.8, 0.8, 0.8, 0.8, 0.8, 0.8, //
    1.0, 10.0,
];

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// All disdrometer models supported by the L0 processing chain.
pub static SENSOR_REGISTRY: &[SensorSpec] = &[
    SensorSpec {
        name: "OTT_Parsivel",
        diameter_bin_center: &PARSIVEL_DIAMETER_CENTER,
        diameter_bin_width: &PARSIVEL_DIAMETER_WIDTH,
        velocity_bin_center: &PARSIVEL_VELOCITY_CENTER,
        velocity_bin_width: &PARSIVEL_VELOCITY_WIDTH,
        spectrum_delimiter: ',',
    },
    SensorSpec {
        name: "OTT_Parsivel2",
        diameter_bin_center: &PARSIVEL_DIAMETER_CENTER,
        diameter_bin_width: &PARSIVEL_DIAMETER_WIDTH,
        velocity_bin_center: &PARSIVEL_VELOCITY_CENTER,
        velocity_bin_width: &PARSIVEL_VELOCITY_WIDTH,
        spectrum_delimiter: ',',
    },
    SensorSpec {
        name: "Thies_LPM",
        diameter_bin_center: &THIES_DIAMETER_CENTER,
        diameter_bin_width: &THIES_DIAMETER_WIDTH,
        velocity_bin_center: &THIES_VELOCITY_CENTER,
        velocity_bin_width: &THIES_VELOCITY_WIDTH,
        spectrum_delimiter: ';',
    },
];

/// Looks up a sensor by name. Returns `None` if not found.
pub fn find_sensor(sensor_name: &str) -> Option<&'static SensorSpec> {
    SENSOR_REGISTRY.iter().find(|s| s.name == sensor_name)
}

/// Returns the names of all registered sensors.
pub fn available_sensors() -> Vec<&'static str> {
    SENSOR_REGISTRY.iter().map(|s| s.name).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contains_expected_sensors() {
        for expected in ["OTT_Parsivel", "OTT_Parsivel2", "Thies_LPM"] {
            assert!(
                find_sensor(expected).is_some(),
                "SENSOR_REGISTRY missing expected sensor '{}'",
                expected
            );
        }
    }

    #[test]
    fn test_find_sensor_returns_none_for_unknown_name() {
        assert!(find_sensor("RD80").is_none());
    }

    #[test]
    fn test_parsivel_has_32x32_classes() {
        let sensor = find_sensor("OTT_Parsivel").unwrap();
        assert_eq!(sensor.n_diameter_bins(), 32);
        assert_eq!(sensor.n_velocity_bins(), 32);
        assert_eq!(sensor.spectrum_size(), 1024);
    }

    #[test]
    fn test_thies_has_22x20_classes() {
        let sensor = find_sensor("Thies_LPM").unwrap();
        assert_eq!(sensor.n_diameter_bins(), 22);
        assert_eq!(sensor.n_velocity_bins(), 20);
        assert_eq!(sensor.spectrum_size(), 440);
    }

    #[test]
    fn test_bin_centers_are_strictly_ascending() {
        // Out-of-order bin centers would silently corrupt every L0B
        // spectrum written against this registry.
        for sensor in SENSOR_REGISTRY {
            for window in sensor.diameter_bin_center.windows(2) {
                assert!(
                    window[0] < window[1],
                    "diameter centers not ascending for '{}'",
                    sensor.name
                );
            }
            for window in sensor.velocity_bin_center.windows(2) {
                assert!(
                    window[0] < window[1],
                    "velocity centers not ascending for '{}'",
                    sensor.name
                );
            }
        }
    }

    #[test]
    fn test_bin_widths_match_center_counts_and_are_positive() {
        for sensor in SENSOR_REGISTRY {
            assert_eq!(
                sensor.diameter_bin_center.len(),
                sensor.diameter_bin_width.len(),
                "diameter width count mismatch for '{}'",
                sensor.name
            );
            assert_eq!(
                sensor.velocity_bin_center.len(),
                sensor.velocity_bin_width.len(),
                "velocity width count mismatch for '{}'",
                sensor.name
            );
            assert!(sensor.diameter_bin_width.iter().all(|w| *w > 0.0));
            assert!(sensor.velocity_bin_width.iter().all(|w| *w > 0.0));
        }
    }

    #[test]
    fn test_no_duplicate_sensor_names() {
        let mut seen = std::collections::HashSet::new();
        for sensor in SENSOR_REGISTRY {
            assert!(
                seen.insert(sensor.name),
                "duplicate sensor '{}' in SENSOR_REGISTRY",
                sensor.name
            );
        }
    }

    #[test]
    fn test_available_sensors_matches_registry_length() {
        assert_eq!(available_sensors().len(), SENSOR_REGISTRY.len());
    }
}
