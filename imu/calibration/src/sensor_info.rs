use ev3imu::DeviceFamily;
use imu_traits::{AxisKind, ImuError, ImuResult};

/// Earth gravity at the calibration site.
pub const G_ACTUAL: f64 = 9.812;
/// Standard gravity the device ranges are specified in.
pub const G_REFERENCE: f64 = 9.80665;
/// One local g in LSB on a +-1 g range.
pub const G_SCALED: f64 = 0x8000 as f64 * G_ACTUAL / G_REFERENCE;
/// Turntable speed in dps.
pub const ROTATION_SPEED: f64 = 199.951171875;

const LSM6DS3_ACCEL_RANGES_G: [f64; 4] = [2.0, 4.0, 8.0, 16.0];
const LSM9DS0_ACCEL_RANGES_G: [f64; 5] = [2.0, 4.0, 6.0, 8.0, 24.0];
// dps per LSB
const LSM6DS3_GYRO_SENSITIVITY: [f64; 4] = [8.75e-3, 17.5e-3, 35e-3, 70e-3];
const LSM9DS0_GYRO_SENSITIVITY: [f64; 3] = [8.75e-3, 17.5e-3, 70e-3];

/// Sign relation between the sensor output and the fixture reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrientation {
    Direct,
    /// Output sign is inverted relative to the physical rotation, as for a gyroscope on a clockwise turntable.
    Reversed,
}

impl AxisOrientation {
    pub fn sign(&self) -> f64 {
        match self {
            AxisOrientation::Direct => 1.0,
            AxisOrientation::Reversed => -1.0,
        }
    }
}

/// Static description of one axis group of a device family.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorInfo {
    kind: AxisKind,
    orientation: AxisOrientation,
    sample_offset: usize,
    reference_values: Vec<f64>,
}

impl SensorInfo {
    pub fn new(
        kind: AxisKind,
        orientation: AxisOrientation,
        sample_offset: usize,
        reference_values: Vec<f64>,
    ) -> ImuResult<Self> {
        if reference_values.is_empty() {
            return Err(ImuError::ConfigurationError(format!(
                "{} needs at least one reference value",
                kind
            )));
        }
        Ok(SensorInfo {
            kind,
            orientation,
            sample_offset,
            reference_values,
        })
    }

    /// Looks up the calibration description for an axis group of a board.
    pub fn for_device(family: DeviceFamily, kind: AxisKind) -> ImuResult<Self> {
        let (orientation, values): (AxisOrientation, Vec<f64>) = match (family, kind) {
            (DeviceFamily::Lsm6ds3, AxisKind::Accelerometer) => (
                AxisOrientation::Direct,
                LSM6DS3_ACCEL_RANGES_G.iter().map(|g| G_SCALED / g).collect(),
            ),
            (DeviceFamily::Lsm9ds0, AxisKind::Accelerometer) => (
                AxisOrientation::Direct,
                LSM9DS0_ACCEL_RANGES_G.iter().map(|g| G_SCALED / g).collect(),
            ),
            (DeviceFamily::Lsm6ds3, AxisKind::Gyroscope) => (
                AxisOrientation::Reversed,
                LSM6DS3_GYRO_SENSITIVITY
                    .iter()
                    .map(|s| ROTATION_SPEED / s)
                    .collect(),
            ),
            (DeviceFamily::Lsm9ds0, AxisKind::Gyroscope) => (
                AxisOrientation::Reversed,
                LSM9DS0_GYRO_SENSITIVITY
                    .iter()
                    .map(|s| ROTATION_SPEED / s)
                    .collect(),
            ),
            _ => {
                return Err(ImuError::NotSupported(format!(
                    "no six-point reference for {} {}",
                    family, kind
                )))
            }
        };
        let offset = family
            .axis(kind)
            .map(|table| table.combined_offset)
            .ok_or_else(|| ImuError::NotSupported(format!("{} has no {}", family, kind)))?;
        SensorInfo::new(kind, orientation, offset, values)
    }

    /// Every range of an axis group with a zero reference, for stationary offset capture.
    pub fn zero_rate(family: DeviceFamily, kind: AxisKind) -> ImuResult<Self> {
        let table = family
            .axis(kind)
            .ok_or_else(|| ImuError::NotSupported(format!("{} has no {}", family, kind)))?;
        SensorInfo::new(
            kind,
            AxisOrientation::Direct,
            table.combined_offset,
            vec![0.0; table.scale_count()],
        )
    }

    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    pub fn orientation(&self) -> AxisOrientation {
        self.orientation
    }

    /// Start of this group's values in a combined sample.
    pub fn sample_offset(&self) -> usize {
        self.sample_offset
    }

    pub fn scale_count(&self) -> usize {
        self.reference_values.len()
    }

    /// Reference magnitude per scale, in raw LSB.
    pub fn reference_values(&self) -> &[f64] {
        &self.reference_values
    }

    pub fn check_scale(&self, scale: usize) -> ImuResult<()> {
        if scale >= self.scale_count() {
            return Err(ImuError::ConfigurationError(format!(
                "{} scale {} out of range 0..{}",
                self.kind,
                scale,
                self.scale_count()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accelerometer_catalogue() {
        let info = SensorInfo::for_device(DeviceFamily::Lsm9ds0, AxisKind::Accelerometer).unwrap();
        assert_eq!(info.scale_count(), 5);
        assert_eq!(info.orientation(), AxisOrientation::Direct);
        assert_eq!(info.sample_offset(), 0);
        assert!((info.reference_values()[0] - 16392.938).abs() < 1e-3);
        assert!((info.reference_values()[4] * 24.0 - G_SCALED).abs() < 1e-9);
    }

    #[test]
    fn test_gyroscope_catalogue() {
        let info = SensorInfo::for_device(DeviceFamily::Lsm6ds3, AxisKind::Gyroscope).unwrap();
        assert_eq!(info.scale_count(), 4);
        assert_eq!(info.orientation(), AxisOrientation::Reversed);
        assert_eq!(info.sample_offset(), 3);
        assert!((info.reference_values()[3] - ROTATION_SPEED / 70e-3).abs() < 1e-9);
    }

    #[test]
    fn test_zero_rate_covers_every_range() {
        let info = SensorInfo::zero_rate(DeviceFamily::Lsm6ds3, AxisKind::Gyroscope).unwrap();
        assert_eq!(info.scale_count(), 5);
        assert!(info.reference_values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_unsupported_combinations() {
        assert!(matches!(
            SensorInfo::for_device(DeviceFamily::Lsm6ds3, AxisKind::Magnetometer),
            Err(ImuError::NotSupported(_))
        ));
        assert!(SensorInfo::for_device(DeviceFamily::Lsm330dlc, AxisKind::Accelerometer).is_err());
    }

    #[test]
    fn test_check_scale() {
        let info = SensorInfo::new(AxisKind::Gyroscope, AxisOrientation::Direct, 0, vec![1.0, 2.0])
            .unwrap();
        assert!(info.check_scale(1).is_ok());
        assert!(matches!(info.check_scale(2), Err(ImuError::ConfigurationError(_))));
        assert!(SensorInfo::new(AxisKind::Gyroscope, AxisOrientation::Direct, 0, vec![]).is_err());
    }
}
