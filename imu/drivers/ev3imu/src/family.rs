use imu_traits::AxisKind;
use num_traits::FromPrimitive;
use strum_macros::{Display, EnumIter, EnumString};

use crate::commands::{Lsm330dlcCommand, Lsm6ds3Command, Lsm9ds0Command};

const ACCEL_FULL_SCALE: f32 = 32768.0;

/// Command and conversion constants for one axis group of a board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTable {
    pub kind: AxisKind,
    /// Scale-select command for range 0.
    pub scale_base: u8,
    /// Calibration-write command for range 0, `None` when the store is not writable.
    pub calibration_base: Option<u8>,
    /// Physical units per LSB, one entry per range.
    pub scale_factors: &'static [f32],
    /// Output mode that returns only this axis group.
    pub mode: u8,
    /// Start of this group's 3-value span in a combined sample.
    pub combined_offset: usize,
}

impl AxisTable {
    pub fn scale_count(&self) -> usize {
        self.scale_factors.len()
    }
}

const LSM6DS3_ACCEL: [f32; 4] = [
    2.0 / ACCEL_FULL_SCALE,
    4.0 / ACCEL_FULL_SCALE,
    8.0 / ACCEL_FULL_SCALE,
    16.0 / ACCEL_FULL_SCALE,
];
// dps per LSB, 125 dps range last
const LSM6DS3_GYRO: [f32; 5] = [8.75e-3, 17.5e-3, 35e-3, 70e-3, 4.375e-3];

const LSM9DS0_ACCEL: [f32; 5] = [
    2.0 / ACCEL_FULL_SCALE,
    4.0 / ACCEL_FULL_SCALE,
    6.0 / ACCEL_FULL_SCALE,
    8.0 / ACCEL_FULL_SCALE,
    24.0 / ACCEL_FULL_SCALE,
];
const LSM9DS0_GYRO: [f32; 3] = [8.75e-3, 17.5e-3, 70e-3];
// mgauss per LSB
const LSM9DS0_MAG: [f32; 4] = [0.08, 0.16, 0.32, 0.48];

const LSM330DLC_ACCEL: [f32; 4] = [
    2.0 / ACCEL_FULL_SCALE,
    4.0 / ACCEL_FULL_SCALE,
    8.0 / ACCEL_FULL_SCALE,
    24.0 / ACCEL_FULL_SCALE,
];
const LSM330DLC_GYRO: [f32; 3] = [8.75e-3, 17.5e-3, 70e-3];

const LSM6DS3_AXES: [AxisTable; 2] = [
    AxisTable {
        kind: AxisKind::Accelerometer,
        scale_base: Lsm6ds3Command::AccScale2g as u8,
        calibration_base: Some(Lsm6ds3Command::CalibrateAcc2g as u8),
        scale_factors: &LSM6DS3_ACCEL,
        mode: 1,
        combined_offset: 0,
    },
    AxisTable {
        kind: AxisKind::Gyroscope,
        scale_base: Lsm6ds3Command::GyroScale245dps as u8,
        calibration_base: Some(Lsm6ds3Command::CalibrateGyro245dps as u8),
        scale_factors: &LSM6DS3_GYRO,
        mode: 2,
        combined_offset: 3,
    },
];

const LSM9DS0_AXES: [AxisTable; 3] = [
    AxisTable {
        kind: AxisKind::Accelerometer,
        scale_base: Lsm9ds0Command::AccScale2g as u8,
        calibration_base: Some(Lsm9ds0Command::CalibrateAcc2g as u8),
        scale_factors: &LSM9DS0_ACCEL,
        mode: 1,
        combined_offset: 0,
    },
    AxisTable {
        kind: AxisKind::Gyroscope,
        scale_base: Lsm9ds0Command::GyroScale245dps as u8,
        calibration_base: Some(Lsm9ds0Command::CalibrateGyro245dps as u8),
        scale_factors: &LSM9DS0_GYRO,
        mode: 2,
        combined_offset: 3,
    },
    AxisTable {
        kind: AxisKind::Magnetometer,
        scale_base: Lsm9ds0Command::MagScale2gs as u8,
        calibration_base: Some(Lsm9ds0Command::CalibrateMag2gs as u8),
        scale_factors: &LSM9DS0_MAG,
        mode: 3,
        combined_offset: 6,
    },
];

const LSM330DLC_AXES: [AxisTable; 2] = [
    AxisTable {
        kind: AxisKind::Accelerometer,
        scale_base: Lsm330dlcCommand::AccScale2g as u8,
        calibration_base: None,
        scale_factors: &LSM330DLC_ACCEL,
        mode: 1,
        combined_offset: 0,
    },
    AxisTable {
        kind: AxisKind::Gyroscope,
        scale_base: Lsm330dlcCommand::GyroScale250dps as u8,
        calibration_base: None,
        scale_factors: &LSM330DLC_GYRO,
        mode: 2,
        combined_offset: 3,
    },
];

/// Supported sensor boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum DeviceFamily {
    #[strum(to_string = "lsm6ds3")]
    Lsm6ds3,
    #[strum(to_string = "lsm9ds0")]
    Lsm9ds0,
    #[strum(to_string = "lsm330dlc")]
    Lsm330dlc,
}

impl DeviceFamily {
    /// Output mode returning every installed axis group in one buffer.
    pub const COMBINED_MODE: u8 = 0;

    pub fn axes(&self) -> &'static [AxisTable] {
        match self {
            DeviceFamily::Lsm6ds3 => &LSM6DS3_AXES,
            DeviceFamily::Lsm9ds0 => &LSM9DS0_AXES,
            DeviceFamily::Lsm330dlc => &LSM330DLC_AXES,
        }
    }

    pub fn axis(&self, kind: AxisKind) -> Option<&'static AxisTable> {
        self.axes().iter().find(|table| table.kind == kind)
    }

    pub fn combined_size(&self) -> usize {
        self.axes().len() * 3
    }

    pub fn reset_command(&self) -> u8 {
        match self {
            DeviceFamily::Lsm6ds3 => Lsm6ds3Command::DeviceReset as u8,
            DeviceFamily::Lsm9ds0 => Lsm9ds0Command::DeviceReset as u8,
            DeviceFamily::Lsm330dlc => Lsm330dlcCommand::DeviceReset as u8,
        }
    }

    /// Names a command byte for logging.
    pub fn describe_command(&self, byte: u8) -> String {
        let name = match self {
            DeviceFamily::Lsm6ds3 => Lsm6ds3Command::from_u8(byte).map(|c| format!("{:?}", c)),
            DeviceFamily::Lsm9ds0 => Lsm9ds0Command::from_u8(byte).map(|c| format!("{:?}", c)),
            DeviceFamily::Lsm330dlc => {
                Lsm330dlcCommand::from_u8(byte).map(|c| format!("{:?}", c))
            }
        };
        name.unwrap_or_else(|| format!("0x{:02X}", byte))
    }
}
