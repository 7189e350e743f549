use imu_traits::ImuResult;

use crate::persist::FileTemplate;

/// Samples captured per position and scale.
pub const DEFAULT_SAMPLE_COUNT: usize = 2000;

/// Per-run parameters shared by the data sources and the calibration routines.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSettings {
    pub sample_count: usize,
    /// Wait after a scale change before the first sample.
    pub stabilization_delay_ms: u64,
    pub sample_interval_ms: u64,
    /// Seconds counted down after the operator confirms a position.
    pub countdown_s: u64,
    /// Solved matrices, one file per scale.
    pub audit_template: FileTemplate,
    /// Raw samples, one file per scale.
    pub replay_template: FileTemplate,
}

impl CalibrationSettings {
    pub fn new(audit_template: &str, replay_template: &str) -> ImuResult<Self> {
        Ok(CalibrationSettings {
            audit_template: FileTemplate::new(audit_template)?,
            replay_template: FileTemplate::new(replay_template)?,
            ..Default::default()
        })
    }
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        CalibrationSettings {
            sample_count: DEFAULT_SAMPLE_COUNT,
            stabilization_delay_ms: 20,
            sample_interval_ms: 3,
            countdown_s: 10,
            audit_template: FileTemplate::from_parts("X[", "].txt"),
            replay_template: FileTemplate::from_parts("w[", "].txt"),
        }
    }
}
