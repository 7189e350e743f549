use imu_traits::{AxisKind, CalibrationStore, ImuError, ImuResult, SampleProvider, ScaleSelector};
use nalgebra::Vector3;
use tracing::debug;

use crate::payload::CalibrationPayload;
use crate::sensor_info::SensorInfo;

/// Destination for one scale's quantized correction.
pub trait PayloadWriter {
    fn write_payload(&mut self, scale: usize, payload: &CalibrationPayload) -> ImuResult<()>;
}

/// One axis group of a device: range selection plus three-value samples.
pub trait ScaledSampleProvider: PayloadWriter {
    fn set_scale(&mut self, scale: usize) -> ImuResult<()>;

    fn fetch(&mut self) -> ImuResult<Vector3<f64>>;
}

/// Binds a device to the axis group described by a `SensorInfo`.
pub struct ImuDataProvider<D> {
    device: D,
    info: SensorInfo,
    sample: Vec<f32>,
}

impl<D> ImuDataProvider<D>
where
    D: ScaleSelector + CalibrationStore + SampleProvider,
{
    pub fn new(device: D, info: SensorInfo) -> ImuResult<Self> {
        let size = device.sample_size();
        if info.sample_offset() + 3 > size {
            return Err(ImuError::ConfigurationError(format!(
                "{} at offset {} does not fit a {}-value sample",
                info.kind(),
                info.sample_offset(),
                size
            )));
        }
        match device.scale_count(info.kind()) {
            Some(count) if count >= info.scale_count() => {}
            Some(count) => {
                return Err(ImuError::ConfigurationError(format!(
                    "{} has {} scales, calibration needs {}",
                    info.kind(),
                    count,
                    info.scale_count()
                )))
            }
            None => {
                return Err(ImuError::NotSupported(format!(
                    "device has no {}",
                    info.kind()
                )))
            }
        }
        Ok(ImuDataProvider {
            device,
            info,
            sample: vec![0.0; size],
        })
    }

    pub fn info(&self) -> &SensorInfo {
        &self.info
    }

    pub fn kind(&self) -> AxisKind {
        self.info.kind()
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_inner(self) -> D {
        self.device
    }
}

impl<D> PayloadWriter for ImuDataProvider<D>
where
    D: ScaleSelector + CalibrationStore + SampleProvider,
{
    fn write_payload(&mut self, scale: usize, payload: &CalibrationPayload) -> ImuResult<()> {
        self.info.check_scale(scale)?;
        debug!(kind = %self.info.kind(), scale, "writing calibration payload");
        self.device
            .write_calibration(self.info.kind(), scale, payload.words())
    }
}

impl<D> ScaledSampleProvider for ImuDataProvider<D>
where
    D: ScaleSelector + CalibrationStore + SampleProvider,
{
    fn set_scale(&mut self, scale: usize) -> ImuResult<()> {
        self.info.check_scale(scale)?;
        self.device.select_scale(self.info.kind(), scale)
    }

    fn fetch(&mut self) -> ImuResult<Vector3<f64>> {
        self.device.fetch_sample(&mut self.sample)?;
        let offset = self.info.sample_offset();
        Ok(Vector3::new(
            self.sample[offset] as f64,
            self.sample[offset + 1] as f64,
            self.sample[offset + 2] as f64,
        ))
    }
}
