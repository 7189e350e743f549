//! Bias-only gyroscope calibration from a stationary capture.
//!
//! The gain block stays at identity and the bias row cancels the mean
//! zero-rate output of each scale.

use imu_traits::{Delay, ImuError, ImuResult};
use nalgebra::{DMatrix, Matrix4x3, Vector3};
use tracing::{debug, info};

use crate::datasource::REFERENCE_COLUMNS;
use crate::deviation::DeviationCalc3D;
use crate::operator::{CancelToken, Operator};
use crate::payload::CalibrationPayload;
use crate::persist;
use crate::provider::{PayloadWriter, ScaledSampleProvider};
use crate::settings::CalibrationSettings;

#[derive(Debug, Clone, PartialEq)]
pub struct OffsetFit {
    pub scale: usize,
    /// Mean zero-rate output in raw LSB.
    pub mean: Vector3<f64>,
    pub deviation: Vector3<f64>,
    pub payload: CalibrationPayload,
}

pub struct GyroOffsetCalibration {
    scale_count: usize,
    settings: CalibrationSettings,
    cancel: CancelToken,
}

impl GyroOffsetCalibration {
    pub fn new(scale_count: usize, settings: CalibrationSettings) -> Self {
        GyroOffsetCalibration {
            scale_count,
            settings,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Records `sample_count` stationary samples per scale, each taken with the
    /// store reset to identity.
    pub fn capture<P, O, D>(
        &self,
        provider: &mut P,
        operator: &mut O,
        delay: &D,
    ) -> ImuResult<Vec<DMatrix<f64>>>
    where
        P: ScaledSampleProvider + ?Sized,
        O: Operator + ?Sized,
        D: Delay,
    {
        operator.wait_for_confirmation("Keep the sensor still")?;
        for remaining in (1..=self.settings.countdown_s).rev() {
            operator.show_progress("Starting in", remaining as usize);
            delay.delay_ms(1000);
        }

        let mut captures = Vec::with_capacity(self.scale_count);
        for scale in 0..self.scale_count {
            self.cancel.check()?;
            operator.show_progress("Measuring scale", scale);
            provider.write_payload(scale, &CalibrationPayload::IDENTITY)?;
            provider.set_scale(scale)?;
            delay.delay_ms(self.settings.stabilization_delay_ms);

            let mut samples = DMatrix::zeros(self.settings.sample_count, REFERENCE_COLUMNS);
            for row in 0..self.settings.sample_count {
                let v = provider.fetch()?;
                samples[(row, 0)] = v.x;
                samples[(row, 1)] = v.y;
                samples[(row, 2)] = v.z;
                delay.delay_ms(self.settings.sample_interval_ms);
            }
            debug!(scale, "captured stationary samples");
            captures.push(samples);
        }
        operator.beep();
        Ok(captures)
    }

    pub fn save(&self, captures: &[DMatrix<f64>]) -> ImuResult<()> {
        for (scale, samples) in captures.iter().enumerate() {
            persist::write_matrix(&self.settings.replay_template.path(scale), samples)?;
        }
        Ok(())
    }

    pub fn load(&self) -> ImuResult<Vec<DMatrix<f64>>> {
        (0..self.scale_count)
            .map(|scale| {
                persist::read_matrix(
                    &self.settings.replay_template.path(scale),
                    self.settings.sample_count,
                    REFERENCE_COLUMNS,
                )
            })
            .collect()
    }

    /// Derives and writes the bias payload of every scale.
    pub fn calibrate<W: PayloadWriter + ?Sized>(
        &self,
        captures: &[DMatrix<f64>],
        writer: &mut W,
    ) -> ImuResult<Vec<OffsetFit>> {
        if captures.len() != self.scale_count {
            return Err(ImuError::ConfigurationError(format!(
                "{} captures for {} scales",
                captures.len(),
                self.scale_count
            )));
        }

        let mut fits = Vec::with_capacity(captures.len());
        for (scale, samples) in captures.iter().enumerate() {
            self.cancel.check()?;
            let mut calc = DeviationCalc3D::new();
            for row in samples.row_iter() {
                calc.add(&Vector3::new(row[0], row[1], row[2]));
            }
            let mean = calc.mean();
            let correction = -mean;

            let mut audit = Matrix4x3::zeros();
            audit.fixed_view_mut::<3, 3>(0, 0).fill_with_identity();
            audit.set_row(3, &correction.transpose());
            persist::write_correction(&self.settings.audit_template.path(scale), &audit)?;

            let payload = CalibrationPayload::bias_only(&correction);
            info!(
                scale,
                x = mean.x,
                y = mean.y,
                z = mean.z,
                noise = calc.magnitude_deviation(),
                "zero-rate offset"
            );
            self.cancel.check()?;
            writer.write_payload(scale, &payload)?;

            fits.push(OffsetFit {
                scale,
                mean,
                deviation: calc.deviation(),
                payload,
            });
        }
        Ok(fits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(Vec<(usize, CalibrationPayload)>);

    impl PayloadWriter for Recorder {
        fn write_payload(&mut self, scale: usize, payload: &CalibrationPayload) -> ImuResult<()> {
            self.0.push((scale, *payload));
            Ok(())
        }
    }

    #[test]
    fn test_bias_from_mean() {
        let dir = std::env::temp_dir().join(format!("imu-gyro-offset-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let settings = CalibrationSettings::new(
            &format!("{}/X[{{}}].txt", dir.display()),
            &format!("{}/w[{{}}].txt", dir.display()),
        )
        .unwrap();
        let calibration = GyroOffsetCalibration::new(1, settings.clone());

        let samples = DMatrix::from_row_slice(
            4,
            3,
            &[
                10.0, -6.0, 1.0, //
                12.0, -4.0, 1.0, //
                11.0, -5.0, 0.0, //
                11.0, -5.0, 0.0,
            ],
        );
        let mut recorder = Recorder(Vec::new());
        let fits = calibration.calibrate(&[samples], &mut recorder).unwrap();

        assert!((fits[0].mean - Vector3::new(11.0, -5.0, 0.5)).norm() < 1e-12);
        assert_eq!(&recorder.0[0].1.words()[9..], &[-6, 3, 0]);
        assert_eq!(&recorder.0[0].1.words()[..9], &CalibrationPayload::IDENTITY.words()[..9]);

        let audit = persist::read_matrix(&settings.audit_template.path(0), 4, 3).unwrap();
        assert_eq!(audit[(0, 0)], 1.0);
        assert_eq!(audit[(3, 0)], -11.0);
        assert!((audit[(3, 2)] + 0.5).abs() < 1e-12);
        std::fs::remove_dir_all(dir).unwrap();
    }
}
