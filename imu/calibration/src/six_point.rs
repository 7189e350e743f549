//! Six-point least-squares calibration.
//!
//! For each scale the raw samples `W` (n x 4, last column 1) and the reference
//! vectors `Y` (n x 3) are fitted with `X = (W^T W)^-1 W^T Y`. The first scale
//! that cannot be solved aborts the run; scales already written stay written.

use imu_traits::{ImuError, ImuResult};
use nalgebra::{DMatrix, Matrix4x3};
use tracing::{info, warn};

use crate::datasource::{DataSource, ReferenceDataSource, RAW_COLUMNS, REFERENCE_COLUMNS};
use crate::operator::CancelToken;
use crate::payload::CalibrationPayload;
use crate::persist;
use crate::position::Position;
use crate::provider::PayloadWriter;
use crate::sensor_info::SensorInfo;
use crate::settings::CalibrationSettings;

/// Smallest accepted ratio between the extreme singular values of `W^T W`.
pub const MIN_CONDITION_RATIO: f64 = 1e-12;

/// Result of one scale's fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleFit {
    pub scale: usize,
    pub matrix: Matrix4x3<f64>,
    pub payload: CalibrationPayload,
    /// Root mean square of the per-row residual vector length, in raw LSB.
    pub rms_residual: f64,
    /// Same measure for the quantized payload run through the device's fixed-point correction.
    pub device_residual: f64,
}

/// Solves the normal equations for one scale.
pub fn solve(scale: usize, w: &DMatrix<f64>, y: &DMatrix<f64>) -> ImuResult<(Matrix4x3<f64>, f64)> {
    if w.ncols() != RAW_COLUMNS || y.ncols() != REFERENCE_COLUMNS || w.nrows() != y.nrows() {
        return Err(ImuError::ConfigurationError(format!(
            "scale {}: samples are {}x{}, reference is {}x{}",
            scale,
            w.nrows(),
            w.ncols(),
            y.nrows(),
            y.ncols()
        )));
    }

    let wt = w.transpose();
    let normal = &wt * w;

    let singular = normal.singular_values();
    let largest = singular.iter().cloned().fold(0.0, f64::max);
    let smallest = singular.iter().cloned().fold(f64::INFINITY, f64::min);
    if largest.is_nan() || largest <= 0.0 || smallest / largest < MIN_CONDITION_RATIO {
        return Err(ImuError::SingularMatrix { scale });
    }

    let inverse = normal
        .try_inverse()
        .ok_or(ImuError::SingularMatrix { scale })?;
    let x = inverse * wt * y;

    let residual = w * &x - y;
    let rms = (residual.norm_squared() / w.nrows() as f64).sqrt();
    Ok((Matrix4x3::from_fn(|row, col| x[(row, col)]), rms))
}

/// Replays the raw rows of `w` through the device-side correction of `payload`
/// and returns the RMS distance to `y`, in raw LSB.
pub fn device_residual(payload: &CalibrationPayload, w: &DMatrix<f64>, y: &DMatrix<f64>) -> f64 {
    if w.nrows() == 0 {
        return 0.0;
    }
    let mut sum = 0.0;
    for (raw, expected) in w.row_iter().zip(y.row_iter()) {
        let corrected = payload.apply([
            raw[0].round() as i16,
            raw[1].round() as i16,
            raw[2].round() as i16,
        ]);
        for col in 0..3 {
            sum += (corrected[col] as f64 - expected[col]).powi(2);
        }
    }
    (sum / w.nrows() as f64).sqrt()
}

pub struct SixPointCalibration {
    info: SensorInfo,
    settings: CalibrationSettings,
    cancel: CancelToken,
}

impl SixPointCalibration {
    pub fn new(info: SensorInfo, settings: CalibrationSettings) -> Self {
        SixPointCalibration {
            info,
            settings,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn info(&self) -> &SensorInfo {
        &self.info
    }

    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    pub fn positions(&self) -> Vec<Position> {
        Position::canonical()
    }

    /// Pulls raw samples for every scale from `source`.
    pub fn collect<S: DataSource + ?Sized>(&self, source: &mut S) -> ImuResult<Vec<DMatrix<f64>>> {
        self.cancel.check()?;
        let raw = source.get(self.settings.sample_count, &self.positions())?;
        if raw.len() != self.info.scale_count() {
            return Err(ImuError::ConfigurationError(format!(
                "source returned {} scales, {} has {}",
                raw.len(),
                self.info.kind(),
                self.info.scale_count()
            )));
        }
        Ok(raw)
    }

    /// Solves every scale, writes its audit file and hands the payload to `writer`.
    pub fn calibrate<W: PayloadWriter + ?Sized>(
        &self,
        raw: &[DMatrix<f64>],
        writer: &mut W,
    ) -> ImuResult<Vec<ScaleFit>> {
        if raw.len() != self.info.scale_count() {
            return Err(ImuError::ConfigurationError(format!(
                "{} sample sets for {} scales",
                raw.len(),
                self.info.scale_count()
            )));
        }
        let reference = ReferenceDataSource::from_sensor(&self.info)
            .get(self.settings.sample_count, &self.positions())?;

        let mut fits = Vec::with_capacity(raw.len());
        for (scale, (w, y)) in raw.iter().zip(&reference).enumerate() {
            self.cancel.check()?;
            let (matrix, rms_residual) = solve(scale, w, y).inspect_err(|e| {
                warn!(scale, "calibration aborted: {}", e);
            })?;
            persist::write_correction(&self.settings.audit_template.path(scale), &matrix)?;

            let payload = CalibrationPayload::quantize(&matrix);
            let replayed = device_residual(&payload, w, y);
            info!(
                kind = %self.info.kind(),
                scale,
                rms_residual,
                device_residual = replayed,
                "solved"
            );
            self.cancel.check()?;
            writer.write_payload(scale, &payload)?;

            fits.push(ScaleFit {
                scale,
                matrix,
                payload,
                rms_residual,
                device_residual: replayed,
            });
        }
        Ok(fits)
    }

    /// `collect` followed by `calibrate`, for a source that does not share the writer's device.
    pub fn run<S, W>(&self, source: &mut S, writer: &mut W) -> ImuResult<Vec<ScaleFit>>
    where
        S: DataSource + ?Sized,
        W: PayloadWriter + ?Sized,
    {
        let raw = self.collect(source)?;
        self.calibrate(&raw, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor_info::AxisOrientation;

    fn with_bias_column(y: &DMatrix<f64>) -> DMatrix<f64> {
        let mut w = DMatrix::from_element(y.nrows(), RAW_COLUMNS, 1.0);
        w.view_mut((0, 0), (y.nrows(), 3)).copy_from(y);
        w
    }

    fn reference(r: f64, sample_count: usize) -> DMatrix<f64> {
        let mut source = ReferenceDataSource::new(vec![r], AxisOrientation::Direct);
        source
            .get(sample_count, &Position::canonical())
            .unwrap()
            .remove(0)
    }

    #[test]
    fn test_identity_recovered() {
        let y = reference(1000.0, 4);
        let w = with_bias_column(&y);
        let (x, rms) = solve(0, &w, &y).unwrap();

        let expected = Matrix4x3::new(
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, //
            0.0, 0.0, 0.0,
        );
        assert!((x - expected).amax() < 1e-9);
        assert!(rms < 1e-9);
    }

    #[test]
    fn test_identical_rows_are_singular() {
        let w = DMatrix::from_fn(24, 4, |_, col| [12.0, -3.0, 980.0, 1.0][col]);
        let y = reference(1000.0, 4);
        assert!(matches!(
            solve(2, &w, &y),
            Err(ImuError::SingularMatrix { scale: 2 })
        ));
    }

    #[test]
    fn test_solve_is_deterministic() {
        let y = reference(512.0, 3);
        let w = DMatrix::from_fn(18, 4, |row, col| {
            if col == 3 {
                1.0
            } else {
                y[(row, col)] * (1.0 + 0.01 * col as f64) + (row % 5) as f64 - 2.0
            }
        });
        let first = solve(0, &w, &y).unwrap();
        let second = solve(0, &w, &y).unwrap();
        assert_eq!(first.0.as_slice(), second.0.as_slice());
        assert_eq!(first.1.to_bits(), second.1.to_bits());
    }

    #[test]
    fn test_device_residual_of_exact_fit() {
        let y = reference(16384.0, 2);
        let w = with_bias_column(&y);
        let (x, _) = solve(0, &w, &y).unwrap();
        let payload = CalibrationPayload::quantize(&x);
        assert!(device_residual(&payload, &w, &y) < 1e-9);

        // a halved gain block leaves half of every reference vector
        let mut halved = x;
        halved.fixed_view_mut::<3, 3>(0, 0).scale_mut(0.5);
        let residual = device_residual(&CalibrationPayload::quantize(&halved), &w, &y);
        assert!((residual - 8192.0).abs() < 1e-9);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let y = reference(1.0, 2);
        let w = DMatrix::from_element(10, 4, 1.0);
        assert!(matches!(solve(0, &w, &y), Err(ImuError::ConfigurationError(_))));
    }
}
