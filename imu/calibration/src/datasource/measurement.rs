use imu_traits::{Delay, ImuResult, SystemDelay};
use nalgebra::DMatrix;
use tracing::{debug, info};

use super::{DataSource, RAW_COLUMNS};
use crate::operator::{CancelToken, Operator};
use crate::payload::CalibrationPayload;
use crate::position::Position;
use crate::provider::ScaledSampleProvider;
use crate::settings::CalibrationSettings;

/// Samples the live device while the operator walks the fixture through each position.
pub struct MeasurementDataSource<'a, P: ?Sized, O: ?Sized, D = SystemDelay> {
    provider: &'a mut P,
    operator: &'a mut O,
    delay: D,
    scale_count: usize,
    settings: CalibrationSettings,
    cancel: CancelToken,
}

impl<'a, P, O> MeasurementDataSource<'a, P, O, SystemDelay>
where
    P: ScaledSampleProvider + ?Sized,
    O: Operator + ?Sized,
{
    pub fn new(
        provider: &'a mut P,
        operator: &'a mut O,
        scale_count: usize,
        settings: CalibrationSettings,
    ) -> Self {
        Self::with_delay(provider, operator, SystemDelay, scale_count, settings)
    }
}

impl<'a, P, O, D> MeasurementDataSource<'a, P, O, D>
where
    P: ScaledSampleProvider + ?Sized,
    O: Operator + ?Sized,
    D: Delay,
{
    pub fn with_delay(
        provider: &'a mut P,
        operator: &'a mut O,
        delay: D,
        scale_count: usize,
        settings: CalibrationSettings,
    ) -> Self {
        MeasurementDataSource {
            provider,
            operator,
            delay,
            scale_count,
            settings,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Loads the identity payload so the device reports uncorrected data.
    fn reset_store(&mut self) -> ImuResult<()> {
        for scale in 0..self.scale_count {
            self.cancel.check()?;
            self.operator.show_progress("Initializing scale", scale);
            self.provider
                .write_payload(scale, &CalibrationPayload::IDENTITY)?;
        }
        Ok(())
    }

    fn prepare(&mut self, position: Position) -> ImuResult<()> {
        self.operator
            .wait_for_confirmation(&format!("Hold {}", position))?;
        for remaining in (1..=self.settings.countdown_s).rev() {
            self.operator.show_progress("Starting in", remaining as usize);
            self.delay.delay_ms(1000);
        }
        Ok(())
    }

    fn measure_position(
        &mut self,
        matrices: &mut [DMatrix<f64>],
        sample_count: usize,
        row_offset: usize,
    ) -> ImuResult<()> {
        for (scale, w) in matrices.iter_mut().enumerate() {
            self.cancel.check()?;
            self.operator.show_progress("Measuring scale", scale);
            self.provider.set_scale(scale)?;
            self.delay.delay_ms(self.settings.stabilization_delay_ms);

            for row in row_offset..row_offset + sample_count {
                let v = self.provider.fetch()?;
                w[(row, 0)] = v.x;
                w[(row, 1)] = v.y;
                w[(row, 2)] = v.z;
                w[(row, 3)] = 1.0;
                self.delay.delay_ms(self.settings.sample_interval_ms);
            }
            debug!(scale, rows = sample_count, "captured");
        }
        Ok(())
    }
}

impl<P, O, D> DataSource for MeasurementDataSource<'_, P, O, D>
where
    P: ScaledSampleProvider + ?Sized,
    O: Operator + ?Sized,
    D: Delay,
{
    fn get(&mut self, sample_count: usize, positions: &[Position]) -> ImuResult<Vec<DMatrix<f64>>> {
        info!("resetting calibration store for {} scales", self.scale_count);
        self.reset_store()?;

        let rows = positions.len() * sample_count;
        let mut matrices = vec![DMatrix::zeros(rows, RAW_COLUMNS); self.scale_count];
        for (i, &position) in positions.iter().enumerate() {
            self.cancel.check()?;
            self.prepare(position)?;
            info!("measuring {}", position);
            self.measure_position(&mut matrices, sample_count, i * sample_count)?;
            self.operator.beep();
        }
        Ok(matrices)
    }
}
