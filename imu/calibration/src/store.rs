use imu_traits::{AxisKind, CalibrationStore, ImuError, ImuResult, ScaleSelector};
use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::operator::CancelToken;
use crate::payload::CalibrationPayload;

/// Writes the identity payload to every scale of every writable axis group.
///
/// Returns the number of payloads written. Axis groups whose store is not
/// writable are skipped.
pub fn reset_calibration_store<D>(device: &mut D, cancel: &CancelToken) -> ImuResult<usize>
where
    D: ScaleSelector + CalibrationStore + ?Sized,
{
    let mut written = 0;
    for kind in AxisKind::iter() {
        let Some(count) = device.scale_count(kind) else {
            continue;
        };
        for scale in 0..count {
            cancel.check()?;
            match device.write_calibration(kind, scale, CalibrationPayload::IDENTITY.words()) {
                Ok(()) => written += 1,
                Err(ImuError::NotSupported(reason)) => {
                    debug!("skipping {}: {}", kind, reason);
                    break;
                }
                Err(e) => return Err(e),
            }
        }
    }
    info!("reset {} calibration slots", written);
    Ok(written)
}
