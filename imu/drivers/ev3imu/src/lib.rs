pub mod commands;
pub mod family;
pub mod port;
pub mod wire;

pub use family::{AxisTable, DeviceFamily};
pub use imu_traits::{
    AxisKind, CalibrationStore, Delay, ImuError, ImuResult, SampleProvider, ScaleSelector,
    SystemDelay, Transport, Vector3, CALIBRATION_WORDS,
};
pub use port::SerialTransport;

use log::{debug, warn};

/// Wait after a scale or output-mode change; the board has no ready signal.
pub const SCALE_SWITCH_DELAY_MS: u64 = 10;
pub const MODE_SWITCH_DELAY_MS: u64 = SCALE_SWITCH_DELAY_MS;
/// Nonvolatile write time per transmitted byte.
pub const EEPROM_WRITE_DELAY_PER_BYTE_MS: u64 = 3;

/// Which groups a `fetch_sample` call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    Combined,
    Single(AxisKind),
}

/// Offsets and scale factors for one read mode.
#[derive(Debug, Clone, PartialEq)]
struct SampleLayout {
    mode: u8,
    groups: Vec<(AxisKind, usize)>,
    size: usize,
}

impl SampleLayout {
    fn for_mode(family: DeviceFamily, read_mode: ReadMode) -> ImuResult<Self> {
        match read_mode {
            ReadMode::Combined => Ok(SampleLayout {
                mode: DeviceFamily::COMBINED_MODE,
                groups: family
                    .axes()
                    .iter()
                    .map(|table| (table.kind, table.combined_offset))
                    .collect(),
                size: family.combined_size(),
            }),
            ReadMode::Single(kind) => {
                let table = family.axis(kind).ok_or_else(|| unsupported(family, kind))?;
                Ok(SampleLayout {
                    mode: table.mode,
                    groups: vec![(kind, 0)],
                    size: 3,
                })
            }
        }
    }
}

fn unsupported(family: DeviceFamily, kind: AxisKind) -> ImuError {
    ImuError::NotSupported(format!("{} has no {}", family, kind))
}

/// EV3 IMU sensor board speaking the scale-indexed command protocol.
pub struct Ev3Imu<T: Transport, D: Delay = SystemDelay> {
    transport: T,
    delay: D,
    family: DeviceFamily,
    raw_mode: bool,
    layout: SampleLayout,
    active_mode: Option<u8>,
    scales: Vec<(AxisKind, usize)>,
    buffer: Vec<i16>,
}

impl<T: Transport> Ev3Imu<T, SystemDelay> {
    pub fn new(transport: T, family: DeviceFamily, raw_mode: bool) -> ImuResult<Self> {
        Self::with_delay(transport, SystemDelay, family, raw_mode)
    }
}

impl<T: Transport, D: Delay> Ev3Imu<T, D> {
    /// Creates a driver reading in combined mode with every group on range 0.
    pub fn with_delay(transport: T, delay: D, family: DeviceFamily, raw_mode: bool) -> ImuResult<Self> {
        let layout = SampleLayout::for_mode(family, ReadMode::Combined)?;
        Ok(Ev3Imu {
            transport,
            delay,
            family,
            raw_mode,
            buffer: vec![0; layout.size],
            layout,
            active_mode: None,
            scales: family.axes().iter().map(|table| (table.kind, 0)).collect(),
        })
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    pub fn raw_mode(&self) -> bool {
        self.raw_mode
    }

    /// Range index last selected for `kind`.
    pub fn current_scale(&self, kind: AxisKind) -> Option<usize> {
        self.scales
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, idx)| *idx)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Returns the board to its power-on state.
    pub fn reset(&mut self) -> ImuResult<()> {
        let command = self.family.reset_command();
        self.send_command(&[command])?;
        self.active_mode = None;
        for (_, idx) in self.scales.iter_mut() {
            *idx = 0;
        }
        Ok(())
    }

    pub fn set_read_mode(&mut self, read_mode: ReadMode) -> ImuResult<()> {
        let layout = SampleLayout::for_mode(self.family, read_mode)?;
        self.buffer.resize(layout.size, 0);
        self.layout = layout;
        Ok(())
    }

    fn scale_factor(&self, kind: AxisKind) -> f32 {
        if self.raw_mode {
            return 1.0;
        }
        match (self.family.axis(kind), self.current_scale(kind)) {
            (Some(table), Some(idx)) => table.scale_factors.get(idx).copied().unwrap_or(1.0),
            _ => 1.0,
        }
    }

    fn ensure_mode(&mut self) -> ImuResult<()> {
        if self.active_mode == Some(self.layout.mode) {
            return Ok(());
        }
        self.transport.set_mode(self.layout.mode)?;
        self.delay.delay_ms(MODE_SWITCH_DELAY_MS);
        self.active_mode = Some(self.layout.mode);
        debug!("{}: switched to output mode {}", self.family, self.layout.mode);
        Ok(())
    }

    fn send_command(&mut self, bytes: &[u8]) -> ImuResult<()> {
        debug!(
            "{}: sending {} ({} bytes)",
            self.family,
            self.family.describe_command(bytes[0]),
            bytes.len()
        );
        let written = self.transport.write(bytes)?;
        if written != bytes.len() {
            warn!(
                "{}: short write of {} ({}/{} bytes)",
                self.family,
                self.family.describe_command(bytes[0]),
                written,
                bytes.len()
            );
            return Err(ImuError::WriteError(format!(
                "wrote {} of {} bytes",
                written,
                bytes.len()
            )));
        }
        Ok(())
    }

    fn writable_table(&self, kind: AxisKind) -> ImuResult<(&'static AxisTable, u8)> {
        let table = self
            .family
            .axis(kind)
            .ok_or_else(|| unsupported(self.family, kind))?;
        let base = table.calibration_base.ok_or_else(|| {
            ImuError::NotSupported(format!("{} {} has no calibration store", self.family, kind))
        })?;
        Ok((table, base))
    }
}

fn check_index(family: DeviceFamily, table: &AxisTable, idx: usize) -> ImuResult<()> {
    if idx >= table.scale_count() {
        return Err(ImuError::ConfigurationError(format!(
            "{} {} scale {} out of range 0..{}",
            family,
            table.kind,
            idx,
            table.scale_count()
        )));
    }
    Ok(())
}

impl<T: Transport, D: Delay> ScaleSelector for Ev3Imu<T, D> {
    fn scale_count(&self, kind: AxisKind) -> Option<usize> {
        self.family.axis(kind).map(AxisTable::scale_count)
    }

    fn select_scale(&mut self, kind: AxisKind, idx: usize) -> ImuResult<()> {
        let table = self
            .family
            .axis(kind)
            .ok_or_else(|| unsupported(self.family, kind))?;
        check_index(self.family, table, idx)?;

        let command = wire::indexed_command(table.scale_base, idx)?;
        self.send_command(&[command])?;
        self.delay.delay_ms(SCALE_SWITCH_DELAY_MS);

        if let Some(entry) = self.scales.iter_mut().find(|(k, _)| *k == kind) {
            entry.1 = idx;
        }
        Ok(())
    }
}

impl<T: Transport, D: Delay> CalibrationStore for Ev3Imu<T, D> {
    fn write_calibration(
        &mut self,
        kind: AxisKind,
        idx: usize,
        payload: &[i16; CALIBRATION_WORDS],
    ) -> ImuResult<()> {
        let (table, base) = self.writable_table(kind)?;
        check_index(self.family, table, idx)?;

        let frame = wire::calibration_frame(base, idx, payload)?;
        self.send_command(&frame)?;
        self.delay
            .delay_ms(frame.len() as u64 * EEPROM_WRITE_DELAY_PER_BYTE_MS);
        Ok(())
    }
}

impl<T: Transport, D: Delay> SampleProvider for Ev3Imu<T, D> {
    fn sample_size(&self) -> usize {
        self.layout.size
    }

    fn fetch_sample(&mut self, sample: &mut [f32]) -> ImuResult<()> {
        if sample.len() < self.layout.size {
            return Err(ImuError::ConfigurationError(format!(
                "sample buffer holds {} values, mode needs {}",
                sample.len(),
                self.layout.size
            )));
        }
        self.ensure_mode()?;
        self.transport.read_shorts(&mut self.buffer)?;

        for &(kind, offset) in &self.layout.groups {
            let factor = self.scale_factor(kind);
            for i in offset..offset + 3 {
                sample[i] = self.buffer[i] as f32 * factor;
            }
        }
        Ok(())
    }
}
