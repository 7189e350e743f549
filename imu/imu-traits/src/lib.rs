use std::fmt;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

/// Number of signed 16-bit words in one scale's calibration payload (4x3 matrix).
pub const CALIBRATION_WORDS: usize = 12;

// --- Basic Types ---
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Vector3 { x, y, z }
    }

    /// Reads three consecutive values starting at `offset`.
    pub fn from_slice(values: &[f32], offset: usize) -> Option<Self> {
        let span = values.get(offset..offset + 3)?;
        Some(Vector3::new(span[0], span[1], span[2]))
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector3(x={}, y={}, z={})", self.x, self.y, self.z)
    }
}

/// Physical axis group installed on a sensor board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum AxisKind {
    #[strum(to_string = "accelerometer", serialize = "accel")]
    Accelerometer,
    #[strum(to_string = "gyroscope", serialize = "gyro")]
    Gyroscope,
    #[strum(to_string = "magnetometer", serialize = "mag")]
    Magnetometer,
}

// --- Standard Error Type ---
#[derive(Debug, Error)]
pub enum ImuError {
    /// Error originating from the underlying device communication (serial port)
    #[error("Device error: {0}")]
    DeviceError(String),
    /// Short or failed read of a sample buffer
    #[error("Read error: {0}")]
    ReadError(String),
    /// Short or failed write of a command
    #[error("Write error: {0}")]
    WriteError(String),
    /// Scale index out of range, malformed template or mismatched shapes
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// Functionality not supported by this device family
    #[error("Not supported: {0}")]
    NotSupported(String),
    /// Malformed or missing replay/audit file
    #[error("Parse error in {}:{line}: {message}", path.display())]
    ParseError {
        path: PathBuf,
        line: usize,
        message: String,
    },
    /// Normal matrix of the least-squares problem cannot be inverted
    #[error("Singular matrix for scale {scale}: calibration positions do not span all axes")]
    SingularMatrix { scale: usize },
    /// The run was aborted through its cancellation token
    #[error("Calibration cancelled")]
    Cancelled,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serialport::Error> for ImuError {
    fn from(err: serialport::Error) -> Self {
        ImuError::DeviceError(format!("Serial error: {}", err))
    }
}

pub type ImuResult<T> = Result<T, ImuError>;

/// Byte-level link to the sensor. Every call blocks until complete.
pub trait Transport {
    /// Writes `bytes` and returns how many were accepted.
    fn write(&mut self, bytes: &[u8]) -> ImuResult<usize>;

    /// Fills `buffer` with little-endian 16-bit values from the current read mode.
    fn read_shorts(&mut self, buffer: &mut [i16]) -> ImuResult<()>;

    /// Switches the device output mode.
    fn set_mode(&mut self, mode: u8) -> ImuResult<()>;
}

/// Blocking wait used for settle and stabilization delays.
pub trait Delay {
    fn delay_ms(&self, ms: u64);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDelay;

impl Delay for SystemDelay {
    fn delay_ms(&self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

pub trait ScaleSelector {
    /// Number of selectable ranges for `kind`, `None` when the axis group is absent.
    fn scale_count(&self, kind: AxisKind) -> Option<usize>;

    /// Selects range `idx` for `kind`. No byte is issued for an invalid index.
    fn select_scale(&mut self, kind: AxisKind, idx: usize) -> ImuResult<()>;
}

pub trait CalibrationStore {
    /// Writes one quantized 4x3 correction matrix into the persistent store for range `idx`.
    fn write_calibration(
        &mut self,
        kind: AxisKind,
        idx: usize,
        payload: &[i16; CALIBRATION_WORDS],
    ) -> ImuResult<()>;
}

pub trait SampleProvider {
    /// Number of values produced by one `fetch_sample` call.
    fn sample_size(&self) -> usize;

    fn fetch_sample(&mut self, sample: &mut [f32]) -> ImuResult<()>;
}
