//! Fixed-point encoding of a solved 4x3 correction matrix.
//!
//! The gain block is stored in Q14 (`0x4000` is 1.0). The bias row is stored
//! halved because the device doubles its corrected output.

use imu_traits::CALIBRATION_WORDS;
use nalgebra::{Matrix4x3, Vector3};

/// Q14 representation of 1.0.
pub const BLOCK_ONE: f64 = 16384.0;
/// Divisor applied to the bias row before rounding.
pub const BIAS_DIVISOR: f64 = 2.0;

const ONE: i16 = 0x4000;

/// Twelve signed words in device order: 3x3 block row-major, then the bias row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationPayload {
    words: [i16; CALIBRATION_WORDS],
}

impl CalibrationPayload {
    /// Unit gain, zero bias. The device reports raw values under this payload.
    pub const IDENTITY: CalibrationPayload = CalibrationPayload {
        words: [ONE, 0, 0, 0, ONE, 0, 0, 0, ONE, 0, 0, 0],
    };

    pub fn from_words(words: [i16; CALIBRATION_WORDS]) -> Self {
        CalibrationPayload { words }
    }

    pub fn words(&self) -> &[i16; CALIBRATION_WORDS] {
        &self.words
    }

    /// Rounds half away from zero. Out-of-range values wrap, they are not clamped.
    pub fn quantize(x: &Matrix4x3<f64>) -> Self {
        let mut words = [0i16; CALIBRATION_WORDS];
        for row in 0..3 {
            for col in 0..3 {
                words[row * 3 + col] = to_word(x[(row, col)] * BLOCK_ONE);
            }
        }
        for col in 0..3 {
            words[9 + col] = to_word(x[(3, col)] / BIAS_DIVISOR);
        }
        CalibrationPayload { words }
    }

    pub fn dequantize(&self) -> Matrix4x3<f64> {
        Matrix4x3::from_fn(|row, col| {
            let word = self.words[row * 3 + col] as f64;
            if row < 3 {
                word / BLOCK_ONE
            } else {
                word * BIAS_DIVISOR
            }
        })
    }

    /// Identity gain with an additive bias in raw LSB.
    pub fn bias_only(bias: &Vector3<f64>) -> Self {
        let mut words = Self::IDENTITY.words;
        for (slot, value) in words[9..].iter_mut().zip(bias.iter()) {
            *slot = to_word(value / BIAS_DIVISOR);
        }
        CalibrationPayload { words }
    }

    /// Corrects one raw reading the way the device firmware does:
    /// `2 * (sum(raw_i * m_ij >> 15) + b_j)`, saturated on the final doubling.
    pub fn apply(&self, raw: [i16; 3]) -> [i16; 3] {
        let mut out = [0i16; 3];
        for (col, value) in out.iter_mut().enumerate() {
            let mut sum = self.words[9 + col] as i32;
            for (row, &r) in raw.iter().enumerate() {
                sum += (r as i32 * self.words[row * 3 + col] as i32) >> 15;
            }
            *value = (sum as i16).saturating_mul(2);
        }
        out
    }
}

impl Default for CalibrationPayload {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn to_word(value: f64) -> i16 {
    value.round() as i64 as i16
}
