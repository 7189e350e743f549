use nalgebra::Vector3;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use crate::sensor_info::AxisOrientation;

/// Fixture orientation held during one measurement block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Position {
    #[strum(to_string = "Z UP")]
    ZUp,
    #[strum(to_string = "Z DOWN")]
    ZDown,
    #[strum(to_string = "Y UP")]
    YUp,
    #[strum(to_string = "Y DOWN")]
    YDown,
    #[strum(to_string = "X UP")]
    XUp,
    #[strum(to_string = "X DOWN")]
    XDown,
}

impl Position {
    /// The six positions in measurement order.
    pub fn canonical() -> Vec<Position> {
        Position::iter().collect()
    }

    /// Expected sensor vector for reference magnitude `r`.
    pub fn reference_vector(&self, r: f64, orientation: AxisOrientation) -> Vector3<f64> {
        let v = match self {
            Position::ZUp => Vector3::new(0.0, 0.0, r),
            Position::ZDown => Vector3::new(0.0, 0.0, -r),
            Position::YUp => Vector3::new(0.0, r, 0.0),
            Position::YDown => Vector3::new(0.0, -r, 0.0),
            Position::XUp => Vector3::new(r, 0.0, 0.0),
            Position::XDown => Vector3::new(-r, 0.0, 0.0),
        };
        v * orientation.sign()
    }
}
