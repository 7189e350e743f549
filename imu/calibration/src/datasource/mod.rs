//! Producers of per-scale sample matrices.
//!
//! Every source returns one matrix per scale with `positions.len() * sample_count`
//! rows laid out position by position, so raw and reference matrices line up row
//! for row.

mod file;
mod measurement;
mod reference;
mod saving;

pub use file::FileDataSource;
pub use measurement::MeasurementDataSource;
pub use reference::ReferenceDataSource;
pub use saving::SavingDataSource;

use imu_traits::ImuResult;
use nalgebra::DMatrix;

use crate::position::Position;

/// Raw sample columns: three axis readings plus the constant bias column.
pub const RAW_COLUMNS: usize = 4;
/// Reference columns: the expected 3-vector.
pub const REFERENCE_COLUMNS: usize = 3;

pub trait DataSource {
    fn get(&mut self, sample_count: usize, positions: &[Position]) -> ImuResult<Vec<DMatrix<f64>>>;
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    fn get(&mut self, sample_count: usize, positions: &[Position]) -> ImuResult<Vec<DMatrix<f64>>> {
        (**self).get(sample_count, positions)
    }
}
