use imu_traits::ImuResult;
use nalgebra::DMatrix;

use super::{DataSource, REFERENCE_COLUMNS};
use crate::position::Position;
use crate::sensor_info::{AxisOrientation, SensorInfo};

/// Expected sensor output for each position, repeated once per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDataSource {
    reference_values: Vec<f64>,
    orientation: AxisOrientation,
}

impl ReferenceDataSource {
    pub fn new(reference_values: Vec<f64>, orientation: AxisOrientation) -> Self {
        ReferenceDataSource {
            reference_values,
            orientation,
        }
    }

    pub fn from_sensor(info: &SensorInfo) -> Self {
        Self::new(info.reference_values().to_vec(), info.orientation())
    }

    pub fn scale_count(&self) -> usize {
        self.reference_values.len()
    }
}

impl DataSource for ReferenceDataSource {
    fn get(&mut self, sample_count: usize, positions: &[Position]) -> ImuResult<Vec<DMatrix<f64>>> {
        let rows = positions.len() * sample_count;
        let matrices = self
            .reference_values
            .iter()
            .map(|&r| {
                let mut y = DMatrix::zeros(rows, REFERENCE_COLUMNS);
                for (i, position) in positions.iter().enumerate() {
                    let expected = position.reference_vector(r, self.orientation);
                    for row in i * sample_count..(i + 1) * sample_count {
                        for (col, value) in expected.iter().enumerate() {
                            y[(row, col)] = *value;
                        }
                    }
                }
                y
            })
            .collect();
        Ok(matrices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_rows() {
        let mut source = ReferenceDataSource::new(vec![5.0, 7.0], AxisOrientation::Direct);
        let y = source.get(2, &Position::canonical()).unwrap();

        assert_eq!(y.len(), 2);
        assert_eq!(y[0].shape(), (12, 3));
        let expected = [
            [0.0, 0.0, 5.0],
            [0.0, 0.0, -5.0],
            [0.0, 5.0, 0.0],
            [0.0, -5.0, 0.0],
            [5.0, 0.0, 0.0],
            [-5.0, 0.0, 0.0],
        ];
        for (i, row) in expected.iter().enumerate() {
            for k in 0..2 {
                for col in 0..3 {
                    assert_eq!(y[0][(i * 2 + k, col)], row[col]);
                }
            }
        }
        assert_eq!(y[1][(0, 2)], 7.0);
    }

    #[test]
    fn test_reversed_keeps_position_order() {
        let mut direct = ReferenceDataSource::new(vec![3.0], AxisOrientation::Direct);
        let mut reversed = ReferenceDataSource::new(vec![3.0], AxisOrientation::Reversed);
        let positions = Position::canonical();
        let d = direct.get(4, &positions).unwrap();
        let r = reversed.get(4, &positions).unwrap();
        assert_eq!(r[0], -&d[0]);
        assert_eq!(r[0][(0, 2)], -3.0);
        assert_eq!(r[0][(4, 2)], 3.0);
    }
}
