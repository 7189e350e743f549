use imu_traits::ImuResult;
use nalgebra::DMatrix;
use tracing::info;

use super::{DataSource, RAW_COLUMNS};
use crate::persist::{self, FileTemplate};
use crate::position::Position;

/// Replays raw samples written by an earlier run, one file per scale.
#[derive(Debug, Clone)]
pub struct FileDataSource {
    scale_count: usize,
    columns: usize,
    template: FileTemplate,
}

impl FileDataSource {
    pub fn new(scale_count: usize, template: FileTemplate) -> Self {
        Self::with_columns(scale_count, RAW_COLUMNS, template)
    }

    pub fn with_columns(scale_count: usize, columns: usize, template: FileTemplate) -> Self {
        FileDataSource {
            scale_count,
            columns,
            template,
        }
    }
}

impl DataSource for FileDataSource {
    fn get(&mut self, sample_count: usize, positions: &[Position]) -> ImuResult<Vec<DMatrix<f64>>> {
        let rows = positions.len() * sample_count;
        (0..self.scale_count)
            .map(|scale| {
                let path = self.template.path(scale);
                info!("loading scale {} from {}", scale, path.display());
                persist::read_matrix(&path, rows, self.columns)
            })
            .collect()
    }
}
