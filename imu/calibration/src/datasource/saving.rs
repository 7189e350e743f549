use imu_traits::ImuResult;
use nalgebra::DMatrix;
use tracing::info;

use super::DataSource;
use crate::persist::{self, FileTemplate};
use crate::position::Position;

/// Persists whatever the wrapped source returns, then hands it back unchanged.
#[derive(Debug, Clone)]
pub struct SavingDataSource<S> {
    inner: S,
    template: FileTemplate,
}

impl<S: DataSource> SavingDataSource<S> {
    pub fn new(inner: S, template: FileTemplate) -> Self {
        SavingDataSource { inner, template }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: DataSource> DataSource for SavingDataSource<S> {
    fn get(&mut self, sample_count: usize, positions: &[Position]) -> ImuResult<Vec<DMatrix<f64>>> {
        let matrices = self.inner.get(sample_count, positions)?;
        for (scale, matrix) in matrices.iter().enumerate() {
            let path = self.template.path(scale);
            info!("saving scale {} to {}", scale, path.display());
            persist::write_matrix(&path, matrix)?;
        }
        Ok(matrices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{FileDataSource, ReferenceDataSource};
    use crate::sensor_info::AxisOrientation;
    use std::fs;

    #[test]
    fn test_saved_files_replay_identically() {
        let dir = std::env::temp_dir().join(format!("imu-saving-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let template = FileTemplate::new(&format!("{}/y[{{}}].txt", dir.display())).unwrap();

        let reference = ReferenceDataSource::new(vec![1.5, -0.25], AxisOrientation::Direct);
        let mut saving = SavingDataSource::new(reference, template.clone());
        let positions = Position::canonical();
        let saved = saving.get(3, &positions).unwrap();

        assert!(template.path(0).exists());
        assert!(template.path(1).exists());
        assert!(!template.path(2).exists());

        let mut replay = FileDataSource::with_columns(2, 3, template);
        assert_eq!(replay.get(3, &positions).unwrap(), saved);
        fs::remove_dir_all(dir).unwrap();
    }
}
