pub mod datasource;
pub mod deviation;
pub mod gyro_offset;
pub mod operator;
pub mod payload;
pub mod persist;
pub mod position;
pub mod provider;
pub mod sensor_info;
pub mod settings;
pub mod six_point;
pub mod store;

pub use datasource::{
    DataSource, FileDataSource, MeasurementDataSource, ReferenceDataSource, SavingDataSource,
};
pub use deviation::{DeviationCalc, DeviationCalc3D};
pub use gyro_offset::{GyroOffsetCalibration, OffsetFit};
pub use imu_traits::{AxisKind, ImuError, ImuResult};
pub use operator::{CancelToken, Operator};
pub use payload::CalibrationPayload;
pub use persist::FileTemplate;
pub use position::Position;
pub use provider::{ImuDataProvider, PayloadWriter, ScaledSampleProvider};
pub use sensor_info::{AxisOrientation, SensorInfo};
pub use settings::CalibrationSettings;
pub use six_point::{ScaleFit, SixPointCalibration};
pub use store::reset_calibration_store;
