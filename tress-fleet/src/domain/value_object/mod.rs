pub mod category;
pub mod device_identity;
pub mod fill_level;
pub mod geo_point;

pub use category::Category;
pub use device_identity::DeviceIdentity;
pub use fill_level::{FillGauge, FillLevel, FillSeverity};
pub use geo_point::{DistanceMetric, DistanceUnit, GeoPoint};
