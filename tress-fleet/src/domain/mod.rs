//! 领域层：值对象、模型、端口与路线优化

pub mod model;
pub mod repository;
pub mod service;
pub mod value_object;

pub use repository::{DeviceStateRepository, TelemetryChannel, TripService};
