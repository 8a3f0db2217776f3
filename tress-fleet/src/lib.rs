//! Tress 车队服务
//!
//! 订阅垃圾桶传感器遥测，维护每个设备的最新状态，并为收运车辆计算访问顺序。

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interface;
pub mod service;

pub use config::FleetConfig;
pub use error::{DecodeError, FleetError, FleetResult};
