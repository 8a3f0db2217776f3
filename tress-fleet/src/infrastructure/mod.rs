//! 基础设施层：存储、消息通道、外部路线服务

pub mod decoder;
pub mod messaging;
pub mod persistence;
pub mod retry;
pub mod routing;

pub use decoder::TelemetryDecoder;
pub use messaging::{InMemoryTelemetryChannel, RedisTelemetryChannel};
pub use persistence::memory::InMemoryDeviceStateStore;
pub use retry::ReconnectPolicy;
pub use routing::OsrmTripClient;
