//! 领域端口：设备状态存储、遥测通道、外部路线服务

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Deserialize;

use crate::domain::model::{DeviceReading, DeviceSnapshot, UpsertOutcome};
use crate::domain::value_object::GeoPoint;
use crate::error::FleetResult;

/// 设备状态仓储
///
/// upsert 不会失败；snapshot 返回一致的时间点副本。
pub trait DeviceStateRepository: Send + Sync {
    fn upsert(&self, reading: &DeviceReading) -> UpsertOutcome;

    fn snapshot(&self) -> DeviceSnapshot;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 遥测通道上的一条原始消息
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub channel: String,
    pub payload: Vec<u8>,
}

/// 订阅流；流结束表示连接断开
pub type MessageStream = BoxStream<'static, InboundMessage>;

#[async_trait]
pub trait TelemetryChannel: Send + Sync {
    /// 按通配符模式建立一个订阅
    async fn subscribe(&self, pattern: &str) -> FleetResult<MessageStream>;

    fn describe(&self) -> String;
}

/// 外部多站点行程规划服务
#[async_trait]
pub trait TripService: Send + Sync {
    /// 按提交顺序规划行程，首个坐标为起点
    async fn plan_trip(&self, coordinates: &[GeoPoint]) -> FleetResult<TripResponse>;
}

/// 行程服务响应
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TripResponse {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub trips: Vec<Trip>,
    #[serde(default)]
    pub waypoints: Vec<TripWaypoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Trip {
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub geometry: Option<TripGeometry>,
}

/// GeoJSON LineString，坐标为 [lng, lat]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TripGeometry {
    #[serde(default)]
    pub coordinates: Vec<[f64; 2]>,
}

/// 按提交顺序排列的路点
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TripWaypoint {
    /// 该输入坐标在优化后访问顺序中的位置
    pub waypoint_index: usize,
    #[serde(default)]
    pub trips_index: usize,
    #[serde(default)]
    pub location: Option<[f64; 2]>,
}
