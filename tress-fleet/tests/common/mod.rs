#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tress_fleet::FleetConfig;
use tress_fleet::config::TripServiceSettings;
use tress_fleet::domain::TripService;
use tress_fleet::domain::repository::{Trip, TripGeometry, TripResponse, TripWaypoint};
use tress_fleet::domain::service::RouteStrategyPolicy;
use tress_fleet::domain::value_object::{DeviceIdentity, DistanceMetric, FillGauge, GeoPoint};
use tress_fleet::error::FleetResult;
use tress_fleet::infrastructure::ReconnectPolicy;

pub fn id(name: &str, operator_id: i64) -> DeviceIdentity {
    DeviceIdentity::new(name, operator_id).unwrap()
}

pub fn test_config(strategy: RouteStrategyPolicy) -> FleetConfig {
    FleetConfig {
        service_name: "tress-fleet-test".to_string(),
        redis_url: "redis://127.0.0.1:6379/0".to_string(),
        telemetry_topic: "trash/gps/*".to_string(),
        reconnect: ReconnectPolicy::fixed(10),
        fill_gauge: FillGauge::default(),
        route_strategy: strategy,
        exact_max_stops: 9,
        distance_metric: DistanceMetric::Haversine,
        trip_service: Some(TripServiceSettings {
            base_url: "http://stub".to_string(),
            profile: None,
            timeout: Duration::from_secs(5),
        }),
    }
}

pub fn telemetry_json(name: &str, operator_id: i64, lat: f64, lng: f64) -> String {
    format!(
        r#"{{"operatorName":"{}","operatorId":{},"lat":{},"lng":{}}}"#,
        name, operator_id, lat, lng
    )
}

/// 轮询直到条件成立，超时则失败
pub async fn eventually<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {}", what);
}

pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("operation timed out")
}

/// 行程服务桩：按给定的 waypoint_index 返回结果，可配置首次调用延迟
pub struct StubTripService {
    code: String,
    waypoint_indices: Vec<usize>,
    first_call_delay: Duration,
    calls: AtomicUsize,
    submitted: Mutex<Vec<Vec<GeoPoint>>>,
}

impl StubTripService {
    pub fn ok(waypoint_indices: Vec<usize>) -> Self {
        Self::with_code("Ok", waypoint_indices)
    }

    pub fn with_code(code: &str, waypoint_indices: Vec<usize>) -> Self {
        Self {
            code: code.to_string(),
            waypoint_indices,
            first_call_delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// 对于任意数量的坐标都按提交顺序返回
    pub fn identity_order() -> Self {
        Self::ok(Vec::new())
    }

    pub fn slow_first_call(mut self, delay: Duration) -> Self {
        self.first_call_delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<Vec<GeoPoint>> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl TripService for StubTripService {
    async fn plan_trip(&self, coordinates: &[GeoPoint]) -> FleetResult<TripResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().push(coordinates.to_vec());
        if call == 0 && !self.first_call_delay.is_zero() {
            tokio::time::sleep(self.first_call_delay).await;
        }

        let indices = if self.waypoint_indices.is_empty() {
            (0..coordinates.len()).collect()
        } else {
            self.waypoint_indices.clone()
        };

        Ok(TripResponse {
            code: self.code.clone(),
            message: None,
            trips: vec![Trip {
                distance: 1500.0,
                duration: 240.0,
                geometry: Some(TripGeometry {
                    coordinates: coordinates
                        .iter()
                        .map(|p| [p.longitude, p.latitude])
                        .collect(),
                }),
            }],
            waypoints: indices
                .into_iter()
                .map(|waypoint_index| TripWaypoint {
                    waypoint_index,
                    trips_index: 0,
                    location: None,
                })
                .collect(),
        })
    }
}
