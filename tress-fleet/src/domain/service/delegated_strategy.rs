//! 委托策略：调用外部行程服务
//!
//! 按提交顺序（起点在首位）发送坐标；服务为每个输入坐标返回 `waypoint_index`，
//! 即它在优化后访问顺序中的位置。结果通过同一份提交顺序映射回设备身份。

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::model::{RouteResult, RouteStop, RouteSummary, StrategyKind};
use crate::domain::repository::{TripResponse, TripService, TripWaypoint};
use crate::domain::value_object::{DeviceIdentity, DistanceUnit, GeoPoint};
use crate::error::{FleetError, FleetResult};

pub struct DelegatedRoutePlanner {
    service: Arc<dyn TripService>,
    timeout: Duration,
}

impl DelegatedRoutePlanner {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(service: Arc<dyn TripService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    pub async fn plan(&self, stops: &[RouteStop]) -> FleetResult<RouteResult> {
        if stops.len() < 2 {
            return Err(FleetError::InsufficientTargets {
                distinct: stops.len(),
            });
        }

        let coordinates: Vec<GeoPoint> = stops.iter().map(|s| s.location).collect();
        let response = tokio::time::timeout(self.timeout, self.service.plan_trip(&coordinates))
            .await
            .map_err(|_| {
                FleetError::route_failed(format!(
                    "trip service timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|err| match err {
                FleetError::RouteComputationFailed(_) => err,
                other => FleetError::route_failed(other.to_string()),
            })?;

        let identities: Vec<DeviceIdentity> = stops.iter().map(|s| s.identity.clone()).collect();
        let result = build_result(&identities, response)?;

        debug!(
            stops = result.summary.stop_count,
            distance_m = result.summary.distance,
            duration_s = ?result.summary.duration_seconds,
            "Trip service returned route"
        );
        Ok(result)
    }
}

fn build_result(identities: &[DeviceIdentity], response: TripResponse) -> FleetResult<RouteResult> {
    if response.code != "Ok" {
        return Err(FleetError::route_failed(format!(
            "trip service returned code {}{}",
            response.code,
            response
                .message
                .as_deref()
                .map(|m| format!(": {}", m))
                .unwrap_or_default()
        )));
    }

    let trip = match response.trips.as_slice() {
        [] => return Err(FleetError::route_failed("trip service returned no trips")),
        [trip] => trip,
        trips => {
            return Err(FleetError::route_failed(format!(
                "trip service split the route into {} trips",
                trips.len()
            )));
        }
    };

    let order = remap_waypoints(identities, &response.waypoints)?;
    if order.first() != identities.first() {
        return Err(FleetError::route_failed(
            "trip does not start at the selected device",
        ));
    }

    let geometry = trip
        .geometry
        .as_ref()
        .map(|g| {
            g.coordinates
                .iter()
                .filter_map(|[lng, lat]| GeoPoint::new(*lat, *lng).ok())
                .collect()
        })
        .unwrap_or_default();

    Ok(RouteResult {
        summary: RouteSummary {
            stop_count: order.len(),
            distance: trip.distance,
            distance_unit: DistanceUnit::Meters,
            duration_seconds: Some(trip.duration),
            geometry,
        },
        order,
        strategy: StrategyKind::Delegated,
    })
}

/// 将 `waypoint_index` 映射回设备身份
///
/// `waypoints[i]` 对应提交的第 i 个坐标，`visit[waypoint_index] = identities[i]`。
/// 索引必须构成 `0..n` 的排列，否则视为计算失败。
pub fn remap_waypoints(
    identities: &[DeviceIdentity],
    waypoints: &[TripWaypoint],
) -> FleetResult<Vec<DeviceIdentity>> {
    if waypoints.len() != identities.len() {
        return Err(FleetError::route_failed(format!(
            "trip service returned {} waypoints for {} coordinates",
            waypoints.len(),
            identities.len()
        )));
    }

    let mut visit: Vec<Option<DeviceIdentity>> = vec![None; identities.len()];
    for (input_index, waypoint) in waypoints.iter().enumerate() {
        let slot = visit.get_mut(waypoint.waypoint_index).ok_or_else(|| {
            FleetError::route_failed(format!(
                "waypoint_index {} out of range",
                waypoint.waypoint_index
            ))
        })?;
        if slot.is_some() {
            return Err(FleetError::route_failed(format!(
                "duplicate waypoint_index {}",
                waypoint.waypoint_index
            )));
        }
        *slot = Some(identities[input_index].clone());
    }

    visit
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| FleetError::route_failed("incomplete waypoint ordering"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::{Trip, TripGeometry};

    fn id(name: &str) -> DeviceIdentity {
        DeviceIdentity::new(name, 1).unwrap()
    }

    fn waypoints(indices: &[usize]) -> Vec<TripWaypoint> {
        indices
            .iter()
            .map(|&waypoint_index| TripWaypoint {
                waypoint_index,
                trips_index: 0,
                location: None,
            })
            .collect()
    }

    #[test]
    fn test_remap_inverts_waypoint_index() {
        let ids = vec![id("A"), id("B"), id("C")];
        let order = remap_waypoints(&ids, &waypoints(&[2, 0, 1])).unwrap();
        assert_eq!(order, vec![id("B"), id("C"), id("A")]);
    }

    #[test]
    fn test_remap_rejects_invalid_indices() {
        let ids = vec![id("A"), id("B"), id("C")];
        assert!(remap_waypoints(&ids, &waypoints(&[0, 0, 1])).is_err());
        assert!(remap_waypoints(&ids, &waypoints(&[0, 1, 3])).is_err());
        assert!(remap_waypoints(&ids, &waypoints(&[0, 1])).is_err());
    }

    #[test]
    fn test_non_ok_code_fails() {
        let ids = vec![id("A"), id("B")];
        let response = TripResponse {
            code: "NoTrips".to_string(),
            message: Some("No trip visiting all destinations possible.".to_string()),
            ..Default::default()
        };
        let err = build_result(&ids, response).unwrap_err();
        assert!(matches!(err, FleetError::RouteComputationFailed(ref m) if m.contains("NoTrips")));
    }

    #[test]
    fn test_empty_trips_fail() {
        let ids = vec![id("A"), id("B")];
        let response = TripResponse {
            code: "Ok".to_string(),
            waypoints: waypoints(&[0, 1]),
            ..Default::default()
        };
        assert!(matches!(
            build_result(&ids, response),
            Err(FleetError::RouteComputationFailed(_))
        ));
    }

    #[test]
    fn test_build_result_carries_summary() {
        let ids = vec![id("A"), id("B"), id("C")];
        let response = TripResponse {
            code: "Ok".to_string(),
            message: None,
            trips: vec![Trip {
                distance: 1234.5,
                duration: 321.0,
                geometry: Some(TripGeometry {
                    coordinates: vec![[126.93, 35.14], [126.94, 35.15]],
                }),
            }],
            waypoints: waypoints(&[0, 2, 1]),
        };
        let result = build_result(&ids, response).unwrap();
        assert_eq!(result.order, vec![id("A"), id("C"), id("B")]);
        assert_eq!(result.summary.distance, 1234.5);
        assert_eq!(result.summary.duration_seconds, Some(321.0));
        assert_eq!(result.summary.geometry.len(), 2);
        assert_eq!(result.summary.geometry[0].latitude, 35.14);
    }
}
