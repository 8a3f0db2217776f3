//! 路线请求与结果

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::domain::value_object::{DeviceIdentity, DistanceUnit, GeoPoint};
use crate::error::{FleetError, FleetResult};

/// 路线请求：起点 + 目标集合
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub start: Option<DeviceIdentity>,
    pub targets: Vec<DeviceIdentity>,
}

impl RouteRequest {
    pub fn new(
        start: Option<DeviceIdentity>,
        targets: impl IntoIterator<Item = DeviceIdentity>,
    ) -> Self {
        Self {
            start,
            targets: targets.into_iter().collect(),
        }
    }

    /// 去重后的访问集合，起点排在首位，其余保持提交顺序
    ///
    /// 起点未设置返回 `NoStartSelected`，不同设备少于 2 个返回 `InsufficientTargets`。
    pub fn stop_order(&self) -> FleetResult<Vec<DeviceIdentity>> {
        let start = self.start.clone().ok_or(FleetError::NoStartSelected)?;

        let mut seen = HashSet::new();
        seen.insert(start.clone());
        let mut order = vec![start];
        for target in &self.targets {
            if seen.insert(target.clone()) {
                order.push(target.clone());
            }
        }

        if order.len() < 2 {
            return Err(FleetError::InsufficientTargets {
                distinct: order.len(),
            });
        }
        Ok(order)
    }
}

/// 已解析坐标的访问点
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStop {
    pub identity: DeviceIdentity,
    pub location: GeoPoint,
}

/// 路线策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Exact,
    Delegated,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Exact => "exact",
            StrategyKind::Delegated => "delegated",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 路线汇总信息
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub stop_count: usize,
    pub distance: f64,
    pub distance_unit: DistanceUnit,
    /// 仅外部路线服务提供
    pub duration_seconds: Option<f64>,
    pub geometry: Vec<GeoPoint>,
}

/// 路线结果：访问顺序是请求集合的一个排列，且以起点开头
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    pub order: Vec<DeviceIdentity>,
    pub strategy: StrategyKind,
    pub summary: RouteSummary,
}

impl RouteResult {
    /// 校验结果是否为 `stops` 的排列且起点一致
    pub fn is_valid_for(&self, stops: &[DeviceIdentity]) -> bool {
        if self.order.len() != stops.len() || self.order.first() != stops.first() {
            return false;
        }
        let expected: HashSet<&DeviceIdentity> = stops.iter().collect();
        let mut seen = HashSet::with_capacity(self.order.len());
        self.order
            .iter()
            .all(|identity| expected.contains(identity) && seen.insert(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str, n: i64) -> DeviceIdentity {
        DeviceIdentity::new(name, n).unwrap()
    }

    #[test]
    fn test_missing_start_rejected() {
        let request = RouteRequest::new(None, vec![id("a", 1), id("a", 2)]);
        assert!(matches!(
            request.stop_order(),
            Err(FleetError::NoStartSelected)
        ));
    }

    #[test]
    fn test_duplicates_collapse_and_start_first() {
        let start = id("a", 0);
        let request = RouteRequest::new(
            Some(start.clone()),
            vec![id("a", 2), start.clone(), id("a", 2), id("b", 0)],
        );
        assert_eq!(
            request.stop_order().unwrap(),
            vec![start, id("a", 2), id("b", 0)]
        );
    }

    #[test]
    fn test_single_distinct_identity_is_insufficient() {
        let start = id("a", 0);
        let request = RouteRequest::new(Some(start.clone()), vec![start.clone(), start]);
        assert!(matches!(
            request.stop_order(),
            Err(FleetError::InsufficientTargets { distinct: 1 })
        ));
    }

    #[test]
    fn test_result_permutation_check() {
        let stops = vec![id("a", 0), id("a", 1), id("a", 2)];
        let summary = RouteSummary {
            stop_count: 3,
            distance: 0.0,
            distance_unit: DistanceUnit::Meters,
            duration_seconds: None,
            geometry: vec![],
        };
        let mut result = RouteResult {
            order: vec![id("a", 0), id("a", 2), id("a", 1)],
            strategy: StrategyKind::Exact,
            summary,
        };
        assert!(result.is_valid_for(&stops));

        result.order = vec![id("a", 0), id("a", 2), id("a", 2)];
        assert!(!result.is_valid_for(&stops));

        result.order = vec![id("a", 1), id("a", 0), id("a", 2)];
        assert!(!result.is_valid_for(&stops));
    }
}
