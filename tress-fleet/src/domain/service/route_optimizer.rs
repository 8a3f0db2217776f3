//! 路线优化器
//!
//! 统一两种策略：站点数不超过精确搜索上限时在阻塞线程池上穷举，
//! 否则委托外部行程服务。

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::domain::model::{DeviceSnapshot, RouteRequest, RouteResult, RouteStop, StrategyKind};
use crate::domain::service::{CancellationFlag, DelegatedRoutePlanner, ExactRouteSolver};
use crate::domain::value_object::DeviceIdentity;
use crate::error::{FleetError, FleetResult};

/// 策略选择方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteStrategyPolicy {
    /// 按站点数自动切换
    #[default]
    Auto,
    Exact,
    Delegated,
}

impl RouteStrategyPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStrategyPolicy::Auto => "auto",
            RouteStrategyPolicy::Exact => "exact",
            RouteStrategyPolicy::Delegated => "delegated",
        }
    }
}

impl FromStr for RouteStrategyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(RouteStrategyPolicy::Auto),
            "exact" | "brute_force" | "brute-force" => Ok(RouteStrategyPolicy::Exact),
            "delegated" | "trip" | "osrm" => Ok(RouteStrategyPolicy::Delegated),
            other => Err(format!("unknown route strategy: {}", other)),
        }
    }
}

impl fmt::Display for RouteStrategyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct RouteOptimizer {
    exact: ExactRouteSolver,
    delegated: Option<DelegatedRoutePlanner>,
    policy: RouteStrategyPolicy,
}

impl RouteOptimizer {
    pub fn new(
        exact: ExactRouteSolver,
        delegated: Option<DelegatedRoutePlanner>,
        policy: RouteStrategyPolicy,
    ) -> Self {
        Self {
            exact,
            delegated,
            policy,
        }
    }

    /// 根据站点数与策略配置选择实际策略
    pub fn select_strategy(&self, stop_count: usize) -> FleetResult<StrategyKind> {
        match self.policy {
            RouteStrategyPolicy::Exact => {
                if self.exact.accepts(stop_count) {
                    Ok(StrategyKind::Exact)
                } else {
                    Err(FleetError::route_failed(format!(
                        "exact strategy is limited to {} stops, got {}",
                        self.exact.max_stops(),
                        stop_count
                    )))
                }
            }
            RouteStrategyPolicy::Delegated => {
                if self.delegated.is_some() {
                    Ok(StrategyKind::Delegated)
                } else {
                    Err(FleetError::route_failed("no trip service configured"))
                }
            }
            RouteStrategyPolicy::Auto => {
                if self.exact.accepts(stop_count) {
                    Ok(StrategyKind::Exact)
                } else if self.delegated.is_some() {
                    Ok(StrategyKind::Delegated)
                } else {
                    Err(FleetError::route_failed(format!(
                        "{} stops exceed the exact limit of {} and no trip service is configured",
                        stop_count,
                        self.exact.max_stops()
                    )))
                }
            }
        }
    }

    /// 计算访问顺序
    ///
    /// 请求校验失败时在任何计算开始前返回。结果一定是请求集合的排列并以起点开头。
    pub async fn optimize(
        &self,
        request: &RouteRequest,
        snapshot: &DeviceSnapshot,
        cancel: &CancellationFlag,
    ) -> FleetResult<RouteResult> {
        let order = request.stop_order()?;
        let stops = resolve_stops(&order, snapshot)?;
        let strategy = self.select_strategy(stops.len())?;

        debug!(
            stops = stops.len(),
            strategy = %strategy,
            start = %order[0],
            "Optimizing route"
        );

        let result = match strategy {
            StrategyKind::Exact => {
                let solver = self.exact;
                let cancel = cancel.clone();
                tokio::task::spawn_blocking(move || solver.solve(&stops, &cancel))
                    .await
                    .map_err(|e| FleetError::route_failed(format!("exact search task failed: {}", e)))??
            }
            StrategyKind::Delegated => {
                let planner = self
                    .delegated
                    .as_ref()
                    .ok_or_else(|| FleetError::route_failed("no trip service configured"))?;
                planner.plan(&stops).await?
            }
        };

        if !result.is_valid_for(&order) {
            return Err(FleetError::route_failed(
                "route is not a permutation of the requested devices",
            ));
        }
        Ok(result)
    }
}

/// 从快照中解析每个身份的坐标
pub fn resolve_stops(
    order: &[DeviceIdentity],
    snapshot: &DeviceSnapshot,
) -> FleetResult<Vec<RouteStop>> {
    order
        .iter()
        .map(|identity| {
            let state = snapshot.get(identity).ok_or_else(|| {
                FleetError::route_failed(format!("device {} not found", identity))
            })?;
            let location = state.location().ok_or_else(|| {
                FleetError::route_failed(format!("device {} has no known location", identity))
            })?;
            Ok(RouteStop {
                identity: identity.clone(),
                location,
            })
        })
        .collect()
}
