//! 精确策略：穷举排列
//!
//! 固定起点，按字典序深度优先枚举其余站点的全部排列，取总距离最小者；
//! 距离相同的排列保留先枚举到的一个。部分路径代价已不小于当前最优时剪枝，
//! 剪枝不会改变结果。最坏复杂度为 O((N-1)!)，因此站点数受 `max_stops` 限制，
//! 且不超过 `HARD_LIMIT`（10! 约 3.6e6 条路径）。

use crate::domain::model::{RouteResult, RouteStop, RouteSummary, StrategyKind};
use crate::domain::service::CancellationFlag;
use crate::domain::value_object::DistanceMetric;
use crate::error::{FleetError, FleetResult};

/// 取消检查间隔（展开节点数）
const CANCEL_CHECK_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, Copy)]
pub struct ExactRouteSolver {
    metric: DistanceMetric,
    max_stops: usize,
}

impl ExactRouteSolver {
    pub const DEFAULT_MAX_STOPS: usize = 9;
    pub const HARD_LIMIT: usize = 11;

    pub fn new(metric: DistanceMetric, max_stops: usize) -> Self {
        Self {
            metric,
            max_stops: max_stops.clamp(2, Self::HARD_LIMIT),
        }
    }

    pub fn max_stops(&self) -> usize {
        self.max_stops
    }

    pub fn accepts(&self, stop_count: usize) -> bool {
        stop_count <= self.max_stops
    }

    /// 求解最短访问顺序，`stops[0]` 为起点
    pub fn solve(&self, stops: &[RouteStop], cancel: &CancellationFlag) -> FleetResult<RouteResult> {
        let n = stops.len();
        if n < 2 {
            return Err(FleetError::InsufficientTargets { distinct: n });
        }
        if !self.accepts(n) {
            return Err(FleetError::route_failed(format!(
                "exact search supports at most {} stops, got {}",
                self.max_stops, n
            )));
        }

        let matrix = self.distance_matrix(stops);
        let mut search = Search {
            matrix: &matrix,
            path: Vec::with_capacity(n),
            used: vec![false; n],
            best_cost: f64::INFINITY,
            best_path: Vec::new(),
            expanded: 0,
            cancel,
        };
        search.path.push(0);
        search.used[0] = true;
        search.descend(0, 0.0)?;

        if search.best_path.len() != n {
            return Err(FleetError::route_failed("exact search produced no complete path"));
        }

        let best_cost = search.best_cost;
        let order = search
            .best_path
            .iter()
            .map(|&i| stops[i].identity.clone())
            .collect::<Vec<_>>();
        let geometry = search.best_path.iter().map(|&i| stops[i].location).collect();

        Ok(RouteResult {
            summary: RouteSummary {
                stop_count: order.len(),
                distance: best_cost,
                distance_unit: self.metric.unit(),
                duration_seconds: None,
                geometry,
            },
            order,
            strategy: StrategyKind::Exact,
        })
    }

    fn distance_matrix(&self, stops: &[RouteStop]) -> Vec<Vec<f64>> {
        stops
            .iter()
            .map(|from| {
                stops
                    .iter()
                    .map(|to| self.metric.distance(&from.location, &to.location))
                    .collect()
            })
            .collect()
    }
}

struct Search<'a> {
    matrix: &'a [Vec<f64>],
    path: Vec<usize>,
    used: Vec<bool>,
    best_cost: f64,
    best_path: Vec<usize>,
    expanded: u64,
    cancel: &'a CancellationFlag,
}

impl Search<'_> {
    fn descend(&mut self, last: usize, cost: f64) -> FleetResult<()> {
        let n = self.used.len();
        if self.path.len() == n {
            if cost < self.best_cost {
                self.best_cost = cost;
                self.best_path.clone_from(&self.path);
            }
            return Ok(());
        }

        if self.expanded % CANCEL_CHECK_INTERVAL == 0 && self.cancel.is_cancelled() {
            return Err(FleetError::route_failed("exact search cancelled"));
        }
        self.expanded += 1;

        for next in 1..n {
            if self.used[next] {
                continue;
            }
            let partial = cost + self.matrix[last][next];
            if partial >= self.best_cost {
                continue;
            }

            self.used[next] = true;
            self.path.push(next);
            self.descend(next, partial)?;
            self.path.pop();
            self.used[next] = false;
        }
        Ok(())
    }
}
