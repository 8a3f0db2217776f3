use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use tress_core::FleetMetrics;

use crate::application::FleetSession;
use crate::domain::DeviceStateRepository;
use crate::domain::model::{RouteRequest, RouteResult};
use crate::domain::service::RouteOptimizer;
use crate::domain::value_object::DeviceIdentity;
use crate::error::{FleetError, FleetResult};

/// 路线规划服务
///
/// 每个会话同一时间只有一个计算在进行：新请求取消旧计算（取消-重启），
/// 被取代的调用返回 `RouteSuperseded`，只有最新代次会写入 `activeRoute`。
pub struct RoutePlanningService {
    store: Arc<dyn DeviceStateRepository>,
    session: Arc<FleetSession>,
    optimizer: Arc<RouteOptimizer>,
    metrics: Arc<FleetMetrics>,
}

impl RoutePlanningService {
    pub fn new(
        store: Arc<dyn DeviceStateRepository>,
        session: Arc<FleetSession>,
        optimizer: Arc<RouteOptimizer>,
        metrics: Arc<FleetMetrics>,
    ) -> Self {
        Self {
            store,
            session,
            optimizer,
            metrics,
        }
    }

    /// 以当前聚焦设备为起点规划路线
    pub async fn plan_route(&self, targets: Vec<DeviceIdentity>) -> FleetResult<RouteResult> {
        let request = RouteRequest::new(self.session.focused(), targets);
        self.plan(request).await
    }

    pub async fn plan(&self, request: RouteRequest) -> FleetResult<RouteResult> {
        let stops = match request.stop_order() {
            Ok(stops) => stops,
            Err(err) => {
                self.record_outcome("none", &err);
                return Err(err);
            }
        };
        let strategy = self
            .optimizer
            .select_strategy(stops.len())
            .map(|s| s.as_str())
            .unwrap_or("none");

        let snapshot = self.store.snapshot();
        let (generation, cancel) = self.session.begin_computation();
        let started = Instant::now();

        // 提交在任务内完成，调用方放弃等待也不会让会话停在 Computing
        let optimizer = self.optimizer.clone();
        let session = self.session.clone();
        let task = tokio::spawn(async move {
            let outcome = optimizer.optimize(&request, &snapshot, &cancel).await;
            commit(&session, generation, outcome)
        });
        self.session.attach_task(generation, task.abort_handle());

        let finished = match task.await {
            Ok(finished) => finished,
            Err(err) if err.is_cancelled() => Err(FleetError::RouteSuperseded),
            Err(err) => {
                let err = FleetError::route_failed(format!("route task failed: {}", err));
                commit(&self.session, generation, Err(err))
            }
        };
        self.metrics
            .route_computation_duration_seconds
            .with_label_values(&[strategy])
            .observe(started.elapsed().as_secs_f64());

        match &finished {
            Ok(result) => {
                self.metrics
                    .route_computations_total
                    .with_label_values(&[result.strategy.as_str(), "ok"])
                    .inc();
                info!(
                    generation,
                    strategy = %result.strategy,
                    stops = result.summary.stop_count,
                    distance = result.summary.distance,
                    "Route computed"
                );
            }
            Err(err) => {
                self.record_outcome(strategy, err);
                if matches!(err, FleetError::RouteSuperseded) {
                    info!(generation, "Route computation superseded");
                } else {
                    warn!(generation, error = %err, "Route computation failed");
                }
            }
        }
        finished
    }

    fn record_outcome(&self, strategy: &str, err: &FleetError) {
        self.metrics
            .route_computations_total
            .with_label_values(&[strategy, err.kind()])
            .inc();
    }
}

/// 按代次写回会话；已被取代的代次返回 `RouteSuperseded`
fn commit(
    session: &FleetSession,
    generation: u64,
    outcome: FleetResult<RouteResult>,
) -> FleetResult<RouteResult> {
    match outcome {
        Ok(result) => session
            .finish_success(generation, result.clone())
            .map(|_| result),
        Err(FleetError::RouteSuperseded) => Err(FleetError::RouteSuperseded),
        Err(err) => {
            session.finish_failure(generation, &err.to_string())?;
            Err(err)
        }
    }
}
