//! Wire 风格的依赖注入模块
//!
//! 按依赖顺序构建车队服务的全部组件

use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use tress_core::{FleetMetrics, TressAppConfig};

use crate::application::{FleetQueryService, FleetSession, IngestionService, RoutePlanningService};
use crate::config::FleetConfig;
use crate::domain::service::{DelegatedRoutePlanner, ExactRouteSolver, RouteOptimizer};
use crate::domain::{DeviceStateRepository, TelemetryChannel, TripService};
use crate::infrastructure::{
    InMemoryDeviceStateStore, OsrmTripClient, RedisTelemetryChannel, TelemetryDecoder,
};
use crate::interface::runtime::TelemetryAdapter;

/// 应用上下文 - 包含所有已初始化的服务
pub struct FleetContext {
    pub config: Arc<FleetConfig>,
    pub store: Arc<dyn DeviceStateRepository>,
    pub session: Arc<FleetSession>,
    pub ingestion: Arc<IngestionService>,
    pub planner: Arc<RoutePlanningService>,
    pub queries: Arc<FleetQueryService>,
    pub adapter: Arc<TelemetryAdapter>,
    pub metrics: Arc<FleetMetrics>,
}

/// 构建应用上下文
///
/// # 参数
/// * `app_config` - 应用配置
pub fn initialize(app_config: &TressAppConfig) -> Result<FleetContext> {
    // 1. 加载车队服务配置
    let config = FleetConfig::from_app_config(app_config)
        .with_context(|| "Failed to load fleet service configuration")?;

    // 2. 遥测通道
    let channel: Arc<dyn TelemetryChannel> = Arc::new(
        RedisTelemetryChannel::open(&config.redis_url)
            .with_context(|| "Failed to create telemetry channel")?,
    );

    // 3. 外部行程服务（可选）
    let trip_service = match &config.trip_service {
        Some(settings) => {
            let client =
                OsrmTripClient::new(&settings.base_url, settings.profile.clone(), settings.timeout)
                    .with_context(|| "Failed to create trip service client")?;
            Some(Arc::new(client) as Arc<dyn TripService>)
        }
        None => None,
    };

    Ok(build_context(config, channel, trip_service))
}

/// 用给定的通道和行程服务组装上下文
pub fn build_context(
    config: FleetConfig,
    channel: Arc<dyn TelemetryChannel>,
    trip_service: Option<Arc<dyn TripService>>,
) -> FleetContext {
    let config = Arc::new(config);
    let metrics = Arc::new(FleetMetrics::new());

    let store: Arc<dyn DeviceStateRepository> =
        Arc::new(InMemoryDeviceStateStore::new(config.fill_gauge));
    let session = Arc::new(FleetSession::new());

    let trip_timeout = config
        .trip_service
        .as_ref()
        .map(|settings| settings.timeout)
        .unwrap_or(DelegatedRoutePlanner::DEFAULT_TIMEOUT);
    let optimizer = Arc::new(RouteOptimizer::new(
        ExactRouteSolver::new(config.distance_metric, config.exact_max_stops),
        trip_service.map(|service| DelegatedRoutePlanner::new(service, trip_timeout)),
        config.route_strategy,
    ));

    let adapter = Arc::new(TelemetryAdapter::new(
        channel,
        TelemetryDecoder::default(),
        config.telemetry_topic.clone(),
        config.reconnect.clone(),
        metrics.clone(),
    ));

    let ingestion = Arc::new(IngestionService::new(
        store.clone(),
        session.clone(),
        metrics.clone(),
    ));
    let planner = Arc::new(RoutePlanningService::new(
        store.clone(),
        session.clone(),
        optimizer,
        metrics.clone(),
    ));
    let queries = Arc::new(FleetQueryService::new(
        store.clone(),
        session.clone(),
        adapter.status(),
    ));

    FleetContext {
        config,
        store,
        session,
        ingestion,
        planner,
        queries,
        adapter,
        metrics,
    }
}
