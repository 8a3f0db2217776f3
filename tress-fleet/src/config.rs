use std::env;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tress_core::TressAppConfig;
use tress_core::config::ConfigManager;

use crate::domain::service::{ExactRouteSolver, RouteStrategyPolicy};
use crate::domain::value_object::{DistanceMetric, FillGauge};
use crate::infrastructure::ReconnectPolicy;

/// 外部行程服务设置
#[derive(Debug, Clone, PartialEq)]
pub struct TripServiceSettings {
    pub base_url: String,
    pub profile: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct FleetConfig {
    pub service_name: String,
    pub redis_url: String,
    pub telemetry_topic: String,
    pub reconnect: ReconnectPolicy,
    pub fill_gauge: FillGauge,
    pub route_strategy: RouteStrategyPolicy,
    pub exact_max_stops: usize,
    pub distance_metric: DistanceMetric,
    pub trip_service: Option<TripServiceSettings>,
}

impl FleetConfig {
    pub const DEFAULT_TOPIC: &'static str = "trash/gps/*";
    pub const DEFAULT_TRIP_TIMEOUT_MS: u64 = 10_000;

    /// 从应用配置加载，环境变量优先
    pub fn from_app_config(app: &TressAppConfig) -> Result<Self> {
        let service_config = app.fleet_service();

        let service_name = service_config
            .service_name
            .clone()
            .unwrap_or_else(|| "tress-fleet".to_string());

        // 解析 Redis 配置引用
        let redis_url = env::var("TRESS_FLEET_REDIS_URL")
            .ok()
            .or_else(|| {
                service_config
                    .redis
                    .as_deref()
                    .and_then(|name| app.redis_profile(name))
                    .map(|profile| profile.url.clone())
            })
            .unwrap_or_else(|| "redis://127.0.0.1:6379/0".to_string());

        let telemetry_topic = env::var("TRESS_FLEET_TOPIC")
            .ok()
            .or_else(|| service_config.telemetry_topic.clone())
            .unwrap_or_else(|| Self::DEFAULT_TOPIC.to_string());

        let defaults = ReconnectPolicy::default();
        let reconnect = ReconnectPolicy::from_config(
            service_config
                .reconnect_initial_ms
                .unwrap_or(defaults.initial_delay_ms),
            service_config
                .reconnect_max_ms
                .unwrap_or(defaults.max_delay_ms),
            service_config
                .reconnect_multiplier
                .unwrap_or(defaults.backoff_multiplier),
        );

        let fill_gauge = FillGauge::new(
            service_config
                .max_depth_cm
                .unwrap_or(FillGauge::DEFAULT_MAX_DEPTH_CM),
            service_config
                .near_field_cm
                .unwrap_or(FillGauge::DEFAULT_NEAR_FIELD_CM),
        )
        .map_err(|e| anyhow!("invalid fill gauge configuration: {}", e))?;

        let route_strategy = env::var("TRESS_FLEET_ROUTE_STRATEGY")
            .ok()
            .or_else(|| service_config.route_strategy.clone())
            .map(|s| s.parse::<RouteStrategyPolicy>())
            .transpose()
            .map_err(|e| anyhow!(e))?
            .unwrap_or_default();

        let exact_max_stops = service_config
            .exact_max_stops
            .unwrap_or(ExactRouteSolver::DEFAULT_MAX_STOPS)
            .clamp(2, ExactRouteSolver::HARD_LIMIT);

        let distance_metric = service_config
            .distance_metric
            .as_deref()
            .map(str::parse::<DistanceMetric>)
            .transpose()
            .map_err(|e| anyhow!(e))?
            .unwrap_or_default();

        let trip_service = Self::resolve_trip_service(app, service_config.trip_service.as_deref());

        Ok(Self {
            service_name,
            redis_url,
            telemetry_topic,
            reconnect,
            fill_gauge,
            route_strategy,
            exact_max_stops,
            distance_metric,
            trip_service,
        })
    }

    fn resolve_trip_service(app: &TressAppConfig, profile_name: Option<&str>) -> Option<TripServiceSettings> {
        let profile = ConfigManager::select_trip_service_profile(app, profile_name);
        let base_url = env::var("TRESS_FLEET_TRIP_URL")
            .ok()
            .or_else(|| profile.as_ref().map(|p| p.base_url.clone()))
            .filter(|url| !url.trim().is_empty())?;

        Some(TripServiceSettings {
            base_url,
            profile: profile.as_ref().and_then(|p| p.profile.clone()),
            timeout: Duration::from_millis(
                profile
                    .as_ref()
                    .and_then(|p| p.timeout_ms)
                    .unwrap_or(Self::DEFAULT_TRIP_TIMEOUT_MS),
            ),
        })
    }
}
