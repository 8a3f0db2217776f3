//! 配置管理器 - 负责处理不同环境下的配置选择和覆盖
//!
//! 该模块提供了配置管理功能，包括：
//! - 根据环境变量选择外部路线规划服务配置
//! - 加载环境特定配置
//! - 合并配置值

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use toml::Value;

use super::{FleetServiceConfig, TressAppConfig, TripServiceProfile};

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 根据环境变量或配置选择外部路线规划服务配置
    ///
    /// 优先级：
    /// 1. 环境变量 TRESS_TRIP_SERVICE_PROFILE 指定的配置
    /// 2. 配置文件中指定的配置
    pub fn select_trip_service_profile(
        config: &TressAppConfig,
        profile_name: Option<&str>,
    ) -> Option<TripServiceProfile> {
        if let Ok(env_profile) = env::var("TRESS_TRIP_SERVICE_PROFILE") {
            if let Some(profile) = config.trip_service_profile(&env_profile) {
                return Some(profile.clone());
            }
        }

        profile_name
            .and_then(|name| config.trip_service_profile(name))
            .cloned()
    }

    /// 获取当前环境名称
    ///
    /// 从环境变量 TRESS_ENV 获取，未设置时默认为 "development"
    pub fn get_environment() -> String {
        env::var("TRESS_ENV").unwrap_or_else(|_| "development".to_string())
    }

    /// 根据环境加载特定配置
    ///
    /// 加载 config/environments/{environment}.toml 文件中的配置，
    /// 并将其合并到基础配置中
    pub fn load_environment_config(base_config: &mut TressAppConfig) -> Result<()> {
        let env = Self::get_environment();
        let env_config_path = format!("config/environments/{}.toml", env);

        if Path::new(&env_config_path).exists() {
            let env_config_content = fs::read_to_string(&env_config_path)
                .with_context(|| format!("无法读取环境配置文件: {}", env_config_path))?;
            let env_config: Value = toml::from_str(&env_config_content)
                .with_context(|| format!("无效的环境配置格式: {}", env_config_path))?;

            Self::apply_environment_overlay(base_config, &env_config);
        }

        Ok(())
    }

    /// 将环境配置叠加到基础配置上
    pub fn apply_environment_overlay(base_config: &mut TressAppConfig, env_config: &Value) {
        Self::merge_trip_services(&mut base_config.trip_services, env_config);

        if let Some(fleet) = env_config
            .get("services")
            .and_then(|services| services.get("fleet"))
        {
            let merged = base_config.services.fleet.get_or_insert_with(Default::default);
            Self::merge_fleet_values(merged, fleet);
        }
    }

    /// 合并外部路线规划服务配置
    fn merge_trip_services(
        trip_services: &mut HashMap<String, TripServiceProfile>,
        env_config: &Value,
    ) {
        let Some(tables) = env_config.get("trip_services").and_then(|v| v.as_table()) else {
            return;
        };

        for (key, value) in tables {
            // 只有当配置包含 base_url 时才处理
            if let Some(base_url) = value.get("base_url").and_then(|v| v.as_str()) {
                let mut profile = TripServiceProfile {
                    base_url: base_url.to_string(),
                    ..Default::default()
                };
                if let Some(name) = value.get("profile").and_then(|v| v.as_str()) {
                    profile.profile = Some(name.to_string());
                }
                if let Some(timeout_ms) = value.get("timeout_ms").and_then(|v| v.as_integer()) {
                    profile.timeout_ms = u64::try_from(timeout_ms).ok();
                }
                trip_services.insert(key.clone(), profile);
            }
        }
    }

    /// 逐字段合并车队服务配置
    fn merge_fleet_values(fleet: &mut FleetServiceConfig, value: &Value) {
        let as_string = |key: &str| value.get(key).and_then(|v| v.as_str()).map(str::to_string);
        let as_u64 = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_integer())
                .and_then(|v| u64::try_from(v).ok())
        };
        let as_f64 = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
        };

        if let Some(v) = as_string("redis") {
            fleet.redis = Some(v);
        }
        if let Some(v) = as_string("telemetry_topic") {
            fleet.telemetry_topic = Some(v);
        }
        if let Some(v) = as_u64("reconnect_initial_ms") {
            fleet.reconnect_initial_ms = Some(v);
        }
        if let Some(v) = as_u64("reconnect_max_ms") {
            fleet.reconnect_max_ms = Some(v);
        }
        if let Some(v) = as_f64("reconnect_multiplier") {
            fleet.reconnect_multiplier = Some(v);
        }
        if let Some(v) = as_f64("max_depth_cm") {
            fleet.max_depth_cm = Some(v);
        }
        if let Some(v) = as_f64("near_field_cm") {
            fleet.near_field_cm = Some(v);
        }
        if let Some(v) = as_string("route_strategy") {
            fleet.route_strategy = Some(v);
        }
        if let Some(v) = as_u64("exact_max_stops") {
            fleet.exact_max_stops = usize::try_from(v).ok();
        }
        if let Some(v) = as_string("distance_metric") {
            fleet.distance_metric = Some(v);
        }
        if let Some(v) = as_string("trip_service") {
            fleet.trip_service = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_overlay_merges_fleet_and_trip_services() {
        let mut cfg = super::super::parse_config(
            r#"
            [services.fleet]
            telemetry_topic = "trash/gps/*"
            exact_max_stops = 9
            "#,
        )
        .unwrap();

        let overlay: Value = toml::from_str(
            r#"
            [trip_services.staging]
            base_url = "http://osrm.staging:5000"
            timeout_ms = 2500

            [services.fleet]
            exact_max_stops = 6
            near_field_cm = 3
            trip_service = "staging"
            "#,
        )
        .unwrap();

        ConfigManager::apply_environment_overlay(&mut cfg, &overlay);

        let fleet = cfg.fleet_service();
        assert_eq!(fleet.telemetry_topic.as_deref(), Some("trash/gps/*"));
        assert_eq!(fleet.exact_max_stops, Some(6));
        assert_eq!(fleet.near_field_cm, Some(3.0));
        assert_eq!(fleet.trip_service.as_deref(), Some("staging"));

        let profile = ConfigManager::select_trip_service_profile(&cfg, Some("staging")).unwrap();
        assert_eq!(profile.base_url, "http://osrm.staging:5000");
        assert_eq!(profile.timeout_ms, Some(2500));
    }

    #[test]
    fn test_trip_profile_without_base_url_is_ignored() {
        let mut cfg = TressAppConfig::default();
        let overlay: Value = toml::from_str(
            r#"
            [trip_services.broken]
            timeout_ms = 100
            "#,
        )
        .unwrap();

        ConfigManager::apply_environment_overlay(&mut cfg, &overlay);
        assert!(cfg.trip_service_profile("broken").is_none());
        assert!(cfg.services.fleet.is_none());
    }
}
