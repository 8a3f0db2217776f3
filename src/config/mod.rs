//! Tress Core 配置模块
//!
//! 该模块提供了完整的应用程序配置管理功能，包括：
//! - 配置文件加载和解析
//! - 环境特定配置覆盖
//! - 各种服务配置定义
//! - Redis 通道、外部路线规划服务等基础设施配置

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use toml::Value;
use tracing::warn;

mod manager;
pub use manager::ConfigManager;

/// 全局应用配置实例，使用 OnceLock 确保只初始化一次
static APP_CONFIG: OnceLock<TressAppConfig> = OnceLock::new();

/// 服务基本信息
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInfoConfig {
    /// 服务名称
    #[serde(default = "default_service_name")]
    pub name: String,
    /// 服务版本
    #[serde(default = "default_service_version")]
    pub version: String,
}

impl Default for ServiceInfoConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            version: default_service_version(),
        }
    }
}

fn default_service_name() -> String {
    "tress-core".to_string()
}

fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 未设置时生效）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 是否输出 target
    #[serde(default = "default_true")]
    pub with_target: bool,
    /// 是否输出线程ID
    #[serde(default)]
    pub with_thread_ids: bool,
    /// 是否输出文件名
    #[serde(default)]
    pub with_file: bool,
    /// 是否输出行号
    #[serde(default)]
    pub with_line_number: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Redis 连接配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RedisPoolConfig {
    /// Redis 服务器地址
    pub url: String,
    /// 命名空间前缀
    #[serde(default)]
    pub namespace: Option<String>,
}

/// 外部路线规划（trip）服务配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TripServiceProfile {
    /// 服务基础地址（如 https://router.project-osrm.org）
    pub base_url: String,
    /// 出行方式（driving / cycling / foot）
    #[serde(default)]
    pub profile: Option<String>,
    /// 请求超时时间（毫秒）
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// 车队服务配置（所有字段可选，由服务侧补全默认值）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FleetServiceConfig {
    /// 服务名称
    #[serde(default)]
    pub service_name: Option<String>,
    /// 遥测通道使用的 Redis 配置名
    #[serde(default)]
    pub redis: Option<String>,
    /// 遥测订阅模式（覆盖所有设备的通配主题）
    #[serde(default)]
    pub telemetry_topic: Option<String>,
    /// 重连初始延迟（毫秒）
    #[serde(default)]
    pub reconnect_initial_ms: Option<u64>,
    /// 重连最大延迟（毫秒）
    #[serde(default)]
    pub reconnect_max_ms: Option<u64>,
    /// 重连退避倍数
    #[serde(default)]
    pub reconnect_multiplier: Option<f64>,
    /// 垃圾桶深度（厘米）
    #[serde(default)]
    pub max_depth_cm: Option<f64>,
    /// 近场饱和阈值（厘米）
    #[serde(default)]
    pub near_field_cm: Option<f64>,
    /// 路线策略：auto | exact | delegated
    #[serde(default)]
    pub route_strategy: Option<String>,
    /// 精确搜索允许的最大站点数（含起点）
    #[serde(default)]
    pub exact_max_stops: Option<usize>,
    /// 距离度量：haversine | euclidean
    #[serde(default)]
    pub distance_metric: Option<String>,
    /// 外部路线规划服务配置名
    #[serde(default)]
    pub trip_service: Option<String>,
}

/// 服务配置集合
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServicesConfig {
    /// 车队服务配置
    #[serde(default)]
    pub fleet: Option<FleetServiceConfig>,
}

/// 应用配置根
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TressAppConfig {
    #[serde(default)]
    pub service: ServiceInfoConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub redis: HashMap<String, RedisPoolConfig>,
    #[serde(default)]
    pub trip_services: HashMap<String, TripServiceProfile>,
    #[serde(default)]
    pub services: ServicesConfig,
}

impl TressAppConfig {
    /// 按名称获取 Redis 配置
    pub fn redis_profile(&self, name: &str) -> Option<&RedisPoolConfig> {
        self.redis.get(name)
    }

    /// 按名称获取外部路线规划服务配置
    pub fn trip_service_profile(&self, name: &str) -> Option<&TripServiceProfile> {
        self.trip_services.get(name)
    }

    /// 车队服务配置（未配置时返回默认值）
    pub fn fleet_service(&self) -> FleetServiceConfig {
        self.services.fleet.clone().unwrap_or_default()
    }

    /// 确保配置有默认值
    fn ensure_defaults(&mut self) {
        if self.service.name.is_empty() {
            self.service.name = default_service_name();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
    }
}

/// 加载配置
pub fn load_config(path: Option<&str>) -> &'static TressAppConfig {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![PathBuf::from(p)],
        None => vec![PathBuf::from("config"), PathBuf::from("config.toml")],
    };

    APP_CONFIG.get_or_init(|| {
        let mut cfg = load_with_fallback(&candidates);
        // 加载环境特定配置
        if let Err(e) = ConfigManager::load_environment_config(&mut cfg) {
            warn!("failed to load environment config: {}", e);
        }
        cfg
    })
}

/// 从指定路径加载配置，不写入全局实例
pub fn load_config_from(path: &Path) -> Result<TressAppConfig> {
    let mut cfg = load_config_from_source(path)?;
    cfg.ensure_defaults();
    Ok(cfg)
}

/// 使用备选方案加载配置
fn load_with_fallback(candidates: &[PathBuf]) -> TressAppConfig {
    for path in candidates {
        match load_config_from(path) {
            Ok(cfg) => return cfg,
            Err(err) => {
                warn!("failed to load config from {}: {err}", path.display());
            }
        }
    }

    warn!("no configuration source succeeded, falling back to defaults");
    TressAppConfig::default()
}

/// 从源加载配置
fn load_config_from_source(path: &Path) -> Result<TressAppConfig> {
    if !path.exists() {
        return Err(anyhow!(
            "configuration path {} does not exist",
            path.display()
        ));
    }

    let metadata = path
        .metadata()
        .with_context(|| format!("unable to read metadata for {}", path.display()))?;

    if metadata.is_dir() {
        load_config_from_directory(path)
    } else {
        load_config_from_file(path)
    }
}

/// 从文件加载配置
fn load_config_from_file(path: &Path) -> Result<TressAppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("invalid config format: {}", path.display()))
}

/// 从 TOML 文本解析配置
pub fn parse_config(content: &str) -> Result<TressAppConfig> {
    let cfg: TressAppConfig = toml::from_str(content)?;
    Ok(cfg)
}

/// 从目录加载配置
///
/// 目录结构：`base.toml` 为必需的基础配置，随后按文件名顺序叠加
/// `shared/`、`services/`、`overrides/` 下的 TOML 片段。
fn load_config_from_directory(path: &Path) -> Result<TressAppConfig> {
    let base_file = path.join("base.toml");
    if !base_file.exists() {
        return Err(anyhow!(
            "missing base configuration: {}",
            base_file.display()
        ));
    }

    let mut merged = load_toml_value(&base_file)?;

    if !merged.is_table() {
        return Err(anyhow!(
            "base configuration must be a table: {}",
            base_file.display()
        ));
    }

    merge_directory(&mut merged, &path.join("shared"))?;
    merge_directory(&mut merged, &path.join("services"))?;
    merge_directory(&mut merged, &path.join("overrides"))?;

    let cfg: TressAppConfig = merged
        .try_into()
        .with_context(|| format!("invalid configuration after merging {}", path.display()))?;

    Ok(cfg)
}

/// 合并目录中的配置
fn merge_directory(root: &mut Value, dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("unable to read config directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .map(|ext| ext.eq_ignore_ascii_case("toml"))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();

    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let value = load_toml_value(&entry.path())?;
        merge_value(root, value);
    }

    Ok(())
}

/// 加载 TOML 值
fn load_toml_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config fragment {}", path.display()))?;
    let value: Value = toml::from_str(&content)
        .with_context(|| format!("invalid TOML content in fragment {}", path.display()))?;
    Ok(value)
}

/// 深度合并：表按键递归合并，其余值直接覆盖
pub(crate) fn merge_value(base: &mut Value, overlay: Value) {
    match overlay {
        Value::Table(overlay_table) => {
            if let Value::Table(base_table) = base {
                for (key, overlay_value) in overlay_table.into_iter() {
                    match base_table.get_mut(&key) {
                        Some(base_value) => merge_value(base_value, overlay_value),
                        None => {
                            base_table.insert(key, overlay_value);
                        }
                    }
                }
            } else {
                *base = Value::Table(overlay_table);
            }
        }
        other => {
            *base = other;
        }
    }
}
