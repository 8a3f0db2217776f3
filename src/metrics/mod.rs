//! # Prometheus 指标收集模块
//!
//! 为各个服务模块提供统一的 Prometheus 指标收集能力。

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// 全局指标注册表
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// 车队服务指标
pub struct FleetMetrics {
    /// 已合并的遥测读数总数
    pub readings_ingested_total: IntCounter,
    /// 被丢弃的遥测读数（按原因）
    pub readings_dropped_total: IntCounterVec,
    /// 遥测通道重连次数
    pub telemetry_reconnects_total: IntCounter,
    /// 当前已知设备数
    pub devices_known: IntGauge,
    /// 路线计算次数（按策略与结果）
    pub route_computations_total: IntCounterVec,
    /// 路线计算耗时（秒）
    pub route_computation_duration_seconds: HistogramVec,
}

impl FleetMetrics {
    pub fn new() -> Self {
        let readings_ingested_total = IntCounter::new(
            "tress_readings_ingested_total",
            "Total number of telemetry readings merged into the device store",
        )
        .expect("Failed to create tress_readings_ingested_total metric");

        let readings_dropped_total = IntCounterVec::new(
            Opts::new(
                "tress_readings_dropped_total",
                "Total number of telemetry payloads dropped before reaching the store",
            ),
            &["reason"],
        )
        .expect("Failed to create tress_readings_dropped_total metric");

        let telemetry_reconnects_total = IntCounter::new(
            "tress_telemetry_reconnects_total",
            "Total number of telemetry channel reconnect attempts",
        )
        .expect("Failed to create tress_telemetry_reconnects_total metric");

        let devices_known = IntGauge::new(
            "tress_devices_known",
            "Number of devices with a resident state record",
        )
        .expect("Failed to create tress_devices_known metric");

        let route_computations_total = IntCounterVec::new(
            Opts::new(
                "tress_route_computations_total",
                "Total number of route computations",
            ),
            &["strategy", "outcome"],
        )
        .expect("Failed to create tress_route_computations_total metric");

        let route_computation_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "tress_route_computation_duration_seconds",
                "Route computation duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
            &["strategy"],
        )
        .expect("Failed to create tress_route_computation_duration_seconds metric");

        // 注册指标，忽略重复注册错误（测试中可能会重复创建）
        let _ = REGISTRY.register(Box::new(readings_ingested_total.clone()));
        let _ = REGISTRY.register(Box::new(readings_dropped_total.clone()));
        let _ = REGISTRY.register(Box::new(telemetry_reconnects_total.clone()));
        let _ = REGISTRY.register(Box::new(devices_known.clone()));
        let _ = REGISTRY.register(Box::new(route_computations_total.clone()));
        let _ = REGISTRY.register(Box::new(route_computation_duration_seconds.clone()));

        Self {
            readings_ingested_total,
            readings_dropped_total,
            telemetry_reconnects_total,
            devices_known,
            route_computations_total,
            route_computation_duration_seconds,
        }
    }
}

impl Default for FleetMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// 以 Prometheus 文本格式导出全局注册表
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
