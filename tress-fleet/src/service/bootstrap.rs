//! 应用启动器 - 负责启动遥测订阅并处理优雅关闭

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};
use tress_core::TressAppConfig;

use crate::service::wire::{self, FleetContext};

const STATUS_REPORT_INTERVAL: Duration = Duration::from_secs(60);

pub struct FleetBootstrap;

impl FleetBootstrap {
    /// 运行应用的主入口点
    pub async fn run(config: &'static TressAppConfig) -> Result<()> {
        let context = wire::initialize(config)?;
        info!(
            service = %context.config.service_name,
            topic = %context.config.telemetry_topic,
            strategy = %context.config.route_strategy,
            exact_max_stops = context.config.exact_max_stops,
            trip_service = context.config.trip_service.is_some(),
            max_depth_cm = context.config.fill_gauge.max_depth_cm(),
            near_field_cm = context.config.fill_gauge.near_field_cm(),
            "Starting fleet service"
        );
        Self::serve(context).await
    }

    /// 运行直到收到 Ctrl-C
    pub async fn serve(context: FleetContext) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ingestion = Self::spawn_ingestion(&context, shutdown_rx);

        let mut ticker = interval(STATUS_REPORT_INTERVAL);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                result = &mut ctrl_c => {
                    result.context("Failed to listen for shutdown signal")?;
                    break;
                }
                _ = ticker.tick() => {
                    let view = context.queries.fleet_view();
                    info!(
                        devices = view.devices.len(),
                        alerts = view.alerts.len(),
                        connection = view.connection.as_str(),
                        focused = ?view.focused.as_ref().map(ToString::to_string),
                        route = view.route.phase,
                        "Fleet status"
                    );
                }
            }
        }

        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
        ingestion
            .await
            .context("Telemetry adapter task terminated abnormally")?;
        debug!(metrics = %tress_core::metrics::gather_text(), "Final metrics");
        info!("Fleet service stopped");
        Ok(())
    }

    /// 启动遥测订阅任务，读数交给写入服务
    pub fn spawn_ingestion(context: &FleetContext, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let adapter = context.adapter.clone();
        let ingestion = context.ingestion.clone();
        tokio::spawn(async move {
            adapter
                .subscribe(
                    move |reading| {
                        ingestion.ingest(reading);
                    },
                    shutdown,
                )
                .await;
        })
    }
}
