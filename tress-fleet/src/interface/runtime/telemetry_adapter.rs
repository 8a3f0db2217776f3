//! 遥测通道适配器运行时
//!
//! 维持一个长期的通配符订阅：解码每条消息并交给处理函数，
//! 解码失败只记录并丢弃；连接断开后按退避策略重连同一订阅，
//! 期间不触碰设备状态存储。

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tress_core::FleetMetrics;

use crate::domain::TelemetryChannel;
use crate::domain::model::{ConnectionStatus, DeviceReading};
use crate::domain::repository::InboundMessage;
use crate::infrastructure::{ReconnectPolicy, TelemetryDecoder};

pub struct TelemetryAdapter {
    channel: Arc<dyn TelemetryChannel>,
    decoder: TelemetryDecoder,
    pattern: String,
    policy: ReconnectPolicy,
    status: watch::Sender<ConnectionStatus>,
    metrics: Arc<FleetMetrics>,
}

impl TelemetryAdapter {
    pub fn new(
        channel: Arc<dyn TelemetryChannel>,
        decoder: TelemetryDecoder,
        pattern: impl Into<String>,
        policy: ReconnectPolicy,
        metrics: Arc<FleetMetrics>,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Connecting);
        Self {
            channel,
            decoder,
            pattern: pattern.into(),
            policy,
            status,
            metrics,
        }
    }

    /// 订阅连接状态变化
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// 运行订阅循环直到 `shutdown` 置为 true（或其发送端被丢弃）
    pub async fn subscribe<H>(&self, handler: H, mut shutdown: watch::Receiver<bool>)
    where
        H: Fn(DeviceReading) + Send + Sync,
    {
        info!(
            channel = %self.channel.describe(),
            pattern = %self.pattern,
            "Starting telemetry adapter"
        );

        let mut attempt: u32 = 0;
        loop {
            if *shutdown.borrow() {
                break;
            }

            self.status.send_replace(ConnectionStatus::Connecting);
            match self.channel.subscribe(&self.pattern).await {
                Ok(mut stream) => {
                    attempt = 0;
                    self.status.send_replace(ConnectionStatus::Connected);
                    info!(pattern = %self.pattern, "Telemetry subscription established");

                    loop {
                        tokio::select! {
                            _ = wait_for_shutdown(&mut shutdown) => {
                                self.status.send_replace(ConnectionStatus::Disconnected);
                                info!("Telemetry adapter stopped");
                                return;
                            }
                            message = stream.next() => match message {
                                Some(message) => self.dispatch(&message, &handler),
                                None => break,
                            }
                        }
                    }
                    warn!(pattern = %self.pattern, "Telemetry connection lost");
                }
                Err(err) => {
                    warn!(error = %err, attempt, "Failed to subscribe to telemetry channel");
                }
            }

            self.status.send_replace(ConnectionStatus::Disconnected);
            let delay = self.policy.calculate_delay(attempt);
            attempt = attempt.saturating_add(1);
            self.metrics.telemetry_reconnects_total.inc();
            debug!(delay_ms = delay.as_millis() as u64, attempt, "Reconnecting telemetry channel");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
        }

        self.status.send_replace(ConnectionStatus::Disconnected);
        info!("Telemetry adapter stopped");
    }

    fn dispatch<H>(&self, message: &InboundMessage, handler: &H)
    where
        H: Fn(DeviceReading),
    {
        match self.decoder.decode(&message.payload) {
            Ok(reading) => handler(reading),
            Err(err) => {
                self.metrics
                    .readings_dropped_total
                    .with_label_values(&[err.reason()])
                    .inc();
                warn!(channel = %message.channel, error = %err, "Dropping malformed telemetry payload");
            }
        }
    }
}

/// 等待关闭信号；发送端被丢弃同样视为关闭
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
