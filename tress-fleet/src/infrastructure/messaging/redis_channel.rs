use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use crate::domain::TelemetryChannel;
use crate::domain::repository::{InboundMessage, MessageStream};
use crate::error::{FleetError, FleetResult};

/// 基于 Redis PSUBSCRIBE 的遥测通道
///
/// 每次订阅建立一条独立的 pub/sub 连接；连接断开时消息流结束，
/// 由上层适配器负责重连。
pub struct RedisTelemetryChannel {
    client: Arc<redis::Client>,
    endpoint: String,
}

impl RedisTelemetryChannel {
    pub fn open(url: &str) -> FleetResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|err| FleetError::Config(format!("invalid redis url: {}", err)))?;
        Ok(Self {
            client: Arc::new(client),
            endpoint: redact_credentials(url),
        })
    }
}

/// 去掉 URL 中的用户名和密码
fn redact_credentials(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}{}", &url[..scheme_end + 3], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

#[async_trait]
impl TelemetryChannel for RedisTelemetryChannel {
    async fn subscribe(&self, pattern: &str) -> FleetResult<MessageStream> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|err| FleetError::ConnectionLost(err.to_string()))?;

        pubsub
            .psubscribe(pattern)
            .await
            .map_err(|err| FleetError::ConnectionLost(err.to_string()))?;

        debug!(pattern = %pattern, "Redis pattern subscription established");

        let stream = pubsub.into_on_message().map(|msg| InboundMessage {
            channel: msg.get_channel_name().to_string(),
            payload: msg.get_payload_bytes().to_vec(),
        });
        Ok(stream.boxed())
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}
