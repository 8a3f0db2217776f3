use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use parking_lot::Mutex;

use super::pattern_matches;
use crate::domain::TelemetryChannel;
use crate::domain::repository::{InboundMessage, MessageStream};
use crate::error::{FleetError, FleetResult};

struct Subscriber {
    pattern: String,
    sender: mpsc::UnboundedSender<InboundMessage>,
}

/// 进程内遥测通道，用于本地开发和测试
///
/// `disconnect` 结束所有现有订阅流，`refuse_connections` 让接下来的若干次订阅失败，
/// 用于模拟传输层中断。
#[derive(Default)]
pub struct InMemoryTelemetryChannel {
    subscribers: Mutex<Vec<Subscriber>>,
    refuse_remaining: AtomicUsize,
}

impl InMemoryTelemetryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发布一条消息，返回投递到的订阅数
    pub fn publish(&self, channel: &str, payload: impl Into<Vec<u8>>) -> usize {
        let payload = payload.into();
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| !s.sender.is_closed());

        let mut delivered = 0;
        for subscriber in subscribers.iter() {
            if pattern_matches(&subscriber.pattern, channel) {
                let message = InboundMessage {
                    channel: channel.to_string(),
                    payload: payload.clone(),
                };
                if subscriber.sender.unbounded_send(message).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    pub fn disconnect(&self) {
        self.subscribers.lock().clear();
    }

    pub fn refuse_connections(&self, count: usize) {
        self.refuse_remaining.store(count, Ordering::SeqCst);
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| !s.sender.is_closed());
        subscribers.len()
    }
}

#[async_trait]
impl TelemetryChannel for InMemoryTelemetryChannel {
    async fn subscribe(&self, pattern: &str) -> FleetResult<MessageStream> {
        let refused = self
            .refuse_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(FleetError::ConnectionLost("connection refused".to_string()));
        }

        let (sender, receiver) = mpsc::unbounded();
        self.subscribers.lock().push(Subscriber {
            pattern: pattern.to_string(),
            sender,
        });
        Ok(receiver.boxed())
    }

    fn describe(&self) -> String {
        "memory://telemetry".to_string()
    }
}
