//! 遥测通道重连策略（指数退避，不限次数）

use std::time::Duration;

/// 重连策略配置
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// 初始延迟（毫秒）
    pub initial_delay_ms: u64,
    /// 最大延迟（毫秒）
    pub max_delay_ms: u64,
    /// 退避倍数
    pub backoff_multiplier: f64,
}

impl ReconnectPolicy {
    pub fn from_config(initial_delay_ms: u64, max_delay_ms: u64, backoff_multiplier: f64) -> Self {
        Self {
            initial_delay_ms,
            max_delay_ms: max_delay_ms.max(initial_delay_ms),
            backoff_multiplier: if backoff_multiplier.is_finite() && backoff_multiplier >= 1.0 {
                backoff_multiplier
            } else {
                1.0
            },
        }
    }

    /// 固定间隔重连
    pub fn fixed(delay_ms: u64) -> Self {
        Self::from_config(delay_ms, delay_ms, 1.0)
    }

    /// 计算第 `attempt` 次重连前的等待时间（从 0 开始）
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(32) as i32;
        let delay_ms = (self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent))
            .min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(delay_ms)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(2_000, 5_000, 1.5)
    }
}
