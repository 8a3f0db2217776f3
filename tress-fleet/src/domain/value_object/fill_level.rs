//! 填充率值对象
//!
//! 填充率由超声波测距换算得到，不直接存储原始距离：
//! `fill% = clamp(0, 100, 100 - distance / maxDepth * 100)`，
//! 距离不超过近场阈值时视为已满。

use serde::{Deserialize, Serialize};

/// 填充率（0..=100）
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FillLevel(f64);

impl FillLevel {
    pub const EMPTY: FillLevel = FillLevel(0.0);
    pub const FULL: FillLevel = FillLevel(100.0);

    /// 从百分比创建，超出范围的值被截断
    pub fn from_percent(percent: f64) -> Self {
        if percent.is_nan() {
            return Self::EMPTY;
        }
        Self(percent.clamp(0.0, 100.0))
    }

    pub fn percent(&self) -> f64 {
        self.0
    }

    pub fn severity(&self) -> FillSeverity {
        FillSeverity::from_percent(self.0)
    }
}

/// 填充告警等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillSeverity {
    Normal,
    Warning,
    Critical,
}

impl FillSeverity {
    pub fn from_percent(percent: f64) -> Self {
        if percent > 80.0 {
            FillSeverity::Critical
        } else if percent > 50.0 {
            FillSeverity::Warning
        } else {
            FillSeverity::Normal
        }
    }
}

/// 测距换算参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillGauge {
    max_depth_cm: f64,
    near_field_cm: f64,
}

impl FillGauge {
    pub const DEFAULT_MAX_DEPTH_CM: f64 = 100.0;
    pub const DEFAULT_NEAR_FIELD_CM: f64 = 2.0;

    pub fn new(max_depth_cm: f64, near_field_cm: f64) -> Result<Self, String> {
        if !max_depth_cm.is_finite() || max_depth_cm <= 0.0 {
            return Err(format!("max depth must be positive, got {}", max_depth_cm));
        }
        if !near_field_cm.is_finite() || near_field_cm < 0.0 {
            return Err(format!(
                "near-field threshold must be non-negative, got {}",
                near_field_cm
            ));
        }
        Ok(Self {
            max_depth_cm,
            near_field_cm,
        })
    }

    pub fn max_depth_cm(&self) -> f64 {
        self.max_depth_cm
    }

    pub fn near_field_cm(&self) -> f64 {
        self.near_field_cm
    }

    /// 将测距距离换算为填充率
    pub fn fill_from_distance(&self, distance_cm: f64) -> FillLevel {
        if distance_cm <= self.near_field_cm {
            return FillLevel::FULL;
        }
        FillLevel::from_percent(100.0 - distance_cm / self.max_depth_cm * 100.0)
    }
}

impl Default for FillGauge {
    fn default() -> Self {
        Self {
            max_depth_cm: Self::DEFAULT_MAX_DEPTH_CM,
            near_field_cm: Self::DEFAULT_NEAR_FIELD_CM,
        }
    }
}
