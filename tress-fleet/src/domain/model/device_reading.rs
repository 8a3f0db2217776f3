//! 遥测读数
//!
//! 一条经过解码校验的遥测事件。除身份外的字段都是可选的，
//! 缺失的字段在合并时不会覆盖已知值。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::value_object::{Category, DeviceIdentity, FillLevel};

/// 原始测距样本
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceSample {
    pub category: Category,
    pub distance_cm: f64,
}

/// 遥测读数
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReading {
    pub identity: DeviceIdentity,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance: Option<DistanceSample>,
    /// 设备端已计算好的分类填充率
    pub category_fills: BTreeMap<Category, FillLevel>,
    pub received_at: DateTime<Utc>,
}

impl DeviceReading {
    pub fn new(identity: DeviceIdentity) -> Self {
        Self {
            identity,
            latitude: None,
            longitude: None,
            distance: None,
            category_fills: BTreeMap::new(),
            received_at: Utc::now(),
        }
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_distance(mut self, category: Category, distance_cm: f64) -> Self {
        self.distance = Some(DistanceSample {
            category,
            distance_cm,
        });
        self
    }

    pub fn with_fill(mut self, category: Category, percent: f64) -> Self {
        self.category_fills
            .insert(category, FillLevel::from_percent(percent));
        self
    }

    pub fn received_at(mut self, at: DateTime<Utc>) -> Self {
        self.received_at = at;
        self
    }

    /// 是否携带任何可合并的字段
    pub fn has_payload(&self) -> bool {
        self.latitude.is_some()
            || self.longitude.is_some()
            || self.distance.is_some()
            || !self.category_fills.is_empty()
    }
}
