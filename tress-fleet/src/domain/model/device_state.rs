//! 设备状态
//!
//! 存储层中每个设备的常驻记录，按字段合并读数。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::model::DeviceReading;
use crate::domain::value_object::{Category, DeviceIdentity, FillGauge, FillLevel, GeoPoint};

/// 设备最新已知状态
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub identity: DeviceIdentity,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub fills: BTreeMap<Category, FillLevel>,
    pub last_distance_cm: Option<f64>,
    pub readings_merged: u64,
    pub updated_at: DateTime<Utc>,
}

impl DeviceState {
    /// 由首条读数创建
    pub fn from_reading(reading: &DeviceReading, gauge: &FillGauge) -> Self {
        let mut state = Self {
            identity: reading.identity.clone(),
            latitude: None,
            longitude: None,
            fills: BTreeMap::new(),
            last_distance_cm: None,
            readings_merged: 0,
            updated_at: reading.received_at,
        };
        state.merge(reading, gauge);
        state
    }

    /// 字段级合并：只覆盖读数中出现的字段
    pub fn merge(&mut self, reading: &DeviceReading, gauge: &FillGauge) {
        if let Some(latitude) = reading.latitude {
            self.latitude = Some(latitude);
        }
        if let Some(longitude) = reading.longitude {
            self.longitude = Some(longitude);
        }
        if let Some(sample) = reading.distance {
            self.last_distance_cm = Some(sample.distance_cm);
            self.fills
                .insert(sample.category, gauge.fill_from_distance(sample.distance_cm));
        }
        for (category, level) in &reading.category_fills {
            self.fills.insert(*category, *level);
        }

        self.readings_merged += 1;
        if reading.received_at > self.updated_at {
            self.updated_at = reading.received_at;
        }
    }

    /// 经纬度都已知时返回坐标
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => GeoPoint::new(lat, lng).ok(),
            _ => None,
        }
    }

    pub fn fill(&self, category: Category) -> Option<FillLevel> {
        self.fills.get(&category).copied()
    }

    /// 各分类中最高的填充率
    pub fn peak_fill(&self) -> Option<FillLevel> {
        self.fills
            .values()
            .copied()
            .fold(None, |acc: Option<FillLevel>, level| match acc {
                Some(current) if current.percent() >= level.percent() => Some(current),
                _ => Some(level),
            })
    }
}

/// upsert 的结果，供选择策略观察存储的状态迁移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// 新设备；`first_in_store` 表示存储由空变为非空
    Created { first_in_store: bool },
    Merged,
}

impl UpsertOutcome {
    pub fn is_first_in_store(&self) -> bool {
        matches!(
            self,
            UpsertOutcome::Created {
                first_in_store: true
            }
        )
    }
}

/// 存储的时间点快照
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DeviceSnapshot {
    devices: Vec<DeviceState>,
}

impl DeviceSnapshot {
    pub fn new(devices: Vec<DeviceState>) -> Self {
        Self { devices }
    }

    pub fn get(&self, identity: &DeviceIdentity) -> Option<&DeviceState> {
        self.devices.iter().find(|d| &d.identity == identity)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeviceState> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl<'a> IntoIterator for &'a DeviceSnapshot {
    type Item = &'a DeviceState;
    type IntoIter = std::slice::Iter<'a, DeviceState>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}
