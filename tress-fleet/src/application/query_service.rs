//! 面向渲染方的只读视图
//!
//! 只暴露设备快照、当前聚焦设备和当前路线（或失败原因）。路线中的身份
//! 如果在快照里找不到，视为“未找到”而不是错误。填充率超过告警阈值的设备
//! 另外汇总为告警列表，按峰值从高到低排列。

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::application::FleetSession;
use crate::domain::DeviceStateRepository;
use crate::domain::model::{ConnectionStatus, DeviceSnapshot, DeviceState, RouteResult};
use crate::domain::value_object::{DeviceIdentity, FillLevel, FillSeverity};

/// 最高填充率达到告警等级的设备
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillAlert {
    pub identity: DeviceIdentity,
    pub peak: FillLevel,
    pub severity: FillSeverity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStopView {
    pub position: usize,
    pub identity: DeviceIdentity,
    /// 快照中不存在时为 None
    pub device: Option<DeviceState>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteView {
    pub phase: &'static str,
    pub active: Option<RouteResult>,
    pub stops: Vec<RouteStopView>,
    pub failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetView {
    pub devices: DeviceSnapshot,
    pub focused: Option<DeviceIdentity>,
    pub route: RouteView,
    pub alerts: Vec<FillAlert>,
    pub connection: ConnectionStatus,
}

pub struct FleetQueryService {
    store: Arc<dyn DeviceStateRepository>,
    session: Arc<FleetSession>,
    connection: watch::Receiver<ConnectionStatus>,
}

impl FleetQueryService {
    pub fn new(
        store: Arc<dyn DeviceStateRepository>,
        session: Arc<FleetSession>,
        connection: watch::Receiver<ConnectionStatus>,
    ) -> Self {
        Self {
            store,
            session,
            connection,
        }
    }

    pub fn devices(&self) -> DeviceSnapshot {
        self.store.snapshot()
    }

    pub fn focused(&self) -> Option<DeviceIdentity> {
        self.session.focused()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        *self.connection.borrow()
    }

    pub fn alerts(&self) -> Vec<FillAlert> {
        fill_alerts(&self.store.snapshot())
    }

    pub fn route_view(&self) -> RouteView {
        self.route_view_with(&self.store.snapshot())
    }

    pub fn fleet_view(&self) -> FleetView {
        let devices = self.store.snapshot();
        FleetView {
            route: self.route_view_with(&devices),
            alerts: fill_alerts(&devices),
            focused: self.session.focused(),
            connection: self.connection_status(),
            devices,
        }
    }

    fn route_view_with(&self, snapshot: &DeviceSnapshot) -> RouteView {
        let active = self.session.active_route();
        let state = self.session.computation_state();

        let stops = active
            .as_ref()
            .map(|route| {
                route
                    .order
                    .iter()
                    .enumerate()
                    .map(|(position, identity)| RouteStopView {
                        position,
                        identity: identity.clone(),
                        device: snapshot.get(identity).cloned(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        RouteView {
            phase: state.as_str(),
            failure: state.failure().map(str::to_string),
            active,
            stops,
        }
    }
}

fn fill_alerts(snapshot: &DeviceSnapshot) -> Vec<FillAlert> {
    let mut alerts: Vec<FillAlert> = snapshot
        .iter()
        .filter_map(|state| {
            let peak = state.peak_fill()?;
            match peak.severity() {
                FillSeverity::Normal => None,
                severity => Some(FillAlert {
                    identity: state.identity.clone(),
                    peak,
                    severity,
                }),
            }
        })
        .collect();
    alerts.sort_by(|a, b| b.peak.percent().total_cmp(&a.peak.percent()));
    alerts
}
