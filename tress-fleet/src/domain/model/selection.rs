//! 选择与会话上下文
//!
//! 纯状态，不做 I/O：当前聚焦设备与当前生效路线。

use crate::domain::model::{RouteResult, UpsertOutcome};
use crate::domain::value_object::DeviceIdentity;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionContext {
    focused: Option<DeviceIdentity>,
    active_route: Option<RouteResult>,
}

impl SelectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> Option<&DeviceIdentity> {
        self.focused.as_ref()
    }

    pub fn active_route(&self) -> Option<&RouteResult> {
        self.active_route.as_ref()
    }

    /// 设置聚焦设备，任何身份都合法
    pub fn select_device(&mut self, identity: DeviceIdentity) {
        self.focused = Some(identity);
    }

    pub fn clear_route(&mut self) {
        self.active_route = None;
    }

    pub fn route_completed(&mut self, result: RouteResult) {
        self.active_route = Some(result);
    }

    /// 观察存储迁移：仅当存储由空变为非空且尚无聚焦时自动聚焦
    ///
    /// 返回是否发生了自动聚焦。
    pub fn observe_upsert(&mut self, identity: &DeviceIdentity, outcome: UpsertOutcome) -> bool {
        if outcome.is_first_in_store() && self.focused.is_none() {
            self.focused = Some(identity.clone());
            return true;
        }
        false
    }
}
