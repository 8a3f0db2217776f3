//! 会话上下文
//!
//! 把选择上下文与路线计算状态机放在同一把锁下，保证只有最新代次的计算
//! 能写入 `activeRoute`。

use parking_lot::Mutex;
use tokio::task::AbortHandle;

use crate::domain::model::{
    RouteComputation, RouteComputationState, RouteResult, SelectionContext, UpsertOutcome,
};
use crate::domain::service::CancellationFlag;
use crate::domain::value_object::DeviceIdentity;
use crate::error::FleetResult;

struct InFlight {
    generation: u64,
    cancel: CancellationFlag,
    abort: Option<AbortHandle>,
}

impl InFlight {
    fn stop(self) {
        self.cancel.cancel();
        if let Some(abort) = self.abort {
            abort.abort();
        }
    }
}

#[derive(Default)]
struct SessionState {
    selection: SelectionContext,
    computation: RouteComputation,
    in_flight: Option<InFlight>,
}

#[derive(Default)]
pub struct FleetSession {
    state: Mutex<SessionState>,
}

impl FleetSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> Option<DeviceIdentity> {
        self.state.lock().selection.focused().cloned()
    }

    pub fn active_route(&self) -> Option<RouteResult> {
        self.state.lock().selection.active_route().cloned()
    }

    pub fn computation_state(&self) -> RouteComputationState {
        self.state.lock().computation.state().clone()
    }

    pub fn select_device(&self, identity: DeviceIdentity) {
        self.state.lock().selection.select_device(identity);
    }

    pub fn clear_route(&self) {
        self.state.lock().selection.clear_route();
    }

    /// 确认终态（成功或失败）后回到 Idle
    pub fn acknowledge_route(&self) {
        self.state.lock().computation.acknowledge();
    }

    pub fn observe_upsert(&self, identity: &DeviceIdentity, outcome: UpsertOutcome) -> bool {
        self.state.lock().selection.observe_upsert(identity, outcome)
    }

    /// 开始新一轮计算并取消仍在进行的旧计算
    pub(crate) fn begin_computation(&self) -> (u64, CancellationFlag) {
        let mut state = self.state.lock();
        let (generation, _) = state.computation.begin();
        if let Some(previous) = state.in_flight.take() {
            previous.stop();
        }

        let cancel = CancellationFlag::new();
        state.in_flight = Some(InFlight {
            generation,
            cancel: cancel.clone(),
            abort: None,
        });
        (generation, cancel)
    }

    /// 登记计算任务；若该代次已被取代则立即中止
    pub(crate) fn attach_task(&self, generation: u64, abort: AbortHandle) {
        let mut state = self.state.lock();
        match state.in_flight.as_mut() {
            Some(in_flight) if in_flight.generation == generation => {
                in_flight.abort = Some(abort);
            }
            _ => abort.abort(),
        }
    }

    pub(crate) fn finish_success(&self, generation: u64, result: RouteResult) -> FleetResult<()> {
        let mut state = self.state.lock();
        state.computation.complete(generation, result.clone())?;
        state.selection.route_completed(result);
        state.in_flight = None;
        Ok(())
    }

    pub(crate) fn finish_failure(&self, generation: u64, reason: &str) -> FleetResult<()> {
        let mut state = self.state.lock();
        state.computation.fail(generation, reason)?;
        state.in_flight = None;
        Ok(())
    }
}
