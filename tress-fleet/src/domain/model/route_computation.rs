//! 路线计算状态机
//!
//! `Idle -> Computing -> {Succeeded | Failed} -> Idle`
//!
//! 每次进入 Computing 都会分配递增的代次号；新请求会取代仍在计算中的旧代次，
//! 旧代次之后的完成或失败都会被拒绝。

use chrono::{DateTime, Utc};

use crate::domain::model::RouteResult;
use crate::error::{FleetError, FleetResult};

/// 路线计算状态
#[derive(Debug, Clone, PartialEq)]
pub enum RouteComputationState {
    Idle,
    Computing {
        generation: u64,
        started_at: DateTime<Utc>,
    },
    Succeeded {
        generation: u64,
        result: RouteResult,
    },
    Failed {
        generation: u64,
        reason: String,
    },
}

impl RouteComputationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteComputationState::Idle => "idle",
            RouteComputationState::Computing { .. } => "computing",
            RouteComputationState::Succeeded { .. } => "succeeded",
            RouteComputationState::Failed { .. } => "failed",
        }
    }

    pub fn is_computing(&self) -> bool {
        matches!(self, RouteComputationState::Computing { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RouteComputationState::Succeeded { .. } | RouteComputationState::Failed { .. }
        )
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            RouteComputationState::Failed { reason, .. } => Some(reason.as_str()),
            _ => None,
        }
    }
}

/// 路线计算状态机
#[derive(Debug, Clone)]
pub struct RouteComputation {
    state: RouteComputationState,
    next_generation: u64,
}

impl RouteComputation {
    pub fn new() -> Self {
        Self {
            state: RouteComputationState::Idle,
            next_generation: 1,
        }
    }

    pub fn state(&self) -> &RouteComputationState {
        &self.state
    }

    /// 开始新一轮计算
    ///
    /// 返回新代次号以及被取代的旧代次（若旧计算仍在进行）。
    pub fn begin(&mut self) -> (u64, Option<u64>) {
        let superseded = match self.state {
            RouteComputationState::Computing { generation, .. } => Some(generation),
            _ => None,
        };

        let generation = self.next_generation;
        self.next_generation += 1;
        self.state = RouteComputationState::Computing {
            generation,
            started_at: Utc::now(),
        };
        (generation, superseded)
    }

    pub fn complete(&mut self, generation: u64, result: RouteResult) -> FleetResult<()> {
        self.ensure_current(generation)?;
        self.state = RouteComputationState::Succeeded { generation, result };
        Ok(())
    }

    pub fn fail(&mut self, generation: u64, reason: impl Into<String>) -> FleetResult<()> {
        self.ensure_current(generation)?;
        self.state = RouteComputationState::Failed {
            generation,
            reason: reason.into(),
        };
        Ok(())
    }

    /// 终态确认后回到 Idle；计算中不受影响
    pub fn acknowledge(&mut self) {
        if self.state.is_terminal() {
            self.state = RouteComputationState::Idle;
        }
    }

    fn ensure_current(&self, generation: u64) -> FleetResult<()> {
        match self.state {
            RouteComputationState::Computing {
                generation: current,
                ..
            } if current == generation => Ok(()),
            _ => Err(FleetError::RouteSuperseded),
        }
    }
}

impl Default for RouteComputation {
    fn default() -> Self {
        Self::new()
    }
}
