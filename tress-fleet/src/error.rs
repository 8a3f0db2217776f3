//! 车队服务错误定义

use thiserror::Error;

/// 遥测负载解码错误
///
/// 解码失败的消息只会被记录并丢弃，不会传播到存储层。
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl DecodeError {
    /// 用于指标标签的简短原因
    pub fn reason(&self) -> &'static str {
        match self {
            DecodeError::Malformed(_) => "malformed",
            DecodeError::MissingField(_) => "missing_field",
            DecodeError::InvalidValue { .. } => "invalid_value",
        }
    }
}

/// 车队服务错误
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("telemetry decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("telemetry connection lost: {0}")]
    ConnectionLost(String),

    #[error("insufficient route targets: {distinct} distinct device(s), at least 2 required")]
    InsufficientTargets { distinct: usize },

    #[error("no start device selected")]
    NoStartSelected,

    #[error("route computation failed: {0}")]
    RouteComputationFailed(String),

    #[error("route computation superseded by a newer request")]
    RouteSuperseded,

    #[error("configuration error: {0}")]
    Config(String),
}

impl FleetError {
    pub fn route_failed(reason: impl Into<String>) -> Self {
        FleetError::RouteComputationFailed(reason.into())
    }

    /// 用于指标标签和日志的错误类别
    pub fn kind(&self) -> &'static str {
        match self {
            FleetError::Decode(_) => "decode",
            FleetError::ConnectionLost(_) => "connection_lost",
            FleetError::InsufficientTargets { .. } => "insufficient_targets",
            FleetError::NoStartSelected => "no_start_selected",
            FleetError::RouteComputationFailed(_) => "failed",
            FleetError::RouteSuperseded => "superseded",
            FleetError::Config(_) => "config",
        }
    }
}

pub type FleetResult<T> = Result<T, FleetError>;
