//! DeviceIdentity 值对象
//!
//! 设备身份由 (operatorName, operatorId) 复合键唯一确定。
//! 两个字段都完全相等时才视为同一设备，operatorId 为 0 与其他数值没有任何区别。

use std::fmt;

use serde::{Deserialize, Serialize};

const MAX_OPERATOR_NAME_LEN: usize = 128;

/// 设备身份值对象
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdentity {
    operator_name: String,
    operator_id: i64,
}

impl DeviceIdentity {
    /// 创建设备身份（带验证）
    pub fn new(operator_name: impl Into<String>, operator_id: i64) -> Result<Self, String> {
        let operator_name = operator_name.into();
        if operator_name.trim().is_empty() {
            return Err("operatorName cannot be empty".to_string());
        }

        if operator_name.len() > MAX_OPERATOR_NAME_LEN {
            return Err(format!(
                "operatorName too long (max {} characters)",
                MAX_OPERATOR_NAME_LEN
            ));
        }

        Ok(Self {
            operator_name,
            operator_id,
        })
    }

    pub fn operator_name(&self) -> &str {
        &self.operator_name
    }

    pub fn operator_id(&self) -> i64 {
        self.operator_id
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.operator_name, self.operator_id)
    }
}
