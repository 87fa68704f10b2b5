use serde::{Deserialize, Serialize};
use std::fmt;

/// 操作状态
///
/// - `Pending`：命令事件的初始状态；
/// - `Sent`：领域/集成/异常事件的初始状态（发出即视为已投递）；
/// - `Success` / `Error`：终态，不可逆。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,
    Sent,
    Success,
    Error,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Sent => "SENT",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}
