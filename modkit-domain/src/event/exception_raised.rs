use super::{EventKind, EventPayload};
use crate::exception::Exception;
use serde::{Deserialize, Serialize};

/// 异常事件载荷：广播一次已发生的失败
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionRaised {
    pub exception: Exception,
    /// 触发失败的操作 ID（若有）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

impl EventPayload for ExceptionRaised {
    const NAME: &'static str = "exception.raised";
    const KIND: EventKind = EventKind::Exception;
}
