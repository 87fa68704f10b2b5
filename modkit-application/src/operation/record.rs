use super::{OperationId, OperationStatus};
use chrono::{DateTime, Utc};
use modkit_domain::Outcome;
use modkit_domain::event::EventKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 操作追踪记录：`Operation<P>` 的类型擦除快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: OperationId,
    pub status: OperationStatus,
    pub event_id: String,
    pub event_name: String,
    pub event_kind: EventKind,
    pub payload: Value,
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Outcome>,
}
