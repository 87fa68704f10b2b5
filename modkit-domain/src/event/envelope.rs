use super::{EventKind, EventPayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 事件：对不可变载荷的包装，每次分发创建一次
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<P> {
    id: Uuid,
    occurred_at: DateTime<Utc>,
    payload: P,
}

impl<P> Event<P>
where
    P: EventPayload,
{
    pub fn new(payload: P) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            payload,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 事件的稳定名称（即 `P::NAME`）
    pub fn name(&self) -> &'static str {
        P::NAME
    }

    pub fn kind(&self) -> EventKind {
        P::KIND
    }

    pub fn occurred_at(&self) -> &DateTime<Utc> {
        &self.occurred_at
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }
}

impl<P> From<P> for Event<P>
where
    P: EventPayload,
{
    fn from(payload: P) -> Self {
        Self::new(payload)
    }
}
