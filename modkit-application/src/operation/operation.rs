use super::{OperationId, OperationRecord, OperationStatus};
use crate::context::ExecutionContext;
use chrono::{DateTime, Utc};
use modkit_domain::event::{Event, EventPayload};
use modkit_domain::{AppResult, Exception, Outcome};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// 操作：一次事件分发的可追踪记录
///
/// 只能通过 `success` / `failed` / `sent` 改变状态；转换单向且不可逆。
/// 进入终态后再次调用终态转换会被忽略，`finished_at` 一经设置不再改变。
#[derive(Debug, Clone)]
pub struct Operation<P> {
    id: OperationId,
    status: OperationStatus,
    event: Arc<Event<P>>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    result: Option<AppResult<Value>>,
    context: ExecutionContext,
}

impl<P> Operation<P>
where
    P: EventPayload,
{
    /// 创建操作：命令事件初始为 `Pending`，其余事件直接 `Sent`
    pub fn new(event: Event<P>, context: ExecutionContext) -> Self {
        let mut operation = Self {
            id: OperationId::new(),
            status: OperationStatus::Pending,
            event: Arc::new(event),
            created_at: Utc::now(),
            finished_at: None,
            result: None,
            context,
        };
        if !P::KIND.is_command() {
            operation.sent();
        }
        operation
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn status(&self) -> OperationStatus {
        self.status
    }

    pub fn event(&self) -> &Event<P> {
        &self.event
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn finished_at(&self) -> Option<&DateTime<Utc>> {
        self.finished_at.as_ref()
    }

    pub fn result(&self) -> Option<&AppResult<Value>> {
        self.result.as_ref()
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.result.as_ref().map(Outcome::from)
    }

    /// 将成功数据还原为具体类型
    pub fn output<T: DeserializeOwned>(&self) -> Option<AppResult<T>> {
        self.result.as_ref().map(|result| match result {
            Ok(data) => serde_json::from_value(data.clone()).map_err(Exception::from),
            Err(err) => Err(err.clone()),
        })
    }

    /// 转换为 `Success`，结果数据序列化为 JSON；序列化失败时转为 `Error`
    pub fn success<T: Serialize>(&mut self, value: T) -> &mut Self {
        match serde_json::to_value(value) {
            Ok(data) => self.finish(OperationStatus::Success, Ok(data)),
            Err(err) => self.finish(OperationStatus::Error, Err(err.into())),
        }
    }

    pub fn failed(&mut self, error: impl Into<Exception>) -> &mut Self {
        self.finish(OperationStatus::Error, Err(error.into()))
    }

    /// 仅 `Pending` 可转为 `Sent`
    pub fn sent(&mut self) -> &mut Self {
        if self.status == OperationStatus::Pending {
            self.status = OperationStatus::Sent;
        }
        self
    }

    fn finish(&mut self, status: OperationStatus, result: AppResult<Value>) -> &mut Self {
        if self.status.is_terminal() {
            tracing::trace!(operation = %self.id, status = %self.status, "ignoring transition on finished operation");
            return self;
        }
        self.status = status;
        self.result = Some(result);
        self.finished_at = Some(Utc::now());
        self
    }

    /// 生成类型擦除、可序列化的追踪记录
    pub fn to_record(&self) -> AppResult<OperationRecord> {
        Ok(OperationRecord {
            id: self.id,
            status: self.status,
            event_id: self.event.id().to_string(),
            event_name: P::NAME.to_string(),
            event_kind: P::KIND,
            payload: serde_json::to_value(self.event.payload())?,
            trace_id: self.context.trace_id().to_string(),
            subject_id: self.context.auth().subject_id().map(str::to_string),
            created_at: self.created_at,
            finished_at: self.finished_at,
            result: self.outcome(),
        })
    }
}
