//! 事件处理器（EventHandler）
//!
//! 领域/集成事件的终端处理单元，不经过守卫。
//!
use crate::context::ExecutionContext;
use crate::eventing::OperationHandler;
use crate::operation::Operation;
use async_trait::async_trait;
use futures_util::FutureExt;
use modkit_domain::event::{Event, EventPayload};
use modkit_domain::{AppResult, Exception};
use std::any::type_name;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

#[async_trait]
pub trait EventHandler<P>: Send + Sync
where
    P: EventPayload,
{
    async fn execute(&self, event: &Event<P>, ctx: &ExecutionContext) -> AppResult<()>;
}

/// 将 `EventHandler` 适配为总线订阅者
pub struct EventRunner<P, H> {
    handler: Arc<H>,
    _marker: PhantomData<fn(P)>,
}

impl<P, H> EventRunner<P, H>
where
    P: EventPayload,
    H: EventHandler<P>,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<P, H> OperationHandler<P> for EventRunner<P, H>
where
    P: EventPayload,
    H: EventHandler<P> + 'static,
{
    fn handler_name(&self) -> &str {
        type_name::<H>()
    }

    async fn handle(&self, mut operation: Operation<P>) -> Operation<P> {
        let result = AssertUnwindSafe(self.handler.execute(operation.event(), operation.context()))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(Exception::from_panic(panic)));

        match result {
            Ok(()) => {
                operation.success(());
            }
            Err(err) => {
                tracing::warn!(
                    event = P::NAME,
                    handler = self.handler_name(),
                    trace_id = %operation.context().trace_id(),
                    error = %err,
                    "event handler failed"
                );
                operation.failed(err);
            }
        }

        operation
    }
}
