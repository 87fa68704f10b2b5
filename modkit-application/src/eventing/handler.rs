//! 操作处理器（OperationHandler）
//!
//! 总线订阅者的统一形态：接收一次分发创建的 `Operation`，完成状态转换后返回同一操作。
//! 命令处理器与事件处理器分别经由 `CommandRunner` / `EventRunner` 适配为该协议。
//!
use crate::context::ExecutionContext;
use crate::operation::Operation;
use async_trait::async_trait;
use modkit_domain::event::{Event, EventPayload};

#[async_trait]
pub trait OperationHandler<P>: Send + Sync
where
    P: EventPayload,
{
    /// 处理器名称（用于日志与追踪）
    fn handler_name(&self) -> &str;

    /// 处理操作并返回其终态
    async fn handle(&self, operation: Operation<P>) -> Operation<P>;

    /// 以给定上下文直接调用（不经过总线）
    async fn invoke(&self, event: Event<P>, ctx: &ExecutionContext) -> Operation<P> {
        self.handle(Operation::new(event, ctx.clone())).await
    }
}
