//! 命令处理器（CommandHandler）
//!
//! 具体处理器只实现 `execute`（以及可选的 `guard`）；
//! 状态转换由 [`CommandRunner`] 统一完成：守卫 → 执行 → `success` / `failed`。
//!
use crate::context::ExecutionContext;
use crate::eventing::OperationHandler;
use crate::operation::Operation;
use async_trait::async_trait;
use futures_util::FutureExt;
use modkit_domain::event::{Event, EventPayload};
use modkit_domain::{AppResult, Exception};
use serde::Serialize;
use std::any::type_name;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

#[async_trait]
pub trait CommandHandler<C>: Send + Sync
where
    C: EventPayload,
{
    type Output: Serialize + Send + 'static;

    /// 执行前的授权/校验检查，默认放行
    async fn guard(&self, _event: &Event<C>, _ctx: &ExecutionContext) -> AppResult<()> {
        Ok(())
    }

    async fn execute(&self, event: &Event<C>, ctx: &ExecutionContext) -> AppResult<Self::Output>;
}

/// 将 `CommandHandler` 适配为总线订阅者
pub struct CommandRunner<C, H> {
    handler: Arc<H>,
    _marker: PhantomData<fn(C)>,
}

impl<C, H> CommandRunner<C, H>
where
    C: EventPayload,
    H: CommandHandler<C>,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }
}

#[async_trait]
impl<C, H> OperationHandler<C> for CommandRunner<C, H>
where
    C: EventPayload,
    H: CommandHandler<C> + 'static,
{
    fn handler_name(&self) -> &str {
        type_name::<H>()
    }

    async fn handle(&self, mut operation: Operation<C>) -> Operation<C> {
        let result = {
            let event = operation.event();
            let ctx = operation.context();

            if let Some(logger) = ctx.logger() {
                logger.debug(
                    &format!("command `{}` handled by {}", C::NAME, self.handler_name()),
                    Some(&ctx.log_meta()),
                );
            }

            AssertUnwindSafe(async {
                self.handler.guard(event, ctx).await?;
                self.handler.execute(event, ctx).await
            })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(Exception::from_panic(panic)))
        };

        match result {
            Ok(output) => {
                operation.success(output);
            }
            Err(err) => {
                if let Some(logger) = operation.context().logger() {
                    let mut meta = operation.context().log_meta();
                    meta["error"] = serde_json::json!(err);
                    logger.warn(&format!("command `{}` failed", C::NAME), Some(&meta));
                }
                operation.failed(err);
            }
        }

        operation
    }
}
