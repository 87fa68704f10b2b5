//! 查询处理器（QueryHandler）
//!
//! 处理器以 `NAME` 注册到模块；调用方应通过
//! [`QueryHandlerExt::execute_with_context`] 执行，它保证守卫先于 `execute` 完成，
//! 守卫失败时直接返回守卫的错误，`execute` 不会被调用。
//!
use crate::context::ExecutionContext;
use async_trait::async_trait;
use futures_util::FutureExt;
use modkit_domain::{AppResult, Exception};
use serde_json::json;
use std::panic::AssertUnwindSafe;

#[async_trait]
pub trait QueryHandler: Send + Sync + 'static {
    /// 注册名称（模块内唯一）
    const NAME: &'static str;

    type Payload: Send + Sync + 'static;
    type Output: Send + 'static;

    /// 执行前的授权/校验检查，默认放行
    async fn guard(&self, _payload: &Self::Payload, _ctx: &ExecutionContext) -> AppResult<()> {
        Ok(())
    }

    async fn execute(&self, payload: Self::Payload, ctx: &ExecutionContext) -> AppResult<Self::Output>;
}

#[async_trait]
pub trait QueryHandlerExt: QueryHandler {
    /// 守卫 → 执行，并在上下文带有 logger 时记录进入与结果
    async fn execute_with_context(
        &self,
        payload: Self::Payload,
        ctx: &ExecutionContext,
    ) -> AppResult<Self::Output> {
        let logger = ctx.logger();
        if let Some(logger) = logger {
            logger.debug(&format!("query `{}` started", Self::NAME), Some(&ctx.log_meta()));
        }

        let result = AssertUnwindSafe(async {
            if let Err(err) = self.guard(&payload, ctx).await {
                if let Some(logger) = logger {
                    let mut meta = ctx.log_meta();
                    meta["error"] = json!(err);
                    logger.warn(&format!("query `{}` rejected by guard", Self::NAME), Some(&meta));
                }
                return Err(err);
            }
            self.execute(payload, ctx).await
        })
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(Exception::from_panic(panic)));

        if let Some(logger) = logger {
            match &result {
                Ok(_) => logger.debug(&format!("query `{}` succeeded", Self::NAME), Some(&ctx.log_meta())),
                Err(err) => {
                    let mut meta = ctx.log_meta();
                    meta["error"] = json!(err);
                    logger.warn(&format!("query `{}` failed", Self::NAME), Some(&meta));
                }
            }
        }

        result
    }
}

impl<H> QueryHandlerExt for H where H: QueryHandler {}
