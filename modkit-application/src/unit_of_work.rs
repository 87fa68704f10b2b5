//! 工作单元（UnitOfWork）
//!
//! 事务边界抽象，可选挂载到执行上下文上。嵌套调用只观察
//! `has_active_transaction()`，开始/提交/回滚只由最外层调用者负责，
//! 见 [`ExecutionContext::with_transaction`](crate::context::ExecutionContext::with_transaction)。
//!
use async_trait::async_trait;
use modkit_domain::AppResult;

#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin_transaction(&self) -> AppResult<()>;

    async fn commit_transaction(&self) -> AppResult<()>;

    async fn rollback_transaction(&self) -> AppResult<()>;

    /// 当前是否已有打开的事务
    fn has_active_transaction(&self) -> bool;
}
