use super::{Operation, OperationId, OperationStatus};
use modkit_domain::event::EventPayload;
use tokio::sync::watch;

/// 发布后立即返回的操作句柄
///
/// 处理器在后台完成后通过 watch 通道推送最新的操作状态；
/// 调用方可轮询 `status()`/`snapshot()`，或 `wait()` 等待终态。
#[derive(Debug)]
pub struct OperationHandle<P> {
    id: OperationId,
    updates: watch::Receiver<Operation<P>>,
}

impl<P> OperationHandle<P>
where
    P: EventPayload,
{
    pub(crate) fn new(id: OperationId, updates: watch::Receiver<Operation<P>>) -> Self {
        Self { id, updates }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn status(&self) -> OperationStatus {
        self.updates.borrow().status()
    }

    /// 当前可见的最新操作状态
    pub fn snapshot(&self) -> Operation<P> {
        self.updates.borrow().clone()
    }

    /// 等待操作进入终态
    ///
    /// 若所有订阅者都已结束（或根本没有订阅者）而操作仍未终结，
    /// 返回最后一次可见的状态，不会无限等待。
    pub async fn wait(&mut self) -> Operation<P> {
        let finished = self
            .updates
            .wait_for(|operation| operation.status().is_terminal())
            .await
            .map(|operation| operation.clone());

        match finished {
            Ok(operation) => operation,
            Err(_) => self.updates.borrow().clone(),
        }
    }
}
