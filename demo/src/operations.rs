//! 操作模块：按 ID 读取追踪存储中的操作记录
//!
use async_trait::async_trait;
use modkit_application::operation::{OperationId, OperationRecord, OperationStore};
use modkit_application::{EventBus, ExecutionContext, Module, ModuleBuilder, QueryHandler};
use modkit_domain::{AppResult, Exception};
use std::sync::Arc;

pub const MODULE: &str = "operations";

pub struct GetOperation {
    store: Arc<dyn OperationStore>,
}

impl GetOperation {
    pub fn new(store: Arc<dyn OperationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl QueryHandler for GetOperation {
    const NAME: &'static str = "operations.get_operation";
    type Payload = OperationId;
    type Output = OperationRecord;

    async fn execute(&self, id: OperationId, _ctx: &ExecutionContext) -> AppResult<OperationRecord> {
        self.store
            .find(&id)
            .await?
            .ok_or_else(|| Exception::not_found(MODULE, format!("operation `{id}` not found or expired")))
    }
}

pub fn module(bus: Arc<dyn EventBus>, store: Arc<dyn OperationStore>) -> AppResult<Module> {
    ModuleBuilder::new(MODULE, bus)
        .set_query(Arc::new(GetOperation::new(store)))
        .build()
}
