//! modkit 演示：笔记、通知与操作查询三个模块共用一条事件总线
//!
//! - `notes`：`CreateNote` 命令与 `GetNote` 查询；
//! - `notifications`：订阅 `NoteCreated` 与 `ExceptionRaised`；
//! - `operations`：基于追踪存储的 `GetOperation` 查询；
//! - `storage`：内存仓储与工作单元。
//!
pub mod notes;
pub mod notifications;
pub mod operations;
pub mod storage;

use modkit_application::operation::{InMemoryOperationStore, OperationStore};
use modkit_application::{EventBus, LocalEventBus, Module, QueuedEventBus, QueuedEventBusConfig};
use modkit_domain::AppResult;
use std::sync::Arc;

/// 传输方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Transport {
    /// 进程内直接派生任务
    Local,
    /// 经有界队列分发，需要先连接
    Queued,
}

/// 组装完成的应用：总线、追踪存储与全部模块
pub struct App {
    pub bus: Arc<dyn EventBus>,
    pub operations: Arc<dyn OperationStore>,
    pub repository: Arc<storage::InMemoryNoteRepository>,
    pub outbox: Arc<notifications::Outbox>,
    pub modules: Vec<Module>,
}

impl App {
    /// 构建并启动全部模块
    pub async fn start(transport: Transport) -> AppResult<Self> {
        let operations: Arc<dyn OperationStore> = Arc::new(InMemoryOperationStore::new());
        let bus: Arc<dyn EventBus> = match transport {
            Transport::Local => Arc::new(LocalEventBus::with_operation_store(operations.clone())),
            Transport::Queued => Arc::new(
                QueuedEventBus::new(QueuedEventBusConfig::default()).with_operation_store(operations.clone()),
            ),
        };

        let repository = Arc::new(storage::InMemoryNoteRepository::default());
        let outbox = Arc::new(notifications::Outbox::default());

        let modules = vec![
            notes::module(bus.clone(), repository.clone())?,
            notifications::module(bus.clone(), outbox.clone())?,
            operations::module(bus.clone(), operations.clone())?,
        ];
        for module in &modules {
            module.start().await?;
        }

        Ok(Self {
            bus,
            operations,
            repository,
            outbox,
            modules,
        })
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|module| module.name() == name)
    }
}
