//! modkit 应用层运行时（modkit-application）
//!
//! 所有模块的命令、查询与事件处理器都经过这里的分发运行时：
//! - 执行上下文（`context`）：追踪 ID、认证主体、总线、工作单元、日志与元数据；
//! - 工作单元（`unit_of_work`）与日志协作者（`logger`）；
//! - 操作（`operation`）：状态机、发布句柄与追踪存储；
//! - 事件子系统（`eventing`）：发布/订阅协议与进程内、队列两种实现；
//! - 处理器协议（`handler`）：命令/查询/事件处理器及守卫流水线；
//! - 模块（`module`）：处理器与服务的只读注册表及其构建器。
//!
pub mod context;
pub mod eventing;
pub mod handler;
pub mod logger;
pub mod module;
pub mod operation;
pub mod unit_of_work;

pub use context::{AuthInfo, ExecutionContext};
pub use eventing::{EventBus, EventBusExt, LocalEventBus, QueuedEventBus, QueuedEventBusConfig};
pub use handler::{CommandHandler, EventHandler, QueryHandler, QueryHandlerExt};
pub use logger::{Logger, TracingLogger};
pub use module::{Module, ModuleBuilder};
pub use operation::{Operation, OperationHandle, OperationId, OperationStatus};
pub use unit_of_work::UnitOfWork;
