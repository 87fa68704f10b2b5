//! 处理器协议（handler）
//!
//! - `CommandHandler`：命令处理，经 `CommandRunner` 接入总线；
//! - `QueryHandler`：查询处理，经 `QueryHandlerExt::execute_with_context` 调用；
//! - `EventHandler`：领域/集成事件处理，经 `EventRunner` 接入总线。
//!
//! 守卫统一由运行时在 `execute` 之前调用（命令与查询一致）。
//!
pub mod command;
pub mod event;
pub mod query;

pub use command::{CommandHandler, CommandRunner};
pub use event::{EventHandler, EventRunner};
pub use query::{QueryHandler, QueryHandlerExt};
