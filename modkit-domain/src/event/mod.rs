//! 事件分类（Event taxonomy）
//!
//! `Event<P>` 包装一个不可变载荷；载荷类型通过 [`EventPayload`] 声明稳定名称与标签
//! （命令、领域、集成、异常）。总线按名称路由，操作按标签决定初始状态。

mod envelope;
mod exception_raised;
mod kind;
mod payload;

pub use envelope::Event;
pub use exception_raised::ExceptionRaised;
pub use kind::EventKind;
pub use payload::EventPayload;
