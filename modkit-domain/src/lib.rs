//! modkit 领域层基础库（modkit-domain）
//!
//! 提供分发运行时最底层、与传输无关的构件：
//! - 异常（`exception`）：带类型标签、可结构化比较的 `Exception`；
//! - 结果（`outcome`）：`AppResult<T>`、`ok`/`fail` 与可序列化快照 `Outcome`；
//! - 事件（`event`）：`Event<P>` 与载荷协议 `EventPayload`、事件标签 `EventKind`。
//!
//! 执行上下文、操作追踪、事件总线与模块注册表位于 `modkit-application`。
//!
pub mod event;
pub mod exception;
pub mod outcome;

pub use exception::Exception;
pub use outcome::{AppResult, Outcome, fail, ok};

// 允许在本 crate 内部通过 ::modkit_domain 进行自引用，
// 以便过程宏展开的路径在本 crate 的测试中也能解析。
extern crate self as modkit_domain;
