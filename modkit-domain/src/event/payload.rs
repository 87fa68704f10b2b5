use super::EventKind;
use serde::Serialize;
use std::fmt;

/// 事件载荷需要满足的能力边界
///
/// - `NAME`：稳定名称，用于总线路由、日志与追踪，避免依赖 `type_name::<T>()`；
/// - `KIND`：事件标签（命令/领域/集成/异常）。
///
/// 通常通过 `modkit_macros` 的 `#[command]`、`#[domain_event]`、
/// `#[integration_event]` 属性宏实现。
pub trait EventPayload: Clone + fmt::Debug + Serialize + Send + Sync + 'static {
    const NAME: &'static str;
    const KIND: EventKind;
}
