//! 日志协作者（Logger）
//!
//! 执行上下文可选携带一个 `Logger`；运行时仅在其存在时调用，缺省时静默。
//! [`TracingLogger`] 将调用转发到 `tracing`，是进程内的默认实现。
//!
use serde_json::Value;

pub trait Logger: Send + Sync {
    fn info(&self, message: &str, meta: Option<&Value>);
    fn warn(&self, message: &str, meta: Option<&Value>);
    fn error(&self, message: &str, meta: Option<&Value>);
    fn debug(&self, message: &str, meta: Option<&Value>);
}

/// 基于 `tracing` 的日志实现，`meta` 以 JSON 文本附加在 `meta` 字段上
#[derive(Debug, Clone, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

fn render(meta: Option<&Value>) -> String {
    meta.map(Value::to_string).unwrap_or_default()
}

impl Logger for TracingLogger {
    fn info(&self, message: &str, meta: Option<&Value>) {
        tracing::info!(meta = %render(meta), "{message}");
    }

    fn warn(&self, message: &str, meta: Option<&Value>) {
        tracing::warn!(meta = %render(meta), "{message}");
    }

    fn error(&self, message: &str, meta: Option<&Value>) {
        tracing::error!(meta = %render(meta), "{message}");
    }

    fn debug(&self, message: &str, meta: Option<&Value>) {
        tracing::debug!(meta = %render(meta), "{message}");
    }
}
