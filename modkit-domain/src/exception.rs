//! 应用异常（Exception）
//!
//! 所有跨越处理器边界的失败都归一为 `Exception`：
//! - `service`：产生异常的服务/模块名；
//! - `type`：异常类型标签（见 [`kinds`]）；
//! - `message`：面向人的描述；
//! - `context`：结构化上下文，参与相等性比较（深比较而非引用比较）。
//!
//! 非类型化的失败（`anyhow::Error`、字符串、panic 载荷等）在进入 `AppResult`
//! 时统一包装为 `UnknownException`。
//!
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::any::Any;

/// 运行时自身产生异常时使用的服务名
pub const CORE_SERVICE: &str = "core";

/// 常用异常类型标签
pub mod kinds {
    pub const UNKNOWN: &str = "UnknownException";
    pub const VALIDATION: &str = "ValidationException";
    pub const UNAUTHORIZED: &str = "UnauthorizedException";
    pub const FORBIDDEN: &str = "ForbiddenException";
    pub const NOT_FOUND: &str = "NotFoundException";
    pub const MISSING_COMMAND: &str = "MissingCommandException";
    pub const MISSING_QUERY: &str = "MissingQueryException";
    pub const MISSING_SERVICE: &str = "MissingServiceException";
    pub const REGISTRATION: &str = "RegistrationException";
    pub const TRANSPORT: &str = "TransportException";
    pub const SERIALIZATION: &str = "SerializationException";
}

/// 类型化的应用异常，按值比较
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("[{service}] {kind}: {message}")]
pub struct Exception {
    service: String,
    #[serde(rename = "type")]
    kind: String,
    message: String,
    #[serde(default)]
    context: Value,
}

impl Exception {
    pub fn new(
        service: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            kind: kind.into(),
            message: message.into(),
            context: Value::Null,
        }
    }

    /// 附带结构化上下文（覆盖已有上下文）
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// 异常类型标签
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &Value {
        &self.context
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(CORE_SERVICE, kinds::UNKNOWN, message)
    }

    pub fn validation(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, kinds::VALIDATION, message)
    }

    pub fn unauthorized(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, kinds::UNAUTHORIZED, message)
    }

    pub fn forbidden(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, kinds::FORBIDDEN, message)
    }

    pub fn not_found(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, kinds::NOT_FOUND, message)
    }

    pub fn missing_command(event_name: &str) -> Self {
        Self::new(
            CORE_SERVICE,
            kinds::MISSING_COMMAND,
            format!("no command handler registered for `{event_name}`"),
        )
        .with_context(json!({ "event": event_name }))
    }

    pub fn missing_query(handler_name: &str) -> Self {
        Self::new(
            CORE_SERVICE,
            kinds::MISSING_QUERY,
            format!("no query handler registered as `{handler_name}`"),
        )
        .with_context(json!({ "handler": handler_name }))
    }

    pub fn missing_service(service_name: &str) -> Self {
        Self::new(
            CORE_SERVICE,
            kinds::MISSING_SERVICE,
            format!("no service registered as `{service_name}`"),
        )
        .with_context(json!({ "service": service_name }))
    }

    pub fn registration(message: impl Into<String>) -> Self {
        Self::new(CORE_SERVICE, kinds::REGISTRATION, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(CORE_SERVICE, kinds::TRANSPORT, message)
    }

    /// 将任意标准错误包装为 `UnknownException`，错误链写入 `context.trace`
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut trace = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            trace.push(cause.to_string());
            source = cause.source();
        }
        Self::unknown(err.to_string()).with_context(json!({ "trace": trace }))
    }

    /// 将 panic 载荷转换为 `UnknownException`
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked with a non-string payload".to_string()
        };
        Self::unknown(message).with_context(json!({ "panic": true }))
    }
}

impl From<anyhow::Error> for Exception {
    fn from(err: anyhow::Error) -> Self {
        // 已是类型化异常时原样保留
        match err.downcast::<Exception>() {
            Ok(exception) => exception,
            Err(err) => {
                let trace: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
                Self::unknown(err.to_string()).with_context(json!({ "trace": trace }))
            }
        }
    }
}

impl From<serde_json::Error> for Exception {
    fn from(err: serde_json::Error) -> Self {
        Self::new(CORE_SERVICE, kinds::SERIALIZATION, err.to_string())
    }
}

impl From<String> for Exception {
    fn from(message: String) -> Self {
        Self::unknown(message)
    }
}

impl From<&str> for Exception {
    fn from(message: &str) -> Self {
        Self::unknown(message)
    }
}
