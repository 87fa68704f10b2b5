//! 执行结果（Outcome）
//!
//! 运行时内统一使用 `AppResult<T>` 表达成功/失败，仅通过 [`ok`] 与 [`fail`] 构造；
//! `fail` 会把任意可转换的失败归一为 [`Exception`]。
//!
//! [`Outcome`] 是结果的可序列化快照（`{success, data}` 或 `{success, error}`），
//! 用于操作追踪存储与对外展示。
//!
use crate::exception::Exception;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static NULL: Value = Value::Null;

/// 统一 Result 类型别名
pub type AppResult<T> = Result<T, Exception>;

pub fn ok<T>(data: T) -> AppResult<T> {
    Ok(data)
}

pub fn fail<T>(error: impl Into<Exception>) -> AppResult<T> {
    Err(error.into())
}

/// 结果快照：`data` 与 `error` 有且仅有一个
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<Exception>,
}

impl Outcome {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: Exception) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_failure(&self) -> bool {
        !self.success
    }

    /// 成功时返回数据（反序列化后的 `null` 数据同样视为存在）
    pub fn data(&self) -> Option<&Value> {
        if self.success {
            Some(self.data.as_ref().unwrap_or(&NULL))
        } else {
            None
        }
    }

    pub fn error(&self) -> Option<&Exception> {
        self.error.as_ref()
    }

    pub fn into_result(self) -> AppResult<Value> {
        match (self.data, self.error) {
            (_, Some(error)) => Err(error),
            (data, None) => Ok(data.unwrap_or(Value::Null)),
        }
    }
}

impl From<AppResult<Value>> for Outcome {
    fn from(result: AppResult<Value>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(error) => Self::failure(error),
        }
    }
}

impl From<&AppResult<Value>> for Outcome {
    fn from(result: &AppResult<Value>) -> Self {
        result.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::kinds;
    use serde_json::json;

    #[test]
    fn fail_normalizes_plain_strings() {
        let result: AppResult<()> = fail("connection reset");
        let err = result.unwrap_err();
        assert!(err.is_kind(kinds::UNKNOWN));
        assert_eq!(err.message(), "connection reset");
    }

    #[test]
    fn fail_keeps_typed_exceptions() {
        let exception = Exception::validation("notes", "title is required");
        let result: AppResult<()> = fail(exception.clone());
        assert_eq!(result.unwrap_err(), exception);
    }

    #[test]
    fn outcome_flags_are_exclusive() {
        let cases = [
            Outcome::from(ok(json!({ "_id": "n-1" }))),
            Outcome::from(fail::<Value>(Exception::unknown("boom"))),
            Outcome::from(ok(Value::Null)),
        ];

        for outcome in cases {
            assert_ne!(outcome.is_success(), outcome.is_failure());
            assert_eq!(outcome.is_success(), outcome.data().is_some());
            assert_eq!(outcome.is_failure(), outcome.error().is_some());
        }
    }

    #[test]
    fn outcome_serializes_one_branch() {
        let value = serde_json::to_value(Outcome::success(json!(1))).unwrap();
        assert_eq!(value, json!({ "success": true, "data": 1 }));

        let value = serde_json::to_value(Outcome::failure(Exception::unknown("x"))).unwrap();
        assert_eq!(value["success"], json!(false));
        assert!(value.get("data").is_none());
        assert_eq!(value["error"]["type"], kinds::UNKNOWN);
    }
}
