//! 执行上下文（ExecutionContext）
//!
//! 承载一次请求/操作在整条处理链上所需的横切信息：
//! - 追踪 ID（`trace_id`）；
//! - 认证主体（`auth`：主体 ID 与角色）；
//! - 事件总线句柄（引用，不拥有）；
//! - 可选的工作单元（`unit_of_work`）与日志（`logger`）；
//! - 自由格式的元数据（`metadata`）。
//!
//! 上下文在系统边界创建一次，按值沿处理链传递，从不持久化。派生上下文
//! （`with_metadata`）复制全部字段并合并元数据，原上下文保持不变。
//!
//! ```rust,ignore
//! let ctx = ExecutionContext::builder()
//!     .trace_id("req-42")
//!     .auth(AuthInfo::authenticated("u-1", "admin"))
//!     .event_bus(bus.clone())
//!     .logger(Arc::new(TracingLogger::new()))
//!     .build();
//! ```
use crate::eventing::EventBus;
use crate::logger::Logger;
use crate::unit_of_work::UnitOfWork;
use bon::Builder;
use futures_util::FutureExt;
use modkit_domain::{AppResult, Exception};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use ulid::Ulid;

/// 认证主体信息
#[derive(Builder, Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    #[builder(into)]
    subject_id: Option<String>,
    #[builder(into)]
    role: Option<String>,
}

impl AuthInfo {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(subject_id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            subject_id: Some(subject_id.into()),
            role: Some(role.into()),
        }
    }

    pub fn subject_id(&self) -> Option<&str> {
        self.subject_id.as_deref()
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.subject_id.is_some()
    }

    /// 角色是否在允许集合内（无角色视为不满足）
    pub fn has_any_role(&self, allowed: &[&str]) -> bool {
        self.role().is_some_and(|role| allowed.contains(&role))
    }
}

#[derive(Builder, Clone)]
pub struct ExecutionContext {
    #[builder(into, default = Ulid::new().to_string())]
    trace_id: String,
    #[builder(default)]
    auth: AuthInfo,
    event_bus: Arc<dyn EventBus>,
    unit_of_work: Option<Arc<dyn UnitOfWork>>,
    logger: Option<Arc<dyn Logger>>,
    #[builder(default)]
    metadata: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn auth(&self) -> &AuthInfo {
        &self.auth
    }

    pub fn event_bus(&self) -> &Arc<dyn EventBus> {
        &self.event_bus
    }

    pub fn unit_of_work(&self) -> Option<&Arc<dyn UnitOfWork>> {
        self.unit_of_work.as_ref()
    }

    pub fn logger(&self) -> Option<&dyn Logger> {
        self.logger.as_deref()
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    /// 派生上下文：复制全部字段并合并元数据（同名键以新值为准）
    pub fn with_metadata<I, K>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut derived = self.clone();
        derived
            .metadata
            .extend(extra.into_iter().map(|(k, v)| (k.into(), v)));
        derived
    }

    /// 日志元数据：追踪 ID 与主体 ID
    pub(crate) fn log_meta(&self) -> Value {
        json!({
            "trace_id": self.trace_id,
            "subject_id": self.auth.subject_id(),
        })
    }

    /// 在事务边界内执行 `f`
    ///
    /// - 未挂载工作单元：直接执行并原样返回；
    /// - 已有活动事务（嵌套调用）：透明透传，不再开始/提交/回滚；
    /// - 最外层调用：开始事务，失败结果回滚后原样返回，成功结果提交后返回；
    ///   `f` 发生 panic 时回滚、记录错误并返回 `UnknownException`。
    pub async fn with_transaction<T, F, Fut>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = AppResult<T>> + Send,
        T: Send,
    {
        let Some(uow) = self.unit_of_work.as_ref() else {
            return f().await;
        };

        if uow.has_active_transaction() {
            return f().await;
        }

        uow.begin_transaction().await?;

        match AssertUnwindSafe(async move { f().await })
            .catch_unwind()
            .await
        {
            Ok(Ok(value)) => match uow.commit_transaction().await {
                Ok(()) => Ok(value),
                Err(err) => {
                    self.rollback(&**uow, &err).await;
                    Err(err)
                }
            },
            Ok(Err(err)) => {
                self.rollback(&**uow, &err).await;
                Err(err)
            }
            Err(panic) => {
                let err = Exception::from_panic(panic);
                self.rollback(&**uow, &err).await;
                if let Some(logger) = self.logger() {
                    let mut meta = self.log_meta();
                    meta["error"] = json!(err);
                    logger.error("transaction aborted by panic", Some(&meta));
                }
                Err(err)
            }
        }
    }

    async fn rollback(&self, uow: &dyn UnitOfWork, cause: &Exception) {
        tracing::debug!(trace_id = %self.trace_id, cause = %cause, "rolling back transaction");
        if let Err(err) = uow.rollback_transaction().await {
            tracing::warn!(trace_id = %self.trace_id, error = %err, "rollback failed");
            if let Some(logger) = self.logger() {
                let mut meta = self.log_meta();
                meta["error"] = json!(err);
                logger.warn("rollback failed", Some(&meta));
            }
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("trace_id", &self.trace_id)
            .field("auth", &self.auth)
            .field("unit_of_work", &self.unit_of_work.is_some())
            .field("logger", &self.logger.is_some())
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventing::LocalEventBus;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct SpyUnitOfWork {
        active: AtomicBool,
        begins: AtomicUsize,
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
        fail_begin: bool,
        fail_commit: bool,
        fail_rollback: bool,
    }

    #[async_trait]
    impl UnitOfWork for SpyUnitOfWork {
        async fn begin_transaction(&self) -> AppResult<()> {
            self.begins.fetch_add(1, Ordering::SeqCst);
            if self.fail_begin {
                return Err(Exception::unknown("connection lost"));
            }
            self.active.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn commit_transaction(&self) -> AppResult<()> {
            if self.fail_commit {
                return Err(Exception::unknown("commit refused"));
            }
            self.commits.fetch_add(1, Ordering::SeqCst);
            self.active.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn rollback_transaction(&self) -> AppResult<()> {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
            self.active.store(false, Ordering::SeqCst);
            if self.fail_rollback {
                return Err(Exception::unknown("rollback refused"));
            }
            Ok(())
        }

        fn has_active_transaction(&self) -> bool {
            self.active.load(Ordering::SeqCst)
        }
    }

    impl SpyUnitOfWork {
        fn counts(&self) -> (usize, usize, usize) {
            (
                self.begins.load(Ordering::SeqCst),
                self.commits.load(Ordering::SeqCst),
                self.rollbacks.load(Ordering::SeqCst),
            )
        }
    }

    #[derive(Default)]
    struct SpyLogger {
        errors: Mutex<Vec<(String, Value)>>,
        warnings: Mutex<Vec<(String, Value)>>,
    }

    impl Logger for SpyLogger {
        fn info(&self, _message: &str, _meta: Option<&Value>) {}
        fn warn(&self, message: &str, meta: Option<&Value>) {
            self.warnings
                .lock()
                .unwrap()
                .push((message.to_string(), meta.cloned().unwrap_or_default()));
        }
        fn debug(&self, _message: &str, _meta: Option<&Value>) {}
        fn error(&self, message: &str, meta: Option<&Value>) {
            self.errors
                .lock()
                .unwrap()
                .push((message.to_string(), meta.cloned().unwrap_or_default()));
        }
    }

    fn ctx_with(uow: Option<Arc<SpyUnitOfWork>>, logger: Option<Arc<SpyLogger>>) -> ExecutionContext {
        ExecutionContext::builder()
            .trace_id("trace-1")
            .auth(AuthInfo::authenticated("u-1", "admin"))
            .event_bus(Arc::new(LocalEventBus::new()))
            .maybe_unit_of_work(uow.map(|u| u as Arc<dyn UnitOfWork>))
            .maybe_logger(logger.map(|l| l as Arc<dyn Logger>))
            .build()
    }

    #[test]
    fn builder_generates_trace_id_when_missing() {
        let ctx = ExecutionContext::builder()
            .event_bus(Arc::new(LocalEventBus::new()))
            .build();
        assert!(!ctx.trace_id().is_empty());
        assert!(!ctx.auth().is_authenticated());
        assert!(ctx.unit_of_work().is_none());
        assert!(ctx.logger().is_none());
    }

    #[test]
    fn with_metadata_derives_without_mutating_original() {
        let ctx = ctx_with(None, None).with_metadata([("source", json!("http"))]);
        let derived = ctx.with_metadata([("source", json!("cli")), ("attempt", json!(2))]);

        assert_eq!(ctx.metadata().len(), 1);
        assert_eq!(ctx.metadata()["source"], json!("http"));
        assert_eq!(derived.metadata()["source"], json!("cli"));
        assert_eq!(derived.metadata()["attempt"], json!(2));
        assert_eq!(derived.trace_id(), ctx.trace_id());
        assert_eq!(derived.auth(), ctx.auth());
    }

    #[test]
    fn role_checks() {
        let auth = AuthInfo::authenticated("u-1", "editor");
        assert!(auth.has_any_role(&["admin", "editor"]));
        assert!(!auth.has_any_role(&["admin"]));
        assert!(!AuthInfo::anonymous().has_any_role(&["admin"]));
    }

    #[tokio::test]
    async fn without_unit_of_work_result_is_returned_unchanged() {
        let ctx = ctx_with(None, None);
        let ok = ctx.with_transaction(|| async { Ok::<_, Exception>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err = Exception::validation("notes", "bad");
        let expected = err.clone();
        let failed = ctx
            .with_transaction(|| async move { Err::<(), _>(err) })
            .await;
        assert_eq!(failed.unwrap_err(), expected);
    }

    #[tokio::test]
    async fn outermost_success_commits() {
        let uow = Arc::new(SpyUnitOfWork::default());
        let ctx = ctx_with(Some(uow.clone()), None);

        let result = ctx.with_transaction(|| async { Ok::<_, Exception>("done") }).await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(uow.counts(), (1, 1, 0));
    }

    #[tokio::test]
    async fn outermost_failure_rolls_back_and_returns_failure() {
        let uow = Arc::new(SpyUnitOfWork::default());
        let ctx = ctx_with(Some(uow.clone()), None);
        let err = Exception::validation("notes", "title is required");
        let expected = err.clone();

        let result = ctx
            .with_transaction(|| async move { Err::<(), _>(err) })
            .await;

        assert_eq!(result.unwrap_err(), expected);
        assert_eq!(uow.counts(), (1, 0, 1));
    }

    #[tokio::test]
    async fn nested_calls_do_not_touch_the_boundary() {
        let uow = Arc::new(SpyUnitOfWork::default());
        let ctx = ctx_with(Some(uow.clone()), None);

        let inner_ctx = ctx.clone();
        let result = ctx
            .with_transaction(|| async move {
                let inner = inner_ctx
                    .with_transaction(|| async { Ok::<_, Exception>(1) })
                    .await?;
                let also = inner_ctx
                    .with_transaction(|| async { Err::<i32, _>(Exception::unknown("inner")) })
                    .await
                    .unwrap_or(0);
                Ok::<_, Exception>(inner + also)
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(uow.counts(), (1, 1, 0));
    }

    async fn exploding_storage() -> AppResult<()> {
        panic!("storage exploded")
    }

    #[tokio::test]
    async fn panic_rolls_back_logs_and_fails() {
        let uow = Arc::new(SpyUnitOfWork::default());
        let logger = Arc::new(SpyLogger::default());
        let ctx = ctx_with(Some(uow.clone()), Some(logger.clone()));

        let result = ctx.with_transaction(exploding_storage).await;

        let err = result.unwrap_err();
        assert!(err.is_kind(modkit_domain::exception::kinds::UNKNOWN));
        assert_eq!(err.message(), "storage exploded");
        assert_eq!(uow.counts(), (1, 0, 1));

        let errors = logger.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].1["trace_id"], json!("trace-1"));
        assert_eq!(errors[0].1["subject_id"], json!("u-1"));
    }

    #[tokio::test]
    async fn failing_commit_rolls_back() {
        let uow = Arc::new(SpyUnitOfWork {
            fail_commit: true,
            ..Default::default()
        });
        let ctx = ctx_with(Some(uow.clone()), None);

        let result = ctx.with_transaction(|| async { Ok::<_, Exception>(()) }).await;

        assert_eq!(result.unwrap_err().message(), "commit refused");
        assert_eq!(uow.counts(), (1, 0, 1));
    }

    #[tokio::test]
    async fn failing_begin_is_returned_without_running_the_body() {
        let uow = Arc::new(SpyUnitOfWork {
            fail_begin: true,
            ..Default::default()
        });
        let ctx = ctx_with(Some(uow.clone()), None);
        let ran = AtomicBool::new(false);

        let result = ctx
            .with_transaction(|| async {
                ran.store(true, Ordering::SeqCst);
                Ok::<_, Exception>(())
            })
            .await;

        assert_eq!(result.unwrap_err(), Exception::unknown("connection lost"));
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(uow.counts(), (1, 0, 0));
    }

    #[tokio::test]
    async fn failing_rollback_keeps_the_original_error_and_warns() {
        let uow = Arc::new(SpyUnitOfWork {
            fail_rollback: true,
            ..Default::default()
        });
        let logger = Arc::new(SpyLogger::default());
        let ctx = ctx_with(Some(uow.clone()), Some(logger.clone()));
        let err = Exception::validation("notes", "title is required");
        let expected = err.clone();

        let result = ctx
            .with_transaction(|| async move { Err::<(), _>(err) })
            .await;

        assert_eq!(result.unwrap_err(), expected);
        assert_eq!(uow.counts(), (1, 0, 1));

        let warnings = logger.warnings.lock().unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].0, "rollback failed");
        assert_eq!(warnings[0].1["trace_id"], json!("trace-1"));
        assert_eq!(warnings[0].1["error"]["message"], json!("rollback refused"));
        assert!(logger.errors.lock().unwrap().is_empty());
    }
}
