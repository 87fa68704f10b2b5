//! 事件总线（EventBus）协议
//!
//! 协议本身是类型擦除的（`emit` / `register`），以便作为 `Arc<dyn EventBus>`
//! 挂在执行上下文上；类型化的 `publish` / `subscribe` 由 [`EventBusExt`] 提供，
//! 对任意 `EventBus`（包括 `dyn EventBus`）自动可用。
//!
//! 发布语义：
//! - `publish` 同步构造 `Operation`，若配置了追踪存储则先写入，再按事件名投递给全部订阅者，
//!   随即返回 [`OperationHandle`]，不等待订阅者完成；
//! - 订阅者在后台执行 `handle(operation)`，将返回的操作写回追踪存储并推送到句柄；
//! - 同名事件的多个订阅者相互独立、并发执行，彼此之间不保证顺序；
//!   第一个终态结果生效，之后到达的结果既不推送也不写入存储；
//! - 每个事件名绑定唯一的载荷类型，类型冲突的订阅与发布返回 `RegistrationException`；
//! - 传输层投递失败直接返回给发布方。
//!
use super::OperationHandler;
use crate::context::ExecutionContext;
use crate::operation::{Operation, OperationHandle, OperationId, OperationStore};
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use modkit_domain::event::{Event, EventPayload, ExceptionRaised};
use modkit_domain::{AppResult, Exception};
use std::any::{Any, TypeId};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

/// 类型擦除的投递内容
pub type Delivery = Arc<dyn Any + Send + Sync>;

/// 类型擦除的订阅者：每次投递返回一个独立执行的 future
pub type Subscriber = Arc<dyn Fn(Delivery) -> BoxFuture<'static, ()> + Send + Sync>;

/// 一次发布的实际投递内容：初始操作与状态推送通道
///
/// `settled` 串行化各订阅者的回写，终态一旦写入即不再接受更新。
struct Dispatch<P> {
    operation: Operation<P>,
    updates: watch::Sender<Operation<P>>,
    settled: Mutex<bool>,
}

/// 事件名 → (载荷类型, 订阅者列表)
///
/// 两种传输共用的路由表；同一事件名只允许绑定一种载荷类型。
#[derive(Default)]
pub struct SubscriberTable {
    routes: DashMap<&'static str, Route>,
}

struct Route {
    payload_type: TypeId,
    subscribers: Vec<Subscriber>,
}

impl SubscriberTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        event_name: &'static str,
        payload_type: TypeId,
        subscriber: Subscriber,
    ) -> AppResult<()> {
        let mut route = self.routes.entry(event_name).or_insert_with(|| Route {
            payload_type,
            subscribers: Vec::new(),
        });
        if route.payload_type != payload_type {
            return Err(conflict(event_name));
        }
        route.subscribers.push(subscriber);
        Ok(())
    }

    /// 校验发布的载荷类型与已有订阅一致（无订阅时总是通过）
    pub fn check(&self, event_name: &str, payload_type: TypeId) -> AppResult<()> {
        match self.routes.get(event_name) {
            Some(route) if route.payload_type != payload_type => Err(conflict(event_name)),
            _ => Ok(()),
        }
    }

    /// 取出某事件名下的订阅者快照
    pub fn route(&self, event_name: &str, payload_type: TypeId) -> AppResult<Vec<Subscriber>> {
        self.check(event_name, payload_type)?;
        Ok(self
            .routes
            .get(event_name)
            .map(|route| route.subscribers.clone())
            .unwrap_or_default())
    }

    pub fn count(&self, event_name: &str) -> usize {
        self.routes
            .get(event_name)
            .map(|route| route.subscribers.len())
            .unwrap_or(0)
    }
}

fn conflict(event_name: &str) -> Exception {
    Exception::registration(format!(
        "event `{event_name}` is already bound to a different payload type on this bus"
    ))
}

#[async_trait]
pub trait EventBus: Send + Sync {
    /// 建立连接（幂等）
    async fn connect(&self) -> AppResult<()>;

    /// 将投递内容发送给 `event_name` 的全部订阅者，不等待其完成
    async fn emit(&self, event_name: &'static str, payload_type: TypeId, delivery: Delivery) -> AppResult<()>;

    /// 注册订阅者；同名事件的载荷类型必须一致
    async fn register(
        &self,
        event_name: &'static str,
        payload_type: TypeId,
        subscriber: Subscriber,
    ) -> AppResult<()>;

    /// 操作追踪存储（可选）
    fn operation_store(&self) -> Option<Arc<dyn OperationStore>>;
}

#[async_trait]
pub trait EventBusExt: EventBus {
    /// 发布事件，立即返回可追踪的操作句柄
    async fn publish<P>(&self, event: Event<P>, ctx: &ExecutionContext) -> AppResult<OperationHandle<P>>
    where
        P: EventPayload,
    {
        let operation = Operation::new(event, ctx.clone());
        let id = operation.id();

        if let Some(store) = self.operation_store() {
            store.save(operation.to_record()?).await?;
        }

        tracing::debug!(
            event = P::NAME,
            kind = %P::KIND,
            operation = %id,
            trace_id = %ctx.trace_id(),
            "publishing event"
        );

        let (updates, receiver) = watch::channel(operation.clone());
        let delivery: Delivery = Arc::new(Dispatch {
            operation,
            updates,
            settled: Mutex::new(false),
        });
        self.emit(P::NAME, TypeId::of::<P>(), delivery).await?;

        Ok(OperationHandle::new(id, receiver))
    }

    /// 以异常事件广播一次失败
    async fn publish_exception(
        &self,
        exception: Exception,
        operation_id: Option<OperationId>,
        ctx: &ExecutionContext,
    ) -> AppResult<OperationHandle<ExceptionRaised>> {
        let payload = ExceptionRaised {
            exception,
            operation_id: operation_id.map(|id| id.to_string()),
        };
        self.publish(Event::new(payload), ctx).await
    }

    /// 订阅 `P::NAME`：每次投递执行处理器，并写回追踪存储与操作句柄
    async fn subscribe<P>(&self, handler: Arc<dyn OperationHandler<P>>) -> AppResult<()>
    where
        P: EventPayload,
    {
        let store = self.operation_store();
        tracing::debug!(event = P::NAME, handler = handler.handler_name(), "subscribing handler");

        let subscriber: Subscriber = Arc::new(move |delivery: Delivery| {
            let handler = handler.clone();
            let store = store.clone();

            async move {
                let Ok(dispatch) = delivery.downcast::<Dispatch<P>>() else {
                    tracing::warn!(
                        event = P::NAME,
                        handler = handler.handler_name(),
                        "delivery payload type mismatch, skipped"
                    );
                    return;
                };

                let operation = handler.handle(dispatch.operation.clone()).await;
                tracing::debug!(
                    event = P::NAME,
                    handler = handler.handler_name(),
                    operation = %operation.id(),
                    status = %operation.status(),
                    "handler finished"
                );

                let mut settled = dispatch.settled.lock().await;
                if *settled {
                    tracing::debug!(
                        event = P::NAME,
                        handler = handler.handler_name(),
                        operation = %operation.id(),
                        "operation already finished, late result ignored"
                    );
                    return;
                }
                *settled = operation.status().is_terminal();

                if let Some(store) = store {
                    let saved = match operation.to_record() {
                        Ok(record) => store.save(record).await,
                        Err(err) => Err(err),
                    };
                    if let Err(err) = saved {
                        tracing::warn!(operation = %operation.id(), error = %err, "failed to persist operation");
                    }
                }

                dispatch.updates.send_replace(operation);
            }
            .boxed()
        });

        self.register(P::NAME, TypeId::of::<P>(), subscriber).await
    }
}

impl<B> EventBusExt for B where B: EventBus + ?Sized {}
