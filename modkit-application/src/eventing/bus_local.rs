//! 进程内事件总线（LocalEventBus）
//!
//! 订阅者保存在 `SubscriberTable` 中，每次投递为每个订阅者 `tokio::spawn` 一个独立任务：
//! - `connect`：无需建立连接，仅记录日志；
//! - `emit`：立即返回，不等待任何订阅者；
//! - 无订阅者时投递被忽略（仅调试日志）。
//!
//! 需要在 tokio 运行时内使用。
use super::bus::{Delivery, EventBus, Subscriber, SubscriberTable};
use crate::operation::OperationStore;
use async_trait::async_trait;
use modkit_domain::AppResult;
use std::any::TypeId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct LocalEventBus {
    subscribers: SubscriberTable,
    operation_store: Option<Arc<dyn OperationStore>>,
    connected: AtomicBool,
}

impl LocalEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 挂载操作追踪存储
    pub fn with_operation_store(store: Arc<dyn OperationStore>) -> Self {
        Self {
            operation_store: Some(store),
            ..Self::default()
        }
    }

    /// 某事件名下的订阅者数量
    pub fn subscriber_count(&self, event_name: &str) -> usize {
        self.subscribers.count(event_name)
    }
}

#[async_trait]
impl EventBus for LocalEventBus {
    async fn connect(&self) -> AppResult<()> {
        if self.connected.swap(true, Ordering::AcqRel) {
            tracing::debug!("local event bus already connected");
        } else {
            tracing::info!("local event bus connected (in-process, nothing to establish)");
        }
        Ok(())
    }

    async fn emit(&self, event_name: &'static str, payload_type: TypeId, delivery: Delivery) -> AppResult<()> {
        let subscribers = self.subscribers.route(event_name, payload_type)?;

        if subscribers.is_empty() {
            tracing::debug!(event = event_name, "no subscribers for event");
            return Ok(());
        }

        for subscriber in subscribers {
            tokio::spawn(subscriber(delivery.clone()));
        }
        Ok(())
    }

    async fn register(
        &self,
        event_name: &'static str,
        payload_type: TypeId,
        subscriber: Subscriber,
    ) -> AppResult<()> {
        self.subscribers.register(event_name, payload_type, subscriber)
    }

    fn operation_store(&self) -> Option<Arc<dyn OperationStore>> {
        self.operation_store.clone()
    }
}
