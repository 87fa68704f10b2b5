//! 队列事件总线（QueuedEventBus）
//!
//! 以有界 mpsc 队列模拟需要“先连接”的传输：
//! - 未 `connect` 前拒绝发布与订阅（`TransportException`）；
//! - `connect` 启动分发任务，从队列取出投递并为每个订阅者派生任务，
//!   处理器任务在运行前获取信号量许可，限制同时运行的处理器数量；
//!   分发循环本身从不等待许可，处理器内部再次发布也不会阻塞队列；
//! - `shutdown` 取消分发任务，`join` 等待其退出；总线被丢弃时自动取消。
//!
use super::bus::{Delivery, EventBus, Subscriber, SubscriberTable};
use crate::operation::OperationStore;
use async_trait::async_trait;
use modkit_domain::{AppResult, Exception};
use std::any::TypeId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type Queued = (&'static str, TypeId, Delivery);

/// 队列总线配置
#[derive(Clone, Copy, Debug)]
pub struct QueuedEventBusConfig {
    /// 队列容量，队满时发布方等待
    pub capacity: usize,
    /// 同时运行的处理器上限
    pub handler_concurrency: usize,
}

impl Default for QueuedEventBusConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            handler_concurrency: 8,
        }
    }
}

pub struct QueuedEventBus {
    config: QueuedEventBusConfig,
    subscribers: Arc<SubscriberTable>,
    operation_store: Option<Arc<dyn OperationStore>>,
    sender: mpsc::Sender<Queued>,
    receiver: Mutex<Option<mpsc::Receiver<Queued>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    connected: AtomicBool,
    token: CancellationToken,
}

impl QueuedEventBus {
    pub fn new(config: QueuedEventBusConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        Self {
            config,
            subscribers: Arc::new(SubscriberTable::new()),
            operation_store: None,
            sender,
            receiver: Mutex::new(Some(receiver)),
            worker: Mutex::new(None),
            connected: AtomicBool::new(false),
            token: CancellationToken::new(),
        }
    }

    pub fn with_operation_store(mut self, store: Arc<dyn OperationStore>) -> Self {
        self.operation_store = Some(store);
        self
    }

    pub fn config(&self) -> &QueuedEventBusConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// 停止分发任务；已派生的处理器任务不受影响
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// 等待分发任务退出
    pub async fn join(&self) {
        if let Some(worker) = self.worker.lock().await.take() {
            let _ = worker.await;
        }
    }

    fn ensure_connected(&self) -> AppResult<()> {
        if self.is_connected() && !self.token.is_cancelled() {
            Ok(())
        } else {
            Err(Exception::transport("queued event bus is not connected"))
        }
    }

    async fn dispatch_loop(
        subscribers: Arc<SubscriberTable>,
        mut receiver: mpsc::Receiver<Queued>,
        token: CancellationToken,
        concurrency: usize,
    ) {
        let permits = Arc::new(Semaphore::new(concurrency.max(1)));

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                queued = receiver.recv() => {
                    let Some((event_name, payload_type, delivery)) = queued else { break };
                    let targets = match subscribers.route(event_name, payload_type) {
                        Ok(targets) => targets,
                        Err(err) => {
                            tracing::warn!(event = event_name, error = %err, "queued delivery dropped");
                            continue;
                        }
                    };

                    if targets.is_empty() {
                        tracing::debug!(event = event_name, "no subscribers for event");
                        continue;
                    }

                    for subscriber in targets {
                        let permits = permits.clone();
                        let delivery = delivery.clone();
                        tokio::spawn(async move {
                            let Ok(_permit) = permits.acquire_owned().await else { return };
                            subscriber(delivery).await;
                        });
                    }
                }
            }
        }

        tracing::info!("queued event bus dispatcher stopped");
    }
}

impl Default for QueuedEventBus {
    fn default() -> Self {
        Self::new(QueuedEventBusConfig::default())
    }
}

#[async_trait]
impl EventBus for QueuedEventBus {
    async fn connect(&self) -> AppResult<()> {
        let Some(receiver) = self.receiver.lock().await.take() else {
            tracing::debug!("queued event bus already connected");
            return Ok(());
        };

        let worker = tokio::spawn(Self::dispatch_loop(
            self.subscribers.clone(),
            receiver,
            self.token.clone(),
            self.config.handler_concurrency,
        ));
        *self.worker.lock().await = Some(worker);
        self.connected.store(true, Ordering::Release);

        tracing::info!(
            capacity = self.config.capacity,
            handler_concurrency = self.config.handler_concurrency,
            "queued event bus connected"
        );
        Ok(())
    }

    async fn emit(&self, event_name: &'static str, payload_type: TypeId, delivery: Delivery) -> AppResult<()> {
        self.ensure_connected()?;
        self.subscribers.check(event_name, payload_type)?;
        self.sender
            .send((event_name, payload_type, delivery))
            .await
            .map_err(|_| Exception::transport("queued event bus dispatcher has stopped"))
    }

    async fn register(
        &self,
        event_name: &'static str,
        payload_type: TypeId,
        subscriber: Subscriber,
    ) -> AppResult<()> {
        self.ensure_connected()?;
        self.subscribers.register(event_name, payload_type, subscriber)
    }

    fn operation_store(&self) -> Option<Arc<dyn OperationStore>> {
        self.operation_store.clone()
    }
}

impl Drop for QueuedEventBus {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
