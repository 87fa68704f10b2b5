use crate::eventing::{EventBus, EventBusExt, OperationHandler};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use modkit_domain::event::{EventKind, EventPayload};
use modkit_domain::{AppResult, Exception};
use std::any::Any;
use std::sync::Arc;

type SubscribeFn = Arc<dyn Fn(Arc<dyn EventBus>) -> BoxFuture<'static, AppResult<()>> + Send + Sync>;

type HandlerList<P> = Vec<Arc<dyn OperationHandler<P>>>;

/// 单个事件名下注册的处理器集合
///
/// 处理器列表以类型擦除方式保存（实际类型为 `Vec<Arc<dyn OperationHandler<P>>>`），
/// 同时为每个处理器保存一个订阅闭包，供模块启动时挂到总线上。
pub(crate) struct HandlerSet {
    event_name: &'static str,
    kind: EventKind,
    handlers: Box<dyn Any + Send + Sync>,
    subscriptions: Vec<SubscribeFn>,
}

impl HandlerSet {
    pub(crate) fn new<P: EventPayload>() -> Self {
        Self {
            event_name: P::NAME,
            kind: P::KIND,
            handlers: Box::new(HandlerList::<P>::new()),
            subscriptions: Vec::new(),
        }
    }

    pub(crate) fn event_name(&self) -> &'static str {
        self.event_name
    }

    pub(crate) fn kind(&self) -> EventKind {
        self.kind
    }

    pub(crate) fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub(crate) fn push<P: EventPayload>(&mut self, handler: Arc<dyn OperationHandler<P>>) -> AppResult<()> {
        let list = self
            .handlers
            .downcast_mut::<HandlerList<P>>()
            .ok_or_else(|| {
                Exception::registration(format!(
                    "event `{}` is already registered with a different payload type",
                    P::NAME
                ))
            })?;
        list.push(handler.clone());

        self.subscriptions.push(Arc::new(move |bus: Arc<dyn EventBus>| {
            let handler = handler.clone();
            async move { bus.subscribe::<P>(handler).await }.boxed()
        }));
        Ok(())
    }

    pub(crate) fn handlers<P: EventPayload>(&self) -> AppResult<&HandlerList<P>> {
        self.handlers.downcast_ref::<HandlerList<P>>().ok_or_else(|| {
            Exception::registration(format!(
                "event `{}` is registered with a different payload type",
                P::NAME
            ))
        })
    }

    pub(crate) async fn subscribe_all(&self, bus: &Arc<dyn EventBus>) -> AppResult<()> {
        for subscribe in &self.subscriptions {
            subscribe(bus.clone()).await?;
        }
        Ok(())
    }
}

/// 按事件名查找（保持注册顺序）
pub(crate) fn find<'a>(sets: &'a [HandlerSet], event_name: &str) -> Option<&'a HandlerSet> {
    sets.iter().find(|set| set.event_name() == event_name)
}

pub(crate) fn find_or_insert<'a, P: EventPayload>(sets: &'a mut Vec<HandlerSet>) -> &'a mut HandlerSet {
    match sets.iter().position(|set| set.event_name() == P::NAME) {
        Some(index) => &mut sets[index],
        None => {
            sets.push(HandlerSet::new::<P>());
            let last = sets.len() - 1;
            &mut sets[last]
        }
    }
}
