//! 模块（Module）
//!
//! 一个业务边界内的只读注册表：
//! - 命令事件名 → 命令处理器列表；
//! - 查询处理器名 → 查询处理器实例；
//! - 领域事件名 / 集成事件名 → 事件处理器列表；
//! - 命名的辅助服务。
//!
//! 通过 [`ModuleBuilder`] 构建；`start()` 连接总线后依次订阅领域事件、命令与集成事件处理器，
//! 重复调用不会再次订阅。
//!
mod builder;
mod registry;

pub use builder::ModuleBuilder;

use crate::context::ExecutionContext;
use crate::eventing::{EventBus, OperationHandler};
use crate::handler::{QueryHandler, QueryHandlerExt};
use crate::operation::Operation;
use modkit_domain::event::{Event, EventPayload};
use modkit_domain::{AppResult, Exception};
use registry::{HandlerSet, find};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct Module {
    name: String,
    event_bus: Arc<dyn EventBus>,
    commands: Vec<HandlerSet>,
    queries: HashMap<&'static str, Arc<dyn Any + Send + Sync>>,
    domain_events: Vec<HandlerSet>,
    integration_events: Vec<HandlerSet>,
    services: HashMap<String, Arc<dyn Any + Send + Sync>>,
    started: AtomicBool,
}

impl Module {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event_bus(&self) -> &Arc<dyn EventBus> {
        &self.event_bus
    }

    /// 连接总线并订阅全部处理器：领域事件 → 命令 → 集成事件
    pub async fn start(&self) -> AppResult<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::debug!(module = %self.name, "module already started");
            return Ok(());
        }

        let started = self.subscribe_all().await;
        if started.is_err() {
            self.started.store(false, Ordering::Release);
        }
        started
    }

    async fn subscribe_all(&self) -> AppResult<()> {
        self.event_bus.connect().await?;

        for set in self
            .domain_events
            .iter()
            .chain(&self.commands)
            .chain(&self.integration_events)
        {
            set.subscribe_all(&self.event_bus).await?;
            tracing::debug!(
                module = %self.name,
                event = set.event_name(),
                kind = %set.kind(),
                handlers = set.len(),
                "subscribed"
            );
        }

        tracing::info!(module = %self.name, "module started");
        Ok(())
    }

    /// 命令事件的第一个处理器
    pub fn get_command<C: EventPayload>(&self) -> AppResult<Arc<dyn OperationHandler<C>>> {
        find(&self.commands, C::NAME)
            .map(|set| set.handlers::<C>())
            .transpose()?
            .and_then(|handlers| handlers.first().cloned())
            .ok_or_else(|| Exception::missing_command(C::NAME))
    }

    /// 按注册名获取查询处理器
    pub fn get_query<H: QueryHandler>(&self) -> AppResult<Arc<H>> {
        let handler = self
            .queries
            .get(H::NAME)
            .cloned()
            .ok_or_else(|| Exception::missing_query(H::NAME))?;

        handler.downcast::<H>().map_err(|_| {
            Exception::registration(format!(
                "query handler `{}` is registered with a different type",
                H::NAME
            ))
        })
    }

    /// 直接执行命令（不经过总线），返回终态操作
    pub async fn execute_command<C: EventPayload>(
        &self,
        event: Event<C>,
        ctx: &ExecutionContext,
    ) -> AppResult<Operation<C>> {
        let handler = self.get_command::<C>()?;
        Ok(handler.invoke(event, ctx).await)
    }

    /// 解析查询处理器并以守卫 → 执行的顺序调用
    pub async fn query<H: QueryHandler>(
        &self,
        payload: H::Payload,
        ctx: &ExecutionContext,
    ) -> AppResult<H::Output> {
        let handler = self.get_query::<H>()?;
        handler.execute_with_context(payload, ctx).await
    }

    pub fn domain_event_handlers<P: EventPayload>(&self) -> AppResult<Vec<Arc<dyn OperationHandler<P>>>> {
        Self::handlers_in::<P>(&self.domain_events)
    }

    pub fn integration_event_handlers<P: EventPayload>(
        &self,
    ) -> AppResult<Vec<Arc<dyn OperationHandler<P>>>> {
        Self::handlers_in::<P>(&self.integration_events)
    }

    pub fn get_service<T: Send + Sync + 'static>(&self, name: &str) -> AppResult<Arc<T>> {
        let service = self
            .services
            .get(name)
            .cloned()
            .ok_or_else(|| Exception::missing_service(name))?;

        service.downcast::<T>().map_err(|_| {
            Exception::registration(format!("service `{name}` is registered with a different type"))
        })
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.commands.iter().map(HandlerSet::event_name).collect()
    }

    pub fn query_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.queries.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn domain_event_names(&self) -> Vec<&'static str> {
        self.domain_events.iter().map(HandlerSet::event_name).collect()
    }

    pub fn integration_event_names(&self) -> Vec<&'static str> {
        self.integration_events
            .iter()
            .map(HandlerSet::event_name)
            .collect()
    }

    fn handlers_in<P: EventPayload>(sets: &[HandlerSet]) -> AppResult<Vec<Arc<dyn OperationHandler<P>>>> {
        match find(sets, P::NAME) {
            Some(set) => Ok(set.handlers::<P>()?.clone()),
            None => Ok(Vec::new()),
        }
    }
}
