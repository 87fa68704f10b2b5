use super::Module;
use super::registry::{HandlerSet, find_or_insert};
use crate::eventing::{EventBus, OperationHandler};
use crate::handler::{CommandHandler, CommandRunner, EventHandler, EventRunner, QueryHandler};
use modkit_domain::event::{EventKind, EventPayload};
use modkit_domain::{AppResult, Exception};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// 模块构建器：唯一可变阶段，`build()` 后注册表只读
///
/// ```rust,ignore
/// let notes = ModuleBuilder::new("notes", bus.clone())
///     .set_command::<CreateNote, _>(Arc::new(CreateNoteHandler::new(repo.clone())))
///     .set_query(Arc::new(GetNoteHandler::new(repo.clone())))
///     .set_domain_event::<NoteCreated, _>(Arc::new(NotifyOnNoteCreated::new(outbox)))
///     .set_service("repository", repo)
///     .build()?;
/// ```
pub struct ModuleBuilder {
    name: String,
    event_bus: Arc<dyn EventBus>,
    commands: Vec<HandlerSet>,
    queries: HashMap<&'static str, Arc<dyn Any + Send + Sync>>,
    domain_events: Vec<HandlerSet>,
    integration_events: Vec<HandlerSet>,
    services: HashMap<String, Arc<dyn Any + Send + Sync>>,
    errors: Vec<Exception>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>, event_bus: Arc<dyn EventBus>) -> Self {
        Self {
            name: name.into(),
            event_bus,
            commands: Vec::new(),
            queries: HashMap::new(),
            domain_events: Vec::new(),
            integration_events: Vec::new(),
            services: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// 追加命令处理器；同一命令可注册多个，`get_command` 返回第一个
    pub fn set_command<C, H>(mut self, handler: Arc<H>) -> Self
    where
        C: EventPayload,
        H: CommandHandler<C> + 'static,
    {
        let runner: Arc<dyn OperationHandler<C>> = Arc::new(CommandRunner::new(handler));
        self.append::<C>(Slot::Command, runner);
        self
    }

    pub fn set_query<H>(mut self, handler: Arc<H>) -> Self
    where
        H: QueryHandler,
    {
        if self.queries.contains_key(H::NAME) {
            self.errors.push(Exception::registration(format!(
                "query handler `{}` already registered in module `{}`",
                H::NAME,
                self.name
            )));
        } else {
            self.queries.insert(H::NAME, handler);
        }
        self
    }

    pub fn set_domain_event<P, H>(mut self, handler: Arc<H>) -> Self
    where
        P: EventPayload,
        H: EventHandler<P> + 'static,
    {
        let runner: Arc<dyn OperationHandler<P>> = Arc::new(EventRunner::new(handler));
        self.append::<P>(Slot::Domain, runner);
        self
    }

    pub fn set_integration_event<P, H>(mut self, handler: Arc<H>) -> Self
    where
        P: EventPayload,
        H: EventHandler<P> + 'static,
    {
        let runner: Arc<dyn OperationHandler<P>> = Arc::new(EventRunner::new(handler));
        self.append::<P>(Slot::Integration, runner);
        self
    }

    /// 注册命名的辅助服务（同名覆盖）
    pub fn set_service<T>(mut self, name: impl Into<String>, service: Arc<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.services.insert(name.into(), service);
        self
    }

    /// 冻结注册表；注册阶段记录的任何错误都会在此返回
    pub fn build(self) -> AppResult<Module> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        tracing::debug!(
            module = %self.name,
            commands = self.commands.len(),
            queries = self.queries.len(),
            domain_events = self.domain_events.len(),
            integration_events = self.integration_events.len(),
            services = self.services.len(),
            "module built"
        );

        Ok(Module {
            name: self.name,
            event_bus: self.event_bus,
            commands: self.commands,
            queries: self.queries,
            domain_events: self.domain_events,
            integration_events: self.integration_events,
            services: self.services,
            started: AtomicBool::new(false),
        })
    }

    fn append<P: EventPayload>(&mut self, slot: Slot, handler: Arc<dyn OperationHandler<P>>) {
        if !slot.accepts(P::KIND) {
            self.errors.push(Exception::registration(format!(
                "`{}` is a {} event and cannot be registered as {}",
                P::NAME,
                P::KIND,
                slot.describe()
            )));
            return;
        }

        let sets = match slot {
            Slot::Command => &mut self.commands,
            Slot::Domain => &mut self.domain_events,
            Slot::Integration => &mut self.integration_events,
        };
        if let Err(err) = find_or_insert::<P>(sets).push(handler) {
            self.errors.push(err);
        }
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Command,
    Domain,
    Integration,
}

impl Slot {
    fn accepts(self, kind: EventKind) -> bool {
        match self {
            Slot::Command => kind == EventKind::Command,
            Slot::Domain => matches!(kind, EventKind::Domain | EventKind::Exception),
            Slot::Integration => kind == EventKind::Integration,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Slot::Command => "a command",
            Slot::Domain => "a domain event",
            Slot::Integration => "an integration event",
        }
    }
}
