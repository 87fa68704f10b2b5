//! 通知模块：订阅笔记创建与异常广播，写入内存发件箱
//!
use crate::notes::NoteCreated;
use async_trait::async_trait;
use modkit_application::{EventBus, EventHandler, ExecutionContext, Module, ModuleBuilder};
use modkit_domain::event::{Event, ExceptionRaised};
use modkit_domain::AppResult;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

pub const MODULE: &str = "notifications";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NoteCreated,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub trace_id: String,
}

#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<Notification>>,
}

impl Outbox {
    pub fn push(&self, notification: Notification) {
        self.lock().push(notification);
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        // 发件箱只做追加，持锁线程 panic 后数据依然可用
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct NotifyOnNoteCreated {
    outbox: Arc<Outbox>,
}

impl NotifyOnNoteCreated {
    pub fn new(outbox: Arc<Outbox>) -> Self {
        Self { outbox }
    }
}

#[async_trait]
impl EventHandler<NoteCreated> for NotifyOnNoteCreated {
    async fn execute(&self, event: &Event<NoteCreated>, ctx: &ExecutionContext) -> AppResult<()> {
        let created = event.payload();
        let author = created.author.as_deref().unwrap_or("someone");
        self.outbox.push(Notification {
            kind: NotificationKind::NoteCreated,
            message: format!("{author} created note `{}` ({})", created.title, created.note_id),
            trace_id: ctx.trace_id().to_string(),
        });
        Ok(())
    }
}

pub struct RecordFailure {
    outbox: Arc<Outbox>,
}

impl RecordFailure {
    pub fn new(outbox: Arc<Outbox>) -> Self {
        Self { outbox }
    }
}

#[async_trait]
impl EventHandler<ExceptionRaised> for RecordFailure {
    async fn execute(&self, event: &Event<ExceptionRaised>, ctx: &ExecutionContext) -> AppResult<()> {
        let raised = event.payload();
        let message = match &raised.operation_id {
            Some(id) => format!("operation {id} failed: {}", raised.exception),
            None => raised.exception.to_string(),
        };
        tracing::warn!(trace_id = %ctx.trace_id(), %message, "failure recorded");
        self.outbox.push(Notification {
            kind: NotificationKind::Failure,
            message,
            trace_id: ctx.trace_id().to_string(),
        });
        Ok(())
    }
}

pub fn module(bus: Arc<dyn EventBus>, outbox: Arc<Outbox>) -> AppResult<Module> {
    ModuleBuilder::new(MODULE, bus)
        .set_domain_event::<NoteCreated, _>(Arc::new(NotifyOnNoteCreated::new(outbox.clone())))
        .set_domain_event::<ExceptionRaised, _>(Arc::new(RecordFailure::new(outbox.clone())))
        .set_service("outbox", outbox)
        .build()
}
