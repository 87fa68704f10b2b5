//! 笔记模块：创建命令、读取查询与 `NoteCreated` 领域事件
//!
use crate::storage::{NewNote, Note, NoteRepository};
use async_trait::async_trait;
use modkit_application::{CommandHandler, EventBus, EventBusExt, ExecutionContext, Module, ModuleBuilder, QueryHandler};
use modkit_domain::event::Event;
use modkit_domain::{AppResult, Exception, fail};
use modkit_macros::{command, domain_event};
use std::sync::Arc;

pub const MODULE: &str = "notes";
pub const REPOSITORY: &str = "repository";

/// 允许读取笔记的角色
pub const READER_ROLES: [&str; 3] = ["admin", "editor", "viewer"];

#[command(name = "notes.create_note")]
pub struct CreateNote {
    pub title: String,
    pub content: String,
}

#[domain_event(name = "notes.note_created")]
pub struct NoteCreated {
    pub note_id: String,
    pub title: String,
    pub author: Option<String>,
}

pub struct CreateNoteHandler {
    repository: Arc<dyn NoteRepository>,
}

impl CreateNoteHandler {
    pub fn new(repository: Arc<dyn NoteRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl CommandHandler<CreateNote> for CreateNoteHandler {
    type Output = Note;

    async fn execute(&self, event: &Event<CreateNote>, ctx: &ExecutionContext) -> AppResult<Note> {
        let payload = event.payload();
        if payload.title.trim().is_empty() {
            return fail(
                Exception::validation(MODULE, "title must not be empty")
                    .with_context(serde_json::json!({ "field": "title" })),
            );
        }

        let new_note = NewNote {
            title: payload.title.clone(),
            content: payload.content.clone(),
            author: ctx.auth().subject_id().map(str::to_string),
        };
        let note = ctx
            .with_transaction(|| self.repository.save(new_note))
            .await?;

        let created = NoteCreated {
            note_id: note.id.clone(),
            title: note.title.clone(),
            author: note.author.clone(),
        };
        ctx.event_bus().publish(Event::new(created), ctx).await?;

        Ok(note)
    }
}

pub struct GetNote {
    repository: Arc<dyn NoteRepository>,
}

impl GetNote {
    pub fn new(repository: Arc<dyn NoteRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl QueryHandler for GetNote {
    const NAME: &'static str = "notes.get_note";
    type Payload = String;
    type Output = Note;

    async fn guard(&self, _id: &String, ctx: &ExecutionContext) -> AppResult<()> {
        if ctx.auth().has_any_role(&READER_ROLES) {
            return Ok(());
        }
        fail(Exception::forbidden(
            MODULE,
            format!("role `{}` may not read notes", ctx.auth().role().unwrap_or("anonymous")),
        ))
    }

    async fn execute(&self, id: String, _ctx: &ExecutionContext) -> AppResult<Note> {
        self.repository
            .find(&id)
            .await?
            .ok_or_else(|| Exception::not_found(MODULE, format!("note `{id}` not found")))
    }
}

pub fn module<R>(bus: Arc<dyn EventBus>, repository: Arc<R>) -> AppResult<Module>
where
    R: NoteRepository + 'static,
{
    let shared: Arc<dyn NoteRepository> = repository.clone();
    ModuleBuilder::new(MODULE, bus)
        .set_command::<CreateNote, _>(Arc::new(CreateNoteHandler::new(shared.clone())))
        .set_query(Arc::new(GetNote::new(shared)))
        .set_service(REPOSITORY, repository)
        .build()
}
