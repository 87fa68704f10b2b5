use demo::notes::{self, CreateNote, GetNote};
use demo::notifications::NotificationKind;
use demo::operations::{self, GetOperation};
use demo::storage::{InMemoryUnitOfWork, Note};
use demo::{App, Transport};
use modkit_application::operation::OperationId;
use modkit_application::{AuthInfo, EventBusExt, ExecutionContext, OperationStatus};
use modkit_domain::event::Event;
use modkit_domain::exception::kinds;
use std::sync::Arc;
use std::time::Duration;

fn ctx(app: &App, role: &str) -> ExecutionContext {
    ExecutionContext::builder()
        .auth(AuthInfo::authenticated("user-1", role))
        .event_bus(app.bus.clone())
        .build()
}

fn create(title: &str) -> Event<CreateNote> {
    Event::new(CreateNote {
        title: title.to_string(),
        content: "body".to_string(),
    })
}

async fn notifications(app: &App, expected: usize) -> Vec<demo::notifications::Notification> {
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let sent = app.outbox.snapshot();
            if sent.len() >= expected {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn creates_and_reads_back_a_note() {
    let app = App::start(Transport::Local).await.unwrap();
    let ctx = ctx(&app, "editor");

    let mut handle = app.bus.publish(create("first"), &ctx).await.unwrap();
    let operation = handle.wait().await;
    assert_eq!(operation.status(), OperationStatus::Success);

    let note: Note = operation.output().unwrap().unwrap();
    assert_eq!(note.author.as_deref(), Some("user-1"));
    assert_eq!(
        operation.outcome().unwrap().data().unwrap()["_id"],
        note.id.as_str()
    );

    let found = app
        .module(notes::MODULE)
        .unwrap()
        .query::<GetNote>(note.id.clone(), &ctx)
        .await
        .unwrap();
    assert_eq!(found, note);

    let sent = notifications(&app, 1).await;
    assert_eq!(sent[0].kind, NotificationKind::NoteCreated);
    assert_eq!(sent[0].trace_id, ctx.trace_id());
}

#[tokio::test]
async fn empty_title_is_rejected_before_storage() {
    let app = App::start(Transport::Local).await.unwrap();
    let ctx = ctx(&app, "editor");

    let mut handle = app.bus.publish(create("  "), &ctx).await.unwrap();
    let operation = handle.wait().await;

    assert_eq!(operation.status(), OperationStatus::Error);
    let err = operation.result().unwrap().clone().unwrap_err();
    assert!(err.is_kind(kinds::VALIDATION));
    assert!(app.repository.is_empty().await);
}

#[tokio::test]
async fn readers_need_an_allowed_role() {
    let app = App::start(Transport::Local).await.unwrap();
    let editor = ctx(&app, "editor");
    let mut handle = app.bus.publish(create("secret"), &editor).await.unwrap();
    let note: Note = handle.wait().await.output().unwrap().unwrap();

    let err = app
        .module(notes::MODULE)
        .unwrap()
        .query::<GetNote>(note.id, &ctx(&app, "guest"))
        .await
        .unwrap_err();
    assert!(err.is_kind(kinds::FORBIDDEN));
}

#[tokio::test]
async fn operations_are_queryable_by_id() {
    let app = App::start(Transport::Queued).await.unwrap();
    let ctx = ctx(&app, "admin");
    let operations = app.module(operations::MODULE).unwrap();

    let mut handle = app.bus.publish(create("tracked"), &ctx).await.unwrap();
    handle.wait().await;

    let record = operations.query::<GetOperation>(handle.id(), &ctx).await.unwrap();
    assert_eq!(record.status, OperationStatus::Success);
    assert_eq!(record.event_name, "notes.create_note");

    let err = operations
        .query::<GetOperation>(OperationId::new(), &ctx)
        .await
        .unwrap_err();
    assert!(err.is_kind(kinds::NOT_FOUND));
}

#[tokio::test]
async fn failures_are_broadcast_to_notifications() {
    let app = App::start(Transport::Local).await.unwrap();
    let ctx = ctx(&app, "editor");

    let mut handle = app.bus.publish(create(""), &ctx).await.unwrap();
    let failed = handle.wait().await;
    let err = failed.result().unwrap().clone().unwrap_err();

    let mut raised = app
        .bus
        .publish_exception(err, Some(failed.id()), &ctx)
        .await
        .unwrap();
    assert_eq!(raised.wait().await.status(), OperationStatus::Success);

    let sent = app.outbox.snapshot();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::Failure);
    assert!(sent[0].message.contains(&failed.id().to_string()));
}

#[tokio::test]
async fn commands_commit_their_transaction() {
    let app = App::start(Transport::Local).await.unwrap();
    let uow = Arc::new(InMemoryUnitOfWork::default());
    let ctx = ExecutionContext::builder()
        .auth(AuthInfo::authenticated("user-1", "admin"))
        .event_bus(app.bus.clone())
        .unit_of_work(uow.clone())
        .build();

    let mut handle = app.bus.publish(create("atomic"), &ctx).await.unwrap();
    assert_eq!(handle.wait().await.status(), OperationStatus::Success);
    assert_eq!(uow.committed(), 1);
    assert_eq!(uow.rolled_back(), 0);
    assert_eq!(app.repository.len().await, 1);
}
