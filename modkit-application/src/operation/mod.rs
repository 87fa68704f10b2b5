//! 操作（Operation）与追踪
//!
//! - `Operation<P>`：一次事件分发的生命周期记录（Pending/Sent → Success/Error）；
//! - `OperationHandle<P>`：发布后立即返回的句柄，可轮询或等待终态；
//! - `OperationRecord`：类型擦除的可序列化快照；
//! - `OperationStore`：追踪存储协议及带保留策略的内存实现。
//!
mod handle;
mod id;
#[allow(clippy::module_inception)]
mod operation;
mod record;
mod status;
mod store;

pub use handle::OperationHandle;
pub use id::OperationId;
pub use operation::Operation;
pub use record::OperationRecord;
pub use status::OperationStatus;
pub use store::{InMemoryOperationStore, OperationStore, RetentionPolicy};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AuthInfo, ExecutionContext};
    use crate::eventing::LocalEventBus;
    use chrono::Utc;
    use modkit_domain::Exception;
    use modkit_domain::event::{Event, EventKind};
    use modkit_macros::{command, domain_event};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[command(name = "test.create")]
    struct Create {
        title: String,
    }

    #[domain_event(name = "test.created")]
    struct Created {
        id: String,
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::builder()
            .trace_id("t-1")
            .auth(AuthInfo::authenticated("u-1", "admin"))
            .event_bus(Arc::new(LocalEventBus::new()))
            .build()
    }

    fn create() -> Operation<Create> {
        Operation::new(Event::new(Create { title: "t".into() }), ctx())
    }

    #[test]
    fn initial_status_depends_on_event_kind() {
        assert_eq!(create().status(), OperationStatus::Pending);

        let created = Operation::new(Event::new(Created { id: "n-1".into() }), ctx());
        assert_eq!(created.status(), OperationStatus::Sent);
        assert!(created.finished_at().is_none());
    }

    #[test]
    fn success_sets_result_and_finish_time() {
        let mut op = create();
        op.success(json!({ "_id": "n-1" }));

        assert_eq!(op.status(), OperationStatus::Success);
        let finished = *op.finished_at().unwrap();
        assert!(finished >= *op.created_at());
        assert_eq!(op.result().unwrap().as_ref().unwrap()["_id"], "n-1");
        assert!(op.outcome().unwrap().is_success());
    }

    #[test]
    fn failed_keeps_the_exception() {
        let err = Exception::validation("notes", "title is required");
        let mut op = create();
        op.failed(err.clone());

        assert_eq!(op.status(), OperationStatus::Error);
        assert_eq!(op.result().unwrap().as_ref().unwrap_err(), &err);
        assert_eq!(op.outcome().unwrap().error(), Some(&err));
    }

    #[test]
    fn terminal_state_is_final() {
        let mut op = create();
        op.success("first");
        let finished = *op.finished_at().unwrap();

        op.failed(Exception::unknown("late")).sent().success("second");

        assert_eq!(op.status(), OperationStatus::Success);
        assert_eq!(op.finished_at(), Some(&finished));
        assert_eq!(op.output::<String>().unwrap().unwrap(), "first");
    }

    #[test]
    fn sent_only_applies_to_pending() {
        let mut op = create();
        op.sent();
        assert_eq!(op.status(), OperationStatus::Sent);
        op.success(());
        assert_eq!(op.status(), OperationStatus::Success);
    }

    #[test]
    fn record_is_a_type_erased_snapshot() {
        let mut op = create();
        op.success(json!({ "ok": true }));
        let record = op.to_record().unwrap();

        assert_eq!(record.id, op.id());
        assert_eq!(record.status, OperationStatus::Success);
        assert_eq!(record.event_name, "test.create");
        assert_eq!(record.event_kind, EventKind::Command);
        assert_eq!(record.payload, json!({ "title": "t" }));
        assert_eq!(record.trace_id, "t-1");
        assert_eq!(record.subject_id.as_deref(), Some("u-1"));
        assert!(record.result.unwrap().is_success());
    }

    #[test]
    fn operation_ids_parse_back() {
        let id = OperationId::new();
        assert_eq!(id.to_string().parse::<OperationId>().unwrap(), id);
        assert!("not-an-id".parse::<OperationId>().is_err());
    }

    #[tokio::test]
    async fn store_finds_latest_record() {
        let store = InMemoryOperationStore::new();
        let mut op = create();
        store.save(op.to_record().unwrap()).await.unwrap();
        op.success(1);
        store.save(op.to_record().unwrap()).await.unwrap();

        let found = store.find(&op.id()).await.unwrap().unwrap();
        assert_eq!(found.status, OperationStatus::Success);
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.find(&OperationId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_evicts_oldest_beyond_capacity() {
        let store = InMemoryOperationStore::with_retention(RetentionPolicy {
            max_age: None,
            max_entries: Some(2),
        });

        let mut ops = Vec::new();
        for _ in 0..3 {
            let op = create();
            store.save(op.to_record().unwrap()).await.unwrap();
            ops.push(op);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        assert_eq!(store.count().await.unwrap(), 2);
        assert!(store.find(&ops[0].id()).await.unwrap().is_none());
        assert!(store.find(&ops[2].id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn store_evicts_expired_records() {
        let store = InMemoryOperationStore::with_retention(RetentionPolicy {
            max_age: Some(Duration::from_secs(60)),
            max_entries: None,
        });
        let op = create();
        store.save(op.to_record().unwrap()).await.unwrap();

        assert_eq!(store.evict(Utc::now()), 0);
        assert_eq!(store.evict(Utc::now() + chrono::Duration::minutes(5)), 1);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn store_keeps_newest_records_under_sustained_writes() {
        let store = InMemoryOperationStore::with_retention(RetentionPolicy {
            max_age: None,
            max_entries: Some(5),
        });

        let mut ops = Vec::new();
        for _ in 0..20 {
            let mut op = create();
            store.save(op.to_record().unwrap()).await.unwrap();
            op.success(1);
            store.save(op.to_record().unwrap()).await.unwrap();
            ops.push(op);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        assert_eq!(store.count().await.unwrap(), 5);
        for op in &ops[..15] {
            assert!(store.find(&op.id()).await.unwrap().is_none());
        }
        for op in &ops[15..] {
            let kept = store.find(&op.id()).await.unwrap().unwrap();
            assert_eq!(kept.status, OperationStatus::Success);
        }
    }
}
