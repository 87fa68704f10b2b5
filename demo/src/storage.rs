use async_trait::async_trait;
use chrono::{DateTime, Utc};
use modkit_application::UnitOfWork;
use modkit_domain::{AppResult, Exception};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use ulid::Ulid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 待保存的笔记（尚未分配 ID）
#[derive(Debug, Clone)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub author: Option<String>,
}

#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// 保存并返回带 ID 的笔记
    async fn save(&self, note: NewNote) -> AppResult<Note>;

    async fn find(&self, id: &str) -> AppResult<Option<Note>>;
}

#[derive(Default)]
pub struct InMemoryNoteRepository {
    notes: RwLock<HashMap<String, Note>>,
}

impl InMemoryNoteRepository {
    pub async fn len(&self) -> usize {
        self.notes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.notes.read().await.is_empty()
    }
}

#[async_trait]
impl NoteRepository for InMemoryNoteRepository {
    async fn save(&self, note: NewNote) -> AppResult<Note> {
        let note = Note {
            id: Ulid::new().to_string(),
            title: note.title,
            content: note.content,
            author: note.author,
            created_at: Utc::now(),
        };
        self.notes.write().await.insert(note.id.clone(), note.clone());
        Ok(note)
    }

    async fn find(&self, id: &str) -> AppResult<Option<Note>> {
        Ok(self.notes.read().await.get(id).cloned())
    }
}

/// 内存工作单元：仅记录事务边界，不做实际隔离
#[derive(Debug, Default)]
pub struct InMemoryUnitOfWork {
    active: AtomicBool,
    committed: AtomicUsize,
    rolled_back: AtomicUsize,
}

impl InMemoryUnitOfWork {
    pub fn committed(&self) -> usize {
        self.committed.load(Ordering::SeqCst)
    }

    pub fn rolled_back(&self) -> usize {
        self.rolled_back.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn begin_transaction(&self) -> AppResult<()> {
        if self.active.swap(true, Ordering::AcqRel) {
            return Err(Exception::new("storage", "TransactionException", "transaction already open"));
        }
        tracing::debug!("transaction started");
        Ok(())
    }

    async fn commit_transaction(&self) -> AppResult<()> {
        self.active.store(false, Ordering::Release);
        self.committed.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("transaction committed");
        Ok(())
    }

    async fn rollback_transaction(&self) -> AppResult<()> {
        self.active.store(false, Ordering::Release);
        self.rolled_back.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("transaction rolled back");
        Ok(())
    }

    fn has_active_transaction(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}
