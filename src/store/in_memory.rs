//! 内存策略
//!
//! 列表只存在于当前进程。可以挂一个本地存储作为备份：每次修改都整表写入，
//! 启动时读回；备份不参与任何跨副本同步，也不会被重新读取。

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::replica::LocalReplica;
use super::{QuestionStore, SnapshotCallback};
use crate::error::StoreResult;
use crate::infrastructure::{LocalStore, Subscription};
use crate::models::Question;

pub struct InMemoryStore {
    replica: LocalReplica,
}

impl InMemoryStore {
    /// 纯内存，不做任何持久化
    pub async fn new() -> StoreResult<Self> {
        Ok(Self {
            replica: LocalReplica::load(None).await?,
        })
    }

    /// 带本地备份，重启后恢复上次的列表
    pub async fn with_backup(local: Arc<dyn LocalStore>) -> StoreResult<Self> {
        let replica = LocalReplica::load(Some(local)).await?;
        info!("💾 内存问答存储已启用本地备份");
        Ok(Self { replica })
    }
}

#[async_trait]
impl QuestionStore for InMemoryStore {
    async fn submit(&self, user_id: &str, username: &str, content: &str) -> StoreResult<Question> {
        self.replica.submit(user_id, username, content).await
    }

    async fn reply(&self, question_id: &str, admin_name: &str, answer: &str) -> StoreResult<()> {
        self.replica.reply(question_id, admin_name, answer).await
    }

    async fn remove(&self, question_id: &str) -> StoreResult<()> {
        self.replica.remove(question_id).await
    }

    fn snapshot(&self) -> Vec<Question> {
        self.replica.feed().current()
    }

    fn subscribe(&self, callback: SnapshotCallback) -> Subscription {
        self.replica.feed().subscribe(callback)
    }

    fn strategy_name(&self) -> &'static str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryLocalStore;

    #[tokio::test]
    async fn test_submit_reply_remove() {
        let store = InMemoryStore::new().await.unwrap();
        let a = store.submit("user1", "Nguyễn Văn A", "A").await.unwrap();
        let b = store.submit("user2", "Trần Thị B", "B").await.unwrap();

        store.reply(&a.id, "Quản trị viên", "trả lời").await.unwrap();
        store.remove(&b.id).await.unwrap();
        store.remove(&b.id).await.unwrap();

        let list = store.snapshot();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, a.id);
        assert_eq!(list[0].admin_name.as_deref(), Some("Quản trị viên"));
        assert!(list[0].reply_timestamp.is_some());
    }

    #[tokio::test]
    async fn test_backup_survives_restart_but_does_not_sync() {
        let backup = MemoryLocalStore::new();
        let first = InMemoryStore::with_backup(Arc::new(backup.clone())).await.unwrap();
        first.submit("user1", "Nguyễn Văn A", "A").await.unwrap();

        // 第二个实例启动时读到备份
        let second = InMemoryStore::with_backup(Arc::new(backup.clone())).await.unwrap();
        assert_eq!(second.snapshot().len(), 1);

        // 之后的修改互不可见
        first.submit("user1", "Nguyễn Văn A", "B").await.unwrap();
        tokio::task::yield_now().await;
        assert_eq!(second.snapshot().len(), 1);
    }
}
