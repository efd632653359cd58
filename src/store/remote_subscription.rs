//! 远程订阅策略
//!
//! 写操作只发给远程集合，本地列表从不直接修改，完全由按时间戳降序的实时查询
//! 推送驱动。因此提交返回之后，新记录要等下一次推送才会出现在列表里。

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    next_record_stamp, now_iso8601, QuestionStore, SnapshotCallback, SnapshotFeed,
    QUESTIONS_COLLECTION,
};
use crate::error::{StoreError, StoreResult};
use crate::infrastructure::{
    Direction, Document, Fields, Query, RemoteCollectionStore, Subscription,
};
use crate::models::Question;

pub struct RemoteSubscriptionStore {
    remote: Arc<dyn RemoteCollectionStore>,
    feed: SnapshotFeed,
    listener: JoinHandle<()>,
}

impl RemoteSubscriptionStore {
    /// 建立实时查询，等到第一份快照后返回
    pub async fn connect(remote: Arc<dyn RemoteCollectionStore>) -> Self {
        let query =
            Query::collection(QUESTIONS_COLLECTION).order_by("timestamp", Direction::Descending);
        let mut updates = remote.subscribe(query);

        let initial = match updates.next().await {
            Some(docs) => to_questions(&docs),
            None => Vec::new(),
        };
        info!("☁️ 远程问答订阅已建立，当前 {} 条", initial.len());

        let feed = SnapshotFeed::new(initial);
        let listener_feed = feed.clone();
        let listener = tokio::spawn(async move {
            while let Some(docs) = updates.next().await {
                listener_feed.publish(to_questions(&docs));
            }
            debug!("远程问答订阅已结束");
        });

        Self {
            remote,
            feed,
            listener,
        }
    }
}

fn to_questions(docs: &[Document]) -> Vec<Question> {
    docs.iter()
        .filter_map(|doc| match doc.to_record::<Question>() {
            Ok(q) => Some(q),
            Err(e) => {
                warn!("⚠️ 跳过无法解析的远程记录 {}: {}", doc.id, e);
                None
            }
        })
        .collect()
}

fn into_fields(value: Value) -> StoreResult<Fields> {
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::Remote {
            operation: "encode".to_string(),
            message: format!("expected object, got {}", other),
        }),
    }
}

impl Drop for RemoteSubscriptionStore {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[async_trait]
impl QuestionStore for RemoteSubscriptionStore {
    async fn submit(&self, user_id: &str, username: &str, content: &str) -> StoreResult<Question> {
        let (_, timestamp) = next_record_stamp();
        let mut record = Question::new("", user_id, username, content, timestamp);

        let mut fields = into_fields(serde_json::to_value(&record)?)?;
        fields.remove("id");

        record.id = self.remote.add_record(QUESTIONS_COLLECTION, fields).await?;
        debug!("☁️ 已提交问题 {}", record.id);
        Ok(record)
    }

    async fn reply(&self, question_id: &str, admin_name: &str, answer: &str) -> StoreResult<()> {
        let fields = into_fields(json!({
            "status": "replied",
            "answer": answer,
            "adminName": admin_name,
            "replyTimestamp": now_iso8601(),
        }))?;

        let updated = self
            .remote
            .update_record(QUESTIONS_COLLECTION, question_id, fields)
            .await?;
        if !updated {
            debug!("回复的问题 {} 不存在，忽略", question_id);
        }
        Ok(())
    }

    async fn remove(&self, question_id: &str) -> StoreResult<()> {
        self.remote
            .delete_record(QUESTIONS_COLLECTION, question_id)
            .await
    }

    fn snapshot(&self) -> Vec<Question> {
        self.feed.current()
    }

    fn subscribe(&self, callback: SnapshotCallback) -> Subscription {
        self.feed.subscribe(callback)
    }

    fn strategy_name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryRemoteStore;
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn wait_for<F>(
        rx: &mut mpsc::UnboundedReceiver<Vec<Question>>,
        predicate: F,
    ) -> Vec<Question>
    where
        F: Fn(&[Question]) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let list = rx.recv().await.expect("subscription closed");
                if predicate(&list) {
                    return list;
                }
            }
        })
        .await
        .expect("timed out waiting for snapshot")
    }

    fn forward(
        store: &dyn QuestionStore,
    ) -> (Subscription, mpsc::UnboundedReceiver<Vec<Question>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sub = store.subscribe(Box::new(move |list: &[Question]| {
            let _ = tx.send(list.to_vec());
        }));
        (sub, rx)
    }

    #[tokio::test]
    async fn test_submissions_arrive_newest_first() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let store = RemoteSubscriptionStore::connect(remote).await;
        let (_sub, mut rx) = forward(&store);

        for content in ["A", "B", "C"] {
            store.submit("user1", "Nguyễn Văn A", content).await.unwrap();
        }

        let list = wait_for(&mut rx, |l| l.len() == 3).await;
        let contents: Vec<_> = list.iter().map(|q| q.content.as_str()).collect();
        assert_eq!(contents, vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn test_second_replica_sees_reply() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let student = RemoteSubscriptionStore::connect(remote.clone()).await;
        let admin = RemoteSubscriptionStore::connect(remote).await;
        let (_sub, mut rx) = forward(&student);

        let q = student.submit("user4", "Phạm Thị D", "Bộ tộc?").await.unwrap();
        assert!(!q.id.is_empty());

        admin.reply(&q.id, "Quản trị viên", "Xem phần 2").await.unwrap();
        admin.reply("does-not-exist", "Quản trị viên", "x").await.unwrap();

        let list = wait_for(&mut rx, |l| l.first().is_some_and(|q| !q.is_pending())).await;
        assert_eq!(list[0].answer.as_deref(), Some("Xem phần 2"));
        assert_eq!(list[0].user_id, "user4");
    }

    #[tokio::test]
    async fn test_failed_write_leaves_list_untouched() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let store = RemoteSubscriptionStore::connect(remote.clone()).await;

        remote.set_offline(true);
        let err = store.submit("user1", "Nguyễn Văn A", "A").await.unwrap_err();
        assert!(matches!(err, StoreError::Remote { .. }));
        assert!(store.snapshot().is_empty());
    }
}
