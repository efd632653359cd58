use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{next_record_stamp, now_iso8601, SnapshotFeed, QUESTIONS_KEY};
use crate::error::StoreResult;
use crate::infrastructure::LocalStore;
use crate::models::question::{self, Question};

/// 本副本持有的完整列表
///
/// 写操作基于内存中的列表计算新列表、先发布（乐观更新）再整体写回本地存储。
/// 写回是整表覆盖，多个副本并发写时后写者胜出。
pub(crate) struct LocalReplica {
    local: Option<Arc<dyn LocalStore>>,
    feed: SnapshotFeed,
    write_lock: Mutex<()>,
}

impl LocalReplica {
    /// 从本地存储载入初始列表；存储中的内容损坏时从空列表开始
    pub(crate) async fn load(local: Option<Arc<dyn LocalStore>>) -> StoreResult<Self> {
        let initial = match &local {
            Some(store) => read_list(store.as_ref()).await?.unwrap_or_default(),
            None => Vec::new(),
        };
        debug!("📥 载入 {} 条问答记录", initial.len());

        Ok(Self {
            local,
            feed: SnapshotFeed::new(initial),
            write_lock: Mutex::new(()),
        })
    }

    pub(crate) fn feed(&self) -> &SnapshotFeed {
        &self.feed
    }

    /// 重新读取本地存储；存储中没有列表时保留当前列表
    ///
    /// 与写操作共用 `write_lock`：读取和发布之间不能插入本副本的提交，
    /// 否则旧列表会覆盖刚提交的记录，下一次写入再把它写回存储。
    pub(crate) async fn reload(&self) -> StoreResult<()> {
        let Some(store) = &self.local else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().await;
        if let Some(list) = read_list(store.as_ref()).await? {
            self.feed.publish(list);
        }
        Ok(())
    }

    pub(crate) async fn submit(
        &self,
        user_id: &str,
        username: &str,
        content: &str,
    ) -> StoreResult<Question> {
        let _guard = self.write_lock.lock().await;

        let (id, timestamp) = next_record_stamp();
        let record = Question::new(id, user_id, username, content, timestamp);

        let mut list = self.feed.current();
        question::prepend(&mut list, record.clone());
        self.commit(list).await?;
        Ok(record)
    }

    pub(crate) async fn reply(
        &self,
        question_id: &str,
        admin_name: &str,
        answer: &str,
    ) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut list = self.feed.current();
        if !question::reply_in(&mut list, question_id, admin_name, answer, &now_iso8601()) {
            debug!("回复的问题 {} 不存在，忽略", question_id);
            return Ok(());
        }
        self.commit(list).await
    }

    pub(crate) async fn remove(&self, question_id: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut list = self.feed.current();
        if !question::remove_from(&mut list, question_id) {
            debug!("删除的问题 {} 不存在，忽略", question_id);
            return Ok(());
        }
        self.commit(list).await
    }

    async fn commit(&self, list: Vec<Question>) -> StoreResult<()> {
        let serialized = serde_json::to_string(&list)?;
        self.feed.publish(list);

        if let Some(store) = &self.local {
            store.set(QUESTIONS_KEY, &serialized).await?;
        }
        Ok(())
    }
}

async fn read_list(store: &dyn LocalStore) -> StoreResult<Option<Vec<Question>>> {
    let Some(raw) = store.get(QUESTIONS_KEY).await? else {
        return Ok(None);
    };
    match serde_json::from_str::<Vec<Question>>(&raw) {
        Ok(list) => Ok(Some(list)),
        Err(e) => {
            warn!("⚠️ 本地问答数据无法解析，忽略: {}", e);
            Ok(None)
        }
    }
}
