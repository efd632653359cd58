//! 问答列表的复制存储
//!
//! 同一个 `QuestionStore` 接口下有三种同步策略，启动时按配置选定一种：
//!
//! | 策略 | 实现 | 跨副本同步 |
//! |------|------|-----------|
//! | 本地轮询 | `LocalPollingStore` | 定时重读 + 存储变更事件，最后写入者覆盖 |
//! | 远程订阅 | `RemoteSubscriptionStore` | 写到远程集合，列表只由订阅推送更新 |
//! | 内存 | `InMemoryStore` | 无，可选本地备份用于重启恢复 |
//!
//! 所有策略对外都保证列表"最新在前"，回复对未知 id 静默忽略。

pub mod in_memory;
pub mod local_polling;
pub mod remote_subscription;
mod replica;

pub use in_memory::InMemoryStore;
pub use local_polling::LocalPollingStore;
pub use remote_subscription::RemoteSubscriptionStore;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::StoreResult;
use crate::infrastructure::Subscription;
use crate::models::Question;

/// 本地存储中问答列表所在的键
pub const QUESTIONS_KEY: &str = "app_questions";

/// 远程问答集合名
pub const QUESTIONS_COLLECTION: &str = "questions";

/// 列表快照回调
pub type SnapshotCallback = Box<dyn Fn(&[Question]) + Send + Sync>;

/// 问答列表存储
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// 提交新问题，返回写入的记录
    async fn submit(&self, user_id: &str, username: &str, content: &str) -> StoreResult<Question>;

    /// 管理员回复；id 不存在时静默成功
    async fn reply(&self, question_id: &str, admin_name: &str, answer: &str) -> StoreResult<()>;

    /// 删除；id 不存在时静默成功
    async fn remove(&self, question_id: &str) -> StoreResult<()>;

    /// 当前可见列表（最新在前）
    fn snapshot(&self) -> Vec<Question>;

    /// 订阅列表变化：立即回调一次当前列表，之后每次变化回调一次
    ///
    /// 需要在 tokio 运行时内调用。
    fn subscribe(&self, callback: SnapshotCallback) -> Subscription;

    /// 策略名，用于日志
    fn strategy_name(&self) -> &'static str;
}

// ========== 共用部件 ==========

/// 可见列表的发布点
#[derive(Clone)]
pub(crate) struct SnapshotFeed {
    sender: Arc<watch::Sender<Arc<Vec<Question>>>>,
}

impl SnapshotFeed {
    pub(crate) fn new(initial: Vec<Question>) -> Self {
        let (sender, _) = watch::channel(Arc::new(initial));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub(crate) fn current(&self) -> Vec<Question> {
        self.sender.borrow().as_ref().clone()
    }

    /// 发布新列表；与当前内容相同时不通知
    pub(crate) fn publish(&self, list: Vec<Question>) {
        self.sender.send_if_modified(|current| {
            if current.as_ref() == &list {
                false
            } else {
                *current = Arc::new(list);
                true
            }
        });
    }

    pub(crate) fn subscribe(&self, callback: SnapshotCallback) -> Subscription {
        let mut receiver = self.sender.subscribe();
        let task = tokio::spawn(async move {
            loop {
                let list = receiver.borrow_and_update().clone();
                callback(&list);
                if receiver.changed().await.is_err() {
                    break;
                }
            }
        });
        Subscription::new(task)
    }
}

static LAST_ISSUED_MILLIS: AtomicI64 = AtomicI64::new(0);

/// 生成新记录的 (id, 时间戳)
///
/// id 是毫秒时间戳字符串。进程内严格递增，同一毫秒内的第二次提交顺延 1ms，
/// 时间戳取同一个值，所以"按时间戳降序"和"按提交顺序倒序"一致。
pub(crate) fn next_record_stamp() -> (String, String) {
    let now = Utc::now().timestamp_millis();
    let millis = match LAST_ISSUED_MILLIS.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        Some(now.max(last + 1))
    }) {
        Ok(last) | Err(last) => now.max(last + 1),
    };
    let timestamp = DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    (millis.to_string(), timestamp)
}

/// 当前时间的 ISO-8601 字符串（毫秒精度，UTC）
pub(crate) fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
