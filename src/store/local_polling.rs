//! 本地轮询策略
//!
//! 所有副本共享同一个本地存储。每个副本定时重读列表，同时监听存储变更事件，
//! 收到问答键的变更时立即重读。写入整表覆盖，因此两个副本在同一轮询周期内
//! 各自提交时，先写入的那条可能被后写入的副本覆盖掉。

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::replica::LocalReplica;
use super::{QuestionStore, SnapshotCallback, QUESTIONS_KEY};
use crate::error::StoreResult;
use crate::infrastructure::{LocalStore, StorageEvent, Subscription};
use crate::models::Question;

pub struct LocalPollingStore {
    replica: Arc<LocalReplica>,
    poller: JoinHandle<()>,
}

impl LocalPollingStore {
    /// 载入当前列表并启动后台同步任务
    pub async fn start(local: Arc<dyn LocalStore>, poll_interval: Duration) -> StoreResult<Self> {
        let events = local.watch();
        let replica = Arc::new(LocalReplica::load(Some(local)).await?);

        info!(
            "🔄 本地轮询同步已启动 (间隔 {} ms)",
            poll_interval.as_millis()
        );
        let poller = tokio::spawn(sync_loop(replica.clone(), events, poll_interval));

        Ok(Self { replica, poller })
    }
}

async fn sync_loop(
    replica: Arc<LocalReplica>,
    mut events: broadcast::Receiver<StorageEvent>,
    poll_interval: Duration,
) {
    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut listening = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            event = events.recv(), if listening => match event {
                Ok(event) if event.key == QUESTIONS_KEY => {}
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!("存储事件积压，跳过 {} 条", skipped);
                }
                Err(RecvError::Closed) => {
                    listening = false;
                    continue;
                }
            },
        }

        if let Err(e) = replica.reload().await {
            warn!("⚠️ 重新读取问答列表失败: {}", e);
        }
    }
}

impl Drop for LocalPollingStore {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

#[async_trait]
impl QuestionStore for LocalPollingStore {
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
        "local-polling"
    }
}
