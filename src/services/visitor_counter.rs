//! 访客计数 - 业务能力层
//!
//! 两种后端：
//! - `LocalCounter` - 本地存储中的整数，缺省 1000；读改写，不保证并发安全
//! - `RemoteCounter` - 远程文档上的原子自增，重置为 0
//!
//! `VisitorCounter` 是界面上的计数组件：一次挂载周期内最多自增一次，
//! 并通过订阅保持显示值与后端一致。

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast::error::RecvError, watch};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::infrastructure::{LocalStore, Query, RemoteCollectionStore, Subscription};

/// 本地计数器的键
pub const COUNTER_KEY: &str = "mln111-visitor-count";
/// 本地计数器没有值时的初始值
pub const INITIAL_COUNT: u64 = 1000;

pub const COUNTER_COLLECTION: &str = "settings";
pub const COUNTER_DOCUMENT: &str = "visitor-counter";
pub const COUNTER_FIELD: &str = "count";

/// 计数变化回调
pub type CountCallback = Box<dyn Fn(u64) + Send + Sync>;

/// 计数器后端
#[async_trait]
pub trait CounterBackend: Send + Sync {
    /// 加一并返回新值
    async fn increment(&self) -> StoreResult<u64>;
    async fn current(&self) -> StoreResult<u64>;
    /// 管理员重置为 0
    async fn reset(&self) -> StoreResult<()>;
    /// 订阅其他客户端造成的变化；需要在 tokio 运行时内调用
    fn subscribe(&self, callback: CountCallback) -> Subscription;
}

// ========== 本地计数器 ==========

pub struct LocalCounter {
    local: Arc<dyn LocalStore>,
}

impl LocalCounter {
    pub fn new(local: Arc<dyn LocalStore>) -> Self {
        Self { local }
    }
}

async fn read_local_count(local: &dyn LocalStore) -> StoreResult<u64> {
    match local.get(COUNTER_KEY).await? {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| StoreError::InvalidCounter(raw.clone())),
        None => Ok(INITIAL_COUNT),
    }
}

#[async_trait]
impl CounterBackend for LocalCounter {
    async fn increment(&self) -> StoreResult<u64> {
        let next = read_local_count(self.local.as_ref()).await? + 1;
        self.local.set(COUNTER_KEY, &next.to_string()).await?;
        Ok(next)
    }

    async fn current(&self) -> StoreResult<u64> {
        read_local_count(self.local.as_ref()).await
    }

    async fn reset(&self) -> StoreResult<()> {
        self.local.set(COUNTER_KEY, "0").await
    }

    fn subscribe(&self, callback: CountCallback) -> Subscription {
        let local = self.local.clone();
        let mut events = local.watch();
        Subscription::new(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.key != COUNTER_KEY => continue,
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
                match read_local_count(local.as_ref()).await {
                    Ok(count) => callback(count),
                    Err(e) => warn!("⚠️ 读取访客计数失败: {}", e),
                }
            }
        }))
    }
}

// ========== 远程计数器 ==========

pub struct RemoteCounter {
    remote: Arc<dyn RemoteCollectionStore>,
}

impl RemoteCounter {
    pub fn new(remote: Arc<dyn RemoteCollectionStore>) -> Self {
        Self { remote }
    }
}

fn count_to_u64(count: i64) -> StoreResult<u64> {
    u64::try_from(count).map_err(|_| StoreError::InvalidCounter(count.to_string()))
}

#[async_trait]
impl CounterBackend for RemoteCounter {
    async fn increment(&self) -> StoreResult<u64> {
        let count = self
            .remote
            .atomic_increment(COUNTER_COLLECTION, COUNTER_DOCUMENT, COUNTER_FIELD, 1)
            .await?;
        count_to_u64(count)
    }

    async fn current(&self) -> StoreResult<u64> {
        let doc = self
            .remote
            .get_document(COUNTER_COLLECTION, COUNTER_DOCUMENT)
            .await?;
        count_to_u64(doc.and_then(|d| d.get_i64(COUNTER_FIELD)).unwrap_or(0))
    }

    async fn reset(&self) -> StoreResult<()> {
        let mut fields = serde_json::Map::new();
        fields.insert(COUNTER_FIELD.to_string(), json!(0));
        self.remote
            .set_document(COUNTER_COLLECTION, COUNTER_DOCUMENT, fields)
            .await
    }

    fn subscribe(&self, callback: CountCallback) -> Subscription {
        let mut updates = self.remote.subscribe(Query::collection(COUNTER_COLLECTION));
        Subscription::new(tokio::spawn(async move {
            while let Some(docs) = updates.next().await {
                let count = docs
                    .iter()
                    .find(|d| d.id == COUNTER_DOCUMENT)
                    .and_then(|d| d.fields.get(COUNTER_FIELD))
                    .and_then(Value::as_u64);
                if let Some(count) = count {
                    callback(count);
                }
            }
        }))
    }
}

// ========== 界面组件 ==========

/// 访客计数组件
pub struct VisitorCounter {
    backend: Arc<dyn CounterBackend>,
    incremented: AtomicBool,
    displayed: Arc<watch::Sender<u64>>,
    subscription: Mutex<Option<Subscription>>,
}

impl VisitorCounter {
    pub fn new(backend: Arc<dyn CounterBackend>) -> Self {
        let (displayed, _) = watch::channel(0);
        Self {
            backend,
            incremented: AtomicBool::new(false),
            displayed: Arc::new(displayed),
            subscription: Mutex::new(None),
        }
    }

    /// 挂载：订阅变化并记一次访问
    ///
    /// 同一个组件重复挂载不会再次自增，只返回当前显示值。
    pub async fn mount(&self) -> StoreResult<u64> {
        self.ensure_subscribed();

        if self.incremented.swap(true, Ordering::SeqCst) {
            debug!("访客计数本次挂载已自增过，跳过");
            return Ok(self.count());
        }

        let count = self.backend.increment().await?;
        self.displayed.send_replace(count);
        info!("👥 访客计数: {}", count);
        Ok(count)
    }

    /// 只读取，不计数
    pub async fn refresh(&self) -> StoreResult<u64> {
        let count = self.backend.current().await?;
        self.displayed.send_replace(count);
        Ok(count)
    }

    /// 管理员重置
    pub async fn reset(&self) -> StoreResult<()> {
        self.backend.reset().await?;
        self.displayed.send_replace(0);
        info!("🔁 访客计数已重置");
        Ok(())
    }

    pub fn count(&self) -> u64 {
        *self.displayed.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<u64> {
        self.displayed.subscribe()
    }

    fn ensure_subscribed(&self) {
        let mut slot = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            let displayed = self.displayed.clone();
            *slot = Some(self.backend.subscribe(Box::new(move |count: u64| {
                displayed.send_replace(count);
            })));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{MemoryLocalStore, MemoryRemoteStore};
    use std::time::Duration;

    #[tokio::test]
    async fn test_local_counter_starts_at_default() {
        let counter = LocalCounter::new(Arc::new(MemoryLocalStore::new()));
        assert_eq!(counter.current().await.unwrap(), INITIAL_COUNT);
        assert_eq!(counter.increment().await.unwrap(), INITIAL_COUNT + 1);
    }

    #[tokio::test]
    async fn test_local_counter_rejects_garbage() {
        let local = MemoryLocalStore::new();
        local.set(COUNTER_KEY, "nhiều").await.unwrap();
        let counter = LocalCounter::new(Arc::new(local));
        assert!(matches!(
            counter.increment().await.unwrap_err(),
            StoreError::InvalidCounter(_)
        ));
    }

    #[tokio::test]
    async fn test_mount_twice_increments_once() {
        let backend = Arc::new(LocalCounter::new(Arc::new(MemoryLocalStore::new())));
        let view = VisitorCounter::new(backend.clone());

        assert_eq!(view.mount().await.unwrap(), 1001);
        assert_eq!(view.mount().await.unwrap(), 1001);
        assert_eq!(backend.current().await.unwrap(), 1001);
    }

    #[tokio::test]
    async fn test_remote_counter_reset_and_watch() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let backend: Arc<dyn CounterBackend> = Arc::new(RemoteCounter::new(remote));
        let view = VisitorCounter::new(backend.clone());
        let mut rx = view.watch();

        assert_eq!(view.mount().await.unwrap(), 1);

        // 另一个客户端记了一次访问
        backend.increment().await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|c| *c == 2))
            .await
            .unwrap()
            .unwrap();

        view.reset().await.unwrap();
        assert_eq!(backend.current().await.unwrap(), 0);
        assert_eq!(view.count(), 0);
    }
}
