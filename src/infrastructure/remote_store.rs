//! 远程文档集合存储
//!
//! 文档数据库的最小能力面：按集合增删改、按字段排序的实时查询订阅、
//! 单文档读写和字段原子自增。问答列表的远程同步策略和远程计数器都只依赖这个 trait。
//!
//! `MemoryRemoteStore` 是进程内实现：所有写入在同一把锁下提交，提交后立即向
//! 相关查询的订阅者推送新的完整快照。

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// 文档字段
pub type Fields = Map<String, Value>;

const AUTO_ID_LEN: usize = 20;

/// 一条远程文档
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// 把文档 id 并入字段后反序列化为记录
    pub fn to_record<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields))
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(Value::as_i64)
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// 集合查询
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub collection: String,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            order_by: None,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }
}

/// 远程集合存储能力
#[async_trait]
pub trait RemoteCollectionStore: Send + Sync {
    /// 新增记录，返回存储分配的 id
    async fn add_record(&self, collection: &str, fields: Fields) -> StoreResult<String>;

    /// 合并更新字段；记录不存在时返回 `Ok(false)`
    async fn update_record(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<bool>;

    /// 删除记录；记录不存在时什么也不做
    async fn delete_record(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// 实时查询：先推送一次当前快照，之后每次相关提交都推送完整快照
    fn subscribe(&self, query: Query) -> BoxStream<'static, Vec<Document>>;

    /// 字段原子自增（文档或字段不存在时从 0 开始），返回自增后的值
    async fn atomic_increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> StoreResult<i64>;

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// 整体覆盖写入（不存在则创建）
    async fn set_document(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()>;
}

// ========== 进程内实现 ==========

struct Subscriber {
    query: Query,
    sender: mpsc::UnboundedSender<Vec<Document>>,
}

#[derive(Default)]
struct RemoteState {
    collections: HashMap<String, Vec<Document>>,
    subscribers: Vec<Subscriber>,
}

impl RemoteState {
    fn snapshot(&self, query: &Query) -> Vec<Document> {
        let mut docs = self
            .collections
            .get(&query.collection)
            .cloned()
            .unwrap_or_default();

        if let Some((field, direction)) = &query.order_by {
            // 稳定排序：相同排序值保持插入顺序
            docs.sort_by(|a, b| {
                let ord = compare_field(a.fields.get(field), b.fields.get(field));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        docs
    }

    /// 提交后通知订阅了该集合的查询；接收端已关闭的订阅顺便清理掉
    fn notify(&mut self, collection: &str) {
        let snapshots: Vec<Option<Vec<Document>>> = self
            .subscribers
            .iter()
            .map(|s| (s.query.collection == collection).then(|| self.snapshot(&s.query)))
            .collect();

        let mut index = 0;
        self.subscribers.retain(|subscriber| {
            let keep = match &snapshots[index] {
                Some(docs) => subscriber.sender.send(docs.clone()).is_ok(),
                None => !subscriber.sender.is_closed(),
            };
            index += 1;
            keep
        });
    }
}

fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// 进程内文档存储
#[derive(Clone, Default)]
pub struct MemoryRemoteStore {
    state: Arc<Mutex<RemoteState>>,
    offline: Arc<AtomicBool>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟断网：之后的写操作全部失败，直到恢复
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    fn ensure_online(&self, operation: &str) -> StoreResult<()> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            warn!("⚠️ 远程存储不可用，{} 失败", operation);
            return Err(StoreError::Remote {
                operation: operation.to_string(),
                message: "unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn auto_id() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(AUTO_ID_LEN)
            .map(char::from)
            .collect()
    }
}

#[async_trait]
impl RemoteCollectionStore for MemoryRemoteStore {
    async fn add_record(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        self.ensure_online("add")?;
        let id = Self::auto_id();

        let mut state = self.lock();
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        state.notify(collection);

        debug!("☁️ 新增文档 {}/{}", collection, id);
        Ok(id)
    }

    async fn update_record(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<bool> {
        self.ensure_online("update")?;

        let mut state = self.lock();
        let Some(doc) = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
        else {
            return Ok(false);
        };
        doc.fields.extend(fields);
        state.notify(collection);
        Ok(true)
    }

    async fn delete_record(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.ensure_online("delete")?;

        let mut state = self.lock();
        let removed = match state.collections.get_mut(collection) {
            Some(docs) => {
                let before = docs.len();
                docs.retain(|d| d.id != id);
                docs.len() != before
            }
            None => false,
        };
        if removed {
            state.notify(collection);
        }
        Ok(())
    }

    fn subscribe(&self, query: Query) -> BoxStream<'static, Vec<Document>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        {
            let mut state = self.lock();
            let _ = sender.send(state.snapshot(&query));
            state.subscribers.push(Subscriber { query, sender });
        }

        stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|docs| (docs, receiver))
        })
        .boxed()
    }

    async fn atomic_increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> StoreResult<i64> {
        self.ensure_online("increment")?;

        let mut state = self.lock();
        let docs = state.collections.entry(collection.to_string()).or_default();
        let index = match docs.iter().position(|d| d.id == id) {
            Some(index) => index,
            None => {
                docs.push(Document {
                    id: id.to_string(),
                    fields: Fields::new(),
                });
                docs.len() - 1
            }
        };

        let doc = &mut docs[index];
        let next = doc.get_i64(field).unwrap_or(0) + by;
        doc.fields.insert(field.to_string(), Value::from(next));
        state.notify(collection);
        Ok(next)
    }

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let state = self.lock();
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn set_document(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        self.ensure_online("set")?;

        let mut state = self.lock();
        let docs = state.collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == id) {
            Some(doc) => doc.fields = fields,
            None => docs.push(Document {
                id: id.to_string(),
                fields,
            }),
        }
        state.notify(collection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_subscription_receives_ordered_snapshots() {
        let store = MemoryRemoteStore::new();
        let mut feed = store.subscribe(
            Query::collection("questions").order_by("timestamp", Direction::Descending),
        );
        assert!(feed.next().await.unwrap().is_empty());

        store
            .add_record("questions", fields(json!({"timestamp": "2025-01-01T00:00:00.000Z"})))
            .await
            .unwrap();
        store
            .add_record("questions", fields(json!({"timestamp": "2025-01-02T00:00:00.000Z"})))
            .await
            .unwrap();

        let _first = feed.next().await.unwrap();
        let second = feed.next().await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(
            second[0].fields["timestamp"],
            json!("2025-01-02T00:00:00.000Z")
        );
    }

    #[tokio::test]
    async fn test_update_missing_record_reports_false() {
        let store = MemoryRemoteStore::new();
        let updated = store
            .update_record("questions", "missing", fields(json!({"status": "replied"})))
            .await
            .unwrap();
        assert!(!updated);
        store.delete_record("questions", "missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_atomic_increment_creates_document() {
        let store = MemoryRemoteStore::new();
        let first = store
            .atomic_increment("settings", "visitor-counter", "count", 1)
            .await
            .unwrap();
        let second = store
            .atomic_increment("settings", "visitor-counter", "count", 1)
            .await
            .unwrap();
        assert_eq!((first, second), (1, 2));

        store
            .set_document("settings", "visitor-counter", fields(json!({"count": 0})))
            .await
            .unwrap();
        let doc = store
            .get_document("settings", "visitor-counter")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.get_i64("count"), Some(0));
    }

    #[tokio::test]
    async fn test_offline_writes_fail() {
        let store = MemoryRemoteStore::new();
        store.set_offline(true);
        let err = store
            .add_record("questions", Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Remote { .. }));
    }
}
