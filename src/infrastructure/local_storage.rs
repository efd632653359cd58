//! 本地（同源）键值存储
//!
//! 对应浏览器的 localStorage：`get` / `set` / `remove` 加一个跨"标签页"的变更通知。
//! 同一个存储的多个句柄（clone）共享同一条通知通道；不同进程之间没有通知，只能靠轮询。

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

const EVENT_CAPACITY: usize = 64;

/// 变更通知，只携带发生变化的键
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
}

/// 本地键值存储能力
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    async fn remove(&self, key: &str) -> StoreResult<()>;
    /// 订阅变更通知
    fn watch(&self) -> broadcast::Receiver<StorageEvent>;
}

// ========== 内存实现 ==========

/// 进程内存中的本地存储，clone 出来的句柄相当于同源的不同标签页
#[derive(Clone)]
pub struct MemoryLocalStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    events: broadcast::Sender<StorageEvent>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    fn notify(&self, key: &str) {
        // 没有订阅者时发送失败是正常的
        let _ = self.events.send(StorageEvent {
            key: key.to_string(),
        });
    }
}

impl Default for MemoryLocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.insert(key.to_string(), value.to_string());
        }
        self.notify(key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let removed = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.remove(key).is_some()
        };
        if removed {
            self.notify(key);
        }
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}

// ========== 文件实现 ==========

/// 目录中每个键一个文件的本地存储
///
/// 写入先写临时文件再改名，轮询方不会读到写了一半的内容。
#[derive(Clone)]
pub struct FileLocalStore {
    dir: Arc<PathBuf>,
    events: broadcast::Sender<StorageEvent>,
}

impl FileLocalStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            dir: Arc::new(dir.as_ref().to_path_buf()),
            events,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }

    fn io_error(key: &str, source: std::io::Error) -> StoreError {
        StoreError::LocalIo {
            key: key.to_string(),
            source,
        }
    }
}

#[async_trait]
impl LocalStore for FileLocalStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        fs::create_dir_all(self.dir.as_path())
            .await
            .map_err(|e| Self::io_error(key, e))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .await
            .map_err(|e| Self::io_error(key, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| Self::io_error(key, e))?;

        debug!("💾 已写入本地存储: {} ({} 字节)", key, value.len());
        let _ = self.events.send(StorageEvent {
            key: key.to_string(),
        });
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => {
                let _ = self.events.send(StorageEvent {
                    key: key.to_string(),
                });
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    fn watch(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
