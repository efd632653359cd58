//! 基础设施层
//!
//! 持有存储资源，只暴露能力：
//! - `LocalStore` - 同源键值存储（浏览器 localStorage 的对应物）
//! - `RemoteCollectionStore` - 带实时订阅的文档集合存储
//! - `Subscription` - 订阅句柄，drop 即取消

pub mod local_storage;
pub mod remote_store;
pub mod subscription;

pub use local_storage::{FileLocalStore, LocalStore, MemoryLocalStore, StorageEvent};
pub use remote_store::{
    Direction, Document, Fields, MemoryRemoteStore, Query, RemoteCollectionStore,
};
pub use subscription::Subscription;
