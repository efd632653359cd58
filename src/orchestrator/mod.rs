//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用
//! - 启动时按配置选定问答同步策略（本地轮询 / 远程订阅 / 内存）
//! - 组装计数器后端、会话和 AI 客户端
//! - 把命令分发给服务层或流程层
//!
//! ### `command` - 命令行子命令定义
//!
//! ## 层次关系
//!
//! ```text
//! app (处理一条命令)
//!     ↓
//! workflow (QuestionBoard / RequestSlot)
//!     ↓
//! services (能力层：问答 / 思维导图 / 练习 / 概念 / 会话 / 计数)
//!     ↓
//! store + clients (问答复制存储、Gemini 客户端)
//!     ↓
//! infrastructure (本地存储、远程集合存储)
//! ```

pub mod app;
pub mod command;

pub use app::App;
pub use command::{BoardAction, Command};
