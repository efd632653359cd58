//! # MLN Study Hub
//!
//! 《马列主义哲学：阶级与民族》课程学习助手的核心库
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有存储资源，只暴露能力
//! - `LocalStore` - 同源键值存储 + 变更通知
//! - `RemoteCollectionStore` - 带实时订阅的文档集合
//!
//! ### ② 业务能力层（Services / Store / Clients）
//! - `clients/` - Gemini `generateContent` 客户端
//! - `services/` - 问答、思维导图、练习题、概念示例、模拟登录、访客计数
//! - `store/` - 问答列表的三种同步策略，统一在 `QuestionStore` 之后
//!
//! ### ③ 流程层（Workflow）
//! - `QuestionBoard` - 提问 / 回复 / 删除与统计
//! - `RequestSlot` - AI 请求的 loading / error / data 状态机
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 启动时选定策略，分发命令

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod store;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{GeminiClient, GenerationConfig, TextGenerator};
pub use config::{Config, SyncStrategy};
pub use error::{AiError, AppError, AppResult, StoreError};
pub use models::{MindmapResponse, PracticeQuestion, Question, User};
pub use orchestrator::App;
pub use store::QuestionStore;
pub use workflow::{QuestionBoard, RequestSlot};
