//! 问答板 - 流程层
//!
//! 核心职责：把"学生提问 / 管理员回复 / 删除"组织成界面可直接使用的操作
//!
//! - 不关心底层是哪种同步策略，只依赖 `QuestionStore`
//! - 提交可以放到后台执行（`submit_detached`），失败通过通道异步告知调用方
//! - 提供界面上的统计：待回复数量、按用户过滤

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{AppError, AppResult, StoreError};
use crate::infrastructure::Subscription;
use crate::models::{Question, User};
use crate::store::{QuestionStore, SnapshotCallback};

/// 后台提交失败的通知
#[derive(Debug)]
pub struct SubmitFailure {
    pub user_id: String,
    pub content: String,
    pub error: StoreError,
}

pub struct QuestionBoard {
    store: Arc<dyn QuestionStore>,
    failures_tx: mpsc::UnboundedSender<SubmitFailure>,
    failures_rx: Mutex<Option<mpsc::UnboundedReceiver<SubmitFailure>>>,
}

impl QuestionBoard {
    pub fn new(store: Arc<dyn QuestionStore>) -> Self {
        let (failures_tx, failures_rx) = mpsc::unbounded_channel();
        Self {
            store,
            failures_tx,
            failures_rx: Mutex::new(Some(failures_rx)),
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.store.strategy_name()
    }

    /// 取走后台提交失败的通知通道（只能取一次）
    pub fn take_failures(&self) -> Option<mpsc::UnboundedReceiver<SubmitFailure>> {
        self.failures_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// 提交问题并等待写入完成
    pub async fn submit(&self, user: &User, content: &str) -> AppResult<Question> {
        let content = validate_content(content)?;
        let question = self
            .store
            .submit(&user.username, &user.name, content)
            .await?;
        info!("📝 {} 提交了问题 {}", user.name, question.id);
        Ok(question)
    }

    /// 后台提交，不等待写入完成
    ///
    /// 本地策略下新问题在任务内立即出现在列表中；失败时发送到 `take_failures` 的通道。
    pub fn submit_detached(&self, user: &User, content: &str) -> AppResult<JoinHandle<()>> {
        let content = validate_content(content)?.to_string();
        let store = self.store.clone();
        let failures = self.failures_tx.clone();
        let user_id = user.username.clone();
        let username = user.name.clone();

        Ok(tokio::spawn(async move {
            if let Err(error) = store.submit(&user_id, &username, &content).await {
                warn!("⚠️ 后台提交问题失败: {}", error);
                let _ = failures.send(SubmitFailure {
                    user_id,
                    content,
                    error,
                });
            }
        }))
    }

    /// 管理员回复
    pub async fn reply(&self, admin: &User, question_id: &str, answer: &str) -> AppResult<()> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(AppError::Validation(
                "Vui lòng nhập câu trả lời".to_string(),
            ));
        }
        self.store.reply(question_id, &admin.name, answer).await?;
        info!("💬 {} 回复了问题 {}", admin.name, question_id);
        Ok(())
    }

    pub async fn remove(&self, question_id: &str) -> AppResult<()> {
        self.store.remove(question_id).await?;
        info!("🗑️ 已删除问题 {}", question_id);
        Ok(())
    }

    /// 全部问题（最新在前）
    pub fn questions(&self) -> Vec<Question> {
        self.store.snapshot()
    }

    /// 某个用户自己的问题
    pub fn questions_by_user(&self, user_id: &str) -> Vec<Question> {
        self.store
            .snapshot()
            .into_iter()
            .filter(|q| q.user_id == user_id)
            .collect()
    }

    /// 待回复数量；传入用户时只统计该用户的
    pub fn pending_count(&self, user_id: Option<&str>) -> usize {
        self.store
            .snapshot()
            .iter()
            .filter(|q| q.is_pending())
            .filter(|q| user_id.map_or(true, |id| q.user_id == id))
            .count()
    }

    pub fn subscribe(&self, callback: SnapshotCallback) -> Subscription {
        self.store.subscribe(callback)
    }
}

fn validate_content(content: &str) -> AppResult<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Vui lòng nhập câu hỏi".to_string()));
    }
    Ok(trimmed)
}
