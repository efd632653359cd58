//! 请求状态槽
//!
//! 每个 AI 功能持有一个槽：`loading` 标志、最近一次错误、最近一次成功结果。
//! 状态迁移：`Idle → Loading → {Success, Error}`，任意状态下发起新请求都会立即回到
//! `Loading` 并清空旧结果，避免新请求进行中时还显示旧数据。
//!
//! 每次 `begin` 都会发一张递增的票据；`finish` 时票据不是最新的就丢弃结果，
//! 这样被新请求取代的慢响应不会覆盖界面。

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::debug;

use crate::error::AiResult;

/// 对外可见的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Idle,
    Loading,
    Success,
    Error,
}

/// 槽中的三个字段
#[derive(Debug, Clone, PartialEq)]
pub struct RequestState<T> {
    pub loading: bool,
    pub error: Option<String>,
    pub data: Option<T>,
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self {
            loading: false,
            error: None,
            data: None,
        }
    }
}

impl<T> RequestState<T> {
    pub fn phase(&self) -> RequestPhase {
        if self.loading {
            RequestPhase::Loading
        } else if self.error.is_some() {
            RequestPhase::Error
        } else if self.data.is_some() {
            RequestPhase::Success
        } else {
            RequestPhase::Idle
        }
    }
}

/// 一次请求的票据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

/// 请求状态槽
pub struct RequestSlot<T> {
    state: watch::Sender<RequestState<T>>,
    latest: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> RequestSlot<T> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(RequestState::default());
        Self {
            state,
            latest: AtomicU64::new(0),
        }
    }

    /// 进入 `Loading`：清空旧结果和旧错误
    pub fn begin(&self) -> RequestTicket {
        let ticket = RequestTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1);
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
            s.data = None;
        });
        ticket
    }

    /// 写入结果；票据已过期时忽略并返回 false
    pub fn finish(&self, ticket: RequestTicket, result: &AiResult<T>) -> bool {
        if self.latest.load(Ordering::SeqCst) != ticket.0 {
            debug!("丢弃过期的请求结果 (票据 #{})", ticket.0);
            return false;
        }
        self.state.send_modify(|s| {
            s.loading = false;
            match result {
                Ok(data) => {
                    s.data = Some(data.clone());
                    s.error = None;
                }
                Err(e) => {
                    s.data = None;
                    s.error = Some(e.to_string());
                }
            }
        });
        true
    }

    /// 把一次异步请求包进 begin / finish
    pub async fn track<F>(&self, request: F) -> AiResult<T>
    where
        F: Future<Output = AiResult<T>>,
    {
        let ticket = self.begin();
        let result = request.await;
        self.finish(ticket, &result);
        result
    }

    /// 回到 `Idle`；进行中的请求结果会被丢弃
    pub fn clear(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(RequestState::default());
    }

    /// 当前状态的快照
    pub fn state(&self) -> RequestState<T> {
        self.state.borrow().clone()
    }

    /// 订阅状态变化
    pub fn watch(&self) -> watch::Receiver<RequestState<T>> {
        self.state.subscribe()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for RequestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
