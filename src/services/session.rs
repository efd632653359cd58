//! 模拟登录 - 业务能力层
//!
//! 账号表是固定的，只用于界面区分"学生 / 管理员"，不是安全边界。
//! 登录成功后通过注入的计数器记一次访问，并把当前用户写入本地存储以便下次恢复。

use std::sync::{Arc, RwLock};
use tracing::{info, warn};

use crate::error::{AppResult, StoreError, StoreResult};
use crate::infrastructure::LocalStore;
use crate::models::{User, UserRole};
use crate::services::visitor_counter::CounterBackend;

/// 本地存储中当前用户所在的键
pub const CURRENT_USER_KEY: &str = "currentUser";

struct MockAccount {
    username: &'static str,
    password: &'static str,
    name: &'static str,
    role: UserRole,
}

const MOCK_ACCOUNTS: [MockAccount; 6] = [
    MockAccount {
        username: "admin",
        password: "admin123",
        name: "Quản trị viên",
        role: UserRole::Admin,
    },
    MockAccount {
        username: "user1",
        password: "123456",
        name: "Nguyễn Văn A",
        role: UserRole::User,
    },
    MockAccount {
        username: "user2",
        password: "123456",
        name: "Trần Thị B",
        role: UserRole::User,
    },
    MockAccount {
        username: "user3",
        password: "123456",
        name: "Lê Văn C",
        role: UserRole::User,
    },
    MockAccount {
        username: "user4",
        password: "123456",
        name: "Phạm Thị D",
        role: UserRole::User,
    },
    MockAccount {
        username: "user5",
        password: "123456",
        name: "Hoàng Văn E",
        role: UserRole::User,
    },
];

pub struct SessionService {
    counter: Arc<dyn CounterBackend>,
    local: Arc<dyn LocalStore>,
    current: RwLock<Option<User>>,
}

impl SessionService {
    pub fn new(counter: Arc<dyn CounterBackend>, local: Arc<dyn LocalStore>) -> Self {
        Self {
            counter,
            local,
            current: RwLock::new(None),
        }
    }

    /// 恢复上次登录的用户
    pub async fn restore(&self) -> StoreResult<Option<User>> {
        let user = match self.local.get(CURRENT_USER_KEY).await? {
            Some(raw) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("⚠️ 本地登录信息无法解析，忽略: {}", e);
                    None
                }
            },
            None => None,
        };
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = user.clone();
        Ok(user)
    }

    /// 登录；账号或密码不匹配时返回 `None`
    ///
    /// # 参数
    /// - `username`: 账号
    /// - `password`: 密码
    ///
    /// # 返回
    /// 匹配成功时返回用户；访问计数失败只记日志，不影响登录结果
    pub async fn login(&self, username: &str, password: &str) -> AppResult<Option<User>> {
        let Some(account) = MOCK_ACCOUNTS
            .iter()
            .find(|a| a.username == username && a.password == password)
        else {
            info!("🔒 登录失败: {}", username);
            return Ok(None);
        };

        let user = User {
            username: account.username.to_string(),
            name: account.name.to_string(),
            role: account.role,
        };
        self.local
            .set(
                CURRENT_USER_KEY,
                &serde_json::to_string(&user).map_err(StoreError::from)?,
            )
            .await?;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(user.clone());
        info!("🔓 {} 已登录", user.name);

        match self.counter.increment().await {
            Ok(count) => info!("👥 访客计数: {}", count),
            Err(e) => warn!("⚠️ 记录访问失败: {}", e),
        }

        Ok(Some(user))
    }

    pub async fn logout(&self) -> StoreResult<()> {
        self.local.remove(CURRENT_USER_KEY).await?;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }

    pub fn current_user(&self) -> Option<User> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
