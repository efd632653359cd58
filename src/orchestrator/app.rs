//! 应用编排 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：按配置选定同步策略（只选一次），组装存储、计数器和会话
//! 2. **资源所有者**：唯一持有本地存储、远程存储和 AI 客户端的模块
//! 3. **命令分发**：把命令行子命令交给对应的服务或流程
//!
//! 不做具体业务判断，只负责调度和输出。

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::clients::{GeminiClient, TextGenerator};
use crate::config::{Config, SyncStrategy};
use crate::error::AiError;
use crate::infrastructure::{FileLocalStore, LocalStore, MemoryRemoteStore, RemoteCollectionStore};
use crate::models::{Question, User};
use crate::orchestrator::command::{BoardAction, Command};
use crate::services::{
    ConceptService, CounterBackend, LocalCounter, MindmapService, PracticeService, QaService,
    RemoteCounter, SessionService, VisitorCounter,
};
use crate::store::{InMemoryStore, LocalPollingStore, QuestionStore, RemoteSubscriptionStore};
use crate::utils::logging::log_startup;
use crate::workflow::QuestionBoard;

/// 应用主结构
pub struct App {
    config: Config,
    board: QuestionBoard,
    counter: Arc<dyn CounterBackend>,
    session: SessionService,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let local: Arc<dyn LocalStore> = Arc::new(FileLocalStore::new(&config.data_dir));

        let (store, counter) = build_store(&config, local.clone()).await?;
        info!("✓ 问答存储就绪: {}", store.strategy_name());

        let session = SessionService::new(counter.clone(), local);
        if let Some(user) = session.restore().await.context("读取登录信息失败")? {
            info!("👤 当前用户: {}", user.name);
        }

        let generator: Option<Arc<dyn TextGenerator>> = match GeminiClient::new(&config) {
            Ok(client) => {
                info!("✓ Gemini 客户端就绪: {}", client.model_name());
                Some(Arc::new(client))
            }
            Err(AiError::Configuration(e)) => {
                warn!("⚠️ {}", e);
                None
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            config,
            board: QuestionBoard::new(store),
            counter,
            session,
            generator,
        })
    }

    /// 替换 AI 生成器
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn board(&self) -> &QuestionBoard {
        &self.board
    }

    /// 运行一条命令
    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Ask { question } => {
                let answer = QaService::new(self.generator()?).ask(&question).await?;
                println!("{}", answer);
            }
            Command::Mindmap { topic } => {
                let service = MindmapService::new(
                    self.generator()?,
                    Duration::from_millis(self.config.courtesy_delay_ms),
                );
                let mindmap = service.generate(&topic).await?;
                print!("{}", mindmap.render_outline());
            }
            Command::Practice { show_answers } => {
                let questions = PracticeService::new(self.generator()?).generate().await?;
                for q in &questions {
                    println!("{}. [{:?}] {}", q.id, q.kind, q.question);
                    for option in &q.options {
                        println!("   {}", option);
                    }
                    if show_answers {
                        println!("   → {:?}", q.answer);
                    }
                }
            }
            Command::Concept { name: None } => {
                for label in ConceptService::concepts() {
                    println!("- {}", label);
                }
            }
            Command::Concept { name: Some(name) } => {
                let example = ConceptService::new(self.generator()?)
                    .generate_example(&name)
                    .await?;
                println!("{}", example);
            }
            Command::Login { username, password } => {
                match self.session.login(&username, &password).await? {
                    Some(user) => println!("Xin chào, {}!", user.name),
                    None => bail!("Tên đăng nhập hoặc mật khẩu không đúng"),
                }
            }
            Command::Logout => {
                self.session.logout().await?;
                println!("Đã đăng xuất");
            }
            Command::Whoami => match self.session.current_user() {
                Some(user) => println!("{} ({}, {:?})", user.name, user.username, user.role),
                None => println!("Chưa đăng nhập"),
            },
            Command::Board { action } => self.run_board(action).await?,
            Command::Visit => {
                let view = VisitorCounter::new(self.counter.clone());
                let count = view.mount().await?;
                println!("Lượt truy cập: {}", count);
            }
            Command::ResetCounter => {
                self.require_admin()?;
                VisitorCounter::new(self.counter.clone()).reset().await?;
                println!("Đã đặt lại bộ đếm truy cập");
            }
        }
        Ok(())
    }

    async fn run_board(&self, action: BoardAction) -> Result<()> {
        match action {
            BoardAction::List { mine } => {
                let questions = if mine {
                    let user = self.require_user()?;
                    self.board.questions_by_user(&user.username)
                } else {
                    self.board.questions()
                };
                let pending = match (mine, self.session.current_user()) {
                    (true, Some(user)) => self.board.pending_count(Some(&user.username)),
                    _ => self.board.pending_count(None),
                };
                println!("Tổng: {} câu hỏi, {} chờ trả lời", questions.len(), pending);
                for q in &questions {
                    println!("{}", q);
                }
            }
            BoardAction::Submit { content } => {
                let user = self.require_user()?;
                let question = self.board.submit(&user, &content).await?;
                println!("Đã gửi câu hỏi {}", question.id);
            }
            BoardAction::Reply { id, answer } => {
                let admin = self.require_admin()?;
                self.board.reply(&admin, &id, &answer).await?;
                println!("Đã trả lời câu hỏi {}", id);
            }
            BoardAction::Remove { id } => {
                let user = self.require_user()?;
                let owns = self
                    .board
                    .questions()
                    .iter()
                    .any(|q| q.id == id && q.user_id == user.username);
                if !user.is_admin() && !owns {
                    bail!("Chỉ quản trị viên hoặc người hỏi mới được xóa câu hỏi này");
                }
                self.board.remove(&id).await?;
                println!("Đã xóa câu hỏi {}", id);
            }
            BoardAction::Watch => {
                info!("👀 正在监听问答列表变化，按 Ctrl-C 退出");
                let _subscription = self.board.subscribe(Box::new(|list: &[Question]| {
                    println!("--- {} câu hỏi ---", list.len());
                    for q in list {
                        println!("{}", q);
                    }
                }));
                tokio::signal::ctrl_c()
                    .await
                    .context("等待 Ctrl-C 失败")?;
            }
        }
        Ok(())
    }

    fn generator(&self) -> Result<Arc<dyn TextGenerator>> {
        match &self.generator {
            Some(generator) => Ok(generator.clone()),
            None => {
                self.config.require_api_key()?;
                bail!("AI client unavailable")
            }
        }
    }

    fn require_user(&self) -> Result<User> {
        self.session
            .current_user()
            .context("Vui lòng đăng nhập trước")
    }

    fn require_admin(&self) -> Result<User> {
        let user = self.require_user()?;
        if !user.is_admin() {
            bail!("Chức năng này chỉ dành cho quản trị viên");
        }
        Ok(user)
    }
}

/// 按配置选定同步策略，返回问答存储和对应的计数器后端
async fn build_store(
    config: &Config,
    local: Arc<dyn LocalStore>,
) -> Result<(Arc<dyn QuestionStore>, Arc<dyn CounterBackend>)> {
    match config.sync_strategy {
        SyncStrategy::LocalPolling => {
            let store: Arc<dyn QuestionStore> = Arc::new(
                LocalPollingStore::start(
                    local.clone(),
                    Duration::from_millis(config.poll_interval_ms),
                )
                .await
                .context("启动本地轮询存储失败")?,
            );
            let counter: Arc<dyn CounterBackend> = Arc::new(LocalCounter::new(local));
            Ok((store, counter))
        }
        SyncStrategy::Remote => {
            let remote: Arc<dyn RemoteCollectionStore> = Arc::new(MemoryRemoteStore::new());
            let store: Arc<dyn QuestionStore> =
                Arc::new(RemoteSubscriptionStore::connect(remote.clone()).await);
            let counter: Arc<dyn CounterBackend> = Arc::new(RemoteCounter::new(remote));
            Ok((store, counter))
        }
        SyncStrategy::InMemory => {
            let store: Arc<dyn QuestionStore> = Arc::new(
                InMemoryStore::with_backup(local.clone())
                    .await
                    .context("载入内存问答存储失败")?,
            );
            let counter: Arc<dyn CounterBackend> = Arc::new(LocalCounter::new(local));
            Ok((store, counter))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str, strategy: SyncStrategy) -> Config {
        Config {
            gemini_api_key: None,
            sync_strategy: strategy,
            courtesy_delay_ms: 0,
            data_dir: std::env::temp_dir().join(format!(
                "mln_study_hub_app_{}_{}_{}",
                name,
                std::process::id(),
                chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
            )),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_ai_command_without_key_reports_configuration() {
        let config = temp_config("no_key", SyncStrategy::InMemory);
        let dir = config.data_dir.clone();
        let app = App::initialize(config).await.unwrap();

        let err = app
            .run(Command::Ask {
                question: "Giai cấp là gì?".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_board_flow_requires_login() {
        let config = temp_config("board", SyncStrategy::LocalPolling);
        let dir = config.data_dir.clone();
        let app = App::initialize(config).await.unwrap();

        let submit = Command::Board {
            action: BoardAction::Submit {
                content: "Thị tộc là gì?".to_string(),
            },
        };
        assert!(app.run(submit.clone()).await.is_err());

        app.run(Command::Login {
            username: "user1".to_string(),
            password: "123456".to_string(),
        })
        .await
        .unwrap();
        app.run(submit).await.unwrap();

        let questions = app.board().questions();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].username, "Nguyễn Văn A");

        // 普通用户不能回复
        let reply = Command::Board {
            action: BoardAction::Reply {
                id: questions[0].id.clone(),
                answer: "x".to_string(),
            },
        };
        assert!(app.run(reply).await.is_err());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_remote_strategy_initializes() {
        let config = temp_config("remote", SyncStrategy::Remote);
        let dir = config.data_dir.clone();
        let app = App::initialize(config).await.unwrap();
        assert_eq!(app.board().strategy_name(), "remote");
        app.run(Command::Visit).await.unwrap();

        let _ = std::fs::remove_dir_all(dir);
    }
}
