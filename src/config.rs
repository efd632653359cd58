use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// API key 的环境变量名（兼容前端构建时的变量名）
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "VITE_GEMINI_API_KEY"];

/// 问答列表的同步策略，启动时选定一次
///
/// 环境变量和 TOML 文件都经过 `FromStr`，接受同一组取值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum SyncStrategy {
    /// 本地存储 + 定时轮询 + 同源变更通知
    LocalPolling,
    /// 远程集合的实时订阅
    Remote,
    /// 仅当前进程内存，不做跨客户端同步
    InMemory,
}

impl TryFrom<String> for SyncStrategy {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for SyncStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local-polling" | "local" => Ok(SyncStrategy::LocalPolling),
            "remote" => Ok(SyncStrategy::Remote),
            "in-memory" | "memory" => Ok(SyncStrategy::InMemory),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- Gemini 配置 ---
    pub gemini_api_key: Option<String>,
    pub gemini_api_base_url: String,
    pub gemini_model_name: String,
    /// 思维导图请求前的固定等待（毫秒），用于客户端限流
    pub courtesy_delay_ms: u64,
    // --- 同步配置 ---
    pub sync_strategy: SyncStrategy,
    /// 轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 本地存储目录
    pub data_dir: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_model_name: "gemini-2.5-flash-lite".to_string(),
            courtesy_delay_ms: 1000,
            sync_strategy: SyncStrategy::LocalPolling,
            poll_interval_ms: 2000,
            data_dir: PathBuf::from("data"),
            verbose_logging: false,
        }
    }
}

/// TOML 配置文件，所有字段可选，缺省取默认值
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    gemini_api_key: Option<String>,
    gemini_api_base_url: Option<String>,
    gemini_model_name: Option<String>,
    courtesy_delay_ms: Option<u64>,
    sync_strategy: Option<SyncStrategy>,
    poll_interval_ms: Option<u64>,
    data_dir: Option<PathBuf>,
    verbose_logging: Option<bool>,
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// 默认值 + TOML 文件
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::FileReadFailed {
                path: path.display().to_string(),
                source,
            }
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    fn from_toml_str(content: &str, path: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
                path: path.to_string(),
                source,
            })?;

        let default = Self::default();
        Ok(Self {
            gemini_api_key: file.gemini_api_key.or(default.gemini_api_key),
            gemini_api_base_url: file
                .gemini_api_base_url
                .unwrap_or(default.gemini_api_base_url),
            gemini_model_name: file.gemini_model_name.unwrap_or(default.gemini_model_name),
            courtesy_delay_ms: file.courtesy_delay_ms.unwrap_or(default.courtesy_delay_ms),
            sync_strategy: file.sync_strategy.unwrap_or(default.sync_strategy),
            poll_interval_ms: file.poll_interval_ms.unwrap_or(default.poll_interval_ms),
            data_dir: file.data_dir.unwrap_or(default.data_dir),
            verbose_logging: file.verbose_logging.unwrap_or(default.verbose_logging),
        })
    }

    /// 加载配置：有文件先读文件，再由环境变量覆盖
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(p) => Self::from_toml_file(p)?,
            None => Self::default(),
        };
        base.with_env_overrides()
    }

    /// 用环境变量覆盖当前配置
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(key) = API_KEY_VARS
            .iter()
            .find_map(|name| std::env::var(name).ok())
            .filter(|k| !k.trim().is_empty())
        {
            self.gemini_api_key = Some(key);
        }
        if let Ok(v) = std::env::var("GEMINI_API_BASE_URL") {
            self.gemini_api_base_url = v;
        }
        if let Ok(v) = std::env::var("GEMINI_MODEL_NAME") {
            self.gemini_model_name = v;
        }
        if let Ok(v) = std::env::var("SYNC_STRATEGY") {
            self.sync_strategy = v.parse()?;
        }
        if let Ok(v) = std::env::var("DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        self.courtesy_delay_ms = parse_env("COURTESY_DELAY_MS", "u64", self.courtesy_delay_ms)?;
        self.poll_interval_ms = parse_env("POLL_INTERVAL_MS", "u64", self.poll_interval_ms)?;
        self.verbose_logging = parse_env("VERBOSE_LOGGING", "bool", self.verbose_logging)?;
        Ok(self)
    }

    /// 取 API key，缺失时返回配置错误（不是 panic）
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.gemini_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey {
                var_name: API_KEY_VARS[0].to_string(),
            })
    }
}

fn parse_env<T: FromStr>(
    var_name: &str,
    expected_type: &str,
    default: T,
) -> Result<T, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse() {
        assert_eq!("remote".parse::<SyncStrategy>().unwrap(), SyncStrategy::Remote);
        assert_eq!(
            "Local-Polling".parse::<SyncStrategy>().unwrap(),
            SyncStrategy::LocalPolling
        );
        assert!(matches!(
            "firebase".parse::<SyncStrategy>(),
            Err(ConfigError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config = Config::from_toml_str(
            r#"
            gemini_api_key = "abc"
            sync_strategy = "in-memory"
            poll_interval_ms = 500
            "#,
            "test.toml",
        )
        .unwrap();

        assert_eq!(config.gemini_api_key.as_deref(), Some("abc"));
        assert_eq!(config.sync_strategy, SyncStrategy::InMemory);
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.gemini_model_name, "gemini-2.5-flash-lite");
    }

    #[test]
    fn test_toml_accepts_env_aliases() {
        for (raw, expected) in [
            ("local", SyncStrategy::LocalPolling),
            ("memory", SyncStrategy::InMemory),
            ("Remote", SyncStrategy::Remote),
        ] {
            let config =
                Config::from_toml_str(&format!("sync_strategy = \"{}\"", raw), "alias.toml")
                    .unwrap();
            assert_eq!(config.sync_strategy, expected);
        }

        let result = Config::from_toml_str("sync_strategy = \"firebase\"", "bad.toml");
        assert!(matches!(result, Err(ConfigError::TomlParseFailed { .. })));
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let result = Config::from_toml_str("poll_interval_ms = \"soon\"", "bad.toml");
        assert!(matches!(result, Err(ConfigError::TomlParseFailed { .. })));
    }

    #[test]
    fn test_missing_api_key() {
        let config = Config::default();
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingApiKey { .. })
        ));

        let config = Config {
            gemini_api_key: Some("  ".to_string()),
            ..Config::default()
        };
        assert!(config.require_api_key().is_err());
    }
}
