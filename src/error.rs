//! 错误类型
//!
//! 面向用户的错误信息使用越南语（与站点语言一致），日志使用中文。
//! 记录不存在（回复/删除一个已被删除的问题）不是错误，不在这里建模。

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// AI 请求相关错误
    #[error(transparent)]
    Ai(#[from] AiError),
    /// 问答存储 / 计数器存储错误
    #[error(transparent)]
    Store(#[from] StoreError),
    /// 配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// 输入校验失败（请求发出之前）
    #[error("{0}")]
    Validation(String),
}

/// AI 请求错误
///
/// 每一种都会以可读信息的形式展示给发起操作的用户，不会自动重试。
#[derive(Debug, Error)]
pub enum AiError {
    /// 网络层失败，请求没有完成
    #[error("Không thể kết nối đến Gemini API. Vui lòng kiểm tra kết nối mạng của bạn.")]
    Connectivity {
        #[source]
        source: reqwest::Error,
    },
    /// 服务返回非 2xx 状态码
    #[error("{message} (HTTP {status})")]
    Service {
        status: u16,
        kind: ServiceErrorKind,
        message: String,
    },
    /// 请求成功但没有可用文本
    #[error("API không trả về kết quả. Vui lòng thử lại")]
    EmptyResult,
    /// 响应文本中的结构化数据无法提取
    #[error("Không thể phân tích phản hồi từ Gemini - JSON không hợp lệ: {0}")]
    Parse(#[from] ExtractError),
    /// 缺少凭据等配置问题
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    /// 模型明确表示问题超出课程范围
    #[error("{0}")]
    OutOfScope(String),
}

impl AiError {
    /// HTTP 状态码（仅 `Service` 有）
    pub fn status(&self) -> Option<u16> {
        match self {
            AiError::Service { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// 服务错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// 400
    MalformedRequest,
    /// 403
    Unauthorized,
    /// 429
    RateLimited,
    /// 500
    UpstreamFault,
    /// 其他状态码
    Other,
}

impl ServiceErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ServiceErrorKind::MalformedRequest,
            403 => ServiceErrorKind::Unauthorized,
            429 => ServiceErrorKind::RateLimited,
            500 => ServiceErrorKind::UpstreamFault,
            _ => ServiceErrorKind::Other,
        }
    }

    /// 分类对应的固定提示；`Other` 没有固定提示，由响应体决定
    pub fn message(self) -> Option<&'static str> {
        match self {
            ServiceErrorKind::MalformedRequest => {
                Some("API key không hợp lệ hoặc request không đúng định dạng")
            }
            ServiceErrorKind::Unauthorized => {
                Some("API key không có quyền truy cập. Vui lòng kiểm tra API key của bạn")
            }
            ServiceErrorKind::RateLimited => {
                Some("Đã vượt quá giới hạn request. Vui lòng thử lại sau")
            }
            ServiceErrorKind::UpstreamFault => Some("Lỗi server của Gemini. Vui lòng thử lại sau"),
            ServiceErrorKind::Other => None,
        }
    }
}

/// 结构化文本提取错误
#[derive(Debug, Error)]
pub enum ExtractError {
    /// 文本中根本没有目标括号
    #[error("không tìm thấy {shape} trong phản hồi")]
    NotFound { shape: &'static str },
    /// 找到了候选片段，但不是合法 JSON
    #[error("JSON không hợp lệ: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
    /// JSON 合法，但结构与期望类型不符
    #[error("cấu trúc JSON không đúng: {source}")]
    UnexpectedShape {
        #[source]
        source: serde_json::Error,
    },
    /// 内容校验后没有剩下可用的数据
    #[error("{0}")]
    NoUsableItems(String),
}

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 本地存储读写失败
    #[error("Lỗi lưu trữ cục bộ ({key}): {source}")]
    LocalIo {
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// 记录序列化 / 反序列化失败
    #[error("Lỗi đọc dữ liệu: {0}")]
    Serialization(#[from] serde_json::Error),
    /// 远程集合存储拒绝了操作
    #[error("Lỗi cơ sở dữ liệu ({operation}): {message}")]
    Remote { operation: String, message: String },
    /// 计数器中存的不是整数
    #[error("Giá trị bộ đếm không hợp lệ: {0}")]
    InvalidCounter(String),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 未配置 API key
    #[error("{var_name} không được cấu hình trong .env")]
    MissingApiKey { var_name: String },
    /// 环境变量解析失败
    #[error("Biến môi trường {var_name} không hợp lệ: '{value}' không phải {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件读取失败
    #[error("Không đọc được tệp cấu hình {path}: {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("Tệp cấu hình {path} không hợp lệ: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 未知的同步策略
    #[error("Chiến lược đồng bộ không hợp lệ: {0}")]
    UnknownStrategy(String),
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// AI 请求结果类型
pub type AiResult<T> = Result<T, AiError>;

/// 存储结果类型
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_kind_from_status() {
        assert_eq!(ServiceErrorKind::from_status(400), ServiceErrorKind::MalformedRequest);
        assert_eq!(ServiceErrorKind::from_status(403), ServiceErrorKind::Unauthorized);
        assert_eq!(ServiceErrorKind::from_status(429), ServiceErrorKind::RateLimited);
        assert_eq!(ServiceErrorKind::from_status(500), ServiceErrorKind::UpstreamFault);
        assert_eq!(ServiceErrorKind::from_status(502), ServiceErrorKind::Other);
        assert!(ServiceErrorKind::Other.message().is_none());
    }

    #[test]
    fn test_missing_key_is_readable() {
        let err = AppError::from(ConfigError::MissingApiKey {
            var_name: "GEMINI_API_KEY".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "GEMINI_API_KEY không được cấu hình trong .env"
        );
    }
}
