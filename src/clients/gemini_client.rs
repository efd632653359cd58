/// Gemini API 客户端
///
/// 封装对 `generateContent` 接口的单次调用：构造请求、发送、分类错误、取出第一个候选文本。
/// 不做任何重试。
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AiError, AiResult, ServiceErrorKind};
use crate::utils::logging::truncate_text;

/// 生成参数
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

impl GenerationConfig {
    pub fn new(temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            temperature,
            max_output_tokens,
            top_p: None,
            top_k: None,
        }
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

// ========== 请求 / 响应结构 ==========

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: &'a GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// 文本生成能力
///
/// 业务层只依赖这个 trait，测试里可以换成固定响应。
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// 发出一次生成请求，返回第一个候选的文本
    async fn generate(&self, prompt: &str, generation: &GenerationConfig) -> AiResult<String>;
}

/// Gemini 客户端
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
    model_name: String,
}

impl GeminiClient {
    /// 创建客户端；未配置 API key 时返回配置错误
    pub fn new(config: &Config) -> AiResult<Self> {
        let api_key = config.require_api_key()?.to_string();
        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            api_base_url: config.gemini_api_base_url.clone(),
            model_name: config.gemini_model_name.clone(),
        })
    }

    /// 替换底层 HTTP 客户端（代理、超时等由调用方决定）
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base_url.trim_end_matches('/'),
            self.model_name
        )
    }

    /// 发送生成请求
    ///
    /// # 参数
    /// - `prompt`: 完整提示词
    /// - `generation`: 生成参数
    ///
    /// # 返回
    /// 第一个候选的文本（已去除首尾空白）
    pub async fn generate_content(
        &self,
        prompt: &str,
        generation: &GenerationConfig,
    ) -> AiResult<String> {
        debug!("调用 Gemini API，模型: {}", self.model_name);
        debug!("提示词长度: {} 字符", prompt.chars().count());

        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: generation,
        };

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|source| {
                warn!("Gemini API 网络错误: {}", source);
                AiError::Connectivity { source }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| AiError::Connectivity { source })?;

        if !status.is_success() {
            warn!(
                "Gemini API 返回错误状态 {}: {}",
                status.as_u16(),
                truncate_text(&text, 200)
            );
            return Err(service_error(status.as_u16(), &text));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!("Gemini 响应无法解析: {}", e);
            GenerateResponse::default()
        });

        let content = first_candidate_text(parsed)?;
        debug!("Gemini API 调用成功，返回 {} 字符", content.chars().count());
        Ok(content)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, generation: &GenerationConfig) -> AiResult<String> {
        self.generate_content(prompt, generation).await
    }
}

/// 根据状态码和响应体构造服务错误
///
/// 已知状态码使用固定提示；其他状态码优先取 `error.message`。
pub fn service_error(status: u16, body: &str) -> AiError {
    let kind = ServiceErrorKind::from_status(status);
    let message = match kind.message() {
        Some(fixed) => fixed.to_string(),
        None => serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .and_then(|d| d.message)
            .unwrap_or_else(|| "Có lỗi xảy ra khi gọi Gemini API".to_string()),
    };
    AiError::Service {
        status,
        kind,
        message,
    }
}

/// 取第一个候选的第一段文本；为空时返回 `EmptyResult`
pub fn first_candidate_text(response: GenerateResponse) -> AiResult<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(AiError::EmptyResult)
}
