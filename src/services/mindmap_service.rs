//! 思维导图生成 - 业务能力层
//!
//! 只负责"主题 → 思维导图"这一种能力：拼提示词、限流等待、调用生成器、
//! 从回复中提取 JSON 对象。

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::clients::{GenerationConfig, TextGenerator};
use crate::error::{AiError, AiResult, ExtractError};
use crate::models::MindmapResponse;
use crate::services::json_extractor::{extract_json, JsonShape};
use crate::workflow::{RequestSlot, RequestState};

const SYSTEM_PROMPT: &str = r#"You are a JSON generator. Generate ONLY valid JSON mindmap about social classes/clans. No explanations, no markdown, no extra text.

If unrelated topic, respond with EXACTLY: {"error": "Xin lỗi, tôi không thể trả lời các câu hỏi ngoài phạm vi Giai cấp và Giai tộc."}

Response format (EXACTLY):
{"topic": "main topic", "nodes": [{"id": "root", "name": "main topic", "children": [{"id": "id1", "name": "subtopic1", "children": []}, {"id": "id2", "name": "subtopic2", "children": []}]}]}

Max 3 levels, concise names."#;

pub struct MindmapService {
    generator: Arc<dyn TextGenerator>,
    courtesy_delay: Duration,
    slot: RequestSlot<MindmapResponse>,
}

impl MindmapService {
    pub fn new(generator: Arc<dyn TextGenerator>, courtesy_delay: Duration) -> Self {
        Self {
            generator,
            courtesy_delay,
            slot: RequestSlot::new(),
        }
    }

    pub fn generation_config() -> GenerationConfig {
        GenerationConfig::new(0.2, 900)
    }

    pub fn build_prompt(topic: &str) -> String {
        format!("{}\n\n### Main Topic or Input\n{}", SYSTEM_PROMPT, topic)
    }

    /// 生成思维导图
    ///
    /// # 参数
    /// - `topic`: 主题或一段输入文本
    ///
    /// # 返回
    /// 解析后的思维导图；模型判断主题超出范围时返回 `OutOfScope`
    pub async fn generate(&self, topic: &str) -> AiResult<MindmapResponse> {
        self.slot.track(self.request(topic)).await
    }

    async fn request(&self, topic: &str) -> AiResult<MindmapResponse> {
        info!("🧠 生成思维导图: {}", topic);
        if !self.courtesy_delay.is_zero() {
            debug!("请求前等待 {} ms", self.courtesy_delay.as_millis());
            tokio::time::sleep(self.courtesy_delay).await;
        }

        let text = self
            .generator
            .generate(&Self::build_prompt(topic), &Self::generation_config())
            .await?;
        let mindmap = interpret(&text)?;
        info!(
            "✓ 思维导图生成完成: {} ({} 层)",
            mindmap.topic,
            mindmap.depth()
        );
        Ok(mindmap)
    }

    pub fn state(&self) -> RequestState<MindmapResponse> {
        self.slot.state()
    }

    pub fn clear(&self) {
        self.slot.clear();
    }
}

/// 解析模型回复；`{"error": "..."}` 视为超出范围
pub fn interpret(text: &str) -> AiResult<MindmapResponse> {
    let value = extract_json(text, JsonShape::Object)?;

    if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
        return Err(AiError::OutOfScope(message.to_string()));
    }

    serde_json::from_value(value)
        .map_err(|source| AiError::Parse(ExtractError::UnexpectedShape { source }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::CannedGenerator;
    use crate::workflow::RequestPhase;

    #[tokio::test]
    async fn test_fenced_reply_is_parsed() {
        let generator = Arc::new(CannedGenerator::ok(
            "```json\n{\"topic\":\"giai cấp\",\"nodes\":[{\"id\":\"root\",\"name\":\"giai cấp\",\"children\":[]}]}\n```",
        ));
        let service = MindmapService::new(generator.clone(), Duration::ZERO);

        let mindmap = service.generate("giai cấp").await.unwrap();
        assert_eq!(mindmap.topic, "giai cấp");
        assert_eq!(service.state().phase(), RequestPhase::Success);

        let prompts = generator.prompts();
        assert!(prompts[0].ends_with("### Main Topic or Input\ngiai cấp"));
    }

    #[tokio::test]
    async fn test_error_object_is_out_of_scope() {
        let generator = Arc::new(CannedGenerator::ok(
            r#"{"error": "Xin lỗi, tôi không thể trả lời các câu hỏi ngoài phạm vi Giai cấp và Giai tộc."}"#,
        ));
        let service = MindmapService::new(generator, Duration::ZERO);

        let err = service.generate("bóng đá").await.unwrap_err();
        assert!(matches!(err, AiError::OutOfScope(_)));

        let state = service.state();
        assert_eq!(state.phase(), RequestPhase::Error);
        assert!(state.data.is_none());
        assert!(state.error.unwrap().starts_with("Xin lỗi"));
    }

    #[tokio::test]
    async fn test_prose_reply_is_parse_error() {
        let service = MindmapService::new(
            Arc::new(CannedGenerator::ok("Tôi không biết.")),
            Duration::ZERO,
        );
        let err = service.generate("giai cấp").await.unwrap_err();
        assert!(matches!(err, AiError::Parse(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_courtesy_delay_is_applied() {
        let generator = Arc::new(CannedGenerator::ok(r#"{"topic":"t","nodes":[]}"#));
        let service = MindmapService::new(generator, Duration::from_millis(1000));

        let started = tokio::time::Instant::now();
        service.generate("t").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1000));
    }
}
