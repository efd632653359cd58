//! 概念示例生成 - 业务能力层
//!
//! 四个固定概念各有一段参考内容，请求前先校验概念名，未知概念不发请求。

use std::sync::Arc;
use tracing::info;

use crate::clients::{GenerationConfig, TextGenerator};
use crate::error::{AppError, AppResult};
use crate::models::course::{concept_content, CONCEPTS};
use crate::workflow::{RequestSlot, RequestState};

pub struct ConceptService {
    generator: Arc<dyn TextGenerator>,
    slot: RequestSlot<String>,
}

impl ConceptService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            slot: RequestSlot::new(),
        }
    }

    pub fn generation_config() -> GenerationConfig {
        GenerationConfig::new(0.7, 150)
    }

    pub fn build_prompt(concept: &str, content: &str) -> String {
        format!(
            "Dựa vào nội dung sau đây, hãy tạo một ví dụ thực tế ngắn gọn (khoảng 2-3 câu) về khái niệm \"{}\".\n\nNội dung tham khảo:\n{}\n\nYêu cầu:\n- Tạo ví dụ cụ thể, dễ hiểu\n- Phản ánh rõ nét đặc điểm của khái niệm\n- Có tính ứng dụng thực tế\n- Viết bằng tiếng Việt, ngắn gọn, súc tích",
            concept, content
        )
    }

    /// 可选概念的显示名
    pub fn concepts() -> impl Iterator<Item = &'static str> {
        CONCEPTS.iter().map(|(_, label)| *label)
    }

    /// 为一个概念生成示例
    ///
    /// # 参数
    /// - `concept`: 概念名（大小写、首尾空白不敏感）
    ///
    /// # 返回
    /// 示例文本；概念不在列表中时返回 `Validation`，不会发出请求
    pub async fn generate_example(&self, concept: &str) -> AppResult<String> {
        let key = concept.trim().to_lowercase();
        let content = concept_content(&key).ok_or_else(|| {
            AppError::Validation(format!(
                "Khái niệm \"{}\" không có trong danh sách: {}",
                concept.trim(),
                Self::concepts().collect::<Vec<_>>().join(", ")
            ))
        })?;

        info!("💡 生成概念示例: {}", key);
        let prompt = Self::build_prompt(&key, content);
        let example = self
            .slot
            .track(self.generator.generate(&prompt, &Self::generation_config()))
            .await?;
        Ok(example)
    }

    pub fn state(&self) -> RequestState<String> {
        self.slot.state()
    }

    pub fn clear(&self) {
        self.slot.clear();
    }
}
