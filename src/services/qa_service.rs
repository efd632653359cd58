//! 课程问答 - 业务能力层
//!
//! 提示词 = 课程讲义 + 回答规则 + 用户问题。模型按规则对超出范围的问题回复
//! 一句固定的道歉，这句话（忽略末尾句号）被识别为 `OutOfScope`，不当作答案。

use std::sync::Arc;
use tracing::{debug, info};

use crate::clients::{GenerationConfig, TextGenerator};
use crate::error::{AiError, AiResult};
use crate::models::course::COURSE_CONTENT;
use crate::utils::truncate_text;
use crate::workflow::{RequestSlot, RequestState};

/// 超出范围时模型应回复的原文
pub const APOLOGY: &str = "Xin lỗi, tôi không có thông tin về chủ đề này trong cơ sở dữ liệu hiện có";

const ANSWERING_RULES: &str = r#"ANSWERING RULES:
1. Answer based ONLY on the content provided above
2. If the question is about these topics, provide detailed, accurate answers
3. If the question is outside these topics, respond exactly with: "Xin lỗi, tôi không có thông tin về chủ đề này trong cơ sở dữ liệu hiện có."
4. Be helpful, educational, and clear in your responses
5. Use Vietnamese language
6. Provide examples when helpful for understanding"#;

pub struct QaService {
    generator: Arc<dyn TextGenerator>,
    slot: RequestSlot<String>,
}

impl QaService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            slot: RequestSlot::new(),
        }
    }

    pub fn generation_config() -> GenerationConfig {
        GenerationConfig::new(0.2, 10000).top_p(0.95)
    }

    pub fn system_prompt() -> String {
        format!(
            "You are an AI assistant for the subject \"Triết học Mác-Lênin\" with specific focus on \"Giai cấp và Dân tộc\" (Social Classes and Nations).\n\nBASE YOUR ANSWERS ON THE FOLLOWING CONTENT:\n{}\n\n{}",
            COURSE_CONTENT.trim_end(),
            ANSWERING_RULES
        )
    }

    pub fn build_prompt(question: &str) -> String {
        format!("{}\n\nUser: {}", Self::system_prompt(), question)
    }

    /// 回答一个课程问题
    ///
    /// # 返回
    /// 去除首尾空白的答案；模型回复固定道歉时返回 `OutOfScope`
    pub async fn ask(&self, question: &str) -> AiResult<String> {
        self.slot.track(self.request(question)).await
    }

    async fn request(&self, question: &str) -> AiResult<String> {
        info!("❓ 提问: {}", truncate_text(question, 60));
        let text = self
            .generator
            .generate(&Self::build_prompt(question), &Self::generation_config())
            .await?;
        let answer = interpret(&text)?;
        debug!("回答长度: {} 字符", answer.chars().count());
        Ok(answer)
    }

    pub fn state(&self) -> RequestState<String> {
        self.slot.state()
    }

    pub fn clear(&self) {
        self.slot.clear();
    }
}

/// 识别道歉回复；其余文本去除首尾空白后作为答案
pub fn interpret(text: &str) -> AiResult<String> {
    let trimmed = text.trim();
    if trimmed.trim_end_matches('.') == APOLOGY {
        return Err(AiError::OutOfScope(APOLOGY.to_string()));
    }
    Ok(trimmed.to_string())
}
