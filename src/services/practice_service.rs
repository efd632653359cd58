//! 练习题生成 - 业务能力层
//!
//! 每次请求带一个随机会话 id 和时间戳，促使模型生成不同的题目。
//! 回复中的 JSON 数组经过规整：序号重排为 1..n，缺省答案为 A，
//! 未知题型归为 concept；选项不是 4 个、答案不在 A–D 或字段类型不对的题目直接丢弃。

use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::{GenerationConfig, TextGenerator};
use crate::error::{AiResult, ExtractError};
use crate::models::course::COURSE_CONTENT;
use crate::models::{AnswerLetter, PracticeKind, PracticeQuestion};
use crate::services::json_extractor::{extract_as, JsonShape};
use crate::workflow::{RequestSlot, RequestState};

pub const QUESTION_COUNT: usize = 10;

const SESSION_ID_LEN: usize = 6;

const SYSTEM_PROMPT: &str = r#"You are an expert in creating multiple-choice questions for the subject "Marxism-Leninism Philosophy" specifically about "Giai cấp và Dân tộc" (Social Classes and Nations).

Your task is to generate 10 practice questions based on the provided content about social classes and nations.

QUESTION TYPES:
1. "concept" type - Questions about definitions, characteristics, and theoretical concepts
2. "application" type - Questions asking for examples or practical applications
3. "comparison" type - Questions comparing different concepts or historical periods

CRITICAL REQUIREMENTS FOR JSON OUTPUT:
1. Generate exactly 10 questions total
2. All questions must be in Vietnamese
3. Each question must have exactly 4 multiple-choice options (A, B, C, D)
4. Return ONLY a JSON array, nothing else - no markdown, no code blocks, no explanations
5. JSON must be valid and properly formatted
6. Questions should cover: giai cấp, đấu tranh giai cấp, dân tộc, thị tộc, bộ lạc, và mối quan hệ giữa chúng

JSON STRUCTURE (MUST BE EXACTLY LIKE THIS):
[
  {
    "id": 1,
    "question": "Write the full question in Vietnamese. Do not use line breaks inside strings.",
    "options": ["A. Option text here", "B. Option text here", "C. Option text here", "D. Option text here"],
    "answer": "A",
    "type": "concept"
  }
]

IMPORTANT JSON RULES:
- Return ONLY the JSON array, no other text before or after
- Use double quotes for all strings
- Do not use newlines or special characters inside string values
- Each option MUST start with "A.", "B.", "C.", or "D."
- "answer" must be one of: "A", "B", "C", or "D"
- "type" must be one of: "concept", "application", "comparison"
- All fields are required"#;

const CLOSING_INSTRUCTIONS: &str = "Generate 10 UNIQUE and VARIED practice questions in Vietnamese covering all the main concepts mentioned above. Each time generate different questions with different angles, examples, and perspectives. Focus on:
- Different aspects of each concept
- Various question types (definition, comparison, application, analysis)
- Different examples and scenarios
- Varying difficulty levels

IMPORTANT: Create completely new questions that haven't been generated before. Be creative and comprehensive.";

/// 模型返回的原始题目，字段都可能缺失；类型不对的题目整条丢弃
#[derive(Debug, Deserialize)]
struct RawPracticeItem {
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    options: Option<Vec<String>>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

pub struct PracticeService {
    generator: Arc<dyn TextGenerator>,
    slot: RequestSlot<Vec<PracticeQuestion>>,
}

impl PracticeService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            slot: RequestSlot::new(),
        }
    }

    pub fn generation_config() -> GenerationConfig {
        GenerationConfig::new(0.9, 4000).top_p(0.95).top_k(40)
    }

    pub fn build_prompt(session_id: &str, timestamp: &str) -> String {
        format!(
            "{}\n\nBased on this content about \"Giai cấp và Dân tộc\" (Session ID: {}, Timestamp: {}):\n{}\n\n{}",
            SYSTEM_PROMPT, session_id, timestamp, COURSE_CONTENT, CLOSING_INSTRUCTIONS
        )
    }

    /// 生成一组新的练习题
    pub async fn generate(&self) -> AiResult<Vec<PracticeQuestion>> {
        self.slot.track(self.request()).await
    }

    async fn request(&self) -> AiResult<Vec<PracticeQuestion>> {
        let session_id: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        info!("📚 生成练习题 (会话 {})", session_id);

        let text = self
            .generator
            .generate(
                &Self::build_prompt(&session_id, &timestamp),
                &Self::generation_config(),
            )
            .await?;

        let questions = interpret(&text)?;
        info!("✓ 共生成 {} 道练习题", questions.len());
        Ok(questions)
    }

    pub fn state(&self) -> RequestState<Vec<PracticeQuestion>> {
        self.slot.state()
    }

    pub fn clear(&self) {
        self.slot.clear();
    }
}

/// 从回复中提取并规整题目
pub fn interpret(text: &str) -> AiResult<Vec<PracticeQuestion>> {
    let raw: Vec<Value> = extract_as(text, JsonShape::Array)?;
    let total = raw.len();

    let questions: Vec<PracticeQuestion> = raw
        .into_iter()
        .filter_map(normalize)
        .enumerate()
        .map(|(idx, mut q)| {
            q.id = idx + 1;
            q
        })
        .collect();

    if questions.len() < total {
        warn!("⚠️ 丢弃了 {} 道格式不正确的题目", total - questions.len());
    }
    if questions.is_empty() {
        return Err(ExtractError::NoUsableItems(
            "không có câu hỏi hợp lệ trong phản hồi".to_string(),
        )
        .into());
    }
    Ok(questions)
}

fn normalize(item: Value) -> Option<PracticeQuestion> {
    let raw: RawPracticeItem = match serde_json::from_value(item) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("题目字段类型不正确，丢弃: {}", e);
            return None;
        }
    };

    let question = raw.question?.trim().to_string();
    if question.is_empty() {
        return None;
    }

    let options: [String; 4] = raw.options?.try_into().ok()?;

    let answer = match raw.answer {
        Some(letter) => AnswerLetter::parse(&letter)?,
        None => AnswerLetter::A,
    };

    let kind = raw
        .kind
        .as_deref()
        .and_then(PracticeKind::from_tag)
        .unwrap_or_default();

    Some(PracticeQuestion {
        id: 0,
        question,
        options,
        answer,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiError;
    use crate::services::testing::CannedGenerator;

    #[test]
    fn test_normalization() {
        let text = r#"Đây là câu hỏi:
[
  {"id": 7, "question": "Giai cấp là gì?", "options": ["A. x", "B. y", "C. z", "D. w"], "answer": "c", "type": "concept"},
  {"question": "Thiếu đáp án", "options": ["A. x", "B. y", "C. z", "D. w"]},
  {"question": "Ba lựa chọn", "options": ["A. x", "B. y", "C. z"], "answer": "A"},
  {"question": "Đáp án lạ", "options": ["A. x", "B. y", "C. z", "D. w"], "answer": "E"},
  {"question": "Loại lạ", "options": ["A. x", "B. y", "C. z", "D. w"], "answer": "B", "type": "trivia"}
]"#;
        let questions = interpret(text).unwrap();

        assert_eq!(questions.len(), 3);
        assert_eq!(
            questions.iter().map(|q| q.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(questions[0].answer, AnswerLetter::C);
        assert_eq!(questions[1].answer, AnswerLetter::A);
        assert_eq!(questions[2].kind, PracticeKind::Concept);
        assert_eq!(questions[0].correct_option(), "C. z");
    }

    #[test]
    fn test_mistyped_item_is_dropped_not_fatal() {
        let text = r#"[
  {"question": "Giai cấp là gì?", "options": ["A. x", "B. y", "C. z", "D. w"], "answer": "B"},
  {"question": "Đáp án là số", "options": ["A. x", "B. y", "C. z", "D. w"], "answer": 3},
  {"question": "Lựa chọn là chuỗi", "options": "A. x B. y", "answer": "A"},
  "không phải đối tượng"
]"#;
        let questions = interpret(text).unwrap();

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, 1);
        assert_eq!(questions[0].question, "Giai cấp là gì?");
        assert_eq!(questions[0].answer, AnswerLetter::B);
    }

    #[test]
    fn test_nothing_usable_is_parse_error() {
        let err = interpret(r#"[{"question": "", "options": []}]"#).unwrap_err();
        assert!(matches!(
            err,
            AiError::Parse(ExtractError::NoUsableItems(_))
        ));
    }

    #[tokio::test]
    async fn test_request_parameters() {
        let generator = Arc::new(CannedGenerator::ok(
            r#"[{"question": "Dân tộc là gì?", "options": ["A", "B", "C", "D"], "answer": "D", "type": "application"}]"#,
        ));
        let service = PracticeService::new(generator.clone());

        let questions = service.generate().await.unwrap();
        assert_eq!(questions[0].kind, PracticeKind::Application);

        let generation = &generator.generations()[0];
        assert_eq!(generation.max_output_tokens, 4000);
        assert_eq!(generation.top_k, Some(40));
        assert!(generator.prompts()[0].contains("Session ID: "));
    }

    #[tokio::test]
    async fn test_each_request_uses_new_session_id() {
        let generator = Arc::new(CannedGenerator::ok(
            r#"[{"question": "q", "options": ["A", "B", "C", "D"]}]"#,
        ));
        let service = PracticeService::new(generator.clone());
        service.generate().await.unwrap();
        service.generate().await.unwrap();

        let prompts = generator.prompts();
        assert_ne!(prompts[0], prompts[1]);
    }
}
