use serde::{Deserialize, Serialize};

/// 正确答案的选项字母
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
}

impl AnswerLetter {
    /// 取首个非空白字符解析，大小写不敏感
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().chars().next()?.to_ascii_uppercase() {
            'A' => Some(AnswerLetter::A),
            'B' => Some(AnswerLetter::B),
            'C' => Some(AnswerLetter::C),
            'D' => Some(AnswerLetter::D),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// 题目类型（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PracticeKind {
    #[default]
    Concept,
    Application,
    Comparison,
    Math,
    Formula,
}

impl PracticeKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "concept" => Some(PracticeKind::Concept),
            "application" => Some(PracticeKind::Application),
            "comparison" => Some(PracticeKind::Comparison),
            "math" => Some(PracticeKind::Math),
            "formula" => Some(PracticeKind::Formula),
            _ => None,
        }
    }
}

/// 练习题（只在内存中，每次请求重新生成）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeQuestion {
    /// 在本次结果中的序号，从 1 开始
    pub id: usize,
    pub question: String,
    pub options: [String; 4],
    pub answer: AnswerLetter,
    #[serde(rename = "type")]
    pub kind: PracticeKind,
}

impl PracticeQuestion {
    pub fn correct_option(&self) -> &str {
        &self.options[self.answer.index()]
    }
}
