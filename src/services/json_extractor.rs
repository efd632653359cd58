//! 结构化文本提取 - 业务能力层
//!
//! 模型输出是不可信的自由文本：可能包在 ```json 代码块里，前后可能有说明文字。
//! 这里负责从中找出第一个完整的 JSON 对象 / 数组并解析。
//!
//! ## 步骤
//! 1. 去掉 markdown 代码围栏（只认行首的开围栏和行尾的闭围栏，字符串里的 ``` 保留）
//! 2. 平衡扫描：从开括号起逐字符计数嵌套深度，字符串字面量内部的括号不计数
//!    （带反斜杠转义跟踪），深度回到 0 即为候选片段
//! 3. 没有平衡片段时，退回宽松的正则匹配
//! 4. 候选片段解析失败时，把裸换行替换成空格再试一次

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::ExtractError;
use crate::utils::logging::truncate_text;

static FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*```[A-Za-z]*[ \t]*\r?\n?").unwrap());
static FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)[ \t]*```[ \t]*\r?$").unwrap());
static OBJECT_FALLBACK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").unwrap());
static ARRAY_OF_OBJECTS_FALLBACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\s*\{[\s\S]*\}\s*\]").unwrap());
static ARRAY_FALLBACK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[\s\S]*\]").unwrap());

/// 期望提取的 JSON 形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Object,
    Array,
}

impl JsonShape {
    fn open(self) -> char {
        match self {
            JsonShape::Object => '{',
            JsonShape::Array => '[',
        }
    }

    fn close(self) -> char {
        match self {
            JsonShape::Object => '}',
            JsonShape::Array => ']',
        }
    }

    fn name(self) -> &'static str {
        match self {
            JsonShape::Object => "đối tượng JSON",
            JsonShape::Array => "mảng JSON",
        }
    }
}

/// 去掉 ```json / ``` 围栏
pub fn strip_code_fences(text: &str) -> String {
    let opened = FENCE_OPEN.replace_all(text, "");
    FENCE_CLOSE.replace_all(&opened, "").trim().to_string()
}

/// 平衡扫描：从 `input` 中第一个开括号开始，返回与之匹配的完整片段（含两端括号）
///
/// 字符串内的括号不影响深度；没有闭合时返回 `None`。
pub fn find_balanced(input: &str, shape: JsonShape) -> Option<&str> {
    let start = input.find(shape.open())?;
    balanced_from(input, start, shape)
}

fn balanced_from(input: &str, start: usize, shape: JsonShape) -> Option<&str> {
    let (open, close) = (shape.open(), shape.close());
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in input[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                let end = start + offset + ch.len_utf8();
                return Some(&input[start..end]);
            }
        }
    }

    None
}

/// 所有平衡片段候选：依次从每个开括号起扫描
///
/// 说明文字里偶尔会出现括号（例如"（见 {定义}）"），第一个片段解析失败时后面的还有机会。
fn balanced_candidates(input: &str, shape: JsonShape) -> Vec<&str> {
    input
        .char_indices()
        .filter(|(_, ch)| *ch == shape.open())
        .filter_map(|(i, _)| balanced_from(input, i, shape))
        .collect()
}

fn regex_candidates(input: &str, shape: JsonShape) -> Vec<&str> {
    let patterns: Vec<&Regex> = match shape {
        JsonShape::Object => vec![&*OBJECT_FALLBACK],
        JsonShape::Array => vec![&*ARRAY_OF_OBJECTS_FALLBACK, &*ARRAY_FALLBACK],
    };
    patterns
        .iter()
        .filter_map(|re| re.find(input).map(|m| m.as_str()))
        .collect()
}

/// 解析候选片段；失败时把裸换行替换成空格再试一次
fn parse_lenient(candidate: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(candidate).or_else(|first_err| {
        let flattened = candidate.replace(['\r', '\n'], " ");
        if flattened == candidate {
            return Err(first_err);
        }
        serde_json::from_str(&flattened).map_err(|_| first_err)
    })
}

/// 从模型输出中提取第一个指定形状的 JSON 值
///
/// # 返回
/// - `Ok(Value)`：解析成功
/// - `Err(NotFound)`：文本里没有对应的开括号
/// - `Err(InvalidJson)`：找到了候选片段，但都不是合法 JSON
pub fn extract_json(text: &str, shape: JsonShape) -> Result<Value, ExtractError> {
    let cleaned = strip_code_fences(text);

    if !cleaned.contains(shape.open()) {
        debug!("响应中没有 {}: {}", shape.open(), truncate_text(&cleaned, 80));
        return Err(ExtractError::NotFound { shape: shape.name() });
    }

    let mut candidates = balanced_candidates(&cleaned, shape);
    if candidates.is_empty() {
        debug!("平衡扫描未找到完整片段，改用正则匹配");
        candidates = regex_candidates(&cleaned, shape);
    }
    if candidates.is_empty() {
        candidates.push(cleaned.as_str());
    }

    let mut last_err = None;
    for candidate in candidates {
        match parse_lenient(candidate) {
            Ok(value) if shape_matches(&value, shape) => return Ok(value),
            Ok(_) => continue,
            Err(e) => {
                debug!("候选片段解析失败: {} ({})", truncate_text(candidate, 80), e);
                last_err = Some(e);
            }
        }
    }

    match last_err {
        Some(source) => Err(ExtractError::InvalidJson { source }),
        None => Err(ExtractError::NotFound { shape: shape.name() }),
    }
}

fn shape_matches(value: &Value, shape: JsonShape) -> bool {
    match shape {
        JsonShape::Object => value.is_object(),
        JsonShape::Array => value.is_array(),
    }
}

/// 提取并反序列化为具体类型
pub fn extract_as<T: DeserializeOwned>(text: &str, shape: JsonShape) -> Result<T, ExtractError> {
    let value = extract_json(text, shape)?;
    serde_json::from_value(value).map_err(|source| ExtractError::UnexpectedShape { source })
}
