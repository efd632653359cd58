use serde::{Deserialize, Serialize};

/// 问题状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    Pending,
    Replied,
}

/// 社区问答板上的一条问题记录
///
/// 字段名与远程集合 / 本地存储中的 JSON 保持一致（camelCase）。
/// 新建时为 `Pending`，三个回复字段为空；回复时三者一起写入。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub content: String,
    pub timestamp: String,
    pub status: QuestionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_timestamp: Option<String>,
}

impl Question {
    /// 创建一条待回复的问题
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        username: impl Into<String>,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            username: username.into(),
            content: content.into(),
            timestamp: timestamp.into(),
            status: QuestionStatus::Pending,
            answer: None,
            admin_name: None,
            reply_timestamp: None,
        }
    }

    /// 写入管理员回复；重复调用时后写覆盖先写
    pub fn apply_reply(&mut self, admin_name: &str, answer: &str, replied_at: &str) {
        self.status = QuestionStatus::Replied;
        self.answer = Some(answer.to_string());
        self.admin_name = Some(admin_name.to_string());
        self.reply_timestamp = Some(replied_at.to_string());
    }

    pub fn is_pending(&self) -> bool {
        self.status == QuestionStatus::Pending
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self.status {
            QuestionStatus::Pending => "chờ trả lời",
            QuestionStatus::Replied => "đã trả lời",
        };
        write!(
            f,
            "[{}] {} ({}) - {}: {}",
            self.id, self.username, status, self.timestamp, self.content
        )?;
        if let (Some(admin), Some(answer)) = (&self.admin_name, &self.answer) {
            write!(f, "\n    ↳ {}: {}", admin, answer)?;
        }
        Ok(())
    }
}

// ========== 列表操作 ==========
//
// 三种同步策略共用的纯函数。列表始终按"最新在前"排列。

/// 新记录插到最前面
pub fn prepend(list: &mut Vec<Question>, question: Question) {
    list.insert(0, question);
}

/// 按 id 回复；找不到时不做任何事，返回 false
pub fn reply_in(
    list: &mut [Question],
    question_id: &str,
    admin_name: &str,
    answer: &str,
    replied_at: &str,
) -> bool {
    match list.iter_mut().find(|q| q.id == question_id) {
        Some(q) => {
            q.apply_reply(admin_name, answer, replied_at);
            true
        }
        None => false,
    }
}

/// 按 id 删除；找不到时不做任何事，返回 false
pub fn remove_from(list: &mut Vec<Question>, question_id: &str) -> bool {
    let before = list.len();
    list.retain(|q| q.id != question_id);
    list.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, ts: &str) -> Question {
        Question::new(id, "user1", "Nguyễn Văn A", "Giai cấp là gì?", ts)
    }

    #[test]
    fn test_new_question_is_pending() {
        let q = sample("1", "2025-01-01T00:00:00.000Z");
        assert!(q.is_pending());
        assert!(q.answer.is_none() && q.admin_name.is_none() && q.reply_timestamp.is_none());
    }

    #[test]
    fn test_json_field_names() {
        let mut q = sample("1", "2025-01-01T00:00:00.000Z");
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["userId"], "user1");
        assert_eq!(json["status"], "pending");
        assert!(json.get("answer").is_none());

        q.apply_reply("Quản trị viên", "Xem mục 1", "2025-01-02T00:00:00.000Z");
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["status"], "replied");
        assert_eq!(json["adminName"], "Quản trị viên");
        assert_eq!(json["replyTimestamp"], "2025-01-02T00:00:00.000Z");
    }

    #[test]
    fn test_reply_and_remove_unknown_id_are_noops() {
        let mut list = vec![sample("2", "b"), sample("1", "a")];
        let before = list.clone();

        assert!(!reply_in(&mut list, "404", "admin", "x", "t"));
        assert!(!remove_from(&mut list, "404"));
        assert_eq!(list, before);
    }
}
