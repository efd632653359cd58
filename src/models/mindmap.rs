use serde::{Deserialize, Serialize};

/// 思维导图节点
///
/// 约定不超过 3 层，但结构上不做限制。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindmapNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub children: Vec<MindmapNode>,
}

impl MindmapNode {
    /// 以本节点为根的层数（叶子为 1）
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(MindmapNode::depth).max().unwrap_or(0)
    }

    /// 以本节点为根的节点总数
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(MindmapNode::count).sum::<usize>()
    }
}

/// 生成结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindmapResponse {
    pub topic: String,
    #[serde(default)]
    pub nodes: Vec<MindmapNode>,
}

impl MindmapResponse {
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(MindmapNode::depth).max().unwrap_or(0)
    }

    /// 缩进文本形式，供命令行输出
    pub fn render_outline(&self) -> String {
        let mut out = format!("{}\n", self.topic);
        for node in &self.nodes {
            render_node(node, 1, &mut out);
        }
        out
    }
}

fn render_node(node: &MindmapNode, level: usize, out: &mut String) {
    out.push_str(&"  ".repeat(level));
    out.push_str("- ");
    out.push_str(&node.name);
    out.push('\n');
    for child in &node.children {
        render_node(child, level + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_and_outline() {
        let resp: MindmapResponse = serde_json::from_str(
            r#"{"topic":"giai cấp","nodes":[{"id":"root","name":"Giai cấp","children":[
                {"id":"a","name":"Nguồn gốc","children":[{"id":"a1","name":"Trực tiếp"}]},
                {"id":"b","name":"Đấu tranh","children":[]}
            ]}]}"#,
        )
        .unwrap();

        assert_eq!(resp.depth(), 3);
        assert_eq!(resp.nodes[0].count(), 4);
        let outline = resp.render_outline();
        assert!(outline.starts_with("giai cấp\n"));
        assert!(outline.contains("      - Trực tiếp\n"));
    }
}
