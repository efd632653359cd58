use async_trait::async_trait;
use std::sync::Mutex;

use crate::clients::{GenerationConfig, TextGenerator};
use crate::error::AiResult;

/// 返回固定文本的生成器，记录收到的提示词和生成参数
pub(crate) struct CannedGenerator {
    reply: String,
    calls: Mutex<Vec<(String, GenerationConfig)>>,
}

impl CannedGenerator {
    pub(crate) fn ok(text: &str) -> Self {
        Self {
            reply: text.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    pub(crate) fn generations(&self) -> Vec<GenerationConfig> {
        self.calls.lock().unwrap().iter().map(|(_, g)| g.clone()).collect()
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, prompt: &str, generation: &GenerationConfig) -> AiResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), generation.clone()));
        Ok(self.reply.clone())
    }
}
