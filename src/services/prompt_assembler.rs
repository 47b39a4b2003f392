//! 提示词组装服务 - 业务能力层
//!
//! 只负责把基础提示词和结果结构说明拼成最终提示词，一次运行只组装一次

use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// 结构说明的替换标记
pub const FORMAT_MARKER: &str = "{format_instructions}";

/// 内置系统提示词
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../../prompts/system_prompt.txt");

/// 结果结构说明：告诉服务必须返回哪些字段
pub fn format_instructions() -> String {
    let schema = json!({
        "title": "SQLAlchemyModels",
        "description": "Generated SQLAlchemy ORM models",
        "type": "object",
        "properties": {
            "code": {
                "type": "string",
                "description": "Python code with SQLAlchemy 2.x ORM models; must define a declarative base"
            },
            "summary": {
                "type": "string",
                "description": "Short description of the models and their relationships"
            },
            "token_usage": {
                "type": "integer",
                "minimum": 0,
                "default": 0,
                "description": "Tokens used"
            }
        },
        "required": ["code", "summary"]
    });
    let schema_text = serde_json::to_string_pretty(&schema).unwrap_or_default();

    format!(
        "The output must be formatted as a single JSON object that conforms to the JSON schema below.\n\
         Return only the JSON object. Escape newlines inside strings.\n\n\
         ```json\n{}\n```",
        schema_text
    )
}

/// 组装后的提示词（不可变，可在多个调用间共享）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    text: Arc<str>,
    marker_was_missing: bool,
}

impl AssembledPrompt {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 基础提示词中是否缺少替换标记（已自动追加）
    pub fn marker_was_missing(&self) -> bool {
        self.marker_was_missing
    }
}

/// 提示词组装器
pub struct PromptAssembler {
    base: String,
    schema_guidance: String,
}

impl PromptAssembler {
    /// 使用内置提示词
    pub fn new() -> Self {
        Self::with_base(DEFAULT_SYSTEM_PROMPT)
    }

    /// 使用自定义基础提示词
    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            schema_guidance: format_instructions(),
        }
    }

    /// 从文件加载基础提示词，读取失败时回退到内置提示词
    pub async fn from_file(path: &Path) -> Self {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                info!("✅ 提示词已从文件加载: {}", path.display());
                Self::with_base(content)
            }
            Err(e) => {
                warn!(
                    "❌ 提示词文件加载失败 {}: {}，使用内置提示词",
                    path.display(),
                    e
                );
                Self::new()
            }
        }
    }

    /// 替换默认的结构说明
    pub fn with_schema_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.schema_guidance = guidance.into();
        self
    }

    /// 组装最终提示词
    ///
    /// 缺少替换标记时在末尾追加结构说明并记录警告，不会失败。
    pub fn assemble(&self) -> AssembledPrompt {
        let marker_was_missing = !self.base.contains(FORMAT_MARKER);
        let text = if marker_was_missing {
            warn!("⚠️ 提示词中缺少 {}，已在末尾追加结构说明", FORMAT_MARKER);
            format!("{}\n\n{}", self.base.trim_end(), self.schema_guidance)
        } else {
            self.base.replacen(FORMAT_MARKER, &self.schema_guidance, 1)
        };

        AssembledPrompt {
            text: text.into(),
            marker_was_missing,
        }
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new()
    }
}
