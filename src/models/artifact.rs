//! 转换结果数据结构

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{UploadError, ValidationError};
use crate::models::model_config::ModelConfig;
use crate::models::work_unit::ProcessingMode;

/// 声明式基类标记（经典写法与 SQLAlchemy 2.x 写法）
pub const DECLARATIVE_BASE_MARKERS: [&str; 2] = ["declarative_base", "DeclarativeBase"];

/// 结构化生成结果
///
/// 只能通过 [`StructuredArtifact::new`] 构造，`code` 一定包含声明式基类标记。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredArtifact {
    code: String,
    summary: String,
    token_usage: u64,
}

impl StructuredArtifact {
    /// 校验并构造结果
    pub fn new(code: String, summary: String, token_usage: u64) -> Result<Self, ValidationError> {
        if !has_base_marker(&code) {
            return Err(ValidationError::MissingBaseMarker {
                expected: DECLARATIVE_BASE_MARKERS.join(" | "),
            });
        }
        Ok(Self {
            code,
            summary,
            token_usage,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn token_usage(&self) -> u64 {
        self.token_usage
    }

    /// 在代码开头加一行注释（标记仍然保留，不会破坏不变量）
    pub(crate) fn with_code_prefix(mut self, line: &str) -> Self {
        self.code = format!("{}\n{}", line, self.code);
        self
    }
}

/// 代码中是否含有声明式基类标记
pub fn has_base_marker(code: &str) -> bool {
    DECLARATIVE_BASE_MARKERS
        .iter()
        .any(|marker| code.contains(marker))
}

/// 单元处理结果：成功或失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OutcomeKind {
    Success(StructuredArtifact),
    Failure { message: String },
}

/// 一次调用的完整结果，创建后不再修改
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    /// 单元标签
    pub unit_label: String,
    /// 处理模式
    pub mode: ProcessingMode,
    /// 源图像路径
    pub source_paths: Vec<PathBuf>,
    /// 本次运行使用的模型配置快照
    pub config: Arc<ModelConfig>,
    /// 成功或失败
    pub kind: OutcomeKind,
    /// 上传诊断（被丢弃的附件）
    pub diagnostics: Vec<UploadError>,
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.kind, OutcomeKind::Success(_))
    }

    pub fn artifact(&self) -> Option<&StructuredArtifact> {
        match &self.kind {
            OutcomeKind::Success(artifact) => Some(artifact),
            OutcomeKind::Failure { .. } => None,
        }
    }

    /// 初始文本：成功时为代码，失败时为错误信息
    pub fn seed_text(&self) -> &str {
        match &self.kind {
            OutcomeKind::Success(artifact) => artifact.code(),
            OutcomeKind::Failure { message } => message,
        }
    }

    /// 摘要：失败时给出提示
    pub fn summary(&self) -> String {
        match &self.kind {
            OutcomeKind::Success(artifact) => artifact.summary().to_string(),
            OutcomeKind::Failure { .. } => format!("图像处理失败: {}", self.unit_label),
        }
    }

    pub fn token_usage(&self) -> u64 {
        self.artifact().map(StructuredArtifact::token_usage).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_requires_marker() {
        let err = StructuredArtifact::new("class User: pass".into(), "s".into(), 0).unwrap_err();
        assert!(matches!(err, ValidationError::MissingBaseMarker { .. }));
    }

    #[test]
    fn test_artifact_accepts_both_markers() {
        assert!(StructuredArtifact::new("Base = declarative_base()".into(), "".into(), 1).is_ok());
        assert!(StructuredArtifact::new("class Base(DeclarativeBase): ...".into(), "".into(), 1).is_ok());
    }

    #[test]
    fn test_prefix_keeps_code() {
        let artifact = StructuredArtifact::new("Base = declarative_base()".into(), "".into(), 0)
            .unwrap()
            .with_code_prefix("# Code for image: a.png");
        assert_eq!(artifact.code(), "# Code for image: a.png\nBase = declarative_base()");
    }
}
