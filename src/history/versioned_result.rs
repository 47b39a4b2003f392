use std::path::PathBuf;

use crate::history::VersionHistory;
use crate::models::{ConversionOutcome, ProcessingMode};

/// 带编辑历史的处理结果
///
/// 由编排器创建后交给展示层，此后只有当前操作者可以修改历史。
/// 失败结果的错误文本同样可以编辑，便于手工修补。
#[derive(Debug, Clone)]
pub struct VersionedResult {
    outcome: ConversionOutcome,
    history: VersionHistory,
}

impl VersionedResult {
    pub fn new(outcome: ConversionOutcome) -> Self {
        let history = VersionHistory::new(outcome.seed_text());
        Self { outcome, history }
    }

    pub fn outcome(&self) -> &ConversionOutcome {
        &self.outcome
    }

    pub fn history(&self) -> &VersionHistory {
        &self.history
    }

    pub fn label(&self) -> &str {
        &self.outcome.unit_label
    }

    pub fn is_error(&self) -> bool {
        !self.outcome.is_success()
    }

    /// 当前版本的代码（或错误文本）
    pub fn code(&self) -> &str {
        self.history.current()
    }

    pub fn summary(&self) -> String {
        self.outcome.summary()
    }

    pub fn token_usage(&self) -> u64 {
        self.outcome.token_usage()
    }

    pub fn mode(&self) -> ProcessingMode {
        self.outcome.mode
    }

    pub fn source_paths(&self) -> &[PathBuf] {
        &self.outcome.source_paths
    }

    // ========== 编辑操作（委托给历史） ==========

    pub fn commit(&mut self, text: impl Into<String>) -> &str {
        self.history.commit(text.into())
    }

    pub fn undo(&mut self) -> &str {
        self.history.undo()
    }

    pub fn redo(&mut self) -> &str {
        self.history.redo()
    }

    pub fn restore_original(&mut self) -> &str {
        self.history.restore_original()
    }

    pub fn has_undo(&self) -> bool {
        self.history.has_undo()
    }

    pub fn has_redo(&self) -> bool {
        self.history.has_redo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ModelConfig, OutcomeKind, StructuredArtifact};
    use std::sync::Arc;

    fn outcome(kind: OutcomeKind) -> ConversionOutcome {
        ConversionOutcome {
            unit_label: "a.png".to_string(),
            mode: ProcessingMode::Separate,
            source_paths: vec![PathBuf::from("a.png")],
            config: Arc::new(ModelConfig::default()),
            kind,
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_success_seeds_history_with_code() {
        let artifact =
            StructuredArtifact::new("Base = declarative_base()".into(), "users".into(), 7).unwrap();
        let result = VersionedResult::new(outcome(OutcomeKind::Success(artifact)));

        assert!(!result.is_error());
        assert_eq!(result.code(), "Base = declarative_base()");
        assert_eq!(result.summary(), "users");
        assert_eq!(result.token_usage(), 7);
    }

    #[test]
    fn test_failure_text_is_editable() {
        let mut result = VersionedResult::new(outcome(OutcomeKind::Failure {
            message: "timeout".to_string(),
        }));

        assert!(result.is_error());
        result.commit("Base = declarative_base()  # patched");
        assert_eq!(result.undo(), "timeout");
        assert_eq!(result.redo(), "Base = declarative_base()  # patched");
        assert_eq!(result.restore_original(), "timeout");
        assert_eq!(result.outcome().seed_text(), "timeout");
    }
}
