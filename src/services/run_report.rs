//! 运行报告服务 - 业务能力层
//!
//! 把一次运行的结果写成 JSON 报告，供脚本或其他工具读取

use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::error::PersistError;
use crate::history::VersionedResult;
use crate::models::{ModelConfig, ProcessingMode};

/// 单个结果的报告条目
#[derive(Debug, Serialize)]
pub struct ReportEntry<'a> {
    pub label: &'a str,
    pub status: &'static str,
    pub summary: String,
    pub token_usage: u64,
    /// 当前版本的代码（或错误文本）
    pub code: &'a str,
    pub history_len: usize,
    pub diagnostics: Vec<String>,
}

impl<'a> ReportEntry<'a> {
    fn from_result(result: &'a VersionedResult) -> Self {
        Self {
            label: result.label(),
            status: if result.is_error() { "failure" } else { "success" },
            summary: result.summary(),
            token_usage: result.token_usage(),
            code: result.code(),
            history_len: result.history().len(),
            diagnostics: result
                .outcome()
                .diagnostics
                .iter()
                .map(|d| d.to_string())
                .collect(),
        }
    }
}

/// 运行报告
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub generated_at: String,
    pub model: &'a str,
    pub mode: ProcessingMode,
    pub cancelled: bool,
    pub results: Vec<ReportEntry<'a>>,
}

impl<'a> RunReport<'a> {
    pub fn new(
        results: &'a [VersionedResult],
        config: &'a ModelConfig,
        mode: ProcessingMode,
        cancelled: bool,
    ) -> Self {
        Self {
            generated_at: chrono::Local::now().to_rfc3339(),
            model: &config.name,
            mode,
            cancelled,
            results: results.iter().map(ReportEntry::from_result).collect(),
        }
    }

    /// 写入 JSON 文件
    pub async fn write(&self, path: &Path) -> Result<(), PersistError> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| PersistError::WriteFailed {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })?;
        tokio::fs::write(path, json)
            .await
            .map_err(|source| PersistError::WriteFailed {
                path: path.to_path_buf(),
                source,
            })?;
        info!("📝 运行报告已写入 {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;
    use crate::models::{ConversionOutcome, OutcomeKind, StructuredArtifact};
    use std::path::PathBuf;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_report_lists_results_in_order() {
        let config = ModelConfig::default();
        let ok = VersionedResult::new(ConversionOutcome {
            unit_label: "a.png".to_string(),
            mode: ProcessingMode::Separate,
            source_paths: vec![PathBuf::from("a.png")],
            config: Arc::new(config.clone()),
            kind: OutcomeKind::Success(
                StructuredArtifact::new("Base = declarative_base()".into(), "one".into(), 9)
                    .unwrap(),
            ),
            diagnostics: Vec::new(),
        });
        let failed = VersionedResult::new(ConversionOutcome {
            unit_label: "b.png".to_string(),
            mode: ProcessingMode::Separate,
            source_paths: vec![PathBuf::from("b.png")],
            config: Arc::new(config.clone()),
            kind: OutcomeKind::Failure {
                message: "boom".to_string(),
            },
            diagnostics: vec![UploadError::NothingUploaded { attempted: 1 }],
        });
        let results = vec![ok, failed];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        RunReport::new(&results, &config, ProcessingMode::Separate, false)
            .write(&path)
            .await
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["mode"], "separate");
        assert_eq!(value["results"][0]["label"], "a.png");
        assert_eq!(value["results"][0]["status"], "success");
        assert_eq!(value["results"][0]["token_usage"], 9);
        assert_eq!(value["results"][1]["status"], "failure");
        assert_eq!(value["results"][1]["code"], "boom");
        assert_eq!(value["results"][1]["diagnostics"].as_array().unwrap().len(), 1);
    }
}
