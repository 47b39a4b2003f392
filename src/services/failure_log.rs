//! 失败记录服务 - 业务能力层
//!
//! 只负责"把失败的单元追加写入 failures.txt"能力，不关心流程

use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// 失败记录服务
///
/// 职责：
/// - 将处理失败的单元追加到记录文件
/// - 只处理单个单元
/// - 不关心流程顺序
#[derive(Debug, Clone)]
pub struct FailureLog {
    log_file_path: PathBuf,
}

impl FailureLog {
    /// 使用默认文件名 `failures.txt`
    pub fn new() -> Self {
        Self::with_path("failures.txt")
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            log_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.log_file_path
    }

    /// 追加一条失败记录
    ///
    /// # 参数
    /// - `label`: 单元标签
    /// - `message`: 失败原因
    pub async fn write(&self, label: &str, message: &str) -> std::io::Result<()> {
        debug!("写入失败记录: {} | 原因长度: {}", label, message.len());

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)
            .await?;

        let line = format!(
            "[{}] {} | {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            label,
            message.replace('\n', " ")
        );
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

impl Default for FailureLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = FailureLog::with_path(dir.path().join("failures.txt"));

        tokio_test::assert_ok!(log.write("a.png", "timeout").await);
        tokio_test::assert_ok!(log.write("b.png", "bad\njson").await);

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("a.png | timeout"));
        assert!(lines[1].ends_with("b.png | bad json"));
    }
}
