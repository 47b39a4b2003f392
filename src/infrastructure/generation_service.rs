//! 生成服务接口 - 基础设施层
//!
//! 外部多模态生成服务只暴露两种能力：上传附件、发送一次对话请求。
//! 不认识工作单元、不处理流程，也不做重试。

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{InvocationError, UploadError};
use crate::models::loaders::mime_type_for;
use crate::models::ModelConfig;

/// 已上传的附件
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// 服务端可识别的附件标识（内联时为 data URL）
    pub id: String,
    /// 源文件路径
    pub source: PathBuf,
    /// 原始字节数
    pub size_bytes: usize,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // data URL 可能有几 MB，不打印
        f.debug_struct("Attachment")
            .field("source", &self.source)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

impl Attachment {
    /// 读取图像文件并编码为内联 data URL 附件
    pub async fn inline_from_file(path: &Path) -> Result<Self, UploadError> {
        let mime = mime_type_for(path).ok_or_else(|| UploadError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| UploadError::ReadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if bytes.is_empty() {
            return Err(UploadError::ReadFailed {
                path: path.to_path_buf(),
                reason: "文件为空".to_string(),
            });
        }

        let encoded = general_purpose::STANDARD.encode(&bytes);
        Ok(Self {
            id: format!("data:{};base64,{}", mime, encoded),
            source: path.to_path_buf(),
            size_bytes: bytes.len(),
        })
    }
}

/// 一次对话请求
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    /// 组装好的系统提示词
    pub prompt: &'a str,
    /// 随请求发送的用户文本
    pub user_text: &'a str,
    /// 成功上传的附件
    pub attachments: &'a [Attachment],
    /// 模型参数快照
    pub config: &'a ModelConfig,
}

/// 服务原始回复
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReply {
    /// 回复文本
    pub content: String,
    /// 服务报告的 token 用量
    pub token_usage: Option<u64>,
}

/// 外部生成服务
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// 上传单个附件
    async fn upload(&self, path: &Path) -> Result<Attachment, UploadError>;

    /// 发送一次请求并返回原始回复
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ServiceReply, InvocationError>;
}
