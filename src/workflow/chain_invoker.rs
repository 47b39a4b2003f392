//! 单元调用流程 - 流程层
//!
//! 核心职责：定义"一个工作单元"的完整处理流程
//!
//! 流程顺序：
//! 1. 逐个上传附件（失败的附件记录诊断后跳过）
//! 2. 组合提示词与附件，发送一次请求（受超时约束）
//! 3. 解析并校验回复
//! 4. 在代码开头加上源图像注释
//!
//! 任何一步失败都转换为 `Failure` 结果，从不向上抛出。不做重试。

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult, InvocationError, UploadError};
use crate::infrastructure::{Attachment, ChatRequest, GenerationService};
use crate::models::{
    ConversionOutcome, ModelConfig, OutcomeKind, ProcessingMode, StructuredArtifact, WorkUnit,
};
use crate::services::{parse_reply, AssembledPrompt};
use crate::workflow::unit_ctx::UnitCtx;

/// 随附件一起发送的用户文本
const USER_TEXT: &str = "Convert the attached UML diagram images into SQLAlchemy ORM models.";

/// 单元调用流程
///
/// - 持有共享的提示词和模型参数快照
/// - 只依赖生成服务能力
/// - 不关心批次、进度和取消
pub struct ChainInvoker {
    service: Arc<dyn GenerationService>,
    prompt: AssembledPrompt,
    config: Arc<ModelConfig>,
}

impl ChainInvoker {
    /// 创建新的调用流程
    pub fn new(
        service: Arc<dyn GenerationService>,
        prompt: AssembledPrompt,
        config: Arc<ModelConfig>,
    ) -> Self {
        Self {
            service,
            prompt,
            config,
        }
    }

    /// 处理一个工作单元，总是返回结果（成功或失败）
    pub async fn invoke(&self, unit: &WorkUnit, ctx: &UnitCtx) -> ConversionOutcome {
        let mut diagnostics = Vec::new();

        let kind = match self.run(unit, ctx, &mut diagnostics).await {
            Ok(artifact) => {
                info!(
                    "{} ✓ 生成成功 (token 用量: {})",
                    ctx,
                    artifact.token_usage()
                );
                OutcomeKind::Success(artifact.with_code_prefix(&unit.source_comment()))
            }
            Err(e) => {
                error!("{} ❌ 处理失败: {}", ctx, e);
                if let AppError::Invocation(inner) = &e {
                    if inner.is_authentication() {
                        error!("{} 请检查 API 密钥是否正确", ctx);
                    }
                }
                OutcomeKind::Failure {
                    message: failure_message(unit, &e),
                }
            }
        };

        ConversionOutcome {
            unit_label: unit.label(),
            mode: unit.mode(),
            source_paths: unit.paths().to_vec(),
            config: Arc::clone(&self.config),
            kind,
            diagnostics,
        }
    }

    async fn run(
        &self,
        unit: &WorkUnit,
        ctx: &UnitCtx,
        diagnostics: &mut Vec<UploadError>,
    ) -> AppResult<StructuredArtifact> {
        // ========== 步骤 1: 上传附件 ==========
        let attachments = self.upload_all(unit, ctx, diagnostics).await?;

        // ========== 步骤 2: 调用服务 ==========
        info!(
            "{} 🤖 正在调用模型 {} ({} 个附件)...",
            ctx,
            self.config.name,
            attachments.len()
        );
        let request = ChatRequest {
            prompt: self.prompt.text(),
            user_text: USER_TEXT,
            attachments: &attachments,
            config: &self.config,
        };
        let seconds = self.config.timeout_seconds;
        let reply = tokio::time::timeout(Duration::from_secs(seconds), self.service.complete(request))
            .await
            .map_err(|_| InvocationError::Timeout {
                model: self.config.name.clone(),
                seconds,
            })??;

        // ========== 步骤 3: 解析校验 ==========
        Ok(parse_reply(&reply)?)
    }

    /// 逐个上传附件
    ///
    /// 单个失败只记录诊断并跳过；全部失败时整个单元失败。
    async fn upload_all(
        &self,
        unit: &WorkUnit,
        ctx: &UnitCtx,
        diagnostics: &mut Vec<UploadError>,
    ) -> Result<Vec<Attachment>, UploadError> {
        let mut attachments = Vec::with_capacity(unit.paths().len());

        for path in unit.paths() {
            let name = path.file_name().unwrap_or_default().to_string_lossy();
            match self.service.upload(path).await {
                Ok(attachment) => {
                    info!("{} ✅ 已上传: {}", ctx, name);
                    attachments.push(attachment);
                }
                Err(e) => {
                    warn!("{} ⚠️ 上传失败 {}: {}", ctx, name, e);
                    diagnostics.push(e);
                }
            }
        }

        if attachments.is_empty() {
            return Err(UploadError::NothingUploaded {
                attempted: unit.paths().len(),
            });
        }
        Ok(attachments)
    }
}

/// 失败结果中保存的文本
fn failure_message(unit: &WorkUnit, err: &AppError) -> String {
    match unit.mode() {
        ProcessingMode::Combined => format!("合并图像处理失败: {}", err),
        ProcessingMode::Separate => format!("❌ 处理 {} 失败: {}", unit.label(), err),
    }
}
