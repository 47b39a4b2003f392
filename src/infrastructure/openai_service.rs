//! OpenAI 兼容的多模态服务实现
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 GigaChat 代理、Azure 等）

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ConfigError, InvocationError, UploadError};
use crate::infrastructure::generation_service::{
    Attachment, ChatRequest, GenerationService, ServiceReply,
};
use crate::models::ModelConfig;

/// OpenAI 兼容服务
///
/// 职责：
/// - 把附件编码为内联图片
/// - 发送一次 Vision 对话请求
/// - 不解析结果、不重试
pub struct OpenAiService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl OpenAiService {
    /// 创建服务
    ///
    /// TLS 校验与 HTTP 超时取自本次运行的模型参数快照。
    pub fn new(config: &Config, model: &ModelConfig) -> Result<Self, ConfigError> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!model.verify_tls)
            .timeout(Duration::from_secs(model.timeout_seconds))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let client = Client::with_config(openai_config).with_http_client(http_client);

        Ok(Self {
            client,
            model_name: model.name.clone(),
        })
    }

    fn build_messages(
        &self,
        request: &ChatRequest<'_>,
    ) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(request.prompt)
            .build()?;

        // 文本部分 + 每个附件一个图片部分
        let mut content_parts: Vec<ChatCompletionRequestUserMessageContentPart> = Vec::new();
        content_parts.push(ChatCompletionRequestUserMessageContentPart::Text(
            ChatCompletionRequestMessageContentPartText {
                text: request.user_text.to_string(),
            },
        ));
        for attachment in request.attachments {
            content_parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: attachment.id.clone(),
                        detail: Some(ImageDetail::High),
                    },
                },
            ));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
            .build()?;

        Ok(vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ])
    }

    fn map_error(&self, err: OpenAIError) -> InvocationError {
        let transport = matches!(err, OpenAIError::Reqwest(_));
        InvocationError::classify(&self.model_name, err.to_string(), transport)
    }
}

#[async_trait]
impl GenerationService for OpenAiService {
    async fn upload(&self, path: &Path) -> Result<Attachment, UploadError> {
        let attachment = Attachment::inline_from_file(path).await?;
        debug!(
            "附件已编码: {} ({} 字节)",
            path.file_name().unwrap_or_default().to_string_lossy(),
            attachment.size_bytes
        );
        Ok(attachment)
    }

    async fn complete(&self, request: ChatRequest<'_>) -> Result<ServiceReply, InvocationError> {
        debug!(
            "调用生成服务，模型: {}，附件: {} 个",
            request.config.name,
            request.attachments.len()
        );

        let messages = self.build_messages(&request).map_err(|e| self.map_error(e))?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&request.config.name)
            .messages(messages)
            .temperature(request.config.temperature);
        if let Some(max_tokens) = request.config.max_tokens {
            builder.max_tokens(max_tokens);
        }
        let chat_request = builder.build().map_err(|e| self.map_error(e))?;

        let response = self.client.chat().create(chat_request).await.map_err(|e| {
            warn!("生成服务调用失败: {}", e);
            self.map_error(e)
        })?;

        debug!("生成服务调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| InvocationError::EmptyContent {
                model: request.config.name.clone(),
            })?;

        Ok(ServiceReply {
            content,
            token_usage: response.usage.map(|usage| u64::from(usage.total_tokens)),
        })
    }
}
