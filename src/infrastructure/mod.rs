//! 基础设施层（Infrastructure）
//!
//! 持有与外部生成服务的连接，只暴露能力

pub mod generation_service;
pub mod openai_service;

pub use generation_service::{Attachment, ChatRequest, GenerationService, ServiceReply};
pub use openai_service::OpenAiService;
