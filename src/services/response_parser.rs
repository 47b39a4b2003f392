//! 响应解析服务 - 业务能力层
//!
//! 只负责把服务的原始回复解析并校验为结构化结果

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::ValidationError;
use crate::infrastructure::ServiceReply;
use crate::models::StructuredArtifact;
use crate::utils::truncate_text;

/// 服务返回的原始 JSON 结构
#[derive(Debug, Deserialize)]
struct RawArtifact {
    code: String,
    summary: String,
    #[serde(default)]
    token_usage: u64,
}

fn fenced_block() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n(.*?)```").expect("静态正则表达式")
    })
}

/// 从回复文本中提取 JSON 对象文本
///
/// 优先取第一个 Markdown 代码块，否则取最外层的 `{...}`。
fn extract_json(content: &str) -> Result<&str, ValidationError> {
    let candidate = fenced_block()
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(content);

    let start = candidate.find('{');
    let end = candidate.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(&candidate[start..=end]),
        _ => Err(ValidationError::NoJsonObject {
            excerpt: truncate_text(content.trim(), 120),
        }),
    }
}

/// 解析并校验服务回复
///
/// token 用量优先取服务报告的值，其次取 JSON 中的值，缺省为 0。
pub fn parse_reply(reply: &ServiceReply) -> Result<StructuredArtifact, ValidationError> {
    let json_text = extract_json(&reply.content)?;
    let raw: RawArtifact =
        serde_json::from_str(json_text).map_err(|source| ValidationError::Malformed {
            excerpt: truncate_text(json_text, 120),
            source,
        })?;

    let token_usage = reply.token_usage.unwrap_or(raw.token_usage);
    debug!(
        "解析成功: 代码 {} 字符，token 用量 {}",
        raw.code.chars().count(),
        token_usage
    );

    StructuredArtifact::new(raw.code, raw.summary, token_usage)
}
