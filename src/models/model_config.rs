//! 模型参数配置
//!
//! 每次运行使用一份不可变快照，流水线本身从不修改它

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// 模型参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// 模型名称
    pub name: String,
    /// 采样温度，建议范围 [0, 1]（仅提示，不强制）
    pub temperature: f32,
    /// 最大输出 token 数
    pub max_tokens: Option<u32>,
    /// 是否校验 TLS 证书
    pub verify_tls: bool,
    /// 单次请求超时（秒）
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "GigaChat-2-Pro".to_string(),
            temperature: 0.1,
            max_tokens: None,
            verify_tls: false,
            timeout_seconds: 600,
        }
    }
}

/// 操作员输入的原始设置（全部为文本）
#[derive(Debug, Clone, Default)]
pub struct SettingsForm {
    pub name: String,
    pub temperature: String,
    pub max_tokens: String,
    pub timeout: String,
}

impl ModelConfig {
    /// 应用操作员输入的设置
    ///
    /// 所有字段先全部校验，任何一个失败都返回错误且保持原配置不变。
    pub fn apply_settings(&mut self, form: &SettingsForm) -> Result<(), ConfigError> {
        let name = match form.name.trim() {
            "" => self.name.clone(),
            name => name.to_string(),
        };
        let temperature = parse_temperature(&form.temperature)?.unwrap_or(self.temperature);
        let max_tokens = parse_max_tokens(&form.max_tokens)?;
        let timeout_seconds = parse_timeout(&form.timeout)?.unwrap_or(self.timeout_seconds);

        self.name = name;
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self.timeout_seconds = timeout_seconds;
        Ok(())
    }

    /// 校验直接反序列化得到的参数（如来自 TOML 文件）
    ///
    /// 超时为 0 时报错；max_tokens 为 0 视为不限制。
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.timeout_seconds == 0 {
            return Err(ConfigError::OutOfRange {
                field: "timeout".to_string(),
                reason: "超时必须大于 0".to_string(),
            });
        }
        if !self.temperature.is_finite() {
            return Err(ConfigError::parse_failed(
                "temperature",
                self.temperature.to_string(),
                "有限浮点数",
            ));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            warn!("⚠️ temperature = {} 超出建议范围 [0, 1]", self.temperature);
        }
        if self.max_tokens == Some(0) {
            self.max_tokens = None;
        }
        Ok(())
    }

    /// 用于保存合并结果的文件名
    pub fn output_file_name(&self) -> String {
        format!("models_{}.py", self.name.replace('-', "_"))
    }
}

/// 解析温度，空值表示沿用原值
pub(crate) fn parse_temperature(raw: &str) -> Result<Option<f32>, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let value: f32 = raw
        .parse()
        .map_err(|_| ConfigError::parse_failed("temperature", raw, "浮点数"))?;
    if !value.is_finite() {
        return Err(ConfigError::parse_failed("temperature", raw, "有限浮点数"));
    }
    if !(0.0..=1.0).contains(&value) {
        warn!("⚠️ temperature = {} 超出建议范围 [0, 1]", value);
    }
    Ok(Some(value))
}

/// 解析最大 token 数，空值或 0 表示不限制
pub(crate) fn parse_max_tokens(raw: &str) -> Result<Option<u32>, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let value: u32 = raw
        .parse()
        .map_err(|_| ConfigError::parse_failed("max_tokens", raw, "非负整数"))?;
    Ok((value > 0).then_some(value))
}

/// 解析超时，空值表示沿用原值
pub(crate) fn parse_timeout(raw: &str) -> Result<Option<u64>, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let value: u64 = raw
        .parse()
        .map_err(|_| ConfigError::parse_failed("timeout", raw, "正整数"))?;
    if value == 0 {
        return Err(ConfigError::OutOfRange {
            field: "timeout".to_string(),
            reason: "超时必须大于 0".to_string(),
        });
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, temperature: &str, max_tokens: &str, timeout: &str) -> SettingsForm {
        SettingsForm {
            name: name.to_string(),
            temperature: temperature.to_string(),
            max_tokens: max_tokens.to_string(),
            timeout: timeout.to_string(),
        }
    }

    #[test]
    fn test_apply_valid_settings() {
        let mut config = ModelConfig::default();
        config
            .apply_settings(&form("GigaChat-2-Max", "0.3", "2048", "120"))
            .unwrap();

        assert_eq!(config.name, "GigaChat-2-Max");
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.max_tokens, Some(2048));
        assert_eq!(config.timeout_seconds, 120);
    }

    #[test]
    fn test_non_numeric_temperature_keeps_previous_config() {
        let mut config = ModelConfig::default();
        let before = config.clone();

        let err = config
            .apply_settings(&form("Other", "warm", "", "30"))
            .unwrap_err();

        assert!(matches!(err, ConfigError::ParseFailed { ref field, .. } if field == "temperature"));
        assert_eq!(config, before);
    }

    #[test]
    fn test_zero_max_tokens_means_unlimited() {
        let mut config = ModelConfig {
            max_tokens: Some(10),
            ..ModelConfig::default()
        };
        config.apply_settings(&form("", "", "0", "")).unwrap();
        assert_eq!(config.max_tokens, None);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = ModelConfig::default();
        assert!(config.apply_settings(&form("", "", "", "0")).is_err());
        assert_eq!(config.timeout_seconds, 600);
    }

    #[test]
    fn test_validate_deserialized_values() {
        let mut config = ModelConfig {
            max_tokens: Some(0),
            ..ModelConfig::default()
        };
        config.validate().unwrap();
        assert_eq!(config.max_tokens, None);

        let mut config = ModelConfig {
            timeout_seconds: 0,
            ..ModelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_output_file_name_replaces_dashes() {
        let config = ModelConfig::default();
        assert_eq!(config.output_file_name(), "models_GigaChat_2_Pro.py");
    }
}
