use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::models::model_config::{parse_max_tokens, parse_temperature, parse_timeout};
use crate::models::ModelConfig;

/// API 密钥所在的环境变量
pub const API_KEY_VAR: &str = "LLM_API_KEY";

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 服务配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    /// 默认模型参数
    pub model: ModelConfig,
    /// 自定义提示词文件（为空时使用内置提示词）
    pub prompt_file: Option<PathBuf>,
    /// 结果保存目录
    pub output_dir: PathBuf,
    /// 运行日志文件
    pub output_log_file: PathBuf,
    /// 失败记录文件
    pub failure_log_file: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://gigachat.devices.sberbank.ru/api/v1".to_string(),
            model: ModelConfig::default(),
            prompt_file: None,
            output_dir: PathBuf::from("."),
            output_log_file: PathBuf::from("output.txt"),
            failure_log_file: PathBuf::from("failures.txt"),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 按 默认值 → TOML 文件 → 环境变量 的顺序加载配置
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match config_file {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        base.with_env()
    }

    /// 只从环境变量加载
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env()
    }

    /// 从 TOML 文件加载，未出现的字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::TomlParse(e) => ConfigError::FileLoadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
            other => other,
        })
    }

    /// 解析 TOML 内容，模型参数与其他来源一样经过校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.model.validate()?;
        Ok(config)
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_vars(|name| std::env::var(name).ok())
    }

    /// 用任意变量来源覆盖配置（数值解析失败时报错而不是静默忽略）
    pub fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(v) = var(API_KEY_VAR) {
            self.llm_api_key = v;
        }
        if let Some(v) = var("LLM_API_BASE_URL") {
            self.llm_api_base_url = v;
        }
        if let Some(v) = var("LLM_MODEL_NAME") {
            self.model.name = v;
        }
        if let Some(v) = var("LLM_TEMPERATURE") {
            if let Some(t) = parse_temperature(&v)? {
                self.model.temperature = t;
            }
        }
        if let Some(v) = var("LLM_MAX_TOKENS") {
            self.model.max_tokens = parse_max_tokens(&v)?;
        }
        if let Some(v) = var("LLM_TIMEOUT") {
            if let Some(t) = parse_timeout(&v)? {
                self.model.timeout_seconds = t;
            }
        }
        if let Some(v) = var("LLM_VERIFY_TLS") {
            self.model.verify_tls = parse_bool("LLM_VERIFY_TLS", &v)?;
        }
        if let Some(v) = var("PROMPT_FILE") {
            self.prompt_file = Some(PathBuf::from(v));
        }
        if let Some(v) = var("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = var("OUTPUT_LOG_FILE") {
            self.output_log_file = PathBuf::from(v);
        }
        if let Some(v) = var("VERBOSE_LOGGING") {
            self.verbose_logging = parse_bool("VERBOSE_LOGGING", &v)?;
        }
        Ok(self)
    }

    /// 运行前检查凭据
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredentials {
                var_name: API_KEY_VAR.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_bool(var_name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::parse_failed(var_name, value, "布尔值")),
    }
}
