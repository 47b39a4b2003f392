use std::path::PathBuf;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入目录相关错误（运行开始前即失败）
    #[error("输入错误: {0}")]
    Input(#[from] InputError),
    /// 附件上传错误
    #[error("上传错误: {0}")]
    Upload(#[from] UploadError),
    /// 外部服务调用错误
    #[error("调用错误: {0}")]
    Invocation(#[from] InvocationError),
    /// 响应校验错误
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 结果保存错误
    #[error("保存错误: {0}")]
    Persist(#[from] PersistError),
}

/// 输入目录错误
#[derive(Debug, Error)]
pub enum InputError {
    /// 目录不存在或不是目录
    #[error("目录不存在: {}", path.display())]
    NotFound { path: PathBuf },
    /// 目录无法读取
    #[error("无法读取目录 {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 目录中没有支持格式的图像
    #[error("目录 {} 中没有支持格式的图像 (jpg, jpeg, png, bmp)", path.display())]
    NoImages { path: PathBuf },
}

/// 附件上传错误
///
/// 单个附件上传失败只作为诊断信息记录，不会单独导致单元失败。
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    /// 读取图像文件失败
    #[error("读取 {} 失败: {reason}", path.display())]
    ReadFailed { path: PathBuf, reason: String },
    /// 不支持的图像格式
    #[error("不支持的图像格式: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
    /// 服务端拒绝附件
    #[error("上传 {} 被拒绝: {reason}", path.display())]
    Rejected { path: PathBuf, reason: String },
    /// 单元内所有附件均上传失败
    #[error("{attempted} 个附件全部上传失败")]
    NothingUploaded { attempted: usize },
}

/// 外部服务调用错误
#[derive(Debug, Error)]
pub enum InvocationError {
    /// 请求超时
    #[error("请求超时 (模型: {model}, 超时: {seconds} 秒)")]
    Timeout { model: String, seconds: u64 },
    /// 鉴权失败
    #[error("鉴权失败 (模型: {model}): {message}")]
    Authentication { model: String, message: String },
    /// 传输层失败
    #[error("网络请求失败 (模型: {model}): {message}")]
    Transport { model: String, message: String },
    /// 服务返回错误或无法构造请求
    #[error("服务调用失败 (模型: {model}): {message}")]
    Service { model: String, message: String },
    /// 服务返回内容为空
    #[error("服务返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// 响应校验错误
#[derive(Debug, Error)]
pub enum ValidationError {
    /// 响应中找不到 JSON 对象
    #[error("响应中没有 JSON 对象: {excerpt}")]
    NoJsonObject { excerpt: String },
    /// JSON 结构不符合约定
    #[error("响应不符合结果结构: {source} (片段: {excerpt})")]
    Malformed {
        excerpt: String,
        #[source]
        source: serde_json::Error,
    },
    /// 代码中缺少声明式基类标记
    #[error("生成的代码不包含声明式基类标记 ({expected})")]
    MissingBaseMarker { expected: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 字段解析失败
    #[error("字段 {field} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    ParseFailed {
        field: String,
        value: String,
        expected_type: String,
    },
    /// 字段取值非法
    #[error("字段 {field} 取值非法: {reason}")]
    OutOfRange { field: String, reason: String },
    /// 缺少 API 密钥
    #[error("缺少 API 密钥，请设置环境变量 {var_name}")]
    MissingCredentials { var_name: String },
    /// 配置文件读取或解析失败
    #[error("配置文件 {} 加载失败: {reason}", path.display())]
    FileLoadFailed { path: PathBuf, reason: String },
    /// TOML 内容解析失败
    #[error("TOML 解析失败: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// HTTP 客户端构建失败
    #[error("HTTP 客户端构建失败: {0}")]
    HttpClient(String),
}

/// 结果保存错误
#[derive(Debug, Error)]
pub enum PersistError {
    /// 创建目录失败
    #[error("创建目录 {} 失败: {source}", path.display())]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件 {} 失败: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 审阅会话命令错误
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("未知命令: {0}，输入 help 查看可用命令")]
    UnknownCommand(String),
    #[error("命令 {0} 缺少参数")]
    MissingArgument(&'static str),
    #[error("无效的序号: {0}")]
    InvalidIndex(String),
    #[error("序号超出范围: {index} (共 {total} 个结果)")]
    OutOfRange { index: usize, total: usize },
    #[error("没有可审阅的结果")]
    NoResults,
    /// 读取编辑文件失败
    #[error("读取 {} 失败: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Persist(#[from] PersistError),
}

// ========== 便捷构造函数 ==========

impl ConfigError {
    /// 创建字段解析失败错误
    pub fn parse_failed(
        field: impl Into<String>,
        value: impl Into<String>,
        expected_type: impl Into<String>,
    ) -> Self {
        ConfigError::ParseFailed {
            field: field.into(),
            value: value.into(),
            expected_type: expected_type.into(),
        }
    }
}

impl InvocationError {
    /// 按错误文本归类外部服务错误
    ///
    /// `transport` 为 true 时表示底层 HTTP 传输失败。
    pub fn classify(model: impl Into<String>, message: impl Into<String>, transport: bool) -> Self {
        let model = model.into();
        let message = message.into();
        let lower = message.to_lowercase();
        let auth_hint = ["401", "403", "unauthorized", "forbidden", "api key", "credentials"]
            .iter()
            .any(|needle| lower.contains(needle));

        if auth_hint {
            InvocationError::Authentication { model, message }
        } else if transport {
            InvocationError::Transport { model, message }
        } else {
            InvocationError::Service { model, message }
        }
    }

    /// 是否为鉴权问题（用于给操作员提示检查密钥）
    pub fn is_authentication(&self) -> bool {
        matches!(self, InvocationError::Authentication { .. })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
