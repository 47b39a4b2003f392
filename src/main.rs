use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use uml_orm_convert::models::SettingsForm;
use uml_orm_convert::utils::logging;
use uml_orm_convert::{App, Config, ProcessingMode, RunOptions};

/// 把 UML 图像转换为 SQLAlchemy ORM 模型
#[derive(Parser, Debug)]
#[command(name = "uml_orm_convert", version, about)]
struct Cli {
    /// 图像目录
    folder: PathBuf,

    /// 处理模式 (combined, separate)
    #[arg(short, long, default_value = "combined", value_parser = parse_mode)]
    mode: ProcessingMode,

    /// 结果输出目录
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 自定义提示词文件
    #[arg(long)]
    prompt: Option<PathBuf>,

    /// TOML 配置文件
    #[arg(short, long, env = "UML_ORM_CONFIG")]
    config: Option<PathBuf>,

    /// 模型名称
    #[arg(long)]
    model: Option<String>,

    /// 采样温度
    #[arg(long)]
    temperature: Option<String>,

    /// 最大 token 数（0 表示不限制）
    #[arg(long)]
    max_tokens: Option<String>,

    /// 请求超时（秒）
    #[arg(long)]
    timeout: Option<String>,

    /// 运行结束后进入审阅会话
    #[arg(long)]
    review: bool,

    /// 写入 JSON 运行报告
    #[arg(long)]
    report: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

fn parse_mode(value: &str) -> Result<ProcessingMode, String> {
    ProcessingMode::from_str(value).ok_or_else(|| format!("未知的处理模式: {}", value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::load(cli.config.as_deref())?;

    // 初始化日志
    logging::init(cli.verbose || config.verbose_logging);

    // 命令行参数覆盖配置，校验失败时整体不生效
    let form = SettingsForm {
        name: cli.model.unwrap_or_default(),
        temperature: cli.temperature.unwrap_or_default(),
        max_tokens: cli.max_tokens.unwrap_or_else(|| {
            config
                .model
                .max_tokens
                .map(|n| n.to_string())
                .unwrap_or_default()
        }),
        timeout: cli.timeout.unwrap_or_default(),
    };
    config.model.apply_settings(&form)?;
    if let Some(prompt) = cli.prompt {
        config.prompt_file = Some(prompt);
    }
    if let Some(output) = cli.output {
        config.output_dir = output;
    }

    let options = RunOptions {
        folder: cli.folder,
        mode: cli.mode,
        review: cli.review,
        report: cli.report,
    };

    // 初始化并运行应用
    App::initialize(config, options).await?.run().await?;

    Ok(())
}
