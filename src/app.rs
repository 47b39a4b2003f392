//! 应用入口 - 编排层之上
//!
//! ## 职责
//!
//! 1. **应用初始化**：检查凭据、初始化日志文件、创建生成服务和后台任务
//! 2. **运行**：扫描目录，启动后台运行，转发 Ctrl-C 取消，消费事件
//! 3. **收尾**：保存全部结果、输出统计、写报告、可选进入审阅会话

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::OpenAiService;
use crate::models::{require_images, ProcessingMode};
use crate::orchestrator::{BatchOrchestrator, BatchReport, ConversionWorker, RunEvent};
use crate::services::{result_writer, FailureLog, PromptAssembler, RunReport};
use crate::session::ReviewSession;
use crate::utils::logging::{init_log_file, log_startup, print_final_stats};

/// 一次命令行运行的选项
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub folder: PathBuf,
    pub mode: ProcessingMode,
    /// 运行结束后进入审阅会话
    pub review: bool,
    /// JSON 报告路径
    pub report: Option<PathBuf>,
}

/// 应用主结构
pub struct App {
    config: Config,
    options: RunOptions,
    worker: ConversionWorker,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config, options: RunOptions) -> Result<Self> {
        config.require_credentials()?;

        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(&config.model, options.mode);

        let service = OpenAiService::new(&config, &config.model)?;
        let assembler = match &config.prompt_file {
            Some(path) => PromptAssembler::from_file(path).await,
            None => PromptAssembler::new(),
        };
        let orchestrator = BatchOrchestrator::new(Arc::new(service), assembler, config.model.clone())
            .with_failure_log(FailureLog::with_path(&config.failure_log_file));

        Ok(Self {
            config,
            options,
            worker: ConversionWorker::new(Arc::new(orchestrator)),
        })
    }

    /// 运行应用主逻辑
    pub async fn run(mut self) -> Result<()> {
        info!("\n📁 正在扫描图像目录: {}", self.options.folder.display());
        let images = require_images(&self.options.folder).await?;
        info!("✓ 找到 {} 张图像", images.len());

        let mut handle = self.worker.start(images, self.options.mode).await;

        let token = handle.cancel_token();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("🛑 收到 Ctrl-C，将在当前单元完成后停止");
                token.cancel();
            }
        });

        let mut report = BatchReport::default();
        while let Some(event) = handle.next_event().await {
            log_event(&event);
            report.record(event);
        }
        ctrl_c.abort();
        self.worker.stop().await;

        if let Some(message) = &report.failure {
            error!("❌ 运行意外中止: {}", message);
        }

        if !report.results.is_empty() {
            result_writer::save_all(&report.results, &self.config.output_dir).await?;
        }

        print_final_stats(
            report.success_count(),
            report.failure_count(),
            report.cancelled(),
            &self.config.output_log_file,
        );

        if let Some(path) = &self.options.report {
            RunReport::new(
                &report.results,
                &self.config.model,
                self.options.mode,
                report.cancelled(),
            )
            .write(path)
            .await?;
        }

        if self.options.review {
            let mut session = ReviewSession::new(report.results, self.config.output_dir.clone());
            session.run_console().await?;
        }

        Ok(())
    }
}

fn log_event(event: &RunEvent) {
    match event {
        RunEvent::UnitCompleted {
            index,
            total,
            result,
        } => {
            if result.is_error() {
                warn!("[{}/{}] ❌ {}", index + 1, total, result.label());
            } else {
                info!(
                    "[{}/{}] ✅ {} (token 用量: {})",
                    index + 1,
                    total,
                    result.label(),
                    result.token_usage()
                );
            }
        }
        RunEvent::RunFailed { message } => error!("❌ {}", message),
        RunEvent::Progress(_) | RunEvent::RunCompleted(_) => {}
    }
}
