//! # UML ORM Convert
//!
//! 把 UML 图像批量转换为 SQLAlchemy ORM 模型代码的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有与外部生成服务的连接，只暴露能力
//! - `GenerationService` - 上传附件、发送一次对话请求
//! - `OpenAiService` - OpenAI 兼容接口的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个结果
//! - `PromptAssembler` - 组装提示词
//! - `parse_reply` - 解析并校验回复
//! - `result_writer` / `RunReport` / `FailureLog` - 保存结果、报告和失败记录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个工作单元"的完整处理流程
//! - `UnitCtx` - 上下文封装（序号 + 标签）
//! - `ChainInvoker` - 流程编排（upload → invoke → parse → prefix）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_orchestrator` - 按模式顺序处理全部单元，报告进度
//! - `orchestrator/worker` - 后台任务，保证同一时间只有一次运行
//!
//! 结果带有线性编辑历史（`history/`），由审阅会话（`session`）修改。

pub mod app;
pub mod config;
pub mod error;
pub mod history;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod session;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::{App, RunOptions};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use history::{VersionHistory, VersionedResult};
pub use infrastructure::{GenerationService, OpenAiService};
pub use models::{ConversionOutcome, ModelConfig, ProcessingMode, WorkUnit};
pub use orchestrator::{BatchOrchestrator, BatchReport, ConversionWorker, RunEvent};
pub use services::PromptAssembler;
pub use session::ReviewSession;
pub use workflow::{ChainInvoker, UnitCtx};
