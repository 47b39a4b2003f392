//! 编排层（Orchestrator）
//!
//! - `batch_orchestrator`：按顺序驱动一次运行的所有单元
//! - `worker`：在后台任务中执行运行，保证同一时间只有一次运行
//! - `events`：运行向调用方报告的事件

pub mod batch_orchestrator;
pub mod events;
pub mod worker;

pub use batch_orchestrator::BatchOrchestrator;
pub use events::{ProgressEvent, RunEvent, RunSummary};
pub use worker::{BatchReport, ConversionWorker, RunHandle};
