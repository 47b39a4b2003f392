//! 批量转换编排器 - 编排层
//!
//! ## 职责
//!
//! 1. **组装提示词**：每次运行只组装一次，所有单元共享
//! 2. **规划单元**：按处理模式把图像列表拆成工作单元
//! 3. **顺序处理**：逐个调用单元流程，单元之间检查取消
//! 4. **报告进度**：进度百分比单调不减，每个单元完成立即发出结果
//! 5. **隔离失败**：单元失败只影响自身，后续单元继续处理
//!
//! ## 设计特点
//!
//! - **不处理单元细节**：委托 `ChainInvoker`
//! - **取消只在单元边界生效**：正在进行的请求会完成，但结果仍然发出

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::history::VersionedResult;
use crate::infrastructure::GenerationService;
use crate::models::{ConversionOutcome, ModelConfig, ProcessingMode, WorkUnit};
use crate::orchestrator::events::{ProgressEvent, RunEvent, RunSummary};
use crate::services::{FailureLog, PromptAssembler};
use crate::workflow::{ChainInvoker, UnitCtx};

const PERCENT_ASSEMBLING: u8 = 10;
const PERCENT_ASSEMBLED: u8 = 30;
const PERCENT_UNITS_START: usize = 40;
const PERCENT_UNITS_SPAN: usize = 50;
const PERCENT_DONE: u8 = 100;

/// 批量转换编排器
pub struct BatchOrchestrator {
    service: Arc<dyn GenerationService>,
    assembler: PromptAssembler,
    config: Arc<ModelConfig>,
    failure_log: Option<FailureLog>,
}

impl BatchOrchestrator {
    /// 创建编排器，模型参数在此刻固定为本编排器所有运行的快照
    pub fn new(
        service: Arc<dyn GenerationService>,
        assembler: PromptAssembler,
        config: ModelConfig,
    ) -> Self {
        Self {
            service,
            assembler,
            config: Arc::new(config),
            failure_log: None,
        }
    }

    /// 失败单元额外追加到记录文件
    pub fn with_failure_log(mut self, failure_log: FailureLog) -> Self {
        self.failure_log = Some(failure_log);
        self
    }

    /// 执行一次运行
    ///
    /// 事件按顺序发送到 `events`；调用方不再接收事件时视同取消。
    pub async fn run(
        &self,
        images: Vec<PathBuf>,
        mode: ProcessingMode,
        cancel: &CancellationToken,
        events: &UnboundedSender<RunEvent>,
    ) -> RunSummary {
        let mut emitter = Emitter::new(events);

        // ========== 组装提示词 ==========
        emitter.progress(PERCENT_ASSEMBLING, "构建处理链...");
        let prompt = self.assembler.assemble();
        let invoker = ChainInvoker::new(Arc::clone(&self.service), prompt, Arc::clone(&self.config));
        emitter.progress(PERCENT_ASSEMBLED, "处理图像...");

        // ========== 规划并处理单元 ==========
        let units = WorkUnit::plan(&images, mode);
        let total = units.len();
        let mut summary = RunSummary {
            total,
            ..Default::default()
        };
        log_run_start(mode, images.len(), total);

        for (index, unit) in units.iter().enumerate() {
            if cancel.is_cancelled() || emitter.is_closed() {
                warn!("🛑 处理已取消，剩余 {} 个单元未处理", total - index);
                summary.cancelled = true;
                break;
            }

            let label = unit.label();
            let start_message = match mode {
                ProcessingMode::Combined => format!("合并处理 {} 张图像", unit.paths().len()),
                ProcessingMode::Separate => format!("处理图像: {}", label),
            };
            emitter.progress(unit_percent(index, total), start_message);

            let ctx = UnitCtx::new(index + 1, total, label.clone());
            let outcome = invoker.invoke(unit, &ctx).await;

            if outcome.is_success() {
                summary.success += 1;
            } else {
                summary.failed += 1;
                self.record_failure(&outcome).await;
            }
            summary.completed += 1;

            emitter.send(RunEvent::UnitCompleted {
                index,
                total,
                result: VersionedResult::new(outcome),
            });

            emitter.progress(unit_percent(index + 1, total), format!("完成: {}", label));
        }

        if summary.cancelled {
            let current = emitter.last_percent;
            emitter.progress(current, "处理已取消");
        } else {
            emitter.progress(PERCENT_DONE, "处理完成!");
        }
        log_run_complete(&summary);
        emitter.send(RunEvent::RunCompleted(summary));

        summary
    }

    async fn record_failure(&self, outcome: &ConversionOutcome) {
        if let Some(log) = &self.failure_log {
            if let Err(e) = log.write(&outcome.unit_label, outcome.seed_text()).await {
                warn!("⚠️ 写入失败记录 {} 失败: {}", log.path().display(), e);
            }
        }
    }
}

/// 第 `index` 个单元开始时的进度
fn unit_percent(index: usize, total: usize) -> u8 {
    if total == 0 {
        return PERCENT_UNITS_START as u8;
    }
    (PERCENT_UNITS_START + index.min(total) * PERCENT_UNITS_SPAN / total) as u8
}

/// 事件发送器，保证进度单调
struct Emitter<'a> {
    events: &'a UnboundedSender<RunEvent>,
    last_percent: u8,
    closed: bool,
}

impl<'a> Emitter<'a> {
    fn new(events: &'a UnboundedSender<RunEvent>) -> Self {
        Self {
            events,
            last_percent: 0,
            closed: false,
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn progress(&mut self, percent: u8, message: impl Into<String>) {
        self.last_percent = self.last_percent.max(percent.min(PERCENT_DONE));
        let message = message.into();
        info!("[{:>3}%] {}", self.last_percent, message);
        self.send(RunEvent::Progress(ProgressEvent {
            percent: self.last_percent,
            message,
        }));
    }

    fn send(&mut self, event: RunEvent) {
        if self.closed {
            return;
        }
        if self.events.send(event).is_err() {
            warn!("⚠️ 事件接收方已关闭");
            self.closed = true;
        }
    }
}

// ========== 日志辅助函数 ==========

fn log_run_start(mode: ProcessingMode, images: usize, units: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理: {} 张图像, {} 个单元 ({})", images, units, mode.name());
    info!("{}", "=".repeat(60));
}

fn log_run_complete(summary: &RunSummary) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 运行结束: 成功 {}/{}, 失败 {}{}",
        summary.success,
        summary.total,
        summary.failed,
        if summary.cancelled { " (已取消)" } else { "" }
    );
    info!("{}", "─".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_percent_spans_forty_to_ninety() {
        assert_eq!(unit_percent(0, 4), 40);
        assert_eq!(unit_percent(1, 4), 52);
        assert_eq!(unit_percent(4, 4), 90);
        assert_eq!(unit_percent(0, 1), 40);
        assert_eq!(unit_percent(0, 0), 40);
    }

    #[test]
    fn test_emitter_never_goes_backwards() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut emitter = Emitter::new(&tx);

        emitter.progress(30, "a");
        emitter.progress(10, "b");
        emitter.progress(120, "c");

        let percents: Vec<u8> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|event| match event {
                RunEvent::Progress(p) => p.percent,
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(percents, vec![30, 30, 100]);
    }

    #[test]
    fn test_emitter_marks_closed_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        let mut emitter = Emitter::new(&tx);

        emitter.progress(10, "a");
        assert!(emitter.is_closed());
    }
}
