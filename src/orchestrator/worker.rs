//! 后台转换任务 - 编排层
//!
//! 在独立的 tokio 任务中执行运行，调用方通过 `RunHandle` 接收事件。
//! 同一时间只有一次运行：启动新运行前先取消并等待上一次运行结束。

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::history::VersionedResult;
use crate::models::ProcessingMode;
use crate::orchestrator::batch_orchestrator::BatchOrchestrator;
use crate::orchestrator::events::{ProgressEvent, RunEvent, RunSummary};

struct ActiveRun {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// 后台转换任务
pub struct ConversionWorker {
    orchestrator: Arc<BatchOrchestrator>,
    active: Option<ActiveRun>,
}

impl ConversionWorker {
    pub fn new(orchestrator: Arc<BatchOrchestrator>) -> Self {
        Self {
            orchestrator,
            active: None,
        }
    }

    /// 启动一次新运行
    ///
    /// 如果上一次运行仍在进行，先取消它并等待其结束。
    pub async fn start(&mut self, images: Vec<PathBuf>, mode: ProcessingMode) -> RunHandle {
        self.stop().await;

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = Arc::clone(&self.orchestrator);
        let token = cancel.clone();

        let join = tokio::spawn(async move {
            let run = AssertUnwindSafe(orchestrator.run(images, mode, &token, &tx))
                .catch_unwind()
                .await;
            if let Err(panic) = run {
                let message = panic_message(panic.as_ref());
                error!("❌ 运行意外中止: {}", message);
                let _ = tx.send(RunEvent::RunFailed { message });
            }
        });

        self.active = Some(ActiveRun {
            cancel: cancel.clone(),
            join,
        });
        RunHandle { events: rx, cancel }
    }

    /// 取消当前运行并等待其结束
    pub async fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            if !active.join.is_finished() {
                info!("🛑 正在停止上一次运行...");
            }
            active.cancel.cancel();
            if let Err(e) = active.join.await {
                warn!("⚠️ 后台任务结束异常: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.join.is_finished())
    }
}

impl Drop for ConversionWorker {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知错误".to_string()
    }
}

/// 一次运行的句柄
pub struct RunHandle {
    events: UnboundedReceiver<RunEvent>,
    cancel: CancellationToken,
}

impl RunHandle {
    /// 等待下一个事件，运行结束且事件取完后返回 `None`
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// 请求在下一个单元边界停止
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 收集全部事件直到运行结束
    pub async fn collect(mut self) -> BatchReport {
        let mut report = BatchReport::default();
        while let Some(event) = self.next_event().await {
            report.record(event);
        }
        report
    }
}

/// 一次运行收到的全部内容
#[derive(Debug, Default)]
pub struct BatchReport {
    /// 按提交顺序排列的结果
    pub results: Vec<VersionedResult>,
    pub progress: Vec<ProgressEvent>,
    /// 正常结束或取消时的统计
    pub summary: Option<RunSummary>,
    /// 意外中止时的原因
    pub failure: Option<String>,
}

impl BatchReport {
    /// 记录一个事件
    pub fn record(&mut self, event: RunEvent) {
        match event {
            RunEvent::Progress(progress) => self.progress.push(progress),
            RunEvent::UnitCompleted { result, .. } => self.results.push(result),
            RunEvent::RunCompleted(summary) => self.summary = Some(summary),
            RunEvent::RunFailed { message } => self.failure = Some(message),
        }
    }

    pub fn cancelled(&self) -> bool {
        self.summary.is_some_and(|s| s.cancelled)
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_error()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_error()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let s: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(s.as_ref()), "boom");

        let s: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(s.as_ref()), "bang");

        let s: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(panic_message(s.as_ref()), "未知错误");
    }

    #[test]
    fn test_report_records_events() {
        let mut report = BatchReport::default();
        report.record(RunEvent::Progress(ProgressEvent {
            percent: 10,
            message: "a".to_string(),
        }));
        report.record(RunEvent::RunCompleted(RunSummary {
            total: 2,
            completed: 1,
            success: 1,
            failed: 0,
            cancelled: true,
        }));

        assert_eq!(report.progress.len(), 1);
        assert!(report.cancelled());
        assert!(report.failure.is_none());
    }
}
