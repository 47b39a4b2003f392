//! 运行事件
//!
//! 后台运行通过事件通道向调用方报告进度和结果

use crate::history::VersionedResult;

/// 进度事件，百分比在一次运行内单调不减
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub percent: u8,
    pub message: String,
}

/// 一次运行的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// 计划处理的单元数
    pub total: usize,
    /// 实际处理完成的单元数
    pub completed: usize,
    pub success: usize,
    pub failed: usize,
    /// 是否在全部单元完成前被取消
    pub cancelled: bool,
}

/// 后台运行发出的事件
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// 进度更新
    Progress(ProgressEvent),

    /// 一个单元处理完成（成功或失败），按提交顺序发出
    UnitCompleted {
        index: usize,
        total: usize,
        result: VersionedResult,
    },

    /// 运行结束（正常完成或被取消）
    RunCompleted(RunSummary),

    /// 运行意外中止
    RunFailed { message: String },
}
