//! 单元处理上下文
//!
//! 封装"我正在处理第几个单元、它叫什么"这一信息

use std::fmt::Display;

/// 单元处理上下文
#[derive(Debug, Clone)]
pub struct UnitCtx {
    /// 单元序号（从1开始，仅用于日志显示）
    pub unit_index: usize,

    /// 本次运行的单元总数
    pub total_units: usize,

    /// 单元标签
    pub label: String,
}

impl UnitCtx {
    /// 创建新的单元上下文
    pub fn new(unit_index: usize, total_units: usize, label: impl Into<String>) -> Self {
        Self {
            unit_index,
            total_units,
            label: label.into(),
        }
    }
}

impl Display for UnitCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[单元 {}/{} {}]",
            self.unit_index, self.total_units, self.label
        )
    }
}
