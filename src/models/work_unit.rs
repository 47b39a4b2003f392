use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// 处理模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// 所有图像合并为一次请求
    Combined,
    /// 每张图像单独请求
    Separate,
}

impl ProcessingMode {
    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            ProcessingMode::Combined => "combined",
            ProcessingMode::Separate => "separate",
        }
    }

    /// 从名称解析模式
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "combined" | "1" => Some(ProcessingMode::Combined),
            "separate" | "2" => Some(ProcessingMode::Separate),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 工作单元：一次请求所包含的图像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    paths: Vec<PathBuf>,
    mode: ProcessingMode,
}

impl WorkUnit {
    /// 合并模式：整组图像作为一个单元；空列表返回 None
    pub fn combined(paths: Vec<PathBuf>) -> Option<Self> {
        if paths.is_empty() {
            return None;
        }
        Some(Self {
            paths,
            mode: ProcessingMode::Combined,
        })
    }

    /// 分离模式：单张图像作为一个单元
    pub fn single(path: PathBuf) -> Self {
        Self {
            paths: vec![path],
            mode: ProcessingMode::Separate,
        }
    }

    /// 按模式把扫描结果拆分为工作单元（保持扫描顺序）
    pub fn plan(paths: &[PathBuf], mode: ProcessingMode) -> Vec<Self> {
        match mode {
            ProcessingMode::Combined => Self::combined(paths.to_vec()).into_iter().collect(),
            ProcessingMode::Separate => paths.iter().cloned().map(Self::single).collect(),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    /// 图像文件名列表（不含目录）
    pub fn file_names(&self) -> Vec<String> {
        self.paths.iter().map(|p| file_name_of(p)).collect()
    }

    /// 单元标签：合并模式为 "combined"，分离模式为图像文件名
    pub fn label(&self) -> String {
        match self.mode {
            ProcessingMode::Combined => "combined".to_string(),
            ProcessingMode::Separate => self
                .paths
                .first()
                .map(|p| file_name_of(p))
                .unwrap_or_default(),
        }
    }

    /// 写在生成代码开头的注释行
    pub fn source_comment(&self) -> String {
        match self.mode {
            ProcessingMode::Combined => {
                format!("# Code for images: {}", self.file_names().join(", "))
            }
            ProcessingMode::Separate => format!("# Code for image: {}", self.label()),
        }
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}
