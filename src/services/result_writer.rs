//! 结果保存服务 - 业务能力层
//!
//! 只负责把单个或全部结果写成 .py 文件，不关心结果是如何产生的

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, warn};

use crate::error::PersistError;
use crate::history::VersionedResult;
use crate::models::ProcessingMode;

/// 批量保存时使用的子目录
pub const RESULTS_SUBDIR: &str = "sqlalchemy_models";

/// 批量保存统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SaveStats {
    pub success: usize,
    pub errors: usize,
}

/// 结果的默认文件名
///
/// - 合并模式：`models_<模型名>.py`
/// - 分离模式：`<图像文件名去扩展名>_orm.py`
pub fn file_name_for(result: &VersionedResult) -> String {
    match result.mode() {
        ProcessingMode::Combined => result.outcome().config.output_file_name(),
        ProcessingMode::Separate => {
            let stem = result
                .source_paths()
                .first()
                .and_then(|p| p.file_stem())
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| result.label().to_string());
            format!("{}_orm.py", stem)
        }
    }
}

/// 批量保存时不与已用名称冲突的文件名
///
/// 同名时依次尝试带扩展名的名称（`a_jpg_orm.py`）和序号后缀（`a_orm_2.py`）。
fn unique_file_name(result: &VersionedResult, used: &mut HashSet<String>) -> String {
    let base = file_name_for(result);
    let stem = base.strip_suffix(".py").unwrap_or(&base).to_string();

    let with_extension = match result.mode() {
        ProcessingMode::Separate => result
            .source_paths()
            .first()
            .and_then(|p| Some((p.file_stem()?, p.extension()?)))
            .map(|(s, e)| {
                format!(
                    "{}_{}_orm.py",
                    s.to_string_lossy(),
                    e.to_string_lossy().to_lowercase()
                )
            }),
        ProcessingMode::Combined => None,
    };

    let name = std::iter::once(base.clone())
        .chain(with_extension)
        .chain((2..).map(|n| format!("{}_{}.py", stem, n)))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| base.clone());

    if name != base {
        warn!("⚠️ 文件名 {} 已被占用，{} 改存为 {}", base, result.label(), name);
    }
    used.insert(name.clone());
    name
}

/// 文件内容：成功时以摘要注释开头，失败时原样写出当前文本
pub fn render(result: &VersionedResult) -> String {
    if result.is_error() {
        return result.code().to_string();
    }
    let summary = result.summary();
    let header = format!("# {}", summary.trim().replace('\n', "\n# "));
    format!("{}\n\n{}", header, result.code())
}

/// 保存单个结果到指定文件
pub async fn save_to(result: &VersionedResult, path: &Path) -> Result<(), PersistError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| PersistError::CreateDirFailed {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    fs::write(path, render(result))
        .await
        .map_err(|source| PersistError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    info!("✅ 代码已保存到 {}", path.display());
    Ok(())
}

/// 保存单个结果到目录，使用默认文件名
pub async fn save(result: &VersionedResult, dir: &Path) -> Result<PathBuf, PersistError> {
    let path = dir.join(file_name_for(result));
    save_to(result, &path).await?;
    Ok(path)
}

/// 保存全部结果到 `<output_dir>/sqlalchemy_models/`
///
/// 单个文件写入失败只记录并计数，不中断其余文件。
/// 同一批次内文件名冲突时自动改名，不会互相覆盖。
pub async fn save_all(
    results: &[VersionedResult],
    output_dir: &Path,
) -> Result<(PathBuf, SaveStats), PersistError> {
    let save_dir = output_dir.join(RESULTS_SUBDIR);
    fs::create_dir_all(&save_dir)
        .await
        .map_err(|source| PersistError::CreateDirFailed {
            path: save_dir.clone(),
            source,
        })?;

    let mut stats = SaveStats::default();
    let mut used = HashSet::new();
    for result in results {
        let name = unique_file_name(result, &mut used);
        match save_to(result, &save_dir.join(&name)).await {
            Ok(()) if result.is_error() => stats.errors += 1,
            Ok(()) => stats.success += 1,
            Err(e) => {
                error!("❌ 保存 {} 失败: {}", name, e);
                stats.errors += 1;
            }
        }
    }

    info!("✅ 所有结果已保存到文件夹: {}", save_dir.display());
    info!("成功: {}, 错误: {}", stats.success, stats.errors);
    Ok((save_dir, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConversionOutcome, ModelConfig, OutcomeKind, StructuredArtifact};
    use std::sync::Arc;

    fn result(mode: ProcessingMode, paths: &[&str], kind: OutcomeKind) -> VersionedResult {
        let source_paths: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
        let unit_label = match mode {
            ProcessingMode::Combined => "combined".to_string(),
            ProcessingMode::Separate => paths[0].rsplit('/').next().unwrap().to_string(),
        };
        VersionedResult::new(ConversionOutcome {
            unit_label,
            mode,
            source_paths,
            config: Arc::new(ModelConfig::default()),
            kind,
            diagnostics: Vec::new(),
        })
    }

    fn success(code: &str, summary: &str) -> OutcomeKind {
        OutcomeKind::Success(StructuredArtifact::new(code.into(), summary.into(), 0).unwrap())
    }

    #[test]
    fn test_file_names_follow_mode() {
        let combined = result(
            ProcessingMode::Combined,
            &["d/a.png", "d/b.png"],
            success("Base = declarative_base()", "s"),
        );
        assert_eq!(file_name_for(&combined), "models_GigaChat_2_Pro.py");

        let separate = result(
            ProcessingMode::Separate,
            &["d/shop.diagram.JPG"],
            success("Base = declarative_base()", "s"),
        );
        assert_eq!(file_name_for(&separate), "shop.diagram_orm.py");
    }

    #[test]
    fn test_render_success_prefixes_summary_comment() {
        let r = result(
            ProcessingMode::Separate,
            &["d/a.png"],
            success("Base = declarative_base()", "Users\nOrders"),
        );
        assert_eq!(render(&r), "# Users\n# Orders\n\nBase = declarative_base()");
    }

    #[test]
    fn test_render_failure_is_verbatim() {
        let r = result(
            ProcessingMode::Separate,
            &["d/a.png"],
            OutcomeKind::Failure {
                message: "处理失败".to_string(),
            },
        );
        assert_eq!(render(&r), "处理失败");
    }

    #[tokio::test]
    async fn test_save_all_writes_current_versions() {
        let dir = tempfile::tempdir().unwrap();
        let mut edited = result(
            ProcessingMode::Separate,
            &["d/a.png"],
            success("Base = declarative_base()", "s"),
        );
        edited.commit("Base = declarative_base()\n# edited");
        let failed = result(
            ProcessingMode::Separate,
            &["d/b.png"],
            OutcomeKind::Failure {
                message: "boom".to_string(),
            },
        );

        let (save_dir, stats) = save_all(&[edited, failed], dir.path()).await.unwrap();

        assert_eq!(save_dir, dir.path().join(RESULTS_SUBDIR));
        assert_eq!(stats, SaveStats { success: 1, errors: 1 });
        let a = std::fs::read_to_string(save_dir.join("a_orm.py")).unwrap();
        assert!(a.ends_with("# edited"));
        let b = std::fs::read_to_string(save_dir.join("b_orm.py")).unwrap();
        assert_eq!(b, "boom");
    }

    #[tokio::test]
    async fn test_save_all_keeps_same_stem_images_apart() {
        let dir = tempfile::tempdir().unwrap();
        let png = result(
            ProcessingMode::Separate,
            &["d/a.png"],
            success("Base = declarative_base()\n# from png", "s"),
        );
        let jpg = result(
            ProcessingMode::Separate,
            &["d/a.jpg"],
            success("Base = declarative_base()\n# from jpg", "s"),
        );
        let jpg_again = result(
            ProcessingMode::Separate,
            &["other/a.jpg"],
            success("Base = declarative_base()\n# from other", "s"),
        );

        let (save_dir, stats) = save_all(&[png, jpg, jpg_again], dir.path())
            .await
            .unwrap();

        assert_eq!(stats, SaveStats { success: 3, errors: 0 });
        let read = |name: &str| std::fs::read_to_string(save_dir.join(name)).unwrap();
        assert!(read("a_orm.py").ends_with("# from png"));
        assert!(read("a_jpg_orm.py").ends_with("# from jpg"));
        assert!(read("a_orm_2.py").ends_with("# from other"));
    }
}
